use std::process::ExitCode;

use batchwatch::{app_info::AppInfo, boot::boot};

#[tokio::main]
async fn main() -> ExitCode {
    boot(AppInfo::batchwatch()).await
}
