use std::{env, fmt::Write as _};

use crate::{app_info::AppInfo, tracker::stage::Stage};

pub fn print_version_info(app: AppInfo) {
    print!("{}", version_info(app));
}

#[must_use]
pub fn version_info(app: AppInfo) -> String {
    let git_hash = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_timestamp = option_env!("BUILD_TIMESTAMP").unwrap_or("unknown");

    let mut out = String::new();
    let _ = writeln!(out, "📦 {} v{}", app.name, app.version);
    if !app.description.is_empty() {
        let _ = writeln!(out, "📝 {}", app.description);
    }
    let _ = writeln!(out, "🔗 Git Hash: {git_hash}");
    let _ = writeln!(out, "⏰ Build Time: {build_timestamp}");
    let _ = writeln!(out, "💻 Platform: {}/{}", env::consts::OS, env::consts::ARCH);
    let _ = writeln!(out, "🧩 Stages: {}", Stage::names());
    out
}
