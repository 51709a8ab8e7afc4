use strum::{Display, EnumString};

/// Deployment environment, selects the `config/{environment}` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    #[must_use]
    pub fn config_file_name(&self) -> String {
        format!("config/{self}")
    }
}
