use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ridgeline_core::ValidationError),

    #[error(transparent)]
    Config(#[from] ridgeline_core::ConfigError),

    #[error("all sources exhausted for: {}", .instruments.join(", "))]
    Exhausted { instruments: Vec<String> },

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) => 2,
            Self::Exhausted { .. } => 3,
            Self::Command(_) | Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_exit_codes() {
        let config = CliError::from(ridgeline_core::ConfigError::EmptyWatchlist);
        let exhausted = CliError::Exhausted {
            instruments: vec![String::from("445380")],
        };

        assert_eq!(config.exit_code(), 2);
        assert_eq!(exhausted.exit_code(), 3);
        assert_eq!(CliError::Command(String::from("x")).exit_code(), 10);
        assert_eq!(exhausted.to_string(), "all sources exhausted for: 445380");
    }
}
