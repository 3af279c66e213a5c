//! Domain error and warning types.

/// Top-level error type for pivotrader.
#[derive(Debug, thiserror::Error)]
pub enum PivotraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no entry rule enabled")]
    NoEntryRule,

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("insufficient data: have {have} bars, need {need}")]
    InsufficientBars { have: usize, need: usize },

    #[error("invariant violated: {reason}")]
    Invariant { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&PivotraderError> for std::process::ExitCode {
    fn from(err: &PivotraderError) -> Self {
        let code: u8 = match err {
            PivotraderError::Io(_) => 1,
            PivotraderError::ConfigParse { .. }
            | PivotraderError::ConfigMissing { .. }
            | PivotraderError::ConfigInvalid { .. }
            | PivotraderError::NoEntryRule => 2,
            PivotraderError::Data { .. } | PivotraderError::InsufficientBars { .. } => 3,
            PivotraderError::Invariant { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

/// Non-fatal configuration conditions, returned alongside successful results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// No exit rule enabled; a position may stay open through the end of data.
    NoExitRule,
    /// More than one stop-style exit (fixed stop, small-pivot trail,
    /// aggressive profit trail) is active; exit arbitration picks the better
    /// fill, so this is not an error.
    ConflictingTrailingStops,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::NoExitRule => {
                write!(f, "no exit rule enabled; positions may run to end of data")
            }
            ConfigWarning::ConflictingTrailingStops => {
                write!(
                    f,
                    "multiple stop or trailing exits enabled; best fill wins per bar"
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::ExitCode;

    #[test]
    fn exit_code_mapping() {
        let io: PivotraderError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(ExitCode::from(&io), ExitCode::from(1));

        let cfg = PivotraderError::ConfigMissing {
            section: "rules".into(),
            key: "stop_loss_percent".into(),
        };
        assert_eq!(ExitCode::from(&cfg), ExitCode::from(2));

        let data = PivotraderError::InsufficientBars { have: 1, need: 3 };
        assert_eq!(ExitCode::from(&data), ExitCode::from(3));

        let inv = PivotraderError::Invariant {
            reason: "two open positions".into(),
        };
        assert_eq!(ExitCode::from(&inv), ExitCode::from(4));
    }

    #[test]
    fn error_messages() {
        let err = PivotraderError::ConfigInvalid {
            section: "rules".into(),
            key: "stop_loss_percent".into(),
            reason: "must be between 0.1 and 5.0".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [rules] stop_loss_percent: must be between 0.1 and 5.0"
        );

        assert_eq!(
            PivotraderError::NoEntryRule.to_string(),
            "no entry rule enabled"
        );
    }

    #[test]
    fn warning_display() {
        assert!(ConfigWarning::NoExitRule.to_string().contains("no exit rule"));
        assert!(ConfigWarning::ConflictingTrailingStops
            .to_string()
            .contains("best fill"));
    }
}
