//! Application error type.
//!
//! Every fallible path in the crate eventually surfaces as an [`AppError`],
//! which carries the process exit code alongside a human-readable message:
//!
//! - `2`: usage or input problems (bad flags, unreadable files, missing columns)
//! - `3`: not enough usable data to fit
//! - `4`: numerical or internal failures
//! - `5`: instrument / controller failures

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<crate::math::OptimizeError> for AppError {
    fn from(err: crate::math::OptimizeError) -> Self {
        AppError::new(4, err.to_string())
    }
}

impl From<crate::control::InstrumentError> for AppError {
    fn from(err: crate::control::InstrumentError) -> Self {
        AppError::new(5, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_bare_message() {
        let err = AppError::new(3, "No usable rows.");
        assert_eq!(err.to_string(), "No usable rows.");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn instrument_errors_map_to_exit_code_five() {
        let err: AppError = crate::control::InstrumentError::Disconnected("uv-vis".into()).into();
        assert_eq!(err.exit_code(), 5);
        assert!(err.message().contains("uv-vis"));
    }
}
