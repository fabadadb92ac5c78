//! Error type shared by the store and the command layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed store file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },
    #[error("invalid input: {0}")]
    Validation(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: u64) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_record() {
        let err = StoreError::not_found("meeting", 7);
        assert_eq!(err.to_string(), "meeting 7 not found");
    }

    #[test]
    fn json_errors_convert() {
        let parse = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: StoreError = parse.into();
        assert!(matches!(err, StoreError::Json(_)));
    }
}
