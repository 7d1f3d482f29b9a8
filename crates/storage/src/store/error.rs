#![forbid(unsafe_code)]

use rusqlite::ErrorCode;

#[derive(Debug)]
pub enum StoreError {
    StorageUnavailable(rusqlite::Error),
    Io(std::io::Error),
    NotFound,
    ConstraintViolation(rusqlite::Error),
    InvalidInput(&'static str),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::Io(err) => write!(f, "storage unavailable: io: {err}"),
            Self::NotFound => write!(f, "not found"),
            Self::ConstraintViolation(err) => write!(f, "constraint violation: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        if is_constraint_violation(&value) {
            return Self::ConstraintViolation(value);
        }
        Self::StorageUnavailable(value)
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                || message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("NOT NULL constraint failed")
                })
        }
        _ => false,
    }
}
