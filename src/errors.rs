use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum AfError {
    GridError(String),
    TuningError(String),
    PayloadError(String),
}

impl fmt::Display for AfError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AfError::GridError(msg) => write!(f, "AF grid configuration error: {}", msg),
            AfError::TuningError(msg) => write!(f, "AF tuning error: {}", msg),
            AfError::PayloadError(msg) => write!(f, "Payload error: {}", msg),
        }
    }
}

impl std::error::Error for AfError {}
