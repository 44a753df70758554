use std::fmt;
use std::str::FromStr;

/// Message severity, ordered from least to most severe
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(u8)]
pub enum LogSeverity {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeverityParseError {
    #[error("empty log level")]
    Empty,
    #[error("numeric log level {0} out of range 0-4")]
    OutOfRange(u64),
    #[error("unknown log level '{0}'")]
    Unknown(String),
}

impl LogSeverity {
    pub const ALL: [LogSeverity; 5] = [
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
        LogSeverity::Fatal,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO",
            LogSeverity::Warn => "WARN",
            LogSeverity::Error => "ERROR",
            LogSeverity::Fatal => "FATAL",
        }
    }

    /// The `log` facade level a message of this severity is forwarded at.
    /// FATAL has no counterpart and goes out as an error.
    pub fn level(&self) -> log::Level {
        match self {
            LogSeverity::Debug => log::Level::Debug,
            LogSeverity::Info => log::Level::Info,
            LogSeverity::Warn => log::Level::Warn,
            LogSeverity::Error | LogSeverity::Fatal => log::Level::Error,
        }
    }
}

impl FromStr for LogSeverity {
    type Err = SeverityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let first = s.chars().next().ok_or(SeverityParseError::Empty)?;

        if first.is_ascii_digit() {
            let value: u64 = s
                .parse()
                .map_err(|_| SeverityParseError::Unknown(s.to_string()))?;
            return u8::try_from(value)
                .ok()
                .and_then(Self::from_u8)
                .ok_or(SeverityParseError::OutOfRange(value));
        }

        Self::ALL
            .iter()
            .find(|severity| severity.as_str() == s)
            .copied()
            .ok_or_else(|| SeverityParseError::Unknown(s.to_string()))
    }
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
