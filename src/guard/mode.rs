use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown runtime mode {0:?}, expected \"production\" or \"development\"")]
pub struct UnknownMode(String);

/// Runtime environment. Outside production the route guard lets everything through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuntimeMode {
    #[default]
    Production,
    Development,
}

impl RuntimeMode {
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }
}

impl FromStr for RuntimeMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!("production".parse().ok(), Some(RuntimeMode::Production));
        assert_eq!(" Dev ".parse().ok(), Some(RuntimeMode::Development));
        assert!("staging".parse::<RuntimeMode>().is_err());
        assert_eq!(RuntimeMode::default(), RuntimeMode::Production);
        assert!(!RuntimeMode::Development.is_production());
    }
}
