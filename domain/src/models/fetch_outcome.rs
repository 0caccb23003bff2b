use thiserror::Error;

use super::{ConnectCode, ProfileRecord};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchFailure {
    #[error("network error while fetching {code}: {message}")]
    Network { code: ConnectCode, message: String },
    #[error("malformed response for {code}: {message}")]
    MalformedResponse { code: ConnectCode, message: String },
    /// The service answered, but without a user object for this code.
    #[error("no user object returned for {code}")]
    MissingProfile { code: ConnectCode },
}

impl FetchFailure {
    pub fn code(&self) -> &ConnectCode {
        match self {
            Self::Network { code, .. }
            | Self::MalformedResponse { code, .. }
            | Self::MissingProfile { code } => code,
        }
    }

    /// Whether the request itself failed, as opposed to the service answering
    /// without a profile.
    pub fn is_hard_failure(&self) -> bool {
        !matches!(self, Self::MissingProfile { .. })
    }
}

/// Result of fetching one connect code. Every submitted code yields exactly one.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched(ProfileRecord),
    Failed(FetchFailure),
}

impl FetchOutcome {
    pub fn code(&self) -> &ConnectCode {
        match self {
            Self::Fetched(record) => &record.identifier,
            Self::Failed(failure) => failure.code(),
        }
    }
}
