use crate::{Error, Result};

/// The terminal signal of a prime stream, sent exactly once per stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Every requested value was emitted.
    Success,
    /// The stream stopped early, possibly after some values were emitted.
    Failure(Error),
}

impl StreamOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::Success => None,
            Self::Failure(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            Self::Failure(err) => Err(err),
        }
    }
}

impl From<Result<()>> for StreamOutcome {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(err) => Self::Failure(err),
        }
    }
}

/// What a consumer observed while driving one stream to completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamReport {
    /// The number of primes requested.
    pub count: usize,
    /// The number of primes actually rendered.
    pub emitted: usize,
    pub outcome: StreamOutcome,
}
