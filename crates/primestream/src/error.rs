//! Error types for factorization and prime streaming.
//!
//! ## Error Cases
//! - `InvalidArgument`: the input is outside the domain of the computation
//!   (a number below 2 for factorization, a count below 3 for streaming).
//! - `ChannelClosed`: one side of a producer/consumer pair or the output sink
//!   went away before the stream finished.

/// A result type defaulting to the crate's [`enum@Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `primestream` can produce.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The input violated the computation's precondition.
    ///
    /// Carries the rejected value. The caller must fix the input; retrying
    /// is pointless.
    #[error("Invalid argument number {0}")]
    InvalidArgument(u64),

    /// A channel between producer, consumer and sink was closed early.
    #[error("Channel closed: {context}")]
    ChannelClosed { context: String },
}

impl Error {
    pub(crate) fn channel_closed(context: impl Into<String>) -> Self {
        Self::ChannelClosed {
            context: context.into(),
        }
    }

    /// Returns `true` for input validation failures.
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}
