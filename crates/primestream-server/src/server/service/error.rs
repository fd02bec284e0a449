//! Request failures and how they are shown to the client.
//!
//! Every failure renders the same result page as a successful factorization,
//! titled `Error`, with a message naming the computation and the details of
//! what went wrong.

use crate::server::render::{Results, results_page};
use crate::server::telemetry::increment_errors;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use core::fmt;
use core::num::ParseIntError;

/// The computation a request asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Computation {
    PrimeFactors,
    FirstPrimes,
}

impl Computation {
    fn failure_message(self, value: impl fmt::Display) -> String {
        match self {
            Self::PrimeFactors => format!("Cannot calculate prime factors of {value}"),
            Self::FirstPrimes => format!("Cannot calculate first {value} prime numbers"),
        }
    }

    const fn not_positive_details(self) -> &'static str {
        match self {
            Self::PrimeFactors => "It must be greater than zero.",
            Self::FirstPrimes => "Limit must be greater than zero.",
        }
    }
}

/// Why a request could not be served.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The form field is not an integer.
    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] ParseIntError),

    #[error("{computation:?} of {value}: must be greater than zero")]
    NotPositive {
        computation: Computation,
        value: i128,
    },

    #[error("{computation:?} of {value}: exceeds maximum ({max})")]
    TooLarge {
        computation: Computation,
        value: i128,
        max: u64,
    },

    /// The computation itself rejected the input.
    #[error("{computation:?} of {value}: {source}")]
    Compute {
        computation: Computation,
        value: u64,
        #[source]
        source: primestream::Error,
    },

    #[error("Service is shutting down")]
    ServiceShutdown,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RequestError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidNumber(_)
            | Self::NotPositive { .. }
            | Self::TooLarge { .. }
            | Self::Compute { .. } => StatusCode::BAD_REQUEST,
            Self::ServiceShutdown => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn results(&self) -> Results {
        match self {
            Self::InvalidNumber(e) => Results::error("Invalid number", e.to_string()),
            Self::NotPositive { computation, value } => Results::error(
                computation.failure_message(value),
                computation.not_positive_details(),
            ),
            Self::TooLarge {
                computation,
                value,
                max,
            } => Results::error(
                computation.failure_message(value),
                format!("It must not exceed {max}."),
            ),
            Self::Compute {
                computation,
                value,
                source,
            } => Results::error(computation.failure_message(value), source.to_string()),
            Self::ServiceShutdown => Results::error(
                "Service unavailable",
                "The service is shutting down, please retry later.",
            ),
            Self::Internal(details) => Results::error("Internal error", details.clone()),
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        increment_errors();
        tracing::warn!("Request failed: {self}");
        (self.status(), Html(results_page(&self.results()))).into_response()
    }
}

/// Parses a positive integer form field no larger than `max`.
///
/// Surrounding whitespace is ignored. Negative numbers and zero are reported
/// as [`RequestError::NotPositive`] rather than as parse failures.
pub fn parse_positive(raw: &str, computation: Computation, max: u64) -> Result<u64, RequestError> {
    let value: i128 = raw.trim().parse()?;

    if value <= 0 {
        return Err(RequestError::NotPositive { computation, value });
    }

    u64::try_from(value)
        .ok()
        .filter(|&v| v <= max)
        .ok_or(RequestError::TooLarge {
            computation,
            value,
            max,
        })
}
