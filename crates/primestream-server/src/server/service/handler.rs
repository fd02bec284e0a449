//! Request handlers for prime factorization and prime streaming.
//!
//! ## Responsibilities
//!
//! - Validate the submitted form fields and enforce the configured limits.
//! - Run factorizations on the blocking pool and render the result page.
//! - Hand stream requests to [`stream_primes`], which runs the producer and
//!   consumer behind a streamed HTML body.
//! - Track in-flight streams and refuse new ones during shutdown.

use super::error::{Computation, RequestError, parse_positive};
use crate::server::{
    config::ServerConfig,
    render::{Results, results_page},
    streaming::coordinator::stream_primes,
    telemetry::{
        decrement_streams_inflight, increment_factorizations, increment_requests,
        increment_streams_inflight,
    },
};
use axum::{
    Form,
    extract::State,
    http::header,
    response::{Html, IntoResponse, Response},
};
use portable_atomic::{AtomicUsize, Ordering};
use primestream::Factorization;
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

/// Shared state behind every request.
///
/// Cloning is cheap; all clones observe the same shutdown token and
/// in-flight stream count.
#[derive(Clone)]
pub struct PrimeService {
    config: Arc<ServerConfig>,
    shutdown_token: CancellationToken,
    abort_token: CancellationToken,
    streams_inflight: Arc<AtomicUsize>,
}

impl PrimeService {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown_token: CancellationToken::new(),
            abort_token: CancellationToken::new(),
            streams_inflight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn streams_inflight(&self) -> usize {
        self.streams_inflight.load(Ordering::Acquire)
    }

    /// Factorizes the submitted `number` field.
    ///
    /// Trial division of a large prime can take seconds, so the work runs on
    /// the blocking pool.
    pub async fn factorize(&self, raw: &str) -> Result<Results, RequestError> {
        let computation = Computation::PrimeFactors;
        let number = parse_positive(raw, computation, u64::MAX)?;

        let factorization = tokio::task::spawn_blocking(move || Factorization::new(number))
            .await
            .map_err(|e| RequestError::Internal(e.to_string()))?
            .map_err(|source| RequestError::Compute {
                computation,
                value: number,
                source,
            })?;

        increment_factorizations();
        Ok(Results::success(factorization.to_string()))
    }

    /// Starts streaming the first `limit` primes.
    ///
    /// Counts of 1 and 2 pass validation here; the producer rejects them and
    /// the stream carries only the error page.
    ///
    /// # Errors
    ///
    /// Fails without starting a stream when the service is shutting down or
    /// the limit is not a positive integer within `max_count`.
    pub fn stream(&self, raw: &str) -> Result<axum::body::Body, RequestError> {
        if self.shutdown_token.is_cancelled() {
            return Err(RequestError::ServiceShutdown);
        }

        let computation = Computation::FirstPrimes;
        let max = self.config.max_count as u64;
        let count = parse_positive(raw, computation, max)?;
        let count = usize::try_from(count).map_err(|_| RequestError::TooLarge {
            computation,
            value: i128::from(count),
            max,
        })?;

        Ok(stream_primes(
            count,
            self.config.line_width,
            self.config.stream_buffer_size,
            self.abort_token.clone(),
            InflightGuard::new(Arc::clone(&self.streams_inflight)),
        ))
    }

    /// Gracefully shuts the service down.
    ///
    /// New streams are refused immediately; in-flight streams get up to the
    /// configured shutdown timeout to finish and are aborted after that.
    pub async fn shutdown(&self) {
        // === Phase 0: Stop accepting new streams ===
        tracing::info!("Refusing new streams");
        self.shutdown_token.cancel();

        // === Phase 1: Wait for in-flight streams to drain ===
        tracing::info!(
            "Draining in-flight streams ({} active)",
            self.streams_inflight()
        );
        let drained = timeout(self.config.shutdown_timeout, async {
            while self.streams_inflight() > 0 {
                sleep(core::time::Duration::from_millis(100)).await;
            }
        })
        .await;

        match drained {
            Ok(()) => tracing::debug!("All in-flight streams drained successfully"),
            Err(_) => {
                tracing::warn!(
                    "Graceful drain timed out ({} streams still active)",
                    self.streams_inflight()
                );

                // === Phase 2: Abort whatever is left ===
                self.abort_token.cancel();
            }
        }
    }
}

/// Counts a stream as in flight until dropped.
pub struct InflightGuard {
    streams_inflight: Arc<AtomicUsize>,
}

impl InflightGuard {
    fn new(streams_inflight: Arc<AtomicUsize>) -> Self {
        streams_inflight.fetch_add(1, Ordering::AcqRel);
        increment_streams_inflight();
        Self { streams_inflight }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.streams_inflight.fetch_sub(1, Ordering::AcqRel);
        decrement_streams_inflight();
    }
}

#[derive(Debug, Deserialize)]
pub struct FactorForm {
    #[serde(default)]
    pub number: String,
}

#[derive(Debug, Deserialize)]
pub struct PrimesForm {
    #[serde(default)]
    pub limit: String,
}

/// `POST /primefactors`: renders the prime factors of `number`.
#[tracing::instrument(skip_all, fields(number = %form.number))]
pub async fn prime_factors(
    State(service): State<PrimeService>,
    Form(form): Form<FactorForm>,
) -> Response {
    increment_requests();

    match service.factorize(&form.number).await {
        Ok(results) => {
            tracing::debug!("{}", results.message);
            Html(results_page(&results)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// `POST /primenumbers`: streams the first `limit` primes as HTML.
///
/// The response starts before the first prime is found; primes are written
/// as the producer discovers them.
#[tracing::instrument(skip_all, fields(limit = %form.limit))]
pub async fn prime_numbers(
    State(service): State<PrimeService>,
    Form(form): Form<PrimesForm>,
) -> Response {
    increment_requests();

    match service.stream(&form.limit) {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            body,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// `GET /healthz`
pub async fn health() -> &'static str {
    "ok"
}
