//! HTTP service, streaming coordination, configuration and telemetry.
//!
//! ## Structure
//!
//! - [`config`] - CLI/env arguments and the validated [`config::ServerConfig`].
//! - [`service`] - request handlers, form validation errors and the router.
//! - [`streaming`] - glue between a prime stream consumer and an HTTP body.
//! - [`render`] - HTML rendering of result pages and streamed primes.
//! - [`telemetry`] - log subscriber and optional OpenTelemetry export.

pub mod config;
pub mod render;
pub mod service;
pub mod streaming;
pub mod telemetry;
