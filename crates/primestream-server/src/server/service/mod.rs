//! HTTP service implementation.
//!
//! This module contains the request handlers for both computations, the
//! mapping from request failures to result pages, and the router wiring them
//! together with static file serving.
//!
//! ## Structure
//!
//! - [`handler`] - service state (`PrimeService`) and axum handlers.
//! - [`error`] - `RequestError` and its HTML/status rendering.
//! - [`router`] - route table and middleware.

pub mod error;
pub mod handler;
pub mod router;
