//! Streaming pipeline for `/primenumbers` responses.
//!
//! Each request spawns one task that drives a prime producer and an
//! [`HtmlRender`](crate::server::render::HtmlRender) consumer. Rendered
//! segments travel through a bounded channel into the response body, so a
//! slow client slows the consumer, which in turn blocks the producer.

pub mod coordinator;
