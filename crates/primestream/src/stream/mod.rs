//! Backpressured streaming of the first N primes.
//!
//! A [`start`]ed producer runs as its own Tokio task and hands each prime to
//! the consumer over a capacity-one channel, so at most one value is ever in
//! flight. The terminal [`StreamOutcome`] travels on a separate oneshot
//! channel and is sent only after the consumer has taken the last value.
//!
//! [`PrimeStreamConsumer`] multiplexes both channels, turns each event into
//! an output segment through a [`Render`] implementation and forwards the
//! segments into any [`futures::Sink`].

mod consumer;
mod outcome;
mod producer;
mod render;

#[cfg(test)]
mod tests;

pub use consumer::*;
pub use outcome::*;
pub use producer::*;
pub use render::*;
