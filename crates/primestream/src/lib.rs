#![doc = include_str!("../README.md")]

mod error;
mod factor;
mod primes;
#[cfg(feature = "async-tokio")]
mod stream;

pub use crate::error::*;
pub use crate::factor::*;
pub use crate::primes::*;
#[cfg(feature = "async-tokio")]
pub use crate::stream::*;
