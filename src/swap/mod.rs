//! Two-party swap module
//!
//! A simpler sibling of the wallet engine: no quorum, just a named accepter
//! and an atomic exchange between two treasuries.

pub mod engine;
pub mod swap;

pub use engine::SwapEngine;
pub use swap::{Swap, SwapError, Treasury};
