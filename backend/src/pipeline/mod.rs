//! The blocking document pipeline. Nothing here touches the async runtime;
//! HTTP handlers run it on the blocking pool.

pub mod fetch;
pub mod generator;
pub mod probe;
pub mod qr;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{Fetcher, TemplateSource};
