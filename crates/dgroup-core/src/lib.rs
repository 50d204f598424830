pub mod attributes;
pub mod builder;
pub mod client;
pub mod codec;
pub mod config;
pub mod diff;
pub mod error;
pub mod io;
pub mod poller;
pub mod reconcile;
pub mod source;
pub mod types;
pub mod validate;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DgroupError, Result};
