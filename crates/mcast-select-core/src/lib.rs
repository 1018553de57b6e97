//! Bulk device selection for LoRaWAN multicast-group enrollment.
//!
//! Shared by the CLI and any other front end: the selection model, the
//! controller that reconciles it with membership probes, the collaborator
//! traits it talks through, and a file-backed inventory implementing them.

pub mod config;
pub mod error;
pub mod fanout;
pub mod membership;
pub mod selection;
pub mod service;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{SessionOptions, SubmitStrategy};
pub use error::CoreError;
pub use selection::{SelectionController, Submission};
