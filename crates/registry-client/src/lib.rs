//! Client-side logic for the asset registry
//!
//! A [`RegistryClient`] keeps a mirror of the committed tree, builds witnesses
//! from it and signs transitions before handing them to a
//! [`TransactionSubmitter`].

pub mod client;
pub mod config;
pub mod error;
pub mod submitter;
pub mod witness;

pub use client::RegistryClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use submitter::{LocalSubmitter, NetworkContext, TransactionSubmitter};
pub use witness::WitnessGenerator;
