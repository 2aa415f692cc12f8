//! Asset registry core logic
//!
//! This crate contains the transition rules shared by every component that
//! touches the committed root:
//! - Asset records and their canonical leaf digest
//! - The mint / list / purchase state machine
//! - The signature and ledger seams it is generic over
//!
//! Clients that hit [`RegistryError::PreconditionFailed`] are expected to
//! re-fetch the tree, regenerate the witness for the same index and resubmit.
//! Nothing in this crate retries on its own.

pub mod asset;
pub mod error;
pub mod ledger;
pub mod signature;
pub mod state_machine;
pub mod transition;
pub mod types;

pub use asset::{AssetRecord, AssetState};
pub use error::{PreconditionFailure, RegistryError};
pub use ledger::{InMemoryLedger, Ledger, LedgerError};
pub use signature::{ownership_message, purchase_message, Ed25519Scheme, SignatureScheme};
pub use state_machine::{MintPolicy, RegistryStateMachine};
pub use transition::{Transition, TransitionKind, TransitionReceipt};
pub use types::*;
