//! Configuration

use anyhow::{Context, Result};
use registry_core::MintPolicy;
use registry_tree::MAX_TREE_HEIGHT;
use serde::{Deserialize, Serialize};
use std::env;

use crate::submitter::NetworkContext;

/// Default tree height (256 leaves)
pub const DEFAULT_TREE_HEIGHT: u32 = 8;

/// Client configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Network the submitter targets
    pub network: String,
    /// Height of the registry tree
    pub tree_height: u32,
    /// Mint policy for locally hosted state machines
    pub mint_policy: MintPolicy,
    /// Optional memo attached to every submission
    pub memo: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: "local".to_string(),
            tree_height: DEFAULT_TREE_HEIGHT,
            mint_policy: MintPolicy::Unchecked,
            memo: None,
        }
    }
}

impl ClientConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let tree_height = match lookup("REGISTRY_TREE_HEIGHT") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("REGISTRY_TREE_HEIGHT is not a valid height: {raw:?}"))?,
            None => defaults.tree_height,
        };
        anyhow::ensure!(
            tree_height <= MAX_TREE_HEIGHT,
            "REGISTRY_TREE_HEIGHT {tree_height} exceeds the maximum of {MAX_TREE_HEIGHT}"
        );

        Ok(Self {
            network: lookup("REGISTRY_NETWORK").unwrap_or(defaults.network),
            tree_height,
            mint_policy: lookup("REGISTRY_MINT_POLICY")
                .map(|s| MintPolicy::from(s.as_str()))
                .unwrap_or_default(),
            memo: lookup("REGISTRY_MEMO").filter(|memo| !memo.is_empty()),
        })
    }

    /// Submission context for this configuration
    pub fn context(&self) -> NetworkContext {
        NetworkContext {
            network: self.network.clone(),
            memo: self.memo.clone(),
        }
    }
}
