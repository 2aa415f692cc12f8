//! Registry demo
//!
//! Mints, lists and sells one asset against an in-process ledger. The buyer
//! connects before the seller writes, so its first purchase attempt runs on a
//! stale mirror and has to refresh before it goes through.

use std::sync::Arc;

use anyhow::Result;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use tracing::{info, warn};

use registry_client::{ClientConfig, LocalSubmitter, RegistryClient, TransactionSubmitter};
use registry_core::{Ed25519Scheme, InMemoryLedger, Ledger, RegistryStateMachine, SignatureScheme};
use registry_tree::field::{format_hash_hex, scalar};

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("===========================================");
    info!("        Asset Registry Demo");
    info!("===========================================");

    let config = ClientConfig::from_env()?;
    info!("");
    info!("Configuration:");
    info!("  Network:     {}", config.network);
    info!("  Tree height: {} ({} leaves)", config.tree_height, 1u64 << config.tree_height);
    info!("  Mint policy: {:?}", config.mint_policy);
    info!("");

    let ledger = Arc::new(InMemoryLedger::new());
    let machine =
        RegistryStateMachine::new(Arc::clone(&ledger), config.tree_height)?.with_mint_policy(config.mint_policy);
    let submitter = Arc::new(LocalSubmitter::new(config.network.clone(), machine)?);

    let seller_key = SigningKey::generate(&mut OsRng);
    let buyer_key = SigningKey::generate(&mut OsRng);
    let seller_id = Ed25519Scheme::public_key(&seller_key);
    let buyer_id = Ed25519Scheme::public_key(&buyer_key);
    info!("Seller: {seller_id}");
    info!("Buyer:  {buyer_id}");

    let mut seller = RegistryClient::connect(&config, Arc::clone(&submitter)).await?;
    let mut buyer = RegistryClient::connect(&config, Arc::clone(&submitter)).await?;

    let content_hash = scalar(0x00c0_ffee);
    let price = 1_000;
    let index = 0;

    seller.mint_asset(&seller_key, content_hash, index).await?;
    info!("Minted {} at index {index}", format_hash_hex(&content_hash));

    let listed = seller.list_for_sale(&seller_key, content_hash, price, index).await?;
    info!("Listed at price {}", listed.price);

    let bought = match buyer.purchase_asset(seller_id, &buyer_key, content_hash, price, index).await {
        Ok(record) => record,
        Err(err) if err.is_retryable() => {
            warn!("Purchase rejected, refreshing mirror: {err}");
            buyer.refresh().await?;
            buyer.purchase_asset(seller_id, &buyer_key, content_hash, price, index).await?
        }
        Err(err) => return Err(err.into()),
    };
    anyhow::ensure!(bought.owner == buyer_id, "purchase did not transfer ownership");
    info!("Purchased, new owner {}", bought.owner);

    let committed = submitter.committed_root(&config.context()).await?;
    anyhow::ensure!(committed == ledger.root(), "submitter and ledger disagree on the root");
    anyhow::ensure!(committed == buyer.mirror_root(), "buyer mirror out of date");

    let (submitted, accepted) = submitter.stats().await;
    let summary = serde_json::json!({
        "network": config.network,
        "root": format_hash_hex(&committed),
        "index": index,
        "record": bought,
        "submitted": submitted,
        "committed": accepted,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
