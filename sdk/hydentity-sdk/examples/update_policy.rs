// Example: Tightening the privacy policy of a vault
//
// This example demonstrates how to:
// 1. Open a vault by domain
// 2. Preview the policy an update would produce
// 3. Build, sign and submit the update

use hydentity_sdk::{
    Distribution, HydentityConfig, NameVault, SnsResolver, SolConnection, TransactionOptions,
    TransactionPipeline,
};
use solana_sdk::signature::{Keypair, Signer};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = HydentityConfig::from_env()?;
    let connection: Arc<dyn SolConnection> = Arc::new(config.rpc_client()?);
    let resolver = SnsResolver::new(connection.clone());
    let owner = Arc::new(Keypair::new()); // Replace with the name owner's keypair

    // 1. Open the vault
    let vault = NameVault::open(
        &resolver,
        connection.as_ref(),
        Some(config.program_id()?),
        "alice.sol",
        &owner.pubkey(),
    )
    .await?;
    println!("Vault: {}", vault.address);

    // 2. Preview
    let current = vault.fetch_policy(connection.as_ref()).await?;
    let update = vault
        .update_policy(owner.pubkey())
        .with_splits(3, 8)
        .with_delays(600, 3_600)
        .with_distribution(Distribution::Weighted);
    let next = update.apply(&current)?;
    println!("Policy nonce {} -> {}", current.policy_nonce, next.policy_nonce);

    // 3. Submit
    let pipeline = TransactionPipeline::new(connection).with_signer(owner);
    let outcome = pipeline
        .process_transaction(update.build_transaction()?, TransactionOptions::default())
        .await?;
    println!("Submitted: {:?}", outcome.signature());

    Ok(())
}
