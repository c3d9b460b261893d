// Example: Claiming vault funds through the privacy pool
//
// This example demonstrates how to:
// 1. Load configuration from the environment (HYDENTITY_* / .env)
// 2. Wire an orchestrator to the RPC node and the mixer relayer
// 3. Preview the execution plan for a claim
// 4. Execute the claim and inspect partial failures

use hydentity_sdk::{
    ClaimOptions, ClaimOrchestrator, HydentityConfig, HydentitySdkError, MixerBridgeCache,
    SnsResolver, SolConnection,
};
use solana_sdk::signature::Keypair;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 1. Configuration
    let config = HydentityConfig::from_env()?;
    let connection: Arc<dyn SolConnection> = Arc::new(config.rpc_client()?);
    let resolver = Arc::new(SnsResolver::new(connection.clone()));

    // 2. Claimant wallet (owner of the .sol name)
    let claimant = Arc::new(Keypair::new()); // Replace with the name owner's keypair

    let cache = MixerBridgeCache::new();
    let orchestrator =
        ClaimOrchestrator::connect(&config, connection, resolver, claimant, &cache).await?;

    let domain = "alice.sol";
    let amount = 1_000_000_000; // 1 SOL

    // 3. Preview the plan
    let plan = orchestrator.plan_claim(domain, amount).await?;
    println!("Claim plan for {}:", domain);
    for (i, split) in plan.splits.iter().enumerate() {
        println!(
            "  Split {}: {} lamports after {:?}",
            i,
            split,
            plan.delay_before(i)
        );
    }

    // 4. Execute; Ctrl-C stops between splits
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let options = ClaimOptions::default()
        .with_cancel(cancel)
        .withdraw_to_recipients();
    match orchestrator
        .execute_private_claim(domain, amount, None, options)
        .await
    {
        Ok(result) => {
            println!(
                "Claim complete: {} lamports in {} splits",
                result.completed_amount(),
                result.split_count
            );
            for tx in &result.transactions {
                println!("  #{} deposit {}", tx.index, tx.signature);
            }
        },
        Err(HydentitySdkError::PartialClaimFailure(partial)) => {
            println!("{}", partial);
            let resume = partial.resume_point();
            println!(
                "Resume later from split {} (plan {})",
                resume.next_index,
                hex::encode(resume.plan_digest)
            );
            // Keep this to resume without repeating landed steps
            println!("{}", serde_json::to_string(&resume)?);
        },
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
