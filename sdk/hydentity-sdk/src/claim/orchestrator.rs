use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::basic::pipeline::{TransactionOptions, TransactionOutcome, TransactionPipeline};
use crate::basic::vault::NameVault;
use crate::config::HydentityConfig;
use crate::core::connection::SolConnection;
use crate::core::signer::HydentitySigner;
use crate::error::{HydentitySdkError, Result};
use crate::mixer::bridge::{HttpMixerBridge, MixerBridge};
use crate::mixer::cache::{IdentityBridge, MixerBridgeCache};
use crate::mixer::identity::PoolIdentity;
use crate::policy::{generate_execution_plan, SeedMaterial};
use crate::resolver::NameResolver;
use crate::types::{
    Amount, ClaimResult, ExecutionPlan, PartialClaim, ResumePoint, SplitProgress,
    TransactionReceipt,
};

/// Per-claim knobs
#[derive(Debug, Clone, Default)]
pub struct ClaimOptions {
    /// Checked before every delay and network call
    pub cancel: CancellationToken,
    /// Continue an interrupted claim instead of starting over
    pub resume: Option<ResumePoint>,
    /// After each deposit, withdraw the split to its recipient
    pub withdraw_to_recipients: bool,
    /// Release each split from the vault to the claimant with `withdraw_direct`
    /// before depositing it. Only submitting modes are accepted.
    pub release: Option<TransactionOptions>,
}

impl ClaimOptions {
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn resume_from(mut self, point: ResumePoint) -> Self {
        self.resume = Some(point);
        self
    }

    pub fn withdraw_to_recipients(mut self) -> Self {
        self.withdraw_to_recipients = true;
        self
    }

    pub fn with_release(mut self, options: TransactionOptions) -> Self {
        self.release = Some(options);
        self
    }
}

/// Everything fixed before the first split goes out
struct PreparedClaim {
    vault: NameVault,
    plan: ExecutionPlan,
    start: usize,
    in_progress: Option<SplitProgress>,
}

/// Runs private claims for one claimant.
///
/// Splits run strictly in plan order on the calling task; the per-identity
/// bridge serializes deposits against other claims for the same wallet.
pub struct ClaimOrchestrator {
    connection: Arc<dyn SolConnection>,
    resolver: Arc<dyn NameResolver>,
    signer: Arc<dyn HydentitySigner>,
    mixer: Arc<IdentityBridge>,
    pipeline: TransactionPipeline<dyn SolConnection>,
    program_id: Pubkey,
}

impl ClaimOrchestrator {
    pub fn new(
        connection: Arc<dyn SolConnection>,
        resolver: Arc<dyn NameResolver>,
        signer: Arc<dyn HydentitySigner>,
        mixer: Arc<IdentityBridge>,
        program_id: Pubkey,
    ) -> Self {
        let pipeline = TransactionPipeline::new(connection.clone()).with_signer(signer.clone());
        Self {
            connection,
            resolver,
            signer,
            mixer,
            pipeline,
            program_id,
        }
    }

    /// Wire an orchestrator to the relayer in `config`, reusing the cached
    /// bridge for the signer's pool identity when one exists.
    pub async fn connect(
        config: &HydentityConfig,
        connection: Arc<dyn SolConnection>,
        resolver: Arc<dyn NameResolver>,
        signer: Arc<dyn HydentitySigner>,
        cache: &MixerBridgeCache,
    ) -> Result<Self> {
        let identity = PoolIdentity::derive(signer.as_ref()).await?;
        let mixer = cache
            .get_or_try_init(identity, || {
                let mixer_config = config.mixer.clone();
                let source = signer.pubkey();
                let connection = connection.clone();
                async move {
                    let bridge =
                        HttpMixerBridge::connect(mixer_config, identity, source, connection).await?;
                    Ok::<Arc<dyn MixerBridge>, HydentitySdkError>(Arc::new(bridge))
                }
            })
            .await?;

        Ok(Self::new(
            connection,
            resolver,
            signer,
            mixer,
            config.program_id()?,
        ))
    }

    pub fn claimant(&self) -> Pubkey {
        self.signer.pubkey()
    }

    pub fn mixer(&self) -> &Arc<IdentityBridge> {
        &self.mixer
    }

    /// Compute the plan a claim would follow, without moving funds.
    pub async fn plan_claim(&self, domain: &str, amount: Amount) -> Result<ExecutionPlan> {
        let prepared = self.prepare(domain, amount, &ClaimOptions::default()).await?;
        Ok(prepared.plan)
    }

    /// Route `amount` from the vault of `domain` through the pool.
    ///
    /// `destination` overrides the plan's per-split recipients when
    /// withdrawing. Failures before the first split surface directly;
    /// failures after it surface as `PartialClaimFailure` carrying the
    /// completed splits and whatever the failed split already landed.
    /// Nothing is retried or rolled back.
    pub async fn execute_private_claim(
        &self,
        domain: &str,
        amount: Amount,
        destination: Option<Pubkey>,
        options: ClaimOptions,
    ) -> Result<ClaimResult> {
        let PreparedClaim {
            vault,
            plan,
            start,
            mut in_progress,
        } = self.prepare(domain, amount, &options).await?;

        info!(
            domain,
            amount,
            splits = plan.split_count(),
            start,
            identity = %self.mixer.identity(),
            "executing private claim"
        );

        let mut result = ClaimResult {
            split_count: plan.split_count() as u32,
            total_amount: amount,
            transactions: Vec::with_capacity(plan.split_count() - start),
            execution_plan: plan,
        };

        for index in start..result.execution_plan.split_count() {
            let outcome = self
                .execute_split(
                    &vault,
                    &result.execution_plan,
                    index,
                    destination,
                    &options,
                    &mut in_progress,
                )
                .await;
            match outcome {
                Ok(receipt) => {
                    result.transactions.push(receipt);
                    in_progress = None;
                },
                Err(cause) => {
                    warn!(
                        domain,
                        index,
                        completed = result.transactions.len(),
                        in_progress = ?in_progress,
                        error = %cause,
                        "private claim stopped"
                    );
                    return Err(HydentitySdkError::PartialClaimFailure(Box::new(PartialClaim {
                        result,
                        failed_index: index,
                        in_progress,
                        cause,
                    })));
                },
            }
        }

        info!(
            domain,
            amount,
            completed = result.completed_amount(),
            "private claim completed"
        );
        Ok(result)
    }

    async fn prepare(
        &self,
        domain: &str,
        amount: Amount,
        options: &ClaimOptions,
    ) -> Result<PreparedClaim> {
        let cancel = &options.cancel;
        if amount == 0 {
            return Err(HydentitySdkError::InvalidAmount(
                "claim amount must be greater than zero".to_string(),
            ));
        }
        if let Some(release) = options.release {
            if !release.mode.submits() {
                return Err(HydentitySdkError::NotConfigured(
                    "vault release needs a submitting transaction mode",
                ));
            }
        }

        checkpoint(cancel)?;
        let claimant = self.signer.pubkey();
        let vault = NameVault::open(
            self.resolver.as_ref(),
            self.connection.as_ref(),
            Some(self.program_id),
            domain,
            &claimant,
        )
        .await?;

        checkpoint(cancel)?;
        let policy = vault.fetch_policy(self.connection.as_ref()).await?;
        policy.validate()?;

        checkpoint(cancel)?;
        let balance = vault.fetch_balance(self.connection.as_ref()).await?;
        if options.resume.is_none() && amount > balance {
            return Err(HydentitySdkError::InsufficientVaultBalance {
                requested: amount,
                available: balance,
            });
        }

        checkpoint(cancel)?;
        match self.mixer.get_balance().await {
            Ok(pool_balance) => debug!(pool_balance, "pool balance before claim"),
            Err(err) => warn!(error = %err, "pool balance unavailable"),
        }

        checkpoint(cancel)?;
        let seed = SeedMaterial::derive(self.signer.as_ref(), &vault.address, policy.policy_nonce)
            .await?;
        let plan = generate_execution_plan(amount, &policy, &seed)?;

        let (start, in_progress) = match options.resume {
            Some(point) => {
                check_resume_point(&point, &plan)?;
                (point.next_index, point.in_progress)
            },
            None => (0, None),
        };

        // A released split has already left the vault
        let mut remaining = plan.remaining_from(start);
        if in_progress.and_then(|p| p.release()).is_some() {
            remaining -= plan.splits[start];
        }
        if remaining > balance {
            return Err(HydentitySdkError::InsufficientVaultBalance {
                requested: remaining,
                available: balance,
            });
        }

        debug!(
            domain,
            policy_nonce = policy.policy_nonce,
            start,
            remaining,
            "claim prepared"
        );
        Ok(PreparedClaim {
            vault,
            plan,
            start,
            in_progress,
        })
    }

    /// Run split `index`, recording each irreversible step in `progress` as
    /// it lands so a failure further on never loses it. Steps already in
    /// `progress` are skipped, along with the delay.
    async fn execute_split(
        &self,
        vault: &NameVault,
        plan: &ExecutionPlan,
        index: usize,
        destination: Option<Pubkey>,
        options: &ClaimOptions,
        progress: &mut Option<SplitProgress>,
    ) -> Result<TransactionReceipt> {
        let cancel = &options.cancel;
        let amount = plan.splits[index];

        if progress.is_none() {
            if index > 0 {
                wait(plan.delay_before(index), cancel).await?;
            }
            if let Some(mode) = options.release {
                checkpoint(cancel)?;
                let release = self.release(vault, amount, mode).await?;
                *progress = Some(SplitProgress::Released { release });
            }
        }

        let landed = *progress;
        let (release, deposit) = match landed {
            Some(SplitProgress::Deposited { release, deposit }) => (release, deposit),
            released => {
                checkpoint(cancel)?;
                let deposit = self.mixer.deposit_into_mixer(amount).await?;
                debug!(index, amount, signature = %deposit.signature, "split deposited");
                let release = released.and_then(|p| p.release());
                *progress = Some(SplitProgress::Deposited { release, deposit });
                (release, deposit)
            },
        };

        let withdrawal = if options.withdraw_to_recipients {
            checkpoint(cancel)?;
            let recipient = destination.or_else(|| plan.recipients.get(index).copied());
            Some(self.mixer.withdraw(deposit.amount, recipient).await?)
        } else {
            None
        };

        Ok(TransactionReceipt {
            index,
            signature: deposit.signature,
            amount: deposit.amount,
            release,
            withdrawal,
        })
    }

    /// Move `amount` from the vault to the claimant so the bridge can deposit it
    async fn release(
        &self,
        vault: &NameVault,
        amount: Amount,
        options: TransactionOptions,
    ) -> Result<Signature> {
        let claimant = self.signer.pubkey();
        let tx = vault
            .withdraw_direct(claimant)
            .with_amount(amount)
            .build_transaction()?;

        match self.pipeline.process_transaction(tx, options).await? {
            TransactionOutcome::Submitted(signature) => Ok(signature),
            TransactionOutcome::Forwarded(never) => match never {},
            TransactionOutcome::Built(_) | TransactionOutcome::Signed(_) => Err(
                HydentitySdkError::NotConfigured("vault release needs a submitting transaction mode"),
            ),
        }
    }
}

fn check_resume_point(point: &ResumePoint, plan: &ExecutionPlan) -> Result<()> {
    if point.plan_digest != plan.digest() || point.next_index > plan.split_count() {
        return Err(HydentitySdkError::PlanMismatch);
    }
    if let Some(progress) = point.in_progress {
        let split = plan.splits.get(point.next_index).copied();
        let deposited = progress.deposit().map(|d| d.amount);
        if split.is_none() || deposited.is_some_and(|amount| Some(amount) != split) {
            return Err(HydentitySdkError::PlanMismatch);
        }
    }
    Ok(())
}

fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(HydentitySdkError::Cancelled);
    }
    Ok(())
}

/// Sleep at least `delay`, or until cancelled.
async fn wait(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    checkpoint(cancel)?;
    if delay.is_zero() {
        return Ok(());
    }
    debug!(delay_secs = delay.as_secs(), "waiting before next split");
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(HydentitySdkError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
