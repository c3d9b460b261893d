use serde::{Deserialize, Serialize};
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use tracing::debug;

use crate::core::connection::SolConnection;
use crate::core::forwarder::{ConnectionForwarder, NoForwarder, TransactionForwarder};
use crate::core::signer::HydentitySigner;
use crate::error::{HydentitySdkError, Result};

/// What `process_transaction` does with a built transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransactionMode {
    /// Return it as built
    Raw,
    /// Return it with a fresh recent blockhash
    Prepared,
    /// Sign, don't submit
    Signed,
    /// Sign, then hand to the custom forwarder
    Forwarder,
    /// Sign, then submit over the RPC connection
    #[default]
    Connection,
}

impl TransactionMode {
    pub fn requires_signer(self) -> bool {
        matches!(self, Self::Signed | Self::Forwarder | Self::Connection)
    }

    pub fn submits(self) -> bool {
        matches!(self, Self::Forwarder | Self::Connection)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionOptions {
    pub mode: TransactionMode,
}

impl TransactionOptions {
    pub fn new(mode: TransactionMode) -> Self {
        Self { mode }
    }
}

/// Terminal state of a processed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome<T> {
    Built(Transaction),
    Signed(Transaction),
    Submitted(Signature),
    Forwarded(T),
}

impl<T> TransactionOutcome<T> {
    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            Self::Built(tx) | Self::Signed(tx) => Some(tx),
            _ => None,
        }
    }

    pub fn signature(&self) -> Option<Signature> {
        match self {
            Self::Submitted(signature) => Some(*signature),
            _ => None,
        }
    }
}

/// Unsigned transaction carrying `instructions`, paid by `payer`.
pub fn build_transaction(instructions: &[Instruction], payer: &Pubkey) -> Transaction {
    Transaction::new_unsigned(Message::new(instructions, Some(payer)))
}

/// Capabilities each mode actually uses
enum Dispatch<'a, F> {
    Raw,
    Prepared,
    Sign {
        signer: &'a dyn HydentitySigner,
    },
    Forward {
        signer: &'a dyn HydentitySigner,
        forwarder: &'a F,
    },
    Submit {
        signer: &'a dyn HydentitySigner,
    },
}

/// Build once; sign and submit per [`TransactionMode`].
pub struct TransactionPipeline<C: ?Sized, F = NoForwarder> {
    connection: Arc<C>,
    signer: Option<Arc<dyn HydentitySigner>>,
    forwarder: Option<Arc<F>>,
}

impl<C: SolConnection + ?Sized> TransactionPipeline<C, NoForwarder> {
    pub fn new(connection: Arc<C>) -> Self {
        Self {
            connection,
            signer: None,
            forwarder: None,
        }
    }
}

impl<C, F> TransactionPipeline<C, F>
where
    C: SolConnection + ?Sized,
    F: TransactionForwarder,
{
    pub fn with_signer(mut self, signer: Arc<dyn HydentitySigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn with_forwarder<G: TransactionForwarder>(
        self,
        forwarder: Arc<G>,
    ) -> TransactionPipeline<C, G> {
        TransactionPipeline {
            connection: self.connection,
            signer: self.signer,
            forwarder: Some(forwarder),
        }
    }

    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }

    pub fn signer(&self) -> Option<&Arc<dyn HydentitySigner>> {
        self.signer.as_ref()
    }

    fn dispatch(&self, mode: TransactionMode) -> Result<Dispatch<'_, F>> {
        let signer = || {
            self.signer
                .as_deref()
                .ok_or(HydentitySdkError::NotConfigured("signer"))
        };
        Ok(match mode {
            TransactionMode::Raw => Dispatch::Raw,
            TransactionMode::Prepared => Dispatch::Prepared,
            TransactionMode::Signed => Dispatch::Sign { signer: signer()? },
            TransactionMode::Forwarder => Dispatch::Forward {
                signer: signer()?,
                forwarder: self
                    .forwarder
                    .as_deref()
                    .ok_or(HydentitySdkError::NotConfigured("transaction forwarder"))?,
            },
            TransactionMode::Connection => Dispatch::Submit { signer: signer()? },
        })
    }

    /// Drive `tx` to the terminal state of `options.mode`.
    ///
    /// Missing capabilities fail with `NotConfigured` before any network call.
    /// Signing modes replace the blockhash first; the signed transaction is
    /// not touched afterwards.
    pub async fn process_transaction(
        &self,
        tx: Transaction,
        options: TransactionOptions,
    ) -> Result<TransactionOutcome<F::Output>> {
        let dispatch = self.dispatch(options.mode)?;
        debug!(mode = ?options.mode, "processing transaction");

        match dispatch {
            Dispatch::Raw => Ok(TransactionOutcome::Built(tx)),
            Dispatch::Prepared => Ok(TransactionOutcome::Built(self.prepare(tx).await?)),
            Dispatch::Sign { signer } => Ok(TransactionOutcome::Signed(self.sign(tx, signer).await?)),
            Dispatch::Forward { signer, forwarder } => {
                let signed = self.sign(tx, signer).await?;
                let output = forwarder
                    .forward(&signed)
                    .await
                    .map_err(HydentitySdkError::network)?;
                Ok(TransactionOutcome::Forwarded(output))
            },
            Dispatch::Submit { signer } => {
                let signed = self.sign(tx, signer).await?;
                let signature = ConnectionForwarder::new(self.connection.clone())
                    .forward(&signed)
                    .await
                    .map_err(HydentitySdkError::network)?;
                debug!(%signature, "transaction submitted");
                Ok(TransactionOutcome::Submitted(signature))
            },
        }
    }

    async fn prepare(&self, mut tx: Transaction) -> Result<Transaction> {
        let blockhash = self
            .connection
            .get_latest_blockhash()
            .await
            .map_err(HydentitySdkError::network)?;
        tx.message.recent_blockhash = blockhash;
        // Any earlier signatures covered the old message
        let required = tx.message.header.num_required_signatures as usize;
        tx.signatures = vec![Signature::default(); required];
        Ok(tx)
    }

    async fn sign(&self, tx: Transaction, signer: &dyn HydentitySigner) -> Result<Transaction> {
        let prepared = self.prepare(tx).await?;
        signer
            .sign_transaction(prepared)
            .await
            .map_err(HydentitySdkError::Signing)
    }
}
