use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;

/// Abstraction for an entity that can sign messages/transactions.
/// This allows the SDK to work with:
/// 1. Local Keypairs (Backend/CLI)
/// 2. Wallet Adapters (Frontend - interactive signing)
#[async_trait]
pub trait HydentitySigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Sign a message.
    /// Returns Err if not supported or failed.
    async fn sign_message(&self, message: &[u8]) -> Result<Signature, String>;

    /// Sign `tx` in the slot reserved for this signer's pubkey.
    ///
    /// The default signs the serialized message through [`sign_message`](Self::sign_message).
    /// Wallet adapters that only sign whole transactions override this.
    async fn sign_transaction(&self, mut tx: Transaction) -> Result<Transaction, String> {
        let pubkey = self.pubkey();
        let required = tx.message.header.num_required_signatures as usize;
        let position = tx
            .message
            .account_keys
            .iter()
            .take(required)
            .position(|key| *key == pubkey)
            .ok_or_else(|| format!("{} is not a required signer of this transaction", pubkey))?;

        if tx.signatures.len() < required {
            tx.signatures.resize(required, Signature::default());
        }
        let signature = self.sign_message(&tx.message_data()).await?;
        tx.signatures[position] = signature;
        Ok(tx)
    }
}

#[async_trait]
impl HydentitySigner for Keypair {
    fn pubkey(&self) -> Pubkey {
        Signer::pubkey(self)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, String> {
        Ok(Signer::sign_message(self, message))
    }
}
