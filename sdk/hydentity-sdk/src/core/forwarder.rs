use async_trait::async_trait;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::convert::Infallible;
use std::error::Error;
use std::sync::Arc;

use crate::core::connection::SolConnection;

/// Submits an already-signed transaction somewhere: an RPC node, a relayer,
/// a bundle service. `Output` is whatever that destination hands back.
#[async_trait]
pub trait TransactionForwarder: Send + Sync {
    type Output: Send;

    async fn forward(&self, tx: &Transaction) -> Result<Self::Output, Box<dyn Error + Send + Sync>>;
}

/// Default forwarder: `send_transaction` on the RPC connection.
pub struct ConnectionForwarder<C: ?Sized> {
    connection: Arc<C>,
}

impl<C: SolConnection + ?Sized> ConnectionForwarder<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl<C: SolConnection + ?Sized> TransactionForwarder for ConnectionForwarder<C> {
    type Output = Signature;

    async fn forward(&self, tx: &Transaction) -> Result<Signature, Box<dyn Error + Send + Sync>> {
        self.connection.send_transaction(tx).await
    }
}

/// Placeholder for pipelines built without a custom forwarder.
pub struct NoForwarder;

#[async_trait]
impl TransactionForwarder for NoForwarder {
    type Output = Infallible;

    async fn forward(&self, _tx: &Transaction) -> Result<Infallible, Box<dyn Error + Send + Sync>> {
        Err("no transaction forwarder configured".into())
    }
}
