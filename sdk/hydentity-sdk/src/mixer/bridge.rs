use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::MixerConfig;
use crate::core::connection::SolConnection;
use crate::error::{HydentitySdkError, Result};
use crate::mixer::fees::FeeSchedule;
use crate::mixer::identity::PoolIdentity;
use crate::types::{Amount, DepositReceipt, WithdrawReceipt};

/// Client-side contract of the privacy pool.
///
/// One bridge speaks for one [`PoolIdentity`]. Implementations check balances
/// immediately before submitting, but do not serialize calls themselves; see
/// [`IdentityBridge`](crate::mixer::cache::IdentityBridge) for that.
#[async_trait]
pub trait MixerBridge: Send + Sync {
    fn identity(&self) -> PoolIdentity;

    /// Move `amount` from the claim source into the pool.
    async fn deposit_into_mixer(&self, amount: Amount) -> Result<DepositReceipt>;

    /// Pull `amount` out of the pool, to `recipient` or back to the claimant.
    /// The relayer fee is deducted from `amount`.
    async fn withdraw(&self, amount: Amount, recipient: Option<Pubkey>) -> Result<WithdrawReceipt>;

    async fn get_balance(&self) -> Result<Amount>;
}

//=============================================================================
// Relayer wire types
//=============================================================================

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeesResponse {
    fee_rate: f64,
    flat_fee: u64,
}

#[derive(Clone, Debug, Deserialize)]
struct BalanceResponse {
    balance: u64,
}

#[derive(Clone, Debug, Serialize)]
struct DepositRequest {
    identity: String,
    source: String,
    amount: u64,
}

#[derive(Clone, Debug, Deserialize)]
struct DepositResponse {
    signature: String,
    amount: u64,
}

#[derive(Clone, Debug, Serialize)]
struct WithdrawRequest {
    identity: String,
    amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    recipient: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct WithdrawResponse {
    signature: String,
}

//=============================================================================
// HTTP bridge
//=============================================================================

/// [`MixerBridge`] over the relayer's JSON API.
///
/// Deposits are funded from `source`; its spendable balance is its lamports
/// above the rent-exempt minimum for its data size.
pub struct HttpMixerBridge {
    config: MixerConfig,
    http_client: reqwest::Client,
    identity: PoolIdentity,
    source: Pubkey,
    connection: Arc<dyn SolConnection>,
    fees: FeeSchedule,
}

impl HttpMixerBridge {
    /// Set up a session for `identity`. Fetches the fee schedule unless the
    /// config carries one.
    pub async fn connect(
        config: MixerConfig,
        identity: PoolIdentity,
        source: Pubkey,
        connection: Arc<dyn SolConnection>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(HydentitySdkError::network)?;

        let mut bridge = Self {
            fees: config.fees.unwrap_or_default(),
            config,
            http_client,
            identity,
            source,
            connection,
        };

        if bridge.config.fees.is_none() {
            bridge.fees = bridge.fetch_fees().await?;
        }
        info!(
            identity = %identity,
            base_url = %bridge.config.base_url,
            fee_rate_ppm = bridge.fees.fee_rate_ppm,
            flat_fee = bridge.fees.flat_fee,
            "mixer session ready"
        );
        Ok(bridge)
    }

    pub fn fees(&self) -> FeeSchedule {
        self.fees
    }

    pub async fn fetch_fees(&self) -> Result<FeeSchedule> {
        let url = format!("{}/v1/fees", self.config.base_url);
        let response: FeesResponse = self.get(&url).await?;
        FeeSchedule::from_rate(response.fee_rate, response.flat_fee)
    }

    async fn source_balance(&self) -> Result<Amount> {
        let account = self
            .connection
            .get_account(&self.source)
            .await
            .map_err(HydentitySdkError::network)?
            .ok_or(HydentitySdkError::AccountNotFound(self.source))?;
        let rent = self
            .connection
            .get_minimum_balance_for_rent_exemption(account.data.len())
            .await
            .map_err(HydentitySdkError::network)?;
        Ok(account.lamports.saturating_sub(rent))
    }

    //=========================================================================
    // HTTP helpers
    //=========================================================================

    /// GET with exponential backoff on transport errors, 429 and 5xx.
    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt - 1))).await;
            }
            match self.http_client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json()
                            .await
                            .map_err(|e| HydentitySdkError::Mixer(format!("invalid response: {}", e)));
                    }
                    if status.as_u16() == 429 || status.is_server_error() {
                        warn!(url, %status, attempt, "relayer request failed, retrying");
                        last_error = Some(HydentitySdkError::NetworkFailure(format!("HTTP {}", status)));
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    return Err(HydentitySdkError::Mixer(format!("HTTP {}: {}", status, body)));
                },
                Err(e) => {
                    warn!(url, error = %e, attempt, "relayer unreachable, retrying");
                    last_error = Some(HydentitySdkError::network(e));
                },
            }
        }

        Err(last_error
            .unwrap_or_else(|| HydentitySdkError::NetworkFailure("max retries exceeded".into())))
    }

    /// POST once. Deposits and withdrawals move funds and are not replayed here.
    async fn post<T: serde::de::DeserializeOwned, R: Serialize>(
        &self,
        url: &str,
        body: &R,
    ) -> Result<T> {
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(HydentitySdkError::network)?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| HydentitySdkError::Mixer(format!("invalid response: {}", e)));
        }
        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            Err(HydentitySdkError::NetworkFailure(format!("HTTP {}: {}", status, body)))
        } else {
            Err(HydentitySdkError::Mixer(format!("HTTP {}: {}", status, body)))
        }
    }
}

fn parse_signature(raw: &str) -> Result<Signature> {
    Signature::from_str(raw)
        .map_err(|e| HydentitySdkError::Mixer(format!("bad signature {}: {}", raw, e)))
}

#[async_trait]
impl MixerBridge for HttpMixerBridge {
    fn identity(&self) -> PoolIdentity {
        self.identity
    }

    async fn deposit_into_mixer(&self, amount: Amount) -> Result<DepositReceipt> {
        if amount == 0 {
            return Err(HydentitySdkError::InvalidAmount(
                "deposit amount must be greater than zero".to_string(),
            ));
        }

        let available = self.source_balance().await?;
        if available < amount {
            return Err(HydentitySdkError::InsufficientFunds {
                requested: amount,
                available,
            });
        }

        let url = format!("{}/v1/pool/deposit", self.config.base_url);
        let request = DepositRequest {
            identity: self.identity.to_hex(),
            source: self.source.to_string(),
            amount,
        };
        let response: DepositResponse = self.post(&url, &request).await?;
        let signature = parse_signature(&response.signature)?;

        info!(identity = %self.identity, amount = response.amount, %signature, "deposited into pool");
        Ok(DepositReceipt {
            signature,
            amount: response.amount,
        })
    }

    async fn withdraw(&self, amount: Amount, recipient: Option<Pubkey>) -> Result<WithdrawReceipt> {
        let available = self.get_balance().await?;
        if available < amount {
            return Err(HydentitySdkError::InsufficientPoolBalance {
                requested: amount,
                available,
            });
        }
        let breakdown = self.fees.breakdown(amount)?;

        let url = format!("{}/v1/pool/withdraw", self.config.base_url);
        let request = WithdrawRequest {
            identity: self.identity.to_hex(),
            amount,
            recipient: recipient.map(|r| r.to_string()),
        };
        let response: WithdrawResponse = self.post(&url, &request).await?;
        let signature = parse_signature(&response.signature)?;

        info!(
            identity = %self.identity,
            amount,
            fee = breakdown.fee,
            recipient = ?recipient,
            %signature,
            "withdrew from pool"
        );
        Ok(WithdrawReceipt {
            signature,
            amount_received: breakdown.amount_received,
            fee: breakdown.fee,
            recipient,
        })
    }

    async fn get_balance(&self) -> Result<Amount> {
        let url = format!(
            "{}/v1/pool/{}/balance",
            self.config.base_url,
            self.identity.to_hex()
        );
        let response: BalanceResponse = self.get(&url).await?;
        debug!(identity = %self.identity, balance = response.balance, "pool balance");
        Ok(response.balance)
    }
}
