mod common;

use assert_matches::assert_matches;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use common::{MockConnection, MockMixer, RENT_EXEMPT_MINIMUM};
use hydentity_sdk::config::MixerConfig;
use hydentity_sdk::error::HydentitySdkError;
use hydentity_sdk::mixer::{
    FeeSchedule, HttpMixerBridge, IdentityBridge, MixerBridge, MixerBridgeCache, PoolIdentity,
};
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

//=============================================================================
// Fake relayer
//=============================================================================

#[derive(Default)]
struct RelayerState {
    balance: u64,
    fee_requests: usize,
    flaky_balance_responses: usize,
    deposits: Vec<Value>,
    withdrawals: Vec<Value>,
}

type Relayer = Arc<Mutex<RelayerState>>;

async fn fees(State(relayer): State<Relayer>) -> Json<Value> {
    relayer.lock().unwrap().fee_requests += 1;
    Json(json!({ "feeRate": 0.0035, "flatFee": 6_000_000u64 }))
}

async fn balance(State(relayer): State<Relayer>, Path(_identity): Path<String>) -> Response {
    let mut state = relayer.lock().unwrap();
    if state.flaky_balance_responses > 0 {
        state.flaky_balance_responses -= 1;
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(json!({ "balance": state.balance })).into_response()
}

async fn deposit(State(relayer): State<Relayer>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = relayer.lock().unwrap();
    let amount = body["amount"].as_u64().unwrap_or_default();
    state.balance += amount;
    state.deposits.push(body);
    Json(json!({ "signature": Signature::new_unique().to_string(), "amount": amount }))
}

async fn withdraw(State(relayer): State<Relayer>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = relayer.lock().unwrap();
    state.balance -= body["amount"].as_u64().unwrap_or_default();
    state.withdrawals.push(body);
    Json(json!({ "signature": Signature::new_unique().to_string() }))
}

async fn spawn_relayer(state: RelayerState) -> (String, Relayer) {
    let relayer: Relayer = Arc::new(Mutex::new(state));
    let app = Router::new()
        .route("/v1/fees", get(fees))
        .route("/v1/pool/:identity/balance", get(balance))
        .route("/v1/pool/deposit", post(deposit))
        .route("/v1/pool/withdraw", post(withdraw))
        .with_state(relayer.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), relayer)
}

fn mixer_config(base_url: String) -> MixerConfig {
    MixerConfig {
        base_url,
        timeout_secs: 5,
        max_retries: 3,
        fees: None,
    }
}

async fn connect_bridge(
    base_url: String,
    spendable: u64,
) -> (HttpMixerBridge, Arc<MockConnection>, Pubkey) {
    let connection = Arc::new(MockConnection::new());
    let source = Pubkey::new_unique();
    connection.set_lamports(source, spendable + RENT_EXEMPT_MINIMUM);
    let bridge = HttpMixerBridge::connect(
        mixer_config(base_url),
        PoolIdentity::from_bytes([1; 32]),
        source,
        connection.clone(),
    )
    .await
    .unwrap();
    (bridge, connection, source)
}

//=============================================================================
// HTTP bridge
//=============================================================================

#[tokio::test]
async fn test_connect_fetches_fee_schedule() {
    let (base_url, relayer) = spawn_relayer(RelayerState::default()).await;
    let (bridge, _, _) = connect_bridge(base_url, 0).await;

    assert_eq!(bridge.fees(), FeeSchedule::new(3_500, 6_000_000));
    assert_eq!(relayer.lock().unwrap().fee_requests, 1);
}

#[tokio::test]
async fn test_configured_fees_skip_fetch() {
    let (base_url, relayer) = spawn_relayer(RelayerState::default()).await;
    let config = MixerConfig {
        fees: Some(FeeSchedule::new(1_000, 0)),
        ..mixer_config(base_url)
    };
    let bridge = HttpMixerBridge::connect(
        config,
        PoolIdentity::from_bytes([2; 32]),
        Pubkey::new_unique(),
        Arc::new(MockConnection::new()),
    )
    .await
    .unwrap();

    assert_eq!(bridge.fees(), FeeSchedule::new(1_000, 0));
    assert_eq!(relayer.lock().unwrap().fee_requests, 0);
}

#[tokio::test]
async fn test_deposit_then_withdraw_applies_relayer_fee() {
    let (base_url, relayer) = spawn_relayer(RelayerState::default()).await;
    let (bridge, _, source) = connect_bridge(base_url, 2_000_000_000).await;
    let recipient = Pubkey::new_unique();

    let deposit = bridge.deposit_into_mixer(1_000_000_000).await.unwrap();
    assert_eq!(deposit.amount, 1_000_000_000);
    assert_eq!(bridge.get_balance().await.unwrap(), 1_000_000_000);

    let receipt = bridge.withdraw(1_000_000_000, Some(recipient)).await.unwrap();
    assert_eq!(receipt.fee, 9_500_000);
    assert_eq!(receipt.amount_received, 990_500_000);
    assert_eq!(receipt.recipient, Some(recipient));

    let state = relayer.lock().unwrap();
    assert_eq!(state.deposits[0]["source"], json!(source.to_string()));
    assert_eq!(state.deposits[0]["identity"], json!(hex::encode([1u8; 32])));
    assert_eq!(state.withdrawals[0]["recipient"], json!(recipient.to_string()));
    assert_eq!(state.balance, 0);
}

#[tokio::test]
async fn test_withdraw_without_recipient_omits_field() {
    let (base_url, relayer) = spawn_relayer(RelayerState {
        balance: 50_000_000,
        ..RelayerState::default()
    })
    .await;
    let (bridge, _, _) = connect_bridge(base_url, 0).await;

    let receipt = bridge.withdraw(50_000_000, None).await.unwrap();
    assert_eq!(receipt.recipient, None);
    assert!(relayer.lock().unwrap().withdrawals[0].get("recipient").is_none());
}

#[tokio::test]
async fn test_deposit_checks_source_balance_first() {
    let (base_url, relayer) = spawn_relayer(RelayerState::default()).await;
    let (bridge, _, _) = connect_bridge(base_url, 500).await;

    let result = bridge.deposit_into_mixer(501).await;
    assert_matches!(
        result,
        Err(HydentitySdkError::InsufficientFunds {
            requested: 501,
            available: 500
        })
    );
    assert!(relayer.lock().unwrap().deposits.is_empty());
}

#[tokio::test]
async fn test_withdraw_checks_pool_balance_first() {
    let (base_url, relayer) = spawn_relayer(RelayerState {
        balance: 10,
        ..RelayerState::default()
    })
    .await;
    let (bridge, _, _) = connect_bridge(base_url, 0).await;

    let result = bridge.withdraw(1_000_000_000, None).await;
    assert_matches!(
        result,
        Err(HydentitySdkError::InsufficientPoolBalance {
            requested: 1_000_000_000,
            available: 10
        })
    );
    assert!(relayer.lock().unwrap().withdrawals.is_empty());
}

#[tokio::test]
async fn test_balance_query_retries_transient_errors() {
    let (base_url, _) = spawn_relayer(RelayerState {
        balance: 77,
        flaky_balance_responses: 2,
        ..RelayerState::default()
    })
    .await;
    let (bridge, _, _) = connect_bridge(base_url, 0).await;

    assert_eq!(bridge.get_balance().await.unwrap(), 77);
}

#[tokio::test]
async fn test_balance_query_gives_up_after_max_retries() {
    let (base_url, _) = spawn_relayer(RelayerState {
        flaky_balance_responses: 10,
        ..RelayerState::default()
    })
    .await;
    let (bridge, _, _) = connect_bridge(base_url, 0).await;

    let err = bridge.get_balance().await.unwrap_err();
    assert!(err.is_retryable());
}

//=============================================================================
// Per-identity cache
//=============================================================================

#[tokio::test]
async fn test_cache_keeps_one_bridge_per_identity() {
    let cache = MixerBridgeCache::new();
    let inits = AtomicUsize::new(0);
    let alice = PoolIdentity::from_bytes([1; 32]);
    let bob = PoolIdentity::from_bytes([2; 32]);

    let init = |identity: PoolIdentity| {
        inits.fetch_add(1, Ordering::SeqCst);
        async move {
            Ok::<_, HydentitySdkError>(Arc::new(MockMixer::new(identity)) as Arc<dyn MixerBridge>)
        }
    };

    let first = cache.get_or_try_init(alice, || init(alice)).await.unwrap();
    let second = cache.get_or_try_init(alice, || init(alice)).await.unwrap();
    let other = cache.get_or_try_init(bob, || init(bob)).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(inits.load(Ordering::SeqCst), 2);
    assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn test_failed_init_is_not_cached() {
    let cache = MixerBridgeCache::new();
    let identity = PoolIdentity::from_bytes([3; 32]);

    let result = cache
        .get_or_try_init(identity, || async {
            Err::<Arc<dyn MixerBridge>, _>(HydentitySdkError::NetworkFailure(
                "relayer down".to_string(),
            ))
        })
        .await;
    assert!(result.is_err());
    assert!(cache.is_empty().await);

    cache
        .get_or_try_init(identity, || async {
            Ok::<_, HydentitySdkError>(Arc::new(MockMixer::new(identity)) as Arc<dyn MixerBridge>)
        })
        .await
        .unwrap();
    assert_eq!(cache.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_session_setup_does_not_block_other_identities() {
    let cache = Arc::new(MixerBridgeCache::new());
    let alice = PoolIdentity::from_bytes([6; 32]);
    let bob = PoolIdentity::from_bytes([7; 32]);

    let stalled = cache.clone();
    let alice_setup = tokio::spawn(async move {
        stalled
            .get_or_try_init(alice, || {
                std::future::pending::<Result<Arc<dyn MixerBridge>, HydentitySdkError>>()
            })
            .await
            .map(|_| ())
    });
    tokio::task::yield_now().await;

    let bob_bridge = tokio::time::timeout(
        Duration::from_secs(2),
        cache.get_or_try_init(bob, || async move {
            Ok::<_, HydentitySdkError>(Arc::new(MockMixer::new(bob)) as Arc<dyn MixerBridge>)
        }),
    )
    .await
    .expect("bob's setup waited on alice's")
    .unwrap();

    assert_eq!(bob_bridge.identity(), bob);
    assert_eq!(cache.len().await, 1);
    assert!(cache.get(&alice).await.is_none());
    assert!(!alice_setup.is_finished());
    alice_setup.abort();
}

#[tokio::test]
async fn test_concurrent_callers_share_one_setup() {
    let cache = MixerBridgeCache::new();
    let inits = AtomicUsize::new(0);
    let identity = PoolIdentity::from_bytes([8; 32]);

    let init = || {
        inits.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::task::yield_now().await;
            Ok::<_, HydentitySdkError>(Arc::new(MockMixer::new(identity)) as Arc<dyn MixerBridge>)
        }
    };

    let (a, b) = tokio::join!(
        cache.get_or_try_init(identity, init),
        cache.get_or_try_init(identity, init),
    );

    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(inits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_evict_forces_fresh_session() {
    let cache = MixerBridgeCache::new();
    let identity = PoolIdentity::from_bytes([4; 32]);
    let make = || async move {
        Ok::<_, HydentitySdkError>(Arc::new(MockMixer::new(identity)) as Arc<dyn MixerBridge>)
    };

    let before = cache.get_or_try_init(identity, make).await.unwrap();
    assert!(cache.evict(&identity).await);
    assert!(!cache.evict(&identity).await);
    assert!(cache.get(&identity).await.is_none());

    let after = cache.get_or_try_init(identity, make).await.unwrap();
    assert!(!Arc::ptr_eq(&before, &after));

    // Evicted handles keep working for claims that hold them
    before.deposit_into_mixer(10).await.unwrap();

    cache.clear().await;
    assert!(cache.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_identity_bridge_serializes_deposits() {
    let mixer = Arc::new(
        MockMixer::new(PoolIdentity::from_bytes([5; 32]))
            .with_deposit_latency(Duration::from_millis(50)),
    );
    let shared = Arc::new(IdentityBridge::new(mixer.clone()));

    let (a, b, c) = tokio::join!(
        shared.deposit_into_mixer(1),
        shared.deposit_into_mixer(2),
        shared.deposit_into_mixer(3),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    assert_eq!(mixer.max_in_flight(), 1);
    assert_eq!(mixer.deposits().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_unserialized_mixer_would_interleave() {
    let mixer = Arc::new(
        MockMixer::new(PoolIdentity::from_bytes([6; 32]))
            .with_deposit_latency(Duration::from_millis(50)),
    );

    let (a, b) = tokio::join!(mixer.deposit_into_mixer(1), mixer.deposit_into_mixer(2));
    a.unwrap();
    b.unwrap();

    assert_eq!(mixer.max_in_flight(), 2);
}
