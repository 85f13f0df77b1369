//! Custodia demo scenario runner
//!
//! Drives the policy engine and the savings vault through the full demo
//! flow the original parent/child/merchant apps exercised: register and
//! configure a child, pay up to the daily cap, request and approve a temp
//! grant, then run the vault deposit / early release / timed withdraw
//! paths. Every decision is logged; domain events are drained from the
//! broadcast channel and printed the way the websocket fan-out would see
//! them.
//!
//! ```bash
//! RUST_LOG=info cargo run -p custodia-demo
//! ```

use anyhow::Result;
use chrono::{Duration, Utc};
use custodia_ledger::Ledger;
use custodia_types::{AccountId, Amount, SpendingLimits};
use custodia_vault::SavingsVault;
use custodia_wallet::SpendingWallet;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting Custodia demo scenario...");

    let ledger = Ledger::new();
    let wallet = SpendingWallet::new(ledger.clone());
    let vault = SavingsVault::new(ledger.clone());

    let parent = AccountId::new();
    let child = AccountId::new();
    let merchant = AccountId::new();

    // Drain domain events the way the websocket fan-out would
    let mut events = wallet.subscribe();
    let fan_out = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(?event, "event broadcast");
        }
    });

    // Seed balances (the original demo used pre-funded chain accounts)
    ledger.deposit(&parent, Amount::new(1_000)).await?;
    ledger.deposit(&child, Amount::new(100)).await?;

    // Parent configures the child: caps, whitelist
    wallet.add_child(parent, child).await?;
    wallet
        .set_limits(&parent, &child, SpendingLimits::new(Amount::new(10), Amount::new(20)))
        .await?;
    wallet.set_merchant(parent, merchant, true).await;

    // Child spends to the daily cap
    let now = Utc::now();
    wallet.pay(&child, &merchant, Amount::new(8), now).await?;
    wallet.pay(&child, &merchant, Amount::new(8), now).await?;
    if let Err(rejection) = wallet.pay(&child, &merchant, Amount::new(8), now).await {
        warn!(%rejection, "payment rejected as expected");
    }

    // Child asks for more; parent approves a one-hour grant of 10
    wallet.request_temp_limit(child, Amount::new(10)).await;
    wallet
        .approve_temp(&parent, &child, Amount::new(10), 3600, now)
        .await?;
    wallet.pay(&child, &merchant, Amount::new(8), now).await?;

    let (spent, day) = wallet.daily_spent(&child, now).await;
    info!(%spent, day, "daily window after grant-backed payment");

    // Savings vault: lock 50 for the child, show the timelock, then the
    // parent's unconditional early release
    let unlock_at = now + Duration::hours(24);
    vault.deposit_for(&parent, &child, unlock_at, Amount::new(50)).await?;
    if let Err(rejection) = vault.child_withdraw(&child, now).await {
        warn!(%rejection, "withdrawal rejected as expected");
    }
    vault.release_to_child(&parent, &child).await?;

    // Second batch matures in the past relative to the withdrawal attempt
    vault
        .deposit_for(&parent, &child, now - Duration::hours(1), Amount::new(25))
        .await?;
    let paid = vault.child_withdraw(&child, now).await?;
    info!(%paid, "matured vault balance withdrawn");

    info!(
        child_balance = %ledger.balance(&child).await,
        merchant_balance = %ledger.balance(&merchant).await,
        parent_balance = %ledger.balance(&parent).await,
        "final balances"
    );

    fan_out.abort();
    Ok(())
}
