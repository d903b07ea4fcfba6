// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Funding Reconciler
//!
//! Background task that mirrors new users' token balances on-chain.
//! Registration only marks a user `pending`; this task performs the transfer
//! and records the outcome on the user record.
//!
//! ## Strategy
//!
//! Every `poll_interval` (default 30 s), or as soon as registration notifies
//! it, the reconciler:
//! 1. Lists all users whose funding is `pending`.
//! 2. Marks each one `submitting` before any transaction is signed. A user
//!    in that state is never picked up again, so a crash or a lost status
//!    write cannot lead to a second transfer.
//! 3. Transfers the user's token balance to their wallet address.
//! 4. Marks the user `funded` with the transaction hash, or `failed` with the
//!    reason. A network error before broadcast puts the user back to
//!    `pending` for the next sweep. A broadcast without a reply marks the
//!    user `unconfirmed` for manual follow-up.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::blockchain::{FundingError, TokenAllocator};
use crate::storage::{FundingStatus, UserDatabase};

/// Outcome counts of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub funded: usize,
    pub failed: usize,
    /// Left pending after a network error
    pub deferred: usize,
    /// Broadcast with unknown outcome
    pub unconfirmed: usize,
}

/// Background reconciler driving a [`TokenAllocator`] for pending users.
pub struct FundingReconciler<A> {
    users: Arc<UserDatabase>,
    allocator: A,
    trigger: Arc<Notify>,
    poll_interval: Duration,
}

impl<A: TokenAllocator> FundingReconciler<A> {
    pub fn new(
        users: Arc<UserDatabase>,
        allocator: A,
        trigger: Arc<Notify>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            users,
            allocator,
            trigger,
            poll_interval,
        }
    }

    /// Run the reconciler loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(reconciler.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Funding reconciler starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Funding reconciler shutting down");
                return;
            }

            self.sweep().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = self.trigger.notified() => {},
                _ = shutdown.cancelled() => {
                    info!("Funding reconciler shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep over all pending users.
    pub async fn sweep(&self) -> SweepSummary {
        let mut summary = SweepSummary::default();

        let pending = match self.users.list_pending_funding() {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "Funding reconciler: failed to list pending users");
                return summary;
            }
        };

        if pending.is_empty() {
            return summary;
        }

        info!(count = pending.len(), "Funding reconciler: funding pending users");

        for user in pending {
            let Some(wallet) = user.wallet_address.as_deref() else {
                warn!(user_id = %user.id, "Funding reconciler: pending user has no wallet");
                self.record(
                    &user.id,
                    FundingStatus::Failed {
                        reason: "no wallet address".to_string(),
                    },
                );
                summary.failed += 1;
                continue;
            };

            if !self.record(&user.id, FundingStatus::Submitting) {
                summary.deferred += 1;
                continue;
            }

            match self.allocator.allocate_tokens(wallet, user.token_balance).await {
                Ok(receipt) => {
                    self.record(
                        &user.id,
                        FundingStatus::Funded {
                            tx_hash: receipt.tx_hash,
                        },
                    );
                    summary.funded += 1;
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        user_id = %user.id,
                        error = %e,
                        "Funding reconciler: network error, will retry"
                    );
                    self.record(&user.id, FundingStatus::Pending);
                    summary.deferred += 1;
                }
                Err(FundingError::BroadcastUnknown(reason)) => {
                    error!(
                        user_id = %user.id,
                        reason = %reason,
                        "Funding reconciler: broadcast outcome unknown, not retrying"
                    );
                    self.record(&user.id, FundingStatus::Unconfirmed { reason });
                    summary.unconfirmed += 1;
                }
                Err(e) => {
                    self.record(
                        &user.id,
                        FundingStatus::Failed {
                            reason: format!("{}: {}", e.kind(), e),
                        },
                    );
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Persist a funding status. Returns whether the write succeeded.
    ///
    /// A failed write after `submitting` leaves the user in that state, which
    /// the sweep never retries.
    fn record(&self, user_id: &str, status: FundingStatus) -> bool {
        match self.users.set_funding_status(user_id, status) {
            Ok(_) => true,
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Funding reconciler: failed to record outcome");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{FeeModel, TransferReceipt, WalletFunder};
    use crate::storage::StoredUser;
    use std::sync::Mutex;

    /// Allocator returning a scripted result per wallet.
    struct ScriptedAllocator {
        calls: Mutex<Vec<(String, u64)>>,
        result: fn(&str) -> Result<TransferReceipt, FundingError>,
    }

    impl ScriptedAllocator {
        fn new(result: fn(&str) -> Result<TransferReceipt, FundingError>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                result,
            }
        }
    }

    impl TokenAllocator for ScriptedAllocator {
        async fn allocate_tokens(&self, to: &str, amount: u64) -> Result<TransferReceipt, FundingError> {
            self.calls.lock().unwrap().push((to.to_string(), amount));
            (self.result)(to)
        }
    }

    fn receipt(_: &str) -> Result<TransferReceipt, FundingError> {
        Ok(TransferReceipt {
            tx_hash: "0xfeed".to_string(),
            network: "sepolia".to_string(),
            explorer_url: None,
        })
    }

    fn temp_db() -> (Arc<UserDatabase>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = UserDatabase::open(&dir.path().join("users.redb")).unwrap();
        (Arc::new(db), dir)
    }

    fn pending_user(db: &UserDatabase, email: &str, wallet: Option<&str>) -> StoredUser {
        let user = StoredUser::new(
            email.to_string(),
            "hash".to_string(),
            "Pending".to_string(),
            wallet.map(str::to_string),
            FundingStatus::Pending,
        );
        db.insert(&user).unwrap();
        user
    }

    /// Allocator recording the stored funding status seen mid-transfer.
    struct ObservingAllocator {
        users: Arc<UserDatabase>,
        user_id: String,
        seen: Mutex<Vec<FundingStatus>>,
    }

    impl TokenAllocator for ObservingAllocator {
        async fn allocate_tokens(&self, _to: &str, _amount: u64) -> Result<TransferReceipt, FundingError> {
            let stored = self.users.get_by_id(&self.user_id).unwrap().unwrap();
            self.seen.lock().unwrap().push(stored.funding);
            receipt("")
        }
    }

    fn reconciler<A: TokenAllocator>(db: Arc<UserDatabase>, allocator: A) -> FundingReconciler<A> {
        FundingReconciler::new(db, allocator, Arc::new(Notify::new()), Duration::from_secs(30))
    }

    #[tokio::test]
    async fn successful_transfer_marks_user_funded() {
        let (db, _dir) = temp_db();
        let user = pending_user(&db, "a@x.com", Some("0xabc"));
        let reconciler = reconciler(db.clone(), ScriptedAllocator::new(receipt));

        let summary = reconciler.sweep().await;
        assert_eq!(summary.funded, 1);

        let stored = db.get_by_id(&user.id).unwrap().unwrap();
        assert_eq!(
            stored.funding,
            FundingStatus::Funded {
                tx_hash: "0xfeed".into()
            }
        );
        assert_eq!(
            reconciler.allocator.calls.lock().unwrap().as_slice(),
            &[("0xabc".to_string(), 1000)]
        );
        assert_eq!(stored.token_balance, 1000);
    }

    #[tokio::test]
    async fn network_error_leaves_user_pending() {
        let (db, _dir) = temp_db();
        let user = pending_user(&db, "a@x.com", Some("0xabc"));
        let reconciler = reconciler(
            db.clone(),
            ScriptedAllocator::new(|_| Err(FundingError::Network("connection refused".into()))),
        );

        let summary = reconciler.sweep().await;
        assert_eq!(summary.deferred, 1);
        assert_eq!(
            db.get_by_id(&user.id).unwrap().unwrap().funding,
            FundingStatus::Pending
        );
    }

    #[tokio::test]
    async fn permanent_error_marks_user_failed() {
        let (db, _dir) = temp_db();
        let user = pending_user(&db, "a@x.com", Some("0xabc"));
        let reconciler = reconciler(
            db.clone(),
            ScriptedAllocator::new(|_| Err(FundingError::Reverted("execution reverted".into()))),
        );

        let summary = reconciler.sweep().await;
        assert_eq!(summary.failed, 1);

        match db.get_by_id(&user.id).unwrap().unwrap().funding {
            FundingStatus::Failed { reason } => assert!(reason.starts_with("reverted")),
            other => panic!("unexpected status {other:?}"),
        }
        assert!(db.list_pending_funding().unwrap().is_empty());
    }

    #[tokio::test]
    async fn pending_user_without_wallet_fails_without_transfer() {
        let (db, _dir) = temp_db();
        pending_user(&db, "a@x.com", None);
        let reconciler = reconciler(db.clone(), ScriptedAllocator::new(receipt));

        let summary = reconciler.sweep().await;
        assert_eq!(summary.failed, 1);
        assert!(reconciler.allocator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_sweeps_on_notify_and_stops_on_cancel() {
        let (db, _dir) = temp_db();
        let trigger = Arc::new(Notify::new());
        let reconciler = FundingReconciler::new(
            db.clone(),
            ScriptedAllocator::new(receipt),
            trigger.clone(),
            Duration::from_secs(3600),
        );
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(reconciler.run(shutdown.clone()));

        let user = pending_user(&db, "late@x.com", Some("0xabc"));
        trigger.notify_one();

        let mut funded = false;
        for _ in 0..50 {
            if matches!(
                db.get_by_id(&user.id).unwrap().unwrap().funding,
                FundingStatus::Funded { .. }
            ) {
                funded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(funded);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reconciler should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn user_is_marked_submitting_before_transfer() {
        let (db, _dir) = temp_db();
        let user = pending_user(&db, "a@x.com", Some("0xabc"));
        let allocator = ObservingAllocator {
            users: db.clone(),
            user_id: user.id.clone(),
            seen: Mutex::new(Vec::new()),
        };
        let reconciler = reconciler(db.clone(), allocator);

        reconciler.sweep().await;
        assert_eq!(
            reconciler.allocator.seen.lock().unwrap().as_slice(),
            &[FundingStatus::Submitting]
        );
    }

    #[tokio::test]
    async fn submitting_user_is_never_swept() {
        let (db, _dir) = temp_db();
        let user = pending_user(&db, "a@x.com", Some("0xabc"));
        db.set_funding_status(&user.id, FundingStatus::Submitting).unwrap();
        let reconciler = reconciler(db.clone(), ScriptedAllocator::new(receipt));

        assert_eq!(reconciler.sweep().await, SweepSummary::default());
        assert!(reconciler.allocator.calls.lock().unwrap().is_empty());
        assert_eq!(
            db.get_by_id(&user.id).unwrap().unwrap().funding,
            FundingStatus::Submitting
        );
    }

    #[tokio::test]
    async fn lost_broadcast_reply_is_not_resent() {
        let (db, _dir) = temp_db();
        let user = pending_user(&db, "a@x.com", Some("0x742d35cc6634c0532925a3b844bc9e7595f4ab12"));

        // Estimate, chain id and nonce answer; the raw transaction send gets
        // no reply.
        let asserter = alloy::providers::mock::Asserter::new();
        asserter.push_success(&"0xea60");
        asserter.push_success(&"0x1");
        asserter.push_success(&"0x1");
        let reconciler = reconciler(
            db.clone(),
            WalletFunder::mocked(FeeModel::Eip1559, asserter.clone()),
        );

        let summary = reconciler.sweep().await;
        assert_eq!(summary.unconfirmed, 1);
        assert_eq!(summary.deferred, 0);
        match db.get_by_id(&user.id).unwrap().unwrap().funding {
            FundingStatus::Unconfirmed { reason } => assert!(reason.starts_with("0x")),
            other => panic!("unexpected status {other:?}"),
        }

        // Any RPC call in a later sweep would consume this response.
        asserter.push_success(&"0xea60");
        assert_eq!(reconciler.sweep().await, SweepSummary::default());
        assert_eq!(asserter.read_q().len(), 1);
    }

    #[tokio::test]
    async fn unreachable_node_before_broadcast_requeues_user() {
        let (db, _dir) = temp_db();
        let user = pending_user(&db, "a@x.com", Some("0x742d35cc6634c0532925a3b844bc9e7595f4ab12"));
        let reconciler = reconciler(
            db.clone(),
            WalletFunder::mocked(FeeModel::Eip1559, alloy::providers::mock::Asserter::new()),
        );

        let summary = reconciler.sweep().await;
        assert_eq!(summary.deferred, 1);
        assert_eq!(
            db.get_by_id(&user.id).unwrap().unwrap().funding,
            FundingStatus::Pending
        );
        assert_eq!(db.list_pending_funding().unwrap().len(), 1);
    }
}
