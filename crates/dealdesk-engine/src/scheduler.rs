//! Periodic background jobs.
//!
//! Jobs run on a tokio interval; each iteration opens its own
//! transaction and selects work with `FOR UPDATE SKIP LOCKED`, so
//! concurrent process instances and restarts cannot double-process a
//! row. Iteration errors are logged and the loop continues.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use dealdesk_core::models::{
    BlockStatus, ChangeType, EntityKind, HistoryEntry, NotificationEvent,
};
use dealdesk_core::DealdeskResult;
use dealdesk_store::{repo, serializable_tx, SqlxResultExt};

use crate::blocks::release_unit_if_blocked;
use crate::notify::{dispatch, router, NotificationSink};

/// Actor id recorded on scheduler-driven history entries.
pub const SYSTEM_ACTOR: Uuid = Uuid::nil();

/// Days between hold reminders.
const REMINDER_PERIOD_DAYS: i64 = 7;

/// A periodic task with at-least-once semantics.
#[async_trait]
pub trait PeriodicJob: Send + Sync {
    fn name(&self) -> &'static str;
    fn period(&self) -> Duration;
    /// One iteration; returns the number of rows processed.
    async fn run_once(&self) -> DealdeskResult<u64>;
}

/// Spawn a job loop. The first tick fires immediately so restarts catch
/// up on overdue work without waiting a full period.
pub fn spawn(job: Arc<dyn PeriodicJob>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(job.period());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match job.run_once().await {
                Ok(0) => {}
                Ok(processed) => {
                    info!(job = job.name(), processed, "scheduler iteration complete");
                }
                Err(e) => {
                    error!(job = job.name(), "scheduler iteration failed: {e}");
                }
            }
        }
    })
}

/// Daily job: expire lapsed approved blocks and return their units to
/// inventory.
pub struct BlockExpiryJob {
    pool: PgPool,
    sink: Arc<dyn NotificationSink>,
}

impl BlockExpiryJob {
    pub fn new(pool: PgPool, sink: Arc<dyn NotificationSink>) -> Self {
        Self { pool, sink }
    }
}

#[async_trait]
impl PeriodicJob for BlockExpiryJob {
    fn name(&self) -> &'static str {
        "block_expiry"
    }

    fn period(&self) -> Duration {
        Duration::from_secs(24 * 60 * 60)
    }

    async fn run_once(&self) -> DealdeskResult<u64> {
        let now = Utc::now();
        let mut events: Vec<NotificationEvent> = Vec::new();
        let mut tx = serializable_tx(&self.pool).await?;

        let due = repo::blocks::due_expiries(&mut tx, now).await?;
        for block in &due {
            repo::blocks::update_status(&mut tx, block.id, BlockStatus::Expired).await?;
            release_unit_if_blocked(&mut tx, block.unit_id).await?;
            repo::history::append(
                &mut tx,
                EntityKind::Block,
                &HistoryEntry::new(block.id, ChangeType::Expire, SYSTEM_ACTOR)
                    .with_old(json!({ "status": block.status.as_str() }))
                    .with_new(json!({ "status": BlockStatus::Expired.as_str() })),
            )
            .await?;
            events.extend(router::block_expired(block.id, block.requested_by));
        }

        let processed = due.len() as u64;
        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(processed)
    }
}

/// Hourly job: remind the financial managers about units still held by
/// active blocks, then push the next reminder a week out.
pub struct HoldReminderJob {
    pool: PgPool,
    sink: Arc<dyn NotificationSink>,
}

impl HoldReminderJob {
    pub fn new(pool: PgPool, sink: Arc<dyn NotificationSink>) -> Self {
        Self { pool, sink }
    }
}

#[async_trait]
impl PeriodicJob for HoldReminderJob {
    fn name(&self) -> &'static str {
        "hold_reminder"
    }

    fn period(&self) -> Duration {
        Duration::from_secs(60 * 60)
    }

    async fn run_once(&self) -> DealdeskResult<u64> {
        let now = Utc::now();
        let mut events: Vec<NotificationEvent> = Vec::new();
        let mut tx = serializable_tx(&self.pool).await?;

        let due = repo::blocks::due_reminders(&mut tx, now).await?;
        for block in &due {
            repo::blocks::set_next_notify(
                &mut tx,
                block.id,
                now + chrono::Duration::days(REMINDER_PERIOD_DAYS),
            )
            .await?;
            events.extend(router::block_hold_reminder(block.id));
        }

        let processed = due.len() as u64;
        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(processed)
    }
}
