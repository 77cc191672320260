//! # dealdesk-engine
//!
//! The deal-lifecycle engine: a generic role-gated transition machine
//! instantiated for deals, payment plans, unit blocks, reservation forms
//! and contracts, plus the policy resolver, notification router and the
//! background schedulers.
//!
//! Every state change runs in a single serializable transaction that
//! re-reads the row under lock, asserts the expected state, writes the
//! new state and its history entry, and stages notifications for
//! post-commit delivery.

pub mod blocks;
pub mod contracts;
pub mod deals;
pub mod documents;
pub mod machine;
pub mod notify;
pub mod plans;
pub mod policy;
pub mod reservations;
pub mod scheduler;

use std::sync::Arc;

use sqlx::PgPool;

use notify::NotificationSink;

pub use blocks::{BlockRequest, BlockService};
pub use contracts::ContractService;
pub use deals::{CreateDealRequest, DealService};
pub use documents::DocumentService;
pub use machine::{TransitionRule, TransitionTable};
pub use notify::{PgNotificationSink, TracingSink};
pub use plans::{CreatePlanRequest, PlanDecision, PlanService, QueueStage};
pub use reservations::{AmendmentInput, CreateReservationRequest, ReservationService};
pub use scheduler::{BlockExpiryJob, HoldReminderJob, PeriodicJob};

/// All entity services over one pool and sink.
pub struct Engine {
    pub deals: DealService,
    pub plans: PlanService,
    pub blocks: BlockService,
    pub reservations: ReservationService,
    pub contracts: ContractService,
    pub documents: DocumentService,
}

impl Engine {
    pub fn new(pool: PgPool, sink: Arc<dyn NotificationSink>, currency: String) -> Self {
        Self {
            deals: DealService::new(pool.clone(), sink.clone()),
            plans: PlanService::new(pool.clone(), sink.clone()),
            blocks: BlockService::new(pool.clone(), sink.clone()),
            reservations: ReservationService::new(pool.clone(), sink.clone()),
            contracts: ContractService::new(pool.clone(), sink),
            documents: DocumentService::new(pool, currency),
        }
    }
}
