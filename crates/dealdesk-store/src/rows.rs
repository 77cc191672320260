//! Row types mapping table shapes onto the domain model.
//!
//! Status columns are TEXT, converted through the domain `TryFrom<String>`
//! impls via `#[sqlx(try_from = "String")]`; JSONB payloads decode through
//! `sqlx::types::Json` where the domain type is concrete.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use dealdesk_core::models::{
    Block, BlockStatus, Contract, ContractSettings, ContractStatus, Deal, DealStatus,
    FinancialDecision, OverrideStatus, PaymentPlan, PlanStatus, PolicyConfig, ReservationDetails,
    ReservationForm, ReservationStatus, Unit, UnitStatus,
};
use dealdesk_core::models::AcceptanceThresholds;

#[derive(Debug, FromRow)]
pub struct DealRow {
    pub id: Uuid,
    pub title: String,
    pub amount: Decimal,
    #[sqlx(try_from = "String")]
    pub status: DealStatus,
    pub needs_override: bool,
    pub override_approved_at: Option<DateTime<Utc>>,
    pub fm_review_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub details: serde_json::Value,
}

impl From<DealRow> for Deal {
    fn from(r: DealRow) -> Self {
        Deal {
            id: r.id,
            title: r.title,
            amount: r.amount,
            status: r.status,
            needs_override: r.needs_override,
            override_approved_at: r.override_approved_at,
            fm_review_at: r.fm_review_at,
            created_by: r.created_by,
            created_at: r.created_at,
            details: r.details,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct PaymentPlanRow {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub details: serde_json::Value,
    pub created_by: Uuid,
    #[sqlx(try_from = "String")]
    pub status: PlanStatus,
    pub accepted: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentPlanRow> for PaymentPlan {
    fn from(r: PaymentPlanRow) -> Self {
        PaymentPlan {
            id: r.id,
            deal_id: r.deal_id,
            details: r.details,
            created_by: r.created_by,
            status: r.status,
            accepted: r.accepted,
            version: r.version,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct UnitRow {
    pub id: Uuid,
    pub code: String,
    #[sqlx(try_from = "String")]
    pub unit_status: UnitStatus,
    pub available: bool,
    pub model_id: Option<Uuid>,
    pub base_price: Decimal,
    pub garden_price: Decimal,
    pub roof_price: Decimal,
    pub storage_price: Decimal,
    pub garage_price: Decimal,
    pub maintenance_price: Decimal,
    /// FM standard plan configuration; None means not configured
    pub annual_rate_percent: Option<Decimal>,
    pub standard_pv: Option<f64>,
}

impl From<UnitRow> for Unit {
    fn from(r: UnitRow) -> Self {
        Unit {
            id: r.id,
            code: r.code,
            unit_status: r.unit_status,
            available: r.available,
            model_id: r.model_id,
            base_price: r.base_price,
            garden_price: r.garden_price,
            roof_price: r.roof_price,
            storage_price: r.storage_price,
            garage_price: r.garage_price,
            maintenance_price: r.maintenance_price,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct BlockRow {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub requested_by: Uuid,
    pub duration_days: i32,
    #[sqlx(try_from = "String")]
    pub status: BlockStatus,
    #[sqlx(try_from = "String")]
    pub override_status: OverrideStatus,
    pub blocked_until: DateTime<Utc>,
    pub extension_count: i32,
    pub financial_decision: Option<String>,
    pub reason: Option<String>,
    pub next_notify_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BlockRow> for Block {
    type Error = dealdesk_core::DealdeskError;

    fn try_from(r: BlockRow) -> Result<Self, Self::Error> {
        let financial_decision = r
            .financial_decision
            .map(FinancialDecision::try_from)
            .transpose()?;
        Ok(Block {
            id: r.id,
            unit_id: r.unit_id,
            requested_by: r.requested_by,
            duration_days: r.duration_days,
            status: r.status,
            override_status: r.override_status,
            blocked_until: r.blocked_until,
            extension_count: r.extension_count,
            financial_decision,
            reason: r.reason,
            next_notify_at: r.next_notify_at,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ReservationFormRow {
    pub id: Uuid,
    pub payment_plan_id: Uuid,
    pub unit_id: Uuid,
    pub reservation_date: NaiveDate,
    pub preliminary_payment: Decimal,
    #[sqlx(try_from = "String")]
    pub status: ReservationStatus,
    pub details: Json<ReservationDetails>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<ReservationFormRow> for ReservationForm {
    fn from(r: ReservationFormRow) -> Self {
        ReservationForm {
            id: r.id,
            payment_plan_id: r.payment_plan_id,
            unit_id: r.unit_id,
            reservation_date: r.reservation_date,
            preliminary_payment: r.preliminary_payment,
            status: r.status,
            details: r.details.0,
            created_by: r.created_by,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ContractRow {
    pub id: Uuid,
    pub reservation_form_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: ContractStatus,
    pub contract_settings_locked: bool,
    pub settings: Json<ContractSettings>,
    pub details: serde_json::Value,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<ContractRow> for Contract {
    fn from(r: ContractRow) -> Self {
        Contract {
            id: r.id,
            reservation_form_id: r.reservation_form_id,
            status: r.status,
            contract_settings_locked: r.contract_settings_locked,
            settings: r.settings.0,
            details: r.details,
            created_by: r.created_by,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct PolicyConfigRow {
    pub id: Uuid,
    pub scope_type: String,
    pub policy_limit_percent: Decimal,
    pub thresholds: Json<AcceptanceThresholds>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PolicyConfigRow> for PolicyConfig {
    fn from(r: PolicyConfigRow) -> Self {
        PolicyConfig {
            id: r.id,
            scope_type: r.scope_type,
            policy_limit_percent: r.policy_limit_percent,
            thresholds: r.thresholds.0,
            active: r.active,
            created_at: r.created_at,
        }
    }
}
