//! Domain model types.

pub mod block;
pub mod contract;
pub mod deal;
pub mod history;
pub mod notification;
pub mod plan;
pub mod policy;
pub mod reservation;
pub mod role;
pub mod schedule;
pub mod snapshot;
pub mod unit;

pub use block::{
    Block, BlockStatus, FinancialDecision, OverrideStatus, EXTENSION_STEP_DAYS, MAX_BLOCK_DAYS,
    MAX_EXTENSIONS, MIN_BLOCK_DAYS,
};
pub use contract::{Contract, ContractSettings, ContractStatus};
pub use deal::{Deal, DealStatus};
pub use history::{ChangeType, EntityKind, HistoryEntry};
pub use notification::{NotificationEvent, NotificationKind, RecipientCriteria};
pub use plan::{PaymentPlan, PlanStatus};
pub use policy::{
    discount_authority, AcceptanceThresholds, PolicyConfig, DEFAULT_POLICY_LIMIT_PERCENT,
};
pub use reservation::{
    AmendmentRecord, AmendmentRequest, ReservationDetails, ReservationForm, ReservationStatus,
};
pub use role::{Principal, Role};
pub use schedule::{
    ConditionResult, Decision, EntryKind, Evaluation, PlanTotals, PvResult, ScheduleEntry,
};
pub use snapshot::{BuyerInfo, GeneratedPlan, Snapshot, SnapshotV1, UnitInfo};
pub use unit::{Unit, UnitStatus};
