//! Policy configuration repository. Policy rows are administered
//! externally; the engine only resolves the active one.

use dealdesk_core::models::PolicyConfig;
use dealdesk_core::DealdeskResult;

use crate::rows::PolicyConfigRow;
use crate::{Conn, SqlxResultExt};

/// Most recently created active global policy, if any.
pub async fn active_global(conn: &mut Conn) -> DealdeskResult<Option<PolicyConfig>> {
    let row = sqlx::query_as::<_, PolicyConfigRow>(
        "SELECT id, scope_type, policy_limit_percent, thresholds, active, created_at \
         FROM policy_configs \
         WHERE scope_type = 'global' AND active \
         ORDER BY created_at DESC LIMIT 1",
    )
    .fetch_optional(conn)
    .await
    .db()?;
    Ok(row.map(PolicyConfig::from))
}
