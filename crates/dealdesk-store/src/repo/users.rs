//! User lookups for notification fan-out. Account management is
//! external; the engine only resolves recipients.

use uuid::Uuid;

use dealdesk_core::models::Role;
use dealdesk_core::DealdeskResult;

use crate::{Conn, SqlxResultExt};

/// Ids of active users holding any of the given roles.
pub async fn active_ids_by_roles(
    conn: &mut Conn,
    roles: &[Role],
) -> DealdeskResult<Vec<Uuid>> {
    let role_names: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
    sqlx::query_scalar("SELECT id FROM users WHERE active AND role = ANY($1)")
        .bind(role_names)
        .fetch_all(conn)
        .await
        .db()
}
