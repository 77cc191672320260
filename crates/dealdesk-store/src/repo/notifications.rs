//! Notification outbox.

use uuid::Uuid;

use dealdesk_core::models::NotificationEvent;
use dealdesk_core::DealdeskResult;

use crate::{Conn, SqlxResultExt};

/// Persist one event row per recipient user.
pub async fn insert_for_user(
    conn: &mut Conn,
    user_id: Uuid,
    event: &NotificationEvent,
) -> DealdeskResult<()> {
    sqlx::query(
        "INSERT INTO notifications (id, user_id, kind, ref_entity, ref_id, message) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(event.kind.as_str())
    .bind(event.ref_entity.as_str())
    .bind(event.ref_id)
    .bind(&event.message)
    .execute(conn)
    .await
    .db()?;
    Ok(())
}
