use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing::debug;

use entity::notification::{self, NotificationKind};

use crate::util;

/// Record a role-event notice for the user. Best-effort: notifications are
/// not authoritative state, so failures are logged and swallowed.
pub async fn record(
    db: &DatabaseConnection,
    user_id: &str,
    kind: NotificationKind,
    subject: &str,
    body: &str,
) {
    let row = notification::ActiveModel {
        id: Set(util::generate_row_id()),
        user_id: Set(user_id.to_string()),
        kind: Set(kind),
        subject: Set(subject.to_string()),
        body: Set(body.to_string()),
        created_at: Set(util::now_ts()),
    };

    if let Err(e) = row.insert(db).await {
        debug!(user_id, error = %e, "failed to record notification");
    }
}
