use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use super::repo::{self, NewNotification, NotificationKind};
use crate::mailer::Email;
use crate::state::AppState;

pub fn order_placed(user_id: Uuid, order_id: Uuid, total: &str) -> NewNotification {
    NewNotification {
        user_id,
        kind: NotificationKind::Order,
        title: "Order placed".into(),
        message: format!("Your order {order_id} totalling {total} has been received."),
        metadata: json!({ "order_id": order_id }),
    }
}

/// Notification for a status change. Shipping updates are filed as `shipment`.
pub fn order_status_changed(
    user_id: Uuid,
    order_id: Uuid,
    status: &str,
    tracking_number: Option<&str>,
) -> NewNotification {
    let kind = match status {
        "shipped" | "delivered" => NotificationKind::Shipment,
        _ => NotificationKind::Order,
    };
    let mut message = format!("Your order {order_id} is now {status}.");
    if let Some(t) = tracking_number {
        message.push_str(&format!(" Tracking number: {t}."));
    }
    NewNotification {
        user_id,
        kind,
        title: format!("Order {status}"),
        message,
        metadata: json!({
            "order_id": order_id,
            "status": status,
            "tracking_number": tracking_number,
        }),
    }
}

/// Records the notification and mails the same text to `email`.
/// Failures are logged; the caller's request already succeeded.
pub async fn deliver(state: &AppState, note: NewNotification, email: Option<String>) {
    if let Err(e) = repo::insert(&state.db, &note).await {
        error!(error = %e, user_id = %note.user_id, "failed to record notification");
    }
    let Some(to) = email else {
        return;
    };
    let mail = Email {
        to,
        subject: note.title,
        body: note.message,
    };
    if let Err(e) = state.mailer.send(mail).await {
        warn!(error = %e, user_id = %note.user_id, "failed to send notification email");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipping_updates_are_shipment_notifications() {
        let n = order_status_changed(Uuid::nil(), Uuid::nil(), "shipped", Some("1Z999"));
        assert_eq!(n.kind, NotificationKind::Shipment);
        assert!(n.message.contains("1Z999"));
        assert_eq!(n.metadata["tracking_number"], "1Z999");

        let n = order_status_changed(Uuid::nil(), Uuid::nil(), "processing", None);
        assert_eq!(n.kind, NotificationKind::Order);
        assert!(n.metadata["tracking_number"].is_null());
    }

    #[test]
    fn placed_message_mentions_total() {
        let n = order_placed(Uuid::nil(), Uuid::nil(), "42.50");
        assert_eq!(n.kind, NotificationKind::Order);
        assert!(n.message.contains("42.50"));
    }
}
