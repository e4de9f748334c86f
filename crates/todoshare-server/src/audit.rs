//! Security-relevant events, emitted on the `audit` target after the
//! transaction that produced them has committed.

use todoshare_core::authz::DenyReason;
use todoshare_core::model::{ListId, UserId};
use todoshare_core::role::Role;

pub fn audit_access_invited(list_id: &ListId, user_id: &UserId, invited_by: &UserId, role: &Role) {
    tracing::info!(
        target: "audit",
        event = "access_invited",
        list_id = %list_id,
        user_id = %user_id,
        invited_by = %invited_by,
        role = %role,
        "user invited to list"
    );
}

pub fn audit_access_accepted(list_id: &ListId, user_id: &UserId) {
    tracing::info!(
        target: "audit",
        event = "access_accepted",
        list_id = %list_id,
        user_id = %user_id,
        "invitation accepted"
    );
}

pub fn audit_access_revoked(list_id: &ListId, user_id: &UserId, revoked_by: &UserId) {
    tracing::info!(
        target: "audit",
        event = "access_revoked",
        list_id = %list_id,
        user_id = %user_id,
        revoked_by = %revoked_by,
        self_removal = user_id == revoked_by,
        "list access revoked"
    );
}

pub fn audit_list_made_private(list_id: &ListId, revoked_count: u64) {
    tracing::info!(
        target: "audit",
        event = "list_made_private",
        list_id = %list_id,
        revoked_count = revoked_count,
        "list made private, shared access removed"
    );
}

pub fn audit_list_deleted(list_id: &ListId, deleted_by: &UserId) {
    tracing::info!(
        target: "audit",
        event = "list_deleted",
        list_id = %list_id,
        deleted_by = %deleted_by,
        "list deleted"
    );
}

pub fn audit_denied(operation: &str, user_id: &UserId, reason: DenyReason) {
    tracing::warn!(
        target: "audit",
        event = "access_denied",
        operation = operation,
        user_id = %user_id,
        reason = %reason,
        "request denied"
    );
}

pub fn audit_auth_failure(reason: &str) {
    tracing::warn!(
        target: "audit",
        event = "auth_failure",
        reason = reason,
        "authentication failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Debug)]
    struct CapturedEvent {
        target: String,
        level: tracing::Level,
        fields: Vec<(String, String)>,
    }

    struct CaptureLayer {
        events: Arc<Mutex<Vec<CapturedEvent>>>,
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut fields = Vec::new();
            event.record(&mut FieldVisitor(&mut fields));
            self.events.lock().unwrap().push(CapturedEvent {
                target: event.metadata().target().to_string(),
                level: *event.metadata().level(),
                fields,
            });
        }
    }

    struct FieldVisitor<'a>(&'a mut Vec<(String, String)>);

    impl tracing::field::Visit for FieldVisitor<'_> {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            self.0.push((field.name().to_string(), format!("{value:?}")));
        }

        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            self.0.push((field.name().to_string(), value.to_string()));
        }

        fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
            self.0.push((field.name().to_string(), value.to_string()));
        }

        fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
            self.0.push((field.name().to_string(), value.to_string()));
        }
    }

    fn capture<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(CaptureLayer {
            events: Arc::clone(&events),
        });
        tracing::subscriber::with_default(subscriber, f);
        Arc::try_unwrap(events).unwrap().into_inner().unwrap()
    }

    fn field<'a>(event: &'a CapturedEvent, key: &str) -> Option<&'a str> {
        event
            .fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn invite_event_names_both_parties_and_role() {
        let list_id = ListId::generate();
        let invitee = UserId::generate();
        let owner = UserId::generate();

        let events = capture(|| audit_access_invited(&list_id, &invitee, &owner, &Role::Writer));

        assert_eq!(events.len(), 1);
        assert_eq!(field(&events[0], "event"), Some("access_invited"));
        assert_eq!(field(&events[0], "user_id"), Some(invitee.to_string().as_str()));
        assert_eq!(field(&events[0], "invited_by"), Some(owner.to_string().as_str()));
        assert_eq!(field(&events[0], "role"), Some("writer"));
    }

    #[test]
    fn revoke_event_flags_self_removal() {
        let list_id = ListId::generate();
        let user = UserId::generate();

        let events = capture(|| {
            audit_access_revoked(&list_id, &user, &user);
            audit_access_revoked(&list_id, &user, &UserId::generate());
        });

        assert_eq!(field(&events[0], "self_removal"), Some("true"));
        assert_eq!(field(&events[1], "self_removal"), Some("false"));
    }

    #[test]
    fn private_event_carries_revoked_count() {
        let events = capture(|| audit_list_made_private(&ListId::generate(), 3));
        assert_eq!(field(&events[0], "revoked_count"), Some("3"));
    }

    #[test]
    fn denials_are_warnings_with_reason() {
        let events = capture(|| {
            audit_denied("delete_list", &UserId::generate(), DenyReason::NotOwner);
        });

        assert_eq!(events[0].level, tracing::Level::WARN);
        assert_eq!(field(&events[0], "operation"), Some("delete_list"));
        assert_eq!(field(&events[0], "reason"), Some("not the list owner"));
    }

    #[test]
    fn all_events_use_audit_target() {
        let list_id = ListId::generate();
        let user = UserId::generate();

        let events = capture(|| {
            audit_access_invited(&list_id, &user, &user, &Role::Reader);
            audit_access_accepted(&list_id, &user);
            audit_access_revoked(&list_id, &user, &user);
            audit_list_made_private(&list_id, 0);
            audit_list_deleted(&list_id, &user);
            audit_denied("get_list", &user, DenyReason::NoAccess);
            audit_auth_failure("expired token");
        });

        assert_eq!(events.len(), 7);
        for event in &events {
            assert_eq!(event.target, "audit");
        }
    }
}
