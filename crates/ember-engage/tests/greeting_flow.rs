//! End-to-end bot engagement flow against a real on-disk store: swipe on
//! a bot, take the MATCH event, deliver the greeting, check both sides'
//! summaries.

use uuid::Uuid;

use ember_db::Database;
use ember_engage::greeter::{GreetingConfig, ScheduleOutcome, schedule_greeting};
use ember_engage::notifier::Notifier;
use ember_engage::worker::deliver_due;
use ember_types::events::NotificationEvent;
use ember_types::models::{Match, SwipeKind};

fn test_db() -> Database {
    let path = std::env::temp_dir().join(format!("ember-engage-test-{}.db", Uuid::new_v4()));
    let db = Database::open(&path).unwrap();
    db.insert_profile("u1", "Ada", "", &[], false).unwrap();
    db.insert_profile("u2", "Grace", "", &[], false).unwrap();
    db.insert_profile("b1", "Iris", "", &[], true).unwrap();
    db
}

fn immediate() -> GreetingConfig {
    GreetingConfig { delay_min_secs: 0, delay_max_secs: 0 }
}

#[test]
fn match_event_produces_exactly_one_greeting() {
    let db = test_db();
    let notifier = Notifier::new();
    let mut events = notifier.subscribe();

    db.record_swipe("u1", "b1", SwipeKind::Like).unwrap();
    let match_id = Match::key_for("u1", "b1");

    // First webhook delivery schedules; the redelivery is a no-op.
    assert_eq!(
        schedule_greeting(&db, &immediate(), &match_id, "u1").unwrap(),
        ScheduleOutcome::Scheduled
    );
    assert_eq!(
        schedule_greeting(&db, &immediate(), &match_id, "u1").unwrap(),
        ScheduleOutcome::Duplicate
    );

    assert_eq!(deliver_due(&db, &notifier).unwrap(), 1);

    let messages = db.list_messages(&match_id, 50, None).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender_id, "b1");

    let human_side = &db.list_summaries("u1").unwrap()[0];
    assert_eq!(human_side.last_message.as_deref(), Some(messages[0].body.as_str()));
    assert!(human_side.unread_count >= 1);

    let bot_side = &db.list_summaries("b1").unwrap()[0];
    assert_eq!(bot_side.last_message.as_deref(), Some(messages[0].body.as_str()));

    match events.try_recv().unwrap() {
        NotificationEvent::GreetingDelivered { match_id: mid, bot_id, human_id } => {
            assert_eq!(mid, match_id);
            assert_eq!(bot_id, "b1");
            assert_eq!(human_id, "u1");
        }
        other => panic!("unexpected event: {:?}", other),
    }

    // A second pass has nothing left to deliver.
    assert_eq!(deliver_due(&db, &notifier).unwrap(), 0);
    assert_eq!(db.list_messages(&match_id, 50, None).unwrap().len(), 1);
}

#[test]
fn human_only_match_schedules_nothing() {
    let db = test_db();
    db.record_swipe("u1", "u2", SwipeKind::Like).unwrap();
    db.record_swipe("u2", "u1", SwipeKind::Like).unwrap();
    let match_id = Match::key_for("u1", "u2");

    assert_eq!(
        schedule_greeting(&db, &immediate(), &match_id, "u1").unwrap(),
        ScheduleOutcome::NoBotParticipant
    );
    let notifier = Notifier::new();
    assert_eq!(deliver_due(&db, &notifier).unwrap(), 0);
    assert!(db.list_messages(&match_id, 50, None).unwrap().is_empty());
}

#[test]
fn unknown_match_is_logged_not_fatal() {
    let db = test_db();
    assert_eq!(
        schedule_greeting(&db, &immediate(), "no_such", "u1").unwrap(),
        ScheduleOutcome::MatchMissing
    );
}

#[test]
fn delayed_greeting_is_not_delivered_early() {
    let db = test_db();
    let notifier = Notifier::new();

    db.record_swipe("u1", "b1", SwipeKind::Like).unwrap();
    let match_id = Match::key_for("u1", "b1");

    let cfg = GreetingConfig { delay_min_secs: 3600, delay_max_secs: 3600 };
    assert_eq!(
        schedule_greeting(&db, &cfg, &match_id, "u1").unwrap(),
        ScheduleOutcome::Scheduled
    );

    assert_eq!(deliver_due(&db, &notifier).unwrap(), 0);
    assert!(db.list_messages(&match_id, 50, None).unwrap().is_empty());
}
