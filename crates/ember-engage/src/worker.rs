use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use ember_db::Database;
use ember_db::queries::DeliverOutcome;
use ember_types::events::NotificationEvent;

use crate::greeter::pick_greeting;
use crate::notifier::Notifier;

/// Background task that delivers due greetings.
///
/// Polls the durable task table on an interval, so deliveries survive
/// process restarts; a task scheduled before a crash is picked up by the
/// next run.
pub async fn run_delivery_loop(db: Arc<Database>, notifier: Notifier, poll_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(poll_secs));

    loop {
        interval.tick().await;

        let worker_db = db.clone();
        let worker_notifier = notifier.clone();
        let result =
            tokio::task::spawn_blocking(move || deliver_due(&worker_db, &worker_notifier)).await;

        match result {
            Ok(Ok(count)) => {
                if count > 0 {
                    info!("Greetings: delivered {}", count);
                }
            }
            Ok(Err(e)) => warn!("Greeting delivery error: {}", e),
            Err(e) => warn!("Greeting delivery join error: {}", e),
        }
    }
}

/// One delivery pass. Each task re-checks idempotency inside its own
/// transaction, so a pass raced by webhook redelivery still appends at
/// most one greeting per match.
pub fn deliver_due(db: &Database, notifier: &Notifier) -> anyhow::Result<usize> {
    let due = db.due_greetings(32)?;
    let mut delivered = 0;

    for task in due {
        let body = pick_greeting(&mut rand::rng());
        match db.deliver_greeting(&task.match_id, body)? {
            DeliverOutcome::Delivered { bot_id, human_id } => {
                delivered += 1;
                info!("Greeting delivered to match {} by {}", task.match_id, bot_id);
                notifier.emit(NotificationEvent::GreetingDelivered {
                    match_id: task.match_id.clone(),
                    bot_id,
                    human_id,
                });
            }
            DeliverOutcome::AlreadyDone => {
                debug!("Greeting for match {} already handled", task.match_id);
            }
        }
    }

    Ok(delivered)
}
