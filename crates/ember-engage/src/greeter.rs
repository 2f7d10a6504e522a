use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{info, warn};

use ember_db::Database;
use ember_db::queries::ScheduleOutcome as StoreSchedule;

/// Fixed opener pool for synthetic accounts.
const GREETING_PHRASES: &[&str] = &[
    "Hey! Nice to match with you :)",
    "Hi there! How's your day going?",
    "Hey you! Love your photos.",
    "Hi! What are you up to this week?",
    "Hey, great to meet you! Coffee person or tea person?",
    "Hi hi! Your profile made me smile.",
];

pub fn pick_greeting<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    // The pool is a non-empty constant; choose only returns None on an
    // empty slice.
    GREETING_PHRASES.choose(rng).copied().unwrap_or(GREETING_PHRASES[0])
}

/// Delay window for simulated response latency, in seconds.
#[derive(Debug, Clone, Copy)]
pub struct GreetingConfig {
    pub delay_min_secs: u64,
    pub delay_max_secs: u64,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self { delay_min_secs: 10, delay_max_secs: 60 }
    }
}

impl GreetingConfig {
    pub fn sample_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.delay_max_secs <= self.delay_min_secs {
            return self.delay_min_secs;
        }
        rng.random_range(self.delay_min_secs..=self.delay_max_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A greeting task is now queued.
    Scheduled,
    /// Redelivered event; a task or greeting already exists.
    Duplicate,
    /// Neither participant is a synthetic account.
    NoBotParticipant,
    MatchMissing,
}

/// Handle one MATCH event: resolve the bot side of the pair and enqueue
/// the durable greeting. Ineligible events (no bot, unknown match) are
/// logged and reported as outcomes, not errors, so the webhook can
/// acknowledge regardless. A missing greeting is degraded experience,
/// not corruption.
pub fn schedule_greeting(
    db: &Database,
    cfg: &GreetingConfig,
    match_id: &str,
    reporter_id: &str,
) -> anyhow::Result<ScheduleOutcome> {
    let Some(m) = db.get_match(match_id)? else {
        warn!("Greeting: match {} not found (reporter {})", match_id, reporter_id);
        return Ok(ScheduleOutcome::MatchMissing);
    };

    // The non-human side of the pair; when both are synthetic (shouldn't
    // happen, but the data allows it) prefer the one that didn't report.
    let mut bots = Vec::new();
    for uid in m.participants() {
        let Some(profile) = db.get_profile(uid)? else { continue };
        if profile.is_bot {
            bots.push(uid.to_string());
        }
    }
    let bot_id = bots
        .iter()
        .find(|uid| uid.as_str() != reporter_id)
        .or_else(|| bots.first())
        .cloned();
    let Some(bot_id) = bot_id else {
        info!("Greeting: match {} has no bot participant, skipping", match_id);
        return Ok(ScheduleOutcome::NoBotParticipant);
    };
    let human_id = m
        .counterpart_of(&bot_id)
        .unwrap_or(reporter_id)
        .to_string();

    let delay = cfg.sample_delay(&mut rand::rng());
    let outcome = db.schedule_greeting(match_id, &bot_id, &human_id, delay)?;

    match outcome {
        StoreSchedule::Scheduled => {
            info!(
                "Greeting: scheduled for match {} (bot {}, {}s delay)",
                match_id, bot_id, delay
            );
            Ok(ScheduleOutcome::Scheduled)
        }
        StoreSchedule::AlreadyScheduled | StoreSchedule::AlreadyGreeted => {
            info!("Greeting: match {} already handled, no-op", match_id);
            Ok(ScheduleOutcome::Duplicate)
        }
    }
}
