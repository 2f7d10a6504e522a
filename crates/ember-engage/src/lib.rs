pub mod greeter;
pub mod notifier;
pub mod worker;

pub use greeter::{GreetingConfig, ScheduleOutcome};
pub use notifier::Notifier;
