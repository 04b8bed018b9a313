use chrono::NaiveDate;
use studyquest_core::{
    Config, FixedToday, NoopNotifier, Notifier, SystemToday, TodaySource, WebhookNotifier,
};

/// Push transport per config; falls back to dropping messages.
pub fn notifier(config: &Config) -> Box<dyn Notifier> {
    match WebhookNotifier::from_config(&config.notifier) {
        Some(webhook) => Box::new(webhook),
        None => Box::new(NoopNotifier),
    }
}

/// Server-local calendar unless an explicit day was given (replay/ops).
pub fn today_source(today: Option<NaiveDate>) -> Box<dyn TodaySource> {
    match today {
        Some(day) => Box::new(FixedToday(day)),
        None => Box::new(SystemToday),
    }
}
