//! Per-sink event filters.

use serde::{Deserialize, Serialize};

use crate::event::LogEvent;
use crate::level::Level;

/// Verdict of a filter on a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterReply {
    /// Append the event.
    Accept,
    /// Drop the event.
    Deny,
    /// No opinion; the sink appends.
    Neutral,
}

/// Matches events of exactly one level.
///
/// This is an equality test, not a threshold: a filter on `Error` says
/// nothing about levels above or below it except through `on_mismatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelFilter {
    /// The level to match.
    pub level: Level,
    /// Reply when the event's level equals `level`.
    pub on_match: FilterReply,
    /// Reply for every other level.
    pub on_mismatch: FilterReply,
}

impl LevelFilter {
    /// Creates a filter with neutral replies.
    #[must_use]
    pub const fn new(level: Level) -> Self {
        Self {
            level,
            on_match: FilterReply::Neutral,
            on_mismatch: FilterReply::Neutral,
        }
    }

    /// A filter that accepts `level` and denies everything else.
    #[must_use]
    pub const fn accept_only(level: Level) -> Self {
        Self {
            level,
            on_match: FilterReply::Accept,
            on_mismatch: FilterReply::Deny,
        }
    }

    /// Sets the reply for matching events.
    #[must_use]
    pub const fn on_match(mut self, reply: FilterReply) -> Self {
        self.on_match = reply;
        self
    }

    /// Sets the reply for non-matching events.
    #[must_use]
    pub const fn on_mismatch(mut self, reply: FilterReply) -> Self {
        self.on_mismatch = reply;
        self
    }

    /// Decides what to do with `event`.
    #[must_use]
    pub fn decide(&self, event: &LogEvent) -> FilterReply {
        self.decide_level(event.level)
    }

    /// Decides based on a level alone.
    #[must_use]
    pub fn decide_level(&self, level: Level) -> FilterReply {
        if level == self.level {
            self.on_match
        } else {
            self.on_mismatch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_level() -> impl Strategy<Value = Level> {
        proptest::sample::select(Level::ALL.to_vec())
    }

    #[test]
    fn error_filter_accepts_error() {
        let filter = LevelFilter::accept_only(Level::Error);
        let event = LogEvent::new(Level::Error, "authserver", "db down");
        assert_eq!(filter.decide(&event), FilterReply::Accept);
    }

    #[test]
    fn error_filter_denies_debug() {
        let filter = LevelFilter::accept_only(Level::Error);
        let event = LogEvent::new(Level::Debug, "authserver", "user login failed");
        assert_eq!(filter.decide(&event), FilterReply::Deny);
    }

    #[test]
    fn default_replies_are_neutral() {
        let filter = LevelFilter::new(Level::Warn);
        assert_eq!(filter.decide_level(Level::Warn), FilterReply::Neutral);
        assert_eq!(filter.decide_level(Level::Info), FilterReply::Neutral);
    }

    #[test]
    fn replies_are_configurable() {
        let filter = LevelFilter::new(Level::Info)
            .on_match(FilterReply::Deny)
            .on_mismatch(FilterReply::Accept);
        assert_eq!(filter.decide_level(Level::Info), FilterReply::Deny);
        assert_eq!(filter.decide_level(Level::Error), FilterReply::Accept);
    }

    proptest! {
        #[test]
        fn prop_accept_only_is_exact_match(filter_level in arb_level(), level in arb_level()) {
            let reply = LevelFilter::accept_only(filter_level).decide_level(level);
            if level == filter_level {
                prop_assert_eq!(reply, FilterReply::Accept);
            } else {
                prop_assert_eq!(reply, FilterReply::Deny);
            }
        }
    }
}
