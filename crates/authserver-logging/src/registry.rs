//! Named, hierarchical loggers and event dispatch.
//!
//! Logger names are dotted paths. `root` is the ancestor of every logger and
//! `jdbc` is the parent of `jdbc.sqlonly`. An event on `authserver.token`
//! takes its effective level from the nearest configured logger on the way
//! to `root`, then visits the same chain, appending to each logger's sinks
//! until a non-additive logger has been served.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::event::LogEvent;
use crate::filter::FilterReply;
use crate::level::Level;
use crate::sink::Sink;

/// Name of the root logger.
pub const ROOT_LOGGER: &str = "root";

/// Level of the root logger before any binding.
pub const DEFAULT_ROOT_LEVEL: Level = Level::Debug;

/// A configured logger.
#[derive(Clone)]
struct Logger {
    level: Option<Level>,
    additive: bool,
    sinks: Vec<Arc<dyn Sink>>,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            level: None,
            additive: true,
            sinks: Vec::new(),
        }
    }
}

/// Yields `name`, each dotted parent of it, then `root`.
fn lineage(name: &str) -> impl Iterator<Item = &str> {
    let own = (!name.is_empty() && name != ROOT_LOGGER).then_some(name);
    let parents = std::iter::successors(own, |n| n.rsplit_once('.').map(|(parent, _)| parent))
        .skip(1);
    own.into_iter().chain(parents).chain(std::iter::once(ROOT_LOGGER))
}

/// The set of loggers and their sinks.
pub struct LoggerRegistry {
    loggers: RwLock<HashMap<String, Logger>>,
    dropped: AtomicU64,
}

impl Default for LoggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerRegistry {
    /// Creates a registry holding only the root logger.
    #[must_use]
    pub fn new() -> Self {
        let mut loggers = HashMap::new();
        loggers.insert(
            ROOT_LOGGER.to_string(),
            Logger {
                level: Some(DEFAULT_ROOT_LEVEL),
                ..Logger::default()
            },
        );
        Self {
            loggers: RwLock::new(loggers),
            dropped: AtomicU64::new(0),
        }
    }

    /// Sets the level and additivity of `name`, creating it if needed.
    pub(crate) fn configure(&self, name: &str, level: Level, additive: bool) {
        let mut loggers = self.loggers.write();
        let logger = loggers.entry(name.to_string()).or_default();
        logger.level = Some(level);
        logger.additive = additive;
    }

    /// Attaches `sink` to `name`, creating the logger if needed.
    pub(crate) fn attach(&self, name: &str, sink: Arc<dyn Sink>) {
        self.loggers
            .write()
            .entry(name.to_string())
            .or_default()
            .sinks
            .push(sink);
    }

    /// Names of all configured loggers, sorted.
    #[must_use]
    pub fn logger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loggers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Level configured directly on `name`.
    #[must_use]
    pub fn level_of(&self, name: &str) -> Option<Level> {
        self.loggers.read().get(name).and_then(|l| l.level)
    }

    /// Additivity of `name`, if it exists.
    #[must_use]
    pub fn is_additive(&self, name: &str) -> Option<bool> {
        self.loggers.read().get(name).map(|l| l.additive)
    }

    /// Names of the sinks attached directly to `name`.
    #[must_use]
    pub fn sink_names(&self, name: &str) -> Vec<String> {
        self.loggers
            .read()
            .get(name)
            .map(|l| l.sinks.iter().map(|s| s.name().to_string()).collect())
            .unwrap_or_default()
    }

    /// Level in force for `logger`: its own, or the nearest ancestor's.
    #[must_use]
    pub fn effective_level(&self, logger: &str) -> Level {
        let loggers = self.loggers.read();
        lineage(logger)
            .find_map(|name| loggers.get(name).and_then(|l| l.level))
            .unwrap_or(DEFAULT_ROOT_LEVEL)
    }

    /// Whether an event at `level` on `logger` would be dispatched.
    #[must_use]
    pub fn is_enabled(&self, logger: &str, level: Level) -> bool {
        level.is_at_least(self.effective_level(logger))
    }

    /// Sends `event` to every sink along its logger chain.
    ///
    /// Returns how many sinks appended the event. Sink failures are counted
    /// in [`dropped`](Self::dropped) and otherwise ignored.
    pub fn dispatch(&self, event: &LogEvent) -> usize {
        let targets = {
            let loggers = self.loggers.read();
            let mut level = None;
            let mut targets: Vec<Arc<dyn Sink>> = Vec::new();
            let mut collecting = true;
            for name in lineage(&event.logger) {
                let Some(logger) = loggers.get(name) else {
                    continue;
                };
                if level.is_none() {
                    level = logger.level;
                }
                if collecting {
                    targets.extend(logger.sinks.iter().cloned());
                    collecting = logger.additive;
                }
                if level.is_some() && !collecting {
                    break;
                }
            }
            if !event.level.is_at_least(level.unwrap_or(DEFAULT_ROOT_LEVEL)) {
                return 0;
            }
            targets
        };

        let mut appended = 0;
        for sink in targets {
            if sink.decide(event) == FilterReply::Deny {
                continue;
            }
            match sink.append(event) {
                Ok(()) => appended += 1,
                Err(_) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        appended
    }

    /// Number of appends that failed.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("loggers", &self.logger_names())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::PatternEncoder;
    use crate::error::{LoggingError, Result};
    use crate::filter::LevelFilter;
    use crate::sink::{ConsoleSink, SharedBuffer};
    use test_case::test_case;

    fn console(name: &str) -> (Arc<ConsoleSink>, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let sink = ConsoleSink::with_writer(name, PatternEncoder::new(), Box::new(buffer.clone()));
        sink.start().expect("start");
        (Arc::new(sink), buffer)
    }

    /// Sink that always fails.
    #[derive(Debug)]
    struct BrokenSink;

    impl Sink for BrokenSink {
        fn name(&self) -> &str {
            "BROKEN"
        }

        fn start(&self) -> Result<()> {
            Ok(())
        }

        fn is_started(&self) -> bool {
            true
        }

        fn append(&self, _event: &LogEvent) -> Result<()> {
            Err(LoggingError::SinkNotStarted("BROKEN".to_string()))
        }
    }

    /// Sink with a fixed filter verdict that counts appends.
    #[derive(Debug)]
    struct VerdictSink {
        reply: FilterReply,
        count: AtomicU64,
    }

    impl Sink for VerdictSink {
        fn name(&self) -> &str {
            "VERDICT"
        }

        fn start(&self) -> Result<()> {
            Ok(())
        }

        fn is_started(&self) -> bool {
            true
        }

        fn decide(&self, _event: &LogEvent) -> FilterReply {
            self.reply
        }

        fn append(&self, _event: &LogEvent) -> Result<()> {
            self.count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    mod lineage_tests {
        use super::*;
        use test_case::test_case;

        #[test_case("jdbc.sqlonly", &["jdbc.sqlonly", "jdbc", "root"] ; "child")]
        #[test_case("a.b.c", &["a.b.c", "a.b", "a", "root"] ; "deep")]
        #[test_case("authserver", &["authserver", "root"] ; "top level")]
        #[test_case("root", &["root"] ; "root itself")]
        #[test_case("", &["root"] ; "empty")]
        fn walks_to_root(name: &str, expected: &[&str]) {
            let chain: Vec<&str> = lineage(name).collect();
            assert_eq!(chain, expected);
        }
    }

    mod level_tests {
        use super::*;

        #[test]
        fn root_defaults_to_debug() {
            let registry = LoggerRegistry::new();
            assert_eq!(registry.effective_level("anything"), Level::Debug);
            assert_eq!(registry.logger_names(), vec!["root"]);
        }

        #[test]
        fn nearest_configured_ancestor_wins() {
            let registry = LoggerRegistry::new();
            registry.configure(ROOT_LOGGER, Level::Info, true);
            registry.configure("authserver", Level::Debug, false);

            assert_eq!(registry.effective_level("authserver.token.refresh"), Level::Debug);
            assert_eq!(registry.effective_level("jdbc.sqlonly"), Level::Info);
            assert!(registry.is_enabled("authserver.login", Level::Debug));
            assert!(!registry.is_enabled("other", Level::Debug));
            assert!(registry.is_enabled("other", Level::Warn));
        }

        #[test]
        fn sink_only_logger_inherits_level() {
            let registry = LoggerRegistry::new();
            registry.configure(ROOT_LOGGER, Level::Warn, true);
            let (sink, _) = console("STDOUT");
            registry.attach("audit", sink);

            assert_eq!(registry.level_of("audit"), None);
            assert_eq!(registry.effective_level("audit"), Level::Warn);
            assert_eq!(registry.is_additive("audit"), Some(true));
        }
    }

    mod dispatch_tests {
        use super::*;
        use test_case::test_case;

        #[test]
        fn additive_logger_reaches_root_sinks() {
            let registry = LoggerRegistry::new();
            let (root_sink, root_out) = console("ROOT");
            let (child_sink, child_out) = console("CHILD");
            registry.configure(ROOT_LOGGER, Level::Info, true);
            registry.attach(ROOT_LOGGER, root_sink);
            registry.attach("service", child_sink);

            let appended = registry.dispatch(&LogEvent::new(Level::Info, "service.api", "hi"));

            assert_eq!(appended, 2);
            assert!(root_out.contents().contains("hi"));
            assert!(child_out.contents().contains("hi"));
        }

        #[test]
        fn non_additive_logger_stops_chain() {
            let registry = LoggerRegistry::new();
            let (root_sink, root_out) = console("ROOT");
            let (jdbc_sink, jdbc_out) = console("JDBC");
            registry.configure(ROOT_LOGGER, Level::Info, true);
            registry.configure("jdbc", Level::Info, false);
            registry.attach(ROOT_LOGGER, root_sink);
            registry.attach("jdbc", jdbc_sink);

            registry.dispatch(&LogEvent::new(Level::Info, "jdbc.sqltiming", "select 1"));

            assert!(jdbc_out.contents().contains("select 1"));
            assert!(root_out.contents().is_empty());
        }

        #[test]
        fn below_effective_level_is_discarded() {
            let registry = LoggerRegistry::new();
            let (sink, out) = console("ROOT");
            registry.configure(ROOT_LOGGER, Level::Info, true);
            registry.attach(ROOT_LOGGER, sink);

            let appended = registry.dispatch(&LogEvent::new(Level::Debug, "jdbc", "noise"));

            assert_eq!(appended, 0);
            assert!(out.contents().is_empty());
        }

        #[test_case(FilterReply::Accept, 1 ; "accept appends")]
        #[test_case(FilterReply::Neutral, 1 ; "neutral appends")]
        #[test_case(FilterReply::Deny, 0 ; "deny skips")]
        fn filter_verdicts(reply: FilterReply, expected: u64) {
            let registry = LoggerRegistry::new();
            let sink = Arc::new(VerdictSink {
                reply,
                count: AtomicU64::new(0),
            });
            registry.attach(ROOT_LOGGER, sink.clone());

            registry.dispatch(&LogEvent::new(Level::Info, "x", "y"));
            assert_eq!(sink.count.load(Ordering::Relaxed), expected);
        }

        #[test]
        fn level_filter_on_sink_is_honoured() {
            #[derive(Debug)]
            struct ErrorOnly(VerdictSink);

            impl Sink for ErrorOnly {
                fn name(&self) -> &str {
                    "ERROR"
                }
                fn start(&self) -> Result<()> {
                    Ok(())
                }
                fn is_started(&self) -> bool {
                    true
                }
                fn decide(&self, event: &LogEvent) -> FilterReply {
                    LevelFilter::accept_only(Level::Error).decide(event)
                }
                fn append(&self, event: &LogEvent) -> Result<()> {
                    self.0.append(event)
                }
            }

            let registry = LoggerRegistry::new();
            let sink = Arc::new(ErrorOnly(VerdictSink {
                reply: FilterReply::Neutral,
                count: AtomicU64::new(0),
            }));
            registry.attach(ROOT_LOGGER, sink.clone());

            registry.dispatch(&LogEvent::new(Level::Warn, "x", "warn"));
            registry.dispatch(&LogEvent::new(Level::Error, "x", "error"));
            assert_eq!(sink.0.count.load(Ordering::Relaxed), 1);
        }

        #[test]
        fn failures_are_counted_not_raised() {
            let registry = LoggerRegistry::new();
            let (sink, out) = console("STDOUT");
            registry.attach(ROOT_LOGGER, Arc::new(BrokenSink));
            registry.attach(ROOT_LOGGER, sink);

            let appended = registry.dispatch(&LogEvent::new(Level::Error, "x", "still written"));

            assert_eq!(appended, 1);
            assert_eq!(registry.dropped(), 1);
            assert!(out.contents().contains("still written"));
        }

        #[test]
        fn sink_names_listed_in_attach_order() {
            let registry = LoggerRegistry::new();
            let (a, _) = console("STDOUT");
            let (b, _) = console("LOGS");
            registry.attach("jdbc", a);
            registry.attach("jdbc", b);
            assert_eq!(registry.sink_names("jdbc"), vec!["STDOUT", "LOGS"]);
            assert!(registry.sink_names("missing").is_empty());
        }
    }
}
