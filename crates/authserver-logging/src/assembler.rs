//! Sink construction and logger binding.
//!
//! [`LoggingAssembler::assemble`] builds and starts the four sinks of the
//! auth server. [`LoggingAssembler::bind_loggers`] then wires them to the
//! loggers listed in [`binding_table`].

use std::io::{self, Write};
use std::sync::Arc;

use logncrash_client::LogSender;
use tracing::{debug, info};

use crate::config::LoggingConfig;
use crate::encoder::PatternEncoder;
use crate::error::Result;
use crate::filter::LevelFilter;
use crate::forwarder::{LogForwarder, RemoteSink};
use crate::level::Level;
use crate::registry::{LoggerRegistry, ROOT_LOGGER};
use crate::rolling::{DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_HISTORY, RollingFileSink, RollingPolicy};
use crate::sink::{ConsoleSink, Sink};

/// Name of the console sink.
pub const STDOUT_SINK: &str = "STDOUT";
/// Name of the main rolling file sink.
pub const LOGS_SINK: &str = "LOGS";
/// Name of the error-only rolling file sink.
pub const ERROR_SINK: &str = "ERROR";
/// Name of the remote forwarding sink.
pub const LOGNCRASH_SINK: &str = "LOGNCRASH";

/// One row of the binding table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerBinding {
    /// Logger name.
    pub name: String,
    /// Level threshold.
    pub level: Level,
    /// Whether events continue to the parent's sinks.
    pub additive: bool,
}

impl LoggerBinding {
    /// Creates a binding row.
    #[must_use]
    pub fn new(name: impl Into<String>, level: Level, additive: bool) -> Self {
        Self {
            name: name.into(),
            level,
            additive,
        }
    }

    /// Whether this logger also gets the remote sink. Only debug-level
    /// loggers do.
    #[must_use]
    pub fn remote(&self) -> bool {
        self.level == Level::Debug
    }
}

/// Loggers configured for the auth server, `app_logger` last.
#[must_use]
pub fn binding_table(app_logger: &str) -> Vec<LoggerBinding> {
    vec![
        LoggerBinding::new(ROOT_LOGGER, Level::Info, true),
        LoggerBinding::new("jdbc", Level::Info, false),
        LoggerBinding::new("jdbc.sqlonly", Level::Info, false),
        LoggerBinding::new("jdbc.sqltiming", Level::Info, false),
        LoggerBinding::new(app_logger, Level::Debug, false),
    ]
}

/// The four started sinks.
#[derive(Debug, Clone)]
pub struct AssembledSinks {
    /// Console output.
    pub console: Arc<ConsoleSink>,
    /// Main rolling file.
    pub logs: Arc<RollingFileSink>,
    /// Error-only rolling file.
    pub error: Arc<RollingFileSink>,
    /// Remote forwarding.
    pub remote: Arc<RemoteSink>,
}

impl AssembledSinks {
    /// Sinks attached to every logger.
    #[must_use]
    pub fn local(&self) -> [Arc<dyn Sink>; 3] {
        [
            self.console.clone(),
            self.logs.clone(),
            self.error.clone(),
        ]
    }

    /// All four sinks in assembly order.
    #[must_use]
    pub fn all(&self) -> [Arc<dyn Sink>; 4] {
        [
            self.console.clone(),
            self.logs.clone(),
            self.error.clone(),
            self.remote.clone(),
        ]
    }
}

/// Builds sinks and loggers from a [`LoggingConfig`].
#[derive(Debug)]
pub struct LoggingAssembler {
    config: LoggingConfig,
    sender: Arc<dyn LogSender>,
}

impl LoggingAssembler {
    /// Creates an assembler. `sender` receives one request per forwarded
    /// event.
    #[must_use]
    pub fn new(config: LoggingConfig, sender: Arc<dyn LogSender>) -> Self {
        Self { config, sender }
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// Builds and starts the sinks, writing console output to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a sink cannot be
    /// started, e.g. because a log directory cannot be created.
    pub fn assemble(&self) -> Result<AssembledSinks> {
        self.assemble_with_console(Box::new(io::stdout()))
    }

    /// Like [`assemble`](Self::assemble) with console output sent to
    /// `writer`.
    ///
    /// # Errors
    ///
    /// See [`assemble`](Self::assemble).
    pub fn assemble_with_console(&self, writer: Box<dyn Write + Send>) -> Result<AssembledSinks> {
        self.config.validate()?;
        let encoder = PatternEncoder::new();

        let console = ConsoleSink::with_writer(STDOUT_SINK, encoder, writer);
        console.start()?;

        let logs = RollingFileSink::new(
            LOGS_SINK,
            self.config.log_file(),
            self.policy(self.config.log_archive_dir()),
            encoder,
        );
        logs.start()?;
        info!(
            path = %logs.path().display(),
            archives = %logs.policy().archive_pattern(),
            "rolling log file opened"
        );

        let error = RollingFileSink::new(
            ERROR_SINK,
            self.config.error_file(),
            self.policy(self.config.error_dir()),
            encoder,
        )
        .with_filter(LevelFilter::accept_only(Level::Error));
        error.start()?;
        info!(path = %error.path().display(), "error log file opened");

        let forwarder = LogForwarder::new(self.config.clone(), Arc::clone(&self.sender));
        let remote = RemoteSink::new(LOGNCRASH_SINK, forwarder);
        remote.start()?;
        debug!(app_key = %self.config.app_key, "remote sink started");

        Ok(AssembledSinks {
            console: Arc::new(console),
            logs: Arc::new(logs),
            error: Arc::new(error),
            remote: Arc::new(remote),
        })
    }

    /// Creates the registry from [`binding_table`]: every logger gets the
    /// three local sinks, debug-level loggers also get the remote sink.
    #[must_use]
    pub fn bind_loggers(&self, sinks: &AssembledSinks) -> LoggerRegistry {
        let registry = LoggerRegistry::new();
        for binding in binding_table(&self.config.app_logger) {
            registry.configure(&binding.name, binding.level, binding.additive);
            for sink in sinks.local() {
                registry.attach(&binding.name, sink);
            }
            if binding.remote() {
                registry.attach(&binding.name, sinks.remote.clone());
            }
            debug!(
                logger = %binding.name,
                level = %binding.level,
                additive = binding.additive,
                remote = binding.remote(),
                "logger bound"
            );
        }
        registry
    }

    fn policy(&self, archive_dir: std::path::PathBuf) -> RollingPolicy {
        RollingPolicy::new(archive_dir, self.config.file_name.clone())
            .with_max_file_size(DEFAULT_MAX_FILE_SIZE)
            .with_max_history(DEFAULT_MAX_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LogEvent;
    use crate::filter::FilterReply;
    use crate::rolling::FileSize;
    use crate::sink::SharedBuffer;
    use logncrash_client::RecordingSender;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn config_at(dir: &Path) -> LoggingConfig {
        LoggingConfig::new(
            "1.0",
            "h1",
            "web",
            "v1",
            "auth",
            "app",
            "buzz",
            dir.display().to_string(),
            "app",
        )
    }

    struct Fixture {
        _dir: TempDir,
        base: PathBuf,
        sender: Arc<RecordingSender>,
        console: SharedBuffer,
        sinks: AssembledSinks,
        registry: LoggerRegistry,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().expect("temp dir");
        let base = dir.path().join("auth");
        let sender = Arc::new(RecordingSender::new());
        let console = SharedBuffer::default();
        let assembler = LoggingAssembler::new(config_at(&base), sender.clone());
        let sinks = assembler
            .assemble_with_console(Box::new(console.clone()))
            .expect("assemble");
        let registry = assembler.bind_loggers(&sinks);
        Fixture {
            _dir: dir,
            base,
            sender,
            console,
            sinks,
            registry,
        }
    }

    mod table_tests {
        use super::*;

        #[test]
        fn five_rows_in_order() {
            let names: Vec<String> = binding_table("authserver")
                .into_iter()
                .map(|b| b.name)
                .collect();
            assert_eq!(
                names,
                vec!["root", "jdbc", "jdbc.sqlonly", "jdbc.sqltiming", "authserver"]
            );
        }

        #[test]
        fn only_app_logger_is_remote() {
            let remote: Vec<String> = binding_table("store.buzzbook")
                .into_iter()
                .filter(LoggerBinding::remote)
                .map(|b| b.name)
                .collect();
            assert_eq!(remote, vec!["store.buzzbook"]);
        }

        #[test]
        fn only_root_is_additive() {
            for binding in binding_table("authserver") {
                assert_eq!(binding.additive, binding.name == ROOT_LOGGER, "{}", binding.name);
            }
        }
    }

    mod assemble_tests {
        use super::*;

        #[test]
        fn four_started_sinks() {
            let f = fixture();
            let names: Vec<String> = f.sinks.all().iter().map(|s| s.name().to_string()).collect();
            assert_eq!(names, vec!["STDOUT", "LOGS", "ERROR", "LOGNCRASH"]);
            assert!(f.sinks.all().iter().all(|s| s.is_started()));
        }

        #[test]
        fn file_layout() {
            let f = fixture();
            assert_eq!(f.sinks.logs.path(), f.base.join("app.log"));
            assert_eq!(f.sinks.logs.policy().archive_dir, f.base.join("LOGS"));
            assert_eq!(f.sinks.error.path(), f.base.join("ERROR").join("app.log"));
            assert_eq!(f.sinks.error.policy().archive_dir, f.base.join("ERROR"));
            assert!(f.base.join("app.log").exists());
            assert!(f.base.join("ERROR").join("app.log").exists());
        }

        #[test]
        fn rolling_parameters() {
            let f = fixture();
            for sink in [&f.sinks.logs, &f.sinks.error] {
                assert_eq!(sink.policy().max_file_size, FileSize::mb(10));
                assert_eq!(sink.policy().max_history, 30);
            }
        }

        #[test]
        fn error_sink_filters_exactly_error() {
            let f = fixture();
            assert_eq!(f.sinks.error.filters(), &[LevelFilter::accept_only(Level::Error)]);
            for level in Level::ALL {
                let event = LogEvent::new(level, "authserver", "x");
                let expected = if level == Level::Error {
                    FilterReply::Accept
                } else {
                    FilterReply::Deny
                };
                assert_eq!(f.sinks.error.decide(&event), expected);
            }
            assert!(f.sinks.logs.filters().is_empty());
        }

        #[test]
        fn invalid_config_is_rejected() {
            let dir = TempDir::new().expect("temp dir");
            let mut config = config_at(dir.path());
            config.file_name.clear();
            let assembler = LoggingAssembler::new(config, Arc::new(RecordingSender::new()));
            assert!(assembler.assemble().is_err());
        }

        #[test]
        fn unwritable_path_is_rejected() {
            let dir = TempDir::new().expect("temp dir");
            let blocker = dir.path().join("blocker");
            std::fs::write(&blocker, "file, not a directory").expect("write");

            let assembler =
                LoggingAssembler::new(config_at(&blocker.join("auth")), Arc::new(RecordingSender::new()));
            assert!(assembler.assemble_with_console(Box::new(SharedBuffer::default())).is_err());
        }
    }

    mod bind_tests {
        use super::*;

        #[test]
        fn every_logger_has_local_sinks() {
            let f = fixture();
            for binding in binding_table("authserver") {
                let names = f.registry.sink_names(&binding.name);
                assert_eq!(&names[..3], &["STDOUT", "LOGS", "ERROR"], "{}", binding.name);
            }
        }

        #[test]
        fn exactly_one_logger_is_remote() {
            let f = fixture();
            let remote: Vec<String> = f
                .registry
                .logger_names()
                .into_iter()
                .filter(|name| f.registry.sink_names(name).iter().any(|s| s == LOGNCRASH_SINK))
                .collect();
            assert_eq!(remote, vec!["authserver"]);
        }

        #[test]
        fn levels_and_additivity() {
            let f = fixture();
            assert_eq!(f.registry.level_of("root"), Some(Level::Info));
            assert_eq!(f.registry.level_of("jdbc.sqltiming"), Some(Level::Info));
            assert_eq!(f.registry.level_of("authserver"), Some(Level::Debug));
            assert_eq!(f.registry.is_additive("root"), Some(true));
            assert_eq!(f.registry.is_additive("jdbc"), Some(false));
            assert_eq!(f.registry.is_additive("authserver"), Some(false));
        }
    }

    mod scenario_tests {
        use super::*;

        #[test]
        fn debug_on_app_logger_is_forwarded_not_in_error_file() {
            let f = fixture();
            f.registry
                .dispatch(&LogEvent::new(Level::Debug, "authserver", "user login failed"));

            let requests = f.sender.requests();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].body, "user login failed");
            assert_eq!(requests[0].log_level, "DEBUG");
            assert_eq!(requests[0].project_name, "buzz");

            let error_file = std::fs::read_to_string(f.sinks.error.path()).expect("read");
            assert!(error_file.is_empty());
            let main_file = std::fs::read_to_string(f.sinks.logs.path()).expect("read");
            assert!(main_file.contains("user login failed"));
            assert!(f.console.contents().contains("user login failed"));
        }

        #[test]
        fn error_lands_in_both_files_once() {
            let f = fixture();
            f.registry
                .dispatch(&LogEvent::new(Level::Error, "authserver.token", "signing key missing"));

            let error_file = std::fs::read_to_string(f.sinks.error.path()).expect("read");
            assert_eq!(error_file.matches("signing key missing").count(), 1);
            let main_file = std::fs::read_to_string(f.sinks.logs.path()).expect("read");
            assert_eq!(main_file.matches("signing key missing").count(), 1);
            assert_eq!(f.sender.len(), 1);
        }

        #[test]
        fn jdbc_debug_is_suppressed() {
            let f = fixture();
            let appended = f
                .registry
                .dispatch(&LogEvent::new(Level::Debug, "jdbc.sqlonly", "select 1"));
            assert_eq!(appended, 0);
            assert!(f.console.contents().is_empty());
        }

        #[test]
        fn jdbc_info_is_written_once_and_not_forwarded() {
            let f = fixture();
            f.registry
                .dispatch(&LogEvent::new(Level::Info, "jdbc.sqltiming", "select 1 {executed in 2 msec}"));

            assert_eq!(f.console.contents().matches("select 1").count(), 1);
            assert!(f.sender.is_empty());
        }

        #[test]
        fn other_loggers_use_root_info() {
            let f = fixture();
            f.registry.dispatch(&LogEvent::new(Level::Debug, "tower_http", "hidden"));
            f.registry.dispatch(&LogEvent::new(Level::Info, "tower_http", "shown"));

            let out = f.console.contents();
            assert!(!out.contains("hidden"));
            assert!(out.contains("shown"));
            assert!(f.sender.is_empty());
        }

        #[test]
        fn forwarding_failure_is_counted() {
            let f = fixture();
            f.sender.set_failing(true);
            let appended = f
                .registry
                .dispatch(&LogEvent::new(Level::Debug, "authserver", "still local"));

            assert_eq!(appended, 2);
            assert_eq!(f.registry.dropped(), 1);
            assert!(f.console.contents().contains("still local"));
        }
    }
}
