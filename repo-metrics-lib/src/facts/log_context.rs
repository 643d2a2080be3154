use core::fmt::{Arguments, Debug, Formatter};
use log::{Level, Log, Metadata, Record};
use std::sync::Arc;

const DEFAULT_TARGET: &str = "repo_metrics";

/// Logging handle passed explicitly to the components that emit diagnostics.
///
/// No global logger is installed; every record is handed straight to the sink
/// this context was created with. Cloning is cheap and clones share the sink.
#[derive(Clone)]
pub struct LogContext {
    sink: Arc<dyn Log>,
    target: &'static str,
}

impl LogContext {
    pub fn new(sink: impl Log + 'static) -> Self {
        Self::shared(Arc::new(sink))
    }

    #[must_use]
    pub fn shared(sink: Arc<dyn Log>) -> Self {
        Self {
            sink,
            target: DEFAULT_TARGET,
        }
    }

    /// A context that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Fanout::new(Vec::new()))
    }

    /// A context sharing this sink but tagging records with a different target.
    #[must_use]
    pub fn with_target(&self, target: &'static str) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            target,
        }
    }

    #[must_use]
    pub fn target(&self) -> &'static str {
        self.target
    }

    #[must_use]
    pub fn enabled(&self, level: Level) -> bool {
        self.sink.enabled(&Metadata::builder().level(level).target(self.target).build())
    }

    pub fn log(&self, level: Level, args: Arguments<'_>) {
        let record = Record::builder().args(args).level(level).target(self.target).build();
        if self.sink.enabled(record.metadata()) {
            self.sink.log(&record);
        }
    }

    pub fn debug(&self, args: Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn info(&self, args: Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn warn(&self, args: Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn error(&self, args: Arguments<'_>) {
        self.log(Level::Error, args);
    }

    pub fn flush(&self) {
        self.sink.flush();
    }
}

impl Debug for LogContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LogContext")
            .field("sink", &"<dyn Log>")
            .field("target", &self.target)
            .finish()
    }
}

/// Forwards each record to every logger that accepts it.
pub struct Fanout {
    loggers: Vec<Box<dyn Log>>,
}

impl Fanout {
    #[must_use]
    pub fn new(loggers: Vec<Box<dyn Log>>) -> Self {
        Self { loggers }
    }
}

impl Debug for Fanout {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Fanout").field("loggers", &self.loggers.len()).finish()
    }
}

impl Log for Fanout {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.loggers.iter().any(|logger| logger.enabled(metadata))
    }

    fn log(&self, record: &Record<'_>) {
        for logger in &self.loggers {
            if logger.enabled(record.metadata()) {
                logger.log(record);
            }
        }
    }

    fn flush(&self) {
        for logger in &self.loggers {
            logger.flush();
        }
    }
}

/// In-memory sink used to assert on emitted diagnostics.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct CapturedLog {
    records: std::sync::Mutex<Vec<(Level, String, String)>>,
}

#[cfg(test)]
impl CapturedLog {
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _, _)| *l == level)
            .map(|(_, _, message)| message.clone())
            .collect()
    }

    pub fn count(&self, level: Level) -> usize {
        self.messages(level).len()
    }

    pub fn count_for(&self, level: Level, target: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, t, _)| *l == level && t == target)
            .count()
    }
}

#[cfg(test)]
impl Log for CapturedLog {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.target().to_string(), record.args().to_string()));
    }

    fn flush(&self) {}
}
