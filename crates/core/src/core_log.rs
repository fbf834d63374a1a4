use parking_lot::Mutex;

/// Severity passed through [`CoreLog::log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Minimal logger for core so the extractor stays host-agnostic.
/// The CLI implements it on stderr; other hosts adapt their own sinks.
pub trait CoreLog: Send + Sync {
    fn info(&self, msg: &str) {
        let _ = msg;
    }
    fn warn(&self, msg: &str) {
        let _ = msg;
    }
    fn error(&self, msg: &str) {
        let _ = msg;
    }
    fn debug(&self, msg: &str) {
        let _ = msg;
    }

    /// Level-dispatching entry point for callers that compute the level at runtime.
    fn log(&self, level: LogLevel, msg: &str) {
        match level {
            LogLevel::Debug => self.debug(msg),
            LogLevel::Info => self.info(msg),
            LogLevel::Warn => self.warn(msg),
            LogLevel::Error => self.error(msg),
        }
    }
}

/// No-op logger if you don't care about logs.
pub struct NoopLog;
impl CoreLog for NoopLog {}

/// Keeps every line in memory. Handy for hosts that surface the last run's log in a UI,
/// and for asserting on degraded-feature warnings in tests.
#[derive(Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().clone()
    }

    /// Messages at exactly `level`.
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn push(&self, level: LogLevel, msg: &str) {
        self.lines.lock().push((level, msg.to_string()));
    }
}

impl CoreLog for MemoryLog {
    fn info(&self, msg: &str) {
        self.push(LogLevel::Info, msg);
    }
    fn warn(&self, msg: &str) {
        self.push(LogLevel::Warn, msg);
    }
    fn error(&self, msg: &str) {
        self.push(LogLevel::Error, msg);
    }
    fn debug(&self, msg: &str) {
        self.push(LogLevel::Debug, msg);
    }
}
