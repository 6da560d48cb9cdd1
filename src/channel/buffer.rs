use crate::channel::timestamp::LINE_TIMESTAMP_FORMAT;
use chrono::Utc;

/// In-process sink for the log lines of one invocation attempt. Each
/// attempt owns its own buffer; nothing here is shared across attempts.
/// Lines carry the timestamp prefix the extractor recognizes, so shipped
/// events keep their emission time.
#[derive(Debug, Default)]
pub struct LogBuffer {
    lines: Vec<String>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: &str) {
        self.record("INFO", message);
    }

    pub fn error(&mut self, message: &str) {
        self.record("ERROR", message);
    }

    /// Appends an already-formatted line verbatim.
    pub fn push_raw(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn record(&mut self, level: &str, message: &str) {
        let stamp = Utc::now().format(LINE_TIMESTAMP_FORMAT);
        self.lines.push(format!("{level:<8} {stamp} {message}"));
    }
}
