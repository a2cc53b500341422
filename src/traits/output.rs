use std::sync::Mutex;

use crate::output::Tone;

/// User-facing terminal output, separate from `tracing` diagnostics
pub trait Output: Send + Sync {
    fn success(&self, message: &str);

    fn error(&self, message: &str);

    fn warning(&self, message: &str);

    fn info(&self, message: &str);

    /// Header with a separator line
    fn section(&self, title: &str);

    /// Smaller header, used for groups inside a section
    fn subsection(&self, title: &str);

    fn key_value(&self, key: &str, value: &str);

    /// Line led by a coloured label
    fn labeled(&self, label: &str, tone: Tone, message: &str);

    /// Muted detail line
    fn dimmed(&self, message: &str);

    fn blank(&self);
}

/// Output on the terminal, through [`crate::output`]
pub struct TerminalOutput;

impl Output for TerminalOutput {
    fn success(&self, message: &str) {
        crate::output::success(message);
    }

    fn error(&self, message: &str) {
        crate::output::error(message);
    }

    fn warning(&self, message: &str) {
        crate::output::warning(message);
    }

    fn info(&self, message: &str) {
        crate::output::info(message);
    }

    fn section(&self, title: &str) {
        crate::output::section(title);
    }

    fn subsection(&self, title: &str) {
        crate::output::subsection(title);
    }

    fn key_value(&self, key: &str, value: &str) {
        crate::output::key_value(key, value);
    }

    fn labeled(&self, label: &str, tone: Tone, message: &str) {
        crate::output::labeled(label, tone, message);
    }

    fn dimmed(&self, message: &str) {
        crate::output::dimmed(message);
    }

    fn blank(&self) {
        crate::output::blank();
    }
}

/// A message captured by [`MockOutput`]
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMessage {
    Success(String),
    Error(String),
    Warning(String),
    Info(String),
    Section(String),
    Subsection(String),
    KeyValue(String, String),
    Labeled(String, Tone, String),
    Dimmed(String),
    Blank,
}

/// Captures everything written, for assertions in tests
#[cfg(test)]
#[derive(Default)]
pub struct MockOutput {
    messages: Mutex<Vec<OutputMessage>>,
}

#[cfg(test)]
impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_messages(&self) -> Vec<OutputMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn get_warnings(&self) -> Vec<String> {
        self.get_messages()
            .into_iter()
            .filter_map(|m| match m {
                OutputMessage::Warning(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    /// First value printed for `key`
    pub fn value_for(&self, key: &str) -> Option<String> {
        self.get_messages().into_iter().find_map(|m| match m {
            OutputMessage::KeyValue(k, v) if k == key => Some(v),
            _ => None,
        })
    }

    /// Labelled lines as `(label, message)`
    pub fn labeled_lines(&self) -> Vec<(String, String)> {
        self.get_messages()
            .into_iter()
            .filter_map(|m| match m {
                OutputMessage::Labeled(label, _, message) => Some((label, message)),
                _ => None,
            })
            .collect()
    }

    pub fn has_error(&self) -> bool {
        self.get_messages()
            .iter()
            .any(|m| matches!(m, OutputMessage::Error(_)))
    }

    fn push(&self, message: OutputMessage) {
        self.messages.lock().unwrap().push(message);
    }
}

#[cfg(test)]
impl Output for MockOutput {
    fn success(&self, message: &str) {
        self.push(OutputMessage::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(OutputMessage::Error(message.to_string()));
    }

    fn warning(&self, message: &str) {
        self.push(OutputMessage::Warning(message.to_string()));
    }

    fn info(&self, message: &str) {
        self.push(OutputMessage::Info(message.to_string()));
    }

    fn section(&self, title: &str) {
        self.push(OutputMessage::Section(title.to_string()));
    }

    fn subsection(&self, title: &str) {
        self.push(OutputMessage::Subsection(title.to_string()));
    }

    fn key_value(&self, key: &str, value: &str) {
        self.push(OutputMessage::KeyValue(key.to_string(), value.to_string()));
    }

    fn labeled(&self, label: &str, tone: Tone, message: &str) {
        self.push(OutputMessage::Labeled(
            label.to_string(),
            tone,
            message.to_string(),
        ));
    }

    fn dimmed(&self, message: &str) {
        self.push(OutputMessage::Dimmed(message.to_string()));
    }

    fn blank(&self) {
        self.push(OutputMessage::Blank);
    }
}
