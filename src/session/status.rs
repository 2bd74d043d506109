//! User-visible status messages and the sink they are shown on.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

/// Everything the controller ever tells the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMessage {
    MappingInProgress,
    FoundSavedMap,
    MapSaved,
    SnapshotFailed,
    ReadFailed,
    CorruptMap,
    SaveFailed,
    SaveInProgress,
}

impl StatusMessage {
    pub fn text(self) -> &'static str {
        match self {
            Self::MappingInProgress => "Move camera around to map your surrounding space.",
            Self::FoundSavedMap => "Found saved world map.",
            Self::MapSaved => "World map is saved.",
            Self::SnapshotFailed => "Error getting current world map",
            Self::ReadFailed => "Error retrieving world map data.",
            Self::CorruptMap => "Saved world map could not be decoded.",
            Self::SaveFailed => "Error saving world map.",
            Self::SaveInProgress => "World map save already in progress.",
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// A single human-readable text surface.
pub trait StatusSink: Send {
    fn show(&self, text: &str);
}

impl<F> StatusSink for F
where
    F: Fn(&str) + Send,
{
    fn show(&self, text: &str) {
        self(text)
    }
}

/// Shows status by logging it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn show(&self, text: &str) {
        info!(target: "status", "{}", text);
    }
}

/// Records every status text. Clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct StatusLog {
    messages: Arc<Mutex<Vec<String>>>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.messages.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl StatusSink for StatusLog {
    fn show(&self, text: &str) {
        self.messages.lock().push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_texts() {
        assert_eq!(StatusMessage::MapSaved.to_string(), "World map is saved.");
        assert_eq!(
            StatusMessage::MappingInProgress.text(),
            "Move camera around to map your surrounding space."
        );
    }

    #[test]
    fn test_status_log_shared_between_clones() {
        let log = StatusLog::new();
        let sink = log.clone();
        sink.show("one");
        sink.show("two");

        assert_eq!(log.len(), 2);
        assert_eq!(log.last().as_deref(), Some("two"));
        assert_eq!(log.messages(), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(Mutex::new(String::new()));
        let seen_clone = Arc::clone(&seen);
        let sink = move |text: &str| *seen_clone.lock() = text.to_string();

        sink.show("hello");
        assert_eq!(*seen.lock(), "hello");
    }
}
