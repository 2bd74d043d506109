//! Tracking session state machine.
//!
//! ```text
//! Stopped ──start──▶ Running(Fresh | Resumed)
//! Running ──pause──▶ Paused
//! Paused  ──start──▶ Running(Fresh)
//! ```
//!
//! Every start is a full restart; there is no in-place Running → Running
//! transition.

/// How the current run was initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Started from an empty map.
    Fresh,
    /// Started with a saved world map as prior state.
    Resumed,
}

/// State of the tracking session owned by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Never started.
    #[default]
    Stopped,
    /// Tracking.
    Running(StartMode),
    /// Suspended; the next start re-initializes from scratch.
    Paused,
}

impl SessionState {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running(_))
    }

    pub fn is_paused(self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Whether a start from this state may use a saved map.
    pub fn accepts_initial_map(self) -> bool {
        !self.is_paused()
    }

    /// State after a (re)start.
    pub fn started(self, with_map: bool) -> Self {
        if with_map && self.accepts_initial_map() {
            Self::Running(StartMode::Resumed)
        } else {
            Self::Running(StartMode::Fresh)
        }
    }

    /// State after a pause. Only a running session changes.
    pub fn paused(self) -> Self {
        match self {
            Self::Running(_) => Self::Paused,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_stopped() {
        assert_eq!(SessionState::default(), SessionState::Stopped);
    }

    #[test]
    fn test_start_from_stopped() {
        let s = SessionState::Stopped;
        assert_eq!(s.started(false), SessionState::Running(StartMode::Fresh));
        assert_eq!(s.started(true), SessionState::Running(StartMode::Resumed));
    }

    #[test]
    fn test_restart_while_running() {
        let s = SessionState::Running(StartMode::Fresh);
        assert_eq!(s.started(true), SessionState::Running(StartMode::Resumed));
        let s = SessionState::Running(StartMode::Resumed);
        assert_eq!(s.started(false), SessionState::Running(StartMode::Fresh));
    }

    #[test]
    fn test_paused_only_restarts_fresh() {
        let s = SessionState::Paused;
        assert!(!s.accepts_initial_map());
        assert_eq!(s.started(true), SessionState::Running(StartMode::Fresh));
    }

    #[test]
    fn test_pause_transitions() {
        assert_eq!(
            SessionState::Running(StartMode::Resumed).paused(),
            SessionState::Paused
        );
        assert_eq!(SessionState::Paused.paused(), SessionState::Paused);
        assert_eq!(SessionState::Stopped.paused(), SessionState::Stopped);
    }
}
