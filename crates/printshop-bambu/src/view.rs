//! Caller-side view of the latest printer status.

use std::time::{Duration, Instant};

use crate::bridge::{LinkState, StatusUpdate};
use crate::status::{MachineState, PrinterStatus};

/// What the interface shows, built from [`StatusUpdate`]s on its own thread.
///
/// Stored fields are never cleared. When `stale_after` is set and no update
/// has arrived for that long, the displayed machine state reads
/// [`MachineState::Unknown`] while the other fields keep their last values.
#[derive(Debug, Clone)]
pub struct StatusView {
    status: PrinterStatus,
    link: LinkState,
    updated_at: Option<Instant>,
    stale_after: Option<Duration>,
}

impl StatusView {
    /// Empty view.
    pub fn new(stale_after: Option<Duration>) -> Self {
        Self {
            status: PrinterStatus::default(),
            link: LinkState::Idle,
            updated_at: None,
            stale_after,
        }
    }

    /// Take in an update from the bridge.
    pub fn apply(&mut self, update: StatusUpdate) {
        self.status = update.status;
        self.link = update.link;
        self.updated_at = Some(update.at);
    }

    /// Last known status, stale or not.
    pub fn status(&self) -> &PrinterStatus {
        &self.status
    }

    /// Link state from the latest update.
    pub fn link(&self) -> &LinkState {
        &self.link
    }

    /// True if the latest update is older than `stale_after` at `now`.
    pub fn is_stale_at(&self, now: Instant) -> bool {
        match (self.stale_after, self.updated_at) {
            (Some(limit), Some(at)) => now.saturating_duration_since(at) > limit,
            _ => false,
        }
    }

    /// Machine state to display at `now`.
    pub fn display_state_at(&self, now: Instant) -> MachineState {
        if self.is_stale_at(now) {
            MachineState::Unknown
        } else {
            self.status.state.clone()
        }
    }

    /// Machine state to display right now.
    pub fn display_state(&self) -> MachineState {
        self.display_state_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(state: MachineState, at: Instant) -> StatusUpdate {
        StatusUpdate {
            status: PrinterStatus {
                state,
                percent: 40.0,
                ..Default::default()
            },
            link: LinkState::Online,
            at,
        }
    }

    #[test]
    fn test_goes_unknown_after_timeout() {
        let start = Instant::now();
        let mut view = StatusView::new(Some(Duration::from_secs(30)));
        view.apply(update(MachineState::Running, start));

        assert_eq!(view.display_state_at(start + Duration::from_secs(10)), MachineState::Running);
        assert_eq!(view.display_state_at(start + Duration::from_secs(31)), MachineState::Unknown);
        // fields are kept
        assert_eq!(view.status().percent, 40.0);
        assert_eq!(view.status().state, MachineState::Running);
    }

    #[test]
    fn test_never_stale_without_limit() {
        let start = Instant::now();
        let mut view = StatusView::new(None);
        view.apply(update(MachineState::Pause, start));
        assert_eq!(
            view.display_state_at(start + Duration::from_secs(3600)),
            MachineState::Pause
        );
    }

    #[test]
    fn test_fresh_update_clears_staleness() {
        let start = Instant::now();
        let mut view = StatusView::new(Some(Duration::from_secs(5)));
        view.apply(update(MachineState::Running, start));
        let later = start + Duration::from_secs(10);
        assert!(view.is_stale_at(later));

        view.apply(update(MachineState::Finish, later));
        assert_eq!(view.display_state_at(later), MachineState::Finish);
    }

    #[test]
    fn test_empty_view() {
        let view = StatusView::new(Some(Duration::from_secs(5)));
        assert_eq!(view.display_state(), MachineState::Offline);
        assert_eq!(view.link(), &LinkState::Idle);
    }
}
