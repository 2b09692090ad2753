// src/detect/availability.rs

//! Host availability state kept per detector.
//!
//! The state remembers whether the previous resolution attempt found no
//! reachable host, and whether that happened at startup or during a check.
//! Transitions are pure so they can be tested without any host.

/// Availability as seen by one detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostAvailability {
    #[default]
    Available,
    OfflineAtStartup,
    OfflineAtCheck,
}

/// What the detector must do with the selection of this check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    /// Compare with the stored memory, report, refresh.
    Compare,
    /// Take the fresh result as baseline without reporting a change.
    AdoptBaseline,
    /// Report unchanged and keep the stored memory untouched.
    Hold,
    /// Report unchanged and set the memory to "nothing found".
    Reset,
}

impl HostAvailability {
    /// State after the startup selection.
    pub fn on_startup(reachable: bool) -> Self {
        if reachable {
            HostAvailability::Available
        } else {
            HostAvailability::OfflineAtStartup
        }
    }

    /// Next state and action for a check selection.
    pub fn on_check(self, reachable: bool) -> (Self, PollAction) {
        use HostAvailability::*;
        match (self, reachable) {
            (OfflineAtStartup, false) => (OfflineAtStartup, PollAction::Reset),
            (OfflineAtStartup, true) => (Available, PollAction::AdoptBaseline),
            (Available, false) | (OfflineAtCheck, false) => (OfflineAtCheck, PollAction::Hold),
            (Available, true) | (OfflineAtCheck, true) => (Available, PollAction::Compare),
        }
    }
}
