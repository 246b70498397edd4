//! Load lifecycle FSM for resources populated at startup and released at
//! shutdown.
//!
//! Phases:
//! - Empty
//! - Loaded
//! - Cleared
//!
//! Tracks how long each phase lasted.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoadPhase { Empty, Loaded, Cleared }

impl LoadPhase {
    pub fn as_str(&self) -> &'static str {
        match self { LoadPhase::Empty => "empty", LoadPhase::Loaded => "loaded", LoadPhase::Cleared => "cleared" }
    }
}

#[derive(Debug)]
pub struct Lifecycle {
    phase: LoadPhase,
    started_at: Instant,
    phase_started_at: Instant,
    phase_durations: Vec<(LoadPhase, Duration)>,
}

impl Default for Lifecycle {
    fn default() -> Self { Self::new() }
}

impl Lifecycle {
    pub fn new() -> Self { let now = Instant::now(); Self { phase: LoadPhase::Empty, started_at: now, phase_started_at: now, phase_durations: Vec::new() } }
    pub fn phase(&self) -> LoadPhase { self.phase }

    /// Moves to the next phase. `Cleared` is terminal.
    pub fn advance(&mut self) -> LoadPhase {
        let next = match self.phase { LoadPhase::Empty => LoadPhase::Loaded, LoadPhase::Loaded | LoadPhase::Cleared => LoadPhase::Cleared };
        if next != self.phase {
            let now = Instant::now();
            self.phase_durations.push((self.phase, now - self.phase_started_at));
            self.phase = next;
            self.phase_started_at = now;
        }
        self.phase
    }

    pub fn is_loaded(&self) -> bool { self.phase == LoadPhase::Loaded }
    pub fn uptime(&self) -> Duration { self.started_at.elapsed() }
    pub fn durations(&self) -> &[(LoadPhase, Duration)] { &self.phase_durations }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn fsm_progresses_to_terminal_phase() {
        let mut st = Lifecycle::new();
        assert_eq!(st.phase(), LoadPhase::Empty);
        assert_eq!(st.advance(), LoadPhase::Loaded);
        assert!(st.is_loaded());
        assert_eq!(st.advance(), LoadPhase::Cleared);
        assert_eq!(st.advance(), LoadPhase::Cleared);
        assert_eq!(st.durations().len(), 2);
        assert!(!st.is_loaded());
    }

    #[test]
    fn phase_names_are_lowercase() {
        assert_eq!(LoadPhase::Loaded.as_str(), "loaded");
        assert_eq!(serde_json::to_string(&LoadPhase::Cleared).unwrap(), "\"cleared\"");
    }
}
