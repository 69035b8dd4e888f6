use std::fmt;

use dashmap::DashMap;

/// Per-listener lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Probing,
    Bound,
    Serving,
    ShuttingDown,
    Stopped,
    Skipped,
}

impl ListenerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ListenerState::Stopped | ListenerState::Skipped)
    }

    fn can_move_to(self, next: ListenerState) -> bool {
        use ListenerState::*;
        matches!(
            (self, next),
            (Probing, Bound)
                | (Probing, Skipped)
                | (Bound, Serving)
                | (Bound, Skipped)
                | (Bound, Stopped)
                | (Serving, ShuttingDown)
                | (Serving, Stopped)
                | (ShuttingDown, Stopped)
        )
    }
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ListenerState::Probing => "probing",
            ListenerState::Bound => "bound",
            ListenerState::Serving => "serving",
            ListenerState::ShuttingDown => "shutting_down",
            ListenerState::Stopped => "stopped",
            ListenerState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Port -> state, shared between the orchestrator and the server tasks.
#[derive(Debug, Default)]
pub struct ListenerTable {
    states: DashMap<u16, ListenerState>,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }

    /// Start tracking `port` in `Probing`. Returns false if it is already tracked.
    pub fn begin(&self, port: u16) -> bool {
        let mut inserted = false;
        self.states.entry(port).or_insert_with(|| {
            inserted = true;
            ListenerState::Probing
        });
        inserted
    }

    /// Move `port` to `next` if the lifecycle allows it.
    pub fn transition(&self, port: u16, next: ListenerState) -> bool {
        let Some(mut entry) = self.states.get_mut(&port) else {
            return false;
        };
        let current = *entry;
        if !current.can_move_to(next) {
            tracing::debug!(port, from = %current, to = %next, "listener transition refused");
            return false;
        }
        *entry = next;
        true
    }

    pub fn get(&self, port: u16) -> Option<ListenerState> {
        self.states.get(&port).map(|r| *r.value())
    }

    /// Ports currently in `state`, ascending.
    pub fn ports_in(&self, state: ListenerState) -> Vec<u16> {
        let mut ports: Vec<u16> = self
            .states
            .iter()
            .filter(|r| *r.value() == state)
            .map(|r| *r.key())
            .collect();
        ports.sort_unstable();
        ports
    }

    pub fn count(&self, state: ListenerState) -> usize {
        self.states.iter().filter(|r| *r.value() == state).count()
    }
}
