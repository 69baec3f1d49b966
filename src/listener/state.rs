#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Created, never started
    Idle,

    /// Read task active
    Running,

    /// Stop requested or fatal read error; read task unwinding
    Stopping,

    /// Read task fully exited
    Stopped,
}

impl ListenerState {
    /// Check if the read task is active
    pub fn is_running(&self) -> bool {
        *self == ListenerState::Running
    }

    /// Check if the listener can be started
    pub fn can_start(&self) -> bool {
        matches!(self, ListenerState::Idle | ListenerState::Stopped)
    }

    /// Validate transition
    pub fn can_transition_to(&self, next: ListenerState) -> bool {
        match (*self, next) {
            (ListenerState::Idle, ListenerState::Running) => true,
            (ListenerState::Running, ListenerState::Stopping) => true,
            (ListenerState::Stopping, ListenerState::Stopped) => true,
            (ListenerState::Stopped, ListenerState::Running) => true,
            _ => false,
        }
    }
}
