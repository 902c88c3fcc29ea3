/// A cancel-and-reschedule debounce: many rapid events within the quiet period coalesce
/// into a single firing after it elapses.
///
/// Time is injected by the host as `now_ms` arguments; the scheduler holds no timer of
/// its own. Idle ⇔ no deadline; pending ⇔ a deadline is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebounceScheduler {
    delay_ms: u64,
    deadline: Option<u64>,
}

impl DebounceScheduler {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            deadline: None,
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn set_delay_ms(&mut self, delay_ms: u64) {
        self.delay_ms = delay_ms;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Starts the quiet period, or restarts it if one is already pending.
    pub fn schedule(&mut self, now_ms: u64) {
        self.deadline = Some(now_ms.saturating_add(self.delay_ms));
    }

    pub fn cancel_pending(&mut self) {
        self.deadline = None;
    }

    /// Returns `true` (and goes idle) once the quiet period has elapsed.
    pub fn fire_due(&mut self, now_ms: u64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
