use std::time::{Duration, Instant};

/// Pure-logic write debouncer.
///
/// Every mutation pushes the deadline out by the configured delay; the write
/// fires once mutations pause. Instants are caller-supplied so debounce
/// policy is testable without a runtime or wall-clock sleeps.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Records a mutation at `now`, deferring the pending write.
    pub fn note_mutation(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// True while a write is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Deadline of the pending write, for schedulers.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consumes the pending write if its deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Clears any pending write without firing it.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
