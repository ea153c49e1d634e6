//! Deferred work as an explicit timer queue.
//!
//! The surface owns one scheduler; widgets enqueue tasks against it and
//! the host pumps `advance` from its event loop. Everything scheduled
//! here is fire-and-forget and idempotent, so a leaked timer is wasted
//! work, never a correctness problem. `clear` runs at surface unmount.

pub type TimerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// One pass of the staggered math re-render sweep.
    MathSweep,
    /// Revert a copy button's "copied" acknowledgment.
    CopyAckRevert(u64),
    /// The typesetting loader's last availability check before giving up.
    TypesetFinalProbe,
}

#[derive(Debug)]
struct PendingTimer {
    id: TimerId,
    fire_at: u64,
    task: TimerTask,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: u64,
    next_id: TimerId,
    pending: Vec<PendingTimer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn schedule(&mut self, delay_ms: u64, task: TimerTask) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(PendingTimer {
            id,
            fire_at: self.now_ms.saturating_add(delay_ms),
            task,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) {
        self.pending.retain(|t| t.id != id);
    }

    /// Advance the clock and drain every task whose deadline passed, in
    /// firing order.
    pub fn advance(&mut self, by_ms: u64) -> Vec<TimerTask> {
        self.now_ms = self.now_ms.saturating_add(by_ms);
        let now = self.now_ms;

        let mut due: Vec<PendingTimer> = Vec::new();
        let mut rest: Vec<PendingTimer> = Vec::new();
        for timer in self.pending.drain(..) {
            if timer.fire_at <= now {
                due.push(timer);
            } else {
                rest.push(timer);
            }
        }
        self.pending = rest;

        due.sort_by_key(|t| (t.fire_at, t.id));
        due.into_iter().map(|t| t.task).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop every pending timer. Called when the surface unmounts.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(600, TimerTask::MathSweep);
        scheduler.schedule(150, TimerTask::CopyAckRevert(1));

        assert_eq!(scheduler.advance(200), vec![TimerTask::CopyAckRevert(1)]);
        assert_eq!(scheduler.advance(500), vec![TimerTask::MathSweep]);
        assert_eq!(scheduler.pending_len(), 0);
    }

    #[test]
    fn cancel_removes_a_pending_timer() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule(100, TimerTask::TypesetFinalProbe);
        scheduler.cancel(id);
        assert!(scheduler.advance(200).is_empty());
    }

    #[test]
    fn clear_disposes_everything() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(100, TimerTask::MathSweep);
        scheduler.schedule(200, TimerTask::MathSweep);
        scheduler.clear();
        assert_eq!(scheduler.pending_len(), 0);
    }
}
