//! Host-driven cooperative tasks.
//!
//! There are no timers and no threads here. A task exposes exactly two
//! entry points, `reset` and `cycle`, and the host calls
//! [`TaskRunner::step`] from its own idle tick. Each step runs a bounded
//! number of cycles and yields, so a long drain never starves the
//! editing loop.

use tracing::trace;

pub trait Task<C> {
    /// Take a fresh snapshot of the work to do.
    fn reset(&mut self, ctx: &mut C);

    /// Do one bounded slice of work. Returns `true` while more work
    /// remains.
    fn cycle(&mut self, ctx: &mut C) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
    Stopped,
    Completed,
    /// Permanently shut down. No state leads out of this one.
    Terminated,
}

#[derive(Debug)]
pub struct TaskRunner<T> {
    task: T,
    state: RunnerState,
    max_cycles_per_step: usize,
}

impl<T> TaskRunner<T> {
    pub fn new(task: T, max_cycles_per_step: usize) -> Self {
        Self {
            task,
            state: RunnerState::Idle,
            max_cycles_per_step: max_cycles_per_step.max(1),
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunnerState::Running
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    /// Snapshot and begin. Restarts a completed or stopped runner;
    /// ignored once terminated.
    pub fn start<C>(&mut self, ctx: &mut C)
    where
        T: Task<C>,
    {
        if self.state == RunnerState::Terminated {
            return;
        }
        self.task.reset(ctx);
        self.state = RunnerState::Running;
    }

    /// Re-snapshot without changing the run state. A runner that was
    /// mid-drain keeps draining, from the new snapshot.
    pub fn reset<C>(&mut self, ctx: &mut C)
    where
        T: Task<C>,
    {
        if self.state == RunnerState::Terminated {
            return;
        }
        self.task.reset(ctx);
        if self.state == RunnerState::Completed {
            self.state = RunnerState::Running;
        }
    }

    pub fn stop(&mut self) {
        if self.state == RunnerState::Running {
            self.state = RunnerState::Stopped;
        }
    }

    pub fn resume(&mut self) {
        if self.state == RunnerState::Stopped {
            self.state = RunnerState::Running;
        }
    }

    pub fn terminate(&mut self) {
        self.state = RunnerState::Terminated;
    }

    /// The host's tick. Runs up to `max_cycles_per_step` cycles and
    /// yields. Returns `true` while the runner still has work queued.
    pub fn step<C>(&mut self, ctx: &mut C) -> bool
    where
        T: Task<C>,
    {
        if self.state != RunnerState::Running {
            return false;
        }
        for cycle in 0..self.max_cycles_per_step {
            if !self.task.cycle(ctx) {
                trace!(cycles = cycle + 1, "task drained");
                self.state = RunnerState::Completed;
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts down `remaining` units of work, one per cycle.
    struct Countdown {
        total: usize,
        remaining: usize,
        cycles: usize,
    }

    impl Task<()> for Countdown {
        fn reset(&mut self, _ctx: &mut ()) {
            self.remaining = self.total;
            self.cycles = 0;
        }

        fn cycle(&mut self, _ctx: &mut ()) -> bool {
            self.cycles += 1;
            self.remaining = self.remaining.saturating_sub(1);
            self.remaining > 0
        }
    }

    fn countdown(total: usize) -> Countdown {
        Countdown {
            total,
            remaining: 0,
            cycles: 0,
        }
    }

    #[test]
    fn test_step_bounds_cycles_and_yields() {
        let mut runner = TaskRunner::new(countdown(12), 5);
        runner.start(&mut ());

        assert!(runner.step(&mut ()));
        assert_eq!(runner.task().cycles, 5);
        assert!(runner.step(&mut ()));
        assert!(!runner.step(&mut ()));
        assert_eq!(runner.state(), RunnerState::Completed);
        assert_eq!(runner.task().cycles, 12);
    }

    #[test]
    fn test_stop_resume_and_terminate() {
        let mut runner = TaskRunner::new(countdown(100), 5);
        runner.start(&mut ());
        assert!(runner.step(&mut ()));

        runner.stop();
        assert_eq!(runner.state(), RunnerState::Stopped);
        assert!(!runner.step(&mut ()));
        assert_eq!(runner.task().cycles, 5);

        runner.resume();
        assert!(runner.step(&mut ()));
        assert_eq!(runner.task().cycles, 10);

        runner.terminate();
        assert_eq!(runner.state(), RunnerState::Terminated);
        runner.start(&mut ());
        runner.resume();
        assert!(!runner.step(&mut ()));
        assert_eq!(runner.state(), RunnerState::Terminated);
    }

    #[test]
    fn test_start_restarts_completed_runner() {
        let mut runner = TaskRunner::new(countdown(3), 5);
        runner.start(&mut ());
        assert!(!runner.step(&mut ()));
        assert_eq!(runner.state(), RunnerState::Completed);

        runner.start(&mut ());
        assert_eq!(runner.state(), RunnerState::Running);
        assert!(!runner.step(&mut ()));
        assert_eq!(runner.task().cycles, 3);
    }
}
