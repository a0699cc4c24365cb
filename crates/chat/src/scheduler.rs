use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Handle returned by [`Scheduler::schedule`], used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Deterministic timer queue running on virtual time.
///
/// Nothing here sleeps. Owners move time forward with [`TimerDriven::advance`], which
/// fires due tasks in deadline order; tasks sharing a deadline fire in the order they
/// were scheduled. The binary advances by real elapsed time, tests by whatever they like.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, TimerId), T>,
    deadlines: HashMap<TimerId, Duration>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Virtual time elapsed since the scheduler was created.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);

        let deadline = self.now.saturating_add(delay);
        self.queue.insert((deadline, id), task);
        self.deadlines.insert(id, deadline);
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let deadline = self.deadlines.remove(&id)?;
        self.queue.remove(&(deadline, id))
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Time left until the earliest pending task, zero if one is already due.
    pub fn until_next(&self) -> Option<Duration> {
        self.queue
            .keys()
            .next()
            .map(|(deadline, _)| deadline.saturating_sub(self.now))
    }

    /// Pops the earliest task whose deadline is at or before `limit`, moving the
    /// clock to that deadline.
    pub fn pop_due(&mut self, limit: Duration) -> Option<T> {
        let (&(deadline, id), _) = self.queue.iter().next()?;
        if deadline > limit {
            return None;
        }

        self.deadlines.remove(&id);
        self.now = self.now.max(deadline);
        self.queue.remove(&(deadline, id))
    }

    /// Moves the clock forward to `at` without firing anything.
    pub fn settle(&mut self, at: Duration) {
        self.now = self.now.max(at);
    }
}

/// A controller whose deferred work lives on a [`Scheduler`].
pub trait TimerDriven {
    type Task;

    fn scheduler(&self) -> &Scheduler<Self::Task>;
    fn scheduler_mut(&mut self) -> &mut Scheduler<Self::Task>;
    fn fire(&mut self, task: Self::Task);

    fn until_next(&self) -> Option<Duration> {
        self.scheduler().until_next()
    }

    /// Advances virtual time by `elapsed`, firing every task that comes due.
    ///
    /// Tasks scheduled while firing are picked up in the same call when their deadline
    /// falls inside the window. Returns how many tasks fired.
    fn advance(&mut self, elapsed: Duration) -> usize {
        let target = self.scheduler().now().saturating_add(elapsed);
        let mut fired = 0;

        while let Some(task) = self.scheduler_mut().pop_due(target) {
            self.fire(task);
            fired += 1;
        }

        self.scheduler_mut().settle(target);
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        scheduler: Scheduler<&'static str>,
        log: Vec<(Duration, &'static str)>,
    }

    impl TimerDriven for Recorder {
        type Task = &'static str;

        fn scheduler(&self) -> &Scheduler<Self::Task> {
            &self.scheduler
        }

        fn scheduler_mut(&mut self) -> &mut Scheduler<Self::Task> {
            &mut self.scheduler
        }

        fn fire(&mut self, task: Self::Task) {
            self.log.push((self.scheduler.now(), task));
            if task == "chain" {
                self.scheduler.schedule(Duration::from_millis(100), "chained");
            }
        }
    }

    fn recorder() -> Recorder {
        Recorder {
            scheduler: Scheduler::new(),
            log: Vec::new(),
        }
    }

    #[test]
    fn fires_in_deadline_then_schedule_order() {
        let mut recorder = recorder();
        recorder.scheduler.schedule(Duration::from_millis(300), "late");
        recorder.scheduler.schedule(Duration::from_millis(100), "first");
        recorder.scheduler.schedule(Duration::from_millis(100), "second");

        assert_eq!(recorder.advance(Duration::from_millis(99)), 0);
        assert_eq!(recorder.until_next(), Some(Duration::from_millis(1)));

        assert_eq!(recorder.advance(Duration::from_millis(500)), 3);
        let tasks = recorder.log.iter().map(|(_, task)| *task).collect::<Vec<_>>();
        assert_eq!(tasks, vec!["first", "second", "late"]);
        assert_eq!(recorder.log[2].0, Duration::from_millis(300));
        assert_eq!(recorder.scheduler.now(), Duration::from_millis(599));
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let mut recorder = recorder();
        let id = recorder.scheduler.schedule(Duration::from_millis(300), "gone");
        assert!(recorder.scheduler.is_pending(id));

        assert_eq!(recorder.scheduler.cancel(id), Some("gone"));
        assert!(!recorder.scheduler.is_pending(id));
        assert_eq!(recorder.scheduler.cancel(id), None);
        assert_eq!(recorder.advance(Duration::from_secs(1)), 0);
    }

    #[test]
    fn tasks_scheduled_while_firing_run_in_the_same_window() {
        let mut recorder = recorder();
        recorder.scheduler.schedule(Duration::from_millis(50), "chain");

        assert_eq!(recorder.advance(Duration::from_millis(200)), 2);
        assert_eq!(
            recorder.log,
            vec![
                (Duration::from_millis(50), "chain"),
                (Duration::from_millis(150), "chained"),
            ]
        );
    }
}
