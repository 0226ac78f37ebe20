use std::fmt;

use crate::{Error, Result};

const DEFAULT_TIMER_STEP_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(i64);

impl TimerId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something that can arm and cancel repeating timers on behalf of a component.
pub trait TimerHost {
    fn set_interval(&mut self, interval_ms: i64) -> TimerId;

    /// Cancels a pending (or currently running) timer. Returns whether it existed.
    fn clear_timer(&mut self, id: TimerId) -> bool;
}

#[derive(Debug, Clone)]
struct ScheduledTask {
    id: TimerId,
    due_at: i64,
    order: i64,
    interval_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: TimerId,
    pub due_at: i64,
    pub order: i64,
    pub interval_ms: Option<i64>,
}

/// A timer that has come due and is being delivered to a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub id: TimerId,
    pub due_at: i64,
    pub interval_ms: Option<i64>,
}

/// Virtual-clock timer queue.
///
/// Time only moves when asked to. Due tasks run in `(due_at, order)` order and
/// interval tasks are requeued at `due_at + interval` after their callback, unless
/// the callback cancelled them.
#[derive(Debug)]
pub struct Scheduler {
    task_queue: Vec<ScheduledTask>,
    now_ms: i64,
    timer_step_limit: usize,
    next_timer_id: i64,
    next_task_order: i64,
    running_timer_id: Option<TimerId>,
    running_timer_canceled: bool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            task_queue: Vec::new(),
            now_ms: 0,
            timer_step_limit: DEFAULT_TIMER_STEP_LIMIT,
            next_timer_id: 1,
            next_task_order: 0,
            running_timer_id: None,
            running_timer_canceled: false,
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Timer(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.timer_step_limit = max_steps;
        Ok(())
    }

    pub fn set_timeout(&mut self, delay_ms: i64) -> TimerId {
        self.schedule(delay_ms, None)
    }

    pub fn set_interval(&mut self, interval_ms: i64) -> TimerId {
        let interval_ms = interval_ms.max(0);
        self.schedule(interval_ms, Some(interval_ms))
    }

    fn schedule(&mut self, delay_ms: i64, interval_ms: Option<i64>) -> TimerId {
        let delay_ms = delay_ms.max(0);
        let due_at = self.now_ms.saturating_add(delay_ms);
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        self.task_queue.push(ScheduledTask {
            id,
            due_at,
            order,
            interval_ms,
        });
        tracing::trace!(%id, due_at, ?interval_ms, "timer scheduled");
        id
    }

    pub fn clear_timer(&mut self, id: TimerId) -> bool {
        let before = self.task_queue.len();
        self.task_queue.retain(|task| task.id != id);
        let removed = before - self.task_queue.len();
        let running = self.running_timer_id == Some(id);
        if running {
            self.running_timer_canceled = true;
        }
        tracing::trace!(%id, removed, running, "timer cleared");
        removed > 0 || running
    }

    pub fn clear_all_timers(&mut self) -> usize {
        let cleared = self.task_queue.len();
        self.task_queue.clear();
        if self.running_timer_id.is_some() {
            self.running_timer_canceled = true;
        }
        cleared
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .task_queue
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
                interval_ms: task.interval_ms,
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    /// Moves the clock forward by `delta_ms` and runs everything that became due.
    /// Returns the number of callbacks that ran.
    pub fn advance_time<F>(&mut self, delta_ms: i64, on_fire: F) -> Result<usize>
    where
        F: FnMut(&mut Self, Fired) -> Result<()>,
    {
        if delta_ms < 0 {
            return Err(Error::Timer(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let target = self.now_ms.saturating_add(delta_ms);
        self.advance_time_to(target, on_fire)
    }

    /// Runs due timers in order, moving the clock to each one's due time, and
    /// leaves the clock at `target_ms`.
    pub fn advance_time_to<F>(&mut self, target_ms: i64, on_fire: F) -> Result<usize>
    where
        F: FnMut(&mut Self, Fired) -> Result<()>,
    {
        if target_ms < self.now_ms {
            return Err(Error::Timer(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.now_ms
            )));
        }
        let ran = self.run_timer_queue(Some(target_ms), on_fire)?;
        self.now_ms = target_ms;
        Ok(ran)
    }

    /// Runs only the timers due at the current time; the clock does not move.
    pub fn run_due_timers<F>(&mut self, on_fire: F) -> Result<usize>
    where
        F: FnMut(&mut Self, Fired) -> Result<()>,
    {
        self.run_timer_queue(Some(self.now_ms), on_fire)
    }

    /// Runs the earliest pending timer, jumping the clock to it if needed.
    pub fn run_next_timer<F>(&mut self, mut on_fire: F) -> Result<bool>
    where
        F: FnMut(&mut Self, Fired) -> Result<()>,
    {
        let Some(next_idx) = self.next_task_index(None) else {
            return Ok(false);
        };
        let task = self.task_queue.remove(next_idx);
        if task.due_at > self.now_ms {
            self.now_ms = task.due_at;
        }
        self.execute_timer_task(task, &mut on_fire)?;
        Ok(true)
    }

    /// Runs the queue until it is empty. Fails with the step limit while any
    /// interval is still armed.
    pub fn flush<F>(&mut self, on_fire: F) -> Result<usize>
    where
        F: FnMut(&mut Self, Fired) -> Result<()>,
    {
        self.run_timer_queue(None, on_fire)
    }

    fn run_timer_queue<F>(&mut self, due_limit: Option<i64>, mut on_fire: F) -> Result<usize>
    where
        F: FnMut(&mut Self, Fired) -> Result<()>,
    {
        let mut steps = 0usize;
        while let Some(next_idx) = self.next_task_index(due_limit) {
            steps += 1;
            if steps > self.timer_step_limit {
                return Err(self.timer_step_limit_error(self.timer_step_limit, steps, due_limit));
            }
            let task = self.task_queue.remove(next_idx);
            if task.due_at > self.now_ms {
                self.now_ms = task.due_at;
            }
            self.execute_timer_task(task, &mut on_fire)?;
        }
        Ok(steps)
    }

    fn timer_step_limit_error(
        &self,
        max_steps: usize,
        steps: usize,
        due_limit: Option<i64>,
    ) -> Error {
        let due_limit_desc = due_limit
            .map(|value| value.to_string())
            .unwrap_or_else(|| "none".into());

        let next_task_desc = self
            .next_task_index(due_limit)
            .and_then(|idx| self.task_queue.get(idx))
            .map(|task| {
                let interval_desc = task
                    .interval_ms
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "none".into());
                format!(
                    "id={},due_at={},order={},interval_ms={}",
                    task.id, task.due_at, task.order, interval_desc
                )
            })
            .unwrap_or_else(|| "none".into());

        Error::Timer(format!(
            "timer queue exceeded max task steps (possible uncleared interval): limit={max_steps}, steps={steps}, now_ms={}, due_limit={}, pending_tasks={}, next_task={}",
            self.now_ms,
            due_limit_desc,
            self.task_queue.len(),
            next_task_desc
        ))
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.is_none_or(|limit| task.due_at <= limit))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    fn execute_timer_task<F>(&mut self, task: ScheduledTask, on_fire: &mut F) -> Result<()>
    where
        F: FnMut(&mut Self, Fired) -> Result<()>,
    {
        self.running_timer_id = Some(task.id);
        self.running_timer_canceled = false;
        let outcome = on_fire(
            self,
            Fired {
                id: task.id,
                due_at: task.due_at,
                interval_ms: task.interval_ms,
            },
        );
        let canceled = self.running_timer_canceled;
        self.running_timer_id = None;
        self.running_timer_canceled = false;
        outcome?;

        if let Some(interval_ms) = task.interval_ms {
            if !canceled {
                let due_at = task.due_at.saturating_add(interval_ms);
                let order = self.next_task_order;
                self.next_task_order += 1;
                self.task_queue.push(ScheduledTask {
                    id: task.id,
                    due_at,
                    order,
                    interval_ms: Some(interval_ms),
                });
            }
        }

        Ok(())
    }
}

impl TimerHost for Scheduler {
    fn set_interval(&mut self, interval_ms: i64) -> TimerId {
        Scheduler::set_interval(self, interval_ms)
    }

    fn clear_timer(&mut self, id: TimerId) -> bool {
        Scheduler::clear_timer(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(log: &mut Vec<(i64, i64)>) -> impl FnMut(&mut Scheduler, Fired) -> Result<()> + '_ {
        move |timers, fired| {
            log.push((fired.id.get(), timers.now_ms()));
            Ok(())
        }
    }

    #[test]
    fn interval_fires_once_per_period() -> Result<()> {
        let mut timers = Scheduler::new();
        let id = timers.set_interval(5000);
        let mut log = Vec::new();

        assert_eq!(timers.advance_time(4999, record(&mut log))?, 0);
        assert_eq!(timers.advance_time(1, record(&mut log))?, 1);
        assert_eq!(timers.advance_time(15_000, record(&mut log))?, 3);
        assert_eq!(
            log,
            vec![
                (id.get(), 5000),
                (id.get(), 10_000),
                (id.get(), 15_000),
                (id.get(), 20_000),
            ]
        );
        assert_eq!(timers.now_ms(), 20_000);
        assert_eq!(timers.pending_timers()[0].due_at, 25_000);
        Ok(())
    }

    #[test]
    fn timers_run_in_due_then_registration_order() -> Result<()> {
        let mut timers = Scheduler::new();
        let late = timers.set_timeout(10);
        let early_a = timers.set_timeout(5);
        let early_b = timers.set_timeout(5);
        let mut log = Vec::new();

        timers.advance_time(10, record(&mut log))?;
        let order = log.iter().map(|(id, _)| *id).collect::<Vec<_>>();
        assert_eq!(order, vec![early_a.get(), early_b.get(), late.get()]);
        assert!(timers.pending_timers().is_empty());
        Ok(())
    }

    #[test]
    fn clear_timer_reports_whether_it_existed() {
        let mut timers = Scheduler::new();
        let id = timers.set_interval(100);
        assert!(timers.clear_timer(id));
        assert!(!timers.clear_timer(id));
        assert!(!timers.clear_timer(TimerId(999)));
        assert!(timers.pending_timers().is_empty());
    }

    #[test]
    fn clear_all_timers_empties_the_queue_and_stops_the_running_interval() -> Result<()> {
        let mut timers = Scheduler::new();
        timers.set_timeout(50);
        timers.set_interval(100);
        assert_eq!(timers.clear_all_timers(), 2);
        assert!(timers.pending_timers().is_empty());
        assert_eq!(timers.clear_all_timers(), 0);

        timers.set_interval(10);
        timers.set_timeout(500);
        let ran = timers.advance_time(1000, |timers, _| {
            timers.clear_all_timers();
            Ok(())
        })?;
        assert_eq!(ran, 1);
        assert!(timers.pending_timers().is_empty());
        Ok(())
    }

    #[test]
    fn interval_cancelled_from_its_own_callback_is_not_requeued() -> Result<()> {
        let mut timers = Scheduler::new();
        timers.set_interval(10);
        let ran = timers.advance_time(100, |timers, fired| {
            assert!(timers.clear_timer(fired.id));
            Ok(())
        })?;
        assert_eq!(ran, 1);
        assert!(timers.pending_timers().is_empty());
        Ok(())
    }

    #[test]
    fn run_due_timers_does_not_move_the_clock() -> Result<()> {
        let mut timers = Scheduler::new();
        timers.set_timeout(0);
        timers.set_timeout(5);
        let mut log = Vec::new();
        assert_eq!(timers.run_due_timers(record(&mut log))?, 1);
        assert_eq!(timers.now_ms(), 0);
        assert_eq!(timers.run_due_timers(record(&mut log))?, 0);
        Ok(())
    }

    #[test]
    fn run_next_timer_jumps_to_the_next_due_time() -> Result<()> {
        let mut timers = Scheduler::new();
        timers.set_timeout(250);
        let mut log = Vec::new();
        assert!(timers.run_next_timer(record(&mut log))?);
        assert_eq!(timers.now_ms(), 250);
        assert!(!timers.run_next_timer(record(&mut log))?);
        Ok(())
    }

    #[test]
    fn flush_with_armed_interval_hits_step_limit() -> Result<()> {
        let mut timers = Scheduler::new();
        timers.set_timer_step_limit(3)?;
        timers.set_interval(1);
        let err = timers
            .flush(|_, _| Ok(()))
            .expect_err("flush should fail on an armed interval");
        match err {
            Error::Timer(message) => {
                assert!(message.contains("limit=3"), "unexpected message: {message}");
                assert!(message.contains("interval_ms=1"), "unexpected message: {message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn clock_cannot_move_backwards() -> Result<()> {
        let mut timers = Scheduler::new();
        timers.advance_time(10, |_, _| Ok(()))?;
        assert!(matches!(timers.advance_time(-1, |_, _| Ok(())), Err(Error::Timer(_))));
        assert!(matches!(timers.advance_time_to(5, |_, _| Ok(())), Err(Error::Timer(_))));
        assert!(matches!(timers.set_timer_step_limit(0), Err(Error::Timer(_))));
        Ok(())
    }

    #[test]
    fn callback_errors_propagate_and_keep_the_queue_consistent() -> Result<()> {
        let mut timers = Scheduler::new();
        timers.set_timeout(1);
        let err = timers.advance_time(5, |_, _| Err(Error::View("boom".into())));
        assert_eq!(err, Err(Error::View("boom".into())));
        assert!(timers.pending_timers().is_empty());
        assert!(!timers.clear_timer(TimerId(1)));
        Ok(())
    }
}
