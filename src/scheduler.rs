use std::time::Duration;

/// What a scheduled task does when it comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// One second of the per-question countdown has passed.
    CountdownTick,
    /// The acknowledgment delay after a correct answer has passed.
    AutoAdvance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub kind: TaskKind,
    pub due: Duration,
}

/// Virtual-time task list. Time only moves when the owner feeds it elapsed
/// durations, so a task can never fire after it was cancelled or after the
/// owning session is dropped.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    next_id: u64,
    tasks: Vec<ScheduledTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, kind: TaskKind, delay: Duration) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(ScheduledTask {
            id,
            kind,
            due: self.now + delay,
        });
        id
    }

    /// Returns true if the task was still pending.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Removes and returns the earliest task due at or before `until`,
    /// moving the clock to its due time. Ties go to the task scheduled first.
    pub fn pop_due(&mut self, until: Duration) -> Option<ScheduledTask> {
        let (pos, _) = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(_, t)| (t.due, t.id.0))?;
        let task = self.tasks.remove(pos);
        if task.due > self.now {
            self.now = task.due;
        }
        Some(task)
    }

    /// Moves the clock forward once no more tasks are due.
    pub fn settle(&mut self, until: Duration) {
        if until > self.now {
            self.now = until;
        }
    }
}
