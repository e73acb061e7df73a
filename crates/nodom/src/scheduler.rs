//! Render Scheduler
//!
//! Periodic tasks run once per tick, before the app flushes its dirty
//! modules. A task can ask to run only every `n` ticks.

/// Task handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u32);

struct Task {
    id: TaskId,
    every: u32,
    callback: Box<dyn FnMut()>,
}

/// Scheduler
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<Task>,
    next_id: u32,
    ticks: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` every tick
    pub fn add_task(&mut self, callback: impl FnMut() + 'static) -> TaskId {
        self.add_periodic(1, callback)
    }

    /// Run `callback` every `every` ticks (at least 1)
    pub fn add_periodic(&mut self, every: u32, callback: impl FnMut() + 'static) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.tasks.push(Task {
            id,
            every: every.max(1),
            callback: Box::new(callback),
        });
        id
    }

    pub fn remove_task(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    /// Advance one tick, running due tasks
    pub fn run(&mut self) {
        self.ticks += 1;
        for task in &mut self.tasks {
            if self.ticks % u64::from(task.every) == 0 {
                (task.callback)();
            }
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.tasks.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_periodic_tasks() {
        let mut scheduler = Scheduler::new();
        let every = Rc::new(Cell::new(0));
        let third = Rc::new(Cell::new(0));

        let e = every.clone();
        scheduler.add_task(move || e.set(e.get() + 1));
        let t = third.clone();
        let id = scheduler.add_periodic(3, move || t.set(t.get() + 1));

        for _ in 0..6 {
            scheduler.run();
        }
        assert_eq!(every.get(), 6);
        assert_eq!(third.get(), 2);

        assert!(scheduler.remove_task(id));
        assert!(!scheduler.remove_task(id));
        assert_eq!(scheduler.len(), 1);
    }
}
