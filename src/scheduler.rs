use std::collections::VecDeque;
use std::fmt;

type Job<T> = Box<dyn FnOnce(&mut T)>;

pub struct DeferredQueue<T> {
    jobs: VecDeque<Job<T>>,
    completed: u64,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DeferredQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("pending", &self.jobs.len())
            .field("completed", &self.completed)
            .finish()
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self {
            jobs: VecDeque::new(),
            completed: 0,
        }
    }

    pub fn push(&mut self, job: impl FnOnce(&mut T) + 'static) {
        self.jobs.push_back(Box::new(job));
    }

    /// Run the oldest job. Returns `false` if there was nothing to run.
    pub fn run_next(&mut self, target: &mut T) -> bool {
        let Some(job) = self.jobs.pop_front() else {
            return false;
        };
        job(target);
        self.completed += 1;
        true
    }

    /// Run jobs until the queue is empty, including any pushed meanwhile.
    pub fn drain(&mut self, target: &mut T) -> usize {
        let mut ran = 0;
        while self.run_next(target) {
            ran += 1;
        }
        ran
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_idle(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }
}
