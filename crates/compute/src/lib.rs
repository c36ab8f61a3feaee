//! Background compute facility used by the porkchop scan.
//!
//! Work is submitted as a boxed job plus a completion callback, labelled with a
//! topic and a numeric tag. Queued work can be cancelled by predicate; cancellation
//! is best-effort, so a job that already left the queue still delivers its result.
//!
//! Two facilities are provided:
//! - [`ThreadPoolFacility`]: jobs run on a `rayon` pool, completions fire on workers.
//! - [`ManualFacility`]: nothing runs until the host drives the queue, which gives
//!   single-threaded hosts and tests full control over execution order.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

/// Identifier assigned to a task at submission.
pub type TaskId = u64;

/// Job body executed by the facility.
pub type Job<T> = Box<dyn FnOnce() -> T + Send + 'static>;

/// Callback receiving a job's output.
pub type Completion<T> = Box<dyn FnOnce(T) + Send + 'static>;

/// Metadata visible to cancellation predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLabel {
    pub id: TaskId,
    pub topic: String,
    pub tag: u64,
}

#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("failed to build worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),
}

/// Host contract for background work.
pub trait ComputeFacility<T: Send + 'static>: Send + Sync {
    /// Queue `job`; `on_result` receives its output unless the task is cancelled first.
    fn submit(&self, topic: &str, tag: u64, job: Job<T>, on_result: Completion<T>) -> TaskId;

    /// Drop every queued task whose label matches; returns how many were removed.
    fn cancel_where(&self, predicate: &dyn Fn(&TaskLabel) -> bool) -> usize;

    /// Tasks still waiting to start.
    fn pending(&self) -> usize;
}

struct QueuedTask<T> {
    label: TaskLabel,
    job: Job<T>,
    on_result: Completion<T>,
}

impl<T> QueuedTask<T> {
    fn run(self) {
        let output = (self.job)();
        (self.on_result)(output);
    }
}

struct QueueState<T> {
    next_id: TaskId,
    tasks: VecDeque<QueuedTask<T>>,
}

/// FIFO of not-yet-started tasks shared by both facilities.
struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,
}

impl<T> TaskQueue<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                next_id: 0,
                tasks: VecDeque::new(),
            }),
        }
    }

    fn push(&self, topic: &str, tag: u64, job: Job<T>, on_result: Completion<T>) -> TaskId {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.tasks.push_back(QueuedTask {
            label: TaskLabel {
                id,
                topic: topic.to_string(),
                tag,
            },
            job,
            on_result,
        });
        id
    }

    fn pop_front(&self) -> Option<QueuedTask<T>> {
        self.state.lock().tasks.pop_front()
    }

    fn take(&self, id: TaskId) -> Option<QueuedTask<T>> {
        let mut state = self.state.lock();
        let index = state.tasks.iter().position(|task| task.label.id == id)?;
        state.tasks.remove(index)
    }

    fn cancel_where(&self, predicate: &dyn Fn(&TaskLabel) -> bool) -> usize {
        let mut state = self.state.lock();
        let before = state.tasks.len();
        state.tasks.retain(|task| !predicate(&task.label));
        before - state.tasks.len()
    }

    fn labels(&self) -> Vec<TaskLabel> {
        self.state
            .lock()
            .tasks
            .iter()
            .map(|task| task.label.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }
}

/// Facility backed by a dedicated `rayon` thread pool.
///
/// Each submission spawns one pool job that pops the oldest queued task, so a task
/// removed by [`ComputeFacility::cancel_where`] is simply never picked up.
pub struct ThreadPoolFacility<T> {
    pool: rayon::ThreadPool,
    queue: Arc<TaskQueue<T>>,
}

impl<T: Send + 'static> ThreadPoolFacility<T> {
    /// Build a pool with `threads` workers, or rayon's default sizing for `None`.
    pub fn new(threads: Option<usize>) -> Result<Self, ComputeError> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|index| format!("grid-worker-{index}"));
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;
        debug!(threads = pool.current_num_threads(), "compute pool ready");
        Ok(Self {
            pool,
            queue: Arc::new(TaskQueue::new()),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl<T: Send + 'static> ComputeFacility<T> for ThreadPoolFacility<T> {
    fn submit(&self, topic: &str, tag: u64, job: Job<T>, on_result: Completion<T>) -> TaskId {
        let id = self.queue.push(topic, tag, job, on_result);
        let queue = Arc::clone(&self.queue);
        self.pool.spawn_fifo(move || {
            if let Some(task) = queue.pop_front() {
                task.run();
            }
        });
        id
    }

    fn cancel_where(&self, predicate: &dyn Fn(&TaskLabel) -> bool) -> usize {
        self.queue.cancel_where(predicate)
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Cooperative facility: tasks run on the caller's thread when the host asks.
pub struct ManualFacility<T> {
    queue: TaskQueue<T>,
}

impl<T: Send + 'static> ManualFacility<T> {
    pub fn new() -> Self {
        Self {
            queue: TaskQueue::new(),
        }
    }

    /// Labels of queued tasks in submission order.
    pub fn queued(&self) -> Vec<TaskLabel> {
        self.queue.labels()
    }

    /// Run the oldest queued task; `false` when the queue is empty.
    pub fn run_next(&self) -> bool {
        match self.queue.pop_front() {
            Some(task) => {
                task.run();
                true
            }
            None => false,
        }
    }

    /// Run one specific queued task, out of submission order.
    pub fn run_task(&self, id: TaskId) -> bool {
        match self.queue.take(id) {
            Some(task) => {
                task.run();
                true
            }
            None => false,
        }
    }

    /// Drain the queue; returns how many tasks ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl<T: Send + 'static> Default for ManualFacility<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> ComputeFacility<T> for ManualFacility<T> {
    fn submit(&self, topic: &str, tag: u64, job: Job<T>, on_result: Completion<T>) -> TaskId {
        self.queue.push(topic, tag, job, on_result)
    }

    fn cancel_where(&self, predicate: &dyn Fn(&TaskLabel) -> bool) -> usize {
        self.queue.cancel_where(predicate)
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}
