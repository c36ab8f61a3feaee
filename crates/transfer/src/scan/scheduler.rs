use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use window_compute::{ComputeFacility, TaskLabel};
use window_core::time::DayOffset;
use window_raster::{Compositor, RasterSurface};

use super::column::{ColumnResult, RunToken, compute_column};
use super::feasibility::{FeasibilityTracker, is_feasible};
use super::request::{GridRequest, ScanError};
use crate::interaction::SelectionCell;

/// Facility topic carried by every column task.
pub const SCAN_TOPIC: &str = "grid-scan";

/// Wait slice used by [`GridScan::run_to_completion`] between stall checks.
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Lifecycle of the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Running,
    Completed,
    Superseded,
}

/// What happened to a delivered column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Painted,
    /// Belongs to an older run, or no run is active.
    Stale,
    /// Column already accepted in this run.
    Duplicate,
    /// Delay outside the run's range.
    OutOfRange,
}

/// Cheapest feasible cell seen so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestCell {
    pub delay: DayOffset,
    pub tof: DayOffset,
    pub delta_v: f64,
}

/// Point-in-time view of the current run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanProgress {
    pub run: Option<RunToken>,
    pub state: ScanState,
    pub completed: usize,
    pub total: usize,
    pub feasible: bool,
    pub best: Option<BestCell>,
}

impl ScanProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

struct Run {
    token: RunToken,
    request: GridRequest,
    /// Accepted costs per column; `None` until the column arrives.
    columns: Vec<Option<Vec<f64>>>,
    completed: usize,
    deadline: Option<Instant>,
    best: Option<BestCell>,
}

/// Porkchop grid scheduler.
///
/// One run per [`GridRequest`]: every column is dispatched to the compute facility
/// tagged with the run token, results come back through a channel, and only this
/// struct ever touches the compositor, so painting is never concurrent. Results of
/// superseded runs are dropped on delivery.
pub struct GridScan {
    facility: Arc<dyn ComputeFacility<ColumnResult>>,
    sender: Sender<ColumnResult>,
    receiver: Receiver<ColumnResult>,
    next_token: u64,
    state: ScanState,
    run: Option<Run>,
    compositor: Compositor,
    feasibility: FeasibilityTracker,
    selection: Arc<SelectionCell>,
    column_timeout: Option<Duration>,
}

impl GridScan {
    pub fn new(facility: Arc<dyn ComputeFacility<ColumnResult>>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            facility,
            sender,
            receiver,
            next_token: 1,
            state: ScanState::Idle,
            run: None,
            compositor: Compositor::new(0, 0),
            feasibility: FeasibilityTracker::new(),
            selection: Arc::new(SelectionCell::new()),
            column_timeout: None,
        }
    }

    /// Force columns infeasible once the run makes no progress for `timeout`.
    pub fn with_column_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.column_timeout = timeout;
        self
    }

    /// Share the selection slot cleared whenever the request changes.
    pub fn with_selection(mut self, selection: Arc<SelectionCell>) -> Self {
        self.selection = selection;
        self
    }

    /// Watch entry point: start a new run when `request` differs from the current one.
    ///
    /// Returns `Ok(false)` for an unchanged request. An invalid request is rejected
    /// and the scheduler keeps whatever it was doing.
    pub fn set_request(&mut self, request: GridRequest) -> Result<bool, ScanError> {
        let unchanged = self.run.as_ref().is_some_and(|run| run.request == request);
        if unchanged && self.state != ScanState::Superseded {
            return Ok(false);
        }
        self.start(request, Instant::now())?;
        Ok(true)
    }

    /// Start a run unconditionally, superseding any active one.
    pub fn start(&mut self, request: GridRequest, now: Instant) -> Result<RunToken, ScanError> {
        request.validate()?;
        self.supersede();

        let token = RunToken(self.next_token);
        self.next_token += 1;
        let width = request.width();
        let height = request.height();

        self.compositor.reset(width, height);
        self.feasibility.reset();
        self.selection.clear();
        info!(
            run = %token,
            columns = width,
            rows = height,
            delay = ?(request.min_delay, request.max_delay),
            tof = ?(request.min_tof, request.max_tof),
            "porkchop scan started"
        );

        let shared = Arc::new(request.clone());
        for col in 0..width {
            let delay = request.delay_at(col);
            let job_request = Arc::clone(&shared);
            let sender = self.sender.clone();
            self.facility.submit(
                SCAN_TOPIC,
                token.0,
                Box::new(move || ColumnResult {
                    run: token,
                    delay,
                    delta_vs: compute_column(&job_request, delay),
                }),
                Box::new(move |result| {
                    // Scheduler dropped: nobody is listening any more.
                    let _ = sender.send(result);
                }),
            );
        }

        self.run = Some(Run {
            token,
            request,
            columns: vec![None; width],
            completed: 0,
            deadline: self.column_timeout.map(|timeout| now + timeout),
            best: None,
        });
        self.state = ScanState::Running;
        Ok(token)
    }

    /// Abandon the active run, if any, cancelling its queued columns.
    pub fn supersede(&mut self) {
        if self.state != ScanState::Running {
            return;
        }
        if let Some(run) = &self.run {
            let cancelled = self.cancel_queued(run.token);
            info!(
                run = %run.token,
                completed = run.completed,
                total = run.columns.len(),
                cancelled,
                "porkchop scan superseded"
            );
        }
        self.state = ScanState::Superseded;
        self.compositor.hide_sweep();
    }

    fn cancel_queued(&self, token: RunToken) -> usize {
        self.facility
            .cancel_where(&|label: &TaskLabel| label.topic == SCAN_TOPIC && label.tag == token.0)
    }

    /// Apply one delivered column, timed by the wall clock.
    pub fn accept(&mut self, result: ColumnResult) -> Delivery {
        self.accept_at(result, Instant::now())
    }

    /// Apply one delivered column observed at `now`; progress pushes the stall
    /// deadline out from `now`.
    pub fn accept_at(&mut self, result: ColumnResult, now: Instant) -> Delivery {
        let Some(run) = self.run.as_mut() else {
            return Delivery::Stale;
        };
        if result.run != run.token || self.state == ScanState::Superseded {
            debug!(
                run = %result.run,
                current = %run.token,
                delay = result.delay,
                "stale column dropped"
            );
            return Delivery::Stale;
        }
        let Some(col) = run.request.column_of(result.delay) else {
            warn!(
                run = %run.token,
                delay = result.delay,
                "column outside the scan range dropped"
            );
            return Delivery::OutOfRange;
        };
        if run.columns[col].is_some() {
            debug!(run = %run.token, delay = result.delay, "duplicate column ignored");
            return Delivery::Duplicate;
        }

        let max_delta_v = run.request.max_delta_v;
        self.compositor.paint_column(col, &result.delta_vs, max_delta_v);
        self.feasibility.record_column(&result.delta_vs, max_delta_v);
        for (row, &delta_v) in result.delta_vs.iter().enumerate() {
            if is_feasible(delta_v, max_delta_v)
                && run.best.is_none_or(|best| delta_v < best.delta_v)
            {
                run.best = Some(BestCell {
                    delay: result.delay,
                    tof: run.request.tof_at(row),
                    delta_v,
                });
            }
        }

        run.columns[col] = Some(result.delta_vs);
        run.completed += 1;
        if let Some(timeout) = self.column_timeout {
            run.deadline = Some(now + timeout);
        }

        if run.completed == run.columns.len() {
            self.state = ScanState::Completed;
            self.compositor.hide_sweep();
            info!(
                run = %run.token,
                feasible = self.feasibility.is_feasible(),
                best_delta_v = run.best.map(|best| best.delta_v),
                "porkchop scan completed"
            );
        }
        Delivery::Painted
    }

    /// Accept every result already waiting in the channel; returns how many were painted.
    pub fn pump(&mut self) -> usize {
        let mut painted = 0;
        while let Ok(result) = self.receiver.try_recv() {
            if self.accept(result) == Delivery::Painted {
                painted += 1;
            }
        }
        painted
    }

    /// Force the outstanding columns of a stalled run to infeasible.
    ///
    /// A run stalls when no column arrives before its deadline. Returns how many
    /// columns were forced; late real results for them are ignored as duplicates.
    pub fn expire_stalled(&mut self, now: Instant) -> usize {
        if self.state != ScanState::Running {
            return 0;
        }
        let Some(run) = &self.run else {
            return 0;
        };
        if run.deadline.is_none_or(|deadline| now < deadline) {
            return 0;
        }

        let token = run.token;
        let rows = run.request.height();
        let overdue: Vec<DayOffset> = run
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.is_none())
            .map(|(col, _)| run.request.delay_at(col))
            .collect();
        let cancelled = self.cancel_queued(token);
        warn!(
            run = %token,
            columns = overdue.len(),
            cancelled,
            "scan stalled; forcing outstanding columns infeasible"
        );
        for delay in &overdue {
            self.accept_at(ColumnResult::infeasible(token, *delay, rows), now);
        }
        overdue.len()
    }

    /// Block until the active run completes, expiring stalls on the way.
    ///
    /// Needs a facility that makes progress by itself, or a column timeout.
    pub fn run_to_completion(&mut self) -> ScanState {
        while self.state == ScanState::Running {
            match self.receiver.recv_timeout(DRAIN_POLL) {
                Ok(result) => {
                    self.accept(result);
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.expire_stalled(Instant::now());
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.state
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Whether the current run finished and feasibility is authoritative.
    pub fn is_ready(&self) -> bool {
        self.state == ScanState::Completed
    }

    pub fn is_feasible(&self) -> bool {
        self.feasibility.is_feasible()
    }

    pub fn current_token(&self) -> Option<RunToken> {
        self.run.as_ref().map(|run| run.token)
    }

    pub fn request(&self) -> Option<&GridRequest> {
        self.run.as_ref().map(|run| &run.request)
    }

    pub fn progress(&self) -> ScanProgress {
        ScanProgress {
            run: self.current_token(),
            state: self.state,
            completed: self.run.as_ref().map_or(0, |run| run.completed),
            total: self.run.as_ref().map_or(0, |run| run.columns.len()),
            feasible: self.feasibility.is_feasible(),
            best: self.run.as_ref().and_then(|run| run.best),
        }
    }

    /// Accepted columns of the current run as `(delay, costs)`, in delay order.
    pub fn columns(&self) -> impl Iterator<Item = (DayOffset, &[f64])> + '_ {
        self.run.iter().flat_map(|run| {
            run.columns.iter().enumerate().filter_map(move |(col, column)| {
                column
                    .as_deref()
                    .map(|delta_vs| (run.request.delay_at(col), delta_vs))
            })
        })
    }

    /// Painted cells without overlays.
    pub fn surface(&self) -> &RasterSurface {
        self.compositor.surface()
    }

    /// Display frame including the sweep marker while running.
    pub fn frame(&self) -> RasterSurface {
        self.compositor.frame()
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn selection(&self) -> Arc<SelectionCell> {
        Arc::clone(&self.selection)
    }
}
