//! `SearchEngine` implementations backed by a [`WaypointGraph`].
//!
//! | Engine           | Where searches run                                     |
//! |------------------|--------------------------------------------------------|
//! | `DeferredEngine` | on the caller's thread, inside `poll_completed`        |
//! | `ThreadedEngine` | on worker threads; results come back over a channel    |
//!
//! Both return the node positions of the path.  Exact endpoints are the job
//! of the broker's modifier pipeline (`StartEndModifier`).

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use nav_core::RequestId;
use nav_request::{EngineRequest, EngineResult, SearchEngine};

use crate::{AStar, GraphResult, Pathfinder, WaypointGraph};

#[cfg(feature = "fx-hash")]
type Set<T> = rustc_hash::FxHashSet<T>;
#[cfg(not(feature = "fx-hash"))]
type Set<T> = std::collections::HashSet<T>;

/// Run one request to completion.
fn solve<P: Pathfinder + ?Sized>(finder: &P, graph: &WaypointGraph, request: &EngineRequest) -> EngineResult {
    match finder.find_between(graph, request.start, request.end, &request.constraints) {
        Ok(path) => {
            log::trace!("request {} solved: {} nodes, length {:.2}", request.id, path.nodes.len(), path.length);
            EngineResult::success(request.id, path.points)
        }
        Err(e) => {
            log::trace!("request {} failed: {e}", request.id);
            EngineResult::failure(request.id, e.to_string())
        }
    }
}

// ── DeferredEngine ────────────────────────────────────────────────────────────

/// Queues requests and solves them on the next `poll_completed`.
///
/// A per-poll budget spreads work over several frames, so results arrive
/// with a deterministic delay.
pub struct DeferredEngine<P: Pathfinder = AStar> {
    graph:  Arc<WaypointGraph>,
    finder: P,
    queue:  VecDeque<EngineRequest>,
    budget: usize,
}

impl DeferredEngine<AStar> {
    pub fn new(graph: Arc<WaypointGraph>) -> Self {
        Self::with_finder(graph, AStar)
    }
}

impl<P: Pathfinder> DeferredEngine<P> {
    pub fn with_finder(graph: Arc<WaypointGraph>, finder: P) -> Self {
        Self { graph, finder, queue: VecDeque::new(), budget: usize::MAX }
    }

    /// Solve at most `budget` requests per poll (minimum 1).
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget.max(1);
        self
    }

    /// Requests waiting to be solved.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn graph(&self) -> &WaypointGraph {
        &self.graph
    }
}

impl<P: Pathfinder> SearchEngine for DeferredEngine<P> {
    fn compute_path_async(&mut self, request: EngineRequest) {
        self.queue.push_back(request);
    }

    fn poll_completed(&mut self, out: &mut Vec<EngineResult>) {
        for _ in 0..self.budget {
            let Some(request) = self.queue.pop_front() else {
                break;
            };
            out.push(solve(&self.finder, &self.graph, &request));
        }
    }

    fn cancel(&mut self, id: RequestId) {
        self.queue.retain(|r| r.id != id);
    }
}

// ── ThreadedEngine ────────────────────────────────────────────────────────────

/// Solves requests on a pool of worker threads.
///
/// Requests go out over one `crossbeam-channel`, results come back over
/// another and are drained without blocking in `poll_completed`.
/// Cancellation does not interrupt a worker; the result is dropped when it
/// arrives.  Dropping the engine closes the request channel and joins the
/// workers.
pub struct ThreadedEngine {
    jobs:      Option<Sender<EngineRequest>>,
    results:   Receiver<EngineResult>,
    workers:   Vec<JoinHandle<()>>,
    cancelled: Set<RequestId>,
    in_flight: usize,
}

impl ThreadedEngine {
    /// Spawn `workers` threads (minimum 1) searching with `finder`.
    ///
    /// # Errors
    ///
    /// `GraphError::Io` if a thread cannot be spawned.
    pub fn new<P: Pathfinder + 'static>(graph: Arc<WaypointGraph>, finder: P, workers: usize) -> GraphResult<Self> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<EngineRequest>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<EngineResult>();
        let finder = Arc::new(finder);

        let count = workers.max(1);
        let mut handles = Vec::with_capacity(count);
        for i in 0..count {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let graph = Arc::clone(&graph);
            let finder = Arc::clone(&finder);
            let handle = std::thread::Builder::new()
                .name(format!("nav-search-{i}"))
                .spawn(move || {
                    for request in jobs.iter() {
                        if results.send(solve(&*finder, &graph, &request)).is_err() {
                            break;
                        }
                    }
                })?;
            handles.push(handle);
        }
        log::debug!("search engine started with {count} worker(s)");

        Ok(Self {
            jobs:      Some(job_tx),
            results:   result_rx,
            workers:   handles,
            cancelled: Set::default(),
            in_flight: 0,
        })
    }

    /// Requests sent to the workers whose results have not been drained.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Block until at least one result arrives or `timeout` passes, then
    /// drain everything available into `out`.  Returns the number appended.
    pub fn wait_for_results(&mut self, out: &mut Vec<EngineResult>, timeout: Duration) -> usize {
        let before = out.len();
        if self.in_flight == 0 {
            return 0;
        }
        match self.results.recv_timeout(timeout) {
            Ok(result) => self.take(result, out),
            Err(RecvTimeoutError::Timeout) => return 0,
            Err(RecvTimeoutError::Disconnected) => {
                log::error!("search workers exited with {} request(s) in flight", self.in_flight);
                return 0;
            }
        }
        self.poll_completed(out);
        out.len() - before
    }

    fn take(&mut self, result: EngineResult, out: &mut Vec<EngineResult>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.cancelled.remove(&result.id) {
            log::trace!("dropping result of cancelled request {}", result.id);
            return;
        }
        out.push(result);
    }
}

impl SearchEngine for ThreadedEngine {
    fn compute_path_async(&mut self, request: EngineRequest) {
        let Some(jobs) = &self.jobs else {
            return;
        };
        let id = request.id;
        if jobs.send(request).is_ok() {
            self.in_flight += 1;
        } else {
            log::error!("search workers are gone; request {id} dropped");
        }
    }

    fn poll_completed(&mut self, out: &mut Vec<EngineResult>) {
        while let Ok(result) = self.results.try_recv() {
            self.take(result, out);
        }
    }

    fn cancel(&mut self, id: RequestId) {
        self.cancelled.insert(id);
    }
}

impl Drop for ThreadedEngine {
    fn drop(&mut self) {
        self.jobs.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("search worker panicked");
            }
        }
    }
}
