//! `PathService` — the path-computation worker pool.
//!
//! # Worker initialisation
//!
//! Each worker thread clones the road network exactly once at startup and
//! builds its router against that private copy before accepting any job.
//! After that, a job carries only ids plus an `Arc` handle to the weights
//! version it was submitted under; the graph itself never crosses the
//! channel again.
//!
//! # Protocol
//!
//! ```text
//!   submit ──► job channel (MPMC) ──► worker N ──► result channel ──► poll / wait_all
//!                  ▲                      │ panic
//!                  └──── resubmit ◄── Lost{job}
//! ```
//!
//! Every search runs under `catch_unwind`.  A panicking worker reports the
//! job it was holding and exits; the pool pushes the job back onto the
//! channel for another worker and starts a replacement while the restart
//! budget lasts.  When no worker is left, requests fail with
//! [`RoutingError::PoolUnavailable`].
//!
//! # Consistency
//!
//! All jobs submitted between two [`PathService::publish_weights`] calls
//! share one `Arc<EdgeWeights>`, so a batch is searched against a single
//! consistent weights version even if the tick loop publishes a newer one
//! while the batch is in flight.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use mt_core::{NodeId, RequestId, TravelMode};
use mt_network::{EdgeWeights, RoadNetwork};

use crate::{
    DijkstraRouter, RouteOutcome, RouteRequest, RouteResponse, Router, RoutingError,
    RoutingResult,
};

/// Replacement workers started per configured worker before the pool gives up.
pub const MAX_RESTARTS_PER_WORKER: usize = 4;

/// How long `wait_all` blocks on the result channel before re-checking
/// worker liveness.
const LIVENESS_POLL: Duration = Duration::from_millis(50);

/// Builds one router per worker from that worker's private network copy.
pub type RouterFactory = Arc<dyn Fn(&RoadNetwork) -> Box<dyn Router> + Send + Sync>;

// ── Messages ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct Job {
    request: RouteRequest,
    weights: Arc<EdgeWeights>,
}

enum WorkerMsg {
    Done { response: RouteResponse },
    Lost { worker: usize, job: Job, reason: String },
}

// ── Health ────────────────────────────────────────────────────────────────────

/// Read-only pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolHealth {
    /// Configured worker count.
    pub workers:   usize,
    /// Workers whose thread is still running.
    pub live:      usize,
    /// Replacement workers started after a panic.
    pub restarts:  usize,
    /// Requests submitted but not yet answered.
    pub pending:   usize,
    /// Requests answered since the pool started.
    pub completed: u64,
}

impl PoolHealth {
    pub fn is_available(&self) -> bool {
        self.live > 0
    }
}

// ── PathService ───────────────────────────────────────────────────────────────

pub struct PathService {
    job_tx:    Option<Sender<Job>>,
    job_rx:    Receiver<Job>,
    result_tx: Sender<WorkerMsg>,
    result_rx: Receiver<WorkerMsg>,

    network: Arc<RoadNetwork>,
    factory: RouterFactory,
    weights: Arc<EdgeWeights>,

    workers:      Vec<Option<JoinHandle<()>>>,
    worker_count: usize,
    restarts:     usize,

    next_request: u64,
    pending:      FxHashSet<RequestId>,
    /// Responses collected by `compute_batch` that belong to other requests.
    ready:        Vec<RouteResponse>,
    completed:    u64,
}

impl PathService {
    /// Start `workers` threads using [`DijkstraRouter`].
    pub fn spawn(
        network: Arc<RoadNetwork>,
        weights: Arc<EdgeWeights>,
        workers: usize,
    ) -> RoutingResult<Self> {
        let factory: RouterFactory =
            Arc::new(|net: &RoadNetwork| Box::new(DijkstraRouter::new(net)) as Box<dyn Router>);
        Self::with_router(network, weights, workers, factory)
    }

    /// Start `workers` threads, each with a router built by `factory`.
    pub fn with_router(
        network: Arc<RoadNetwork>,
        weights: Arc<EdgeWeights>,
        workers: usize,
        factory: RouterFactory,
    ) -> RoutingResult<Self> {
        let worker_count = workers.max(1);
        let (job_tx, job_rx) = unbounded();
        let (result_tx, result_rx) = unbounded();

        let mut service = Self {
            job_tx: Some(job_tx),
            job_rx,
            result_tx,
            result_rx,
            network,
            factory,
            weights,
            workers: Vec::with_capacity(worker_count),
            worker_count,
            restarts: 0,
            next_request: 0,
            pending: FxHashSet::default(),
            ready: Vec::new(),
            completed: 0,
        };
        for slot in 0..worker_count {
            let handle = service.start_worker(slot)?;
            service.workers.push(Some(handle));
        }
        info!(
            "path service started: {} workers over {} nodes / {} edges",
            worker_count,
            service.network.node_count(),
            service.network.edge_count()
        );
        Ok(service)
    }

    fn start_worker(&self, slot: usize) -> RoutingResult<JoinHandle<()>> {
        let template = Arc::clone(&self.network);
        let factory = Arc::clone(&self.factory);
        let jobs = self.job_rx.clone();
        let results = self.result_tx.clone();

        let handle = thread::Builder::new()
            .name(format!("mt-route-{slot}"))
            .spawn(move || {
                // Private copy, loaded once before the first job.
                let network: RoadNetwork = (*template).clone();
                drop(template);
                let mut router = factory(&network);
                worker_loop(slot, &network, router.as_mut(), &jobs, &results);
            })?;
        Ok(handle)
    }

    // ── Submission ────────────────────────────────────────────────────────

    /// Make `weights` the version used by subsequently submitted requests.
    pub fn publish_weights(&mut self, weights: Arc<EdgeWeights>) {
        self.weights = weights;
    }

    /// Weights version new requests are searched against.
    pub fn weights(&self) -> &Arc<EdgeWeights> {
        &self.weights
    }

    /// Queue one request.  Returns its id; the outcome arrives via
    /// [`poll`](Self::poll) or [`wait_all`](Self::wait_all).
    pub fn submit(
        &mut self,
        origin: NodeId,
        destination: NodeId,
        mode: TravelMode,
    ) -> RoutingResult<RequestId> {
        for node in [origin, destination] {
            if !self.network.contains_node(node) {
                return Err(RoutingError::NodeNotFound(node));
            }
        }
        if self.pool_drained() {
            return Err(RoutingError::PoolUnavailable);
        }
        let id = RequestId(self.next_request);
        self.next_request += 1;

        let job = Job {
            request: RouteRequest { id, origin, destination, mode },
            weights: Arc::clone(&self.weights),
        };
        self.send(job)?;
        self.pending.insert(id);
        Ok(id)
    }

    fn send(&self, job: Job) -> RoutingResult<()> {
        match &self.job_tx {
            Some(tx) => tx.send(job).map_err(|_| RoutingError::PoolUnavailable),
            None => Err(RoutingError::PoolUnavailable),
        }
    }

    /// Forget a request.  Its result, if one arrives, is discarded.
    /// Returns `false` for unknown or already answered ids.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        self.pending.remove(&id)
    }

    // ── Collection ────────────────────────────────────────────────────────

    /// Non-blocking: every response that has arrived since the last call.
    pub fn poll(&mut self) -> RoutingResult<Vec<RouteResponse>> {
        let mut out = std::mem::take(&mut self.ready);
        while let Ok(msg) = self.result_rx.try_recv() {
            if let Some(response) = self.handle(msg)? {
                out.push(response);
            }
        }
        if !self.pending.is_empty() && self.pool_drained() {
            return Err(RoutingError::PoolUnavailable);
        }
        Ok(out)
    }

    /// Block until every pending request has been answered.
    pub fn wait_all(&mut self) -> RoutingResult<Vec<RouteResponse>> {
        let mut out = std::mem::take(&mut self.ready);
        while !self.pending.is_empty() {
            match self.result_rx.recv_timeout(LIVENESS_POLL) {
                Ok(msg) => {
                    if let Some(response) = self.handle(msg)? {
                        out.push(response);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.pool_drained() {
                        return Err(RoutingError::PoolUnavailable);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Err(RoutingError::PoolUnavailable),
            }
        }
        if !out.is_empty() {
            debug!("path service: collected {} responses", out.len());
        }
        Ok(out)
    }

    /// Submit a batch and block until all of it is answered.  Outcomes are
    /// returned in request order.  Responses to earlier, unrelated requests
    /// are kept for the next `poll` / `wait_all`.
    pub fn compute_batch(
        &mut self,
        requests: &[(NodeId, NodeId, TravelMode)],
    ) -> RoutingResult<Vec<RouteOutcome>> {
        let mut ids = Vec::with_capacity(requests.len());
        for &(origin, destination, mode) in requests {
            ids.push(self.submit(origin, destination, mode)?);
        }
        let wanted: FxHashSet<RequestId> = ids.iter().copied().collect();

        let mut by_id: FxHashMap<RequestId, RouteOutcome> = FxHashMap::default();
        for response in self.wait_all()? {
            if wanted.contains(&response.request.id) {
                by_id.insert(response.request.id, response.outcome);
            } else {
                self.ready.push(response);
            }
        }
        Ok(ids
            .iter()
            .map(|id| by_id.remove(id).unwrap_or(RouteOutcome::NoPath))
            .collect())
    }

    fn handle(&mut self, msg: WorkerMsg) -> RoutingResult<Option<RouteResponse>> {
        match msg {
            WorkerMsg::Done { response } => {
                if self.pending.remove(&response.request.id) {
                    self.completed += 1;
                    Ok(Some(response))
                } else {
                    // Cancelled while in flight.
                    Ok(None)
                }
            }
            WorkerMsg::Lost { worker, job, reason } => {
                warn!(
                    "routing worker {worker} lost on request {} ({reason}); resubmitting",
                    job.request.id
                );
                self.replace_worker(worker)?;
                if self.pending.contains(&job.request.id) {
                    self.send(job)?;
                }
                Ok(None)
            }
        }
    }

    fn replace_worker(&mut self, slot: usize) -> RoutingResult<()> {
        if let Some(handle) = self.workers.get_mut(slot).and_then(Option::take) {
            // The thread has already left its loop; join only reaps it.
            let _ = handle.join();
        }
        if self.restarts >= self.worker_count * MAX_RESTARTS_PER_WORKER {
            warn!("routing worker {slot} not replaced: restart budget exhausted");
            return Ok(());
        }
        let handle = self.start_worker(slot)?;
        if let Some(entry) = self.workers.get_mut(slot) {
            *entry = Some(handle);
        }
        self.restarts += 1;
        Ok(())
    }

    // ── Introspection ─────────────────────────────────────────────────────

    fn live_workers(&self) -> usize {
        self.workers
            .iter()
            .flatten()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// No live worker and no message left that could start a replacement.
    /// A worker sends its last message before exiting, so liveness is
    /// checked first.
    fn pool_drained(&self) -> bool {
        self.live_workers() == 0 && self.result_rx.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn health(&self) -> PoolHealth {
        PoolHealth {
            workers:   self.worker_count,
            live:      self.live_workers(),
            restarts:  self.restarts,
            pending:   self.pending.len(),
            completed: self.completed,
        }
    }
}

impl Drop for PathService {
    fn drop(&mut self) {
        // Closing the job channel ends every worker loop.
        self.job_tx = None;
        // Discard queued jobs so workers exit without searching them.
        while self.job_rx.try_recv().is_ok() {}
        for handle in self.workers.iter_mut().filter_map(Option::take) {
            let _ = handle.join();
        }
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

fn worker_loop(
    slot: usize,
    network: &RoadNetwork,
    router: &mut dyn Router,
    jobs: &Receiver<Job>,
    results: &Sender<WorkerMsg>,
) {
    while let Ok(job) = jobs.recv() {
        let request = job.request;
        let searched = panic::catch_unwind(AssertUnwindSafe(|| {
            router.route(network, &job.weights, request.origin, request.destination, request.mode)
        }));
        let msg = match searched {
            Ok(Ok(outcome)) => WorkerMsg::Done { response: RouteResponse { request, outcome } },
            // Ids were validated on submit; treat a mismatch as unreachable.
            Ok(Err(_)) => WorkerMsg::Done {
                response: RouteResponse { request, outcome: RouteOutcome::NoPath },
            },
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                // Router state may be inconsistent after a panic; hand the
                // job back and stop.
                let _ = results.send(WorkerMsg::Lost { worker: slot, job, reason });
                return;
            }
        };
        if results.send(msg).is_err() {
            return;
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
