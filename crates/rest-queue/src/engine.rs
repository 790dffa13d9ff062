//! Request queue engine.
//!
//! Pending requests are drained strictly in order, one at a time. The head of
//! the queue is retried with exponential backoff while failures are transient,
//! then moved to history, announced to subscribers and the whole queue state
//! is snapshotted to disk.

use crate::snapshot::{encode_snapshot, write_atomic};
use crate::{
    Backoff, Clock, CompressionLevel, DeliveryRequest, DeliveryResponse, PersistedRequest,
    QueueConfig, QueueError, QueueResult, RequestRecord, SessionInfo, SessionSnapshot,
    SystemClock, Transport,
};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Durable, ordered outbound request queue.
///
/// Shared as `Arc<RequestQueue>`. `enqueue` may be called from any thread;
/// draining happens either in the async loop ([`run`](Self::run) /
/// [`start_processing`](Self::start_processing)) or in the blocking
/// [`process_immediate`](Self::process_immediate), never both at once.
pub struct RequestQueue {
    config: QueueConfig,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    state: Mutex<QueueState>,
    session: RwLock<SessionInfo>,
    wake: Notify,
    processing: AtomicBool,
    draining: AtomicBool,
    finished_tx: broadcast::Sender<RequestRecord>,
}

struct QueueState {
    pending: VecDeque<RequestRecord>,
    history: VecDeque<RequestRecord>,
    next_order: u64,
}

/// Point-in-time queue counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatus {
    /// Requests waiting or in flight.
    pub pending: usize,
    /// Completed requests still held in memory.
    pub history: usize,
    /// Order number the next enqueued request will get.
    pub next_order: u64,
    /// Whether a drain loop is running and has not been asked to stop.
    pub processing: bool,
}

enum Verdict {
    Done(DeliveryResponse),
    Retry {
        wait: Duration,
        response: DeliveryResponse,
    },
}

/// Exclusive right to drain the queue. Released on drop, even if the drain
/// future is dropped mid-flight.
struct DrainClaim<'a> {
    queue: &'a RequestQueue,
}

impl<'a> DrainClaim<'a> {
    fn acquire(queue: &'a RequestQueue) -> QueueResult<Self> {
        queue
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| QueueError::AlreadyProcessing)?;
        Ok(Self { queue })
    }
}

impl Drop for DrainClaim<'_> {
    fn drop(&mut self) {
        self.queue.processing.store(false, Ordering::SeqCst);
        self.queue.draining.store(false, Ordering::Release);
    }
}

impl RequestQueue {
    /// Create a queue using the system clock.
    pub fn new(config: QueueConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_clock(config, transport, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: QueueConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (finished_tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            transport,
            clock,
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                history: VecDeque::new(),
                next_order: 0,
            }),
            session: RwLock::new(SessionInfo::default()),
            wake: Notify::new(),
            processing: AtomicBool::new(false),
            draining: AtomicBool::new(false),
            finished_tx,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Append a request and wake the drain loop. Returns its order number.
    pub fn enqueue(&self, mut record: RequestRecord) -> u64 {
        let now = self.clock.now();
        let order = {
            let mut state = self.state.lock();
            let order = state.next_order;
            state.next_order += 1;
            record.accept(order, now, &self.config.server_url);
            debug!(
                order,
                method = %record.method(),
                url = record.url().unwrap_or_default(),
                pending = state.pending.len() + 1,
                "Request enqueued"
            );
            state.pending.push_back(record);
            order
        };
        self.wake.notify_one();
        order
    }

    /// Session identity stamped into subsequent snapshots.
    pub fn set_session(&self, session: SessionInfo) {
        info!(
            session_id = session.session_id,
            game_id = session.game_id,
            "Queue session updated"
        );
        *self.session.write() = session;
    }

    pub fn session(&self) -> SessionInfo {
        self.session.read().clone()
    }

    /// Receive every request that reaches a terminal state.
    pub fn subscribe(&self) -> broadcast::Receiver<RequestRecord> {
        self.finished_tx.subscribe()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Copies of the pending requests, head first.
    pub fn pending(&self) -> Vec<RequestRecord> {
        self.state.lock().pending.iter().cloned().collect()
    }

    /// Copies of the completed requests, oldest first.
    pub fn history(&self) -> Vec<RequestRecord> {
        self.state.lock().history.iter().cloned().collect()
    }

    pub fn status(&self) -> QueueStatus {
        let state = self.state.lock();
        QueueStatus {
            pending: state.pending.len(),
            history: state.history.len(),
            next_order: state.next_order,
            processing: self.is_processing(),
        }
    }

    /// Spawn the drain loop on the current tokio runtime.
    ///
    /// The queue counts as processing from the moment this returns, so a
    /// [`stop_processing`](Self::stop_processing) issued before the task is
    /// first polled still ends it.
    pub fn start_processing(self: &Arc<Self>) -> JoinHandle<QueueResult<()>> {
        self.processing.store(true, Ordering::SeqCst);
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            let claim = DrainClaim::acquire(&queue)?;
            queue.drain(claim).await
        })
    }

    /// Ask the drain loop to exit once the current request is terminal.
    pub fn stop_processing(&self) {
        if self.processing.swap(false, Ordering::SeqCst) {
            info!("Request queue stop requested");
        }
        self.wake.notify_one();
    }

    /// Drain loop. Runs until [`stop_processing`](Self::stop_processing).
    ///
    /// Fails with [`QueueError::AlreadyProcessing`] if another drain owns the
    /// queue.
    pub async fn run(&self) -> QueueResult<()> {
        let claim = DrainClaim::acquire(self)?;
        self.processing.store(true, Ordering::SeqCst);
        self.drain(claim).await
    }

    async fn drain(&self, _claim: DrainClaim<'_>) -> QueueResult<()> {
        info!(
            pending = self.pending_len(),
            "Request queue processing started"
        );

        while self.is_processing() {
            if self.pending_len() == 0 {
                tokio::select! {
                    _ = self.wake.notified() => {}
                    _ = tokio::time::sleep(self.config.idle_poll_interval) => {}
                }
                continue;
            }

            // Capture the queue before the first attempt so a crash mid-drain
            // still leaves the pending work on disk.
            self.persist();

            while self.is_processing() {
                let Some((order, request)) = self.head() else {
                    break;
                };
                let response = self.deliver(order, &request).await;
                self.finish_head(order, response);
                self.persist();
            }
        }

        info!(
            pending = self.pending_len(),
            "Request queue processing stopped"
        );
        Ok(())
    }

    /// Drain every pending request on the calling thread, blocking on the
    /// network and on backoff waits. Meant for shutdown, after the async
    /// runtime is gone. Returns the number of requests completed.
    pub fn process_immediate(&self) -> QueueResult<usize> {
        let _claim = DrainClaim::acquire(self)?;
        let pending = self.pending_len();
        warn!(
            pending,
            "Flushing request queue synchronously; this thread blocks until every pending request completes"
        );

        if pending > 0 {
            self.persist();
        }

        let mut completed = 0;
        while let Some((order, request)) = self.head() {
            let response = self.deliver_blocking(order, &request);
            self.finish_head(order, response);
            self.persist();
            completed += 1;
        }

        info!(completed, "Synchronous flush finished");
        Ok(completed)
    }

    /// Snapshot of the current queue state.
    pub fn snapshot(&self) -> SessionSnapshot {
        let (past, pending) = {
            let state = self.state.lock();
            (
                state.history.iter().map(PersistedRequest::from).collect(),
                state.pending.iter().map(PersistedRequest::from).collect(),
            )
        };
        let session = self.session.read().clone();
        SessionSnapshot::new(&session, self.clock.now(), past, pending)
    }

    /// Serialize the queue state.
    pub fn save(&self, level: CompressionLevel) -> QueueResult<Vec<u8>> {
        encode_snapshot(self.snapshot(), level).map_err(|e| {
            error!(error = %e, "Failed to serialize queue snapshot");
            e
        })
    }

    /// Write a fast-compressed snapshot to the configured path.
    pub fn save_to_file(&self) -> QueueResult<PathBuf> {
        let path = self
            .config
            .snapshot_path
            .clone()
            .ok_or(QueueError::SnapshotPathUnset)?;
        let bytes = self.save(CompressionLevel::Fast)?;

        if let Err(e) = write_atomic(&path, &bytes) {
            error!(path = %path.display(), error = %e, "Failed to write queue snapshot");
            return Err(e.into());
        }

        debug!(path = %path.display(), bytes = bytes.len(), "Queue snapshot written");
        Ok(path)
    }

    /// Best-effort snapshot from inside a drain. Failures are already logged.
    fn persist(&self) {
        if self.config.snapshot_path.is_some() {
            let _ = self.save_to_file();
        }
    }

    fn head(&self) -> Option<(u64, DeliveryRequest)> {
        let state = self.state.lock();
        state
            .pending
            .front()
            .map(|record| (record.order(), record.create_delivery_request()))
    }

    /// Stamp an attempt on the head record; returns the attempt number.
    fn mark_attempt(&self, order: u64) -> u32 {
        let now = self.clock.now();
        let mut state = self.state.lock();
        match state.pending.front_mut() {
            Some(record) if record.order() == order => {
                record.mark_attempt(now);
                record.attempts()
            }
            _ => 0,
        }
    }

    async fn deliver(&self, order: u64, request: &DeliveryRequest) -> DeliveryResponse {
        let mut backoff = self.config.backoff.start();
        loop {
            let attempt = self.mark_attempt(order);
            let response = self.transport.send(request).await;
            match self.judge(order, attempt, response, &mut backoff) {
                Verdict::Done(response) => return response,
                Verdict::Retry { wait, response } => {
                    tokio::time::sleep(wait).await;
                    if backoff.is_exhausted() {
                        self.log_gave_up(order, attempt, &response);
                        return response;
                    }
                }
            }
        }
    }

    fn deliver_blocking(&self, order: u64, request: &DeliveryRequest) -> DeliveryResponse {
        let mut backoff = self.config.backoff.start();
        loop {
            let attempt = self.mark_attempt(order);
            let response = self.transport.send_blocking(request);
            match self.judge(order, attempt, response, &mut backoff) {
                Verdict::Done(response) => return response,
                Verdict::Retry { wait, response } => {
                    std::thread::sleep(wait);
                    if backoff.is_exhausted() {
                        self.log_gave_up(order, attempt, &response);
                        return response;
                    }
                }
            }
        }
    }

    fn judge(
        &self,
        order: u64,
        attempt: u32,
        response: DeliveryResponse,
        backoff: &mut Backoff,
    ) -> Verdict {
        if !response.is_transient() {
            return Verdict::Done(response);
        }

        match backoff.next_wait() {
            Some(wait) => {
                warn!(
                    order,
                    attempt,
                    status = ?response.status,
                    error = response.error.as_deref().unwrap_or_default(),
                    delay_ms = wait.as_millis() as u64,
                    "Transient delivery failure, retrying"
                );
                Verdict::Retry { wait, response }
            }
            None => {
                self.log_gave_up(order, attempt, &response);
                Verdict::Done(response)
            }
        }
    }

    fn log_gave_up(&self, order: u64, attempts: u32, response: &DeliveryResponse) {
        error!(
            order,
            attempts,
            status = ?response.status,
            error = response.error.as_deref().unwrap_or_default(),
            max_backoff_ms = self.config.backoff.max.as_millis() as u64,
            "Giving up on request after reaching maximum backoff"
        );
    }

    /// Move the head to history and announce it.
    fn finish_head(&self, order: u64, response: DeliveryResponse) {
        let finished = {
            let mut state = self.state.lock();
            let Some(mut record) = state.pending.pop_front() else {
                return;
            };
            debug_assert_eq!(record.order(), order);
            record.complete(response);

            let finished = record.clone();
            state.history.push_back(record);
            if let Some(capacity) = self.config.history_capacity {
                while state.history.len() > capacity {
                    state.history.pop_front();
                }
            }
            finished
        };

        if let Some(response) = finished.response() {
            if response.is_success() {
                info!(
                    order,
                    status = ?response.status,
                    attempts = finished.attempts(),
                    "Request completed"
                );
            } else if !response.is_transient() {
                warn!(
                    order,
                    status = ?response.status,
                    url = finished.url().unwrap_or_default(),
                    "Request rejected by server, not retrying"
                );
            }
        }

        // No subscribers is fine.
        let _ = self.finished_tx.send(finished);
    }
}
