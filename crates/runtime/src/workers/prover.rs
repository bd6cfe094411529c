//! Serialized proof generation.
//!
//! [`ProofQueue`] is the cloneable submission side; a single worker task drains
//! it in FIFO order and proves one witness at a time on a blocking thread.
//! A failed or panicking proof is reported to its own caller only; the worker
//! moves on to the next task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use zk::{CircuitRegistry, ProofData, ProofError, ProvingEngine, WitnessInput};

use super::metrics::ProofMetrics;
use crate::api::ProofQueueError;

type ProofResult = Result<ProofData, ProofQueueError>;

struct ProofTask {
    id: u64,
    input: WitnessInput,
    reply: oneshot::Sender<ProofResult>,
}

/// Handle for submitting witnesses to the proof worker.
#[derive(Clone)]
pub struct ProofQueue {
    tasks: mpsc::Sender<ProofTask>,
    next_id: Arc<AtomicU64>,
    metrics: Arc<ProofMetrics>,
}

impl ProofQueue {
    /// Spawns the proof worker. The worker stops once every handle is dropped.
    pub fn spawn(
        engine: Arc<dyn ProvingEngine>,
        registry: CircuitRegistry,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tasks, task_rx) = mpsc::channel(capacity.max(1));
        let metrics = Arc::new(ProofMetrics::new());

        let worker = ProverWorker {
            engine,
            registry,
            tasks: task_rx,
            metrics: Arc::clone(&metrics),
        };
        let join = tokio::spawn(worker.run());

        let queue = Self {
            tasks,
            next_id: Arc::new(AtomicU64::new(1)),
            metrics,
        };
        (queue, join)
    }

    /// Proves `input` after every previously enqueued task has settled.
    pub async fn enqueue(&self, input: WitnessInput) -> ProofResult {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let circuit = input.circuit();
        let (reply, result) = oneshot::channel();

        self.metrics.task_enqueued();
        if self
            .tasks
            .send(ProofTask { id, input, reply })
            .await
            .is_err()
        {
            self.metrics.task_abandoned();
            return Err(ProofQueueError::Closed);
        }
        debug!(task_id = id, %circuit, "proof task enqueued");

        result
            .await
            .map_err(|_| ProofQueueError::Dropped { task_id: id })?
    }

    pub fn metrics(&self) -> Arc<ProofMetrics> {
        Arc::clone(&self.metrics)
    }
}

/// Background worker for proof generation.
struct ProverWorker {
    engine: Arc<dyn ProvingEngine>,
    registry: CircuitRegistry,
    tasks: mpsc::Receiver<ProofTask>,
    metrics: Arc<ProofMetrics>,
}

impl ProverWorker {
    async fn run(mut self) {
        info!("ProverWorker started");
        while let Some(task) = self.tasks.recv().await {
            self.handle_task(task).await;
        }
        info!("ProverWorker stopped: all queue handles dropped");
    }

    async fn handle_task(&self, task: ProofTask) {
        let ProofTask { id, input, reply } = task;
        let circuit = input.circuit();
        debug!(task_id = id, %circuit, "proving");

        match self.prove(id, input).await {
            Ok((proof, proving_time)) => {
                info!(
                    task_id = id,
                    %circuit,
                    proving_ms = proving_time.as_millis() as u64,
                    "proof generated"
                );
                self.metrics.record_success(proving_time);
                if reply.send(Ok(proof)).is_err() {
                    debug!(task_id = id, "proof caller went away");
                }
            }
            Err(err) => {
                error!(task_id = id, %circuit, error = %err, "proof generation failed");
                self.metrics.record_failure();
                if reply.send(Err(err)).is_err() {
                    debug!(task_id = id, "proof caller went away");
                }
            }
        }
    }

    async fn prove(
        &self,
        task_id: u64,
        input: WitnessInput,
    ) -> Result<(ProofData, Duration), ProofQueueError> {
        let circuit = input.circuit();
        let artifacts = self
            .registry
            .get(circuit)
            .cloned()
            .ok_or(ProofError::MissingArtifacts(circuit))?;
        let engine = Arc::clone(&self.engine);

        // Proving may take seconds; keep it off the async executor.
        let outcome = tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let result = engine.full_prove(&input, &artifacts);
            (result, start.elapsed())
        })
        .await;

        match outcome {
            Ok((Ok(proof), elapsed)) => Ok((proof, elapsed)),
            Ok((Err(err), _)) => Err(err.into()),
            Err(join) => Err(ProofQueueError::Panicked {
                task_id,
                message: panic_message(join),
            }),
        }
    }
}

fn panic_message(join: tokio::task::JoinError) -> String {
    if !join.is_panic() {
        return join.to_string();
    }
    let payload = join.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
