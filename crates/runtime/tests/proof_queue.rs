//! Proof queue ordering and failure isolation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use runtime::{ProofQueue, ProofQueueError};
use zk::{
    CircuitArtifacts, CircuitId, CircuitRegistry, Fr, InitWitness, LocationSecret, ProofData,
    ProofError, ProvingEngine, RawCommitment, StubProver, WitnessInput,
};

/// Records when each proof starts and ends; panics on `x == 13`.
#[derive(Default)]
struct RecordingEngine {
    log: Mutex<Vec<String>>,
}

impl ProvingEngine for RecordingEngine {
    fn full_prove(
        &self,
        input: &WitnessInput,
        artifacts: &CircuitArtifacts,
    ) -> Result<ProofData, ProofError> {
        let WitnessInput::Init(witness) = input else {
            return Err(ProofError::Witness("init only".to_string()));
        };
        if witness.x == "13" {
            panic!("prover crashed");
        }

        self.log.lock().unwrap().push(format!("start {}", witness.x));
        std::thread::sleep(Duration::from_millis(20));
        self.log.lock().unwrap().push(format!("end {}", witness.x));
        StubProver::new().full_prove(input, artifacts)
    }
}

fn init(x: u64) -> WitnessInput {
    let location = RawCommitment::compute(
        x,
        0,
        LocationSecret {
            blockhash: Fr::from(42u64),
            salt: 1,
        },
    );
    InitWitness::new(&location, &[Fr::from(42u64)], 4, 64).into()
}

fn registry() -> CircuitRegistry {
    CircuitRegistry::from_dir("snarks")
}

#[tokio::test]
async fn proofs_run_one_at_a_time_in_submission_order() {
    let engine = Arc::new(RecordingEngine::default());
    let (queue, _worker) = ProofQueue::spawn(engine.clone(), registry(), 8);
    let metrics = queue.metrics();

    let mut tasks = Vec::new();
    for x in 0..4u64 {
        let queue = queue.clone();
        tasks.push(tokio::spawn(async move { queue.enqueue(init(x)).await }));
        // Wait until this task is queued before submitting the next one.
        while metrics.submitted() < x + 1 {
            tokio::task::yield_now().await;
        }
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let log = engine.log.lock().unwrap().clone();
    let expected: Vec<String> = (0..4)
        .flat_map(|x| [format!("start {x}"), format!("end {x}")])
        .collect();
    assert_eq!(log, expected);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.submitted, 4);
    assert_eq!(snapshot.generated, 4);
    assert_eq!(snapshot.failed, 0);
    assert_eq!(snapshot.queue_depth, 0);
    assert!(snapshot.peak_queue_depth >= 2);
    assert!(snapshot.avg_proving_time >= Duration::from_millis(20));
}

#[tokio::test]
async fn a_failed_proof_only_affects_its_caller() {
    let prover = Arc::new(StubProver::new().failing_on(CircuitId::Init));
    let (queue, _worker) = ProofQueue::spawn(prover, registry(), 4);

    let failed = queue.enqueue(init(1)).await;
    assert!(matches!(
        failed,
        Err(ProofQueueError::Proof(ProofError::Engine(_)))
    ));

    let mine = RawCommitment::compute(1, 1, LocationSecret { blockhash: Fr::from(1u64), salt: 0 });
    let yours = RawCommitment::compute(2, 2, LocationSecret { blockhash: Fr::from(2u64), salt: 1 });
    let battle = WitnessInput::from(zk::BattleWitness::new(&mine, &yours));
    let proof = queue.enqueue(battle).await.unwrap();
    assert_eq!(
        proof.public_signals,
        vec![mine.commitment.to_string(), yours.commitment.to_string()]
    );

    let metrics = queue.metrics().snapshot();
    assert_eq!((metrics.generated, metrics.failed), (1, 1));
}

#[tokio::test]
async fn a_panicking_prover_does_not_stop_the_queue() {
    let (queue, _worker) = ProofQueue::spawn(Arc::new(RecordingEngine::default()), registry(), 4);

    match queue.enqueue(init(13)).await {
        Err(ProofQueueError::Panicked { message, .. }) => assert_eq!(message, "prover crashed"),
        other => panic!("expected a panic report, got {other:?}"),
    }
    assert!(queue.enqueue(init(14)).await.is_ok());
}

#[tokio::test]
async fn missing_artifacts_are_reported() {
    let (queue, _worker) = ProofQueue::spawn(Arc::new(StubProver::new()), CircuitRegistry::new(), 4);

    assert!(matches!(
        queue.enqueue(init(1)).await,
        Err(ProofQueueError::Proof(ProofError::MissingArtifacts(CircuitId::Init)))
    ));
}

#[tokio::test]
async fn enqueue_after_shutdown_fails() {
    let (queue, worker) = ProofQueue::spawn(Arc::new(StubProver::new()), registry(), 4);
    worker.abort();
    let _ = worker.await;

    assert!(matches!(
        queue.enqueue(init(1)).await,
        Err(ProofQueueError::Closed)
    ));
    let metrics = queue.metrics();
    assert_eq!((metrics.queue_depth(), metrics.submitted()), (0, 0));
}
