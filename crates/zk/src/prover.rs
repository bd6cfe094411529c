//! Proving engine interface for the groth16 circuits.
//!
//! An engine takes a witness plus the circuit's compiled artifacts and
//! returns a proof in snarkjs JSON layout. Engines are synchronous and may be
//! slow; callers run them off the async executor.

use serde::{Deserialize, Serialize};

use crate::circuit::{CircuitArtifacts, CircuitId, WitnessInput};

/// Groth16 proof points as decimal strings, in snarkjs layout.
///
/// Points are projective: `pi_a` and `pi_c` carry three coordinates and
/// `pi_b` carries three pairs. Only the first two of each reach the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    pub pi_a: Vec<String>,
    pub pi_b: Vec<Vec<String>>,
    pub pi_c: Vec<String>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_curve")]
    pub curve: String,
}

fn default_protocol() -> String {
    "groth16".to_string()
}

fn default_curve() -> String {
    "bn128".to_string()
}

/// Engine output: the proof and the public signals it commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofData {
    pub proof: Groth16Proof,
    #[serde(rename = "publicSignals")]
    pub public_signals: Vec<String>,
}

/// Proof reshaped for the solidity verifier.
///
/// The G2 coordinates are swapped within each pair because the precompile
/// expects `(im, re)` while snarkjs emits `(re, im)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierArgs {
    pub a: [String; 2],
    pub b: [[String; 2]; 2],
    pub c: [String; 2],
    pub signals: Vec<String>,
}

impl ProofData {
    pub fn verifier_args(&self) -> Result<VerifierArgs, ProofError> {
        let proof = &self.proof;
        let a = first_two(&proof.pi_a, "pi_a")?;
        let c = first_two(&proof.pi_c, "pi_c")?;
        if proof.pi_b.len() < 2 {
            return Err(ProofError::Malformed(format!(
                "pi_b has {} rows, expected at least 2",
                proof.pi_b.len()
            )));
        }
        let b0 = first_two(&proof.pi_b[0], "pi_b[0]")?;
        let b1 = first_two(&proof.pi_b[1], "pi_b[1]")?;

        Ok(VerifierArgs {
            a,
            b: [[b0[1].clone(), b0[0].clone()], [b1[1].clone(), b1[0].clone()]],
            c,
            signals: self.public_signals.clone(),
        })
    }
}

fn first_two(values: &[String], name: &str) -> Result<[String; 2], ProofError> {
    match values {
        [x, y, ..] => Ok([x.clone(), y.clone()]),
        _ => Err(ProofError::Malformed(format!(
            "{name} has {} coordinates, expected at least 2",
            values.len()
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    #[error("no compiled artifacts registered for circuit `{0}`")]
    MissingArtifacts(CircuitId),

    #[error("witness generation failed: {0}")]
    Witness(String),

    #[error("proving engine failed: {0}")]
    Engine(String),

    #[error("malformed proof: {0}")]
    Malformed(String),
}

/// Groth16 proving backend.
///
/// Implementations must be safe to call from a blocking worker thread.
pub trait ProvingEngine: Send + Sync {
    fn full_prove(
        &self,
        input: &WitnessInput,
        artifacts: &CircuitArtifacts,
    ) -> Result<ProofData, ProofError>;
}

// ============================================================================
// Stub Prover
// ============================================================================

/// Stub engine for local sessions and tests.
///
/// Echoes the witness's public signals under a constant dummy proof. Can be
/// slowed down or told to fail for a given circuit.
///
/// **Warning**: Provides no cryptographic guarantees - do not use in production.
#[cfg(feature = "stub")]
#[derive(Debug, Clone, Default)]
pub struct StubProver {
    delay: Option<std::time::Duration>,
    fail_on: Option<CircuitId>,
}

#[cfg(feature = "stub")]
impl StubProver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks the calling thread for `delay` before every proof.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Rejects every witness for `circuit`.
    pub fn failing_on(mut self, circuit: CircuitId) -> Self {
        self.fail_on = Some(circuit);
        self
    }
}

#[cfg(feature = "stub")]
impl ProvingEngine for StubProver {
    fn full_prove(
        &self,
        input: &WitnessInput,
        _artifacts: &CircuitArtifacts,
    ) -> Result<ProofData, ProofError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let circuit = input.circuit();
        if self.fail_on == Some(circuit) {
            tracing::debug!(%circuit, "stub prover rejecting witness");
            return Err(ProofError::Engine(format!(
                "stub prover configured to fail on `{circuit}`"
            )));
        }

        tracing::debug!(%circuit, "stub proof generated");
        let one = || "1".to_string();
        let zero = || "0".to_string();
        Ok(ProofData {
            proof: Groth16Proof {
                pi_a: vec![one(), "2".to_string(), one()],
                pi_b: vec![
                    vec!["3".to_string(), "4".to_string()],
                    vec!["5".to_string(), "6".to_string()],
                    vec![one(), zero()],
                ],
                pi_c: vec!["7".to_string(), "8".to_string(), one()],
                protocol: default_protocol(),
                curve: default_curve(),
            },
            public_signals: input.public_signals(),
        })
    }
}
