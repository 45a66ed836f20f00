use std::path::PathBuf;
use std::time::Duration;

use ethers::types::{Address, TxHash};
use thiserror::Error;

/// Position and name of a plan step, used to point at the step that failed.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display(fmt = "{} (step {})", name, position)]
pub struct StepId {
    /// 1-based position in the plan.
    pub position: usize,
    pub name: String,
}

impl StepId {
    pub fn new(index: usize, name: impl ToString) -> Self {
        Self {
            position: index + 1,
            name: name.to_string(),
        }
    }
}

/// Failures reported by a [`crate::signer::DeploymentSigner`].
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("transport error: {0}")]
    Network(String),

    #[error("endpoint rejected the request: {0}")]
    Rejected(String),

    #[error("transaction {0:?} reverted")]
    Reverted(TxHash),

    #[error(
        "no receipt for transaction {tx_hash:?} after {after:?}; it may still \
         be mined, check chain state before re-running"
    )]
    Timeout { tx_hash: TxHash, after: Duration },
}

impl SignerError {
    /// Whether the failure is an on-chain or endpoint verdict rather than a
    /// transport problem.
    pub fn is_deployment_failure(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::Reverted(_))
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid signing key: {0}")]
    Authentication(String),

    #[error("deployer {deployer:?} has no balance")]
    InsufficientFunds { deployer: Address },

    #[error("artifact {name} not found at {}", path.display())]
    ArtifactNotFound { name: String, path: PathBuf },

    #[error("artifact {name} at {} is malformed: {reason}", path.display())]
    ArtifactFormat {
        name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("network error{}: {source}", step_suffix(.step))]
    Network {
        step: Option<StepId>,
        #[source]
        source: SignerError,
    },

    #[error("deployment of {step} failed: {source}")]
    Deployment {
        step: StepId,
        #[source]
        source: SignerError,
    },

    #[error("{step} references {reference}, which is not deployed by an earlier step")]
    UnresolvedReference { step: StepId, reference: String },

    #[error("{name} is declared more than once in the deployment plan")]
    DuplicateName { name: String },

    #[error("endpoint reports chain id {actual}, expected {expected}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("failed to write deployment record {}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DeployError {
    /// Classifies a signer failure that happened while running `step`.
    pub fn from_step(step: StepId, source: SignerError) -> Self {
        if source.is_deployment_failure() {
            Self::Deployment { step, source }
        } else {
            Self::Network {
                step: Some(step),
                source,
            }
        }
    }
}

fn step_suffix(step: &Option<StepId>) -> String {
    match step {
        Some(step) => format!(" during {step}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failures_are_classified() {
        let step = StepId::new(1, "Governance");

        let reverted = DeployError::from_step(
            step.clone(),
            SignerError::Reverted(TxHash::zero()),
        );
        assert!(matches!(
            reverted,
            DeployError::Deployment { ref step, .. } if step.position == 2
        ));

        let timeout = DeployError::from_step(
            step,
            SignerError::Timeout {
                tx_hash: TxHash::zero(),
                after: Duration::from_secs(1),
            },
        );
        assert!(matches!(timeout, DeployError::Network { step: Some(_), .. }));
    }

    #[test]
    fn network_errors_name_the_step() {
        let err = DeployError::Network {
            step: Some(StepId::new(0, "FundVault")),
            source: SignerError::Network("connection reset".to_string()),
        };

        assert_eq!(
            err.to_string(),
            "network error during FundVault (step 1): transport error: connection reset"
        );

        let err = DeployError::Network {
            step: None,
            source: SignerError::Network("connection reset".to_string()),
        };

        assert_eq!(
            err.to_string(),
            "network error: transport error: connection reset"
        );
    }
}
