use std::collections::BTreeMap;

use ethers::abi::Token;
use ethers::types::{Address, TxHash};
use ethers::utils::format_ether;
use tracing::{info, instrument, warn};

use super::plan::{ConstructorArg, DeploymentPlan, DeploymentStep};
use crate::artifacts::{ArtifactLoader, ContractArtifact};
use crate::error::{DeployError, StepId};
use crate::signer::DeploymentSigner;

/// A contract created by one plan step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    pub name: String,
    pub address: Address,
    pub tx_hash: TxHash,
    /// Addresses read from the contract after deployment, by role.
    pub secondary: Vec<(String, Address)>,
}

#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    pub deployed: Vec<DeployedContract>,
    /// Every externally supplied, deployed and secondary address by name.
    pub addresses: BTreeMap<String, Address>,
}

/// Runs a [`DeploymentPlan`] step by step against a single signer.
pub struct Sequencer<'a> {
    signer: &'a dyn DeploymentSigner,
    loader: &'a ArtifactLoader,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        signer: &'a dyn DeploymentSigner,
        loader: &'a ArtifactLoader,
    ) -> Self {
        Self { signer, loader }
    }

    #[instrument(
        name = "sequencer",
        skip_all,
        fields(steps = plan.steps().len())
    )]
    pub async fn execute(
        &self,
        plan: &DeploymentPlan,
    ) -> Result<DeploymentOutcome, DeployError> {
        plan.validate()?;
        let externals = plan.externals()?;

        let deployer = self.signer.address();
        let balance = self
            .signer
            .balance()
            .await
            .map_err(|source| DeployError::Network { step: None, source })?;

        info!(?deployer, "Balance: {} ETH", format_ether(balance));

        if balance.is_zero() {
            return Err(DeployError::InsufficientFunds { deployer });
        }

        // All artifacts are loaded up front so a broken build output is
        // reported before anything lands on chain.
        let mut artifacts = Vec::with_capacity(plan.steps().len());
        for step in plan.steps() {
            artifacts.push(self.loader.load(&step.artifact).await?);
        }

        let mut deployed: Vec<DeployedContract> =
            Vec::with_capacity(plan.steps().len());

        for (index, (step, artifact)) in
            plan.steps().iter().zip(&artifacts).enumerate()
        {
            let id = StepId::new(index, &step.name);

            match self.run_step(&id, step, artifact, &deployed).await {
                Ok(contract) => deployed.push(contract),
                Err(err) => {
                    report_stranded(&deployed);
                    return Err(err);
                }
            }
        }

        let mut addresses = externals;
        for contract in &deployed {
            addresses.insert(contract.name.clone(), contract.address);
            addresses.extend(contract.secondary.iter().cloned());
        }

        Ok(DeploymentOutcome {
            deployed,
            addresses,
        })
    }

    #[instrument(skip_all, fields(step = %id))]
    async fn run_step(
        &self,
        id: &StepId,
        step: &DeploymentStep,
        artifact: &ContractArtifact,
        deployed: &[DeployedContract],
    ) -> Result<DeployedContract, DeployError> {
        let constructor_args = resolve_constructor_args(id, step, deployed)?;

        info!("Deploying {}...", step.name);

        let tx_hash = self
            .signer
            .submit_deployment(artifact, constructor_args)
            .await
            .map_err(|err| DeployError::from_step(id.clone(), err))?;

        let address = self
            .signer
            .await_confirmation(tx_hash)
            .await
            .map_err(|err| DeployError::from_step(id.clone(), err))?;

        info!(?address, "{} deployed", step.name);

        let mut secondary = Vec::with_capacity(step.secondary.len());
        for query in &step.secondary {
            let role_address = self
                .signer
                .call_address(address, artifact, &query.function)
                .await
                .map_err(|err| DeployError::from_step(id.clone(), err))?;

            info!(address = ?role_address, "{} resolved", query.role);

            secondary.push((query.role.clone(), role_address));
        }

        Ok(DeployedContract {
            name: step.name.clone(),
            address,
            tx_hash,
            secondary,
        })
    }
}

fn resolve_constructor_args(
    id: &StepId,
    step: &DeploymentStep,
    deployed: &[DeployedContract],
) -> Result<Vec<Token>, DeployError> {
    step.constructor_args
        .iter()
        .map(|arg| match arg {
            ConstructorArg::External { address, .. } => {
                Ok(Token::Address(*address))
            }
            ConstructorArg::Literal(token) => Ok(token.clone()),
            ConstructorArg::Reference(reference) => deployed
                .iter()
                .find(|contract| &contract.name == reference)
                .map(|contract| Token::Address(contract.address))
                .ok_or_else(|| DeployError::UnresolvedReference {
                    step: id.clone(),
                    reference: reference.clone(),
                }),
        })
        .collect()
}

fn report_stranded(deployed: &[DeployedContract]) {
    if deployed.is_empty() {
        return;
    }

    warn!("Contracts deployed by this run before the failure (not recorded):");
    for contract in deployed {
        warn!(
            address = ?contract.address,
            tx_hash = ?contract.tx_hash,
            "{}",
            contract.name
        );
    }
    warn!(
        "Check the deployer nonce and chain state before re-running to \
         avoid duplicate deployments"
    );
}
