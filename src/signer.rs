//! The deployer identity as seen by the sequencer.
//!
//! Everything that talks to the chain goes through [`DeploymentSigner`] so the
//! sequencing logic can be exercised against a mocked endpoint.

use ethers::abi::Token;
use ethers::types::{Address, TxHash, U256};

use crate::artifacts::ContractArtifact;
use crate::error::SignerError;

pub mod rpc;

pub use rpc::RpcSigner;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DeploymentSigner: Send + Sync {
    /// Address of the deploying account.
    fn address(&self) -> Address;

    /// Chain id reported by the endpoint.
    fn chain_id(&self) -> u64;

    /// Native balance of the deploying account, in wei.
    async fn balance(&self) -> Result<U256, SignerError>;

    /// Signs and broadcasts the creation transaction for `artifact`.
    ///
    /// Every call consumes the next nonce of the deploying account.
    async fn submit_deployment(
        &self,
        artifact: &ContractArtifact,
        constructor_args: Vec<Token>,
    ) -> Result<TxHash, SignerError>;

    /// Waits for the creation transaction to be mined and returns the address
    /// of the new contract.
    async fn await_confirmation(
        &self,
        tx_hash: TxHash,
    ) -> Result<Address, SignerError>;

    /// Calls a view function without arguments that returns an address.
    async fn call_address(
        &self,
        contract: Address,
        artifact: &ContractArtifact,
        function: &str,
    ) -> Result<Address, SignerError>;
}
