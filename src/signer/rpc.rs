use std::sync::atomic::{AtomicU64, Ordering};

use ethers::abi::Token;
use ethers::prelude::SignerMiddleware;
use ethers::providers::{
    Http, Middleware, MiddlewareError, PendingTransaction, Provider,
};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, BlockNumber, Eip1559TransactionRequest, TransactionRequest,
    TxHash, U256,
};
use tracing::{debug, info, instrument};

use super::DeploymentSigner;
use crate::artifacts::ContractArtifact;
use crate::cli::PrivateKey;
use crate::config::{ConfirmationConfig, NetworkConfig};
use crate::error::{DeployError, SignerError};

pub type Client = SignerMiddleware<Provider<Http>, LocalWallet>;

/// A local private key signing through a JSON-RPC endpoint.
pub struct RpcSigner {
    client: Client,
    address: Address,
    chain_id: u64,
    nonce: AtomicU64,
    confirmation: ConfirmationConfig,
}

impl RpcSigner {
    #[instrument(skip_all, fields(network = %network.name))]
    pub async fn connect(
        network: &NetworkConfig,
        private_key: &PrivateKey,
        confirmation: ConfirmationConfig,
    ) -> Result<Self, DeployError> {
        let provider = Provider::new(Http::new(network.rpc_url.clone()))
            .interval(confirmation.poll_interval());

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(connection_error)?
            .as_u64();

        if let Some(expected) = network.chain_id {
            if expected != chain_id {
                return Err(DeployError::ChainMismatch {
                    expected,
                    actual: chain_id,
                });
            }
        }

        let wallet =
            LocalWallet::from(private_key.key.clone()).with_chain_id(chain_id);
        let address = wallet.address();

        let client = SignerMiddleware::new(provider, wallet);

        let nonce = client
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await
            .map_err(connection_error)?;

        debug!(chain_id, nonce = nonce.as_u64(), "Connected");

        Ok(Self {
            client,
            address,
            chain_id,
            nonce: AtomicU64::new(nonce.as_u64()),
            confirmation,
        })
    }

    fn next_nonce(&self) -> u64 {
        self.nonce.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DeploymentSigner for RpcSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn balance(&self) -> Result<U256, SignerError> {
        self.client
            .get_balance(self.address, None)
            .await
            .map_err(classify)
    }

    async fn submit_deployment(
        &self,
        artifact: &ContractArtifact,
        constructor_args: Vec<Token>,
    ) -> Result<TxHash, SignerError> {
        let data = creation_code(artifact, &constructor_args)?;
        let nonce = self.next_nonce();

        let mut tx = TypedTransaction::Eip1559(
            Eip1559TransactionRequest::new()
                .from(self.address)
                .data(data)
                .nonce(nonce),
        );

        self.client
            .fill_transaction(&mut tx, None)
            .await
            .map_err(classify)?;

        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(classify)?;

        let tx_hash = pending.tx_hash();

        info!(?tx_hash, nonce, "Submitted {}", artifact.name);

        Ok(tx_hash)
    }

    async fn await_confirmation(
        &self,
        tx_hash: TxHash,
    ) -> Result<Address, SignerError> {
        let timeout = self.confirmation.timeout();

        let pending = PendingTransaction::new(tx_hash, self.client.provider())
            .interval(self.confirmation.poll_interval())
            .confirmations(self.confirmation.confirmations);

        let receipt = tokio::time::timeout(timeout, pending)
            .await
            .map_err(|_| SignerError::Timeout {
                tx_hash,
                after: timeout,
            })?
            .map_err(classify)?
            .ok_or_else(|| {
                SignerError::Rejected(format!(
                    "transaction {tx_hash:?} was dropped before being mined"
                ))
            })?;

        if receipt.status != Some(1.into()) {
            return Err(SignerError::Reverted(tx_hash));
        }

        receipt.contract_address.ok_or_else(|| {
            SignerError::Rejected(format!(
                "receipt of {tx_hash:?} carries no contract address"
            ))
        })
    }

    async fn call_address(
        &self,
        contract: Address,
        artifact: &ContractArtifact,
        function: &str,
    ) -> Result<Address, SignerError> {
        let func = artifact.abi.function(function).map_err(|err| {
            SignerError::Rejected(format!("{}.{function}: {err}", artifact.name))
        })?;

        let call_data = func
            .encode_input(&[])
            .map_err(|err| SignerError::Rejected(err.to_string()))?;

        let tx: TypedTransaction =
            TransactionRequest::new().to(contract).data(call_data).into();

        let output = self.client.call(&tx, None).await.map_err(classify)?;

        let tokens = func
            .decode_output(&output)
            .map_err(|err| SignerError::Rejected(err.to_string()))?;

        tokens
            .into_iter()
            .next()
            .and_then(Token::into_address)
            .ok_or_else(|| {
                SignerError::Rejected(format!(
                    "{}.{function} did not return an address",
                    artifact.name
                ))
            })
    }
}

/// Creation bytecode followed by the ABI encoded constructor arguments.
fn creation_code(
    artifact: &ContractArtifact,
    constructor_args: &[Token],
) -> Result<Vec<u8>, SignerError> {
    match artifact.abi.constructor() {
        Some(constructor) => constructor
            .encode_input(artifact.bytecode.to_vec(), constructor_args)
            .map_err(|err| {
                SignerError::Rejected(format!(
                    "encoding constructor arguments of {}: {err}",
                    artifact.name
                ))
            }),
        None if constructor_args.is_empty() => Ok(artifact.bytecode.to_vec()),
        None => Err(SignerError::Rejected(format!(
            "{} has no constructor but {} arguments were given",
            artifact.name,
            constructor_args.len()
        ))),
    }
}

/// JSON-RPC error responses are verdicts from the endpoint (e.g. a reverting
/// gas estimation), anything else is a transport failure.
fn classify<E: MiddlewareError>(err: E) -> SignerError {
    match err.as_error_response() {
        Some(response) => SignerError::Rejected(response.to_string()),
        None => SignerError::Network(err.to_string()),
    }
}

fn connection_error<E: MiddlewareError>(err: E) -> DeployError {
    DeployError::Network {
        step: None,
        source: classify(err),
    }
}

#[cfg(test)]
mod tests {
    use ethers::abi::Abi;

    use super::*;
    use crate::artifacts::test_utils::{GOVERNANCE_ABI, VAULT_ABI};

    const DEV_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn artifact(abi: &str) -> ContractArtifact {
        ContractArtifact {
            name: "FundVault".to_string(),
            bytecode: vec![0x60, 0x80].into(),
            abi: serde_json::from_str::<Abi>(abi).unwrap(),
        }
    }

    #[test]
    fn constructor_arguments_follow_the_bytecode() {
        let token = Address::repeat_byte(0xaa);

        let code =
            creation_code(&artifact(VAULT_ABI), &[Token::Address(token)])
                .unwrap();

        assert_eq!(code.len(), 2 + 32);
        assert_eq!(&code[..2], &[0x60, 0x80]);
        assert_eq!(&code[14..], token.as_bytes());
    }

    #[test]
    fn mismatched_constructor_arguments_are_rejected() {
        let err = creation_code(&artifact(GOVERNANCE_ABI), &[]).unwrap_err();
        assert!(err.is_deployment_failure());

        let err = creation_code(&artifact("[]"), &[Token::Bool(true)])
            .unwrap_err();
        assert!(err.is_deployment_failure());

        assert_eq!(creation_code(&artifact("[]"), &[]).unwrap(), vec![0x60, 0x80]);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let network = NetworkConfig {
            rpc_url: "http://127.0.0.1:9".parse().unwrap(),
            ..Default::default()
        };

        let result = RpcSigner::connect(
            &network,
            &DEV_KEY.parse().unwrap(),
            ConfirmationConfig::default(),
        )
        .await;

        assert!(matches!(
            result,
            Err(DeployError::Network { step: None, .. })
        ));
    }
}
