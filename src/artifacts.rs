use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ethers::abi::Abi;
use ethers::types::Bytes;
use tracing::{debug, instrument};

use crate::error::DeployError;

pub const BYTECODE_EXTENSION: &str = "bin";
pub const ABI_EXTENSION: &str = "abi";

/// A compiled contract: creation bytecode plus its ABI.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub name: String,
    pub bytecode: Bytes,
    pub abi: Abi,
}

/// Reads `<name>.bin` / `<name>.abi` pairs from a build output directory.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    build_dir: PathBuf,
}

impl ArtifactLoader {
    pub fn new(build_dir: impl AsRef<Path>) -> Self {
        Self {
            build_dir: build_dir.as_ref().to_owned(),
        }
    }

    pub fn bytecode_path(&self, name: &str) -> PathBuf {
        self.build_dir
            .join(format!("{name}.{BYTECODE_EXTENSION}"))
    }

    pub fn abi_path(&self, name: &str) -> PathBuf {
        self.build_dir.join(format!("{name}.{ABI_EXTENSION}"))
    }

    #[instrument(skip(self))]
    pub async fn load(&self, name: &str) -> Result<ContractArtifact, DeployError> {
        let bytecode_path = self.bytecode_path(name);
        let abi_path = self.abi_path(name);

        let bytecode = read_artifact_file(name, &bytecode_path).await?;
        let abi = read_artifact_file(name, &abi_path).await?;

        let bytecode = decode_bytecode(&bytecode).map_err(|reason| {
            DeployError::ArtifactFormat {
                name: name.to_string(),
                path: bytecode_path.clone(),
                reason,
            }
        })?;

        let abi: Abi = serde_json::from_str(&abi).map_err(|err| {
            DeployError::ArtifactFormat {
                name: name.to_string(),
                path: abi_path.clone(),
                reason: err.to_string(),
            }
        })?;

        debug!(bytes = bytecode.len(), "Loaded artifact");

        Ok(ContractArtifact {
            name: name.to_string(),
            bytecode,
            abi,
        })
    }
}

async fn read_artifact_file(
    name: &str,
    path: &Path,
) -> Result<String, DeployError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            Err(DeployError::ArtifactNotFound {
                name: name.to_string(),
                path: path.to_owned(),
            })
        }
        Err(err) => Err(DeployError::ArtifactFormat {
            name: name.to_string(),
            path: path.to_owned(),
            reason: err.to_string(),
        }),
    }
}

fn decode_bytecode(content: &str) -> Result<Bytes, String> {
    let content = content.trim();
    let content = content.strip_prefix("0x").unwrap_or(content);

    if content.is_empty() {
        return Err("bytecode is empty".to_string());
    }

    let bytes = hex::decode(content).map_err(|err| err.to_string())?;

    Ok(bytes.into())
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;

    use indoc::indoc;

    pub const VAULT_ABI: &str = indoc! {r#"
        [
          {
            "type": "constructor",
            "inputs": [{ "name": "_usdc", "type": "address", "internalType": "address" }],
            "stateMutability": "nonpayable"
          },
          {
            "type": "function",
            "name": "classA",
            "inputs": [],
            "outputs": [{ "name": "", "type": "address", "internalType": "contract ShareToken" }],
            "stateMutability": "view"
          },
          {
            "type": "function",
            "name": "classB",
            "inputs": [],
            "outputs": [{ "name": "", "type": "address", "internalType": "contract ShareToken" }],
            "stateMutability": "view"
          }
        ]
    "#};

    pub const GOVERNANCE_ABI: &str = indoc! {r#"
        [
          {
            "type": "constructor",
            "inputs": [{ "name": "_vault", "type": "address", "internalType": "address" }],
            "stateMutability": "nonpayable"
          }
        ]
    "#};

    pub const BYTECODE: &str = "0x6080604052348015600f57600080fd5b50\n";

    pub fn write_artifact(dir: &Path, name: &str, abi: &str) {
        std::fs::write(dir.join(format!("{name}.bin")), BYTECODE).unwrap();
        std::fs::write(dir.join(format!("{name}.abi")), abi).unwrap();
    }

    /// A build directory containing both `FundVault` and `Governance`.
    pub fn build_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), "FundVault", VAULT_ABI);
        write_artifact(dir.path(), "Governance", GOVERNANCE_ABI);
        dir
    }
}
