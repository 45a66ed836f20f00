use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::DeployError;
use crate::serde_utils::checksummed;

/// Outcome of a successful run, as written to `deployments/<network>.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub network: String,
    pub chain_id: u64,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    #[serde(with = "checksummed")]
    pub deployer: Address,
    #[serde(with = "checksummed::map")]
    pub contracts: BTreeMap<String, Address>,
}

impl DeploymentRecord {
    pub fn new(
        network: impl ToString,
        chain_id: u64,
        deployer: Address,
        contracts: BTreeMap<String, Address>,
    ) -> Self {
        Self {
            network: network.to_string(),
            chain_id,
            timestamp: Utc::now().trunc_subsecs(3),
            deployer,
            contracts,
        }
    }

    pub fn timestamp_string(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Writes `record` to `path`, replacing whatever was there before.
#[instrument(skip(record))]
pub async fn persist(
    record: &DeploymentRecord,
    path: &Path,
) -> Result<(), DeployError> {
    let storage_error = |source| DeployError::Storage {
        path: path.to_owned(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(storage_error)?;
    }

    let content = serde_json::to_string_pretty(record)
        .map_err(|err| storage_error(err.into()))?;

    // Written next to the target and renamed so an interrupted write never
    // leaves a truncated record behind.
    let tmp_path = path.with_extension("json.tmp");

    tokio::fs::write(&tmp_path, content)
        .await
        .map_err(storage_error)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(storage_error)?;

    info!("Deployment info saved to {}", path.display());

    Ok(())
}

/// RFC 3339 timestamps with millisecond precision and a `Z` suffix.
mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(
        timestamp: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer
            .serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        DateTime::parse_from_rfc3339(&s)
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
