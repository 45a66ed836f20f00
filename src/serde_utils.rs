use std::path::Path;

use eyre::Context;
use serde::de::DeserializeOwned;

/// Serializes addresses in their EIP-55 checksummed form.
pub mod checksummed {
    use ethers::types::Address;
    use ethers::utils::to_checksum;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(
        address: &Address,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&to_checksum(address, None))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Address, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        s.parse().map_err(serde::de::Error::custom)
    }

    pub mod map {
        use std::collections::BTreeMap;

        use ethers::types::Address;
        use ethers::utils::to_checksum;
        use serde::ser::SerializeMap;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(
            map: &BTreeMap<String, Address>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut ser = serializer.serialize_map(Some(map.len()))?;
            for (name, address) in map {
                ser.serialize_entry(name, &to_checksum(address, None))?;
            }
            ser.end()
        }

        pub fn deserialize<'de, D>(
            deserializer: D,
        ) -> Result<BTreeMap<String, Address>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = BTreeMap::<String, String>::deserialize(deserializer)?;

            raw.into_iter()
                .map(|(name, address)| {
                    let address =
                        address.parse().map_err(serde::de::Error::custom)?;
                    Ok((name, address))
                })
                .collect()
        }
    }
}

pub async fn read_deserialize<T>(path: impl AsRef<Path>) -> eyre::Result<T>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();

    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Reading from {}", path.display()))?;

    let value = serde_yaml::from_str(&content).with_context(|| {
        format!("Parsing {} content was {content}", path.display())
    })?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ethers::types::Address;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Addresses {
        #[serde(with = "checksummed")]
        owner: Address,
        #[serde(with = "checksummed::map")]
        contracts: BTreeMap<String, Address>,
    }

    #[test]
    fn addresses_are_checksummed() {
        let usdc: Address =
            "0x1c7d4b196cb0c7b01d743fbc6116a902379c7238".parse().unwrap();

        let value = Addresses {
            owner: usdc,
            contracts: maplit::btreemap! { "USDC".to_string() => usdc },
        };

        let json = serde_json::to_string(&value).unwrap();

        assert_eq!(
            json,
            r#"{"owner":"0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238","contracts":{"USDC":"0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238"}}"#
        );

        let parsed: Addresses = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, value);
    }

    #[tokio::test]
    async fn reads_yaml_files() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");
        tokio::fs::write(&path, "a: 1\nb: 2\n").await?;

        let value: BTreeMap<String, u32> = read_deserialize(&path).await?;

        assert_eq!(value, maplit::btreemap! {
            "a".to_string() => 1,
            "b".to_string() => 2,
        });

        Ok(())
    }
}
