use std::str::FromStr;

use ethers::prelude::k256::SecretKey;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;

use crate::error::DeployError;

/// Signing secret for the deployer account.
///
/// The key itself is never displayed; use [`PrivateKey::address`] for logs.
#[derive(Debug, Clone)]
pub struct PrivateKey {
    pub key: SecretKey,
}

impl PrivateKey {
    pub fn address(&self) -> Address {
        LocalWallet::from(self.key.clone()).address()
    }
}

impl FromStr for PrivateKey {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);

        let bytes = hex::decode(s)
            .map_err(|err| DeployError::Authentication(err.to_string()))?;

        let key = SecretKey::from_slice(&bytes).map_err(|_| {
            DeployError::Authentication(format!(
                "expected a 32 byte secp256k1 scalar, got {} bytes",
                bytes.len()
            ))
        })?;

        Ok(Self { key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well known anvil development key #0.
    const DEV_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn parses_with_and_without_prefix() {
        let bare: PrivateKey = DEV_KEY.parse().unwrap();
        let prefixed: PrivateKey = format!("0x{DEV_KEY}\n").parse().unwrap();

        assert_eq!(bare.address(), prefixed.address());
        assert_eq!(
            bare.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn rejects_malformed_secrets() {
        let zero = "00".repeat(32);

        for secret in ["not-hex", "0xabcd", "", zero.as_str()] {
            let err = secret.parse::<PrivateKey>().unwrap_err();
            assert!(
                matches!(err, DeployError::Authentication(_)),
                "{secret:?} gave {err:?}"
            );
        }
    }
}
