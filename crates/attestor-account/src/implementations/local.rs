//! Local private-key signer.
//!
//! Holds a secp256k1 key in process memory and signs digests synchronously
//! behind the async [`SignerInterface`].

use crate::{AccountError, SignerInterface};
use alloy_primitives::{Address, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use attestor_types::{SecretString, Signature};

/// Configuration name of this implementation.
pub const NAME: &str = "local";

/// A key-holder backed by an in-memory private key.
#[derive(Debug, Clone)]
pub struct LocalSigner {
	signer: PrivateKeySigner,
}

impl LocalSigner {
	/// Creates a signer from a hex-encoded private key, with or without `0x` prefix.
	pub fn new(private_key: &SecretString) -> Result<Self, AccountError> {
		let signer = private_key.with_exposed(|key| {
			key.parse::<PrivateKeySigner>()
				.map_err(|e| AccountError::InvalidKey(format!("Failed to parse private key: {}", e)))
		})?;
		Ok(Self { signer })
	}

	/// Creates a signer with a freshly generated random key.
	pub fn random() -> Self {
		Self {
			signer: PrivateKeySigner::random(),
		}
	}

	/// The signer's address, available without awaiting.
	pub fn address(&self) -> Address {
		self.signer.address()
	}
}

#[async_trait]
impl SignerInterface for LocalSigner {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_hash(&self, digest: &B256) -> Result<Signature, AccountError> {
		let signature = self
			.signer
			.sign_hash_sync(digest)
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		Ok(Signature::from_bytes(&signature.as_bytes()))
	}
}

/// Factory function to create a local signer from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex-encoded secp256k1 private key (required)
pub fn create_account(
	config: &toml::Value,
) -> Result<Box<dyn SignerInterface>, AccountError> {
	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| {
			AccountError::Configuration("private_key is required for local account".to_string())
		})?;

	let signer = LocalSigner::new(&SecretString::from(private_key))?;
	Ok(Box::new(signer))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	// Well-known development key #0.
	const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	#[tokio::test]
	async fn test_address_from_key() {
		let signer = LocalSigner::new(&SecretString::from(DEV_KEY)).unwrap();
		assert_eq!(
			SignerInterface::address(&signer).await.unwrap(),
			address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
		);
	}

	#[tokio::test]
	async fn test_signature_recovers_signer() {
		let signer = LocalSigner::random();
		let digest = B256::repeat_byte(0x42);
		let signature = signer.sign_hash(&digest).await.unwrap();
		assert!(signature.v == 27 || signature.v == 28);
		assert_eq!(signature.recover_address(&digest), Some(signer.address()));
	}

	#[test]
	fn test_invalid_key_rejected() {
		let result = LocalSigner::new(&SecretString::from("not-a-key"));
		assert!(matches!(result, Err(AccountError::InvalidKey(_))));
	}

	#[test]
	fn test_factory_requires_private_key() {
		let config: toml::Value = toml::from_str("other = 1").unwrap();
		assert!(matches!(
			create_account(&config),
			Err(AccountError::Configuration(_))
		));

		let config: toml::Value = toml::from_str(&format!("private_key = \"{}\"", DEV_KEY)).unwrap();
		assert!(create_account(&config).is_ok());
	}
}
