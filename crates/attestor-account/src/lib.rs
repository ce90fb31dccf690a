//! Account management module for the attestor system.
//!
//! This module abstracts the key-holder that produces signatures over typed-data
//! digests. Signing is one of the two asynchronous suspension points of the
//! attestor: a key-holder may live in a remote wallet or hardware device, so
//! every call through [`SignerInterface`] is awaited.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use attestor_types::Signature;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when an account implementation is misconfigured.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for key-holders.
///
/// Implementations sign 32-byte digests without any message prefix; the
/// digest is already the final EIP-712 hash.
#[async_trait]
pub trait SignerInterface: Send + Sync {
	/// Returns the address controlled by this key-holder.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a prehashed digest and returns a recoverable signature.
	async fn sign_hash(&self, digest: &B256) -> Result<Signature, AccountError>;
}

/// Type alias for account factory functions.
///
/// Each account implementation exposes a factory that builds it from its
/// TOML configuration table.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn SignerInterface>, AccountError>;

/// Get all registered account implementations.
///
/// Returns `(name, factory)` pairs; the name is the key used under
/// `[account.implementations]` in configuration.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::NAME, local::create_account as AccountFactory)]
}
