//! Ledger module for the attestor system.
//!
//! The ledger is the registry the attestor submits to: it tracks per-signer
//! nonces, accepts attestations and revocations, and reports the inputs of
//! its own signing domain. Every call is an asynchronous suspension point and
//! every failure is propagated to the caller unmodified; nothing here retries.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use attestor_types::{
	Attestation, AttestationRequest, DelegatedAttestationRequest, DelegatedRevocationRequest,
	DomainSeparatorInputs, FeeOverrides, MultiAttestationRequest,
	MultiDelegatedAttestationRequest, MultiDelegatedRevocationRequest, MultiRevocationRequest,
	RevocationRequest, Uid,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when a submission is rejected.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// A delegated signature does not recover to the claimed signer.
	#[error("Invalid signature: {0}")]
	InvalidSignature(String),
	/// A delegated request was submitted after its deadline.
	#[error("Deadline expired: {deadline} < {now}")]
	DeadlineExpired { deadline: u64, now: u64 },
	/// The referenced attestation does not exist.
	#[error("Attestation not found: {0}")]
	NotFound(Uid),
	/// The attestation was created irrevocable.
	#[error("Attestation is irrevocable: {0}")]
	Irrevocable(Uid),
	/// The caller is not allowed to act on the attestation.
	#[error("Access denied: {0}")]
	AccessDenied(String),
	/// The attestation has already been revoked.
	#[error("Attestation already revoked: {0}")]
	AlreadyRevoked(Uid),
	/// A proxy flow was requested but no proxy is deployed.
	#[error("No delegation proxy configured")]
	ProxyNotConfigured,
}

/// Trait defining the interface to an attestation registry.
///
/// Submission methods take already-signed requests. Fee overrides are
/// forwarded as a complete pair or not at all.
#[async_trait]
pub trait LedgerInterface: Send + Sync {
	/// Returns the next delegated-request nonce the registry expects from `account`.
	async fn get_nonce(&self, account: Address) -> Result<U256, LedgerError>;

	/// Looks up an attestation by UID.
	async fn get_attestation(&self, uid: Uid) -> Result<Option<Attestation>, LedgerError>;

	/// Returns whether an attestation with this UID exists.
	async fn is_attestation_valid(&self, uid: Uid) -> Result<bool, LedgerError>;

	/// Returns whether the attestation exists and has been revoked.
	async fn is_attestation_revoked(&self, uid: Uid) -> Result<bool, LedgerError>;

	/// Returns the registry's own domain separator inputs.
	async fn get_domain_separator_inputs(&self) -> Result<DomainSeparatorInputs, LedgerError>;

	/// Returns the address of the delegation proxy, if one is deployed.
	async fn get_proxy_address(&self) -> Result<Option<Address>, LedgerError>;

	async fn submit_attest(
		&self,
		request: &AttestationRequest,
		overrides: Option<FeeOverrides>,
	) -> Result<Uid, LedgerError>;

	async fn submit_multi_attest(
		&self,
		requests: &[MultiAttestationRequest],
		overrides: Option<FeeOverrides>,
	) -> Result<Vec<Uid>, LedgerError>;

	async fn submit_attest_by_delegation(
		&self,
		request: &DelegatedAttestationRequest,
		overrides: Option<FeeOverrides>,
	) -> Result<Uid, LedgerError>;

	async fn submit_multi_attest_by_delegation(
		&self,
		requests: &[MultiDelegatedAttestationRequest],
		overrides: Option<FeeOverrides>,
	) -> Result<Vec<Uid>, LedgerError>;

	async fn submit_attest_by_delegation_proxy(
		&self,
		request: &DelegatedAttestationRequest,
		overrides: Option<FeeOverrides>,
	) -> Result<Uid, LedgerError>;

	async fn submit_multi_attest_by_delegation_proxy(
		&self,
		requests: &[MultiDelegatedAttestationRequest],
		overrides: Option<FeeOverrides>,
	) -> Result<Vec<Uid>, LedgerError>;

	async fn submit_revoke(
		&self,
		request: &RevocationRequest,
		overrides: Option<FeeOverrides>,
	) -> Result<(), LedgerError>;

	async fn submit_multi_revoke(
		&self,
		requests: &[MultiRevocationRequest],
		overrides: Option<FeeOverrides>,
	) -> Result<(), LedgerError>;

	async fn submit_revoke_by_delegation(
		&self,
		request: &DelegatedRevocationRequest,
		overrides: Option<FeeOverrides>,
	) -> Result<(), LedgerError>;

	async fn submit_multi_revoke_by_delegation(
		&self,
		requests: &[MultiDelegatedRevocationRequest],
		overrides: Option<FeeOverrides>,
	) -> Result<(), LedgerError>;

	async fn submit_revoke_by_delegation_proxy(
		&self,
		request: &DelegatedRevocationRequest,
		overrides: Option<FeeOverrides>,
	) -> Result<(), LedgerError>;

	async fn submit_multi_revoke_by_delegation_proxy(
		&self,
		requests: &[MultiDelegatedRevocationRequest],
		overrides: Option<FeeOverrides>,
	) -> Result<(), LedgerError>;
}
