//! Attestation types for the attestor system.
//!
//! This module defines the immutable attestation record kept by the registry
//! and the mutable request shapes used to construct, delegate and revoke
//! attestations. Optional request fields are resolved to their documented
//! sentinels when a request is constructed, never when it is consumed.

use crate::Signature;
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Deterministic content-derived identifier of an attestation.
pub type Uid = B256;

/// The all-zero reference identifier meaning "no referenced attestation".
pub const ZERO_UID: Uid = B256::ZERO;

/// Expiration and deadline sentinel meaning "never expires".
pub const NO_EXPIRATION: u64 = 0;

/// Name of the registry's EIP-712 domain.
pub const REGISTRY_DOMAIN_NAME: &str = "EAS";

/// Default name of the delegation proxy's EIP-712 domain.
pub const DEFAULT_PROXY_DOMAIN_NAME: &str = "EIP712Proxy";

/// An attestation as recorded by the registry.
///
/// Born at acceptance time and mutated only by revocation, which sets
/// `revocation_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
	pub uid: Uid,
	pub schema: B256,
	#[serde(rename = "refUID")]
	pub ref_uid: Uid,
	pub time: u64,
	pub expiration_time: u64,
	pub revocation_time: u64,
	pub recipient: Address,
	pub attester: Address,
	pub revocable: bool,
	pub data: Bytes,
}

impl Attestation {
	/// Returns true once the attestation has been revoked.
	pub fn is_revoked(&self) -> bool {
		self.revocation_time != 0
	}
}

/// Construction input for a single attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRequestData {
	/// The recipient of the attestation.
	pub recipient: Address,
	/// Expiration time, `NO_EXPIRATION` when the attestation never expires.
	pub expiration_time: u64,
	/// Whether the attestation can later be revoked.
	pub revocable: bool,
	/// Referenced attestation, `ZERO_UID` when unset.
	#[serde(rename = "refUID")]
	pub ref_uid: Uid,
	/// Opaque payload encoded according to the schema.
	pub data: Bytes,
	/// Native value sent along with the request.
	pub value: U256,
}

impl AttestationRequestData {
	/// Creates request data with every optional field at its default:
	/// never expires, revocable, no reference and zero value.
	pub fn new(recipient: Address, data: impl Into<Bytes>) -> Self {
		Self {
			recipient,
			expiration_time: NO_EXPIRATION,
			revocable: true,
			ref_uid: ZERO_UID,
			data: data.into(),
			value: U256::ZERO,
		}
	}

	pub fn with_expiration_time(mut self, expiration_time: u64) -> Self {
		self.expiration_time = expiration_time;
		self
	}

	pub fn with_revocable(mut self, revocable: bool) -> Self {
		self.revocable = revocable;
		self
	}

	pub fn with_ref_uid(mut self, ref_uid: Uid) -> Self {
		self.ref_uid = ref_uid;
		self
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}
}

/// A single attestation request bound to a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRequest {
	pub schema: B256,
	pub data: AttestationRequestData,
}

/// A batch of attestation requests sharing one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiAttestationRequest {
	pub schema: B256,
	pub data: Vec<AttestationRequestData>,
}

/// Construction input for a revocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRequestData {
	/// Identifier of the attestation to revoke.
	pub uid: Uid,
	/// Native value sent along with the request.
	pub value: U256,
}

impl RevocationRequestData {
	pub fn new(uid: Uid) -> Self {
		Self {
			uid,
			value: U256::ZERO,
		}
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}
}

/// A single revocation request bound to a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRequest {
	pub schema: B256,
	pub data: RevocationRequestData,
}

/// A batch of revocation requests sharing one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiRevocationRequest {
	pub schema: B256,
	pub data: Vec<RevocationRequestData>,
}

/// A signed attestation request submitted by a relayer.
///
/// Used for both the nonce-bound delegated flow and the deadline-bound proxy
/// flow; the nonce is never transmitted because the registry tracks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedAttestationRequest {
	pub schema: B256,
	pub data: AttestationRequestData,
	pub signature: Signature,
	pub attester: Address,
	pub deadline: u64,
}

/// A batch of signed attestation requests, one signature per data item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiDelegatedAttestationRequest {
	pub schema: B256,
	pub data: Vec<AttestationRequestData>,
	pub signatures: Vec<Signature>,
	pub attester: Address,
	pub deadline: u64,
}

/// A signed revocation request submitted by a relayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedRevocationRequest {
	pub schema: B256,
	pub data: RevocationRequestData,
	pub signature: Signature,
	pub revoker: Address,
	pub deadline: u64,
}

/// A batch of signed revocation requests, one signature per data item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiDelegatedRevocationRequest {
	pub schema: B256,
	pub data: Vec<RevocationRequestData>,
	pub signatures: Vec<Signature>,
	pub revoker: Address,
	pub deadline: u64,
}

/// Inputs of a typed-data domain separator as reported by a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSeparatorInputs {
	pub chain_id: u64,
	pub verifying_contract: Address,
	pub name: String,
	pub version: String,
}

/// Name and version of the delegation proxy's signing domain.
///
/// The proxy address itself is always obtained from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
	pub name: String,
	pub version: String,
}

impl ProxySettings {
	pub fn new(version: impl Into<String>) -> Self {
		Self {
			name: DEFAULT_PROXY_DOMAIN_NAME.to_string(),
			version: version.into(),
		}
	}
}

/// Fee overrides forwarded to the ledger with a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeOverrides {
	pub max_priority_fee_per_gas: u128,
	pub max_fee_per_gas: u128,
}

/// Caller-supplied fee overrides, each half optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOverrides {
	pub max_priority_fee_per_gas: Option<u128>,
	pub max_fee_per_gas: Option<u128>,
}

impl TransactionOverrides {
	pub fn new(max_priority_fee_per_gas: u128, max_fee_per_gas: u128) -> Self {
		Self {
			max_priority_fee_per_gas: Some(max_priority_fee_per_gas),
			max_fee_per_gas: Some(max_fee_per_gas),
		}
	}

	/// Resolves the overrides to the pair forwarded to the ledger.
	///
	/// Both halves must be present; a lone half is dropped rather than
	/// combined with a default.
	pub fn resolve(&self) -> Option<FeeOverrides> {
		match (self.max_priority_fee_per_gas, self.max_fee_per_gas) {
			(Some(max_priority_fee_per_gas), Some(max_fee_per_gas)) => Some(FeeOverrides {
				max_priority_fee_per_gas,
				max_fee_per_gas,
			}),
			_ => None,
		}
	}

	/// Returns true when exactly one half was supplied.
	pub fn is_partial(&self) -> bool {
		self.max_priority_fee_per_gas.is_some() != self.max_fee_per_gas.is_some()
	}
}
