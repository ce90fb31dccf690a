//! Delegated (nonce-bound) request signing.
//!
//! A delegated request is signed by the attester or revoker and submitted by
//! a relayer directly to the registry. The signature embeds the nonce the
//! registry will observe at submission time; the registry consumes it exactly
//! once. For a batch from one signer the nonces are consecutive and are
//! computed by the caller, never by re-querying the registry between items.

use crate::typed_data::{
	build_type_schema, sign_typed_request, verify_typed_request, Eip712Domain, Eip712Response,
	RequestKind, TypeSchema, TypedMessage,
};
use crate::version::ProtocolVersion;
use crate::SigningError;
use alloy_primitives::{Address, Bytes, B256, U256};
use attestor_account::SignerInterface;
use attestor_types::{
	AttestationRequestData, DomainSeparatorInputs, Eip712Value, RevocationRequestData, Uid,
};
use serde::{Deserialize, Serialize};

/// The message of a delegated attestation.
///
/// `attester`, `value` and `deadline` are only signed by current contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedAttestationParams {
	pub attester: Address,
	pub schema: B256,
	pub recipient: Address,
	pub expiration_time: u64,
	pub revocable: bool,
	#[serde(rename = "refUID")]
	pub ref_uid: Uid,
	pub data: Bytes,
	pub value: U256,
	pub nonce: U256,
	pub deadline: u64,
}

impl DelegatedAttestationParams {
	pub fn new(
		attester: Address,
		schema: B256,
		request: &AttestationRequestData,
		nonce: U256,
		deadline: u64,
	) -> Self {
		Self {
			attester,
			schema,
			recipient: request.recipient,
			expiration_time: request.expiration_time,
			revocable: request.revocable,
			ref_uid: request.ref_uid,
			data: request.data.clone(),
			value: request.value,
			nonce,
			deadline,
		}
	}
}

impl TypedMessage for DelegatedAttestationParams {
	fn field(&self, name: &str) -> Option<Eip712Value> {
		let value = match name {
			"attester" => self.attester.into(),
			"schema" => self.schema.into(),
			"recipient" => self.recipient.into(),
			"expirationTime" => self.expiration_time.into(),
			"revocable" => self.revocable.into(),
			"refUID" => self.ref_uid.into(),
			"data" => self.data.clone().into(),
			"value" => self.value.into(),
			"nonce" => self.nonce.into(),
			"deadline" => self.deadline.into(),
			_ => return None,
		};
		Some(value)
	}
}

/// The message of a delegated revocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedRevocationParams {
	pub revoker: Address,
	pub schema: B256,
	pub uid: Uid,
	pub value: U256,
	pub nonce: U256,
	pub deadline: u64,
}

impl DelegatedRevocationParams {
	pub fn new(
		revoker: Address,
		schema: B256,
		request: &RevocationRequestData,
		nonce: U256,
		deadline: u64,
	) -> Self {
		Self {
			revoker,
			schema,
			uid: request.uid,
			value: request.value,
			nonce,
			deadline,
		}
	}
}

impl TypedMessage for DelegatedRevocationParams {
	fn field(&self, name: &str) -> Option<Eip712Value> {
		let value = match name {
			"revoker" => self.revoker.into(),
			"schema" => self.schema.into(),
			"uid" => self.uid.into(),
			"value" => self.value.into(),
			"nonce" => self.nonce.into(),
			"deadline" => self.deadline.into(),
			_ => return None,
		};
		Some(value)
	}
}

pub type SignedDelegatedAttestation = Eip712Response<DelegatedAttestationParams>;
pub type SignedDelegatedRevocation = Eip712Response<DelegatedRevocationParams>;

/// Signer and verifier for requests bound to the registry's own domain.
#[derive(Debug, Clone)]
pub struct Delegated {
	domain: Eip712Domain,
	version: ProtocolVersion,
}

impl Delegated {
	/// Creates a delegated signer for the registry described by `inputs`.
	pub fn new(inputs: DomainSeparatorInputs) -> Result<Self, SigningError> {
		let version = ProtocolVersion::from_contract_version(&inputs.version)?;
		Ok(Self {
			domain: inputs.into(),
			version,
		})
	}

	pub fn domain(&self) -> &Eip712Domain {
		&self.domain
	}

	pub fn version(&self) -> ProtocolVersion {
		self.version
	}

	pub fn attest_type_schema(&self) -> TypeSchema {
		build_type_schema(RequestKind::Attest, self.version)
	}

	pub fn revoke_type_schema(&self) -> TypeSchema {
		build_type_schema(RequestKind::Revoke, self.version)
	}

	pub async fn sign_delegated_attestation(
		&self,
		params: DelegatedAttestationParams,
		signer: &dyn SignerInterface,
	) -> Result<SignedDelegatedAttestation, SigningError> {
		sign_typed_request(&self.domain, self.attest_type_schema(), params, signer).await
	}

	/// Returns true only when `response` recovers to `claimed` under this registry's domain.
	pub fn verify_delegated_attestation_signature(
		&self,
		claimed: Address,
		response: &SignedDelegatedAttestation,
	) -> bool {
		verify_typed_request(&self.domain, self.attest_type_schema(), claimed, response)
	}

	pub async fn sign_delegated_revocation(
		&self,
		params: DelegatedRevocationParams,
		signer: &dyn SignerInterface,
	) -> Result<SignedDelegatedRevocation, SigningError> {
		sign_typed_request(&self.domain, self.revoke_type_schema(), params, signer).await
	}

	pub fn verify_delegated_revocation_signature(
		&self,
		claimed: Address,
		response: &SignedDelegatedRevocation,
	) -> bool {
		verify_typed_request(&self.domain, self.revoke_type_schema(), claimed, response)
	}
}
