//! Proxy-delegated request signing.
//!
//! Proxy requests are submitted to an intermediary contract under its own
//! domain. They carry no nonce: replay protection is the deadline plus the
//! proxy's record of signatures it has already consumed.

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

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedProxyAttestationParams {
	pub attester: Address,
	pub schema: B256,
	pub recipient: Address,
	pub expiration_time: u64,
	pub revocable: bool,
	#[serde(rename = "refUID")]
	pub ref_uid: Uid,
	pub data: Bytes,
	pub value: U256,
	pub deadline: u64,
}

impl DelegatedProxyAttestationParams {
	pub fn new(
		attester: Address,
		schema: B256,
		request: &AttestationRequestData,
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
			deadline,
		}
	}
}

impl TypedMessage for DelegatedProxyAttestationParams {
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
			"deadline" => self.deadline.into(),
			_ => return None,
		};
		Some(value)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedProxyRevocationParams {
	pub revoker: Address,
	pub schema: B256,
	pub uid: Uid,
	pub value: U256,
	pub deadline: u64,
}

impl DelegatedProxyRevocationParams {
	pub fn new(
		revoker: Address,
		schema: B256,
		request: &RevocationRequestData,
		deadline: u64,
	) -> Self {
		Self {
			revoker,
			schema,
			uid: request.uid,
			value: request.value,
			deadline,
		}
	}
}

impl TypedMessage for DelegatedProxyRevocationParams {
	fn field(&self, name: &str) -> Option<Eip712Value> {
		let value = match name {
			"revoker" => self.revoker.into(),
			"schema" => self.schema.into(),
			"uid" => self.uid.into(),
			"value" => self.value.into(),
			"deadline" => self.deadline.into(),
			_ => return None,
		};
		Some(value)
	}
}

pub type SignedDelegatedProxyAttestation = Eip712Response<DelegatedProxyAttestationParams>;
pub type SignedDelegatedProxyRevocation = Eip712Response<DelegatedProxyRevocationParams>;

/// Signer and verifier for requests relayed through a proxy contract.
///
/// The domain is the proxy's: its configured name and version, the
/// registry's chain and the proxy's own address.
#[derive(Debug, Clone)]
pub struct DelegatedProxy {
	domain: Eip712Domain,
	version: ProtocolVersion,
}

impl DelegatedProxy {
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
		build_type_schema(RequestKind::AttestProxy, self.version)
	}

	pub fn revoke_type_schema(&self) -> TypeSchema {
		build_type_schema(RequestKind::RevokeProxy, self.version)
	}

	pub async fn sign_delegated_proxy_attestation(
		&self,
		params: DelegatedProxyAttestationParams,
		signer: &dyn SignerInterface,
	) -> Result<SignedDelegatedProxyAttestation, SigningError> {
		sign_typed_request(&self.domain, self.attest_type_schema(), params, signer).await
	}

	pub fn verify_delegated_proxy_attestation_signature(
		&self,
		claimed: Address,
		response: &SignedDelegatedProxyAttestation,
	) -> bool {
		verify_typed_request(&self.domain, self.attest_type_schema(), claimed, response)
	}

	pub async fn sign_delegated_proxy_revocation(
		&self,
		params: DelegatedProxyRevocationParams,
		signer: &dyn SignerInterface,
	) -> Result<SignedDelegatedProxyRevocation, SigningError> {
		sign_typed_request(&self.domain, self.revoke_type_schema(), params, signer).await
	}

	pub fn verify_delegated_proxy_revocation_signature(
		&self,
		claimed: Address,
		response: &SignedDelegatedProxyRevocation,
	) -> bool {
		verify_typed_request(&self.domain, self.revoke_type_schema(), claimed, response)
	}
}
