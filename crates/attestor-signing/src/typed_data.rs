//! Typed-data domain builder and type schemas.
//!
//! A signature is bound to a domain (name, version, chain and verifying
//! contract) and to the ordered field list of its primary type. Both are fixed
//! by the deployed contracts: reordering a field changes the struct hash and
//! recovery silently yields a different address.

use crate::version::{OffchainAttestationVersion, ProtocolVersion};
use crate::SigningError;
use alloy_primitives::{keccak256, Address, B256};
use attestor_account::SignerInterface;
use attestor_types::eip712::{
	compute_domain_hash, compute_final_digest, Eip712AbiEncoder, SolType,
};
use attestor_types::{DomainSeparatorInputs, Eip712Error, Eip712Value, Signature};
use serde::{Deserialize, Serialize};

/// A typed-data signing domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
	pub name: String,
	pub version: String,
	pub chain_id: u64,
	pub verifying_contract: Address,
}

impl Eip712Domain {
	/// The domain separator hash.
	pub fn separator(&self) -> B256 {
		compute_domain_hash(
			&self.name,
			&self.version,
			self.chain_id,
			&self.verifying_contract,
		)
	}
}

impl From<DomainSeparatorInputs> for Eip712Domain {
	fn from(inputs: DomainSeparatorInputs) -> Self {
		Self {
			name: inputs.name,
			version: inputs.version,
			chain_id: inputs.chain_id,
			verifying_contract: inputs.verifying_contract,
		}
	}
}

/// Builds the domain binding signatures to one contract on one chain.
pub fn build_domain(
	contract_name: &str,
	protocol_version: &str,
	chain_id: u64,
	verifying_contract: Address,
) -> Eip712Domain {
	Eip712Domain {
		name: contract_name.to_string(),
		version: protocol_version.to_string(),
		chain_id,
		verifying_contract,
	}
}

/// The four request kinds a relayer can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
	Attest,
	AttestProxy,
	Revoke,
	RevokeProxy,
}

/// A field of a primary type, in the `{name, type}` shape wallets expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeField {
	pub name: String,
	#[serde(rename = "type")]
	pub sol_type: SolType,
}

/// The primary type name and ordered fields of a signed struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSchema {
	pub primary_type: &'static str,
	pub fields: &'static [(&'static str, SolType)],
}

/// A message whose fields can be looked up by their schema names.
pub trait TypedMessage {
	fn field(&self, name: &str) -> Option<Eip712Value>;
}

impl TypeSchema {
	/// The EIP-712 type encoding, e.g. `Revoke(bytes32 schema,bytes32 uid,uint256 nonce)`.
	pub fn encode_type(&self) -> String {
		let fields: Vec<String> = self
			.fields
			.iter()
			.map(|(name, ty)| format!("{} {}", ty, name))
			.collect();
		format!("{}({})", self.primary_type, fields.join(","))
	}

	pub fn type_hash(&self) -> B256 {
		keccak256(self.encode_type().as_bytes())
	}

	/// Field list for a typed-data payload.
	pub fn type_fields(&self) -> Vec<TypeField> {
		self.fields
			.iter()
			.map(|(name, ty)| TypeField {
				name: name.to_string(),
				sol_type: *ty,
			})
			.collect()
	}

	/// Hashes `message` field by field in schema order.
	pub fn hash_struct(&self, message: &dyn TypedMessage) -> Result<B256, Eip712Error> {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&self.type_hash());
		for (name, ty) in self.fields {
			let value = message
				.field(name)
				.ok_or_else(|| Eip712Error::MissingField(name.to_string()))?;
			enc.push_value(name, *ty, &value)?;
		}
		Ok(keccak256(enc.finish()))
	}

	/// The final digest of `message` under `domain`.
	pub fn digest(&self, domain: &Eip712Domain, message: &dyn TypedMessage) -> Result<B256, Eip712Error> {
		Ok(compute_final_digest(
			&domain.separator(),
			&self.hash_struct(message)?,
		))
	}
}

const ATTEST_CURRENT: &[(&str, SolType)] = &[
	("attester", SolType::Address),
	("schema", SolType::Bytes32),
	("recipient", SolType::Address),
	("expirationTime", SolType::Uint64),
	("revocable", SolType::Bool),
	("refUID", SolType::Bytes32),
	("data", SolType::Bytes),
	("value", SolType::Uint256),
	("nonce", SolType::Uint256),
	("deadline", SolType::Uint64),
];

const ATTEST_LEGACY: &[(&str, SolType)] = &[
	("schema", SolType::Bytes32),
	("recipient", SolType::Address),
	("expirationTime", SolType::Uint64),
	("revocable", SolType::Bool),
	("refUID", SolType::Bytes32),
	("data", SolType::Bytes),
	("nonce", SolType::Uint256),
];

const ATTEST_PROXY_CURRENT: &[(&str, SolType)] = &[
	("attester", SolType::Address),
	("schema", SolType::Bytes32),
	("recipient", SolType::Address),
	("expirationTime", SolType::Uint64),
	("revocable", SolType::Bool),
	("refUID", SolType::Bytes32),
	("data", SolType::Bytes),
	("value", SolType::Uint256),
	("deadline", SolType::Uint64),
];

const ATTEST_PROXY_LEGACY: &[(&str, SolType)] = &[
	("schema", SolType::Bytes32),
	("recipient", SolType::Address),
	("expirationTime", SolType::Uint64),
	("revocable", SolType::Bool),
	("refUID", SolType::Bytes32),
	("data", SolType::Bytes),
	("deadline", SolType::Uint64),
];

const REVOKE_CURRENT: &[(&str, SolType)] = &[
	("revoker", SolType::Address),
	("schema", SolType::Bytes32),
	("uid", SolType::Bytes32),
	("value", SolType::Uint256),
	("nonce", SolType::Uint256),
	("deadline", SolType::Uint64),
];

const REVOKE_LEGACY: &[(&str, SolType)] = &[
	("schema", SolType::Bytes32),
	("uid", SolType::Bytes32),
	("nonce", SolType::Uint256),
];

const REVOKE_PROXY_CURRENT: &[(&str, SolType)] = &[
	("revoker", SolType::Address),
	("schema", SolType::Bytes32),
	("uid", SolType::Bytes32),
	("value", SolType::Uint256),
	("deadline", SolType::Uint64),
];

const REVOKE_PROXY_LEGACY: &[(&str, SolType)] = &[
	("schema", SolType::Bytes32),
	("uid", SolType::Bytes32),
	("deadline", SolType::Uint64),
];

const OFFCHAIN_LEGACY: &[(&str, SolType)] = &[
	("schema", SolType::Bytes32),
	("recipient", SolType::Address),
	("time", SolType::Uint64),
	("expirationTime", SolType::Uint64),
	("revocable", SolType::Bool),
	("refUID", SolType::Bytes32),
	("data", SolType::Bytes),
];

const OFFCHAIN_V1: &[(&str, SolType)] = &[
	("version", SolType::Uint16),
	("schema", SolType::Bytes32),
	("recipient", SolType::Address),
	("time", SolType::Uint64),
	("expirationTime", SolType::Uint64),
	("revocable", SolType::Bool),
	("refUID", SolType::Bytes32),
	("data", SolType::Bytes),
];

const OFFCHAIN_V2: &[(&str, SolType)] = &[
	("version", SolType::Uint16),
	("schema", SolType::Bytes32),
	("recipient", SolType::Address),
	("time", SolType::Uint64),
	("expirationTime", SolType::Uint64),
	("revocable", SolType::Bool),
	("refUID", SolType::Bytes32),
	("data", SolType::Bytes),
	("salt", SolType::Bytes32),
];

/// Type schema of a relayed request of `kind` for contracts of `version`.
pub fn build_type_schema(kind: RequestKind, version: ProtocolVersion) -> TypeSchema {
	let (primary_type, fields) = match (kind, version) {
		(RequestKind::Attest, ProtocolVersion::Current) => ("Attest", ATTEST_CURRENT),
		(RequestKind::Attest, ProtocolVersion::Legacy) => ("Attest", ATTEST_LEGACY),
		(RequestKind::AttestProxy, ProtocolVersion::Current) => ("Attest", ATTEST_PROXY_CURRENT),
		(RequestKind::AttestProxy, ProtocolVersion::Legacy) => ("Attest", ATTEST_PROXY_LEGACY),
		(RequestKind::Revoke, ProtocolVersion::Current) => ("Revoke", REVOKE_CURRENT),
		(RequestKind::Revoke, ProtocolVersion::Legacy) => ("Revoke", REVOKE_LEGACY),
		(RequestKind::RevokeProxy, ProtocolVersion::Current) => ("Revoke", REVOKE_PROXY_CURRENT),
		(RequestKind::RevokeProxy, ProtocolVersion::Legacy) => ("Revoke", REVOKE_PROXY_LEGACY),
	};
	TypeSchema {
		primary_type,
		fields,
	}
}

/// Type schema of an offchain attestation of `version`.
pub fn offchain_type_schema(version: OffchainAttestationVersion) -> TypeSchema {
	match version {
		OffchainAttestationVersion::Legacy => TypeSchema {
			primary_type: "Attestation",
			fields: OFFCHAIN_LEGACY,
		},
		OffchainAttestationVersion::Version1 => TypeSchema {
			primary_type: "Attest",
			fields: OFFCHAIN_V1,
		},
		OffchainAttestationVersion::Version2 => TypeSchema {
			primary_type: "Attest",
			fields: OFFCHAIN_V2,
		},
	}
}

/// A signed typed-data request together with everything needed to check it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Response<M> {
	pub domain: Eip712Domain,
	pub primary_type: String,
	pub types: Vec<TypeField>,
	pub message: M,
	/// The recoverable digest the signature was produced over.
	pub digest: B256,
	pub signature: Signature,
}

/// Hashes `message` under `schema` and `domain` and has `signer` sign it.
pub(crate) async fn sign_typed_request<M>(
	domain: &Eip712Domain,
	schema: TypeSchema,
	message: M,
	signer: &dyn SignerInterface,
) -> Result<Eip712Response<M>, SigningError>
where
	M: TypedMessage,
{
	let digest = schema.digest(domain, &message)?;
	let signature = signer.sign_hash(&digest).await?;

	tracing::debug!(
		primary_type = schema.primary_type,
		domain = %domain.name,
		chain_id = domain.chain_id,
		digest = %digest,
		"Signed typed data request"
	);

	Ok(Eip712Response {
		domain: domain.clone(),
		primary_type: schema.primary_type.to_string(),
		types: schema.type_fields(),
		message,
		digest,
		signature,
	})
}

/// Checks that `response` was signed by `claimed` over `schema` and `domain`.
///
/// Everything is recomputed from the message; the embedded domain, types and
/// digest must agree with the recomputation. Any disagreement is `false`.
pub(crate) fn verify_typed_request<M>(
	domain: &Eip712Domain,
	schema: TypeSchema,
	claimed: Address,
	response: &Eip712Response<M>,
) -> bool
where
	M: TypedMessage,
{
	if claimed == Address::ZERO {
		return false;
	}
	if response.domain != *domain
		|| response.primary_type != schema.primary_type
		|| response.types != schema.type_fields()
	{
		return false;
	}

	let digest = match schema.digest(domain, &response.message) {
		Ok(digest) => digest,
		Err(e) => {
			tracing::debug!(error = %e, "Typed data message cannot be hashed");
			return false;
		},
	};
	if digest != response.digest {
		return false;
	}

	response.signature.recover_address(&digest) == Some(claimed)
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::U256;

	struct Revoke {
		schema: B256,
		uid: B256,
		nonce: u64,
	}

	impl TypedMessage for Revoke {
		fn field(&self, name: &str) -> Option<Eip712Value> {
			match name {
				"schema" => Some(self.schema.into()),
				"uid" => Some(self.uid.into()),
				"nonce" => Some(U256::from(self.nonce).into()),
				_ => None,
			}
		}
	}

	#[test]
	fn test_encode_type_strings() {
		let relayed = [
			(
				RequestKind::Attest,
				ProtocolVersion::Current,
				"Attest(address attester,bytes32 schema,address recipient,uint64 expirationTime,bool revocable,bytes32 refUID,bytes data,uint256 value,uint256 nonce,uint64 deadline)",
			),
			(
				RequestKind::Attest,
				ProtocolVersion::Legacy,
				"Attest(bytes32 schema,address recipient,uint64 expirationTime,bool revocable,bytes32 refUID,bytes data,uint256 nonce)",
			),
			(
				RequestKind::AttestProxy,
				ProtocolVersion::Current,
				"Attest(address attester,bytes32 schema,address recipient,uint64 expirationTime,bool revocable,bytes32 refUID,bytes data,uint256 value,uint64 deadline)",
			),
			(
				RequestKind::AttestProxy,
				ProtocolVersion::Legacy,
				"Attest(bytes32 schema,address recipient,uint64 expirationTime,bool revocable,bytes32 refUID,bytes data,uint64 deadline)",
			),
			(
				RequestKind::Revoke,
				ProtocolVersion::Current,
				"Revoke(address revoker,bytes32 schema,bytes32 uid,uint256 value,uint256 nonce,uint64 deadline)",
			),
			(
				RequestKind::Revoke,
				ProtocolVersion::Legacy,
				"Revoke(bytes32 schema,bytes32 uid,uint256 nonce)",
			),
			(
				RequestKind::RevokeProxy,
				ProtocolVersion::Current,
				"Revoke(address revoker,bytes32 schema,bytes32 uid,uint256 value,uint64 deadline)",
			),
			(
				RequestKind::RevokeProxy,
				ProtocolVersion::Legacy,
				"Revoke(bytes32 schema,bytes32 uid,uint64 deadline)",
			),
		];
		for (kind, version, expected) in relayed {
			assert_eq!(
				build_type_schema(kind, version).encode_type(),
				expected,
				"{:?} / {:?}",
				kind,
				version
			);
		}

		let offchain = [
			(
				OffchainAttestationVersion::Legacy,
				"Attestation(bytes32 schema,address recipient,uint64 time,uint64 expirationTime,bool revocable,bytes32 refUID,bytes data)",
			),
			(
				OffchainAttestationVersion::Version1,
				"Attest(uint16 version,bytes32 schema,address recipient,uint64 time,uint64 expirationTime,bool revocable,bytes32 refUID,bytes data)",
			),
			(
				OffchainAttestationVersion::Version2,
				"Attest(uint16 version,bytes32 schema,address recipient,uint64 time,uint64 expirationTime,bool revocable,bytes32 refUID,bytes data,bytes32 salt)",
			),
		];
		for (version, expected) in offchain {
			assert_eq!(offchain_type_schema(version).encode_type(), expected, "{:?}", version);
		}
	}

	#[test]
	fn test_hash_struct_follows_schema_order() {
		let message = Revoke {
			schema: B256::repeat_byte(1),
			uid: B256::repeat_byte(2),
			nonce: 7,
		};
		let schema = build_type_schema(RequestKind::Revoke, ProtocolVersion::Legacy);

		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&keccak256(
			"Revoke(bytes32 schema,bytes32 uid,uint256 nonce)".as_bytes(),
		));
		enc.push_b256(&B256::repeat_byte(1));
		enc.push_b256(&B256::repeat_byte(2));
		enc.push_u256(U256::from(7));
		assert_eq!(schema.hash_struct(&message).unwrap(), keccak256(enc.finish()));

		let reordered = TypeSchema {
			primary_type: "Revoke",
			fields: &[
				("uid", SolType::Bytes32),
				("schema", SolType::Bytes32),
				("nonce", SolType::Uint256),
			],
		};
		assert_ne!(
			reordered.hash_struct(&message).unwrap(),
			schema.hash_struct(&message).unwrap()
		);
	}

	#[test]
	fn test_missing_field_is_reported() {
		let message = Revoke {
			schema: B256::ZERO,
			uid: B256::ZERO,
			nonce: 0,
		};
		let schema = build_type_schema(RequestKind::Revoke, ProtocolVersion::Current);
		assert_eq!(
			schema.hash_struct(&message),
			Err(Eip712Error::MissingField("revoker".to_string()))
		);
	}

	#[test]
	fn test_domain_separator_depends_on_every_input() {
		let base = build_domain("EAS", "1.3.0", 1, Address::repeat_byte(1));
		let variants = [
			build_domain("EIP712Proxy", "1.3.0", 1, Address::repeat_byte(1)),
			build_domain("EAS", "1.2.0", 1, Address::repeat_byte(1)),
			build_domain("EAS", "1.3.0", 10, Address::repeat_byte(1)),
			build_domain("EAS", "1.3.0", 1, Address::repeat_byte(2)),
		];
		for variant in variants {
			assert_ne!(base.separator(), variant.separator());
		}
	}
}
