//! Generic EIP-712 utilities shared across the attestor.
//!
//! These helpers provide:
//! - Domain separator computation
//! - Final digest computation (0x1901 || domainHash || structHash)
//! - An ABI word encoder for the field types used by attestation requests

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Errors raised while hashing typed structured data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Eip712Error {
	/// A field named by the type schema has no value in the message.
	#[error("Missing value for field '{0}'")]
	MissingField(String),
	/// A value does not match the declared field type.
	#[error("Type mismatch for field '{field}': expected {expected}")]
	TypeMismatch { field: String, expected: SolType },
	/// An integer does not fit the declared width.
	#[error("Value for field '{field}' overflows {expected}")]
	Overflow { field: String, expected: SolType },
}

/// Solidity field types appearing in attestation type schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolType {
	#[serde(rename = "address")]
	Address,
	#[serde(rename = "bool")]
	Bool,
	#[serde(rename = "bytes")]
	Bytes,
	#[serde(rename = "bytes32")]
	Bytes32,
	#[serde(rename = "string")]
	String,
	#[serde(rename = "uint16")]
	Uint16,
	#[serde(rename = "uint32")]
	Uint32,
	#[serde(rename = "uint64")]
	Uint64,
	#[serde(rename = "uint256")]
	Uint256,
}

impl SolType {
	/// Solidity spelling used inside an encoded type string.
	pub fn as_str(&self) -> &'static str {
		match self {
			SolType::Address => "address",
			SolType::Bool => "bool",
			SolType::Bytes => "bytes",
			SolType::Bytes32 => "bytes32",
			SolType::String => "string",
			SolType::Uint16 => "uint16",
			SolType::Uint32 => "uint32",
			SolType::Uint64 => "uint64",
			SolType::Uint256 => "uint256",
		}
	}

	fn uint_bits(&self) -> Option<usize> {
		match self {
			SolType::Uint16 => Some(16),
			SolType::Uint32 => Some(32),
			SolType::Uint64 => Some(64),
			SolType::Uint256 => Some(256),
			_ => None,
		}
	}
}

impl fmt::Display for SolType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single message value to be hashed under a declared field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eip712Value {
	Address(Address),
	Bool(bool),
	Bytes(Bytes),
	Bytes32(B256),
	String(String),
	Uint(U256),
}

impl From<Address> for Eip712Value {
	fn from(v: Address) -> Self {
		Eip712Value::Address(v)
	}
}

impl From<bool> for Eip712Value {
	fn from(v: bool) -> Self {
		Eip712Value::Bool(v)
	}
}

impl From<Bytes> for Eip712Value {
	fn from(v: Bytes) -> Self {
		Eip712Value::Bytes(v)
	}
}

impl From<B256> for Eip712Value {
	fn from(v: B256) -> Self {
		Eip712Value::Bytes32(v)
	}
}

impl From<U256> for Eip712Value {
	fn from(v: U256) -> Self {
		Eip712Value::Uint(v)
	}
}

impl From<u64> for Eip712Value {
	fn from(v: u64) -> Self {
		Eip712Value::Uint(U256::from(v))
	}
}

impl From<u16> for Eip712Value {
	fn from(v: u16) -> Self {
		Eip712Value::Uint(U256::from(v))
	}
}

/// Compute the EIP-712 domain separator
/// (keccak256(abi.encode(typeHash, nameHash, versionHash, chainId, verifyingContract))).
pub fn compute_domain_hash(
	name: &str,
	version: &str,
	chain_id: u64,
	verifying_contract: &Address,
) -> B256 {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&keccak256(DOMAIN_TYPE.as_bytes()));
	enc.push_string(name);
	enc.push_string(version);
	enc.push_u256(U256::from(chain_id));
	enc.push_address(verifying_contract);
	keccak256(enc.finish())
}

/// Compute the final EIP-712 digest: keccak256(0x1901 || domainHash || structHash).
pub fn compute_final_digest(domain_hash: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_hash.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

/// ABI encoder for the 32-byte words of an EIP-712 struct hash.
pub struct Eip712AbiEncoder {
	buf: Vec<u8>,
}

impl Default for Eip712AbiEncoder {
	fn default() -> Self {
		Self::new()
	}
}

impl Eip712AbiEncoder {
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		let word: [u8; 32] = v.to_be_bytes::<32>();
		self.buf.extend_from_slice(&word);
	}

	pub fn push_bool(&mut self, v: bool) {
		let mut word = [0u8; 32];
		word[31] = v as u8;
		self.buf.extend_from_slice(&word);
	}

	/// Dynamic `bytes` are encoded as the hash of their contents.
	pub fn push_bytes(&mut self, v: &[u8]) {
		self.buf.extend_from_slice(keccak256(v).as_slice());
	}

	/// Dynamic `string` values are encoded as the hash of their UTF-8 bytes.
	pub fn push_string(&mut self, v: &str) {
		self.push_bytes(v.as_bytes());
	}

	/// Encodes `value` as a field of type `ty`, checking that they agree.
	pub fn push_value(
		&mut self,
		field: &str,
		ty: SolType,
		value: &Eip712Value,
	) -> Result<(), Eip712Error> {
		let mismatch = || Eip712Error::TypeMismatch {
			field: field.to_string(),
			expected: ty,
		};
		match (ty, value) {
			(SolType::Address, Eip712Value::Address(a)) => self.push_address(a),
			(SolType::Bool, Eip712Value::Bool(b)) => self.push_bool(*b),
			(SolType::Bytes, Eip712Value::Bytes(b)) => self.push_bytes(b),
			(SolType::Bytes32, Eip712Value::Bytes32(b)) => self.push_b256(b),
			(SolType::String, Eip712Value::String(s)) => self.push_string(s),
			(ty, Eip712Value::Uint(u)) => {
				let bits = ty.uint_bits().ok_or_else(mismatch)?;
				if u.bit_len() > bits {
					return Err(Eip712Error::Overflow {
						field: field.to_string(),
						expected: ty,
					});
				}
				self.push_u256(*u);
			},
			_ => return Err(mismatch()),
		}
		Ok(())
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, b256};

	#[test]
	fn test_domain_hash_matches_reference() {
		// Domain of the well-known EIP-712 "Mail" example.
		let hash = compute_domain_hash(
			"Ether Mail",
			"1",
			1,
			&address!("CcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"),
		);
		assert_eq!(
			hash,
			b256!("f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f")
		);
	}

	#[test]
	fn test_final_digest_prefix() {
		let domain = B256::repeat_byte(0xaa);
		let body = B256::repeat_byte(0xbb);
		let mut raw = vec![0x19, 0x01];
		raw.extend_from_slice(domain.as_slice());
		raw.extend_from_slice(body.as_slice());
		assert_eq!(compute_final_digest(&domain, &body), keccak256(raw));
	}

	#[test]
	fn test_push_value_rejects_mismatch_and_overflow() {
		let mut enc = Eip712AbiEncoder::new();
		let err = enc
			.push_value("recipient", SolType::Address, &Eip712Value::Bool(true))
			.unwrap_err();
		assert!(matches!(err, Eip712Error::TypeMismatch { .. }));

		let err = enc
			.push_value("version", SolType::Uint16, &Eip712Value::Uint(U256::from(70_000u64)))
			.unwrap_err();
		assert!(matches!(err, Eip712Error::Overflow { .. }));

		enc.push_value("time", SolType::Uint64, &Eip712Value::Uint(U256::from(1000u64)))
			.unwrap();
		let words = enc.finish();
		assert_eq!(words.len(), 32);
		assert_eq!(&words[30..], &[0x03, 0xe8]);
	}
}
