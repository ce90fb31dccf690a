//! Canonical encoder for attestation identifiers.
//!
//! Produces the exact Solidity `abi.encodePacked` byte layout that the registry
//! hashes when it content-addresses an attestation. No normalization happens
//! here: the encoder packs exactly the values it is given, so a caller that
//! supplies a non-canonical value gets a non-matching identifier and no error.

use crate::uid::{UidFields, UidVersion};
use crate::version::OffchainAttestationVersion;
use alloy_primitives::{Address, B256};

/// Tightly packed encoder (`abi.encodePacked`): no padding, no length prefixes.
#[derive(Debug, Default)]
pub struct PackedEncoder {
	buf: Vec<u8>,
}

impl PackedEncoder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Raw `bytes`, `string` or `bytesN` contents.
	pub fn push_bytes(&mut self, v: &[u8]) -> &mut Self {
		self.buf.extend_from_slice(v);
		self
	}

	pub fn push_b256(&mut self, v: &B256) -> &mut Self {
		self.push_bytes(v.as_slice())
	}

	pub fn push_address(&mut self, v: &Address) -> &mut Self {
		self.push_bytes(v.as_slice())
	}

	pub fn push_u16(&mut self, v: u16) -> &mut Self {
		self.push_bytes(&v.to_be_bytes())
	}

	pub fn push_u32(&mut self, v: u32) -> &mut Self {
		self.push_bytes(&v.to_be_bytes())
	}

	pub fn push_u64(&mut self, v: u64) -> &mut Self {
		self.push_bytes(&v.to_be_bytes())
	}

	pub fn push_bool(&mut self, v: bool) -> &mut Self {
		self.push_bytes(&[v as u8])
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}

/// Lowercase `0x`-prefixed rendering of a schema identifier.
///
/// Offchain layouts pack the UTF-8 bytes of this string rather than the raw
/// 32 bytes of the identifier.
pub fn schema_hex(schema: &B256) -> String {
	format!("0x{:x}", schema)
}

/// Encodes attestation fields in the layout selected by `version`.
pub fn encode(version: UidVersion, fields: &UidFields) -> Vec<u8> {
	let mut enc = PackedEncoder::new();

	match version {
		UidVersion::Onchain => {
			enc.push_b256(&fields.schema);
		},
		UidVersion::Offchain(offchain) => {
			if offchain != OffchainAttestationVersion::Legacy {
				enc.push_u16(offchain.as_u16());
			}
			enc.push_bytes(schema_hex(&fields.schema).as_bytes());
		},
	}

	enc.push_address(&fields.recipient)
		.push_address(&fields.attester)
		.push_u64(fields.time)
		.push_u64(fields.expiration_time)
		.push_bool(fields.revocable)
		.push_b256(&fields.ref_uid)
		.push_bytes(&fields.data);

	if version == UidVersion::Offchain(OffchainAttestationVersion::Version2) {
		enc.push_b256(&fields.salt);
	}

	enc.push_u32(fields.bump);
	enc.finish()
}

/// Encodes a schema registration: `string schema, address resolver, bool revocable`.
pub fn encode_schema(schema: &str, resolver: &Address, revocable: bool) -> Vec<u8> {
	let mut enc = PackedEncoder::new();
	enc.push_bytes(schema.as_bytes())
		.push_address(resolver)
		.push_bool(revocable);
	enc.finish()
}
