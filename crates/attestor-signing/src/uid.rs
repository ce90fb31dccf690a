//! UID derivation.
//!
//! An attestation's identifier is the keccak256 of its canonical encoding, a
//! pure function of its fields and the layout version. The registry relies on
//! this for content addressing, so derivation is total and deterministic.

use crate::encoding;
use crate::version::OffchainAttestationVersion;
use alloy_primitives::{keccak256, Address, Bytes, B256};
use attestor_types::{Uid, NO_EXPIRATION, ZERO_UID};

/// Selects the canonical layout used to derive a UID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UidVersion {
	/// The registry's own layout for accepted attestations.
	Onchain,
	/// The layout of a never-broadcast attestation of the given version.
	Offchain(OffchainAttestationVersion),
}

/// The canonical fields an attestation UID is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidFields {
	pub schema: B256,
	pub recipient: Address,
	pub attester: Address,
	pub time: u64,
	pub expiration_time: u64,
	pub revocable: bool,
	pub ref_uid: Uid,
	pub data: Bytes,
	/// Only packed by `Offchain(Version2)`.
	pub salt: B256,
	/// Disambiguates otherwise identical attestations.
	pub bump: u32,
}

impl UidFields {
	/// Creates fields with the documented defaults: zero attester, never
	/// expires, revocable, no reference, zero salt and bump.
	pub fn new(schema: B256, recipient: Address, time: u64, data: impl Into<Bytes>) -> Self {
		Self {
			schema,
			recipient,
			attester: Address::ZERO,
			time,
			expiration_time: NO_EXPIRATION,
			revocable: true,
			ref_uid: ZERO_UID,
			data: data.into(),
			salt: B256::ZERO,
			bump: 0,
		}
	}

	pub fn with_attester(mut self, attester: Address) -> Self {
		self.attester = attester;
		self
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

	pub fn with_salt(mut self, salt: B256) -> Self {
		self.salt = salt;
		self
	}

	pub fn with_bump(mut self, bump: u32) -> Self {
		self.bump = bump;
		self
	}
}

/// Derives the UID of `fields` under the layout selected by `version`.
pub fn derive_uid(version: UidVersion, fields: &UidFields) -> Uid {
	keccak256(encoding::encode(version, fields))
}

/// Derives the identifier of a schema registration.
pub fn derive_schema_uid(schema: &str, resolver: Address, revocable: bool) -> B256 {
	keccak256(encoding::encode_schema(schema, &resolver, revocable))
}

#[cfg(test)]
mod tests {
	use super::*;

	const ALL_VERSIONS: [UidVersion; 4] = [
		UidVersion::Onchain,
		UidVersion::Offchain(OffchainAttestationVersion::Legacy),
		UidVersion::Offchain(OffchainAttestationVersion::Version1),
		UidVersion::Offchain(OffchainAttestationVersion::Version2),
	];

	fn scenario() -> UidFields {
		UidFields::new(
			B256::repeat_byte(0xaa),
			Address::repeat_byte(0x11),
			1000,
			Bytes::new(),
		)
	}

	#[test]
	fn test_uid_is_deterministic() {
		for version in ALL_VERSIONS {
			let first = derive_uid(version, &scenario());
			let second = derive_uid(version, &scenario().clone());
			assert_eq!(first, second);
			assert_eq!(first.len(), 32);
		}
	}

	#[test]
	fn test_versions_select_distinct_layouts() {
		let mut uids: Vec<Uid> = ALL_VERSIONS
			.iter()
			.map(|v| derive_uid(*v, &scenario()))
			.collect();
		uids.sort();
		uids.dedup();
		assert_eq!(uids.len(), ALL_VERSIONS.len());
	}

	#[test]
	fn test_every_field_changes_uid() {
		let base = scenario();
		let variants = vec![
			UidFields {
				schema: B256::repeat_byte(0xab),
				..base.clone()
			},
			UidFields {
				recipient: Address::repeat_byte(0x12),
				..base.clone()
			},
			base.clone().with_attester(Address::repeat_byte(0x22)),
			UidFields {
				time: 1001,
				..base.clone()
			},
			base.clone().with_expiration_time(2000),
			base.clone().with_revocable(false),
			base.clone().with_ref_uid(B256::repeat_byte(0x01)),
			UidFields {
				data: Bytes::from_static(&[0x00]),
				..base.clone()
			},
			base.clone().with_bump(1),
		];

		for version in ALL_VERSIONS {
			let mut seen = vec![derive_uid(version, &base)];
			for variant in &variants {
				let uid = derive_uid(version, variant);
				assert!(!seen.contains(&uid), "collision under {:?} for {:?}", version, variant);
				seen.push(uid);
			}
		}
	}

	#[test]
	fn test_salt_only_affects_version2() {
		let salted = scenario().with_salt(B256::repeat_byte(0x77));
		for version in ALL_VERSIONS {
			let changed = derive_uid(version, &salted) != derive_uid(version, &scenario());
			assert_eq!(
				changed,
				version == UidVersion::Offchain(OffchainAttestationVersion::Version2)
			);
		}
	}

	#[test]
	fn test_schema_uid() {
		let a = derive_schema_uid("uint256 score", Address::ZERO, true);
		assert_eq!(a, derive_schema_uid("uint256 score", Address::ZERO, true));
		assert_ne!(a, derive_schema_uid("uint256 score", Address::ZERO, false));
		assert_ne!(a, derive_schema_uid("uint256 score", Address::repeat_byte(1), true));
		assert_ne!(a, derive_schema_uid("bool flag", Address::ZERO, true));
	}
}
