//! Protocol and offchain attestation versions.
//!
//! The registry's version string selects which type schemas its signature
//! recovery expects; the offchain attestation version selects both the
//! offchain type schema and the UID layout. Neither is ever guessed.

use crate::SigningError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type-schema generation of a deployed registry or proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
	/// Contracts before 1.2.0: nonce-only delegated requests without attester,
	/// value or deadline fields.
	Legacy,
	/// Contracts from 1.2.0 on.
	Current,
}

impl ProtocolVersion {
	/// Interprets a contract version string such as `1.3.0` or `0.26`.
	pub fn from_contract_version(version: &str) -> Result<Self, SigningError> {
		let invalid = || SigningError::InvalidVersion(version.to_string());

		let mut parts = [0u64; 3];
		let mut count = 0;
		for part in version.trim().split('.') {
			if count == parts.len() {
				return Err(invalid());
			}
			parts[count] = part.parse::<u64>().map_err(|_| invalid())?;
			count += 1;
		}
		if count < 2 {
			return Err(invalid());
		}

		if (parts[0], parts[1], parts[2]) < (1, 2, 0) {
			Ok(ProtocolVersion::Legacy)
		} else {
			Ok(ProtocolVersion::Current)
		}
	}
}

impl FromStr for ProtocolVersion {
	type Err = SigningError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_contract_version(s)
	}
}

/// Layout generation of an offchain attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum OffchainAttestationVersion {
	/// No version field in the signed message.
	Legacy = 0,
	/// Signed message carries a `version` field.
	Version1 = 1,
	/// Adds a random 32-byte salt to the message and the UID.
	Version2 = 2,
}

impl OffchainAttestationVersion {
	pub const LATEST: OffchainAttestationVersion = OffchainAttestationVersion::Version2;

	pub fn as_u16(self) -> u16 {
		self as u16
	}
}

impl TryFrom<u16> for OffchainAttestationVersion {
	type Error = SigningError;

	fn try_from(value: u16) -> Result<Self, Self::Error> {
		match value {
			0 => Ok(OffchainAttestationVersion::Legacy),
			1 => Ok(OffchainAttestationVersion::Version1),
			2 => Ok(OffchainAttestationVersion::Version2),
			other => Err(SigningError::InvalidVersion(format!(
				"unsupported offchain attestation version {}",
				other
			))),
		}
	}
}

impl From<OffchainAttestationVersion> for u16 {
	fn from(version: OffchainAttestationVersion) -> Self {
		version.as_u16()
	}
}

impl fmt::Display for OffchainAttestationVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_u16())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_contract_versions() {
		assert_eq!(
			ProtocolVersion::from_contract_version("0.26").unwrap(),
			ProtocolVersion::Legacy
		);
		assert_eq!(
			ProtocolVersion::from_contract_version("1.0.1").unwrap(),
			ProtocolVersion::Legacy
		);
		assert_eq!(
			ProtocolVersion::from_contract_version("1.1.0").unwrap(),
			ProtocolVersion::Legacy
		);
		assert_eq!(
			ProtocolVersion::from_contract_version("1.2.0").unwrap(),
			ProtocolVersion::Current
		);
		assert_eq!(
			"1.3.0".parse::<ProtocolVersion>().unwrap(),
			ProtocolVersion::Current
		);
	}

	#[test]
	fn test_invalid_contract_versions() {
		for bad in ["", "1", "one.two", "1.2.3.4", "1.-2"] {
			assert!(
				ProtocolVersion::from_contract_version(bad).is_err(),
				"{bad} should be rejected"
			);
		}
	}

	#[test]
	fn test_offchain_version_serde() {
		let json = serde_json::to_string(&OffchainAttestationVersion::Version1).unwrap();
		assert_eq!(json, "1");
		let parsed: OffchainAttestationVersion = serde_json::from_str("2").unwrap();
		assert_eq!(parsed, OffchainAttestationVersion::Version2);
		assert!(serde_json::from_str::<OffchainAttestationVersion>("3").is_err());
	}
}
