//! Attestation signing core.
//!
//! This crate reproduces the registry's content addressing and typed-data
//! signature scheme bit for bit. It is pure and synchronous except where it
//! awaits the key-holder:
//!
//! - [`encoding`] serializes attestation fields into the packed byte layout
//!   the registry hashes.
//! - [`uid`] derives attestation and schema identifiers from that layout.
//! - [`typed_data`] builds signing domains and the ordered type schemas of
//!   every request kind.
//! - [`delegated`], [`proxy`] and [`offchain`] sign and verify the three
//!   signature styles that do not come from the transaction sender.

use attestor_account::AccountError;
use attestor_types::Eip712Error;
use thiserror::Error;

pub mod delegated;
pub mod encoding;
pub mod offchain;
pub mod proxy;
pub mod typed_data;
pub mod uid;
pub mod version;

pub use delegated::{
	Delegated, DelegatedAttestationParams, DelegatedRevocationParams, SignedDelegatedAttestation,
	SignedDelegatedRevocation,
};
pub use offchain::{
	Offchain, OffchainAttestationMessage, OffchainAttestationPackage, OffchainAttestationParams,
	OffchainConfig, SignedOffchainAttestation, OFFCHAIN_DOMAIN_NAME,
};
pub use proxy::{
	DelegatedProxy, DelegatedProxyAttestationParams, DelegatedProxyRevocationParams,
	SignedDelegatedProxyAttestation, SignedDelegatedProxyRevocation,
};
pub use typed_data::{
	build_domain, build_type_schema, offchain_type_schema, Eip712Domain, Eip712Response,
	RequestKind, TypeField, TypeSchema, TypedMessage,
};
pub use uid::{derive_schema_uid, derive_uid, UidFields, UidVersion};
pub use version::{OffchainAttestationVersion, ProtocolVersion};

/// Errors that can occur while producing signatures.
///
/// Verification never produces one of these: a signature that does not check
/// out is reported as `false`.
#[derive(Debug, Error)]
pub enum SigningError {
	/// The requested operation is deliberately not supported.
	#[error("Unsupported operation: {0}")]
	UnsupportedOperation(String),
	/// A contract version string could not be interpreted.
	#[error("Invalid protocol version: {0}")]
	InvalidVersion(String),
	/// The message could not be hashed under its type schema.
	#[error("Typed data error: {0}")]
	TypedData(#[from] Eip712Error),
	/// The key-holder failed to produce a signature.
	#[error("Signer error: {0}")]
	Signer(#[from] AccountError),
}
