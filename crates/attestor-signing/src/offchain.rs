//! Offchain attestation signing and verification.
//!
//! An offchain attestation is never seen by the registry. Its UID, version and
//! timestamp are fixed by the signer and embedded in the artifact, so the
//! verifier is the only party that can detect an inconsistent artifact: it
//! checks both the signature and that the embedded UID is the one the signed
//! fields derive to.

use crate::typed_data::{
	build_domain, offchain_type_schema, sign_typed_request, verify_typed_request, Eip712Domain,
	Eip712Response, TypedMessage,
};
use crate::uid::{derive_uid, UidFields, UidVersion};
use crate::version::OffchainAttestationVersion;
use crate::SigningError;
use alloy_primitives::{Address, Bytes, B256};
use attestor_account::SignerInterface;
use attestor_types::{Eip712Value, Uid, NO_EXPIRATION, ZERO_UID};
use serde::{Deserialize, Serialize};

/// Domain name offchain attestations are signed under.
pub const OFFCHAIN_DOMAIN_NAME: &str = "EAS Attestation";

/// The registry deployment an offchain attestation is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffchainConfig {
	pub address: Address,
	pub version: String,
	pub chain_id: u64,
}

/// Caller-supplied fields of an offchain attestation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffchainAttestationParams {
	pub schema: B256,
	pub recipient: Address,
	pub time: u64,
	pub expiration_time: u64,
	pub revocable: bool,
	pub ref_uid: Uid,
	pub data: Bytes,
	/// Only signed by version 2 attestations.
	pub salt: B256,
}

impl OffchainAttestationParams {
	/// Creates parameters with a freshly drawn salt and the documented
	/// defaults: never expires, revocable, no reference.
	pub fn new(schema: B256, recipient: Address, time: u64, data: impl Into<Bytes>) -> Self {
		Self {
			schema,
			recipient,
			time,
			expiration_time: NO_EXPIRATION,
			revocable: true,
			ref_uid: ZERO_UID,
			data: data.into(),
			salt: B256::random(),
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

	pub fn with_salt(mut self, salt: B256) -> Self {
		self.salt = salt;
		self
	}
}

/// The signed message of an offchain attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffchainAttestationMessage {
	pub version: u16,
	pub schema: B256,
	pub recipient: Address,
	pub time: u64,
	pub expiration_time: u64,
	pub revocable: bool,
	#[serde(rename = "refUID")]
	pub ref_uid: Uid,
	pub data: Bytes,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub salt: Option<B256>,
}

impl OffchainAttestationMessage {
	fn new(version: OffchainAttestationVersion, params: &OffchainAttestationParams) -> Self {
		let salt = (version == OffchainAttestationVersion::Version2).then_some(params.salt);
		Self {
			version: version.as_u16(),
			schema: params.schema,
			recipient: params.recipient,
			time: params.time,
			expiration_time: params.expiration_time,
			revocable: params.revocable,
			ref_uid: params.ref_uid,
			data: params.data.clone(),
			salt,
		}
	}

	/// The canonical UID fields: zero attester, bump 0.
	fn uid_fields(&self) -> UidFields {
		UidFields::new(self.schema, self.recipient, self.time, self.data.clone())
			.with_expiration_time(self.expiration_time)
			.with_revocable(self.revocable)
			.with_ref_uid(self.ref_uid)
			.with_salt(self.salt.unwrap_or_default())
	}
}

impl TypedMessage for OffchainAttestationMessage {
	fn field(&self, name: &str) -> Option<Eip712Value> {
		let value = match name {
			"version" => self.version.into(),
			"schema" => self.schema.into(),
			"recipient" => self.recipient.into(),
			"time" => self.time.into(),
			"expirationTime" => self.expiration_time.into(),
			"revocable" => self.revocable.into(),
			"refUID" => self.ref_uid.into(),
			"data" => self.data.clone().into(),
			"salt" => self.salt?.into(),
			_ => return None,
		};
		Some(value)
	}
}

/// A self-contained offchain attestation: typed-data envelope plus the UID
/// and layout version it was derived under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOffchainAttestation {
	pub version: OffchainAttestationVersion,
	pub uid: Uid,
	#[serde(flatten)]
	pub response: Eip712Response<OffchainAttestationMessage>,
}

/// The artifact of record: a signed attestation and the address that claims it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffchainAttestationPackage {
	pub sig: SignedOffchainAttestation,
	pub signer: Address,
}

impl OffchainAttestationPackage {
	pub fn new(sig: SignedOffchainAttestation, signer: Address) -> Self {
		Self { sig, signer }
	}

	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string_pretty(self)
	}

	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	/// Verifies the package against `offchain`'s domain.
	pub fn verify(&self, offchain: &Offchain) -> bool {
		offchain.verify_offchain_attestation_signature(self.signer, &self.sig)
	}
}

/// Signer and verifier for offchain attestations of one registry deployment.
#[derive(Debug, Clone)]
pub struct Offchain {
	domain: Eip712Domain,
	version: OffchainAttestationVersion,
}

impl Offchain {
	/// Creates an offchain signer producing attestations of `version`.
	pub fn new(config: &OffchainConfig, version: OffchainAttestationVersion) -> Self {
		Self {
			domain: build_domain(
				OFFCHAIN_DOMAIN_NAME,
				&config.version,
				config.chain_id,
				config.address,
			),
			version,
		}
	}

	pub fn domain(&self) -> &Eip712Domain {
		&self.domain
	}

	pub fn version(&self) -> OffchainAttestationVersion {
		self.version
	}

	/// The UID `params` would be signed under by this signer.
	pub fn get_offchain_uid(&self, params: &OffchainAttestationParams) -> Uid {
		let message = OffchainAttestationMessage::new(self.version, params);
		derive_uid(UidVersion::Offchain(self.version), &message.uid_fields())
	}

	pub async fn sign_offchain_attestation(
		&self,
		params: &OffchainAttestationParams,
		signer: &dyn SignerInterface,
	) -> Result<SignedOffchainAttestation, SigningError> {
		let message = OffchainAttestationMessage::new(self.version, params);
		let uid = derive_uid(UidVersion::Offchain(self.version), &message.uid_fields());

		let response =
			sign_typed_request(&self.domain, offchain_type_schema(self.version), message, signer)
				.await?;

		tracing::debug!(
			uid = %uid,
			version = %self.version,
			"Signed offchain attestation"
		);

		Ok(SignedOffchainAttestation {
			version: self.version,
			uid,
			response,
		})
	}

	/// Batched offchain attestation is not supported. Fails without signing.
	pub async fn sign_offchain_attestations(
		&self,
		params: &[OffchainAttestationParams],
		_signer: &dyn SignerInterface,
	) -> Result<Vec<SignedOffchainAttestation>, SigningError> {
		Err(SigningError::UnsupportedOperation(format!(
			"batched offchain attestation ({} requests); sign each attestation individually",
			params.len()
		)))
	}

	/// Returns true only when the artifact was signed by `claimed` under this
	/// signer's domain and its embedded UID matches the signed fields.
	///
	/// The artifact's own version selects the type schema and UID layout, so
	/// attestations of any version can be checked by one verifier.
	pub fn verify_offchain_attestation_signature(
		&self,
		claimed: Address,
		attestation: &SignedOffchainAttestation,
	) -> bool {
		let version = attestation.version;
		let message = &attestation.response.message;

		if message.version != version.as_u16() {
			return false;
		}
		if message.salt.is_some() != (version == OffchainAttestationVersion::Version2) {
			return false;
		}

		let uid = derive_uid(UidVersion::Offchain(version), &message.uid_fields());
		if uid != attestation.uid {
			tracing::debug!(
				embedded = %attestation.uid,
				derived = %uid,
				"Offchain attestation UID mismatch"
			);
			return false;
		}

		verify_typed_request(
			&self.domain,
			offchain_type_schema(version),
			claimed,
			&attestation.response,
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use attestor_account::implementations::local::LocalSigner;
	use attestor_account::AccountError;
	use attestor_types::Signature;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn config() -> OffchainConfig {
		OffchainConfig {
			address: Address::repeat_byte(0xea),
			version: "1.3.0".to_string(),
			chain_id: 11155111,
		}
	}

	fn params() -> OffchainAttestationParams {
		OffchainAttestationParams::new(
			B256::repeat_byte(0xaa),
			Address::repeat_byte(0x11),
			1000,
			Bytes::new(),
		)
	}

	struct CountingSigner {
		calls: AtomicUsize,
	}

	#[async_trait::async_trait]
	impl SignerInterface for CountingSigner {
		async fn address(&self) -> Result<Address, AccountError> {
			Ok(Address::repeat_byte(0x01))
		}

		async fn sign_hash(&self, _digest: &B256) -> Result<Signature, AccountError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Err(AccountError::SigningFailed("not expected".to_string()))
		}
	}

	#[tokio::test]
	async fn test_sign_and_verify_every_version() {
		let key = LocalSigner::random();
		let other = LocalSigner::random();

		for version in [
			OffchainAttestationVersion::Legacy,
			OffchainAttestationVersion::Version1,
			OffchainAttestationVersion::Version2,
		] {
			let offchain = Offchain::new(&config(), version);
			let signed = offchain
				.sign_offchain_attestation(&params(), &key)
				.await
				.unwrap();

			assert_eq!(signed.version, version);
			assert_eq!(signed.response.domain.name, OFFCHAIN_DOMAIN_NAME);
			let salt = signed.response.message.salt.unwrap_or_default();
			assert_eq!(signed.uid, offchain.get_offchain_uid(&params().with_salt(salt)));
			assert!(offchain.verify_offchain_attestation_signature(key.address(), &signed));
			assert!(!offchain.verify_offchain_attestation_signature(other.address(), &signed));
		}
	}

	#[tokio::test]
	async fn test_mutated_uid_fails_even_though_signature_recovers() {
		let key = LocalSigner::random();
		let offchain = Offchain::new(&config(), OffchainAttestationVersion::Version2);
		let mut signed = offchain
			.sign_offchain_attestation(&params(), &key)
			.await
			.unwrap();

		signed.uid = B256::repeat_byte(0x99);
		assert_eq!(
			signed.response.signature.recover_address(&signed.response.digest),
			Some(key.address())
		);
		assert!(!offchain.verify_offchain_attestation_signature(key.address(), &signed));
	}

	#[tokio::test]
	async fn test_mutated_message_fails() {
		let key = LocalSigner::random();
		let offchain = Offchain::new(&config(), OffchainAttestationVersion::Version2);
		let signed = offchain
			.sign_offchain_attestation(&params(), &key)
			.await
			.unwrap();

		let mut later = signed.clone();
		later.response.message.time = 1001;
		assert!(!offchain.verify_offchain_attestation_signature(key.address(), &later));

		let mut resalted = signed.clone();
		resalted.response.message.salt = Some(B256::repeat_byte(0x01));
		assert!(!offchain.verify_offchain_attestation_signature(key.address(), &resalted));

		let mut downgraded = signed;
		downgraded.version = OffchainAttestationVersion::Version1;
		assert!(!offchain.verify_offchain_attestation_signature(key.address(), &downgraded));
	}

	#[tokio::test]
	async fn test_wrong_domain_fails() {
		let key = LocalSigner::random();
		let signed = Offchain::new(&config(), OffchainAttestationVersion::Version2)
			.sign_offchain_attestation(&params(), &key)
			.await
			.unwrap();

		let other_chain = Offchain::new(
			&OffchainConfig {
				chain_id: 1,
				..config()
			},
			OffchainAttestationVersion::Version2,
		);
		assert!(!other_chain.verify_offchain_attestation_signature(key.address(), &signed));
	}

	#[tokio::test]
	async fn test_zero_claimed_address_fails() {
		let key = LocalSigner::random();
		let offchain = Offchain::new(&config(), OffchainAttestationVersion::Version1);
		let signed = offchain
			.sign_offchain_attestation(&params(), &key)
			.await
			.unwrap();
		assert!(!offchain.verify_offchain_attestation_signature(Address::ZERO, &signed));
	}

	#[tokio::test]
	async fn test_batch_is_rejected_before_signing() {
		let signer = CountingSigner {
			calls: AtomicUsize::new(0),
		};
		let offchain = Offchain::new(&config(), OffchainAttestationVersion::Version2);

		let result = offchain
			.sign_offchain_attestations(&[params(), params()], &signer)
			.await;
		assert!(matches!(result, Err(SigningError::UnsupportedOperation(_))));
		assert_eq!(signer.calls.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn test_salt_is_random_per_params() {
		let a = params();
		let b = params();
		assert_ne!(a.salt, b.salt);

		let v2 = Offchain::new(&config(), OffchainAttestationVersion::Version2);
		assert_ne!(v2.get_offchain_uid(&a), v2.get_offchain_uid(&b));

		let v1 = Offchain::new(&config(), OffchainAttestationVersion::Version1);
		assert_eq!(v1.get_offchain_uid(&a), v1.get_offchain_uid(&b));
	}

	#[tokio::test]
	async fn test_package_json_round_trip_verifies() {
		let key = LocalSigner::random();
		let offchain = Offchain::new(&config(), OffchainAttestationVersion::Version2);
		let signed = offchain
			.sign_offchain_attestation(&params(), &key)
			.await
			.unwrap();
		let package = OffchainAttestationPackage::new(signed, key.address());

		let json = package.to_json().unwrap();
		assert!(json.contains("\"primaryType\": \"Attest\""));
		assert!(json.contains("\"refUID\""));

		let restored = OffchainAttestationPackage::from_json(&json).unwrap();
		assert_eq!(restored, package);
		assert!(restored.verify(&offchain));
	}
}
