//! In-memory reference ledger.
//!
//! This module provides a memory-based implementation of the LedgerInterface
//! trait that enforces the registry's acceptance rules: per-signer nonces,
//! deadlines against a settable clock, single-use proxy signatures, bumped
//! UIDs and revocation permissions. Every submission is atomic: a batch either
//! applies completely or leaves the ledger untouched.

use crate::{LedgerError, LedgerInterface};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use attestor_signing::{
	derive_uid, Delegated, DelegatedAttestationParams, DelegatedProxy,
	DelegatedProxyAttestationParams, DelegatedProxyRevocationParams, DelegatedRevocationParams,
	Eip712Domain, ProtocolVersion, TypeSchema, TypedMessage, UidFields, UidVersion,
};
use attestor_types::{
	current_timestamp, Attestation, AttestationRequest, AttestationRequestData,
	DelegatedAttestationRequest, DelegatedRevocationRequest, DomainSeparatorInputs, FeeOverrides,
	MultiAttestationRequest, MultiDelegatedAttestationRequest, MultiDelegatedRevocationRequest,
	MultiRevocationRequest, RevocationRequest, RevocationRequestData, Signature, Uid,
	NO_EXPIRATION, ZERO_UID,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A delegation proxy deployed next to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDeployment {
	pub address: Address,
	pub name: String,
	pub version: String,
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
	now: u64,
	nonces: HashMap<Address, U256>,
	attestations: HashMap<Uid, Attestation>,
	/// Original signer of each attestation relayed through the proxy.
	proxy_attesters: HashMap<Uid, Address>,
	used_proxy_signatures: HashSet<Signature>,
	submitted_overrides: Vec<Option<FeeOverrides>>,
}

/// In-memory ledger implementation.
///
/// Direct submissions are made as `sender`. The clock starts at the current
/// time and only moves when set explicitly.
pub struct MemoryLedger {
	domain: DomainSeparatorInputs,
	sender: Address,
	proxy: Option<ProxyDeployment>,
	state: Arc<RwLock<LedgerState>>,
}

impl MemoryLedger {
	/// Creates a ledger for the registry described by `domain`.
	pub fn new(domain: DomainSeparatorInputs, sender: Address) -> Self {
		Self {
			domain,
			sender,
			proxy: None,
			state: Arc::new(RwLock::new(LedgerState {
				now: current_timestamp(),
				..Default::default()
			})),
		}
	}

	pub fn with_proxy(mut self, proxy: ProxyDeployment) -> Self {
		self.proxy = Some(proxy);
		self
	}

	pub fn sender(&self) -> Address {
		self.sender
	}

	pub async fn now(&self) -> u64 {
		self.state.read().await.now
	}

	pub async fn set_time(&self, now: u64) {
		self.state.write().await.now = now;
	}

	/// Fee overrides received with each accepted submission, in order.
	pub async fn submitted_overrides(&self) -> Vec<Option<FeeOverrides>> {
		self.state.read().await.submitted_overrides.clone()
	}

	fn registry(&self) -> Result<Delegated, LedgerError> {
		Delegated::new(self.domain.clone())
			.map_err(|e| LedgerError::TransactionFailed(e.to_string()))
	}

	fn delegation_proxy(&self) -> Result<(DelegatedProxy, Address), LedgerError> {
		let deployment = self.proxy.as_ref().ok_or(LedgerError::ProxyNotConfigured)?;
		let proxy = DelegatedProxy::new(DomainSeparatorInputs {
			chain_id: self.domain.chain_id,
			verifying_contract: deployment.address,
			name: deployment.name.clone(),
			version: deployment.version.clone(),
		})
		.map_err(|e| LedgerError::TransactionFailed(e.to_string()))?;
		Ok((proxy, deployment.address))
	}

	/// Applies `apply` to a copy of the state and commits it only on success.
	async fn commit<T>(
		&self,
		overrides: Option<FeeOverrides>,
		apply: impl FnOnce(&mut LedgerState) -> Result<T, LedgerError>,
	) -> Result<T, LedgerError> {
		let mut state = self.state.write().await;
		let mut next = state.clone();
		let result = apply(&mut next)?;
		next.submitted_overrides.push(overrides);
		*state = next;
		Ok(result)
	}
}

fn check_signature(
	schema: TypeSchema,
	domain: &Eip712Domain,
	message: &dyn TypedMessage,
	signature: &Signature,
	signer: Address,
) -> Result<(), LedgerError> {
	let digest = schema
		.digest(domain, message)
		.map_err(|e| LedgerError::InvalidSignature(e.to_string()))?;
	match signature.recover_address(&digest) {
		Some(recovered) if recovered == signer && signer != Address::ZERO => Ok(()),
		Some(recovered) => Err(LedgerError::InvalidSignature(format!(
			"recovered {} for claimed signer {}",
			recovered, signer
		))),
		None => Err(LedgerError::InvalidSignature(
			"signature does not recover".to_string(),
		)),
	}
}

fn check_lengths(data: usize, signatures: usize) -> Result<(), LedgerError> {
	if data == 0 || data != signatures {
		return Err(LedgerError::TransactionFailed(format!(
			"invalid length: {} requests, {} signatures",
			data, signatures
		)));
	}
	Ok(())
}

impl LedgerState {
	fn check_deadline(&self, deadline: u64) -> Result<(), LedgerError> {
		if deadline != NO_EXPIRATION && deadline < self.now {
			return Err(LedgerError::DeadlineExpired {
				deadline,
				now: self.now,
			});
		}
		Ok(())
	}

	fn consume_nonce(&mut self, account: Address) -> U256 {
		let nonce = self.nonces.entry(account).or_insert(U256::ZERO);
		let current = *nonce;
		*nonce += U256::from(1);
		current
	}

	fn insert_attestation(
		&mut self,
		schema: B256,
		data: &AttestationRequestData,
		attester: Address,
	) -> Result<Uid, LedgerError> {
		if data.expiration_time != NO_EXPIRATION && data.expiration_time <= self.now {
			return Err(LedgerError::TransactionFailed(
				"invalid expiration time".to_string(),
			));
		}
		if data.ref_uid != ZERO_UID && !self.attestations.contains_key(&data.ref_uid) {
			return Err(LedgerError::NotFound(data.ref_uid));
		}

		let mut fields = UidFields::new(schema, data.recipient, self.now, data.data.clone())
			.with_attester(attester)
			.with_expiration_time(data.expiration_time)
			.with_revocable(data.revocable)
			.with_ref_uid(data.ref_uid);
		let mut uid = derive_uid(UidVersion::Onchain, &fields);
		while self.attestations.contains_key(&uid) {
			fields.bump += 1;
			uid = derive_uid(UidVersion::Onchain, &fields);
		}

		self.attestations.insert(
			uid,
			Attestation {
				uid,
				schema,
				ref_uid: data.ref_uid,
				time: self.now,
				expiration_time: data.expiration_time,
				revocation_time: 0,
				recipient: data.recipient,
				attester,
				revocable: data.revocable,
				data: data.data.clone(),
			},
		);
		tracing::debug!(uid = %uid, attester = %attester, bump = fields.bump, "Attestation accepted");
		Ok(uid)
	}

	fn revoke_attestation(
		&mut self,
		schema: B256,
		uid: Uid,
		revoker: Address,
	) -> Result<(), LedgerError> {
		let now = self.now;
		let attestation = self
			.attestations
			.get_mut(&uid)
			.ok_or(LedgerError::NotFound(uid))?;

		if attestation.schema != schema {
			return Err(LedgerError::TransactionFailed("invalid schema".to_string()));
		}
		if attestation.attester != revoker {
			return Err(LedgerError::AccessDenied(format!(
				"{} is not the attester of {}",
				revoker, uid
			)));
		}
		if !attestation.revocable {
			return Err(LedgerError::Irrevocable(uid));
		}
		if attestation.is_revoked() {
			return Err(LedgerError::AlreadyRevoked(uid));
		}

		attestation.revocation_time = now;
		tracing::debug!(uid = %uid, revoker = %revoker, "Attestation revoked");
		Ok(())
	}

	fn attest_by_delegation(
		&mut self,
		registry: &Delegated,
		schema: B256,
		data: &AttestationRequestData,
		signature: &Signature,
		attester: Address,
		deadline: u64,
	) -> Result<Uid, LedgerError> {
		if registry.version() == ProtocolVersion::Current {
			self.check_deadline(deadline)?;
		}
		let nonce = self.consume_nonce(attester);
		let params = DelegatedAttestationParams::new(attester, schema, data, nonce, deadline);
		check_signature(
			registry.attest_type_schema(),
			registry.domain(),
			&params,
			signature,
			attester,
		)?;
		self.insert_attestation(schema, data, attester)
	}

	fn revoke_by_delegation(
		&mut self,
		registry: &Delegated,
		schema: B256,
		data: &RevocationRequestData,
		signature: &Signature,
		revoker: Address,
		deadline: u64,
	) -> Result<(), LedgerError> {
		if registry.version() == ProtocolVersion::Current {
			self.check_deadline(deadline)?;
		}
		let nonce = self.consume_nonce(revoker);
		let params = DelegatedRevocationParams::new(revoker, schema, data, nonce, deadline);
		check_signature(
			registry.revoke_type_schema(),
			registry.domain(),
			&params,
			signature,
			revoker,
		)?;
		self.revoke_attestation(schema, data.uid, revoker)
	}

	fn use_proxy_signature(&mut self, signature: &Signature) -> Result<(), LedgerError> {
		if !self.used_proxy_signatures.insert(*signature) {
			return Err(LedgerError::InvalidSignature(
				"signature already used".to_string(),
			));
		}
		Ok(())
	}

	#[allow(clippy::too_many_arguments)]
	fn attest_by_delegation_proxy(
		&mut self,
		proxy: &DelegatedProxy,
		proxy_address: Address,
		schema: B256,
		data: &AttestationRequestData,
		signature: &Signature,
		attester: Address,
		deadline: u64,
	) -> Result<Uid, LedgerError> {
		self.check_deadline(deadline)?;
		let params = DelegatedProxyAttestationParams::new(attester, schema, data, deadline);
		check_signature(
			proxy.attest_type_schema(),
			proxy.domain(),
			&params,
			signature,
			attester,
		)?;
		self.use_proxy_signature(signature)?;

		// The proxy submits to the registry itself and remembers the signer.
		let uid = self.insert_attestation(schema, data, proxy_address)?;
		self.proxy_attesters.insert(uid, attester);
		Ok(uid)
	}

	#[allow(clippy::too_many_arguments)]
	fn revoke_by_delegation_proxy(
		&mut self,
		proxy: &DelegatedProxy,
		proxy_address: Address,
		schema: B256,
		data: &RevocationRequestData,
		signature: &Signature,
		revoker: Address,
		deadline: u64,
	) -> Result<(), LedgerError> {
		self.check_deadline(deadline)?;
		let params = DelegatedProxyRevocationParams::new(revoker, schema, data, deadline);
		check_signature(
			proxy.revoke_type_schema(),
			proxy.domain(),
			&params,
			signature,
			revoker,
		)?;
		self.use_proxy_signature(signature)?;

		if self.proxy_attesters.get(&data.uid) != Some(&revoker) {
			return Err(LedgerError::AccessDenied(format!(
				"{} did not attest {} through the proxy",
				revoker, data.uid
			)));
		}
		self.revoke_attestation(schema, data.uid, proxy_address)
	}
}

#[async_trait]
impl LedgerInterface for MemoryLedger {
	async fn get_nonce(&self, account: Address) -> Result<U256, LedgerError> {
		let state = self.state.read().await;
		Ok(state.nonces.get(&account).copied().unwrap_or(U256::ZERO))
	}

	async fn get_attestation(&self, uid: Uid) -> Result<Option<Attestation>, LedgerError> {
		let state = self.state.read().await;
		Ok(state.attestations.get(&uid).cloned())
	}

	async fn is_attestation_valid(&self, uid: Uid) -> Result<bool, LedgerError> {
		let state = self.state.read().await;
		Ok(state.attestations.contains_key(&uid))
	}

	async fn is_attestation_revoked(&self, uid: Uid) -> Result<bool, LedgerError> {
		let state = self.state.read().await;
		Ok(state
			.attestations
			.get(&uid)
			.map(Attestation::is_revoked)
			.unwrap_or(false))
	}

	async fn get_domain_separator_inputs(&self) -> Result<DomainSeparatorInputs, LedgerError> {
		Ok(self.domain.clone())
	}

	async fn get_proxy_address(&self) -> Result<Option<Address>, LedgerError> {
		Ok(self.proxy.as_ref().map(|p| p.address))
	}

	async fn submit_attest(
		&self,
		request: &AttestationRequest,
		overrides: Option<FeeOverrides>,
	) -> Result<Uid, LedgerError> {
		let sender = self.sender;
		self.commit(overrides, |state| {
			state.insert_attestation(request.schema, &request.data, sender)
		})
		.await
	}

	async fn submit_multi_attest(
		&self,
		requests: &[MultiAttestationRequest],
		overrides: Option<FeeOverrides>,
	) -> Result<Vec<Uid>, LedgerError> {
		let sender = self.sender;
		self.commit(overrides, |state| {
			let mut uids = Vec::new();
			for request in requests {
				for data in &request.data {
					uids.push(state.insert_attestation(request.schema, data, sender)?);
				}
			}
			Ok(uids)
		})
		.await
	}

	async fn submit_attest_by_delegation(
		&self,
		request: &DelegatedAttestationRequest,
		overrides: Option<FeeOverrides>,
	) -> Result<Uid, LedgerError> {
		let registry = self.registry()?;
		self.commit(overrides, |state| {
			state.attest_by_delegation(
				&registry,
				request.schema,
				&request.data,
				&request.signature,
				request.attester,
				request.deadline,
			)
		})
		.await
	}

	async fn submit_multi_attest_by_delegation(
		&self,
		requests: &[MultiDelegatedAttestationRequest],
		overrides: Option<FeeOverrides>,
	) -> Result<Vec<Uid>, LedgerError> {
		let registry = self.registry()?;
		self.commit(overrides, |state| {
			let mut uids = Vec::new();
			for request in requests {
				check_lengths(request.data.len(), request.signatures.len())?;
				for (data, signature) in request.data.iter().zip(&request.signatures) {
					uids.push(state.attest_by_delegation(
						&registry,
						request.schema,
						data,
						signature,
						request.attester,
						request.deadline,
					)?);
				}
			}
			Ok(uids)
		})
		.await
	}

	async fn submit_attest_by_delegation_proxy(
		&self,
		request: &DelegatedAttestationRequest,
		overrides: Option<FeeOverrides>,
	) -> Result<Uid, LedgerError> {
		let (proxy, proxy_address) = self.delegation_proxy()?;
		self.commit(overrides, |state| {
			state.attest_by_delegation_proxy(
				&proxy,
				proxy_address,
				request.schema,
				&request.data,
				&request.signature,
				request.attester,
				request.deadline,
			)
		})
		.await
	}

	async fn submit_multi_attest_by_delegation_proxy(
		&self,
		requests: &[MultiDelegatedAttestationRequest],
		overrides: Option<FeeOverrides>,
	) -> Result<Vec<Uid>, LedgerError> {
		let (proxy, proxy_address) = self.delegation_proxy()?;
		self.commit(overrides, |state| {
			let mut uids = Vec::new();
			for request in requests {
				check_lengths(request.data.len(), request.signatures.len())?;
				for (data, signature) in request.data.iter().zip(&request.signatures) {
					uids.push(state.attest_by_delegation_proxy(
						&proxy,
						proxy_address,
						request.schema,
						data,
						signature,
						request.attester,
						request.deadline,
					)?);
				}
			}
			Ok(uids)
		})
		.await
	}

	async fn submit_revoke(
		&self,
		request: &RevocationRequest,
		overrides: Option<FeeOverrides>,
	) -> Result<(), LedgerError> {
		let sender = self.sender;
		self.commit(overrides, |state| {
			state.revoke_attestation(request.schema, request.data.uid, sender)
		})
		.await
	}

	async fn submit_multi_revoke(
		&self,
		requests: &[MultiRevocationRequest],
		overrides: Option<FeeOverrides>,
	) -> Result<(), LedgerError> {
		let sender = self.sender;
		self.commit(overrides, |state| {
			for request in requests {
				for data in &request.data {
					state.revoke_attestation(request.schema, data.uid, sender)?;
				}
			}
			Ok(())
		})
		.await
	}

	async fn submit_revoke_by_delegation(
		&self,
		request: &DelegatedRevocationRequest,
		overrides: Option<FeeOverrides>,
	) -> Result<(), LedgerError> {
		let registry = self.registry()?;
		self.commit(overrides, |state| {
			state.revoke_by_delegation(
				&registry,
				request.schema,
				&request.data,
				&request.signature,
				request.revoker,
				request.deadline,
			)
		})
		.await
	}

	async fn submit_multi_revoke_by_delegation(
		&self,
		requests: &[MultiDelegatedRevocationRequest],
		overrides: Option<FeeOverrides>,
	) -> Result<(), LedgerError> {
		let registry = self.registry()?;
		self.commit(overrides, |state| {
			for request in requests {
				check_lengths(request.data.len(), request.signatures.len())?;
				for (data, signature) in request.data.iter().zip(&request.signatures) {
					state.revoke_by_delegation(
						&registry,
						request.schema,
						data,
						signature,
						request.revoker,
						request.deadline,
					)?;
				}
			}
			Ok(())
		})
		.await
	}

	async fn submit_revoke_by_delegation_proxy(
		&self,
		request: &DelegatedRevocationRequest,
		overrides: Option<FeeOverrides>,
	) -> Result<(), LedgerError> {
		let (proxy, proxy_address) = self.delegation_proxy()?;
		self.commit(overrides, |state| {
			state.revoke_by_delegation_proxy(
				&proxy,
				proxy_address,
				request.schema,
				&request.data,
				&request.signature,
				request.revoker,
				request.deadline,
			)
		})
		.await
	}

	async fn submit_multi_revoke_by_delegation_proxy(
		&self,
		requests: &[MultiDelegatedRevocationRequest],
		overrides: Option<FeeOverrides>,
	) -> Result<(), LedgerError> {
		let (proxy, proxy_address) = self.delegation_proxy()?;
		self.commit(overrides, |state| {
			for request in requests {
				check_lengths(request.data.len(), request.signatures.len())?;
				for (data, signature) in request.data.iter().zip(&request.signatures) {
					state.revoke_by_delegation_proxy(
						&proxy,
						proxy_address,
						request.schema,
						data,
						signature,
						request.revoker,
						request.deadline,
					)?;
				}
			}
			Ok(())
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::Bytes;
	use attestor_account::implementations::local::LocalSigner;
	use attestor_types::{DEFAULT_PROXY_DOMAIN_NAME, REGISTRY_DOMAIN_NAME};

	const NOW: u64 = 1_700_000_000;

	fn proxy_address() -> Address {
		Address::repeat_byte(0x70)
	}

	fn schema() -> B256 {
		B256::repeat_byte(0xaa)
	}

	fn domain() -> DomainSeparatorInputs {
		DomainSeparatorInputs {
			chain_id: 11155111,
			verifying_contract: Address::repeat_byte(0xea),
			name: REGISTRY_DOMAIN_NAME.to_string(),
			version: "1.3.0".to_string(),
		}
	}

	async fn ledger() -> MemoryLedger {
		let ledger = MemoryLedger::new(domain(), Address::repeat_byte(0x5e)).with_proxy(
			ProxyDeployment {
				address: proxy_address(),
				name: DEFAULT_PROXY_DOMAIN_NAME.to_string(),
				version: "1.3.0".to_string(),
			},
		);
		ledger.set_time(NOW).await;
		ledger
	}

	fn data() -> AttestationRequestData {
		AttestationRequestData::new(Address::repeat_byte(0x11), Bytes::from_static(b"claim"))
	}

	async fn delegated_request(
		key: &LocalSigner,
		data: AttestationRequestData,
		nonce: u64,
		deadline: u64,
	) -> DelegatedAttestationRequest {
		let signed = Delegated::new(domain())
			.unwrap()
			.sign_delegated_attestation(
				DelegatedAttestationParams::new(
					key.address(),
					schema(),
					&data,
					U256::from(nonce),
					deadline,
				),
				key,
			)
			.await
			.unwrap();
		DelegatedAttestationRequest {
			schema: schema(),
			data,
			signature: signed.signature,
			attester: key.address(),
			deadline,
		}
	}

	async fn proxy_request(key: &LocalSigner, deadline: u64) -> DelegatedAttestationRequest {
		let proxy = DelegatedProxy::new(DomainSeparatorInputs {
			chain_id: 11155111,
			verifying_contract: proxy_address(),
			name: DEFAULT_PROXY_DOMAIN_NAME.to_string(),
			version: "1.3.0".to_string(),
		})
		.unwrap();
		let signed = proxy
			.sign_delegated_proxy_attestation(
				DelegatedProxyAttestationParams::new(key.address(), schema(), &data(), deadline),
				key,
			)
			.await
			.unwrap();
		DelegatedAttestationRequest {
			schema: schema(),
			data: data(),
			signature: signed.signature,
			attester: key.address(),
			deadline,
		}
	}

	#[tokio::test]
	async fn test_direct_attest_and_revoke() {
		let ledger = ledger().await;
		let request = AttestationRequest {
			schema: schema(),
			data: data(),
		};

		let uid = ledger.submit_attest(&request, None).await.unwrap();
		let stored = ledger.get_attestation(uid).await.unwrap().unwrap();
		assert_eq!(stored.attester, ledger.sender());
		assert_eq!(stored.time, NOW);
		assert!(ledger.is_attestation_valid(uid).await.unwrap());
		assert!(!ledger.is_attestation_revoked(uid).await.unwrap());

		let revoke = RevocationRequest {
			schema: schema(),
			data: RevocationRequestData::new(uid),
		};
		ledger.submit_revoke(&revoke, None).await.unwrap();
		assert!(ledger.is_attestation_revoked(uid).await.unwrap());
		assert!(matches!(
			ledger.submit_revoke(&revoke, None).await,
			Err(LedgerError::AlreadyRevoked(_))
		));
	}

	#[tokio::test]
	async fn test_identical_attestations_are_bumped() {
		let ledger = ledger().await;
		let request = AttestationRequest {
			schema: schema(),
			data: data(),
		};

		let first = ledger.submit_attest(&request, None).await.unwrap();
		let second = ledger.submit_attest(&request, None).await.unwrap();
		assert_ne!(first, second);
		assert_eq!(
			first,
			derive_uid(
				UidVersion::Onchain,
				&UidFields::new(schema(), data().recipient, NOW, data().data)
					.with_attester(ledger.sender())
			)
		);
		assert_eq!(
			second,
			derive_uid(
				UidVersion::Onchain,
				&UidFields::new(schema(), data().recipient, NOW, data().data)
					.with_attester(ledger.sender())
					.with_bump(1)
			)
		);
	}

	#[tokio::test]
	async fn test_revocation_rules() {
		let ledger = ledger().await;
		let irrevocable = ledger
			.submit_attest(
				&AttestationRequest {
					schema: schema(),
					data: data().with_revocable(false),
				},
				None,
			)
			.await
			.unwrap();
		let result = ledger
			.submit_revoke(
				&RevocationRequest {
					schema: schema(),
					data: RevocationRequestData::new(irrevocable),
				},
				None,
			)
			.await;
		assert!(matches!(result, Err(LedgerError::Irrevocable(_))));

		let result = ledger
			.submit_revoke(
				&RevocationRequest {
					schema: schema(),
					data: RevocationRequestData::new(B256::repeat_byte(0x01)),
				},
				None,
			)
			.await;
		assert!(matches!(result, Err(LedgerError::NotFound(_))));

		let missing_ref = ledger
			.submit_attest(
				&AttestationRequest {
					schema: schema(),
					data: data().with_ref_uid(B256::repeat_byte(0x02)),
				},
				None,
			)
			.await;
		assert!(matches!(missing_ref, Err(LedgerError::NotFound(_))));
	}

	#[tokio::test]
	async fn test_delegated_attest_consumes_nonce() {
		let ledger = ledger().await;
		let key = LocalSigner::random();

		let request = delegated_request(&key, data(), 0, 0).await;
		let uid = ledger
			.submit_attest_by_delegation(&request, None)
			.await
			.unwrap();
		assert_eq!(
			ledger.get_attestation(uid).await.unwrap().unwrap().attester,
			key.address()
		);
		assert_eq!(ledger.get_nonce(key.address()).await.unwrap(), U256::from(1));

		// Replaying the same signature now meets nonce 1.
		let replay = ledger.submit_attest_by_delegation(&request, None).await;
		assert!(matches!(replay, Err(LedgerError::InvalidSignature(_))));
		assert_eq!(ledger.get_nonce(key.address()).await.unwrap(), U256::from(1));
	}

	#[tokio::test]
	async fn test_delegated_deadline_is_enforced() {
		let ledger = ledger().await;
		let key = LocalSigner::random();

		let request = delegated_request(&key, data(), 0, NOW - 1).await;
		let result = ledger.submit_attest_by_delegation(&request, None).await;
		assert!(matches!(result, Err(LedgerError::DeadlineExpired { .. })));

		let request = delegated_request(&key, data(), 0, NOW).await;
		assert!(ledger.submit_attest_by_delegation(&request, None).await.is_ok());
	}

	#[tokio::test]
	async fn test_multi_delegated_batch_is_atomic() {
		let ledger = ledger().await;
		let key = LocalSigner::random();

		let first = delegated_request(&key, data(), 0, 0).await;
		let second = delegated_request(&key, data().with_expiration_time(NOW + 10), 1, 0).await;

		// Out of order: the first item meets nonce 0 with a nonce-1 signature.
		let reversed = MultiDelegatedAttestationRequest {
			schema: schema(),
			data: vec![second.data.clone(), first.data.clone()],
			signatures: vec![second.signature, first.signature],
			attester: key.address(),
			deadline: 0,
		};
		assert!(ledger
			.submit_multi_attest_by_delegation(&[reversed], None)
			.await
			.is_err());
		assert_eq!(ledger.get_nonce(key.address()).await.unwrap(), U256::ZERO);

		let ordered = MultiDelegatedAttestationRequest {
			schema: schema(),
			data: vec![first.data.clone(), second.data.clone()],
			signatures: vec![first.signature, second.signature],
			attester: key.address(),
			deadline: 0,
		};
		let uids = ledger
			.submit_multi_attest_by_delegation(&[ordered], None)
			.await
			.unwrap();
		assert_eq!(uids.len(), 2);
		assert_eq!(ledger.get_nonce(key.address()).await.unwrap(), U256::from(2));
	}

	#[tokio::test]
	async fn test_delegated_revocation_by_attester() {
		let ledger = ledger().await;
		let key = LocalSigner::random();
		let uid = ledger
			.submit_attest_by_delegation(&delegated_request(&key, data(), 0, 0).await, None)
			.await
			.unwrap();

		let revocation = RevocationRequestData::new(uid);
		let signed = Delegated::new(domain())
			.unwrap()
			.sign_delegated_revocation(
				DelegatedRevocationParams::new(
					key.address(),
					schema(),
					&revocation,
					U256::from(1),
					0,
				),
				&key,
			)
			.await
			.unwrap();
		ledger
			.submit_revoke_by_delegation(
				&DelegatedRevocationRequest {
					schema: schema(),
					data: revocation,
					signature: signed.signature,
					revoker: key.address(),
					deadline: 0,
				},
				None,
			)
			.await
			.unwrap();
		assert!(ledger.is_attestation_revoked(uid).await.unwrap());
	}

	#[tokio::test]
	async fn test_proxy_attest_and_replay() {
		let ledger = ledger().await;
		let key = LocalSigner::random();
		let request = proxy_request(&key, NOW + 60).await;

		let uid = ledger
			.submit_attest_by_delegation_proxy(&request, None)
			.await
			.unwrap();
		assert_eq!(
			ledger.get_attestation(uid).await.unwrap().unwrap().attester,
			proxy_address()
		);
		assert_eq!(ledger.get_nonce(key.address()).await.unwrap(), U256::ZERO);

		let replay = ledger.submit_attest_by_delegation_proxy(&request, None).await;
		assert!(matches!(replay, Err(LedgerError::InvalidSignature(_))));

		ledger.set_time(NOW + 61).await;
		let late = proxy_request(&key, NOW + 60).await;
		assert!(matches!(
			ledger.submit_attest_by_delegation_proxy(&late, None).await,
			Err(LedgerError::DeadlineExpired { .. })
		));
	}

	#[tokio::test]
	async fn test_proxy_not_configured() {
		let ledger = MemoryLedger::new(domain(), Address::repeat_byte(0x5e));
		let key = LocalSigner::random();
		assert_eq!(ledger.get_proxy_address().await.unwrap(), None);

		let request = proxy_request(&key, 0).await;
		assert!(matches!(
			ledger.submit_attest_by_delegation_proxy(&request, None).await,
			Err(LedgerError::ProxyNotConfigured)
		));
	}

	#[tokio::test]
	async fn test_fee_overrides_are_recorded() {
		let ledger = ledger().await;
		let request = AttestationRequest {
			schema: schema(),
			data: data(),
		};
		let fees = FeeOverrides {
			max_priority_fee_per_gas: 1,
			max_fee_per_gas: 2,
		};

		ledger.submit_attest(&request, Some(fees)).await.unwrap();
		ledger.submit_attest(&request, None).await.unwrap();
		assert_eq!(ledger.submitted_overrides().await, vec![Some(fees), None]);
	}
}
