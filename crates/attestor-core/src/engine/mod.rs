//! The request orchestrator.

use crate::{
	AttestationCall, MultiAttestationCall, MultiRevocationCall, OrchestratorError, RevocationCall,
	SubmissionOutcome,
};
use alloy_primitives::{Address, U256};
use attestor_account::SignerInterface;
use attestor_ledger::LedgerInterface;
use attestor_signing::{
	Delegated, DelegatedAttestationParams, DelegatedProxy, DelegatedProxyAttestationParams,
	DelegatedProxyRevocationParams, DelegatedRevocationParams, Offchain,
	OffchainAttestationPackage, OffchainAttestationVersion, OffchainConfig,
};
use attestor_types::{
	truncate_id, Attestation, DelegatedAttestationRequest, DelegatedRevocationRequest,
	DomainSeparatorInputs, FeeOverrides, MultiDelegatedAttestationRequest,
	MultiDelegatedRevocationRequest, ProxySettings, RevocationRequest, RevocationRequestData,
	TransactionOverrides, Uid,
};
use std::sync::Arc;

/// Dispatches requests to the matching signer and forwards them to the ledger.
///
/// The signer is the key-holder for every non-direct style: it is the
/// attester of delegated and offchain attestations and the revoker of
/// delegated revocations.
pub struct Orchestrator {
	ledger: Arc<dyn LedgerInterface>,
	signer: Arc<dyn SignerInterface>,
	proxy: Option<ProxySettings>,
	offchain_version: OffchainAttestationVersion,
}

/// Drops partial fee overrides, logging the drop.
fn fee_overrides(overrides: &TransactionOverrides) -> Option<FeeOverrides> {
	if overrides.is_partial() {
		tracing::warn!(
			max_priority_fee_per_gas = ?overrides.max_priority_fee_per_gas,
			max_fee_per_gas = ?overrides.max_fee_per_gas,
			"Ignoring partial fee overrides; both values are required"
		);
	}
	overrides.resolve()
}

impl Orchestrator {
	pub fn new(
		ledger: Arc<dyn LedgerInterface>,
		signer: Arc<dyn SignerInterface>,
		proxy: Option<ProxySettings>,
		offchain_version: OffchainAttestationVersion,
	) -> Self {
		Self {
			ledger,
			signer,
			proxy,
			offchain_version,
		}
	}

	pub async fn get_nonce(&self, account: Address) -> Result<U256, OrchestratorError> {
		Ok(self.ledger.get_nonce(account).await?)
	}

	pub async fn get_attestation(&self, uid: Uid) -> Result<Option<Attestation>, OrchestratorError> {
		Ok(self.ledger.get_attestation(uid).await?)
	}

	pub async fn is_attestation_valid(&self, uid: Uid) -> Result<bool, OrchestratorError> {
		Ok(self.ledger.is_attestation_valid(uid).await?)
	}

	pub async fn is_attestation_revoked(&self, uid: Uid) -> Result<bool, OrchestratorError> {
		Ok(self.ledger.is_attestation_revoked(uid).await?)
	}

	/// Signer for requests bound to the registry's domain.
	pub async fn delegated(&self) -> Result<Delegated, OrchestratorError> {
		let inputs = self.ledger.get_domain_separator_inputs().await?;
		Ok(Delegated::new(inputs)?)
	}

	/// Signer for requests relayed through the proxy.
	///
	/// Fails with a configuration error when no proxy is configured or the
	/// ledger reports none, before anything is signed.
	pub async fn delegated_proxy(&self) -> Result<DelegatedProxy, OrchestratorError> {
		let settings = self.proxy.as_ref().ok_or_else(|| {
			OrchestratorError::Configuration("no delegation proxy configured".into())
		})?;
		let address = self.ledger.get_proxy_address().await?.ok_or_else(|| {
			OrchestratorError::Configuration(
				"the ledger reports no delegation proxy for this chain".into(),
			)
		})?;
		let registry = self.ledger.get_domain_separator_inputs().await?;

		Ok(DelegatedProxy::new(DomainSeparatorInputs {
			chain_id: registry.chain_id,
			verifying_contract: address,
			name: settings.name.clone(),
			version: settings.version.clone(),
		})?)
	}

	/// Signer and verifier for offchain attestations of this registry.
	pub async fn offchain(&self) -> Result<Offchain, OrchestratorError> {
		let inputs = self.ledger.get_domain_separator_inputs().await?;
		let config = OffchainConfig {
			address: inputs.verifying_contract,
			version: inputs.version,
			chain_id: inputs.chain_id,
		};
		Ok(Offchain::new(&config, self.offchain_version))
	}

	/// Verifies a retained offchain attestation against this registry.
	pub async fn verify_offchain_attestation(
		&self,
		package: &OffchainAttestationPackage,
	) -> Result<bool, OrchestratorError> {
		Ok(package.verify(&self.offchain().await?))
	}

	pub async fn attest(
		&self,
		call: AttestationCall,
		overrides: TransactionOverrides,
	) -> Result<SubmissionOutcome, OrchestratorError> {
		let fees = fee_overrides(&overrides);

		let uid = match call {
			AttestationCall::Direct(request) => self.ledger.submit_attest(&request, fees).await?,
			AttestationCall::Delegated { request, deadline } => {
				let delegated = self.delegated().await?;
				let attester = self.signer.address().await?;
				let nonce = self.ledger.get_nonce(attester).await?;

				let params = DelegatedAttestationParams::new(
					attester,
					request.schema,
					&request.data,
					nonce,
					deadline,
				);
				let signed = delegated
					.sign_delegated_attestation(params, self.signer.as_ref())
					.await?;

				let relayed = DelegatedAttestationRequest {
					schema: request.schema,
					data: request.data,
					signature: signed.signature,
					attester,
					deadline,
				};
				self.ledger
					.submit_attest_by_delegation(&relayed, fees)
					.await?
			},
			AttestationCall::DelegatedProxy { request, deadline } => {
				let proxy = self.delegated_proxy().await?;
				let attester = self.signer.address().await?;

				let params = DelegatedProxyAttestationParams::new(
					attester,
					request.schema,
					&request.data,
					deadline,
				);
				let signed = proxy
					.sign_delegated_proxy_attestation(params, self.signer.as_ref())
					.await?;

				let relayed = DelegatedAttestationRequest {
					schema: request.schema,
					data: request.data,
					signature: signed.signature,
					attester,
					deadline,
				};
				self.ledger
					.submit_attest_by_delegation_proxy(&relayed, fees)
					.await?
			},
			AttestationCall::Offchain(params) => {
				let offchain = self.offchain().await?;
				let signed = offchain
					.sign_offchain_attestation(&params, self.signer.as_ref())
					.await?;
				tracing::info!(uid = %truncate_id(&signed.uid.to_string()), "Signed offchain attestation");
				return Ok(SubmissionOutcome::Offchain(Box::new(signed)));
			},
		};

		tracing::info!(uid = %truncate_id(&uid.to_string()), "Attestation submitted");
		Ok(SubmissionOutcome::Uid(uid))
	}

	/// Submits a batch of attestations.
	///
	/// Delegated batches fetch the signer's nonce once and sign item `i` with
	/// nonce `n + i` in request order. Nothing reaches the ledger until every
	/// item is signed.
	pub async fn multi_attest(
		&self,
		call: MultiAttestationCall,
		overrides: TransactionOverrides,
	) -> Result<SubmissionOutcome, OrchestratorError> {
		let fees = fee_overrides(&overrides);

		let uids = match call {
			MultiAttestationCall::Offchain(params) => {
				return Err(OrchestratorError::UnsupportedOperation(format!(
					"batched offchain attestation ({} requests); sign each attestation individually",
					params.len()
				)));
			},
			MultiAttestationCall::Direct(requests) => {
				self.ledger.submit_multi_attest(&requests, fees).await?
			},
			MultiAttestationCall::Delegated { requests, deadline } => {
				let delegated = self.delegated().await?;
				let attester = self.signer.address().await?;
				let mut nonce = self.ledger.get_nonce(attester).await?;

				let mut relayed = Vec::with_capacity(requests.len());
				for request in requests {
					let mut signatures = Vec::with_capacity(request.data.len());
					for data in &request.data {
						let params = DelegatedAttestationParams::new(
							attester,
							request.schema,
							data,
							nonce,
							deadline,
						);
						let signed = delegated
							.sign_delegated_attestation(params, self.signer.as_ref())
							.await?;
						signatures.push(signed.signature);
						nonce += U256::from(1);
					}
					relayed.push(MultiDelegatedAttestationRequest {
						schema: request.schema,
						data: request.data,
						signatures,
						attester,
						deadline,
					});
				}
				self.ledger
					.submit_multi_attest_by_delegation(&relayed, fees)
					.await?
			},
			MultiAttestationCall::DelegatedProxy { requests, deadline } => {
				let proxy = self.delegated_proxy().await?;
				let attester = self.signer.address().await?;

				let mut relayed = Vec::with_capacity(requests.len());
				for request in requests {
					let mut signatures = Vec::with_capacity(request.data.len());
					for data in &request.data {
						let params = DelegatedProxyAttestationParams::new(
							attester,
							request.schema,
							data,
							deadline,
						);
						let signed = proxy
							.sign_delegated_proxy_attestation(params, self.signer.as_ref())
							.await?;
						signatures.push(signed.signature);
					}
					relayed.push(MultiDelegatedAttestationRequest {
						schema: request.schema,
						data: request.data,
						signatures,
						attester,
						deadline,
					});
				}
				self.ledger
					.submit_multi_attest_by_delegation_proxy(&relayed, fees)
					.await?
			},
		};

		tracing::info!(count = uids.len(), "Attestations submitted");
		Ok(SubmissionOutcome::Uids(uids))
	}

	pub async fn revoke(
		&self,
		call: RevocationCall,
		overrides: TransactionOverrides,
	) -> Result<SubmissionOutcome, OrchestratorError> {
		let fees = fee_overrides(&overrides);

		let uid = match call {
			RevocationCall::Direct(request) => {
				self.ledger.submit_revoke(&request, fees).await?;
				request.data.uid
			},
			RevocationCall::Delegated { request, deadline } => {
				let delegated = self.delegated().await?;
				let relayed = self.sign_revocation(&delegated, request, deadline).await?;
				self.ledger
					.submit_revoke_by_delegation(&relayed, fees)
					.await?;
				relayed.data.uid
			},
			RevocationCall::DelegatedProxy { request, deadline } => {
				let proxy = self.delegated_proxy().await?;
				let revoker = self.signer.address().await?;
				let params = DelegatedProxyRevocationParams::new(
					revoker,
					request.schema,
					&request.data,
					deadline,
				);
				let signed = proxy
					.sign_delegated_proxy_revocation(params, self.signer.as_ref())
					.await?;

				let relayed = DelegatedRevocationRequest {
					schema: request.schema,
					data: request.data,
					signature: signed.signature,
					revoker,
					deadline,
				};
				self.ledger
					.submit_revoke_by_delegation_proxy(&relayed, fees)
					.await?;
				relayed.data.uid
			},
		};

		tracing::info!(uid = %truncate_id(&uid.to_string()), "Revocation submitted");
		Ok(SubmissionOutcome::Uid(uid))
	}

	async fn sign_revocation(
		&self,
		delegated: &Delegated,
		request: RevocationRequest,
		deadline: u64,
	) -> Result<DelegatedRevocationRequest, OrchestratorError> {
		let revoker = self.signer.address().await?;
		let nonce = self.ledger.get_nonce(revoker).await?;
		let params =
			DelegatedRevocationParams::new(revoker, request.schema, &request.data, nonce, deadline);
		let signed = delegated
			.sign_delegated_revocation(params, self.signer.as_ref())
			.await?;
		Ok(DelegatedRevocationRequest {
			schema: request.schema,
			data: request.data,
			signature: signed.signature,
			revoker,
			deadline,
		})
	}

	/// Submits a batch of revocations; delegated batches sequence nonces as
	/// [`Orchestrator::multi_attest`] does.
	pub async fn multi_revoke(
		&self,
		call: MultiRevocationCall,
		overrides: TransactionOverrides,
	) -> Result<SubmissionOutcome, OrchestratorError> {
		let fees = fee_overrides(&overrides);

		let uids = match call {
			MultiRevocationCall::Direct(requests) => {
				self.ledger.submit_multi_revoke(&requests, fees).await?;
				revoked_uids(requests.iter().map(|r| &r.data))
			},
			MultiRevocationCall::Delegated { requests, deadline } => {
				let delegated = self.delegated().await?;
				let revoker = self.signer.address().await?;
				let mut nonce = self.ledger.get_nonce(revoker).await?;

				let mut relayed = Vec::with_capacity(requests.len());
				for request in requests {
					let mut signatures = Vec::with_capacity(request.data.len());
					for data in &request.data {
						let params = DelegatedRevocationParams::new(
							revoker,
							request.schema,
							data,
							nonce,
							deadline,
						);
						let signed = delegated
							.sign_delegated_revocation(params, self.signer.as_ref())
							.await?;
						signatures.push(signed.signature);
						nonce += U256::from(1);
					}
					relayed.push(MultiDelegatedRevocationRequest {
						schema: request.schema,
						data: request.data,
						signatures,
						revoker,
						deadline,
					});
				}
				self.ledger
					.submit_multi_revoke_by_delegation(&relayed, fees)
					.await?;
				revoked_uids(relayed.iter().map(|r| &r.data))
			},
			MultiRevocationCall::DelegatedProxy { requests, deadline } => {
				let proxy = self.delegated_proxy().await?;
				let revoker = self.signer.address().await?;

				let mut relayed = Vec::with_capacity(requests.len());
				for request in requests {
					let mut signatures = Vec::with_capacity(request.data.len());
					for data in &request.data {
						let params = DelegatedProxyRevocationParams::new(
							revoker,
							request.schema,
							data,
							deadline,
						);
						let signed = proxy
							.sign_delegated_proxy_revocation(params, self.signer.as_ref())
							.await?;
						signatures.push(signed.signature);
					}
					relayed.push(MultiDelegatedRevocationRequest {
						schema: request.schema,
						data: request.data,
						signatures,
						revoker,
						deadline,
					});
				}
				self.ledger
					.submit_multi_revoke_by_delegation_proxy(&relayed, fees)
					.await?;
				revoked_uids(relayed.iter().map(|r| &r.data))
			},
		};

		tracing::info!(count = uids.len(), "Revocations submitted");
		Ok(SubmissionOutcome::Uids(uids))
	}
}

fn revoked_uids<'a>(
	batches: impl Iterator<Item = &'a Vec<RevocationRequestData>>,
) -> Vec<Uid> {
	batches.flatten().map(|data| data.uid).collect()
}
