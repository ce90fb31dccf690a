//! Request orchestration for the attestor system.
//!
//! The orchestrator takes a request and a signature style, has the matching
//! signer produce whatever signature the style needs, and forwards the result
//! to the ledger. Every outcome is normalized to a [`SubmissionOutcome`].
//! No state is shared between requests: a batch's locally tracked nonce lives
//! only for the duration of that batch.

use attestor_account::AccountError;
use attestor_ledger::LedgerError;
use attestor_signing::{OffchainAttestationParams, SignedOffchainAttestation, SigningError};
use attestor_types::{
	AttestationRequest, MultiAttestationRequest, MultiRevocationRequest, RevocationRequest, Uid,
};
use thiserror::Error;

pub mod builder;
pub mod engine;

pub use builder::{AttestorBuilder, BuilderError};
pub use engine::Orchestrator;

/// Errors that can occur while orchestrating a request.
#[derive(Debug, Error)]
pub enum OrchestratorError {
	/// A collaborator required by the requested flow is missing.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// The requested operation is deliberately not supported.
	#[error("Unsupported operation: {0}")]
	UnsupportedOperation(String),
	/// Producing a signature failed.
	#[error("Signing error: {0}")]
	Signing(SigningError),
	/// The ledger rejected or failed a call. Never retried.
	#[error("Ledger error: {0}")]
	Ledger(#[from] LedgerError),
}

impl From<SigningError> for OrchestratorError {
	fn from(err: SigningError) -> Self {
		match err {
			SigningError::UnsupportedOperation(message) => {
				OrchestratorError::UnsupportedOperation(message)
			},
			other => OrchestratorError::Signing(other),
		}
	}
}

impl From<AccountError> for OrchestratorError {
	fn from(err: AccountError) -> Self {
		OrchestratorError::Signing(SigningError::Signer(err))
	}
}

/// A single attestation in one of the four signature styles.
#[derive(Debug, Clone)]
pub enum AttestationCall {
	/// Submitted and signed by the ledger sender itself.
	Direct(AttestationRequest),
	/// Signed by the key-holder against its current nonce and relayed.
	Delegated {
		request: AttestationRequest,
		deadline: u64,
	},
	/// Signed by the key-holder under the proxy's domain and relayed through it.
	DelegatedProxy {
		request: AttestationRequest,
		deadline: u64,
	},
	/// Signed by the key-holder and never submitted.
	Offchain(OffchainAttestationParams),
}

/// A batch of attestations in one signature style.
#[derive(Debug, Clone)]
pub enum MultiAttestationCall {
	Direct(Vec<MultiAttestationRequest>),
	Delegated {
		requests: Vec<MultiAttestationRequest>,
		deadline: u64,
	},
	DelegatedProxy {
		requests: Vec<MultiAttestationRequest>,
		deadline: u64,
	},
	/// Always rejected.
	Offchain(Vec<OffchainAttestationParams>),
}

/// A single revocation. Offchain attestations have no revocation here.
#[derive(Debug, Clone)]
pub enum RevocationCall {
	Direct(RevocationRequest),
	Delegated {
		request: RevocationRequest,
		deadline: u64,
	},
	DelegatedProxy {
		request: RevocationRequest,
		deadline: u64,
	},
}

/// A batch of revocations in one signature style.
#[derive(Debug, Clone)]
pub enum MultiRevocationCall {
	Direct(Vec<MultiRevocationRequest>),
	Delegated {
		requests: Vec<MultiRevocationRequest>,
		deadline: u64,
	},
	DelegatedProxy {
		requests: Vec<MultiRevocationRequest>,
		deadline: u64,
	},
}

/// The normalized result of an orchestrated request.
///
/// Revocations report the UIDs they revoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
	Uid(Uid),
	Uids(Vec<Uid>),
	Offchain(Box<SignedOffchainAttestation>),
}

impl SubmissionOutcome {
	/// All identifiers carried by the outcome, in request order.
	pub fn uids(&self) -> Vec<Uid> {
		match self {
			SubmissionOutcome::Uid(uid) => vec![*uid],
			SubmissionOutcome::Uids(uids) => uids.clone(),
			SubmissionOutcome::Offchain(signed) => vec![signed.uid],
		}
	}
}
