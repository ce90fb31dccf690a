//! Builder pattern for constructing the orchestrator.
//!
//! Composes an [`Orchestrator`] from configuration, a set of named signer
//! factories and a ledger. Only the primary account implementation is built.

use crate::engine::Orchestrator;
use attestor_account::{AccountError, SignerInterface};
use attestor_config::Config;
use attestor_ledger::implementations::memory::{MemoryLedger, ProxyDeployment};
use attestor_ledger::LedgerInterface;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during orchestrator construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Builder for constructing an [`Orchestrator`] with a pluggable key-holder.
pub struct AttestorBuilder {
	config: Config,
}

impl AttestorBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Creates the primary key-holder from its factory.
	pub fn build_signer<AF>(
		&self,
		factories: &HashMap<String, AF>,
	) -> Result<Arc<dyn SignerInterface>, BuilderError>
	where
		AF: Fn(&toml::Value) -> Result<Box<dyn SignerInterface>, AccountError>,
	{
		let primary = &self.config.account.primary;
		let factory = factories.get(primary).ok_or_else(|| {
			BuilderError::MissingComponent(format!(
				"No account implementation named '{}'",
				primary
			))
		})?;
		let config = self
			.config
			.primary_account()
			.map_err(|e| BuilderError::Config(e.to_string()))?;

		match factory(config) {
			Ok(implementation) => {
				tracing::info!(component = "account", implementation = %primary, enabled = true, "Loaded");
				Ok(Arc::from(implementation))
			},
			Err(e) => {
				tracing::error!(
					component = "account",
					implementation = %primary,
					error = %e,
					"Failed to create account implementation"
				);
				Err(BuilderError::Config(format!(
					"Failed to create account implementation '{}': {}",
					primary, e
				)))
			},
		}
	}

	/// Creates an in-memory ledger for the configured registry and proxy,
	/// submitting as `sender`.
	pub fn memory_ledger(
		&self,
		sender: alloy_primitives::Address,
	) -> Result<MemoryLedger, BuilderError> {
		let domain = self
			.config
			.domain_separator_inputs()
			.map_err(|e| BuilderError::Config(e.to_string()))?;
		let network = self
			.config
			.network()
			.map_err(|e| BuilderError::Config(e.to_string()))?;

		let mut ledger = MemoryLedger::new(domain, sender);
		if let Some(proxy) = &network.proxy {
			ledger = ledger.with_proxy(ProxyDeployment {
				address: proxy.address,
				name: proxy.name.clone(),
				version: proxy.version.clone(),
			});
		}
		tracing::info!(component = "ledger", implementation = "memory", chain_id = self.config.service.chain_id, "Loaded");
		Ok(ledger)
	}

	/// Builds the orchestrator around `signer` and `ledger`.
	pub fn build(
		self,
		signer: Arc<dyn SignerInterface>,
		ledger: Arc<dyn LedgerInterface>,
	) -> Result<Orchestrator, BuilderError> {
		let proxy = self
			.config
			.proxy_settings()
			.map_err(|e| BuilderError::Config(e.to_string()))?;
		let offchain_version = self
			.config
			.offchain_version()
			.map_err(|e| BuilderError::Config(e.to_string()))?;

		Ok(Orchestrator::new(ledger, signer, proxy, offchain_version))
	}
}
