//! Configuration module for the attestor system.
//!
//! This module provides structures and utilities for managing attestor configuration.
//! It supports loading configuration from TOML files and provides validation to ensure
//! all required configuration values are properly set.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files for better organization:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)
//! - Included files may include further files; include cycles are rejected

mod loader;

use alloy_primitives::Address;
use attestor_signing::{OffchainAttestationVersion, OffchainConfig, ProtocolVersion};
use attestor_types::{
	DomainSeparatorInputs, ProxySettings, SecretString, TransactionOverrides,
	DEFAULT_PROXY_DOMAIN_NAME, REGISTRY_DOMAIN_NAME,
};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub use loader::ConfigLoader;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the attestor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this attestor instance and the chain it works on.
	pub service: ServiceConfig,
	/// Registry deployments keyed by chain ID.
	#[serde(deserialize_with = "deserialize_networks")]
	pub networks: HashMap<u64, NetworkConfig>,
	/// Configuration for the key-holder.
	pub account: AccountConfig,
	/// Offchain attestation settings.
	#[serde(default)]
	pub offchain: OffchainSettings,
	/// Fee overrides forwarded with every submission.
	#[serde(default)]
	pub transaction: TransactionOverrides,
}

/// Configuration specific to the attestor instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this attestor instance.
	pub id: String,
	/// Chain whose registry this instance signs for. Must be a key of `networks`.
	pub chain_id: u64,
}

/// A registry deployment on one chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// Address of the attestation registry.
	pub eas_address: Address,
	/// Version string reported by the registry, e.g. `1.3.0`.
	pub eas_version: String,
	/// Domain name of the registry.
	#[serde(default = "default_eas_name")]
	pub eas_name: String,
	/// Delegation proxy deployed next to the registry, if any.
	pub proxy: Option<ProxyConfig>,
}

fn default_eas_name() -> String {
	REGISTRY_DOMAIN_NAME.to_string()
}

/// A delegation proxy deployment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
	pub address: Address,
	#[serde(default = "default_proxy_name")]
	pub name: String,
	pub version: String,
}

fn default_proxy_name() -> String {
	DEFAULT_PROXY_DOMAIN_NAME.to_string()
}

/// Configuration for account management.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of account implementation names to their configurations.
	pub implementations: HashMap<String, AccountImplementationConfig>,
}

/// Table fields that carry key material.
const SECRET_FIELDS: &[&str] = &["private_key"];

/// Configuration table of one account implementation.
///
/// Key material in the table never shows up in debug or serialized output.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct AccountImplementationConfig(toml::Value);

impl AccountImplementationConfig {
	pub fn new(value: toml::Value) -> Self {
		Self(value)
	}

	/// The raw table handed to the account factory.
	pub fn as_value(&self) -> &toml::Value {
		&self.0
	}

	fn redacted(&self) -> toml::Value {
		let Some(table) = self.0.as_table() else {
			return self.0.clone();
		};
		let redacted = table
			.iter()
			.map(|(name, value)| {
				let value = match value.as_str() {
					Some(secret) if SECRET_FIELDS.contains(&name.as_str()) => {
						toml::Value::String(SecretString::from(secret).to_string())
					},
					_ => value.clone(),
				};
				(name.clone(), value)
			})
			.collect();
		toml::Value::Table(redacted)
	}
}

impl fmt::Debug for AccountImplementationConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("AccountImplementationConfig")
			.field(&self.redacted())
			.finish()
	}
}

impl Serialize for AccountImplementationConfig {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		self.redacted().serialize(serializer)
	}
}

/// Offchain attestation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OffchainSettings {
	/// Layout version of produced offchain attestations.
	/// Defaults to the latest version (2) if not specified.
	#[serde(default = "default_offchain_version")]
	pub version: u16,
}

impl Default for OffchainSettings {
	fn default() -> Self {
		Self {
			version: default_offchain_version(),
		}
	}
}

fn default_offchain_version() -> u16 {
	OffchainAttestationVersion::LATEST.as_u16()
}

/// Deserializes the networks table, whose TOML keys are chain IDs.
fn deserialize_networks<'de, D>(deserializer: D) -> Result<HashMap<u64, NetworkConfig>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = HashMap::<String, NetworkConfig>::deserialize(deserializer)?;
	raw.into_iter()
		.map(|(key, network)| {
			key.parse::<u64>()
				.map(|chain_id| (chain_id, network))
				.map_err(|_| serde::de::Error::custom(format!("Invalid chain ID '{}'", key)))
		})
		.collect()
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file with async environment variable resolution.
	///
	/// Each top-level section must be unique across all configuration files.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// The network entry of `service.chain_id`.
	pub fn network(&self) -> Result<&NetworkConfig, ConfigError> {
		self.networks.get(&self.service.chain_id).ok_or_else(|| {
			ConfigError::Validation(format!(
				"Service chain {} not found in networks",
				self.service.chain_id
			))
		})
	}

	/// Domain separator inputs of the configured registry.
	pub fn domain_separator_inputs(&self) -> Result<DomainSeparatorInputs, ConfigError> {
		let network = self.network()?;
		Ok(DomainSeparatorInputs {
			chain_id: self.service.chain_id,
			verifying_contract: network.eas_address,
			name: network.eas_name.clone(),
			version: network.eas_version.clone(),
		})
	}

	/// Inputs for offchain signing against the configured registry.
	pub fn offchain_config(&self) -> Result<OffchainConfig, ConfigError> {
		let network = self.network()?;
		Ok(OffchainConfig {
			address: network.eas_address,
			version: network.eas_version.clone(),
			chain_id: self.service.chain_id,
		})
	}

	/// Domain name and version of the configured proxy, if any.
	pub fn proxy_settings(&self) -> Result<Option<ProxySettings>, ConfigError> {
		Ok(self.network()?.proxy.as_ref().map(|proxy| ProxySettings {
			name: proxy.name.clone(),
			version: proxy.version.clone(),
		}))
	}

	pub fn offchain_version(&self) -> Result<OffchainAttestationVersion, ConfigError> {
		OffchainAttestationVersion::try_from(self.offchain.version)
			.map_err(|e| ConfigError::Validation(e.to_string()))
	}

	/// Configuration table of the primary account implementation.
	pub fn primary_account(&self) -> Result<&toml::Value, ConfigError> {
		self.account
			.implementations
			.get(&self.account.primary)
			.map(AccountImplementationConfig::as_value)
			.ok_or_else(|| {
				ConfigError::Validation(format!(
					"Primary account '{}' not found in implementations",
					self.account.primary
				))
			})
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// - Ensures the service ID is not empty and its chain is configured
	/// - Checks every registry address and version
	/// - Checks any configured proxy name and version
	/// - Validates the offchain attestation version
	/// - Verifies the primary account implementation exists
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.networks.is_empty() {
			return Err(ConfigError::Validation(
				"Networks configuration cannot be empty".into(),
			));
		}
		self.network()?;

		for (chain_id, network) in &self.networks {
			if network.eas_address == Address::ZERO {
				return Err(ConfigError::Validation(format!(
					"Network {} must have a non-zero eas_address",
					chain_id
				)));
			}
			if network.eas_name.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Network {} eas_name cannot be empty",
					chain_id
				)));
			}
			ProtocolVersion::from_contract_version(&network.eas_version).map_err(|e| {
				ConfigError::Validation(format!("Network {}: {}", chain_id, e))
			})?;

			if let Some(proxy) = &network.proxy {
				if proxy.address == Address::ZERO {
					return Err(ConfigError::Validation(format!(
						"Network {} proxy must have a non-zero address",
						chain_id
					)));
				}
				if proxy.name.is_empty() {
					return Err(ConfigError::Validation(format!(
						"Network {} proxy name cannot be empty",
						chain_id
					)));
				}
				ProtocolVersion::from_contract_version(&proxy.version).map_err(|e| {
					ConfigError::Validation(format!("Network {} proxy: {}", chain_id, e))
				})?;
			}
		}

		self.offchain_version()?;

		if self.account.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Account primary implementation cannot be empty".into(),
			));
		}
		self.primary_account()?;

		Ok(())
	}
}

/// Implementation of FromStr trait for Config to enable parsing from string.
///
/// Environment variables are resolved and the configuration is automatically
/// validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE: &str = r#"
[service]
id = "attestor-test"
chain_id = 11155111

[networks.11155111]
eas_address = "0xC2679fBD37d54388Ce493F1DB75320D236e1815e"
eas_version = "1.3.0"

[account]
primary = "local"
[account.implementations.local]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("ATTESTOR_TEST_HOST", "localhost");
		std::env::set_var("ATTESTOR_TEST_PORT", "5432");

		let input = "host = \"${ATTESTOR_TEST_HOST}:${ATTESTOR_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("ATTESTOR_TEST_HOST");
		std::env::remove_var("ATTESTOR_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${ATTESTOR_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${ATTESTOR_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("ATTESTOR_MISSING_VAR"));
	}

	#[test]
	fn test_defaults() {
		let config: Config = BASE.parse().unwrap();
		assert_eq!(config.service.id, "attestor-test");
		assert_eq!(
			config.offchain_version().unwrap(),
			OffchainAttestationVersion::Version2
		);
		assert_eq!(config.transaction, TransactionOverrides::default());
		assert_eq!(config.proxy_settings().unwrap(), None);

		let inputs = config.domain_separator_inputs().unwrap();
		assert_eq!(inputs.name, "EAS");
		assert_eq!(inputs.version, "1.3.0");
		assert_eq!(inputs.chain_id, 11155111);
	}

	#[test]
	fn test_proxy_and_overrides() {
		let config_str = format!(
			r#"{}
[networks.11155111.proxy]
address = "0x9C9d17bEE150E4eCDf3b99bAA62C91A0dD8C4AF1"
version = "1.2.0"

[offchain]
version = 1

[transaction]
max_priority_fee_per_gas = 1000000000
max_fee_per_gas = 30000000000
"#,
			BASE
		);
		let config: Config = config_str.parse().unwrap();

		let proxy = config.proxy_settings().unwrap().unwrap();
		assert_eq!(proxy.name, "EIP712Proxy");
		assert_eq!(proxy.version, "1.2.0");
		assert_eq!(
			config.offchain_version().unwrap(),
			OffchainAttestationVersion::Version1
		);
		assert!(config.transaction.resolve().is_some());
	}

	#[test]
	fn test_private_key_from_env() {
		std::env::set_var(
			"ATTESTOR_TEST_KEY",
			"0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
		);
		let config_str = BASE.replace(
			"\"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80\"",
			"\"${ATTESTOR_TEST_KEY}\"",
		);
		let config: Config = config_str.parse().unwrap();
		let key = config
			.primary_account()
			.unwrap()
			.get("private_key")
			.and_then(|v| v.as_str())
			.unwrap();
		assert!(key.starts_with("0x59c6"));
		std::env::remove_var("ATTESTOR_TEST_KEY");
	}

	#[test]
	fn test_private_key_is_redacted() {
		let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
		let config: Config = BASE.parse().unwrap();

		let debug = format!("{:?}", config);
		assert!(!debug.contains(key));
		assert!(debug.contains("REDACTED"));

		let rendered = toml::to_string(&config).unwrap();
		assert!(!rendered.contains(key));
		assert!(rendered.contains("REDACTED"));

		// The factory still receives the key itself.
		let account = config.primary_account().unwrap();
		assert_eq!(
			account.get("private_key").and_then(|v| v.as_str()),
			Some(format!("0x{}", key).as_str())
		);
	}

	#[test]
	fn test_chain_must_be_configured() {
		let config_str = BASE.replace("chain_id = 11155111", "chain_id = 1");
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Service chain 1 not found"));
	}

	#[test]
	fn test_invalid_registry_version_rejected() {
		let config_str = BASE.replace("eas_version = \"1.3.0\"", "eas_version = \"latest\"");
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Network 11155111"));
	}

	#[test]
	fn test_invalid_offchain_version_rejected() {
		let config_str = format!("{}\n[offchain]\nversion = 3\n", BASE);
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn test_empty_proxy_name_rejected() {
		let config_str = format!(
			"{}\n[networks.11155111.proxy]\naddress = \"0x9C9d17bEE150E4eCDf3b99bAA62C91A0dD8C4AF1\"\nname = \"\"\nversion = \"1.3.0\"\n",
			BASE
		);
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("proxy name cannot be empty"));
	}

	#[test]
	fn test_unknown_primary_account_rejected() {
		let config_str = BASE.replace("primary = \"local\"", "primary = \"kms\"");
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Primary account 'kms'"));
	}

	#[test]
	fn test_empty_service_id_rejected() {
		let config_str = BASE.replace("id = \"attestor-test\"", "id = \"\"");
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Service ID cannot be empty"));
	}

	#[test]
	fn test_invalid_chain_key_rejected() {
		let config_str = BASE.replace("[networks.11155111]", "[networks.sepolia]");
		assert!(matches!(
			config_str.parse::<Config>(),
			Err(ConfigError::Parse(_))
		));
	}
}
