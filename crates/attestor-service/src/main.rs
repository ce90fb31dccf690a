//! Main entry point for the attestor.
//!
//! This binary derives identifiers, signs and verifies offchain attestations
//! and dry-runs onchain flows against the in-memory ledger. None of its
//! commands touch the network.

use alloy_primitives::{Address, Bytes, B256};
use attestor_account::{AccountError, SignerInterface};
use attestor_config::Config;
use attestor_core::{AttestationCall, AttestorBuilder, Orchestrator, SubmissionOutcome};
use attestor_signing::{
	derive_schema_uid, derive_uid, OffchainAttestationPackage, OffchainAttestationParams,
	UidFields, UidVersion,
};
use attestor_types::{
	current_timestamp, AttestationRequest, AttestationRequestData, TransactionOverrides,
	NO_EXPIRATION, ZERO_UID,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use attestor_account::implementations::local::create_account;

/// Command-line arguments for the attestor.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/attestor.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Derive a schema identifier
	SchemaUid {
		#[arg(long)]
		schema: String,
		#[arg(long, default_value_t = Address::ZERO)]
		resolver: Address,
		#[arg(long)]
		irrevocable: bool,
	},
	/// Derive the UID the registry assigns to an attestation
	Uid {
		#[arg(long)]
		schema: B256,
		#[arg(long)]
		recipient: Address,
		#[arg(long)]
		time: u64,
		#[arg(long, default_value_t = Address::ZERO)]
		attester: Address,
		#[arg(long, default_value = "0x")]
		data: Bytes,
		#[arg(long, default_value_t = NO_EXPIRATION)]
		expiration_time: u64,
		#[arg(long, default_value_t = ZERO_UID)]
		ref_uid: B256,
		#[arg(long)]
		irrevocable: bool,
		#[arg(long, default_value_t = 0)]
		bump: u32,
	},
	/// Sign an offchain attestation with the primary account and print the package
	SignOffchain {
		#[command(flatten)]
		attestation: AttestationArgs,
		/// Write the package here instead of stdout
		#[arg(long)]
		output: Option<PathBuf>,
	},
	/// Verify a retained offchain attestation package
	VerifyOffchain {
		#[arg(long)]
		file: PathBuf,
	},
	/// Submit an attestation to an in-memory ledger and print its UID
	DryRun {
		#[arg(long, value_enum, default_value_t = Style::Delegated)]
		style: Style,
		#[command(flatten)]
		attestation: AttestationArgs,
		/// Seconds until the signature expires; 0 never expires
		#[arg(long, default_value_t = 3600)]
		validity: u64,
	},
}

#[derive(clap::Args, Debug, Clone)]
struct AttestationArgs {
	#[arg(long)]
	schema: B256,
	#[arg(long)]
	recipient: Address,
	#[arg(long, default_value = "0x")]
	data: Bytes,
	#[arg(long, default_value_t = NO_EXPIRATION)]
	expiration_time: u64,
	#[arg(long, default_value_t = ZERO_UID)]
	ref_uid: B256,
	#[arg(long)]
	irrevocable: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
	Direct,
	Delegated,
	Proxy,
}

impl AttestationArgs {
	fn request_data(&self) -> AttestationRequestData {
		AttestationRequestData::new(self.recipient, self.data.clone())
			.with_expiration_time(self.expiration_time)
			.with_revocable(!self.irrevocable)
			.with_ref_uid(self.ref_uid)
	}

	fn offchain_params(&self, time: u64) -> OffchainAttestationParams {
		OffchainAttestationParams::new(self.schema, self.recipient, time, self.data.clone())
			.with_expiration_time(self.expiration_time)
			.with_revocable(!self.irrevocable)
			.with_ref_uid(self.ref_uid)
	}
}

/// Main entry point for the attestor.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let output = run(args.command, &args.config).await?;
	println!("{}", output);
	Ok(())
}

async fn run(command: Command, config_path: &std::path::Path) -> Result<String, Box<dyn std::error::Error>> {
	match command {
		Command::SchemaUid {
			schema,
			resolver,
			irrevocable,
		} => Ok(derive_schema_uid(&schema, resolver, !irrevocable).to_string()),
		Command::Uid {
			schema,
			recipient,
			time,
			attester,
			data,
			expiration_time,
			ref_uid,
			irrevocable,
			bump,
		} => {
			let fields = UidFields::new(schema, recipient, time, data)
				.with_attester(attester)
				.with_expiration_time(expiration_time)
				.with_revocable(!irrevocable)
				.with_ref_uid(ref_uid)
				.with_bump(bump);
			Ok(derive_uid(UidVersion::Onchain, &fields).to_string())
		},
		Command::SignOffchain {
			attestation,
			output,
		} => {
			let (attestor, signer, _) = build_attestor(config_path).await?;
			let params = attestation.offchain_params(current_timestamp());

			let outcome = attestor
				.attest(AttestationCall::Offchain(params), TransactionOverrides::default())
				.await?;
			let SubmissionOutcome::Offchain(signed) = outcome else {
				return Err("offchain signing produced no attestation".into());
			};
			let package = OffchainAttestationPackage::new(*signed, signer);
			let json = package.to_json()?;

			match output {
				Some(path) => {
					tokio::fs::write(&path, &json).await?;
					tracing::info!(path = %path.display(), uid = %package.sig.uid, "Wrote offchain attestation");
					Ok(package.sig.uid.to_string())
				},
				None => Ok(json),
			}
		},
		Command::VerifyOffchain { file } => {
			let (attestor, _, _) = build_attestor(config_path).await?;
			let json = tokio::fs::read_to_string(&file).await?;
			let package = OffchainAttestationPackage::from_json(&json)?;

			let valid = attestor.verify_offchain_attestation(&package).await?;
			if !valid {
				tracing::warn!(uid = %package.sig.uid, signer = %package.signer, "Offchain attestation failed verification");
			}
			Ok(valid.to_string())
		},
		Command::DryRun {
			style,
			attestation,
			validity,
		} => {
			let (attestor, _, overrides) = build_attestor(config_path).await?;
			let request = AttestationRequest {
				schema: attestation.schema,
				data: attestation.request_data(),
			};
			let deadline = signature_deadline(current_timestamp(), validity)?;

			let call = match style {
				Style::Direct => AttestationCall::Direct(request),
				Style::Delegated => AttestationCall::Delegated { request, deadline },
				Style::Proxy => AttestationCall::DelegatedProxy { request, deadline },
			};
			let outcome = attestor.attest(call, overrides).await?;
			Ok(outcome
				.uids()
				.iter()
				.map(|uid| uid.to_string())
				.collect::<Vec<_>>()
				.join("\n"))
		},
	}
}

/// Deadline for a signature valid for `validity` seconds from `now`.
fn signature_deadline(now: u64, validity: u64) -> Result<u64, String> {
	if validity == 0 {
		return Ok(NO_EXPIRATION);
	}
	now.checked_add(validity)
		.ok_or_else(|| format!("Validity of {} seconds overflows the deadline", validity))
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:expr => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Loads configuration and builds an orchestrator over an in-memory ledger.
///
/// Returns the orchestrator, the primary account's address and the
/// configured fee overrides.
async fn build_attestor(
	config_path: &std::path::Path,
) -> Result<(Orchestrator, Address, TransactionOverrides), Box<dyn std::error::Error>> {
	let path = config_path
		.to_str()
		.ok_or_else(|| format!("Configuration path is not valid UTF-8: {}", config_path.display()))?;
	let config = Config::from_file(path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let overrides = config.transaction;
	let builder = AttestorBuilder::new(config);

	let account_factories = create_factory_map!(
		SignerInterface,
		AccountError,
		attestor_account::implementations::local::NAME => create_account,
	);
	let signer = builder.build_signer(&account_factories)?;
	let address = signer.address().await?;

	let ledger = builder.memory_ledger(address)?;
	let attestor = builder.build(signer, Arc::new(ledger))?;
	Ok((attestor, address, overrides))
}
