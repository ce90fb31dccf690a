//! Common types module for the attestor system.
//!
//! This module defines the data model shared by every attestor crate: on-chain
//! attestations, the request shapes submitted to the registry, signatures and
//! the protocol sentinels. It also carries the low-level EIP-712 word encoder
//! used by the signing crate.

/// Attestation records and the request shapes built from them.
pub mod attestation;
/// EIP-712 ABI word encoding and digest helpers.
pub mod eip712;
/// Secure string type for private keys.
pub mod secret_string;
/// Fixed-shape `{v, r, s}` signatures and address recovery.
pub mod signature;
/// Utility functions for formatting and timestamps.
pub mod utils;

pub use alloy_primitives::{Address, Bytes, B256, U256};
pub use attestation::*;
pub use eip712::{Eip712Error, Eip712Value};
pub use secret_string::SecretString;
pub use signature::Signature;
pub use utils::{current_timestamp, truncate_id};
