//! Fixed-shape ECDSA signatures over typed-data digests.
//!
//! Signatures are kept in the `{v, r, s}` shape the registry contracts accept,
//! with `v` normalized to 27 or 28.

use alloy_primitives::{Address, Signature as EcdsaSignature, B256};
use serde::{Deserialize, Serialize};

/// A recoverable secp256k1 signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
	pub v: u8,
	pub r: B256,
	pub s: B256,
}

impl Signature {
	/// Builds a signature from its 65-byte `r || s || v` form.
	pub fn from_bytes(bytes: &[u8; 65]) -> Self {
		let v = match bytes[64] {
			v @ (0 | 1) => v + 27,
			v => v,
		};
		Self {
			v,
			r: B256::from_slice(&bytes[..32]),
			s: B256::from_slice(&bytes[32..64]),
		}
	}

	/// Returns the 65-byte `r || s || v` form.
	pub fn as_bytes(&self) -> [u8; 65] {
		let mut out = [0u8; 65];
		out[..32].copy_from_slice(self.r.as_slice());
		out[32..64].copy_from_slice(self.s.as_slice());
		out[64] = self.v;
		out
	}

	/// Recovers the signing address for a prehashed digest.
	///
	/// Returns `None` when the signature is malformed or recovery fails.
	pub fn recover_address(&self, digest: &B256) -> Option<Address> {
		let bytes = self.as_bytes();
		let signature = EcdsaSignature::try_from(&bytes[..]).ok()?;
		signature.recover_address_from_prehash(digest).ok()
	}
}
