//! HMAC-SHA256 vote authentication.
//!
//! A vote is authenticated by a MAC over `"{operation_id}|{decision}|{voter}"`
//! keyed with the voter's secret. Anyone holding the same secret can recompute
//! it, which is why the verifier fetches the voter's secret from the store.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{CryptoError, NodeSecret};

type HmacSha256 = Hmac<Sha256>;

/// Signature emitted by a node that has no secret configured.
pub const NO_AUTH_SIGNATURE: &str = "no-auth";

/// The byte string covered by a vote MAC.
pub fn vote_message(operation_id: &str, decision: &str, voter: &str) -> String {
    format!("{operation_id}|{decision}|{voter}")
}

/// Compute the lowercase-hex MAC for a vote.
pub fn sign_vote(
    secret: &NodeSecret,
    operation_id: &str,
    decision: &str,
    voter: &str,
) -> Result<String, CryptoError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose())
        .map_err(|e| CryptoError::MacInit(e.to_string()))?;
    mac.update(vote_message(operation_id, decision, voter).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex-encoded vote MAC in constant time.
///
/// Returns `false` for anything that is not valid hex of the right length,
/// including [`NO_AUTH_SIGNATURE`].
pub fn verify_vote(
    secret: &NodeSecret,
    operation_id: &str,
    decision: &str,
    voter: &str,
    signature: &str,
) -> bool {
    let Ok(received) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose()) else {
        return false;
    };
    mac.update(vote_message(operation_id, decision, voter).as_bytes());
    mac.verify_slice(&received).is_ok()
}
