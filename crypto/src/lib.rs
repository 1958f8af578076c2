//! Cryptographic primitives for the quorum voting protocol.
//!
//! - **SHA-256** for operation-id derivation
//! - **HMAC-SHA256** keyed by a per-node secret for vote authentication
//! - [`NodeSecret`], a shared secret that is wiped from memory on drop

pub mod error;
pub mod hash;
pub mod mac;
pub mod secret;

pub use error::CryptoError;
pub use hash::{sha256, sha256_hex, truncated_hex_digest};
pub use mac::{sign_vote, verify_vote, vote_message, NO_AUTH_SIGNATURE};
pub use secret::NodeSecret;
