use sha2::{Digest, Sha256};

use crate::reminder::ReminderId;

const ID_BYTES: usize = 15;

/// Content-addressed reminder id: the first 15 bytes of the SHA-256 of `seed`,
/// hex encoded. Identical seeds always produce the same id.
pub fn make_id(seed: &str) -> ReminderId {
    let digest = Sha256::digest(seed.as_bytes());
    hex::encode(&digest[..ID_BYTES])
}
