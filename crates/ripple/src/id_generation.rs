//! Hash-based entity ID generation.
//!
//! IDs have the form `{kind-prefix}-{hash}` (e.g. `feat-a3f8`, `doc-0k2z`).
//! The hash is the base36 encoding of a SHA256 digest over the title,
//! description, creation time and a retry nonce. Its length grows with the
//! number of stored entities (4 to 6 characters).

use crate::domain::{EntityId, EntityKind};
use crate::error::{Error, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::{debug, warn};

const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MAX_NONCE: u32 = 100;
const MAX_LENGTH: usize = 6;

/// Collision-checked ID generator
///
/// Every ID that exists in the graph must be registered, including
/// caller-assigned ones, so generated IDs never reuse an existing one.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    existing_ids: HashSet<EntityId>,
}

impl IdGenerator {
    /// Create an empty generator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing ID to prevent collisions
    pub fn register_id(&mut self, id: EntityId) {
        self.existing_ids.insert(id);
    }

    /// Number of registered IDs
    #[must_use]
    pub fn len(&self) -> usize {
        self.existing_ids.len()
    }

    /// Whether no IDs are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.existing_ids.is_empty()
    }

    /// Generate and register a new unique ID for an entity of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if every nonce collides at the maximum length.
    pub fn generate(
        &mut self,
        kind: EntityKind,
        title: &str,
        description: Option<&str>,
    ) -> Result<EntityId> {
        let mut length = adaptive_length(self.existing_ids.len());

        loop {
            for nonce in 0..MAX_NONCE {
                let id = hash_id(kind.id_prefix(), title, description.unwrap_or(""), nonce, length);
                if !self.existing_ids.contains(&id) {
                    if nonce > 0 {
                        debug!(nonce, length, "Generated unique ID after collision retries");
                    }
                    self.existing_ids.insert(id.clone());
                    return Ok(id);
                }
            }

            if length >= MAX_LENGTH {
                return Err(Error::Storage(format!(
                    "unable to generate a unique {kind} id after {MAX_NONCE} attempts"
                )));
            }
            warn!(length, "All nonces exhausted, increasing ID length");
            length += 1;
        }
    }
}

/// Hash length for a graph of `size` entities.
fn adaptive_length(size: usize) -> usize {
    match size {
        0..=500 => 4,
        501..=1500 => 5,
        _ => MAX_LENGTH,
    }
}

fn hash_id(prefix: &str, title: &str, description: &str, nonce: u32, length: usize) -> EntityId {
    let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let content = format!("{title}|{description}|{timestamp}|{nonce}");

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();

    EntityId(format!("{prefix}-{}", encode_base36(&digest[..8], length)))
}

/// Encode up to eight bytes as a fixed-length base36 string.
fn encode_base36(bytes: &[u8], length: usize) -> String {
    let mut n = bytes
        .iter()
        .fold(0u64, |acc, &b| acc.wrapping_shl(8).wrapping_add(u64::from(b)));

    let mut out = vec![b'0'; length];
    for slot in out.iter_mut().rev() {
        // n % 36 < 36, so the index is always in range
        *slot = BASE36_CHARS[usize::try_from(n % 36).unwrap_or(0)];
        n /= 36;
    }
    out.into_iter().map(char::from).collect()
}
