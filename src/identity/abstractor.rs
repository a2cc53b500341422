use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::{BTreeMap, HashMap};

use super::prefix::type_prefix;
use super::seed::TenantSeed;
use crate::error::AbstractionError;

type HmacSha256 = Hmac<Sha256>;

/// Hex characters of the digest kept in an abstracted id
pub const HASH_LEN: usize = 8;

/// Salted retries allowed before the hash space is considered exhausted
pub const DEFAULT_MAX_SALT_ATTEMPTS: u32 = 16;

/// Hex-encoded HMAC-SHA256 of `input` keyed with `key`
pub fn keyed_hex(key: &[u8], input: &str) -> Result<String, AbstractionError> {
    if key.is_empty() {
        return Err(AbstractionError::InvalidKey("key material is empty".to_string()));
    }

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AbstractionError::InvalidKey(e.to_string()))?;
    mac.update(input.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn salted_input(original_id: &str, salt: u32) -> String {
    if salt == 0 {
        original_id.to_string()
    } else {
        format!("{}#{}", original_id, salt)
    }
}

/// Pure abstraction of one identifier with an explicit salt (0 = unsalted)
pub fn abstract_id(
    seed: &TenantSeed,
    original_id: &str,
    resource_type: &str,
    salt: u32,
) -> Result<String, AbstractionError> {
    let digest = keyed_hex(seed.as_bytes(), &salted_input(original_id, salt))?;
    Ok(format!("{}-{}", type_prefix(resource_type), &digest[..HASH_LEN]))
}

/// Salts that were needed to get a unique id, keyed by original id.
///
/// Together with the seed this reproduces every mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollisionTable(BTreeMap<String, u32>);

impl CollisionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn salt_for(&self, original_id: &str) -> Option<u32> {
        self.0.get(original_id).copied()
    }

    pub fn record(&mut self, original_id: impl Into<String>, salt: u32) {
        self.0.insert(original_id.into(), salt);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u32)> {
        self.0.iter()
    }
}

/// Issues abstracted ids for one tenant, checking every id against those
/// already issued.
///
/// The prefix is part of the id, so uniqueness of the full id is uniqueness
/// within tenant and type.
pub struct IdentityAbstractor {
    seed: TenantSeed,
    max_attempts: u32,
    issued: HashMap<String, String>,
    by_original: HashMap<String, String>,
    collisions: CollisionTable,
}

impl IdentityAbstractor {
    pub fn new(seed: TenantSeed) -> Self {
        Self {
            seed,
            max_attempts: DEFAULT_MAX_SALT_ATTEMPTS,
            issued: HashMap::new(),
            by_original: HashMap::new(),
            collisions: CollisionTable::new(),
        }
    }

    /// Replay salts recorded by an earlier run
    pub fn with_collision_table(mut self, collisions: CollisionTable) -> Self {
        self.collisions = collisions;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn collision_table(&self) -> &CollisionTable {
        &self.collisions
    }

    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    /// Mark an existing pair as issued (e.g. loaded from a persisted layer)
    pub fn register_existing(
        &mut self,
        abstracted_id: &str,
        original_id: &str,
    ) -> Result<(), AbstractionError> {
        if let Some(owner) = self.issued.get(abstracted_id)
            && owner != original_id
        {
            return Err(AbstractionError::ConflictingRegistration {
                abstracted_id: abstracted_id.to_string(),
                existing: owner.clone(),
                original_id: original_id.to_string(),
            });
        }

        if let Some(existing) = self.by_original.get(original_id)
            && existing != abstracted_id
        {
            return Err(AbstractionError::ConflictingRegistration {
                abstracted_id: abstracted_id.to_string(),
                existing: existing.clone(),
                original_id: original_id.to_string(),
            });
        }

        self.issued
            .insert(abstracted_id.to_string(), original_id.to_string());
        self.by_original
            .insert(original_id.to_string(), abstracted_id.to_string());
        Ok(())
    }

    /// Abstract an identifier, salting on collision.
    ///
    /// Asking again for an id that was already issued returns the same result.
    pub fn abstract_resource(
        &mut self,
        original_id: &str,
        resource_type: &str,
    ) -> Result<String, AbstractionError> {
        if let Some(existing) = self.by_original.get(original_id) {
            return Ok(existing.clone());
        }

        let recorded = self.collisions.salt_for(original_id);
        let salts = recorded.into_iter().chain(0..=self.max_attempts);

        for salt in salts {
            let candidate = abstract_id(&self.seed, original_id, resource_type, salt)?;

            if self.issued.contains_key(&candidate) {
                tracing::debug!(
                    original_id,
                    candidate = %candidate,
                    salt,
                    "abstracted id collision, retrying with salt"
                );
                continue;
            }

            if salt > 0 {
                self.collisions.record(original_id, salt);
            }

            self.issued
                .insert(candidate.clone(), original_id.to_string());
            self.by_original
                .insert(original_id.to_string(), candidate.clone());
            return Ok(candidate);
        }

        Err(AbstractionError::HashSpaceExhausted {
            original_id: original_id.to_string(),
            prefix: type_prefix(resource_type),
            attempts: self.max_attempts,
        })
    }
}
