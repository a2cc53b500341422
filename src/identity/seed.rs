use rand::RngCore;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::SeedError;
use crate::traits::FileSystem;

/// Number of random bytes in a freshly generated seed
pub const SEED_LEN: usize = 32;

/// Per-tenant HMAC key material. Created once, then reused for every scan of
/// the tenant so abstracted ids stay stable across runs.
#[derive(Clone, PartialEq, Eq)]
pub struct TenantSeed(Vec<u8>);

impl TenantSeed {
    /// Generate a new random seed
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SEED_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wrap existing key material
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn from_hex(encoded: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(encoded.trim()).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Short non-secret fingerprint for display
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let digest = Sha256::digest(&self.0);
        hex::encode(&digest[..4])
    }
}

impl fmt::Debug for TenantSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantSeed(fingerprint={})", self.fingerprint())
    }
}

/// Persists tenant seeds as hex files under a directory, one per tenant
pub struct SeedStore {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl SeedStore {
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the seed file for a tenant
    pub fn path_for(&self, tenant_id: &str) -> Result<PathBuf, SeedError> {
        let valid = !tenant_id.is_empty()
            && tenant_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !tenant_id.starts_with('.');

        if !valid {
            return Err(SeedError::InvalidTenantId(tenant_id.to_string()));
        }

        Ok(self.dir.join(format!("{}.seed", tenant_id)))
    }

    /// Load the stored seed for a tenant
    pub fn load(&self, tenant_id: &str) -> Result<TenantSeed, SeedError> {
        let path = self.path_for(tenant_id)?;

        if !self.fs.exists(&path) {
            return Err(SeedError::Missing {
                tenant_id: tenant_id.to_string(),
                path,
            });
        }

        let content = self
            .fs
            .read_to_string(&path)
            .map_err(|e| SeedError::Storage(format!("{:#}", e)))?;

        let seed = TenantSeed::from_hex(&content).map_err(|e| SeedError::Malformed {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        if seed.as_bytes().is_empty() {
            return Err(SeedError::Malformed {
                path,
                reason: "seed is empty".to_string(),
            });
        }

        Ok(seed)
    }

    /// Load the tenant's seed, creating and persisting one on first use.
    /// Returns the seed and whether it was newly created.
    pub fn load_or_create(&self, tenant_id: &str) -> Result<(TenantSeed, bool), SeedError> {
        match self.load(tenant_id) {
            Ok(seed) => Ok((seed, false)),
            Err(SeedError::Missing { path, .. }) => {
                let seed = TenantSeed::generate();
                self.fs
                    .write(&path, &seed.to_hex())
                    .map_err(|e| SeedError::Storage(format!("{:#}", e)))?;
                tracing::info!(tenant_id, path = %path.display(), "created tenant seed");
                Ok((seed, true))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockFileSystem;

    fn store() -> (Arc<MockFileSystem>, SeedStore) {
        let fs = Arc::new(MockFileSystem::new());
        let store = SeedStore::new(fs.clone(), "/seeds");
        (fs, store)
    }

    #[test]
    fn test_generate_has_expected_length_and_differs() {
        let a = TenantSeed::generate();
        let b = TenantSeed::generate();

        assert_eq!(a.as_bytes().len(), SEED_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hex_roundtrip_and_debug_hides_material() {
        let seed = TenantSeed::from_bytes(b"S".to_vec());

        assert_eq!(TenantSeed::from_hex(&seed.to_hex()).unwrap(), seed);
        assert!(!format!("{:?}", seed).contains(&seed.to_hex()));
    }

    #[test]
    fn test_load_or_create_persists_once() {
        let (fs, store) = store();

        let (first, created) = store.load_or_create("tenant-a").unwrap();
        let (second, created_again) = store.load_or_create("tenant-a").unwrap();

        assert!(created);
        assert!(!created_again);
        assert_eq!(first, second);
        assert!(fs.get_file_contents(Path::new("/seeds/tenant-a.seed")).is_some());
    }

    #[test]
    fn test_load_missing_seed() {
        let (_, store) = store();

        let err = store.load("tenant-b").unwrap_err();

        assert!(matches!(err, SeedError::Missing { ref tenant_id, .. } if tenant_id == "tenant-b"));
    }

    #[test]
    fn test_load_malformed_seed() {
        let (fs, store) = store();
        fs.write(Path::new("/seeds/tenant-c.seed"), "not-hex").unwrap();

        assert!(matches!(
            store.load("tenant-c"),
            Err(SeedError::Malformed { .. })
        ));
    }

    #[test]
    fn test_rejects_path_like_tenant_ids() {
        let (_, store) = store();

        assert!(matches!(
            store.path_for("../etc"),
            Err(SeedError::InvalidTenantId(_))
        ));
        assert!(matches!(store.path_for(""), Err(SeedError::InvalidTenantId(_))));
    }
}
