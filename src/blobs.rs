//! Filesystem object storage for uploaded images.
//!
//! Blobs live under `{root}/{bucket}/{name}` and are published at
//! `{public_base}/storage/{bucket}/{name}`. Names are generated by the
//! caller and must be a single path segment.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::storage::StorageError;

/// Logical buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Avatars,
    Thumbnails,
}

impl Bucket {
    pub const ALL: [Bucket; 2] = [Bucket::Avatars, Bucket::Thumbnails];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Avatars => "avatars",
            Bucket::Thumbnails => "thumbnails",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avatars" => Ok(Bucket::Avatars),
            "thumbnails" => Ok(Bucket::Thumbnails),
            other => Err(StorageError::NotFound(format!("bucket {other}"))),
        }
    }
}

/// A name is usable if it is one non-empty path segment.
pub fn is_valid_blob_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

pub struct BlobStore {
    root: PathBuf,
    public_base: String,
}

impl BlobStore {
    /// Open the store, creating one directory per bucket.
    pub fn open(root: &Path, public_base: impl Into<String>) -> Result<Self, StorageError> {
        for bucket in Bucket::ALL {
            std::fs::create_dir_all(root.join(bucket.as_str()))?;
        }
        Ok(Self {
            root: root.to_path_buf(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, bucket: Bucket, name: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_blob_name(name) {
            return Err(StorageError::InvalidBlobName(name.to_string()));
        }
        Ok(self.root.join(bucket.as_str()).join(name))
    }

    /// Store a new blob and return its public URL. Existing names are
    /// never overwritten.
    pub fn put(&self, bucket: Bucket, name: &str, data: &[u8]) -> Result<String, StorageError> {
        self.put_with(bucket, name, |file| {
            file.write_all(data)?;
            file.sync_all()
        })
    }

    /// Create `name` and fill it with `write`. A failed write removes the
    /// file so no partial blob is left behind.
    fn put_with(
        &self,
        bucket: Bucket,
        name: &str,
        write: impl FnOnce(&mut std::fs::File) -> std::io::Result<()>,
    ) -> Result<String, StorageError> {
        let path = self.path(bucket, name)?;
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(format!("{bucket}/{name}")))
            }
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = write(&mut file) {
            drop(file);
            if let Err(cleanup) = std::fs::remove_file(&path) {
                crate::tlog!("WARNING: failed to remove partial blob {}/{}: {}", bucket, name, cleanup);
            }
            return Err(e.into());
        }
        Ok(self.public_url(bucket, name))
    }

    pub fn get(&self, bucket: Bucket, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path(bucket, name)?;
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a blob. Returns false if it did not exist.
    pub fn delete(&self, bucket: Bucket, name: &str) -> Result<bool, StorageError> {
        let path = self.path(bucket, name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the blob a public URL points at.
    pub fn delete_by_url(&self, bucket: Bucket, url: &str) -> Result<bool, StorageError> {
        match name_from_url(url) {
            Some(name) => self.delete(bucket, name),
            None => Ok(false),
        }
    }

    pub fn public_url(&self, bucket: Bucket, name: &str) -> String {
        format!("{}/storage/{}/{}", self.public_base, bucket, name)
    }
}

/// Last path segment of a blob URL.
pub fn name_from_url(url: &str) -> Option<&str> {
    url.rsplit('/').next().filter(|name| is_valid_blob_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, BlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path(), "http://localhost:3000/").unwrap();
        (dir, store)
    }

    #[test]
    fn put_get_delete() {
        let (_dir, store) = test_store();
        let url = store.put(Bucket::Thumbnails, "u1-1700.png", b"png").unwrap();
        assert_eq!(url, "http://localhost:3000/storage/thumbnails/u1-1700.png");

        assert_eq!(
            store.get(Bucket::Thumbnails, "u1-1700.png").unwrap(),
            Some(b"png".to_vec())
        );
        // Buckets are separate namespaces.
        assert_eq!(store.get(Bucket::Avatars, "u1-1700.png").unwrap(), None);

        assert!(store.delete_by_url(Bucket::Thumbnails, &url).unwrap());
        assert!(!store.delete(Bucket::Thumbnails, "u1-1700.png").unwrap());
        assert_eq!(store.get(Bucket::Thumbnails, "u1-1700.png").unwrap(), None);
    }

    #[test]
    fn put_never_overwrites() {
        let (_dir, store) = test_store();
        store.put(Bucket::Avatars, "a.png", b"one").unwrap();
        let err = store.put(Bucket::Avatars, "a.png", b"two").unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(store.get(Bucket::Avatars, "a.png").unwrap(), Some(b"one".to_vec()));
    }

    #[test]
    fn failed_write_leaves_no_partial_blob() {
        let (_dir, store) = test_store();
        let err = store
            .put_with(Bucket::Thumbnails, "u1-5.png", |file| {
                file.write_all(b"half")?;
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            })
            .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        assert_eq!(store.get(Bucket::Thumbnails, "u1-5.png").unwrap(), None);

        // The name is free again for a retry.
        store.put(Bucket::Thumbnails, "u1-5.png", b"whole").unwrap();
    }

    #[test]
    fn path_traversal_is_rejected() {
        let (_dir, store) = test_store();
        for name in ["../secret", "a/b.png", "..", "", "a\\b"] {
            let err = store.put(Bucket::Avatars, name, b"x").unwrap_err();
            assert!(matches!(err, StorageError::InvalidBlobName(_)), "{name}");
        }
        assert!(name_from_url("http://host/storage/avatars/").is_none());
    }

    #[test]
    fn bucket_names_round_trip() {
        assert_eq!("avatars".parse::<Bucket>().unwrap(), Bucket::Avatars);
        assert!("secrets".parse::<Bucket>().is_err());
    }
}
