//! Async file-backed [`AsyncKv`] for the durable storage kind.

// std
use std::path::{Path, PathBuf};
// crates.io
use tokio::{fs, io::AsyncWriteExt};
// self
use crate::{
	_prelude::*,
	store::{
		AsyncKv, StoreError, StoreFuture,
		file::{decode_snapshot, encode_snapshot, tmp_path},
	},
};

/// Persists values to a JSON object file using non-blocking IO.
///
/// Writers are serialized by an async mutex so the snapshot on disk always matches the
/// in-memory view once a write future resolves.
#[derive(Debug)]
pub struct DurableFileKv {
	path: PathBuf,
	inner: AsyncMutex<BTreeMap<String, String>>,
}
impl DurableFileKv {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path).await?;

		let snapshot = match fs::read(&path).await {
			Ok(bytes) => decode_snapshot(&path, &bytes)?,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
			Err(e) =>
				return Err(StoreError::Backend {
					message: format!("Failed to read {}: {e}", path.display()),
				}),
		};

		Ok(Self { path, inner: AsyncMutex::new(snapshot) })
	}

	/// Returns the backing file path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	async fn persist(&self, contents: &BTreeMap<String, String>) -> Result<(), StoreError> {
		ensure_parent_exists(&self.path).await?;

		let serialized = encode_snapshot(contents)?;
		let tmp_path = tmp_path(&self.path);
		let mut file = fs::File::create(&tmp_path).await.map_err(|e| StoreError::Backend {
			message: format!("Failed to create {}: {e}", tmp_path.display()),
		})?;

		file.write_all(&serialized).await.map_err(|e| StoreError::Backend {
			message: format!("Failed to write {}: {e}", tmp_path.display()),
		})?;
		file.sync_all().await.map_err(|e| StoreError::Backend {
			message: format!("Failed to sync {}: {e}", tmp_path.display()),
		})?;
		drop(file);

		fs::rename(&tmp_path, &self.path).await.map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl AsyncKv for DurableFileKv {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.inner.lock().await.get(key).cloned()) })
	}

	fn set<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.lock().await;
			let mut next = guard.clone();

			next.insert(key.to_owned(), value.to_owned());
			self.persist(&next).await?;
			*guard = next;

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.lock().await;

			if !guard.contains_key(key) {
				return Ok(());
			}

			let mut next = guard.clone();

			next.remove(key);
			self.persist(&next).await?;
			*guard = next;

			Ok(())
		})
	}
}

async fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).await.map_err(|e| StoreError::Backend {
			message: format!("Failed to create store directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}
