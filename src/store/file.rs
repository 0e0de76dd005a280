//! Simple file-backed [`SyncKv`] for the local storage kind.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{StoreError, SyncKv},
};

/// Persists values to a JSON object file after each mutation.
#[derive(Clone, Debug)]
pub struct FileKv {
	path: PathBuf,
	inner: Arc<RwLock<BTreeMap<String, String>>>,
}
impl FileKv {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let snapshot = load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Returns the backing file path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn persist_locked(&self, contents: &BTreeMap<String, String>) -> Result<(), StoreError> {
		ensure_parent_exists(&self.path)?;

		let serialized = encode_snapshot(contents)?;
		let tmp_path = tmp_path(&self.path);

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl SyncKv for FileKv {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.inner.read().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		let mut guard = self.inner.write();
		let mut next = guard.clone();

		next.insert(key.to_owned(), value.to_owned());
		self.persist_locked(&next)?;
		*guard = next;

		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		if !guard.contains_key(key) {
			return Ok(());
		}

		let mut next = guard.clone();

		next.remove(key);
		self.persist_locked(&next)?;
		*guard = next;

		Ok(())
	}
}

pub(crate) fn decode_snapshot(
	path: &Path,
	bytes: &[u8],
) -> Result<BTreeMap<String, String>, StoreError> {
	if bytes.is_empty() {
		return Ok(BTreeMap::new());
	}

	serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization {
		message: format!("Failed to parse {}: {e}", path.display()),
	})
}

pub(crate) fn encode_snapshot(contents: &BTreeMap<String, String>) -> Result<Vec<u8>, StoreError> {
	serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
		message: format!("Failed to serialize store snapshot: {e}"),
	})
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
	let mut tmp_path = path.to_path_buf();

	tmp_path.set_extension("tmp");

	tmp_path
}

fn load_snapshot(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
	if !path.exists() {
		return Ok(BTreeMap::new());
	}

	let bytes = fs::read(path).map_err(|e| StoreError::Backend {
		message: format!("Failed to read {}: {e}", path.display()),
	})?;

	decode_snapshot(path, &bytes)
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
			message: format!("Failed to create store directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}
