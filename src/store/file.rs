//! File-backed [`Store`] so a restarted console can reuse its last token.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::CachedToken,
	store::{Store, StoreError, StoreFuture},
};

/// On-disk layout: two independent entries, either of which may be missing.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Entries {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	access_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires_at: Option<i64>,
}

/// Persists the token to a JSON file, replacing it atomically on every save.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	io: Arc<Mutex<()>>,
}
impl FileStore {
	/// Opens a store at `path`, creating parent directories when needed.
	///
	/// The file itself is created lazily on the first save.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		Ok(Self { path, io: Default::default() })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn read_entries(&self) -> Result<Entries, StoreError> {
		let bytes = match fs::read(&self.path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::default()),
			Err(e) =>
				return Err(StoreError::Backend {
					message: format!("Failed to read {}: {e}", self.path.display()),
				}),
		};

		if bytes.is_empty() {
			return Ok(Entries::default());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", self.path.display()),
		})
	}

	fn write_entries(&self, entries: &Entries) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(entries).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize token entries: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

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
impl Store for FileStore {
	fn load(&self) -> StoreFuture<'_, Option<CachedToken>> {
		Box::pin(async move {
			let _io = self.io.lock();
			let entries = self.read_entries()?;
			let (Some(access_token), Some(expires_at)) = (entries.access_token, entries.expires_at)
			else {
				return Ok(None);
			};
			let expires_at =
				OffsetDateTime::from_unix_timestamp(expires_at).map_err(|e| {
					StoreError::Serialization {
						message: format!("Persisted expiry {expires_at} is out of range: {e}"),
					}
				})?;

			Ok(Some(CachedToken::new(access_token, expires_at)))
		})
	}

	fn save(&self, token: CachedToken) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let _io = self.io.lock();
			let entries = Entries {
				access_token: Some(token.value.expose().to_owned()),
				expires_at: Some(token.expires_at.unix_timestamp()),
			};

			self.write_entries(&entries)
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let _io = self.io.lock();

			match fs::remove_file(&self.path) {
				Ok(()) => Ok(()),
				Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
				Err(e) => Err(StoreError::Backend {
					message: format!("Failed to remove {}: {e}", self.path.display()),
				}),
			}
		})
	}
}
