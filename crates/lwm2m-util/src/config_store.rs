//! Resource configuration persistence
//!
//! Values written by the server to configuration resources can be saved and
//! restored after a reboot. Each resource is one file named after its
//! dotted path (`type.instance.resource`), so instance ids must be stable
//! across reboots for this to work.

use std::fs::{self, File};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use lwm2m_core::{ObjectEngine, ObjectPath};
use tracing::{error, info, warn};

use crate::config::ConfigDataConfig;
use crate::error::{UtilError, UtilResult};

/// File-backed store for resource values
pub struct ConfigStore {
    engine: Arc<dyn ObjectEngine>,
    directory: PathBuf,
    max_size: usize,
}

impl ConfigStore {
    pub fn new(engine: Arc<dyn ObjectEngine>, config: &ConfigDataConfig) -> Self {
        Self {
            engine,
            directory: config.directory.clone(),
            max_size: config.max_size,
        }
    }

    /// Create the storage directory if it does not exist
    pub fn init(&self) -> UtilResult<()> {
        fs::create_dir_all(&self.directory)?;
        Ok(())
    }

    /// File holding the value of `type/instance/resource`
    pub fn file_path(&self, obj_type: u16, instance: u16, resource: u16) -> PathBuf {
        let path = ObjectPath::resource(obj_type, instance, resource);
        self.directory.join(path.file_name())
    }

    /// Read up to `len` bytes of a saved value and write them to the
    /// resource. Returns the number of bytes loaded.
    pub fn load(
        &self,
        obj_type: u16,
        instance: u16,
        resource: u16,
        len: usize,
    ) -> UtilResult<usize> {
        if len == 0 {
            return Err(UtilError::InvalidArgument("Zero-length config load".into()));
        }
        if len > self.max_size {
            error!(len, max_size = self.max_size, "Unsupported config size");
            return Err(UtilError::ResourceExhausted { obj_type, instance });
        }

        let fname = self.file_path(obj_type, instance, resource);
        let mut data = Vec::with_capacity(len);
        let read =
            File::open(&fname).and_then(|file| file.take(len as u64).read_to_end(&mut data));
        if let Err(e) = read {
            warn!(file = %fname.display(), error = %e, "Unable to load config");
            return Err(e.into());
        }

        let path = ObjectPath::resource(obj_type, instance, resource);
        self.engine.set_opaque(&path, &data).map_err(|e| {
            error!(%path, error = %e, "Unable to set config value");
            UtilError::from(e)
        })?;

        Ok(data.len())
    }

    /// Save a resource value so it can be loaded after a reboot.
    /// Returns the number of bytes written.
    pub fn save(
        &self,
        obj_type: u16,
        instance: u16,
        resource: u16,
        data: &[u8],
    ) -> UtilResult<usize> {
        if data.is_empty() || data.len() > self.max_size {
            return Err(UtilError::InvalidArgument(format!(
                "Config size {} not in 1..={}",
                data.len(),
                self.max_size
            )));
        }

        let fname = self.file_path(obj_type, instance, resource);
        let result = fs::write(&fname, data);
        info!(file = %fname.display(), ok = result.is_ok(), "Config save");
        result?;

        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EngineCall, InMemoryEngine};
    use std::path::Path;
    use pretty_assertions::assert_eq;

    fn store(dir: &Path, engine: Arc<InMemoryEngine>) -> ConfigStore {
        let config = ConfigDataConfig {
            directory: dir.join("lwm2m_cfg"),
            max_size: 8,
        };
        let store = ConfigStore::new(engine, &config);
        store.init().unwrap();
        store
    }

    #[test]
    fn test_save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = Arc::new(InMemoryEngine::new());
        let store = store(tmp.path(), engine.clone());

        assert_eq!(store.save(3435, 62812, 1, b"\x01\x02\x03").unwrap(), 3);
        assert!(tmp.path().join("lwm2m_cfg/3435.62812.1").exists());

        assert_eq!(store.load(3435, 62812, 1, 3).unwrap(), 3);
        let path = ObjectPath::resource(3435, 62812, 1);
        assert_eq!(engine.value(&path), Some(vec![1, 2, 3]));
        assert_eq!(engine.calls(), vec![EngineCall::SetOpaque(path)]);
    }

    #[test]
    fn test_load_short_file() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = Arc::new(InMemoryEngine::new());
        let store = store(tmp.path(), engine.clone());

        store.save(3435, 1, 2, b"ab").unwrap();
        assert_eq!(store.load(3435, 1, 2, 8).unwrap(), 2);
    }

    #[test]
    fn test_size_limits() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), Arc::new(InMemoryEngine::new()));

        assert!(matches!(
            store.load(3435, 1, 2, 0).unwrap_err(),
            UtilError::InvalidArgument(_)
        ));
        assert!(matches!(
            store.load(3435, 1, 2, 9).unwrap_err(),
            UtilError::ResourceExhausted { .. }
        ));
        assert!(matches!(
            store.save(3435, 1, 2, b"").unwrap_err(),
            UtilError::InvalidArgument(_)
        ));
        assert!(matches!(
            store.save(3435, 1, 2, b"123456789").unwrap_err(),
            UtilError::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = Arc::new(InMemoryEngine::new());
        let store = store(tmp.path(), engine.clone());

        let err = store.load(3435, 1, 2, 4).unwrap_err();
        assert!(matches!(err, UtilError::Storage(_)));
        assert!(engine.calls().is_empty());
    }
}
