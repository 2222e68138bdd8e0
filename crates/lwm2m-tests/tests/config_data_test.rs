//! Persisting server-written configuration across a simulated reboot

use std::path::Path;
use std::sync::Arc;

use lwm2m_core::{EngineError, ObjectPath};
use lwm2m_util::testing::{InMemoryDirectory, InMemoryEngine};
use lwm2m_util::{ConfigDataConfig, ConfigStore, ErrorKind, ObjectManager, UtilConfig};
use pretty_assertions::assert_eq;

const HUMIDITY: u16 = 3304;
const APPLICATION_TYPE: u16 = 5750;

struct Device {
    engine: Arc<InMemoryEngine>,
    manager: ObjectManager,
    store: Arc<ConfigStore>,
}

/// Bring up a device whose config files live under `dir`
fn boot(dir: &Path) -> Device {
    let engine = Arc::new(InMemoryEngine::new());
    let directory = Arc::new(InMemoryDirectory::new(4));
    directory.add_gateway(2, 100);

    let config = UtilConfig {
        config_data: ConfigDataConfig {
            directory: dir.to_path_buf(),
            max_size: 32,
        },
        ..UtilConfig::default()
    };
    let store = Arc::new(ConfigStore::new(engine.clone(), &config.config_data));
    store.init().unwrap();
    let manager = ObjectManager::new(engine.clone(), directory, config);

    Device {
        engine,
        manager,
        store,
    }
}

fn persist_on_write(device: &Device, instance: u16) {
    let store = device.store.clone();
    device
        .manager
        .register_post_write_callback(
            HUMIDITY,
            instance,
            APPLICATION_TYPE,
            move |path: &ObjectPath, data: &[u8]| {
                store
                    .save(path.obj_type, path.instance, APPLICATION_TYPE, data)
                    .map(|_| ())
                    .map_err(|e| EngineError::Io(e.to_string()))
            },
        )
        .unwrap();
}

#[test]
fn test_value_survives_reboot() {
    let tmp = tempfile::tempdir().unwrap();
    let path = ObjectPath::resource(HUMIDITY, 102, APPLICATION_TYPE);

    {
        let device = boot(tmp.path());
        let instance = device.manager.acquire_instance(HUMIDITY, 2, 2).unwrap();
        assert_eq!(instance, 102);
        persist_on_write(&device, instance);

        device.engine.server_write(&path, b"lab-bench").unwrap();
        assert!(device.store.file_path(HUMIDITY, 102, APPLICATION_TYPE).exists());
    }

    let device = boot(tmp.path());
    device.manager.acquire_instance(HUMIDITY, 2, 2).unwrap();
    assert_eq!(device.engine.value(&path), None);

    let loaded = device.store.load(HUMIDITY, 102, APPLICATION_TYPE, 32).unwrap();
    assert_eq!(loaded, 9);
    assert_eq!(device.engine.value(&path), Some(b"lab-bench".to_vec()));
}

#[test]
fn test_oversized_write_is_not_persisted() {
    let tmp = tempfile::tempdir().unwrap();
    let device = boot(tmp.path());
    let instance = device.manager.acquire_instance(HUMIDITY, 2, 0).unwrap();
    persist_on_write(&device, instance);

    let path = ObjectPath::resource(HUMIDITY, instance, APPLICATION_TYPE);
    let err = device.engine.server_write(&path, &[0x55; 33]).unwrap_err();
    assert!(matches!(err, EngineError::Io(_)));
    assert!(!device
        .store
        .file_path(HUMIDITY, instance, APPLICATION_TYPE)
        .exists());
}

#[test]
fn test_load_without_saved_value() {
    let tmp = tempfile::tempdir().unwrap();
    let device = boot(tmp.path());
    device.manager.acquire_instance(HUMIDITY, 2, 0).unwrap();

    let err = device
        .store
        .load(HUMIDITY, 100, APPLICATION_TYPE, 8)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Underlying);
    assert_eq!(
        device
            .engine
            .value(&ObjectPath::resource(HUMIDITY, 100, APPLICATION_TYPE)),
        None
    );
}

#[test]
fn test_partial_load_truncates() {
    let tmp = tempfile::tempdir().unwrap();
    let device = boot(tmp.path());
    device.manager.acquire_instance(HUMIDITY, 2, 1).unwrap();
    device
        .store
        .save(HUMIDITY, 101, APPLICATION_TYPE, b"0123456789")
        .unwrap();

    assert_eq!(device.store.load(HUMIDITY, 101, APPLICATION_TYPE, 4).unwrap(), 4);
    assert_eq!(
        device
            .engine
            .value(&ObjectPath::resource(HUMIDITY, 101, APPLICATION_TYPE)),
        Some(b"0123".to_vec())
    );
}
