//! Scenario definition and runner
//!
//! A scenario lists gateway devices and the satellite objects each one
//! carries, the engine's per-type capacity, resource values the server
//! writes, and which gateways are deleted. The runner acquires every
//! satellite, applies the writes, deletes gateways, then retries the
//! satellites of the gateways that remain.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use lwm2m_core::{EngineError, ObjectPath};
use lwm2m_util::testing::{InMemoryDirectory, InMemoryEngine};
use lwm2m_util::{Agent, ConfigStore, LifecycleEvent, ObjectManager, Slot, UtilConfig};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Complete simulation scenario
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub util: UtilConfig,
    #[serde(default)]
    pub engine: EngineDef,
    #[serde(default)]
    pub gateways: Vec<GatewayDef>,
    /// Values written by the server and persisted
    #[serde(default)]
    pub config_values: Vec<ConfigValueDef>,
    #[serde(default)]
    pub steps: StepsDef,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineDef {
    #[serde(default)]
    pub capacity: Vec<CapacityDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CapacityDef {
    pub obj_type: u16,
    pub max: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayDef {
    pub index: usize,
    pub base_instance: u16,
    #[serde(default)]
    pub sensors: Vec<SensorDef>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SensorDef {
    pub obj_type: u16,
    pub offset: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigValueDef {
    pub gateway: usize,
    pub obj_type: u16,
    pub offset: u16,
    pub resource: u16,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepsDef {
    /// Gateway indices deleted after the first acquire pass
    #[serde(default)]
    pub delete: Vec<usize>,
}

impl Scenario {
    /// Load a scenario from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(content).context("Failed to parse scenario")?;
        scenario.util.validate()?;
        Ok(scenario)
    }
}

/// Result of one acquire attempt
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub phase: &'static str,
    pub index: usize,
    pub obj_type: u16,
    pub offset: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything observed while running a scenario
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub outcomes: Vec<Outcome>,
    pub slots: BTreeMap<usize, Vec<Slot>>,
    pub instances: Vec<(u16, u16)>,
    pub events: Vec<LifecycleEvent>,
}

/// Run `scenario` against in-memory collaborators
pub fn run(scenario: &Scenario) -> Result<Report> {
    let engine = Arc::new(InMemoryEngine::new());
    for cap in &scenario.engine.capacity {
        engine.set_capacity(cap.obj_type, cap.max);
    }

    let directory = Arc::new(InMemoryDirectory::new(scenario.util.max_instances));
    for gw in &scenario.gateways {
        directory.add_gateway(gw.index, gw.base_instance);
    }

    let manager = ObjectManager::new(engine.clone(), directory.clone(), scenario.util.clone());
    let mut events = manager.subscribe();
    register_agents(&manager, scenario);

    let store = Arc::new(ConfigStore::new(engine.clone(), &scenario.util.config_data));
    store.init()?;

    let mut outcomes = Vec::new();
    for gw in &scenario.gateways {
        acquire_all(&manager, gw, "initial", &mut outcomes);
    }

    for value in &scenario.config_values {
        apply_config_value(&manager, &engine, &store, scenario, value)?;
    }

    for &index in &scenario.steps.delete {
        if !directory.delete_gateway(index, &manager) {
            warn!(index, "No gateway to delete");
        }
    }

    let remaining = directory.gateway_indices();
    for gw in scenario
        .gateways
        .iter()
        .filter(|gw| remaining.contains(&gw.index))
    {
        acquire_all(&manager, gw, "retry", &mut outcomes);
    }

    let slots = remaining
        .iter()
        .filter_map(|&index| manager.slot_states(index).map(|slots| (index, slots)))
        .collect();

    let mut observed = Vec::new();
    while let Ok(event) = events.try_recv() {
        observed.push(event);
    }

    Ok(Report {
        outcomes,
        slots,
        instances: engine.instances(),
        events: observed,
    })
}

fn register_agents(manager: &ObjectManager, scenario: &Scenario) {
    let mut types: Vec<u16> = scenario
        .gateways
        .iter()
        .flat_map(|gw| gw.sensors.iter().map(|s| s.obj_type))
        .collect();
    types.sort_unstable();
    types.dedup();

    for obj_type in types {
        manager.register_agent(Agent::new(obj_type).on_create(|index, obj_type, instance| {
            info!(?index, obj_type, instance, "Sensor object ready");
            Ok(())
        }));
    }

    manager.register_agent(Agent::new(0).on_gateway_deleted(|index| {
        info!(index, "Gateway sensors removed");
        Ok(())
    }));
}

fn acquire_all(
    manager: &ObjectManager,
    gw: &GatewayDef,
    phase: &'static str,
    outcomes: &mut Vec<Outcome>,
) {
    for sensor in &gw.sensors {
        let result = manager.acquire_instance(sensor.obj_type, gw.index, sensor.offset);
        if let Err(e) = &result {
            warn!(index = gw.index, obj_type = sensor.obj_type, error = %e, "Acquire failed");
        }
        outcomes.push(Outcome {
            phase,
            index: gw.index,
            obj_type: sensor.obj_type,
            offset: sensor.offset,
            instance: result.as_ref().ok().copied(),
            error: result.err().map(|e| e.to_string()),
        });
    }
}

/// Persist a server write through a post-write callback, then load it back
fn apply_config_value(
    manager: &ObjectManager,
    engine: &InMemoryEngine,
    store: &Arc<ConfigStore>,
    scenario: &Scenario,
    value: &ConfigValueDef,
) -> Result<()> {
    let base = scenario
        .gateways
        .iter()
        .find(|gw| gw.index == value.gateway)
        .map(|gw| gw.base_instance)
        .with_context(|| format!("Config value for unknown gateway {}", value.gateway))?;
    let instance = base
        .checked_add(value.offset)
        .context("Config value instance out of range")?;

    let saver = store.clone();
    manager.register_post_write_callback(
        value.obj_type,
        instance,
        value.resource,
        move |path: &ObjectPath, data: &[u8]| {
            let resource = path.resource.unwrap_or_default();
            saver
                .save(path.obj_type, path.instance, resource, data)
                .map(|_| ())
                .map_err(|e| EngineError::Io(e.to_string()))
        },
    )?;

    let path = ObjectPath::resource(value.obj_type, instance, value.resource);
    if let Err(e) = engine.server_write(&path, value.value.as_bytes()) {
        warn!(%path, error = %e, "Server write failed");
        // The satellite may be gone; hand its slot back so it is created again
        let status: Result<(), EngineError> = Err(e);
        let released =
            manager.release_instance(&status, value.obj_type, value.gateway, instance);
        if let Err(e) = released {
            warn!(%path, error = %e, "Unable to release instance");
        }
        return Ok(());
    }

    let loaded = store.load(value.obj_type, instance, value.resource, value.value.len())?;
    info!(%path, bytes = loaded, "Config value persisted and restored");
    Ok(())
}
