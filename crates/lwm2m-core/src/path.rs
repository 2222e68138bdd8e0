//! Object path construction.
//!
//! The engine addresses objects, instances and resources by
//! `type/instance[/resource[/resource_instance]]`. Persisted configuration
//! files use the same triple joined by `.` so that names stay valid file
//! names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between path levels in engine paths
pub const PATH_SEPARATOR: char = '/';

/// Separator used when a path is turned into a file name
pub const FILE_SEPARATOR: char = '.';

/// Path to an object instance, resource or resource instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectPath {
    pub obj_type: u16,
    pub instance: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_instance: Option<u16>,
}

impl ObjectPath {
    /// `type/instance`
    pub fn object_instance(obj_type: u16, instance: u16) -> Self {
        Self {
            obj_type,
            instance,
            resource: None,
            resource_instance: None,
        }
    }

    /// `type/instance/resource`
    pub fn resource(obj_type: u16, instance: u16, resource: u16) -> Self {
        Self {
            resource: Some(resource),
            ..Self::object_instance(obj_type, instance)
        }
    }

    /// `type/instance/resource/resource_instance`
    pub fn resource_instance(
        obj_type: u16,
        instance: u16,
        resource: u16,
        resource_instance: u16,
    ) -> Self {
        Self {
            resource_instance: Some(resource_instance),
            ..Self::resource(obj_type, instance, resource)
        }
    }

    /// Path levels present, outermost first
    pub fn levels(&self) -> Vec<u16> {
        let mut levels = vec![self.obj_type, self.instance];
        if let Some(resource) = self.resource {
            levels.push(resource);
            if let Some(ri) = self.resource_instance {
                levels.push(ri);
            }
        }
        levels
    }

    /// Join the path levels with `sep`
    pub fn join(&self, sep: char) -> String {
        self.levels()
            .iter()
            .map(|level| level.to_string())
            .collect::<Vec<_>>()
            .join(&sep.to_string())
    }

    /// File name form, e.g. `3435.62812.1`
    pub fn file_name(&self) -> String {
        self.join(FILE_SEPARATOR)
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join(PATH_SEPARATOR))
    }
}
