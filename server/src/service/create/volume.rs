//! The workspace data volume

use serde::Serialize;

use super::{DevfileFlattened, DevfilePrepared};
use crate::config::Config;
use crate::domain::devfile::{map, sequence_entry, string};

/// Where the shared data volume is mounted in every container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeMount {
    pub name: String,
    pub path: String,
}

pub fn define(flattened: DevfileFlattened, config: &Config) -> DevfilePrepared {
    DevfilePrepared {
        request: flattened.request,
        agent_config: flattened.agent_config,
        devfile_yaml: flattened.devfile_yaml,
        processed_devfile: flattened.processed_devfile,
        volume: VolumeMount {
            name: config.workspace_volume_name.clone(),
            path: config.workspace_volume_path.clone(),
        },
    }
}

/// Mount the data volume into every container and declare it as a component
pub fn inject(mut prepared: DevfilePrepared, config: &Config) -> DevfilePrepared {
    let volume = &prepared.volume;
    let components = prepared.processed_devfile.components_mut();

    for component in components.iter_mut() {
        let Some(container) = component.get_mut("container") else {
            continue;
        };
        if container.is_null() {
            continue;
        }

        sequence_entry(container, "volumeMounts").push(map([
            ("name", string(&volume.name)),
            ("path", string(&volume.path)),
        ]));
    }

    components.push(map([
        ("name", string(&volume.name)),
        (
            "volume",
            map([("size", string(&config.workspace_volume_size))]),
        ),
    ]));

    prepared
}
