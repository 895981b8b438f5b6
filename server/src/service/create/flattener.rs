//! Devfile flattening
//!
//! Produces a self-contained devfile: the document is checked against the
//! devfile 2.2 structure, every name reference is resolved, `null` entries are
//! dropped and the top-level keys are emitted in canonical order. A document
//! that is already flat comes out unchanged, so flattening twice is the same
//! as flattening once.
//!
//! Parents and plugins would have to be fetched from a registry to be merged
//! in; neither can be resolved here, so both fail flattening.

use std::collections::HashSet;

use serde_yaml::{Mapping, Value};

use super::{CreateFailure, DevfileFetched, DevfileFlattened, StageResult};
use crate::domain::devfile::{
    dig, scalar_to_string, DevfileDocument, COMMANDS, COMPONENTS, COMPONENT_TYPES, EVENTS,
};

/// Top-level keys in the order they are written out
const TOP_LEVEL_KEYS: [&str; 11] = [
    "schemaVersion",
    "metadata",
    "parent",
    "variables",
    "attributes",
    "projects",
    "starterProjects",
    "dependentProjects",
    COMPONENTS,
    COMMANDS,
    EVENTS,
];

const COMMAND_TYPES: [&str; 3] = ["exec", "apply", "composite"];

const EVENT_TYPES: [&str; 4] = ["preStart", "postStart", "preStop", "postStop"];

const NAME_PATTERN: &str = "^[a-z0-9]([-a-z0-9]*[a-z0-9])?$";

const NAME_MAX_LENGTH: usize = 63;

pub fn flatten(fetched: DevfileFetched) -> StageResult<DevfileFlattened> {
    let processed_devfile = flatten_devfile(&fetched.devfile)
        .map_err(|diagnostics| CreateFailure::DevfileFlattenFailed(diagnostics.join("; ")))?;

    Ok(DevfileFlattened {
        request: fetched.request,
        agent_config: fetched.agent_config,
        devfile_yaml: fetched.devfile_yaml,
        processed_devfile,
    })
}

/// Flatten a devfile, or return every problem found in it
pub fn flatten_devfile(devfile: &DevfileDocument) -> Result<DevfileDocument, Vec<String>> {
    let mut diagnostics = Vec::new();

    for key in devfile.as_mapping().keys() {
        match key.as_str() {
            Some(key) if TOP_LEVEL_KEYS.contains(&key) => {}
            _ => diagnostics.push(format!("unknown top-level key '{}'", scalar_to_string(key))),
        }
    }

    if devfile.get("schemaVersion").is_none() {
        diagnostics.push("schemaVersion is required".to_string());
    }

    if devfile.get("parent").is_some() {
        diagnostics.push("parent devfile cannot be resolved".to_string());
    }

    if let Some(variables) = devfile.get("variables") {
        if !variables.is_mapping() {
            diagnostics.push("variables must be a mapping".to_string());
        }
    }

    let component_names = check_components(devfile, &mut diagnostics);
    let command_ids = check_commands(devfile, &component_names, &mut diagnostics);
    check_events(devfile, &command_ids, &mut diagnostics);

    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    let mut flattened = Mapping::new();
    for key in TOP_LEVEL_KEYS {
        match devfile.get(key) {
            Some(value) => {
                flattened.insert(Value::from(key), value.clone());
            }
            None if key == COMPONENTS => {
                flattened.insert(Value::from(key), Value::Sequence(Vec::new()));
            }
            None => {}
        }
    }

    Ok(DevfileDocument::from_mapping(flattened))
}

fn is_valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= NAME_MAX_LENGTH
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        && bytes.first() != Some(&b'-')
        && bytes.last() != Some(&b'-')
}

fn name_of(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .filter(|name| !name.is_null())
        .map(scalar_to_string)
}

fn present_types<'a>(value: &Value, types: &[&'a str]) -> Vec<&'a str> {
    types
        .iter()
        .copied()
        .filter(|kind| value.get(*kind).is_some_and(|v| !v.is_null()))
        .collect()
}

/// Check every component, returning the names that can be referenced
fn check_components(devfile: &DevfileDocument, diagnostics: &mut Vec<String>) -> HashSet<String> {
    let mut names = HashSet::new();

    let Some(value) = devfile.get(COMPONENTS) else {
        return names;
    };
    let Some(components) = value.as_sequence() else {
        diagnostics.push("components must be a list".to_string());
        return names;
    };

    for (index, component) in components.iter().enumerate() {
        if !component.is_mapping() {
            diagnostics.push(format!("components[{}] must be a mapping", index));
            continue;
        }

        // Nameless components are reported by validation
        let Some(name) = name_of(component, "name") else {
            continue;
        };

        if !is_valid_name(&name) {
            diagnostics.push(format!(
                "component name '{}' must match '{}'",
                name, NAME_PATTERN
            ));
        }
        if !names.insert(name.clone()) {
            diagnostics.push(format!("duplicate key: {}", name));
        }

        match present_types(component, &COMPONENT_TYPES).as_slice() {
            [kind] => check_component_body(&name, kind, component, diagnostics),
            [] => diagnostics.push(format!(
                "component '{}' must have exactly one of {}",
                name,
                COMPONENT_TYPES.join(", ")
            )),
            kinds => diagnostics.push(format!(
                "component '{}' must have exactly one type, found {}",
                name,
                kinds.join(", ")
            )),
        }
    }

    names
}

fn check_component_body(name: &str, kind: &str, component: &Value, diagnostics: &mut Vec<String>) {
    let body = &component[kind];

    if kind == "plugin" {
        diagnostics.push(format!("plugin component '{}' cannot be resolved", name));
        return;
    }

    if !body.is_mapping() {
        diagnostics.push(format!("component '{}': {} must be a mapping", name, kind));
        return;
    }

    if kind != "container" {
        return;
    }

    let has_image = dig(body, &["image"])
        .map(scalar_to_string)
        .is_some_and(|image| !image.trim().is_empty());
    if !has_image {
        diagnostics.push(format!("component '{}': container image is required", name));
    }

    let Some(endpoints) = dig(body, &["endpoints"]) else {
        return;
    };
    let Some(endpoints) = endpoints.as_sequence() else {
        diagnostics.push(format!("component '{}': endpoints must be a list", name));
        return;
    };

    for (index, endpoint) in endpoints.iter().enumerate() {
        match name_of(endpoint, "name") {
            None => diagnostics.push(format!(
                "component '{}': endpoints[{}] must have a name",
                name, index
            )),
            Some(endpoint_name) if !is_valid_name(&endpoint_name) => diagnostics.push(format!(
                "component '{}': endpoint name '{}' must match '{}'",
                name, endpoint_name, NAME_PATTERN
            )),
            Some(_) => {}
        }

        if !endpoint.get("targetPort").is_some_and(|port| port.as_u64().is_some()) {
            diagnostics.push(format!(
                "component '{}': endpoints[{}] targetPort must be an integer",
                name, index
            ));
        }
    }
}

/// Check every command, returning the ids that can be referenced
fn check_commands(
    devfile: &DevfileDocument,
    component_names: &HashSet<String>,
    diagnostics: &mut Vec<String>,
) -> HashSet<String> {
    let mut ids = HashSet::new();

    let Some(value) = devfile.get(COMMANDS) else {
        return ids;
    };
    let Some(commands) = value.as_sequence() else {
        diagnostics.push("commands must be a list".to_string());
        return ids;
    };

    let mut identified = Vec::with_capacity(commands.len());
    for (index, command) in commands.iter().enumerate() {
        if !command.is_mapping() {
            diagnostics.push(format!("commands[{}] must be a mapping", index));
            continue;
        }

        let Some(id) = name_of(command, "id") else {
            diagnostics.push(format!("commands[{}] must have an id", index));
            continue;
        };

        if !is_valid_name(&id) {
            diagnostics.push(format!("command id '{}' must match '{}'", id, NAME_PATTERN));
        }
        if !ids.insert(id.clone()) {
            diagnostics.push(format!("duplicate key: {}", id));
        }
        identified.push((id, command));
    }

    // References are resolved once every id is known
    for (id, command) in identified {
        match present_types(command, &COMMAND_TYPES).as_slice() {
            ["exec"] => {
                if dig(command, &["exec", "commandLine"]).is_none() {
                    diagnostics.push(format!("command '{}': exec commandLine is required", id));
                }
                check_component_reference(&id, "exec", command, component_names, diagnostics);
            }
            ["apply"] => {
                check_component_reference(&id, "apply", command, component_names, diagnostics);
            }
            ["composite"] => {
                let children = dig(command, &["composite", "commands"])
                    .and_then(Value::as_sequence)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                for child in children.iter().map(scalar_to_string) {
                    if !ids.contains(&child) {
                        diagnostics.push(format!(
                            "command '{}' references unknown command '{}'",
                            id, child
                        ));
                    }
                }
            }
            _ => diagnostics.push(format!(
                "command '{}' must have exactly one of {}",
                id,
                COMMAND_TYPES.join(", ")
            )),
        }
    }

    ids
}

fn check_component_reference(
    id: &str,
    kind: &str,
    command: &Value,
    component_names: &HashSet<String>,
    diagnostics: &mut Vec<String>,
) {
    match dig(command, &[kind, "component"]).map(scalar_to_string) {
        None => diagnostics.push(format!("command '{}': {} component is required", id, kind)),
        Some(component) if !component_names.contains(&component) => diagnostics.push(format!(
            "command '{}' references unknown component '{}'",
            id, component
        )),
        Some(_) => {}
    }
}

fn check_events(devfile: &DevfileDocument, command_ids: &HashSet<String>, diagnostics: &mut Vec<String>) {
    let Some(value) = devfile.get(EVENTS) else {
        return;
    };
    let Some(events) = value.as_mapping() else {
        diagnostics.push("events must be a mapping".to_string());
        return;
    };

    for (event_type, names) in events {
        let event_type = scalar_to_string(event_type);
        if !EVENT_TYPES.contains(&event_type.as_str()) {
            diagnostics.push(format!("unknown event type '{}'", event_type));
            continue;
        }

        if names.is_null() {
            continue;
        }
        let Some(names) = names.as_sequence() else {
            diagnostics.push(format!("events {} must be a list", event_type));
            continue;
        };

        for name in names.iter().map(scalar_to_string) {
            if !command_ids.contains(&name) {
                diagnostics.push(format!(
                    "{} event references unknown command '{}'",
                    event_type, name
                ));
            }
        }
    }
}
