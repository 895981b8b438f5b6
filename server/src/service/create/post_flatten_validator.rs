//! Restrictions on flattened devfiles
//!
//! Names starting with `gl-` (and variables starting with `gl_`) are reserved
//! for components the platform injects later. Rules run in a fixed order and
//! the first violation found, in declaration order, is reported.

use serde_yaml::Value;

use super::{CreateFailure, StageResult};
use crate::domain::devfile::{
    dig, is_truthy, scalar_to_string, DevfileDocument, INJECT_EDITOR_ATTRIBUTE,
};

/// Prefix reserved for injected names
pub const RESTRICTED_PREFIX: &str = "gl-";

/// Prefix reserved for injected variables
pub const RESTRICTED_VARIABLE_PREFIX: &str = "gl_";

const UNSUPPORTED_COMPONENT_TYPES: [&str; 3] = ["kubernetes", "openshift", "image"];

const SUPPORTED_COMMAND_TYPES: [&str; 2] = ["exec", "apply"];

const SUPPORTED_EVENTS: [&str; 1] = ["preStart"];

type Rule = fn(&DevfileDocument) -> Result<(), String>;

const RULES: [Rule; 7] = [
    validate_projects,
    validate_components,
    validate_containers,
    validate_endpoints,
    validate_commands,
    validate_events,
    validate_variables,
];

pub fn validate(devfile: &DevfileDocument) -> StageResult<()> {
    for rule in RULES {
        rule(devfile).map_err(CreateFailure::PostFlattenDevfileValidationFailed)?;
    }

    Ok(())
}

fn is_restricted(name: &str, prefix: &str) -> bool {
    name.to_lowercase().starts_with(prefix)
}

fn name_of(value: &Value, key: &str) -> String {
    value.get(key).map(scalar_to_string).unwrap_or_default()
}

fn validate_projects(devfile: &DevfileDocument) -> Result<(), String> {
    if devfile.is_set("starterProjects") {
        return Err("'starterProjects' is not yet supported".to_string());
    }

    if devfile.is_set("projects") {
        return Err("'projects' is not yet supported".to_string());
    }

    Ok(())
}

fn validate_components(devfile: &DevfileDocument) -> Result<(), String> {
    let components = devfile.components();

    if components.is_empty() {
        return Err("No components present in devfile".to_string());
    }

    let editor_components: Vec<&Value> = components
        .iter()
        .filter(|component| {
            dig(component, &["attributes", INJECT_EDITOR_ATTRIBUTE]).is_some_and(is_truthy)
        })
        .collect();

    match editor_components.as_slice() {
        [] => {
            return Err(format!(
                "No component has '{}' attribute",
                INJECT_EDITOR_ATTRIBUTE
            ))
        }
        [editor] => {
            // The editor is started from the marked container
            if !editor.get("container").is_some_and(Value::is_mapping) {
                return Err(format!(
                    "Component '{}' with '{}' attribute must be a container",
                    name_of(editor, "name"),
                    INJECT_EDITOR_ATTRIBUTE
                ));
            }
        }
        _ => {
            let names: Vec<String> = editor_components
                .iter()
                .map(|component| name_of(component, "name"))
                .collect();
            return Err(format!(
                "Multiple components '{:?}' have '{}' attribute",
                names, INJECT_EDITOR_ATTRIBUTE
            ));
        }
    }

    let all_named = components
        .iter()
        .all(|component| !name_of(component, "name").trim().is_empty());
    if !all_named {
        return Err("Components must have a 'name'".to_string());
    }

    for component in components {
        let name = name_of(component, "name");
        if is_restricted(&name, RESTRICTED_PREFIX) {
            return Err(format!(
                "Component name '{}' must not start with '{}'",
                name, RESTRICTED_PREFIX
            ));
        }

        for kind in UNSUPPORTED_COMPONENT_TYPES {
            if component.get(kind).is_some_and(is_truthy) {
                return Err(format!("Component type '{}' is not yet supported", kind));
            }
        }
    }

    Ok(())
}

fn validate_containers(devfile: &DevfileDocument) -> Result<(), String> {
    for component in devfile.components() {
        if dig(component, &["container", "dedicatedPod"]).is_some_and(is_truthy) {
            return Err(format!(
                "Property 'dedicatedPod' of component '{}' is not yet supported",
                name_of(component, "name")
            ));
        }
    }

    Ok(())
}

fn validate_endpoints(devfile: &DevfileDocument) -> Result<(), String> {
    for component in devfile.components() {
        let endpoints = dig(component, &["container", "endpoints"])
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        for endpoint in endpoints {
            let endpoint_name = name_of(endpoint, "name");
            if is_restricted(&endpoint_name, RESTRICTED_PREFIX) {
                return Err(format!(
                    "Endpoint name '{}' of component '{}' must not start with '{}'",
                    endpoint_name,
                    name_of(component, "name"),
                    RESTRICTED_PREFIX
                ));
            }
        }
    }

    Ok(())
}

fn validate_commands(devfile: &DevfileDocument) -> Result<(), String> {
    for command in devfile.commands() {
        let id = name_of(command, "id");
        if is_restricted(&id, RESTRICTED_PREFIX) {
            return Err(format!(
                "Command id '{}' must not start with '{}'",
                id, RESTRICTED_PREFIX
            ));
        }

        for kind in SUPPORTED_COMMAND_TYPES {
            let Some(component) = dig(command, &[kind, "component"]).map(scalar_to_string) else {
                continue;
            };

            if is_restricted(&component, RESTRICTED_PREFIX) {
                return Err(format!(
                    "Component name '{}' for command id '{}' must not start with '{}'",
                    component, id, RESTRICTED_PREFIX
                ));
            }
        }
    }

    Ok(())
}

fn validate_events(devfile: &DevfileDocument) -> Result<(), String> {
    let Some(events) = devfile.get("events").and_then(Value::as_mapping) else {
        return Ok(());
    };

    for (event_type, names) in events {
        let event_type = scalar_to_string(event_type);
        if !SUPPORTED_EVENTS.contains(&event_type.as_str()) {
            return Err(format!("Event type '{}' is not yet supported", event_type));
        }

        let names = names.as_sequence().map(Vec::as_slice).unwrap_or(&[]);
        for name in names.iter().map(scalar_to_string) {
            if is_restricted(&name, RESTRICTED_PREFIX) {
                return Err(format!(
                    "Event '{}' of type '{}' must not start with '{}'",
                    name, event_type, RESTRICTED_PREFIX
                ));
            }
        }
    }

    Ok(())
}

fn validate_variables(devfile: &DevfileDocument) -> Result<(), String> {
    let Some(variables) = devfile.get("variables").and_then(Value::as_mapping) else {
        return Ok(());
    };

    for variable in variables.keys().map(scalar_to_string) {
        for prefix in [RESTRICTED_PREFIX, RESTRICTED_VARIABLE_PREFIX] {
            if is_restricted(&variable, prefix) {
                return Err(format!(
                    "Variable name '{}' must not start with '{}'",
                    variable, prefix
                ));
            }
        }
    }

    Ok(())
}
