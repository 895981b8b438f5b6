//! Editor injection
//!
//! The component marked with `gl/inject-editor` is turned into the editor
//! host: it starts the editor server from the data volume and exposes it on
//! the editor port. A `gl-editor-injector` component copies the editor into
//! the data volume before the workspace starts.

use serde_yaml::Value;

use super::DevfilePrepared;
use crate::config::Config;
use crate::domain::devfile::{
    dig, ensure_mapping, is_truthy, map, number, sequence_entry, string, strings,
    INJECT_EDITOR_ATTRIBUTE,
};
use crate::domain::workspace::WORKSPACE_EDITOR_PORT;

pub const EDITOR_INJECTOR_COMPONENT: &str = "gl-editor-injector";
pub const EDITOR_INJECTOR_COMMAND: &str = "gl-editor-injector-command";
const EDITOR_ENDPOINT: &str = "editor-server";

pub fn inject(mut prepared: DevfilePrepared, config: &Config) -> DevfilePrepared {
    let editor_dir = format!("{}/.gl-editor", prepared.volume.path);
    let env = vec![
        map([
            ("name", string("EDITOR_VOLUME_DIR")),
            ("value", string(&editor_dir)),
        ]),
        map([
            ("name", string("EDITOR_PORT")),
            ("value", string(WORKSPACE_EDITOR_PORT.to_string())),
        ]),
    ];

    let devfile = &mut prepared.processed_devfile;
    let components = devfile.components_mut();

    let editor_host = components.iter_mut().find(|component| {
        dig(component, &["attributes", INJECT_EDITOR_ATTRIBUTE]).is_some_and(is_truthy)
    });
    if let Some(component) = editor_host {
        override_editor_host(component, &editor_dir, &env);
    }

    components.push(map([
        ("name", string(EDITOR_INJECTOR_COMPONENT)),
        (
            "container",
            map([
                ("image", string(&config.editor_injector_image)),
                (
                    "volumeMounts",
                    Value::Sequence(vec![map([
                        ("name", string(&prepared.volume.name)),
                        ("path", string(&prepared.volume.path)),
                    ])]),
                ),
                ("env", Value::Sequence(env)),
                ("memoryLimit", string("128Mi")),
                ("memoryRequest", string("32Mi")),
                ("cpuLimit", string("500m")),
                ("cpuRequest", string("30m")),
            ]),
        ),
    ]));

    devfile.commands_mut().push(map([
        ("id", string(EDITOR_INJECTOR_COMMAND)),
        (
            "apply",
            map([("component", string(EDITOR_INJECTOR_COMPONENT))]),
        ),
    ]));
    devfile
        .pre_start_events_mut()
        .push(string(EDITOR_INJECTOR_COMMAND));

    prepared
}

fn override_editor_host(component: &mut Value, editor_dir: &str, env: &[Value]) {
    let container = ensure_mapping(component)
        .entry(Value::from("container"))
        .or_insert(Value::Null);

    ensure_mapping(container).insert(
        Value::from("command"),
        strings([format!("{}/start_server.sh", editor_dir)]),
    );
    sequence_entry(container, "env").extend(env.iter().cloned());
    sequence_entry(container, "endpoints").push(map([
        ("name", string(EDITOR_ENDPOINT)),
        ("targetPort", number(u64::from(WORKSPACE_EDITOR_PORT))),
        ("exposure", string("public")),
        ("secure", Value::Bool(true)),
        ("protocol", string("https")),
    ]));
}
