//! Project cloner injection
//!
//! Adds a `gl-cloner-injector` component that clones the project into the
//! data volume before the workspace starts. The clone is skipped when the
//! directory already exists, so restarts keep local changes.

use serde_yaml::Value;

use super::DevfilePrepared;
use crate::config::Config;
use crate::domain::devfile::{map, string, strings};

pub const PROJECT_CLONER_COMPONENT: &str = "gl-cloner-injector";
pub const PROJECT_CLONER_COMMAND: &str = "gl-cloner-injector-command";

pub fn inject(mut prepared: DevfilePrepared, config: &Config) -> DevfilePrepared {
    let params = &prepared.request.params;
    let clone_dir = format!("{}/{}", prepared.volume.path, params.project.path);
    let script = clone_script(&params.project.http_url_to_repo, &params.devfile_ref, &clone_dir);

    let component = map([
        ("name", string(PROJECT_CLONER_COMPONENT)),
        (
            "container",
            map([
                ("image", string(&config.project_cloner_image)),
                (
                    "volumeMounts",
                    Value::Sequence(vec![map([
                        ("name", string(&prepared.volume.name)),
                        ("path", string(&prepared.volume.path)),
                    ])]),
                ),
                ("command", strings(["/bin/sh", "-c"])),
                ("args", strings([script])),
                ("memoryLimit", string("128Mi")),
                ("memoryRequest", string("32Mi")),
                ("cpuLimit", string("500m")),
                ("cpuRequest", string("30m")),
            ]),
        ),
    ]);

    let devfile = &mut prepared.processed_devfile;
    devfile.components_mut().push(component);
    devfile.commands_mut().push(map([
        ("id", string(PROJECT_CLONER_COMMAND)),
        (
            "apply",
            map([("component", string(PROJECT_CLONER_COMPONENT))]),
        ),
    ]));
    devfile
        .pre_start_events_mut()
        .push(string(PROJECT_CLONER_COMMAND));

    prepared
}

/// Shell script cloning `ref` of `url` into `clone_dir` unless it exists
pub fn clone_script(url: &str, git_ref: &str, clone_dir: &str) -> String {
    format!(
        "if [ ! -d '{}' ];\nthen\n  git clone --branch {} {} {};\nfi",
        clone_dir,
        shell_escape(git_ref),
        shell_escape(url),
        shell_escape(clone_dir),
    )
}

/// Escape a word for a POSIX shell by backslash-quoting every character
/// outside a conservative safe set
pub fn shell_escape(word: &str) -> String {
    if word.is_empty() {
        return "''".to_string();
    }

    let mut escaped = String::with_capacity(word.len() * 2);
    for c in word.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '-' | '.' | ',' | ':' | '+' | '/' | '@' => {
                escaped.push(c)
            }
            '\n' => escaped.push_str("'\n'"),
            _ => {
                escaped.push('\\');
                escaped.push(c);
            }
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sqlite::testing::{create_test_pool, seed};
    use crate::service::create::testing::{prepared, VALID_DEVFILE};

    #[test]
    fn test_shell_escape() {
        assert_eq!(shell_escape(""), "''");
        assert_eq!(shell_escape("main"), "main");
        assert_eq!(
            shell_escape("http://localhost/group/project.git"),
            "http://localhost/group/project.git"
        );
        assert_eq!(shell_escape("feature/a b"), "feature/a\\ b");
        assert_eq!(shell_escape("x;rm -rf /"), "x\\;rm\\ -rf\\ /");
        assert_eq!(shell_escape("it's"), "it\\'s");
    }

    #[test]
    fn test_clone_script() {
        assert_eq!(
            clone_script(
                "http://localhost/test-group/test-project.git",
                "main",
                "/projects/test-project"
            ),
            "if [ ! -d '/projects/test-project' ];\nthen\n  git clone --branch main http://localhost/test-group/test-project.git /projects/test-project;\nfi"
        );
    }

    #[tokio::test]
    async fn test_inject_cloner() {
        let pool = create_test_pool().await;
        let fixtures = seed(&pool).await;
        let config = Config::default();

        let injected = inject(prepared(&fixtures, VALID_DEVFILE, &config), &config);
        let devfile = &injected.processed_devfile;

        let cloner = devfile
            .components()
            .last()
            .expect("cloner component");
        assert_eq!(cloner["name"], string("gl-cloner-injector"));
        assert_eq!(cloner["container"]["image"], string("alpine/git:2.36.3"));
        assert_eq!(cloner["container"]["command"], strings(["/bin/sh", "-c"]));
        assert_eq!(
            cloner["container"]["args"],
            strings([clone_script(
                "http://localhost/test-group/test-project.git",
                "main",
                "/projects/test-project"
            )])
        );
        assert_eq!(
            cloner["container"]["volumeMounts"][0]["name"],
            string("gl-workspace-data")
        );

        let command = devfile.commands().last().expect("cloner command");
        assert_eq!(command["id"], string("gl-cloner-injector-command"));
        assert_eq!(command["apply"]["component"], string("gl-cloner-injector"));
        assert_eq!(
            devfile.get("events").map(|events| &events["preStart"]),
            Some(&strings(["gl-cloner-injector-command"]))
        );
    }
}
