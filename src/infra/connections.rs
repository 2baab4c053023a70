//! Generated connection bundle
//!
//! Collects the `create_connection` setup steps of a session's tests into a
//! `connections.json` the app loads via `TERMIHUB_CONFIG_DIR`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::catalog::TestDefinition;
use crate::common::{Error, Result};

/// File name the app reads from its config directory
pub const CONNECTIONS_FILE: &str = "connections.json";

/// Folder grouping the generated connections in the sidebar
pub const FOLDER_NAME: &str = "Manual Test Connections";

/// Top-level connection store document
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ConnectionBundle {
    pub version: String,
    pub children: Vec<FolderNode>,
    pub agents: Vec<serde_json::Value>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    #[serde(rename = "type")]
    pub node_type: &'static str,
    pub name: String,
    pub is_expanded: bool,
    pub children: Vec<ConnectionNode>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ConnectionNode {
    #[serde(rename = "type")]
    pub node_type: &'static str,
    pub name: String,
    pub config: ConnectionConfig,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub config: serde_json::Value,
}

impl ConnectionBundle {
    /// Number of generated connections
    pub fn connection_count(&self) -> usize {
        self.children.iter().map(|f| f.children.len()).sum()
    }
}

/// Build the bundle for `tests`
///
/// Connections are deduplicated by name; the first test to declare a name
/// decides its configuration.
pub fn build_connection_bundle(tests: &[TestDefinition]) -> ConnectionBundle {
    let mut seen = HashSet::new();
    let connections: Vec<ConnectionNode> = tests
        .iter()
        .flat_map(TestDefinition::connections)
        .filter(|spec| seen.insert(spec.name.clone()))
        .map(|spec| ConnectionNode {
            node_type: "connection",
            name: spec.name.clone(),
            config: ConnectionConfig {
                kind: spec.kind.clone(),
                config: spec.config.clone(),
            },
        })
        .collect();

    let children = if connections.is_empty() {
        Vec::new()
    } else {
        vec![FolderNode {
            node_type: "folder",
            name: FOLDER_NAME.to_string(),
            is_expanded: true,
            children: connections,
        }]
    };

    ConnectionBundle {
        version: "2".to_string(),
        children,
        agents: Vec::new(),
    }
}

/// Write `bundle` as `connections.json` inside `dir`
pub fn write_bundle(dir: &Path, bundle: &ConnectionBundle) -> Result<PathBuf> {
    let path = dir.join(CONNECTIONS_FILE);
    let json = serde_json::to_string_pretty(bundle)?;
    std::fs::write(&path, json)
        .map_err(|e| Error::Infra(format!("Failed to write {}: {}", path.display(), e)))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_with_setup(id: &str, setup_yaml: &str) -> TestDefinition {
        serde_yaml::from_str(&format!("id: {}\nname: {}\nsetup:\n{}", id, id, setup_yaml)).unwrap()
    }

    #[test]
    fn test_no_connections_gives_empty_children() {
        let tests = vec![test_with_setup("T1", "  - \"just info\"\n")];
        let bundle = build_connection_bundle(&tests);
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"version": "2", "children": [], "agents": []})
        );
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let first = test_with_setup(
            "T1",
            "  - create_connection:\n      name: A\n      type: ssh\n      config:\n        host: first\n",
        );
        let second = test_with_setup(
            "T2",
            r#"  - create_connection:
      name: A
      type: ssh
      config:
        host: second
  - create_connection:
      name: B
      type: serial
"#,
        );

        let bundle = build_connection_bundle(&[first, second]);
        assert_eq!(bundle.connection_count(), 2);

        let json = serde_json::to_value(&bundle).unwrap();
        let folder = &json["children"][0];
        assert_eq!(folder["type"], "folder");
        assert_eq!(folder["name"], FOLDER_NAME);
        assert_eq!(folder["isExpanded"], true);

        let conns = folder["children"].as_array().unwrap();
        let named_a: Vec<_> = conns.iter().filter(|c| c["name"] == "A").collect();
        assert_eq!(named_a.len(), 1);
        assert_eq!(
            named_a[0]["config"],
            serde_json::json!({"type": "ssh", "config": {"host": "first"}})
        );
        assert_eq!(conns[1]["name"], "B");
        assert_eq!(conns[1]["type"], "connection");
        assert_eq!(conns[1]["config"]["config"], serde_json::json!({}));
    }

    #[test]
    fn test_write_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = build_connection_bundle(&[]);
        let path = write_bundle(dir.path(), &bundle).unwrap();
        assert_eq!(path, dir.path().join("connections.json"));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["version"], "2");
    }
}
