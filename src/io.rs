//! File loading and position write-back
//!
//! Topology and configuration files are JSON or YAML, chosen by extension.
//! Positions are always written as JSON `{ "id": [x, y, z] }`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::graph_types::Topology;
use crate::layout::{ConfigError, SimulationConfig};

/// Errors that can occur during reading or writing
#[derive(Error, Debug)]
pub enum IoError {
    /// The file format is not supported
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file extension could not be determined
    #[error("could not determine file format from path: {0}")]
    UnknownExtension(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The file parsed but holds out-of-range values
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for reader/writer operations
pub type IoResult<T> = Result<T, IoError>;

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Detect the format from a path's extension (case insensitive)
    pub fn from_path(path: &Path) -> IoResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| IoError::UnknownExtension(path.display().to_string()))?;

        match ext.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            _ => Err(IoError::UnsupportedFormat(ext.to_string())),
        }
    }

    fn parse<T: DeserializeOwned>(self, content: &str) -> IoResult<T> {
        Ok(match self {
            Format::Json => serde_json::from_str(content)?,
            Format::Yaml => serde_yaml::from_str(content)?,
        })
    }
}

fn read_file<T: DeserializeOwned>(path: &Path) -> IoResult<T> {
    let format = Format::from_path(path)?;
    let content = fs::read_to_string(path)?;
    format.parse(&content)
}

/// Load a topology file
pub fn load_topology(path: &Path) -> IoResult<Topology> {
    read_file(path)
}

/// Load and validate a configuration file
pub fn load_config(path: &Path) -> IoResult<SimulationConfig> {
    let config: SimulationConfig = read_file(path)?;
    config.validate()?;
    Ok(config)
}

/// Positions keyed by node id, sorted for stable output
pub fn positions_to_json(positions: &HashMap<String, Vec3>) -> IoResult<String> {
    let sorted: BTreeMap<&str, [f32; 3]> = positions
        .iter()
        .map(|(id, p)| (id.as_str(), p.to_array()))
        .collect();
    Ok(serde_json::to_string_pretty(&sorted)?)
}

/// Write positions as JSON
pub fn write_positions(positions: &HashMap<String, Vec3>, output: &Path) -> IoResult<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output, positions_to_json(positions)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(Format::from_path(Path::new("a.json")).unwrap(), Format::Json);
        assert_eq!(Format::from_path(Path::new("a.YAML")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.yml")).unwrap(), Format::Yaml);
    }

    #[test]
    fn unknown_formats_rejected() {
        assert!(matches!(
            Format::from_path(&PathBuf::from("graph.xml")),
            Err(IoError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            Format::from_path(Path::new("noextension")),
            Err(IoError::UnknownExtension(_))
        ));
    }

    #[test]
    fn loads_yaml_config() {
        let file = temp_file(
            ".yaml",
            "repulsionStrength: 200.0\nidealEdgeLength: 4.0\nuseBarnesHut: false\n",
        );
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.repulsion_strength, 200.0);
        assert_eq!(config.ideal_edge_length, 4.0);
        assert!(!config.use_barnes_hut);
    }

    #[test]
    fn config_with_unknown_key_fails_to_parse() {
        let file = temp_file(".json", r#"{"repulsion": 10}"#);
        assert!(matches!(load_config(file.path()), Err(IoError::Json(_))));
    }

    #[test]
    fn out_of_range_config_fails_validation() {
        let file = temp_file(".json", r#"{"coolingRate": 1.5}"#);
        let err = load_config(file.path()).unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"invalid configuration: coolingRate must be within (0, 1] (got 1.5)"
        );
    }

    #[test]
    fn loads_json_topology() {
        let file = temp_file(
            ".json",
            r#"{"nodes": [{"id": "r", "type": "risk"}], "edges": []}"#,
        );
        let topology = load_topology(file.path()).unwrap();
        assert_eq!(topology.nodes.len(), 1);
    }

    #[test]
    fn positions_are_sorted_by_id() {
        let positions = HashMap::from([
            ("b".to_string(), Vec3::new(1.0, 2.0, 3.0)),
            ("a".to_string(), Vec3::new(-1.5, 0.0, 0.25)),
        ]);
        let json = positions_to_json(&positions).unwrap();
        insta::assert_snapshot!(json, @r#"
        {
          "a": [
            -1.5,
            0.0,
            0.25
          ],
          "b": [
            1.0,
            2.0,
            3.0
          ]
        }
        "#);
    }

    #[test]
    fn write_positions_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested").join("positions.json");
        let positions = HashMap::from([("n".to_string(), Vec3::ZERO)]);

        write_positions(&positions, &output).unwrap();

        let written: HashMap<String, [f32; 3]> =
            serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(written["n"], [0.0, 0.0, 0.0]);
    }
}
