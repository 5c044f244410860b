// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader fragment archives: the functions and parameter structs a shader
//! graph is built from, stored as RON.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Archive errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Reading or writing the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid archive
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Two functions or two parameter structs share a name
    #[error("Duplicate name in archive: {0}")]
    DuplicateName(String),
}

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Where the value of a parameter comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParameterSource {
    /// Material constant
    #[default]
    Material,
    /// Interpolated into the vertex shader
    InterpolatorIntoVertex,
    /// Interpolated into the pixel shader
    InterpolatorIntoPixel,
    /// Provided by the system
    System,
    /// Written by the shader
    Output,
    /// Literal constant
    Constant,
}

/// A named, typed parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderParameter {
    /// Parameter name
    pub name: String,
    /// Shader type name, e.g. `float3`
    #[serde(rename = "type")]
    pub type_name: String,
    /// Semantic, e.g. `SV_Position`
    #[serde(default)]
    pub semantic: Option<String>,
    /// Value source
    #[serde(default)]
    pub source: ParameterSource,
}

impl ShaderParameter {
    /// Create a material parameter
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            semantic: None,
            source: ParameterSource::Material,
        }
    }
}

/// A shader function usable as a procedure node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderFunction {
    /// Function name
    pub name: String,
    /// Input parameters in declaration order
    #[serde(default)]
    pub inputs: Vec<ShaderParameter>,
    /// Outputs; the return value is named `result`
    #[serde(default)]
    pub outputs: Vec<ShaderParameter>,
}

impl ShaderFunction {
    /// Comma-separated input list, e.g. `float3 a, float3 b`.
    pub fn parameters_string(&self) -> String {
        self.inputs
            .iter()
            .map(|p| format!("{} {}", p.type_name, p.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Signature for display, e.g. `float3 Add(float3 a, float3 b)`.
    pub fn signature(&self) -> String {
        let returns = match self.outputs.as_slice() {
            [single] => single.type_name.as_str(),
            _ => "void",
        };
        format!("{} {}({})", returns, self.name, self.parameters_string())
    }
}

/// A group of parameters usable as a parameter node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterStruct {
    /// Struct name
    pub name: String,
    /// Members in declaration order
    #[serde(default)]
    pub parameters: Vec<ShaderParameter>,
}

impl ParameterStruct {
    /// Struct body for display, one member per line.
    pub fn body_string(&self) -> String {
        self.parameters
            .iter()
            .map(|p| format!("{} {};", p.type_name, p.name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename = "FragmentArchive")]
struct ArchiveFile {
    #[serde(default)]
    functions: Vec<ShaderFunction>,
    #[serde(default)]
    parameter_structs: Vec<ParameterStruct>,
}

/// Functions and parameter structs of one shader source, by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentArchive {
    /// Archive name, usually the source path; prefixes parameter paths
    pub name: String,
    functions: IndexMap<String, ShaderFunction>,
    parameter_structs: IndexMap<String, ParameterStruct>,
}

impl FragmentArchive {
    /// Create an empty archive
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a function; fails when the name is taken.
    pub fn add_function(&mut self, function: ShaderFunction) -> Result<()> {
        if self.functions.contains_key(&function.name) {
            return Err(ArchiveError::DuplicateName(function.name));
        }
        self.functions.insert(function.name.clone(), function);
        Ok(())
    }

    /// Add a parameter struct; fails when the name is taken.
    pub fn add_parameter_struct(&mut self, parameters: ParameterStruct) -> Result<()> {
        if self.parameter_structs.contains_key(&parameters.name) {
            return Err(ArchiveError::DuplicateName(parameters.name));
        }
        self.parameter_structs.insert(parameters.name.clone(), parameters);
        Ok(())
    }

    /// Function by name
    pub fn function(&self, name: &str) -> Option<&ShaderFunction> {
        self.functions.get(name)
    }

    /// Functions in archive order
    pub fn functions(&self) -> impl Iterator<Item = &ShaderFunction> {
        self.functions.values()
    }

    /// Parameter struct by name
    pub fn parameter_struct(&self, name: &str) -> Option<&ParameterStruct> {
        self.parameter_structs.get(name)
    }

    /// Parameter structs in archive order
    pub fn parameter_structs(&self) -> impl Iterator<Item = &ParameterStruct> {
        self.parameter_structs.values()
    }

    /// Path of a parameter inside this archive: `archive:parameter`.
    pub fn parameter_path(&self, parameter: &str) -> String {
        format!("{}:{}", self.name, parameter)
    }

    /// Parse an archive from RON.
    pub fn from_ron(name: impl Into<String>, s: &str) -> Result<Self> {
        let file: ArchiveFile = ron::from_str(s)?;
        let mut archive = Self::new(name);
        for function in file.functions {
            archive.add_function(function)?;
        }
        for parameters in file.parameter_structs {
            archive.add_parameter_struct(parameters)?;
        }
        Ok(archive)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String> {
        let file = ArchiveFile {
            functions: self.functions.values().cloned().collect(),
            parameter_structs: self.parameter_structs.values().cloned().collect(),
        };
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(&file, config)?)
    }

    /// Load an archive; its name is the file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).inspect_err(|error| {
            tracing::warn!(path = %path.display(), %error, "failed to read fragment archive");
        })?;
        let archive = Self::from_ron(path.display().to_string(), &content)?;
        tracing::debug!(
            path = %path.display(),
            functions = archive.functions.len(),
            parameter_structs = archive.parameter_structs.len(),
            "loaded fragment archive"
        );
        Ok(archive)
    }

    /// Save the archive to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"
        FragmentArchive(
            functions: [
                (
                    name: "Add",
                    inputs: [(name: "a", type: "float3"), (name: "b", type: "float3")],
                    outputs: [(name: "result", type: "float3")],
                ),
                (
                    name: "Saturate",
                    inputs: [(name: "value", type: "float")],
                    outputs: [(name: "result", type: "float")],
                ),
            ],
            parameter_structs: [
                (
                    name: "Surface",
                    parameters: [
                        (name: "albedo", type: "float3"),
                        (name: "roughness", type: "float", source: Constant),
                    ],
                ),
            ],
        )
    "#;

    pub(crate) fn sample() -> FragmentArchive {
        FragmentArchive::from_ron("lib/basic.sh", SAMPLE).expect("sample archive")
    }

    #[test]
    fn test_parse_sample() {
        let archive = sample();
        assert_eq!(archive.functions().count(), 2);
        let add = archive.function("Add").expect("Add");
        assert_eq!(add.signature(), "float3 Add(float3 a, float3 b)");
        let surface = archive.parameter_struct("Surface").expect("Surface");
        assert_eq!(surface.parameters[1].source, ParameterSource::Constant);
        assert_eq!(surface.parameters[0].source, ParameterSource::Material);
        assert_eq!(surface.body_string(), "float3 albedo;\nfloat roughness;");
        assert_eq!(archive.parameter_path("albedo"), "lib/basic.sh:albedo");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut archive = sample();
        let again = archive.function("Add").cloned().expect("Add");
        assert!(matches!(archive.add_function(again), Err(ArchiveError::DuplicateName(name)) if name == "Add"));
    }

    #[test]
    fn test_ron_roundtrip_keeps_order() {
        let archive = sample();
        let ron_str = archive.to_ron().expect("serialize");
        let back = FragmentArchive::from_ron("lib/basic.sh", &ron_str).expect("parse serialized");
        assert_eq!(back, archive);
        let names: Vec<_> = back.functions().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Add", "Saturate"]);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join(format!("fragments-{}.ron", uuid::Uuid::new_v4()));
        assert!(matches!(FragmentArchive::load(&path), Err(ArchiveError::Io(_))));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("fragments-{}.ron", uuid::Uuid::new_v4()));
        let archive = sample();
        archive.save(&path).expect("save");
        let loaded = FragmentArchive::load(&path).expect("load");
        assert_eq!(loaded.function("Saturate"), archive.function("Saturate"));
        assert_eq!(loaded.name, path.display().to_string());
        let _ = std::fs::remove_file(&path);
    }
}
