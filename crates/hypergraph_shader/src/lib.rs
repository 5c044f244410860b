// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader graph editing on top of `hypergraph`.
//!
//! - [`ShaderCompatibility`] connects typed shader connectors, allowing
//!   automatic conversions such as `float` to `float3`
//! - [`FragmentArchive`] holds the functions and parameter structs nodes
//!   are made from, stored as RON
//! - [`NodeFactory`] builds procedure, parameter and captures nodes
//! - [`ShaderDocument`] ties the model and factory together and keeps
//!   node previews in step with the shader structure

pub mod archive;
pub mod document;
pub mod factory;
pub mod items;
pub mod types;

pub use archive::{ArchiveError, FragmentArchive, ParameterSource, ParameterStruct, ShaderFunction, ShaderParameter};
pub use document::{PreviewBuilder, PreviewRequest, PreviewSettings, ShaderDocument};
pub use factory::{visible_name, NodeFactory, ShaderNodeKind, ShaderNodeTag};
pub use items::{AddParameterItem, ParameterItem, PreviewGeometry, PreviewItem, PREVIEW_SIZE};
pub use types::{has_automatic_conversion, ShaderCompatibility, ShaderType};
