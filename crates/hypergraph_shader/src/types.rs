// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader value types and their connection rules.
//!
//! Types are HLSL-style names: a raw type with optional dimensions
//! (`float`, `float3`, `float4x4`) and an optional `u` prefix for unsigned
//! variants (`uint2`). `color` is an alias of `float4`.

use hypergraph::{CompatibilityStrategy, ConnectionType, NodeItem};
use std::fmt;

/// A shader type name broken into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderType {
    /// Type without dimensions or unsigned prefix, lowercased
    pub raw: String,
    /// Vector length, or matrix row count
    pub rows: u8,
    /// Matrix column count; 1 for scalars and vectors
    pub columns: u8,
    /// Declared with a `u` prefix
    pub unsigned: bool,
}

fn digit(c: char) -> Option<u8> {
    c.to_digit(10).and_then(|d| u8::try_from(d).ok())
}

impl ShaderType {
    /// Break a type name into its parts.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if name.eq_ignore_ascii_case("color") {
            return Self {
                raw: "float".to_owned(),
                rows: 4,
                columns: 1,
                unsigned: false,
            };
        }

        let chars: Vec<char> = name.chars().collect();
        let len = chars.len();
        let mut rows = 1;
        let mut columns = 1;
        let mut end = len;
        if len > 1 {
            if let Some(last) = digit(chars[len - 1]) {
                match (len > 3).then(|| (digit(chars[len - 3]), chars[len - 2])) {
                    Some((Some(first), 'x')) => {
                        rows = first;
                        columns = last;
                        end -= 3;
                    }
                    _ => {
                        rows = last;
                        end -= 1;
                    }
                }
            }
        }
        let (start, unsigned) = if len > 1 && chars[0] == 'u' { (1, true) } else { (0, false) };
        let raw: String = chars[start.min(end)..end].iter().collect();

        Self {
            raw: raw.to_lowercase(),
            rows,
            columns,
            unsigned,
        }
    }

    /// Whether the raw type converts freely to the other numeric scalars.
    pub fn is_numeric(&self) -> bool {
        matches!(self.raw.as_str(), "float" | "int")
    }

    /// Whether values of `self` convert automatically to `destination`.
    ///
    /// Raw types must match, or both be numeric scalars, and the column
    /// count must agree: `float` to `float2` and `uint4` to `int2` convert,
    /// `float4x4` to `float4` does not.
    pub fn converts_to(&self, destination: &Self) -> bool {
        let same_base = self.raw == destination.raw;
        (same_base || (self.is_numeric() && destination.is_numeric())) && self.columns == destination.columns
    }

    /// Abbreviation shown next to connector names: first letter plus dimensions.
    pub fn short_name(name: &str) -> String {
        let chars: Vec<char> = name.chars().collect();
        let Some(first) = chars.first() else {
            return String::new();
        };
        let len = chars.len();
        let mut short = first.to_string();
        if chars[len - 1].is_ascii_digit() {
            if len > 2 && chars[len - 2] == 'x' && chars[len - 3].is_ascii_digit() {
                short.extend(&chars[len - 3..]);
            } else {
                short.push(chars[len - 1]);
            }
        }
        short
    }
}

impl fmt::Display for ShaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unsigned {
            f.write_str("u")?;
        }
        f.write_str(&self.raw)?;
        match (self.rows, self.columns) {
            (1, 1) => Ok(()),
            (rows, 1) => write!(f, "{rows}"),
            (rows, columns) => write!(f, "{rows}x{columns}"),
        }
    }
}

/// Whether a value of type `source` converts automatically to `destination`.
pub fn has_automatic_conversion(source: &str, destination: &str) -> bool {
    ShaderType::parse(source).converts_to(&ShaderType::parse(destination))
}

/// Compatibility of typed shader connectors; the type lives in the item tag.
///
/// Untyped to untyped is compatible, typed to untyped is not. Equal type
/// names (ignoring case) are compatible, automatic conversions are marked
/// as such.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShaderCompatibility;

impl ShaderCompatibility {
    /// Compatibility of two type names.
    pub fn between(from: Option<&str>, to: Option<&str>) -> ConnectionType {
        match (from, to) {
            (None, None) => ConnectionType::Compatible,
            (Some(from), Some(to)) if from.eq_ignore_ascii_case(to) => ConnectionType::Compatible,
            (Some(from), Some(to)) if has_automatic_conversion(from, to) => ConnectionType::Conversion,
            _ => ConnectionType::Incompatible,
        }
    }
}

impl CompatibilityStrategy for ShaderCompatibility {
    fn can_connect(&self, from: &NodeItem, to: &NodeItem) -> ConnectionType {
        Self::between(from.tag.as_deref(), to.tag.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_breakdown() {
        let t = ShaderType::parse("float4x3");
        assert_eq!((t.raw.as_str(), t.rows, t.columns, t.unsigned), ("float", 4, 3, false));
        let t = ShaderType::parse("uint2");
        assert_eq!((t.raw.as_str(), t.rows, t.columns, t.unsigned), ("int", 2, 1, true));
        let t = ShaderType::parse("Texture2D");
        assert_eq!((t.raw.as_str(), t.rows), ("texture2d", 1));
        assert_eq!(ShaderType::parse("color"), ShaderType::parse("float4"));
        assert_eq!(ShaderType::parse("u").raw, "u");
    }

    #[test]
    fn test_display_round_trips_name() {
        for name in ["float", "float3", "uint4", "float4x4"] {
            assert_eq!(ShaderType::parse(name).to_string(), name);
        }
    }

    #[test]
    fn test_automatic_conversions() {
        assert!(has_automatic_conversion("float", "float2"));
        assert!(has_automatic_conversion("float2", "float"));
        assert!(has_automatic_conversion("uint4", "int2"));
        assert!(has_automatic_conversion("int", "float"));
        assert!(has_automatic_conversion("color", "float4"));
        assert!(!has_automatic_conversion("float4x4", "float4"));
        assert!(!has_automatic_conversion("float", "Texture2D"));
    }

    #[test]
    fn test_compatibility_table() {
        use ConnectionType::*;
        assert_eq!(ShaderCompatibility::between(None, None), Compatible);
        assert_eq!(ShaderCompatibility::between(Some("float"), None), Incompatible);
        assert_eq!(ShaderCompatibility::between(None, Some("float")), Incompatible);
        assert_eq!(ShaderCompatibility::between(Some("Float3"), Some("float3")), Compatible);
        assert_eq!(ShaderCompatibility::between(Some("int"), Some("float")), Conversion);
        assert_eq!(ShaderCompatibility::between(Some("float4"), Some("color")), Conversion);
        assert_eq!(ShaderCompatibility::between(Some("float3x3"), Some("float3")), Incompatible);
    }

    #[test]
    fn test_short_names() {
        assert_eq!(ShaderType::short_name("float4"), "f4");
        assert_eq!(ShaderType::short_name("float4x4"), "f4x4");
        assert_eq!(ShaderType::short_name("int"), "i");
        assert_eq!(ShaderType::short_name(""), "");
    }
}
