// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection compatibility strategies.

use crate::connector::ConnectionType;
use crate::item::NodeItem;

/// Decides whether an output item may feed an input item.
///
/// Called during drags for every candidate connector, so implementations
/// should be pure and cheap.
pub trait CompatibilityStrategy {
    /// Compatibility of `from` (output side) with `to` (input side).
    fn can_connect(&self, from: &NodeItem, to: &NodeItem) -> ConnectionType;
}

/// Allows every connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysCompatible;

impl CompatibilityStrategy for AlwaysCompatible {
    fn can_connect(&self, _from: &NodeItem, _to: &NodeItem) -> ConnectionType {
        ConnectionType::Compatible
    }
}

/// Compares item tags literally: equal or both untagged is compatible.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagCompatibility;

impl CompatibilityStrategy for TagCompatibility {
    fn can_connect(&self, from: &NodeItem, to: &NodeItem) -> ConnectionType {
        if from.tag == to.tag {
            ConnectionType::Compatible
        } else {
            ConnectionType::Incompatible
        }
    }
}

impl<F> CompatibilityStrategy for F
where
    F: Fn(&NodeItem, &NodeItem) -> ConnectionType,
{
    fn can_connect(&self, from: &NodeItem, to: &NodeItem) -> ConnectionType {
        self(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::LabelItem;

    fn tagged(tag: Option<&str>) -> NodeItem {
        let item = NodeItem::new(LabelItem::new("x"));
        match tag {
            Some(tag) => item.with_tag(tag),
            None => item,
        }
    }

    #[test]
    fn test_tag_compatibility() {
        let strategy = TagCompatibility;
        assert_eq!(
            strategy.can_connect(&tagged(Some("float")), &tagged(Some("float"))),
            ConnectionType::Compatible
        );
        assert_eq!(
            strategy.can_connect(&tagged(Some("float")), &tagged(Some("int"))),
            ConnectionType::Incompatible
        );
        assert_eq!(strategy.can_connect(&tagged(None), &tagged(None)), ConnectionType::Compatible);
    }

    #[test]
    fn test_closure_strategy() {
        let strategy = |_: &NodeItem, _: &NodeItem| ConnectionType::Conversion;
        assert_eq!(
            strategy.can_connect(&tagged(None), &tagged(None)),
            ConnectionType::Conversion
        );
        assert_eq!(
            AlwaysCompatible.can_connect(&tagged(Some("a")), &tagged(Some("b"))),
            ConnectionType::Compatible
        );
    }
}
