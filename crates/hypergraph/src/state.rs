// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transient render-state flags, kept per interaction in an overlay map.

use crate::connection::ConnectionId;
use crate::connector::ConnectorRef;
use crate::item::ItemId;
use crate::node::NodeId;
use std::collections::HashMap;
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Set of visual state flags of one element.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderState(u16);

// Each flag becomes a single-bit constant and an entry of the debug name table.
macro_rules! render_flags {
    ($($(#[$doc:meta])* $flag:ident = $bit:literal;)*) => {
        impl RenderState {
            $($(#[$doc])* pub const $flag: Self = Self(1 << $bit);)*

            const NAMES: &'static [(Self, &'static str)] = &[$((Self::$flag, stringify!($flag))),*];
        }
    };
}

macro_rules! bit_ops {
    ($($op:ident $method:ident $assign:ident $assign_method:ident => $sym:tt;)*) => {$(
        impl $op for RenderState {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self {
                Self(self.0 $sym rhs.0)
            }
        }

        impl $assign for RenderState {
            fn $assign_method(&mut self, rhs: Self) {
                *self = $op::$method(*self, rhs);
            }
        }
    )*};
}

render_flags! {
    /// Under the pointer.
    HOVER = 0;
    /// Being dragged.
    DRAGGING = 1;
    /// Part of the focus/selection.
    FOCUS = 2;
    /// Connects to the dragged connector without conversion.
    COMPATIBLE = 3;
    /// Cannot connect to the dragged connector.
    INCOMPATIBLE = 4;
    /// Connects to the dragged connector through a conversion.
    CONVERSION = 5;
    /// A connection drag is hovering over the node.
    DRAGGED_OVER = 6;
    /// The connector has at least one connection.
    CONNECTED = 7;
}

bit_ops! {
    BitOr bitor BitOrAssign bitor_assign => |;
    BitAnd bitand BitAndAssign bitand_assign => &;
}

impl RenderState {
    /// No flags.
    pub const NONE: Self = Self(0);

    /// The three compatibility flags.
    pub const COMPATIBILITY: Self = Self(Self::COMPATIBLE.0 | Self::INCOMPATIBLE.0 | Self::CONVERSION.0);

    /// Whether every flag of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self & other == other
    }

    /// Whether any flag of `other` is set.
    pub fn intersects(self, other: Self) -> bool {
        !(self & other).is_empty()
    }

    /// Whether no flag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Set the flags of `other`.
    pub fn insert(&mut self, other: Self) {
        *self |= other;
    }

    /// Clear the flags of `other`.
    pub fn remove(&mut self, other: Self) {
        *self &= !other;
    }

    /// Set or clear the flags of `other`.
    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl Not for RenderState {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for &(flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Key of an element in the render-state overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKey {
    /// A node
    Node(NodeId),
    /// A node item
    Item(ItemId),
    /// A connector facet
    Connector(ConnectorRef),
    /// A connection
    Connection(ConnectionId),
}

/// Render-state overlay: element key to flags.
///
/// Owned by the controller; elements themselves carry no visual state.
#[derive(Debug, Clone, Default)]
pub struct RenderStates {
    states: HashMap<ElementKey, RenderState>,
}

impl RenderStates {
    /// Create an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags of an element, `NONE` if never set.
    pub fn get(&self, key: ElementKey) -> RenderState {
        self.states.get(&key).copied().unwrap_or_default()
    }

    /// Set or clear flags on one element.
    pub fn set(&mut self, key: ElementKey, flags: RenderState, value: bool) {
        if value {
            self.states.entry(key).or_default().insert(flags);
        } else if let Some(state) = self.states.get_mut(&key) {
            state.remove(flags);
            if state.is_empty() {
                self.states.remove(&key);
            }
        }
    }

    /// Replace the compatibility flags of one element.
    pub fn set_compatibility(&mut self, key: ElementKey, flags: RenderState) {
        self.set(key, RenderState::COMPATIBILITY, false);
        self.set(key, flags & RenderState::COMPATIBILITY, true);
    }

    /// Clear flags on every element.
    pub fn clear_all(&mut self, flags: RenderState) {
        for state in self.states.values_mut() {
            state.remove(flags);
        }
        self.states.retain(|_, state| !state.is_empty());
    }

    /// Keys of every element carrying all of `flags`.
    pub fn keys_with(&self, flags: RenderState) -> impl Iterator<Item = ElementKey> + '_ {
        self.states
            .iter()
            .filter(move |(_, state)| state.contains(flags))
            .map(|(key, _)| *key)
    }

    /// Drop every flag.
    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_operations() {
        let mut state = RenderState::HOVER | RenderState::FOCUS;
        assert!(state.contains(RenderState::HOVER));
        assert!(!state.contains(RenderState::HOVER | RenderState::DRAGGING));
        assert!(state.intersects(RenderState::HOVER | RenderState::DRAGGING));

        state.remove(RenderState::HOVER);
        assert_eq!(state, RenderState::FOCUS);
        state.set(RenderState::CONVERSION, true);
        assert_eq!(state & RenderState::COMPATIBILITY, RenderState::CONVERSION);
        assert_eq!(format!("{state:?}"), "FOCUS | CONVERSION");
        assert_eq!(format!("{:?}", RenderState::NONE), "NONE");
    }

    #[test]
    fn test_flags_are_distinct_bits() {
        let mut all = RenderState::NONE;
        for &(flag, _) in RenderState::NAMES {
            assert_eq!(flag.0.count_ones(), 1);
            assert!(!all.intersects(flag));
            all |= flag;
        }
        assert_eq!(RenderState::NAMES.len(), 8);
        assert!(all.contains(RenderState::COMPATIBILITY));
        assert_eq!(format!("{:?}", RenderState::DRAGGED_OVER | RenderState::HOVER), "HOVER | DRAGGED_OVER");

        let mut state = all;
        state &= RenderState::COMPATIBILITY;
        assert_eq!(state, RenderState::COMPATIBILITY);
    }

    #[test]
    fn test_overlay_set_and_clear() {
        let a = ElementKey::Node(NodeId::new());
        let b = ElementKey::Node(NodeId::new());
        let mut states = RenderStates::new();

        states.set(a, RenderState::HOVER | RenderState::FOCUS, true);
        states.set(b, RenderState::FOCUS, true);
        assert_eq!(states.keys_with(RenderState::FOCUS).count(), 2);

        states.clear_all(RenderState::FOCUS);
        assert_eq!(states.get(a), RenderState::HOVER);
        assert_eq!(states.get(b), RenderState::NONE);

        states.set(a, RenderState::HOVER, false);
        assert_eq!(states.keys_with(RenderState::NONE).count(), 0);
    }

    #[test]
    fn test_set_compatibility_replaces_previous_flags() {
        let key = ElementKey::Item(ItemId::new());
        let mut states = RenderStates::new();
        states.set(key, RenderState::HOVER | RenderState::INCOMPATIBLE, true);
        states.set_compatibility(key, RenderState::CONVERSION | RenderState::FOCUS);
        assert_eq!(states.get(key), RenderState::HOVER | RenderState::CONVERSION);
    }
}
