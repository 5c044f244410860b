// SPDX-License-Identifier: MIT OR Apache-2.0
//! Model notifications and the revision sequence.

use crate::connection::NodeConnection;
use crate::connector::ConnectorRef;
use crate::node::Node;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

/// Answer of a "before" notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    /// Let the mutation happen
    #[default]
    Proceed,
    /// Undo the tentative mutation
    Veto,
}

impl Verdict {
    /// Whether this is a veto
    pub fn is_veto(self) -> bool {
        self == Self::Veto
    }
}

/// Receives model change notifications.
///
/// Every method has a no-op default that proceeds, so observers implement
/// only what they need. Notifications are delivered synchronously, in
/// registration order, to every observer; a single veto cancels.
pub trait GraphObserver {
    /// A node has been inserted; a veto removes it again.
    fn node_added(&mut self, _node: &Node) -> Verdict {
        Verdict::Proceed
    }

    /// A node is about to be removed.
    fn node_removing(&mut self, _node: &Node) -> Verdict {
        Verdict::Proceed
    }

    /// A node has been removed.
    fn node_removed(&mut self, _node: &Node) {}

    /// Pre-check before a connection between two connectors is allowed.
    fn connection_adding(&mut self, _from: ConnectorRef, _to: ConnectorRef) -> Verdict {
        Verdict::Proceed
    }

    /// A connection has been attached; a veto disconnects it again.
    fn connection_added(&mut self, _connection: &NodeConnection) -> Verdict {
        Verdict::Proceed
    }

    /// A connection is about to be detached.
    fn connection_removing(&mut self, _connection: &NodeConnection) -> Verdict {
        Verdict::Proceed
    }

    /// A connection has been detached; `connection` already has its endpoints cleared.
    fn connection_removed(
        &mut self,
        _from: Option<ConnectorRef>,
        _to: Option<ConnectorRef>,
        _connection: &NodeConnection,
    ) {
    }

    /// Views should re-layout and redraw.
    fn invalidate_views(&mut self) {}
}

pub(crate) fn ask(
    observers: &mut [Box<dyn GraphObserver>],
    mut question: impl FnMut(&mut dyn GraphObserver) -> Verdict,
) -> Verdict {
    let mut verdict = Verdict::Proceed;
    for observer in observers.iter_mut() {
        if question(observer.as_mut()).is_veto() {
            verdict = Verdict::Veto;
        }
    }
    verdict
}

pub(crate) fn tell(observers: &mut [Box<dyn GraphObserver>], mut message: impl FnMut(&mut dyn GraphObserver)) {
    for observer in observers.iter_mut() {
        message(observer.as_mut());
    }
}

/// Monotonic revision sequence, shareable between models.
///
/// Models draw a new index from their sequence on every structural change.
/// Clones share the same counter.
#[derive(Debug, Clone)]
pub struct RevisionSequence(Arc<AtomicU32>);

impl RevisionSequence {
    /// A fresh sequence starting at zero.
    pub fn new() -> Self {
        Self(Arc::new(AtomicU32::new(0)))
    }

    /// The process-wide sequence models use by default.
    pub fn global() -> Self {
        static GLOBAL: OnceLock<RevisionSequence> = OnceLock::new();
        GLOBAL.get_or_init(Self::new).clone()
    }

    /// Draw the next index.
    pub fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Last index drawn.
    pub fn current(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    /// Whether two handles share a counter.
    pub fn same_sequence(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for RevisionSequence {
    fn default() -> Self {
        Self::global()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Vetoer;

    impl GraphObserver for Vetoer {
        fn node_added(&mut self, _node: &Node) -> Verdict {
            Verdict::Veto
        }
    }

    struct Counter(u32);

    impl GraphObserver for Counter {
        fn node_added(&mut self, _node: &Node) -> Verdict {
            self.0 += 1;
            Verdict::Proceed
        }
    }

    #[test]
    fn test_any_veto_cancels_and_everyone_is_asked() {
        let mut observers: Vec<Box<dyn GraphObserver>> = vec![Box::new(Vetoer), Box::new(Counter(0))];
        let node = Node::new("n");
        let verdict = ask(&mut observers, |o| o.node_added(&node));
        assert!(verdict.is_veto());

        let mut proceeding: Vec<Box<dyn GraphObserver>> = vec![Box::new(Counter(0))];
        assert_eq!(ask(&mut proceeding, |o| o.node_added(&node)), Verdict::Proceed);
    }

    #[test]
    fn test_sequence_is_monotonic_and_shared() {
        let sequence = RevisionSequence::new();
        let shared = sequence.clone();
        let first = sequence.next();
        let second = shared.next();
        assert!(second > first);
        assert_eq!(sequence.current(), second);
        assert!(sequence.same_sequence(&shared));
        assert!(!sequence.same_sequence(&RevisionSequence::new()));
        assert!(RevisionSequence::global().same_sequence(&RevisionSequence::default()));
    }
}
