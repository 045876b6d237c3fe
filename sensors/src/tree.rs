/*
 * sensors-rs - hardware sensor monitoring library for x86 PCs
 * Copyright (c) 2024-2026  The sensors-rs contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! The hierarchical namespace chips live in (`/motherboard/lpc/sio0`, `/cpu/0`, …) and a
//! pre-order visitor over it. Generic over the payload type so tests don't need a real
//! [`crate::chip::SensorChip`] to exercise tree mechanics.

use std::collections::BTreeMap;

/// A node keyed by one path segment, owning zero or more payloads and child nodes.
/// Path segments never contain `/`.
pub struct SensorTreeNode<P> {
    payloads: Vec<P>,
    children: BTreeMap<String, Box<SensorTreeNode<P>>>,
}

impl<P> Default for SensorTreeNode<P> {
    fn default() -> Self {
        Self {
            payloads: Vec::new(),
            children: BTreeMap::new(),
        }
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl<P> SensorTreeNode<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payloads(&self) -> &[P] {
        &self.payloads
    }

    pub fn push(&mut self, payload: P) {
        self.payloads.push(payload);
    }

    /// Read-only descent. An empty or all-slash path denotes the root (`self`). Returns
    /// `None` if any segment along the way does not exist — callers that need "create if
    /// missing" use [`Self::child_mut`] instead.
    pub fn child(&self, path: &str) -> Option<&SensorTreeNode<P>> {
        let mut node = self;
        for segment in split_path(path) {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// Descends, creating any missing suffix of the path as empty nodes.
    pub fn child_mut(&mut self, path: &str) -> &mut SensorTreeNode<P> {
        let mut node = self;
        for segment in split_path(path) {
            node = node
                .children
                .entry(segment.to_string())
                .or_insert_with(|| Box::new(SensorTreeNode::new()));
        }
        node
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &SensorTreeNode<P>)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Depth-first pre-order walk: `visit_node(address, node)`, then `visit_payload` for
    /// every payload in encounter order, then recurses into children in key order, calling
    /// `ascend` when leaving a subtree.
    pub fn accept<V: Visitor<P>>(&self, visitor: &mut V) {
        self.accept_at(String::new(), visitor);
    }

    fn accept_at<V: Visitor<P>>(&self, address: String, visitor: &mut V) {
        visitor.visit_node(&address, self);
        for (i, payload) in self.payloads.iter().enumerate() {
            visitor.visit_payload(&address, i, payload);
        }
        for (segment, child) in &self.children {
            let child_address = if address.is_empty() {
                segment.clone()
            } else {
                format!("{address}/{segment}")
            };
            child.accept_at(child_address, visitor);
        }
        if !self.children.is_empty() {
            visitor.ascend(&address);
        }
    }
}

pub trait Visitor<P> {
    fn visit_node(&mut self, address: &str, node: &SensorTreeNode<P>);
    fn visit_payload(&mut self, address: &str, index: usize, payload: &P);
    fn ascend(&mut self, address: &str) {
        let _ = address;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collector {
        visited_nodes: Vec<String>,
        visited_payloads: Vec<(String, usize, i32)>,
    }

    impl Visitor<i32> for Collector {
        fn visit_node(&mut self, address: &str, _node: &SensorTreeNode<i32>) {
            self.visited_nodes.push(address.to_string());
        }
        fn visit_payload(&mut self, address: &str, index: usize, payload: &i32) {
            self.visited_payloads
                .push((address.to_string(), index, *payload));
        }
    }

    #[test]
    fn child_mut_creates_missing_suffix_and_child_finds_it() {
        let mut root: SensorTreeNode<i32> = SensorTreeNode::new();
        root.child_mut("/motherboard/lpc/sio0").push(42);
        assert_eq!(root.child("motherboard/lpc/sio0").unwrap().payloads(), &[42]);
        assert!(root.child("motherboard/nope").is_none());
    }

    #[test]
    fn accept_walks_pre_order_by_key() {
        let mut root: SensorTreeNode<i32> = SensorTreeNode::new();
        root.child_mut("cpu").push(1);
        root.child_mut("motherboard/lpc").push(2);
        root.push(0);

        let mut collector = Collector {
            visited_nodes: Vec::new(),
            visited_payloads: Vec::new(),
        };
        root.accept(&mut collector);

        assert_eq!(collector.visited_nodes[0], "");
        assert_eq!(collector.visited_payloads[0], ("".to_string(), 0, 0));
        // "cpu" sorts before "motherboard" in BTreeMap key order.
        assert!(collector.visited_nodes.contains(&"cpu".to_string()));
        assert!(collector
            .visited_nodes
            .contains(&"motherboard/lpc".to_string()));
        assert_eq!(
            collector.visited_payloads[1],
            ("cpu".to_string(), 0, 1)
        );
    }
}
