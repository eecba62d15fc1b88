//! Path-compressed trie (radix tree) of normalized child-task-opening
//! prefixes, keyed to the set of tasks that declared each prefix (§4.C).
//!
//! No literal radix-tree implementation exists anywhere in the reference
//! corpus for this pack; the node/edge shape below is original, grounded
//! only in the index's documented complexity contract (`O(|input|)` per
//! lookup, `O(sum of prefix lengths)` memory) and in the
//! stats-bearing-index API shape the teacher's hierarchical index exposes.

use std::collections::BTreeSet;

use crate::types::TaskId;

#[derive(Debug, Default)]
struct Node {
    children: Vec<Edge>,
    emitters: BTreeSet<TaskId>,
}

#[derive(Debug)]
struct Edge {
    label: String,
    node: Node,
}

impl Node {
    fn is_terminal(&self) -> bool {
        !self.emitters.is_empty()
    }
}

/// Aggregate counts for the index (§4.C `stats()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RadixStats {
    /// Number of distinct `(prefix, emitting_task_id)` pairs registered.
    pub total_instructions: usize,
    /// Number of trie nodes, including the root.
    pub total_nodes: usize,
}

/// The radix instruction index.
#[derive(Debug, Default)]
pub struct RadixIndex {
    root: Node,
    total_instructions: usize,
}

impl RadixIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `prefix` keyed to `task_id`. Idempotent: re-adding the same
    /// pair is a no-op.
    pub fn add(&mut self, task_id: TaskId, prefix: &str) {
        if prefix.is_empty() {
            return;
        }
        let inserted = Self::insert(&mut self.root, prefix, &task_id);
        if inserted {
            self.total_instructions += 1;
        }
    }

    /// Drop every registration. Conceptually O(1): the caller observes a
    /// single reset operation, even though the trie's backing nodes are
    /// deallocated as part of replacing the root.
    pub fn clear(&mut self) {
        self.root = Node::default();
        self.total_instructions = 0;
    }

    /// Every emitter whose registered prefix is an exact prefix of
    /// `opening_text` (strict mode, §4.D).
    #[must_use]
    pub fn exact_lookup(&self, opening_text: &str) -> BTreeSet<TaskId> {
        let mut result = BTreeSet::new();
        let mut node = &self.root;
        let mut remaining = opening_text;

        if node.is_terminal() {
            result.extend(node.emitters.iter().cloned());
        }

        'walk: while !remaining.is_empty() {
            for edge in &node.children {
                let common = common_prefix_len(remaining, &edge.label);
                if common == 0 {
                    continue;
                }
                if common < edge.label.chars().count() {
                    // Input diverges partway through this edge's label: no
                    // further node on this path can be a prefix of input.
                    break 'walk;
                }
                // Full edge label consumed: descend.
                remaining = &remaining[byte_len(remaining, common)..];
                node = &edge.node;
                if node.is_terminal() {
                    result.extend(node.emitters.iter().cloned());
                }
                continue 'walk;
            }
            break;
        }

        result
    }

    #[must_use]
    pub fn stats(&self) -> RadixStats {
        RadixStats {
            total_instructions: self.total_instructions,
            total_nodes: 1 + Self::count_nodes(&self.root),
        }
    }

    fn count_nodes(node: &Node) -> usize {
        node.children
            .iter()
            .map(|edge| 1 + Self::count_nodes(&edge.node))
            .sum()
    }

    /// Returns `true` if a new `(prefix, task_id)` pair was actually added.
    fn insert(node: &mut Node, prefix: &str, task_id: &TaskId) -> bool {
        for edge in &mut node.children {
            let common = common_prefix_len(prefix, &edge.label);
            if common == 0 {
                continue;
            }
            let label_len = edge.label.chars().count();
            let prefix_len = prefix.chars().count();

            if common == label_len && common == prefix_len {
                // Exact match on this edge: terminal here.
                return edge.node.emitters.insert(task_id.clone());
            }
            if common == label_len {
                // Edge fully consumed, descend with the remainder.
                let rest = &prefix[byte_len(prefix, common)..];
                return Self::insert(&mut edge.node, rest, task_id);
            }
            // Partial match: split this edge.
            let common_label: String = edge.label.chars().take(common).collect();
            let old_rest: String = edge.label.chars().skip(common).collect();

            let mut old_child = Node::default();
            std::mem::swap(&mut old_child, &mut edge.node);
            let split_child = Node {
                children: vec![Edge {
                    label: old_rest,
                    node: old_child,
                }],
                emitters: BTreeSet::new(),
            };
            edge.label = common_label;
            edge.node = split_child;

            if common == prefix_len {
                return edge.node.emitters.insert(task_id.clone());
            }
            let rest = &prefix[byte_len(prefix, common)..];
            return Self::insert(&mut edge.node, rest, task_id);
        }

        // No existing edge shares a prefix: add a brand new leaf edge.
        let mut leaf = Node::default();
        leaf.emitters.insert(task_id.clone());
        node.children.push(Edge {
            label: prefix.to_string(),
            node: leaf,
        });
        true
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

fn byte_len(s: &str, chars: usize) -> usize {
    s.char_indices()
        .nth(chars)
        .map_or(s.len(), |(idx, _)| idx)
}
