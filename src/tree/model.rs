use ahash::{AHashMap, AHashSet};
use tracing::warn;

use super::node::{LoadState, NodeKey, TreeNode};

/// Arena slot. `node.children` is always empty here; the cache lives in `children`.
struct Entry {
    node: TreeNode,
    /// `None` until the first successful fetch.
    children: Option<Vec<NodeKey>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// Not expandable, or not in the visible list.
    Ignored,
    /// The node's direct children already follow it.
    AlreadyExpanded,
    /// A fetch for this node is still running.
    InFlight,
    /// Cached children were spliced in.
    Spliced(usize),
    /// Nothing cached; the node is now `Loading` and the caller owns the fetch.
    NeedsFetch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseOutcome {
    pub removed: usize,
    /// Nodes of the collapsed subtree that were loading; they are `Idle` again.
    pub cancelled: Vec<NodeKey>,
}

/// Flattened tree with a per-node child cache.
///
/// The visible list is only ever changed by [`TreeModel::expand`],
/// [`TreeModel::complete_fetch`] and [`TreeModel::collapse`], which keeps the
/// level ordering intact: every node is followed by its descendants and then by
/// the next node at the same or a lower level. Collapse removes the contiguous
/// deeper span after a node and relies on that ordering.
#[derive(Default)]
pub struct TreeModel {
    nodes: AHashMap<NodeKey, Entry>,
    visible: Vec<NodeKey>,
}

impl TreeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roots(roots: Vec<TreeNode>) -> Self {
        let mut model = Self::new();
        model.set_roots(roots);
        model
    }

    /// Replace the whole tree with level-0 nodes. All cached children are dropped.
    pub fn set_roots(&mut self, roots: Vec<TreeNode>) {
        self.nodes.clear();
        self.visible.clear();

        for mut root in roots {
            let key = root.key();
            if key.level() != 0 {
                warn!(node = %key, "Ignoring non-database root node");
                continue;
            }
            if self.nodes.contains_key(&key) {
                warn!(node = %key, "Ignoring duplicate root node");
                continue;
            }
            root.state = LoadState::Idle;
            root.children.clear();
            self.nodes.insert(
                key.clone(),
                Entry {
                    node: root,
                    children: None,
                },
            );
            self.visible.push(key);
        }
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    pub fn visible_keys(&self) -> &[NodeKey] {
        &self.visible
    }

    pub fn index_of(&self, key: &NodeKey) -> Option<usize> {
        self.visible.iter().position(|k| k == key)
    }

    pub fn state(&self, key: &NodeKey) -> Option<&LoadState> {
        self.nodes.get(key).map(|e| &e.node.state)
    }

    /// The node with its cached children materialised.
    pub fn node(&self, key: &NodeKey) -> Option<TreeNode> {
        let entry = self.nodes.get(key)?;
        let mut node = entry.node.clone();
        node.children = entry
            .children
            .iter()
            .flatten()
            .filter_map(|child| self.node(child))
            .collect();
        Some(node)
    }

    /// The visible list as owned nodes.
    pub fn snapshot(&self) -> Vec<TreeNode> {
        self.visible.iter().filter_map(|k| self.node(k)).collect()
    }

    pub fn expand(&mut self, key: &NodeKey) -> ExpandOutcome {
        let Some(index) = self.expandable_index(key) else {
            return ExpandOutcome::Ignored;
        };
        if self.children_shown_at(index) {
            return ExpandOutcome::AlreadyExpanded;
        }
        let Some(entry) = self.nodes.get_mut(key) else {
            return ExpandOutcome::Ignored;
        };
        if entry.node.state == LoadState::Loading {
            return ExpandOutcome::InFlight;
        }

        match entry.children.clone() {
            Some(children) => {
                let count = children.len();
                self.splice_after(index, children);
                ExpandOutcome::Spliced(count)
            }
            None => {
                entry.node.state = LoadState::Loading;
                ExpandOutcome::NeedsFetch
            }
        }
    }

    /// Cache fetched children and splice them in at the node's current position.
    ///
    /// Returns `true` if the children were spliced. A node that is gone (roots
    /// replaced) yields `false` and nothing is cached.
    pub fn complete_fetch(&mut self, key: &NodeKey, children: Vec<TreeNode>) -> bool {
        if !self.nodes.contains_key(key) {
            return false;
        }

        let mut seen = AHashSet::with_capacity(children.len());
        let mut child_keys = Vec::with_capacity(children.len());
        for mut child in children {
            let child_key = child.key();
            if child_key.parent().as_ref() != Some(key) {
                warn!(parent = %key, child = %child_key, "Dropping child fetched for another parent");
                continue;
            }
            if !seen.insert(child_key.clone()) {
                warn!(parent = %key, child = %child_key, "Dropping duplicate child");
                continue;
            }
            child.state = LoadState::Idle;
            child.children.clear();
            self.nodes.entry(child_key.clone()).or_insert(Entry {
                node: child,
                children: None,
            });
            child_keys.push(child_key);
        }

        if let Some(entry) = self.nodes.get_mut(key) {
            entry.node.state = LoadState::Loaded;
            entry.children = Some(child_keys.clone());
        }

        match self.index_of(key) {
            Some(index) if !self.children_shown_at(index) => {
                self.splice_after(index, child_keys);
                true
            }
            _ => false,
        }
    }

    /// Mark a fetch as failed. Expanding the node again retries.
    pub fn fail_fetch(&mut self, key: &NodeKey, message: impl Into<String>) -> bool {
        match self.nodes.get_mut(key) {
            Some(entry) => {
                entry.node.state = LoadState::Failed(message.into());
                true
            }
            None => false,
        }
    }

    /// Put a loading node back to `Idle` without caching anything.
    pub fn reset(&mut self, key: &NodeKey) -> bool {
        match self.nodes.get_mut(key) {
            Some(entry) if entry.node.state == LoadState::Loading => {
                entry.node.state = LoadState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn collapse(&mut self, key: &NodeKey) -> CollapseOutcome {
        let mut outcome = CollapseOutcome::default();
        if self.expandable_index(key).is_none() {
            return outcome;
        }
        outcome.removed = self.collapse_span(key);

        for (k, entry) in &mut self.nodes {
            if (k == key || key.contains(k)) && entry.node.state == LoadState::Loading {
                entry.node.state = LoadState::Idle;
                outcome.cancelled.push(k.clone());
            }
        }
        outcome.cancelled.sort();
        outcome
    }

    fn collapse_span(&mut self, key: &NodeKey) -> usize {
        let mut removed = 0;

        // Database nodes collapse their schemas first so stale table spans go too.
        if key.schema.is_none() {
            let children = self
                .nodes
                .get(key)
                .and_then(|e| e.children.clone())
                .unwrap_or_default();
            for child in &children {
                if self.expandable_index(child).is_some() {
                    removed += self.collapse_span(child);
                }
            }
        }

        let Some(index) = self.index_of(key) else {
            return removed;
        };
        let level = key.level();
        let count = self.visible[index + 1..]
            .iter()
            .take_while(|k| k.level() > level)
            .count();
        self.visible.drain(index + 1..index + 1 + count);
        removed + count
    }

    /// Every non-root node's nearest shallower predecessor is its parent, and its
    /// immediate predecessor is either that parent or a node at least as deep.
    pub fn check_level_invariant(&self) -> bool {
        self.visible.iter().enumerate().all(|(i, key)| {
            let level = key.level();
            if level == 0 {
                return true;
            }
            let Some(prev) = i.checked_sub(1).map(|p| &self.visible[p]) else {
                return false;
            };
            let parent = key.parent();
            let nearest = self.visible[..i].iter().rev().find(|k| k.level() < level);
            nearest == parent.as_ref() && (Some(prev) == parent.as_ref() || prev.level() >= level)
        })
    }

    fn expandable_index(&self, key: &NodeKey) -> Option<usize> {
        if !key.is_expandable() {
            return None;
        }
        self.index_of(key)
    }

    fn children_shown_at(&self, index: usize) -> bool {
        self.visible
            .get(index + 1)
            .is_some_and(|next| next.parent().as_ref() == Some(&self.visible[index]))
    }

    fn splice_after(&mut self, index: usize, keys: Vec<NodeKey>) {
        self.visible.splice(index + 1..index + 1, keys);
    }
}
