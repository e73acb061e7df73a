//! Render Tree Diff
//!
//! Compares a new render tree against the previous one and lists the changes
//! needed to turn the host tree of the old into the new.
//!
//! Children are reconciled by key with four pointers (old start/end, new
//! start/end). Matching is tried start/start, end/end, start/end (move),
//! end/start (move); otherwise the new start is parked as a pending add. After
//! the scan, leftover old nodes either satisfy a pending add (move) or are
//! deleted; pending adds nobody claimed are inserted.

use std::collections::HashMap;

use crate::render::RenderDom;

/// Change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Update,
    Delete,
    Move,
    Replace,
}

/// One change
///
/// - `Add` / `Move`: `node` is the new node, `index` its position among the
///   new children of `parent`
/// - `Update` / `Replace`: `node` is the new node, `reference` the old one
/// - `Delete`: `node` is the old node
#[derive(Debug, Clone, Copy)]
pub struct Change<'a> {
    pub kind: ChangeKind,
    pub node: &'a RenderDom,
    pub reference: Option<&'a RenderDom>,
    pub parent: Option<&'a RenderDom>,
    pub index: usize,
}

/// Comparison counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    /// Node pairs whose own content was compared
    pub compared: usize,
    /// Node pairs skipped because their static budget is spent
    pub skipped: usize,
}

/// Diff engine
#[derive(Debug, Default)]
pub struct Differ<'a> {
    changes: Vec<Change<'a>>,
    stats: DiffStats,
    /// Keys of nodes whose own content was compared (for inspection)
    compared_keys: Vec<&'a str>,
}

impl<'a> Differ<'a> {
    pub fn new() -> Self {
        Self {
            changes: Vec::new(),
            stats: DiffStats::default(),
            compared_keys: Vec::new(),
        }
    }

    /// Compare two roots
    pub fn compare(mut self, new: &'a RenderDom, old: &'a RenderDom) -> Self {
        self.compare_node(new, old, None, 0);
        tracing::debug!(
            "Diff produced {} changes ({} compared, {} skipped)",
            self.changes.len(),
            self.stats.compared,
            self.stats.skipped
        );
        self
    }

    pub fn changes(&self) -> &[Change<'a>] {
        &self.changes
    }

    pub fn into_changes(self) -> Vec<Change<'a>> {
        self.changes
    }

    pub fn stats(&self) -> DiffStats {
        self.stats
    }

    pub fn was_compared(&self, key: &str) -> bool {
        self.compared_keys.contains(&key)
    }

    fn push(
        &mut self,
        kind: ChangeKind,
        node: &'a RenderDom,
        reference: Option<&'a RenderDom>,
        parent: Option<&'a RenderDom>,
        index: usize,
    ) {
        self.changes.push(Change {
            kind,
            node,
            reference,
            parent,
            index,
        });
    }

    fn compare_node(
        &mut self,
        new: &'a RenderDom,
        old: &'a RenderDom,
        parent: Option<&'a RenderDom>,
        index: usize,
    ) {
        if new.key != old.key || !new.same_kind(old) {
            self.push(ChangeKind::Replace, new, Some(old), parent, index);
            return;
        }

        if new.static_num == 0 {
            self.stats.skipped += 1;
        } else {
            self.stats.compared += 1;
            self.compared_keys.push(&new.key);

            let changed = if new.is_text() {
                new.text_content != old.text_content
            } else {
                new.props != old.props || new.assets != old.assets
            };
            if changed {
                self.push(ChangeKind::Update, new, Some(old), parent, index);
            }
        }

        if !new.is_text() {
            self.reconcile(new, old);
        }
    }

    fn reconcile(&mut self, new_parent: &'a RenderDom, old_parent: &'a RenderDom) {
        let new = &new_parent.children;
        let old = &old_parent.children;
        let parent = Some(new_parent);

        let (mut new_start, mut new_end) = (0usize, new.len());
        let (mut old_start, mut old_end) = (0usize, old.len());
        let mut pending: Vec<usize> = Vec::new();

        while new_start < new_end && old_start < old_end {
            let (ns, ne) = (&new[new_start], &new[new_end - 1]);
            let (os, oe) = (&old[old_start], &old[old_end - 1]);

            if ns.key == os.key {
                self.compare_node(ns, os, parent, new_start);
                new_start += 1;
                old_start += 1;
            } else if ne.key == oe.key {
                self.compare_node(ne, oe, parent, new_end - 1);
                new_end -= 1;
                old_end -= 1;
            } else if ns.key == oe.key {
                self.compare_node(ns, oe, parent, new_start);
                self.push(ChangeKind::Move, ns, Some(os), parent, new_start);
                new_start += 1;
                old_end -= 1;
            } else if ne.key == os.key {
                self.compare_node(ne, os, parent, new_end - 1);
                self.push(ChangeKind::Move, ne, Some(oe), parent, new_end - 1);
                new_end -= 1;
                old_start += 1;
            } else {
                pending.push(new_start);
                new_start += 1;
            }
        }
        pending.extend(new_start..new_end);

        let mut pending_by_key: HashMap<&str, usize> =
            pending.iter().map(|&i| (new[i].key.as_str(), i)).collect();

        for old_node in &old[old_start..old_end] {
            match pending_by_key.remove(old_node.key.as_str()) {
                Some(i) => {
                    self.compare_node(&new[i], old_node, parent, i);
                    self.push(ChangeKind::Move, &new[i], Some(old_node), parent, i);
                }
                None => self.push(ChangeKind::Delete, old_node, None, Some(old_parent), 0),
            }
        }

        for i in pending {
            if pending_by_key.contains_key(new[i].key.as_str()) {
                self.push(ChangeKind::Add, &new[i], None, parent, i);
            }
        }
    }
}

/// Compare `new` against `old`; an identical tree yields no changes
pub fn compare<'a>(new: &'a RenderDom, old: &'a RenderDom) -> Vec<Change<'a>> {
    Differ::new().compare(new, old).into_changes()
}
