//! Frozen, read-only views of runtime state for tooling.
//!
//! Snapshots carry names, lifetimes and creation metadata, never live
//! instances. They serialize with `serde` and print as an indented tree.

use std::fmt;

use mawrid_support::rendering::{TreeLine, render_tree};
use serde::Serialize;

use crate::adapter::Adapter;
use crate::lifetime::Lifetime;
use crate::memo::MemoEntrySnapshot;
use crate::port::Port;
use crate::scope::ScopeId;

/// Metadata of one adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterSnapshot {
    pub port: Port,
    pub lifetime: Lifetime,
    pub requires: Vec<Port>,
    pub has_finalizer: bool,
}

impl AdapterSnapshot {
    pub(crate) fn of(adapter: &Adapter) -> Self {
        Self {
            port: adapter.provides().clone(),
            lifetime: adapter.lifetime(),
            requires: adapter.required_ports().to_vec(),
            has_finalizer: adapter.has_finalizer(),
        }
    }
}

/// State of one scope and, recursively, its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeSnapshot {
    pub id: ScopeId,
    pub disposed: bool,
    /// Entries created in this scope, in creation order.
    pub scoped: Vec<MemoEntrySnapshot>,
    pub children: Vec<ScopeSnapshot>,
}

/// State of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSnapshot {
    pub disposed: bool,
    pub singletons: Vec<MemoEntrySnapshot>,
    pub scopes: Vec<ScopeSnapshot>,
    pub adapters: Vec<AdapterSnapshot>,
}

fn status(disposed: bool) -> &'static str {
    if disposed { "disposed" } else { "active" }
}

fn entry_line(depth: usize, lifetime: Lifetime, entry: &MemoEntrySnapshot) -> TreeLine {
    TreeLine::new(depth, format!("{lifetime} {}", entry.port)).with_detail(format!("#{}", entry.resolution_order))
}

impl ScopeSnapshot {
    fn tree_lines(&self, depth: usize, lines: &mut Vec<TreeLine>) {
        lines.push(TreeLine::new(depth, self.id.to_string()).with_detail(status(self.disposed)));

        for entry in &self.scoped {
            lines.push(entry_line(depth + 1, Lifetime::Scoped, entry));
        }

        for child in &self.children {
            child.tree_lines(depth + 1, lines);
        }
    }
}

impl fmt::Display for ScopeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        self.tree_lines(0, &mut lines);
        f.write_str(&render_tree(&lines))
    }
}

impl fmt::Display for ContainerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = vec![
            TreeLine::new(0, "container")
                .with_detail(format!("{}, {} adapters", status(self.disposed), self.adapters.len())),
        ];

        for entry in &self.singletons {
            lines.push(entry_line(1, Lifetime::Singleton, entry));
        }

        for scope in &self.scopes {
            scope.tree_lines(1, &mut lines);
        }

        f.write_str(&render_tree(&lines))
    }
}
