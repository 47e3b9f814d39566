use std::collections::HashSet;

use topological_sort::TopologicalSort;

use crate::{
    resolve::{self, DEFAULT_MAX_DEPTH, ResolveError},
    schema::Schema,
};

/// Outcome of checking every definition of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Definitions that are not on or below a cycle, every type listed after the types it inherits from.
    pub order: Vec<String>,
    pub issues: Vec<ResolveError>,
}

impl Report {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn check(schema: &Schema) -> Report {
    check_with_depth(schema, DEFAULT_MAX_DEPTH)
}

/// Checks that every definition of `schema` resolves.
pub fn check_with_depth(schema: &Schema, max_depth: usize) -> Report {
    let mut ts = TopologicalSort::<&str>::new();
    let mut issues = Vec::new();

    for (name, definition) in schema.iter() {
        ts.insert(name);
        for parent in definition.dependencies() {
            if schema.contains(parent) {
                ts.add_dependency(parent, name);
            } else {
                issues.push(ResolveError::DanglingParent {
                    name: name.to_string(),
                    parent: parent.to_string(),
                });
            }
        }
    }

    let mut order = Vec::new();
    loop {
        let ready = ts.pop_all();
        if ready.is_empty() {
            break;
        }
        order.extend(ready);
    }

    // whatever the sort could not release sits on or below a cycle
    let sorted: HashSet<&str> = order.iter().copied().collect();
    for name in schema.names().filter(|name| !sorted.contains(name)) {
        if let Err(e @ (ResolveError::Cycle(_) | ResolveError::TooDeep { .. })) =
            resolve::resolve(name, schema, max_depth)
        {
            issues.push(e);
        }
    }

    // acyclic chains can still be too long
    for name in order.iter().copied() {
        if let Err(e @ ResolveError::TooDeep { .. }) = resolve::resolve(name, schema, max_depth) {
            issues.push(e);
        }
    }

    if !issues.is_empty() {
        tracing::warn!("schema has {} issue(s)", issues.len());
    }

    Report {
        order: order.into_iter().map(str::to_string).collect(),
        issues,
    }
}
