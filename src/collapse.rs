//! Flattening a hierarchy into a single basegroup and back.
//!
//! Collapsing moves every dataset to `/Picopore/<dotted path>` and stores the
//! attributes of every group on the basegroup as `<dotted path>.<name>`.
//! Containers hold many tiny groups, each with its own header, and a flat
//! layout stores far fewer of them.
//!
//! ```text
//! /Analyses/Basecall_1D_000/BaseCalled_template/Events
//!   -> /Picopore/Analyses.Basecall_1D_000.BaseCalled_template.Events
//! /Analyses/Basecall_1D_000 @name = "ONT Albacore"
//!   -> /Picopore @Analyses.Basecall_1D_000.name = "ONT Albacore"
//! ```
//!
//! A group with neither children nor attributes is kept as the marker key
//! `<dotted path>.` with an empty attribute name.

use std::collections::HashSet;

use log::debug;
use thiserror::Error;

use crate::container::{AttrValue, ContainerError, NodeId, Tree};
use crate::minimize::{minimize_attr, TypeError};

/// Name of the group holding a collapsed hierarchy
pub const BASEGROUP: &str = "Picopore";

const SEPARATOR: char = '.';

#[derive(Debug, Error)]
pub enum CollapseError {
    #[error("name '{0}' contains the separator '.'")]
    SeparatorInName(String),

    #[error("'{0}' is already present in the basegroup")]
    Collision(String),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// Path a basegroup child stands for, e.g. `/Raw/Reads/Read_1/Signal`
pub fn logical_path(dotted: &str) -> String {
    format!("/{}", dotted.replace(SEPARATOR, "/"))
}

/// True if the tree carries a basegroup
pub fn is_collapsed(tree: &Tree) -> bool {
    tree.is_group(BASEGROUP)
}

fn empty_group_marker() -> AttrValue {
    AttrValue::uint(0)
}

#[derive(Debug, Default)]
struct CollapsePlan {
    moves: Vec<(NodeId, String)>,
    attrs: Vec<(String, AttrValue)>,
    emptied: Vec<NodeId>,
    taken: HashSet<String>,
    taken_attrs: HashSet<String>,
}

impl CollapsePlan {
    fn check_name(name: &str) -> Result<(), CollapseError> {
        if name.contains(SEPARATOR) {
            return Err(CollapseError::SeparatorInName(name.to_string()));
        }
        Ok(())
    }

    fn add_move(&mut self, id: NodeId, dotted: String) -> Result<(), CollapseError> {
        if !self.taken.insert(dotted.clone()) {
            return Err(CollapseError::Collision(dotted));
        }
        self.moves.push((id, dotted));
        Ok(())
    }

    fn add_attr(&mut self, key: String, value: AttrValue) -> Result<(), CollapseError> {
        if !self.taken_attrs.insert(key.clone()) {
            return Err(CollapseError::Collision(key));
        }
        self.attrs.push((key, value));
        Ok(())
    }

    fn visit_group(&mut self, tree: &Tree, id: NodeId, dotted: &str) -> Result<(), CollapseError> {
        let children = tree.children(id);
        let attrs = tree.attrs(id).cloned().unwrap_or_default();
        if children.is_empty() && attrs.is_empty() {
            self.add_attr(format!("{}{}", dotted, SEPARATOR), empty_group_marker())?;
        }
        for (name, value) in attrs.iter() {
            Self::check_name(name)?;
            self.add_attr(format!("{}{}{}", dotted, SEPARATOR, name), minimize_attr(value)?)?;
        }
        for child in children {
            let name = tree.name(child).unwrap_or_default();
            Self::check_name(name)?;
            let sub = format!("{}{}{}", dotted, SEPARATOR, name);
            if tree.is_group_id(child) {
                self.visit_group(tree, child, &sub)?;
            } else {
                self.add_move(child, sub)?;
            }
        }
        Ok(())
    }
}

fn plan_collapse(tree: &Tree) -> Result<CollapsePlan, CollapseError> {
    let base = tree.resolve(BASEGROUP);
    let mut plan = CollapsePlan::default();
    if let Some(base) = base {
        plan.taken.extend(tree.children(base).into_iter().filter_map(|c| tree.name(c).map(str::to_string)));
        if let Some(attrs) = tree.attrs(base) {
            plan.taken_attrs.extend(attrs.names().map(str::to_string));
        }
    }

    for top in tree.children(tree.root()) {
        if Some(top) == base {
            continue;
        }
        let name = tree.name(top).unwrap_or_default();
        CollapsePlan::check_name(name)?;
        if tree.is_group_id(top) {
            plan.emptied.push(top);
            plan.visit_group(tree, top, name)?;
        } else {
            plan.add_move(top, name.to_string())?;
        }
    }
    Ok(plan)
}

/// Flatten every top-level object into the basegroup.
///
/// The whole move is planned before anything changes, so an error leaves the
/// tree untouched. Returns the number of datasets moved.
pub fn collapse(tree: &mut Tree) -> Result<usize, CollapseError> {
    let plan = plan_collapse(tree)?;
    let base = tree.require_group(BASEGROUP)?;
    let moved = plan.moves.len();
    for (id, dotted) in plan.moves {
        tree.relink(id, base, &dotted)?;
    }
    if let Some(attrs) = tree.attrs_mut(base) {
        for (key, value) in plan.attrs {
            attrs.set(key, value);
        }
    }
    for id in plan.emptied {
        tree.remove_id(id)?;
    }
    debug!("Collapsed {} datasets into /{}", moved, BASEGROUP);
    Ok(moved)
}

/// Rebuild the hierarchy from the basegroup and delete it.
///
/// Returns the number of datasets moved back; a tree without a basegroup is
/// left as it is.
pub fn uncollapse(tree: &mut Tree) -> Result<usize, CollapseError> {
    let Some(base) = tree.resolve(BASEGROUP) else {
        return Ok(0);
    };

    let mut moves = Vec::new();
    for child in tree.children(base) {
        let dotted = tree.name(child).unwrap_or_default();
        let destination = logical_path(dotted);
        if tree.exists(&destination) {
            return Err(CollapseError::Collision(destination));
        }
        moves.push((child, destination));
    }

    let mut attrs = Vec::new();
    for (key, value) in tree.attrs(base).cloned().unwrap_or_default().iter() {
        let (group, name) = key.rsplit_once(SEPARATOR).unwrap_or(("", key));
        attrs.push((logical_path(group), name.to_string(), minimize_attr(value)?));
    }

    let moved = moves.len();
    for (id, destination) in moves {
        let source = tree.path_of(id);
        tree.move_node(&source, &destination)?;
    }
    for (group, name, value) in attrs {
        let id = tree.require_group(&group)?;
        if name.is_empty() {
            continue;
        }
        if let Some(target) = tree.attrs_mut(id) {
            target.set(name, value);
        }
    }
    tree.remove_id(base)?;
    debug!("Restored {} datasets from /{}", moved, BASEGROUP);
    Ok(moved)
}
