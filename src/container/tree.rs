//! In-memory hierarchy of groups and datasets.
//!
//! Nodes live in an arena indexed by [`NodeId`]. Parents hold an ordered list
//! of children and every node keeps a link to its parent, so moves are a
//! relink of two lists rather than a copy. Removed nodes leave a tombstone
//! behind; ids are never reused within one tree.

use super::compression::Compression;
use super::error::ContainerError;
use super::value::{AttrValue, Column};

use serde::{Deserialize, Serialize};

/// Index of a node inside a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Ordered name → value attribute map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    entries: Vec<(String, AttrValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace; a replaced value keeps its position
    pub fn set(&mut self, name: impl Into<String>, value: AttrValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        let index = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One column of a dataset, named when the dataset is compound
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Option<String>,
    pub column: Column,
}

impl Field {
    pub fn named(name: impl Into<String>, column: Column) -> Self {
        Self {
            name: Some(name.into()),
            column,
        }
    }

    pub fn unnamed(column: Column) -> Self {
        Self { name: None, column }
    }
}

/// Contents of a dataset: one unnamed column, or named fields of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetValue {
    fields: Vec<Field>,
}

impl DatasetValue {
    /// Single-typed dataset
    pub fn single(column: Column) -> Self {
        Self {
            fields: vec![Field::unnamed(column)],
        }
    }

    /// Compound dataset from `(name, column)` pairs
    pub fn compound<S: Into<String>>(
        fields: impl IntoIterator<Item = (S, Column)>,
    ) -> Result<Self, ContainerError> {
        Self::from_fields(
            fields
                .into_iter()
                .map(|(name, column)| Field::named(name, column))
                .collect(),
        )
    }

    /// Validate and assemble fields.
    ///
    /// Either exactly one unnamed field, or one or more uniquely named fields;
    /// every field must have the same number of rows.
    pub fn from_fields(fields: Vec<Field>) -> Result<Self, ContainerError> {
        if fields.is_empty() {
            return Err(ContainerError::InvalidDataset(
                "dataset has no fields".to_string(),
            ));
        }
        let unnamed = fields.iter().filter(|f| f.name.is_none()).count();
        if unnamed > 0 && fields.len() > 1 {
            return Err(ContainerError::InvalidDataset(
                "compound dataset with an unnamed field".to_string(),
            ));
        }
        for (i, field) in fields.iter().enumerate() {
            if let Some(name) = &field.name {
                if fields[..i].iter().any(|f| f.name.as_ref() == Some(name)) {
                    return Err(ContainerError::InvalidDataset(format!(
                        "duplicate field '{}'",
                        name
                    )));
                }
            }
        }
        let rows = fields[0].column.len();
        if let Some(ragged) = fields.iter().find(|f| f.column.len() != rows) {
            return Err(ContainerError::InvalidDataset(format!(
                "field '{}' has {} rows, expected {}",
                ragged.name.as_deref().unwrap_or(""),
                ragged.column.len(),
                rows
            )));
        }
        Ok(Self { fields })
    }

    pub fn is_compound(&self) -> bool {
        self.fields.iter().any(|f| f.name.is_some())
    }

    /// Row count
    pub fn len(&self) -> usize {
        self.fields.first().map_or(0, |f| f.column.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    /// Column of a named field
    pub fn field(&self, name: &str) -> Option<&Column> {
        self.fields
            .iter()
            .find(|f| f.name.as_deref() == Some(name))
            .map(|f| &f.column)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().filter_map(|f| f.name.as_deref()).collect()
    }

    /// Field order and element values equal, storage widths ignored
    pub fn same_values(&self, other: &DatasetValue) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.name == b.name && a.column.same_values(&b.column))
    }
}

/// A dataset node's payload
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub value: DatasetValue,
    pub compression: Compression,
}

impl Dataset {
    pub fn new(value: DatasetValue, compression: Compression) -> Self {
        Self { value, compression }
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Group(Vec<NodeId>),
    Dataset(Dataset),
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    attrs: Attributes,
    kind: NodeKind,
}

/// Split a path into its non-empty segments
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Split a path into its parent path and last segment
pub fn split_parent(path: &str) -> (String, &str) {
    let parts = segments(path);
    match parts.split_last() {
        Some((last, rest)) => (format!("/{}", rest.join("/")), last),
        None => ("/".to_string(), ""),
    }
}

/// Canonical absolute form of a path
pub fn normalize(path: &str) -> String {
    format!("/{}", segments(path).join("/"))
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Tree holding only the root group
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node {
                name: String::new(),
                parent: None,
                attrs: Attributes::new(),
                kind: NodeKind::Group(Vec::new()),
            })],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn children_ref(&self, id: NodeId) -> &[NodeId] {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Group(children)) => children,
            _ => &[],
        }
    }

    fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Group(children)) => Some(children),
            _ => None,
        }
    }

    /// Child of `parent` called `name`
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children_ref(parent)
            .iter()
            .copied()
            .find(|&c| self.node(c).is_some_and(|n| n.name == name))
    }

    /// Look up a node by path
    pub fn resolve(&self, path: &str) -> Option<NodeId> {
        segments(path)
            .into_iter()
            .try_fold(self.root(), |id, name| self.child(id, name))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }

    pub fn is_group_id(&self, id: NodeId) -> bool {
        matches!(self.node(id).map(|n| &n.kind), Some(NodeKind::Group(_)))
    }

    pub fn is_dataset_id(&self, id: NodeId) -> bool {
        matches!(self.node(id).map(|n| &n.kind), Some(NodeKind::Dataset(_)))
    }

    pub fn is_group(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|id| self.is_group_id(id))
    }

    pub fn is_dataset(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|id| self.is_dataset_id(id))
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Ordered children; empty for datasets
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.children_ref(id).to_vec()
    }

    /// Ordered child names of the group at `path`
    pub fn child_names(&self, path: &str) -> Vec<String> {
        self.resolve(path)
            .map(|id| {
                self.children_ref(id)
                    .iter()
                    .filter_map(|&c| self.name(c).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Absolute path of a node
    pub fn path_of(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.node(c)) {
            if node.parent.is_some() {
                names.push(node.name.as_str());
            }
            current = node.parent;
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    pub fn attrs(&self, id: NodeId) -> Option<&Attributes> {
        self.node(id).map(|n| &n.attrs)
    }

    pub fn attrs_mut(&mut self, id: NodeId) -> Option<&mut Attributes> {
        self.node_mut(id).map(|n| &mut n.attrs)
    }

    pub fn attrs_at(&self, path: &str) -> Option<&Attributes> {
        self.resolve(path).and_then(|id| self.attrs(id))
    }

    pub fn attrs_at_mut(&mut self, path: &str) -> Option<&mut Attributes> {
        let id = self.resolve(path)?;
        self.attrs_mut(id)
    }

    /// Attribute `name` of the node at `path`
    pub fn attr(&self, path: &str, name: &str) -> Option<&AttrValue> {
        self.attrs_at(path).and_then(|a| a.get(name))
    }

    pub fn set_attr(
        &mut self,
        path: &str,
        name: impl Into<String>,
        value: AttrValue,
    ) -> Result<(), ContainerError> {
        let attrs = self
            .attrs_at_mut(path)
            .ok_or_else(|| ContainerError::NotFound(normalize(path)))?;
        attrs.set(name, value);
        Ok(())
    }

    pub fn remove_attr(&mut self, path: &str, name: &str) -> Option<AttrValue> {
        self.attrs_at_mut(path).and_then(|a| a.remove(name))
    }

    pub fn dataset_by_id(&self, id: NodeId) -> Option<&Dataset> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Dataset(dataset)) => Some(dataset),
            _ => None,
        }
    }

    pub fn dataset_by_id_mut(&mut self, id: NodeId) -> Option<&mut Dataset> {
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Dataset(dataset)) => Some(dataset),
            _ => None,
        }
    }

    pub fn dataset(&self, path: &str) -> Option<&Dataset> {
        self.resolve(path).and_then(|id| self.dataset_by_id(id))
    }

    pub fn dataset_mut(&mut self, path: &str) -> Option<&mut Dataset> {
        let id = self.resolve(path)?;
        self.dataset_by_id_mut(id)
    }

    fn push_node(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> Result<NodeId, ContainerError> {
        let id = NodeId(self.nodes.len());
        if !self.is_group_id(parent) {
            return Err(ContainerError::NotAGroup(self.path_of(parent)));
        }
        if let Some(children) = self.children_mut(parent) {
            children.push(id);
        }
        self.nodes.push(Some(Node {
            name: name.to_string(),
            parent: Some(parent),
            attrs: Attributes::new(),
            kind,
        }));
        Ok(id)
    }

    /// Group at `path`, creating it and any missing parents
    pub fn require_group(&mut self, path: &str) -> Result<NodeId, ContainerError> {
        let mut current = self.root();
        for name in segments(path) {
            current = match self.child(current, name) {
                Some(id) if self.is_group_id(id) => id,
                Some(id) => return Err(ContainerError::NotAGroup(self.path_of(id))),
                None => self.push_node(current, name, NodeKind::Group(Vec::new()))?,
            };
        }
        Ok(current)
    }

    /// New group at `path`; missing parents are created, an existing node is an error
    pub fn create_group(&mut self, path: &str) -> Result<NodeId, ContainerError> {
        let (parent, name) = split_parent(path);
        if name.is_empty() {
            return Err(ContainerError::InvalidPath(path.to_string()));
        }
        if self.exists(path) {
            return Err(ContainerError::AlreadyExists(normalize(path)));
        }
        let parent = self.require_group(&parent)?;
        self.push_node(parent, name, NodeKind::Group(Vec::new()))
    }

    /// New dataset at `path`; missing parents are created, an existing node is an error
    pub fn create_dataset(&mut self, path: &str, dataset: Dataset) -> Result<NodeId, ContainerError> {
        let (parent, name) = split_parent(path);
        if name.is_empty() {
            return Err(ContainerError::InvalidPath(path.to_string()));
        }
        if self.exists(path) {
            return Err(ContainerError::AlreadyExists(normalize(path)));
        }
        let parent = self.require_group(&parent)?;
        self.push_node(parent, name, NodeKind::Dataset(dataset))
    }

    /// Remove a node and its whole subtree
    pub fn remove_id(&mut self, id: NodeId) -> Result<(), ContainerError> {
        let parent = self
            .parent(id)
            .ok_or_else(|| ContainerError::InvalidPath("cannot remove the root group".to_string()))?;
        if let Some(children) = self.children_mut(parent) {
            children.retain(|&c| c != id);
        }
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            pending.extend_from_slice(self.children_ref(next));
            if let Some(slot) = self.nodes.get_mut(next.0) {
                *slot = None;
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, path: &str) -> Result<(), ContainerError> {
        let id = self
            .resolve(path)
            .ok_or_else(|| ContainerError::NotFound(normalize(path)))?;
        self.remove_id(id)
    }

    /// Detach the dataset at `path`, returning its payload and attributes
    pub fn take_dataset(&mut self, path: &str) -> Result<(Dataset, Attributes), ContainerError> {
        let id = self
            .resolve(path)
            .ok_or_else(|| ContainerError::NotFound(normalize(path)))?;
        if !self.is_dataset_id(id) {
            return Err(ContainerError::InvalidPath(format!("{} is not a dataset", normalize(path))));
        }
        let parent = self.parent(id);
        if let Some(children) = parent.and_then(|p| self.children_mut(p)) {
            children.retain(|&c| c != id);
        }
        match self.nodes.get_mut(id.0).and_then(Option::take) {
            Some(Node {
                attrs,
                kind: NodeKind::Dataset(dataset),
                ..
            }) => Ok((dataset, attrs)),
            _ => Err(ContainerError::NotFound(normalize(path))),
        }
    }

    fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    /// Move `id` under `new_parent` with a new name
    pub fn relink(&mut self, id: NodeId, new_parent: NodeId, new_name: &str) -> Result<(), ContainerError> {
        if new_name.is_empty() || new_name.contains('/') {
            return Err(ContainerError::InvalidPath(new_name.to_string()));
        }
        if !self.is_group_id(new_parent) {
            return Err(ContainerError::NotAGroup(self.path_of(new_parent)));
        }
        if self.is_within(new_parent, id) {
            return Err(ContainerError::InvalidPath(format!(
                "cannot move {} into itself",
                self.path_of(id)
            )));
        }
        if let Some(existing) = self.child(new_parent, new_name) {
            if existing != id {
                return Err(ContainerError::AlreadyExists(self.path_of(existing)));
            }
        }
        let old_parent = self
            .parent(id)
            .ok_or_else(|| ContainerError::InvalidPath("cannot move the root group".to_string()))?;
        if let Some(children) = self.children_mut(old_parent) {
            children.retain(|&c| c != id);
        }
        if let Some(children) = self.children_mut(new_parent) {
            children.push(id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = Some(new_parent);
            node.name = new_name.to_string();
        }
        Ok(())
    }

    /// Move the node at `from` to `to`, creating missing parents of `to`
    pub fn move_node(&mut self, from: &str, to: &str) -> Result<NodeId, ContainerError> {
        let id = self
            .resolve(from)
            .ok_or_else(|| ContainerError::NotFound(normalize(from)))?;
        if self.exists(to) {
            return Err(ContainerError::AlreadyExists(normalize(to)));
        }
        let (parent, name) = split_parent(to);
        if name.is_empty() {
            return Err(ContainerError::InvalidPath(to.to_string()));
        }
        if id == self.root() {
            return Err(ContainerError::InvalidPath("cannot move the root group".to_string()));
        }
        // the destination parent may not exist yet; refuse before creating it
        let source = self.path_of(id);
        let parent = normalize(&parent);
        if parent == source || parent.starts_with(&format!("{}/", source)) {
            return Err(ContainerError::InvalidPath(format!(
                "cannot move {} into itself",
                normalize(from)
            )));
        }
        let parent = self.require_group(&parent)?;
        self.relink(id, parent, name)?;
        Ok(id)
    }

    /// Every live node below `id` in depth-first pre-order, `id` excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children_ref(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children_ref(next).iter().rev().copied());
        }
        out
    }

    /// Ids of all datasets in depth-first order
    pub fn dataset_ids(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.is_dataset_id(id))
            .collect()
    }

    /// Paths of all datasets in depth-first order
    pub fn dataset_paths(&self) -> Vec<String> {
        self.dataset_ids().into_iter().map(|id| self.path_of(id)).collect()
    }

    /// Paths of all groups except the root, depth-first
    pub fn group_paths(&self) -> Vec<String> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.is_group_id(id))
            .map(|id| self.path_of(id))
            .collect()
    }
}
