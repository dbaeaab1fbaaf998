//! The tree archive: a ZIP file holding the hierarchy as a JSON manifest and
//! one Parquet blob per dataset.
//!
//! ```text
//! read_0001.fast5
//! ├── mimetype                 "application/x-poreshrink-tree" (stored, first)
//! ├── tree.json                groups, attributes, dataset entries
//! └── datasets/
//!     ├── 000000.parquet       one blob per dataset (stored)
//!     └── ...
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use log::debug;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::codec::{decode_dataset, encode_dataset};
use super::compression::Compression;
use super::error::ContainerError;
use super::tree::{Attributes, Dataset, NodeId, Tree};

/// MIME type stored in the first archive entry
pub const TREE_MIMETYPE: &str = "application/x-poreshrink-tree";

/// Version of the manifest layout
pub const TREE_FORMAT_VERSION: &str = "1.0";

const MIMETYPE_ENTRY: &str = "mimetype";
const MANIFEST_ENTRY: &str = "tree.json";

#[derive(Debug, Serialize, Deserialize)]
struct TreeManifest {
    format_version: String,
    root: NodeManifest,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeManifest {
    name: String,
    #[serde(default)]
    attrs: Attributes,
    kind: NodeManifestKind,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NodeManifestKind {
    Group {
        children: Vec<NodeManifest>,
    },
    Dataset {
        entry: String,
        compression: Compression,
        compound: bool,
    },
}

/// Load a tree archive from disk
pub fn read_tree(path: &Path) -> Result<Tree, ContainerError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    let mimetype = read_entry(&mut archive, MIMETYPE_ENTRY)?;
    if mimetype != TREE_MIMETYPE.as_bytes() {
        return Err(ContainerError::InvalidFormat(format!(
            "unexpected mimetype '{}'",
            String::from_utf8_lossy(&mimetype)
        )));
    }

    let manifest: TreeManifest = serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)?)?;
    if manifest.format_version != TREE_FORMAT_VERSION {
        return Err(ContainerError::InvalidFormat(format!(
            "unsupported format version {}",
            manifest.format_version
        )));
    }

    let mut tree = Tree::new();
    let root = tree.root();
    let NodeManifest { attrs, kind, .. } = manifest.root;
    if let Some(root_attrs) = tree.attrs_mut(root) {
        *root_attrs = attrs;
    }
    match kind {
        NodeManifestKind::Group { children } => {
            for child in children {
                load_node(&mut tree, &mut archive, "", child)?;
            }
        }
        NodeManifestKind::Dataset { .. } => {
            return Err(ContainerError::InvalidFormat(
                "root node must be a group".to_string(),
            ))
        }
    }
    debug!("Read {} datasets from {}", tree.dataset_ids().len(), path.display());
    Ok(tree)
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, ContainerError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|_| ContainerError::InvalidFormat(format!("archive missing {}", name)))?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn load_node<R: Read + std::io::Seek>(
    tree: &mut Tree,
    archive: &mut ZipArchive<R>,
    parent: &str,
    node: NodeManifest,
) -> Result<(), ContainerError> {
    if node.name.is_empty() || node.name.contains('/') {
        return Err(ContainerError::InvalidFormat(format!(
            "invalid node name '{}'",
            node.name
        )));
    }
    let path = format!("{}/{}", parent, node.name);
    let id = match node.kind {
        NodeManifestKind::Group { children } => {
            let id = tree.create_group(&path)?;
            for child in children {
                load_node(tree, archive, &path, child)?;
            }
            id
        }
        NodeManifestKind::Dataset {
            entry,
            compression,
            compound,
        } => {
            let blob = Bytes::from(read_entry(archive, &entry)?);
            let value = decode_dataset(blob, compound)?;
            tree.create_dataset(&path, Dataset::new(value, compression))?
        }
    };
    if let Some(attrs) = tree.attrs_mut(id) {
        *attrs = node.attrs;
    }
    Ok(())
}

/// Write a tree archive, replacing `path` atomically.
///
/// The archive is assembled in a temporary file next to `path` and persisted
/// over it only once complete.
pub fn write_tree(tree: &Tree, path: &Path) -> Result<(), ContainerError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut temp = NamedTempFile::new_in(&dir)?;
    {
        let mut zip = ZipWriter::new(BufWriter::new(temp.as_file_mut()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file(MIMETYPE_ENTRY, stored)?;
        zip.write_all(TREE_MIMETYPE.as_bytes())?;

        let mut entries = 0usize;
        let root = save_node(tree, tree.root(), &mut zip, stored, &mut entries)?;
        let manifest = TreeManifest {
            format_version: TREE_FORMAT_VERSION.to_string(),
            root,
        };

        zip.start_file(MANIFEST_ENTRY, deflated)?;
        zip.write_all(&serde_json::to_vec(&manifest)?)?;

        let mut inner = zip.finish()?;
        inner.flush()?;
    }
    temp.persist(path).map_err(|e| ContainerError::IoError(e.error))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn save_node<W: Write + std::io::Seek>(
    tree: &Tree,
    id: NodeId,
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    entries: &mut usize,
) -> Result<NodeManifest, ContainerError> {
    let name = tree.name(id).unwrap_or_default().to_string();
    let attrs = tree.attrs(id).cloned().unwrap_or_default();
    let kind = match tree.dataset_by_id(id) {
        Some(dataset) => {
            let entry = format!("datasets/{:06}.parquet", *entries);
            *entries += 1;
            zip.start_file(entry.as_str(), options)?;
            zip.write_all(&encode_dataset(&dataset.value, dataset.compression)?)?;
            NodeManifestKind::Dataset {
                entry,
                compression: dataset.compression,
                compound: dataset.value.is_compound(),
            }
        }
        None => NodeManifestKind::Group {
            children: tree
                .children(id)
                .into_iter()
                .map(|child| save_node(tree, child, zip, options, entries))
                .collect::<Result<_, _>>()?,
        },
    };
    Ok(NodeManifest { name, attrs, kind })
}

/// An open container file.
///
/// Edits happen on the in-memory [`Tree`]; nothing touches the file until
/// [`Container::close`] commits the tree back atomically. Dropping a container
/// without closing it discards the edits.
#[derive(Debug)]
pub struct Container {
    path: PathBuf,
    tree: Tree,
}

impl Container {
    /// Open an existing container
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ContainerError> {
        let path = path.as_ref().to_path_buf();
        let tree = read_tree(&path)?;
        Ok(Self { path, tree })
    }

    /// A new, not yet written container at `path`
    pub fn create<P: AsRef<Path>>(path: P, tree: Tree) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            tree,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    /// Write the tree to another path, leaving this container open
    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> Result<(), ContainerError> {
        write_tree(&self.tree, path.as_ref())
    }

    /// Commit the tree back to the container's own path
    pub fn close(self) -> Result<(), ContainerError> {
        write_tree(&self.tree, &self.path)
    }
}
