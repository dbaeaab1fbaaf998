//! Container model: a tree of groups and datasets with attributes, and the
//! tree archive that stores it on disk.

mod archive;
mod codec;
mod compression;
mod error;
mod tree;
mod value;

pub use archive::{read_tree, write_tree, Container, TREE_FORMAT_VERSION, TREE_MIMETYPE};
pub use codec::{decode_dataset, encode_dataset, UNNAMED_FIELD};
pub use compression::Compression;
pub use error::ContainerError;
pub use tree::{
    normalize, segments, split_parent, Attributes, Dataset, DatasetValue, Field, NodeId, Tree,
};
pub use value::{trim_nul, AttrValue, Column, DType, Scalar};

#[cfg(test)]
mod tests;
