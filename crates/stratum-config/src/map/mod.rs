//! Generic operations on nested mappings addressed by dotted paths.
//!
//! Every configuration tree in this crate is a [`serde_json::Value`] whose
//! root is a [`Mapping`]. Paths use `.` between segments: `database.host`
//! addresses `{"database": {"host": ...}}`.

mod deep;
mod flat;
mod path;

pub use deep::{deep_merge, merge_into};
pub use flat::{flatten, leaf_paths, unflatten};
pub use path::{PATH_SEPARATOR, deep_get, deep_get_or, deep_remove, deep_set, join_path, split_path};

/// A string-keyed mapping that preserves insertion order.
pub type Mapping = serde_json::Map<String, serde_json::Value>;
