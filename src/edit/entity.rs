//! Shared plumbing for the entity-directory variants.
//!
//! Copy, add, rename, and delete of course instances, assessments, and
//! questions all follow the same shape: enumerate sibling names, allocate
//! a fresh name, mutate one directory tree, rewrite one info file. The
//! helpers here keep that logic in one place.

use std::path::Path;

use serde_json::Value;

use super::EditError;
use crate::core::fsops;
use crate::core::types::EntityId;

/// Sharing declarations that a copy must never inherit.
const SHARING_KEYS: [&str; 3] = ["sharingSets", "sharePublicly", "shareSourcePublicly"];

/// Read one entity's long name from its info file, tolerating missing or
/// unparsable files (the copy algorithm falls back to `Unknown`).
pub(crate) fn read_long_name(info_path: &Path, field: &str) -> Option<String> {
    let value = fsops::read_json(info_path).ok()?;
    value.get(field)?.as_str().map(str::to_string)
}

/// Collect the long names of all sibling entities under `root`.
pub(crate) fn collect_long_names(
    root: &Path,
    short_names: &[String],
    info_basename: &str,
    field: &str,
) -> Vec<String> {
    short_names
        .iter()
        .filter_map(|short| {
            let info = crate::core::paths::join_relative(root, short).join(info_basename);
            read_long_name(&info, field)
        })
        .collect()
}

/// Rewrite the info file of a freshly copied entity.
///
/// Assigns a new opaque identifier, overwrites the name field, and strips
/// every sharing declaration. All other fields pass through untouched.
pub(crate) fn rewrite_copied_info(
    info_path: &Path,
    name_field: &str,
    new_long_name: &str,
) -> Result<EntityId, EditError> {
    let mut value = fsops::read_json(info_path)?;
    let id = EntityId::generate();
    if let Some(object) = value.as_object_mut() {
        object.insert("uuid".to_string(), Value::String(id.to_string()));
        object.insert(
            name_field.to_string(),
            Value::String(new_long_name.to_string()),
        );
        for key in SHARING_KEYS {
            object.remove(key);
        }
    }
    fsops::write_json(info_path, &value)?;
    Ok(id)
}
