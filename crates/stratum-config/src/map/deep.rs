use serde_json::Value;

use super::Mapping;

/// Merge `overlay` on top of `base`, returning a new mapping.
///
/// - Mappings present on both sides merge recursively, key by key.
/// - Anything else in the overlay (scalars, sequences, `null`) **replaces**
///   the base value wholesale. Sequences are never concatenated.
///
/// Neither input is modified.
#[must_use]
pub fn deep_merge(base: &Mapping, overlay: &Mapping) -> Mapping {
    let mut merged = base.clone();
    merge_into(&mut merged, overlay);
    merged
}

/// In-place form of [`deep_merge`]: fold `overlay` into `base`.
pub fn merge_into(base: &mut Mapping, overlay: &Mapping) {
    for (key, overlay_val) in overlay {
        if let (Some(Value::Object(base_map)), Value::Object(overlay_map)) =
            (base.get_mut(key), overlay_val)
        {
            merge_into(base_map, overlay_map);
            continue;
        }
        base.insert(key.clone(), overlay_val.clone());
    }
}
