//! Positional merge of a plugin entry into the registry array.

use super::PluginEntry;

/// Merge `entry` into `current`, keyed by the `Id` field.
///
/// Every existing entry with the same `Id` is substituted in place; when
/// none matches, the entry is appended. All other entries keep their
/// position and content. Returns the merged array and whether the operation
/// was an update (`true`) or a create (`false`).
pub fn merge(current: Vec<PluginEntry>, entry: PluginEntry) -> (Vec<PluginEntry>, bool) {
    let mut merged = Vec::with_capacity(current.len() + 1);
    let mut matched = false;

    for existing in current {
        if existing.id() == entry.id() {
            merged.push(entry.clone());
            matched = true;
        } else {
            merged.push(existing);
        }
    }

    if !matched {
        merged.push(entry);
    }

    (merged, matched)
}
