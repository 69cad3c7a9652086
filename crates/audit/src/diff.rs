//! Field-level before/after diffing over a tracked-field allow-list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Old/new value pair for one tracked field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: JsonValue,
    pub new: JsonValue,
}

/// Compute changes between two entity snapshots.
///
/// Only fields on the allow-list are compared - volatile or irrelevant
/// columns outside it never inflate the audit payload. A field is reported
/// iff it is present and non-null on **both** sides and the values differ;
/// appearing or disappearing fields are not changes.
pub fn diff_tracked(
    before: &JsonValue,
    after: &JsonValue,
    tracked: &[&str],
) -> BTreeMap<String, FieldChange> {
    let mut changes = BTreeMap::new();

    let (Some(before), Some(after)) = (before.as_object(), after.as_object()) else {
        return changes;
    };

    for field in tracked {
        let old = before.get(*field).filter(|v| !v.is_null());
        let new = after.get(*field).filter(|v| !v.is_null());

        if let (Some(old), Some(new)) = (old, new) {
            if old != new {
                changes.insert(
                    (*field).to_string(),
                    FieldChange {
                        old: old.clone(),
                        new: new.clone(),
                    },
                );
            }
        }
    }

    changes
}
