use std::collections::{BTreeSet, HashSet};

use crate::connection::AttachTarget;

/// Ids that occur more than once in an inventory snapshot.
///
/// Targets without an id are skipped entirely. The result is ordered so it
/// can be shown to the user as-is.
pub fn find_duplicate_target_ids(targets: &[AttachTarget]) -> BTreeSet<String> {
    let mut seen = HashSet::with_capacity(targets.len());
    let mut duplicates = BTreeSet::new();

    for id in targets.iter().filter_map(|target| target.id.as_deref()) {
        if !seen.insert(id) {
            duplicates.insert(id.to_string());
        }
    }

    duplicates
}
