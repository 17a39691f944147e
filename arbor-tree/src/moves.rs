//! Destination planning for dragging a selection onto a directory.

use arbor_vfs::path::{base_name, is_ancestor, join, rebase};

use crate::error::TreeError;
use crate::flat::case_insensitive_cmp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: String,
    pub destination: String,
    /// False when a selected ancestor's rename already carries this entry.
    pub should_rename: bool,
    /// Outermost selected ancestor-or-self; the path actually renamed.
    anchor: String,
}

/// Fail if any selected path is the target or contains it.
pub fn validate_move(selected: &[String], target: &str) -> Result<(), TreeError> {
    for path in selected {
        if path == target || is_ancestor(target, path) {
            return Err(TreeError::InvalidMove {
                path: path.clone(),
                target: target.to_string(),
            });
        }
    }
    Ok(())
}

/// Compute where every selected path lands under `target`.
///
/// Paths are processed in case-insensitive order, so ancestors come before
/// their descendants. A path below an already-processed selected path is
/// carried by that path's rename and keeps its relative position beneath it.
pub fn plan_moves(selected: &[String], target: &str) -> Vec<PlannedMove> {
    let mut sorted: Vec<String> = selected.to_vec();
    sorted.sort_by(|a, b| case_insensitive_cmp(a, b));
    sorted.dedup();

    let mut plan: Vec<PlannedMove> = Vec::with_capacity(sorted.len());
    for path in sorted {
        let carried_by = plan
            .iter()
            .rposition(|processed| is_ancestor(&path, &processed.source));

        let planned = match carried_by {
            Some(i) => {
                let anchor = plan[i].anchor.clone();
                PlannedMove {
                    destination: rebase(&path, &anchor, &join(target, base_name(&anchor))),
                    source: path,
                    should_rename: false,
                    anchor,
                }
            }
            None => PlannedMove {
                destination: join(target, base_name(&path)),
                anchor: path.clone(),
                source: path,
                should_rename: true,
            },
        };
        plan.push(planned);
    }
    plan
}

/// Destinations that already exist (per `exists`) or that two planned moves
/// share.
pub fn find_collisions(plan: &[PlannedMove], exists: impl Fn(&str) -> bool) -> Vec<String> {
    let mut seen: Vec<&str> = Vec::with_capacity(plan.len());
    let mut collisions = Vec::new();
    for planned in plan {
        let dest = planned.destination.as_str();
        if exists(dest) || seen.contains(&dest) {
            collisions.push(dest.to_string());
        }
        seen.push(dest);
    }
    collisions
}
