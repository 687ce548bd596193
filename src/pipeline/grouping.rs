//! Spatial grouping: assign note references to group regions by x-range.
//!
//! Groups are read left to right. A note belongs to every group whose
//! horizontal extent contains the note's left edge, and within a group notes
//! read top to bottom, then left to right. Vertical position plays no part in
//! membership: a group is a column of the timeline.

use super::canvas::{GroupRegion, NoteRef};
use std::cmp::Ordering;

/// Label used for regions without a label.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Label of the trailing bucket of notes outside every group.
pub const UNGROUPED_LABEL: &str = "ungrouped";

/// A group region and its ordered notes.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteGroup {
    /// `None` for the ungrouped bucket.
    pub region: Option<GroupRegion>,
    /// Lower-cased display label.
    pub label: String,
    pub notes: Vec<NoteRef>,
}

impl NoteGroup {
    /// Value written to a note's group frontmatter key.
    pub fn metadata_label(&self) -> String {
        self.region
            .as_ref()
            .and_then(|r| r.label.as_deref())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "none".to_string())
    }
}

/// Sort groups by x, collect each group's notes and order them.
///
/// Notes outside every group are dropped unless `include_ungrouped` is set,
/// in which case they form a final [`UNGROUPED_LABEL`] bucket.
pub fn assign_groups(
    groups: &[GroupRegion],
    notes: &[NoteRef],
    include_ungrouped: bool,
) -> Vec<NoteGroup> {
    let mut sorted: Vec<&GroupRegion> = groups.iter().collect();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut result: Vec<NoteGroup> = sorted
        .into_iter()
        .map(|region| {
            let mut members: Vec<NoteRef> = notes
                .iter()
                .filter(|n| region.contains(n))
                .cloned()
                .collect();
            sort_notes(&mut members);
            NoteGroup {
                label: region
                    .label
                    .as_deref()
                    .map(str::to_lowercase)
                    .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
                region: Some(region.clone()),
                notes: members,
            }
        })
        .collect();

    if include_ungrouped {
        let mut loose: Vec<NoteRef> = ungrouped(groups, notes).cloned().collect();
        if !loose.is_empty() {
            sort_notes(&mut loose);
            result.push(NoteGroup {
                region: None,
                label: UNGROUPED_LABEL.to_string(),
                notes: loose,
            });
        }
    }

    result
}

/// Number of notes contained in no group.
pub fn count_ungrouped(groups: &[GroupRegion], notes: &[NoteRef]) -> usize {
    ungrouped(groups, notes).count()
}

fn ungrouped<'a>(
    groups: &'a [GroupRegion],
    notes: &'a [NoteRef],
) -> impl Iterator<Item = &'a NoteRef> + 'a {
    notes
        .iter()
        .filter(move |n| !groups.iter().any(|g| g.contains(n)))
}

fn sort_notes(notes: &mut [NoteRef]) {
    notes.sort_by(note_order);
}

/// Reading order within a group: ascending y, then x, then canvas order.
pub fn note_order(a: &NoteRef, b: &NoteRef) -> Ordering {
    a.y.total_cmp(&b.y)
        .then_with(|| a.x.total_cmp(&b.x))
        .then_with(|| a.source_index.cmp(&b.source_index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(label: Option<&str>, x: f64, width: f64, index: usize) -> GroupRegion {
        GroupRegion {
            id: None,
            x,
            y: 0.0,
            width,
            height: 1000.0,
            label: label.map(str::to_string),
            source_index: index,
        }
    }

    fn note(file: &str, x: f64, y: f64, index: usize) -> NoteRef {
        NoteRef {
            id: None,
            x,
            y,
            width: 50.0,
            height: 50.0,
            file: Some(file.to_string()),
            source_index: index,
        }
    }

    fn files(g: &NoteGroup) -> Vec<&str> {
        g.notes.iter().filter_map(|n| n.file.as_deref()).collect()
    }

    #[test]
    fn act_one_orders_by_y_then_x() {
        let groups = [group(Some("Act One"), 0.0, 100.0, 0)];
        let notes = [
            note("A.md", 10.0, 5.0, 0),
            note("B.md", 50.0, 5.0, 1),
            note("C.md", 20.0, 1.0, 2),
        ];
        let result = assign_groups(&groups, &notes, false);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].label, "act one");
        assert_eq!(files(&result[0]), vec!["C.md", "A.md", "B.md"]);
    }

    #[test]
    fn groups_read_left_to_right() {
        let groups = [
            group(Some("Act Two"), 200.0, 100.0, 0),
            group(Some("Act One"), 0.0, 100.0, 1),
        ];
        let notes = [note("Late.md", 250.0, 0.0, 0), note("Early.md", 10.0, 0.0, 1)];
        let result = assign_groups(&groups, &notes, false);
        let labels: Vec<&str> = result.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["act one", "act two"]);
        assert_eq!(files(&result[0]), vec!["Early.md"]);
        assert_eq!(files(&result[1]), vec!["Late.md"]);
    }

    #[test]
    fn right_edge_is_inclusive() {
        let groups = [group(Some("G"), 0.0, 100.0, 0)];
        let notes = [note("Edge.md", 100.0, 0.0, 0), note("Out.md", 100.01, 0.0, 1)];
        let result = assign_groups(&groups, &notes, false);
        assert_eq!(files(&result[0]), vec!["Edge.md"]);
        assert_eq!(count_ungrouped(&groups, &notes), 1);
    }

    #[test]
    fn missing_label_is_unknown_and_metadata_none() {
        let groups = [group(None, 0.0, 10.0, 0)];
        let result = assign_groups(&groups, &[], false);
        assert_eq!(result[0].label, "unknown");
        assert_eq!(result[0].metadata_label(), "none");
        assert!(result[0].notes.is_empty());
    }

    #[test]
    fn true_ties_keep_canvas_order() {
        let groups = [group(Some("G"), 0.0, 100.0, 0)];
        let notes = [note("First.md", 5.0, 5.0, 0), note("Second.md", 5.0, 5.0, 1)];
        let result = assign_groups(&groups, &notes, false);
        assert_eq!(files(&result[0]), vec!["First.md", "Second.md"]);
    }

    #[test]
    fn equal_x_groups_keep_canvas_order() {
        let groups = [group(Some("B"), 0.0, 10.0, 0), group(Some("A"), 0.0, 10.0, 1)];
        let result = assign_groups(&groups, &[], false);
        assert_eq!(result[0].label, "b");
        assert_eq!(result[1].label, "a");
    }

    #[test]
    fn overlapping_groups_each_get_the_note() {
        let groups = [
            group(Some("Wide"), 0.0, 500.0, 0),
            group(Some("Narrow"), 50.0, 100.0, 1),
        ];
        let notes = [note("Both.md", 60.0, 0.0, 0)];
        let result = assign_groups(&groups, &notes, false);
        assert_eq!(files(&result[0]), vec!["Both.md"]);
        assert_eq!(files(&result[1]), vec!["Both.md"]);
    }

    #[test]
    fn ungrouped_bucket_is_opt_in() {
        let groups = [group(Some("G"), 0.0, 10.0, 0)];
        let notes = [note("Loose.md", 500.0, 3.0, 0), note("In.md", 5.0, 0.0, 1)];

        let dropped = assign_groups(&groups, &notes, false);
        assert_eq!(dropped.len(), 1);

        let kept = assign_groups(&groups, &notes, true);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].label, "ungrouped");
        assert!(kept[1].region.is_none());
        assert_eq!(files(&kept[1]), vec!["Loose.md"]);
    }

    #[test]
    fn note_order_matches_sort() {
        let a = note("a", 1.0, 1.0, 0);
        let b = note("b", 0.0, 2.0, 1);
        assert_eq!(note_order(&a, &b), Ordering::Less);
    }
}
