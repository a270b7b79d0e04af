//! Checkbox markup parsing and content rewriting.
//!
//! # Responsibility
//! - Extract ordered checklist items from free-form note content.
//! - Rewrite individual checkbox lines (marker, text, removal) without
//!   touching any other byte of the content.
//! - Plan the diff that aligns materialized child notes with parsed items.
//!
//! # Invariants
//! - Only lines shaped like `- [ ] text` / `- [x] text` count as items; the
//!   list marker may be `-`, `*` or `+` and the check marker is
//!   case-insensitive.
//! - Items are identified by their literal text. Duplicate texts are
//!   independent entries, told apart only by their order.
//! - Nothing here touches storage.

use crate::model::note::NoteId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

static CHECKBOX_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[-*+]\s*\[([ xX])\]\s*(\S.*?)\s*$").expect("valid checkbox regex")
});

/// One checkbox line parsed from note content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub text: String,
    pub completed: bool,
}

impl ChecklistItem {
    pub fn new(text: impl Into<String>, completed: bool) -> Self {
        Self {
            text: text.into(),
            completed,
        }
    }

    /// Renders the canonical `- [ ] text` form.
    pub fn to_markdown(&self) -> String {
        let marker = if self.completed { 'x' } else { ' ' };
        format!("- [{marker}] {}", self.text)
    }
}

/// Completion summary for a note's checklist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChecklistProgress {
    pub total: u32,
    pub completed: u32,
    /// 0.0..=100.0; 0.0 for an empty checklist.
    pub percent: f32,
}

impl ChecklistProgress {
    pub fn from_items(items: &[ChecklistItem]) -> Self {
        Self {
            total: items.len() as u32,
            completed: count_completed(items) as u32,
            percent: progress_percent(items),
        }
    }
}

/// Parses every checkbox line in `content`, in order.
pub fn parse_checklist(content: &str) -> Vec<ChecklistItem> {
    split_lines(content)
        .into_iter()
        .filter_map(|(body, _)| {
            match_line(body).map(|found| ChecklistItem {
                text: body[found.text].to_string(),
                completed: found.completed,
            })
        })
        .collect()
}

/// Returns `content` with all checkbox lines removed and outer whitespace
/// trimmed.
pub fn strip_checklist(content: &str) -> String {
    split_lines(content)
        .into_iter()
        .filter(|(body, _)| match_line(body).is_none())
        .map(|(body, _)| body)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Renders items as canonical checkbox lines joined by `\n`.
pub fn format_checklist(items: &[ChecklistItem]) -> String {
    items
        .iter()
        .map(ChecklistItem::to_markdown)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn count_completed(items: &[ChecklistItem]) -> usize {
    items.iter().filter(|item| item.completed).count()
}

pub fn progress_percent(items: &[ChecklistItem]) -> f32 {
    if items.is_empty() {
        return 0.0;
    }
    count_completed(items) as f32 / items.len() as f32 * 100.0
}

/// Sets the checked marker of one line carrying `text`.
///
/// Picks the first occurrence whose state differs from `completed`, so
/// repeated calls walk through duplicate lines; when every occurrence already
/// has the requested state the first one is used and content is unchanged.
/// Returns `None` when no line carries `text`.
pub fn set_item_status(content: &str, text: &str, completed: bool) -> Option<String> {
    let states = occurrence_states(content, text);
    let occurrence = states
        .iter()
        .position(|state| *state != completed)
        .or(if states.is_empty() { None } else { Some(0) })?;
    set_item_status_at(content, text, occurrence, completed)
}

/// Sets the checked marker of the `occurrence`-th line carrying `text`.
pub fn set_item_status_at(
    content: &str,
    text: &str,
    occurrence: usize,
    completed: bool,
) -> Option<String> {
    edit_occurrence(content, text, occurrence, |body, found| {
        if found.completed == completed {
            return Some(body.to_string());
        }
        let marker = if completed { "x" } else { " " };
        Some(format!(
            "{}{marker}{}",
            &body[..found.marker_at],
            &body[found.marker_at + 1..]
        ))
    })
}

/// Replaces the text of the `occurrence`-th line carrying `text`, keeping its
/// indentation and markers.
pub fn rename_item_at(
    content: &str,
    text: &str,
    occurrence: usize,
    new_text: &str,
) -> Option<String> {
    edit_occurrence(content, text, occurrence, |body, found| {
        Some(format!(
            "{}{new_text}{}",
            &body[..found.text.start],
            &body[found.text.end..]
        ))
    })
}

/// Drops the `occurrence`-th line carrying `text`, terminator included.
pub fn remove_item_at(content: &str, text: &str, occurrence: usize) -> Option<String> {
    edit_occurrence(content, text, occurrence, |_, _| None)
}

/// A materialized child as seen by reconciliation, in position order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingChild {
    pub id: NoteId,
    pub title: String,
    pub is_done: bool,
    pub position: i64,
}

/// Child to materialize for an item with no backing note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChild {
    pub title: String,
    pub is_done: bool,
    pub position: i64,
}

/// Matched child whose completion flag or position drifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildUpdate {
    pub id: NoteId,
    pub is_done: bool,
    pub position: i64,
}

/// Diff between a parent's children and its parsed checklist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub create: Vec<NewChild>,
    pub update: Vec<ChildUpdate>,
    pub remove: Vec<NoteId>,
}

/// Counts of child rows touched by one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }

    pub fn outcome(&self) -> ReconcileOutcome {
        ReconcileOutcome {
            created: self.create.len(),
            updated: self.update.len(),
            removed: self.remove.len(),
        }
    }
}

/// Matches items to existing children by text, first-available in position
/// order, so same-text items bind positionally.
///
/// `existing` must be sorted by position. Children left unclaimed are
/// scheduled for removal; items left unmatched are materialized.
pub fn plan_reconcile(existing: &[ExistingChild], items: &[ChecklistItem]) -> ReconcilePlan {
    let mut claimed = vec![false; existing.len()];
    let mut plan = ReconcilePlan::default();

    for (index, item) in items.iter().enumerate() {
        let position = index as i64;
        let matched = existing
            .iter()
            .enumerate()
            .find(|(slot, child)| !claimed[*slot] && child.title == item.text);

        match matched {
            Some((slot, child)) => {
                claimed[slot] = true;
                if child.is_done != item.completed || child.position != position {
                    plan.update.push(ChildUpdate {
                        id: child.id,
                        is_done: item.completed,
                        position,
                    });
                }
            }
            None => plan.create.push(NewChild {
                title: item.text.clone(),
                is_done: item.completed,
                position,
            }),
        }
    }

    plan.remove = existing
        .iter()
        .zip(&claimed)
        .filter(|(_, claimed)| !**claimed)
        .map(|(child, _)| child.id)
        .collect();
    plan
}

struct LineMatch {
    /// Byte offset of the check marker inside the line.
    marker_at: usize,
    text: Range<usize>,
    completed: bool,
}

fn match_line(line: &str) -> Option<LineMatch> {
    let caps = CHECKBOX_LINE_RE.captures(line)?;
    let marker = caps.get(1)?;
    let text = caps.get(2)?;
    Some(LineMatch {
        marker_at: marker.start(),
        text: text.range(),
        completed: marker.as_str().eq_ignore_ascii_case("x"),
    })
}

/// Splits content into `(body, terminator)` pairs so rewrites can restore the
/// original line endings exactly.
fn split_lines(content: &str) -> Vec<(&str, &str)> {
    content
        .split_inclusive('\n')
        .map(|segment| {
            let body = segment
                .strip_suffix('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line))
                .unwrap_or(segment);
            (body, &segment[body.len()..])
        })
        .collect()
}

fn occurrence_states(content: &str, text: &str) -> Vec<bool> {
    split_lines(content)
        .into_iter()
        .filter_map(|(body, _)| match_line(body).filter(|found| &body[found.text.clone()] == text))
        .map(|found| found.completed)
        .collect()
}

fn edit_occurrence(
    content: &str,
    text: &str,
    occurrence: usize,
    edit: impl FnOnce(&str, &LineMatch) -> Option<String>,
) -> Option<String> {
    let lines = split_lines(content);
    let (target, found) = lines
        .iter()
        .enumerate()
        .filter_map(|(index, (body, _))| {
            match_line(body)
                .filter(|found| &body[found.text.clone()] == text)
                .map(|found| (index, found))
        })
        .nth(occurrence)?;

    let replacement = edit(lines[target].0, &found);
    let mut rewritten = String::with_capacity(content.len());
    for (index, (body, terminator)) in lines.iter().enumerate() {
        if index != target {
            rewritten.push_str(body);
            rewritten.push_str(terminator);
        } else if let Some(line) = replacement.as_deref() {
            rewritten.push_str(line);
            rewritten.push_str(terminator);
        }
    }
    Some(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn parse_recognizes_markers_and_case() {
        let content = "intro\n- [ ] milk\n* [x] eggs\n+ [X] bread\n  - [ ]   butter  \nplain - [ ] no";
        let items = parse_checklist(content);
        assert_eq!(
            items,
            vec![
                ChecklistItem::new("milk", false),
                ChecklistItem::new("eggs", true),
                ChecklistItem::new("bread", true),
                ChecklistItem::new("butter", false),
            ]
        );
    }

    #[test]
    fn parse_ignores_empty_and_malformed_lines() {
        assert!(parse_checklist("").is_empty());
        assert!(parse_checklist("no boxes here").is_empty());
        assert!(parse_checklist("- [ ]\n- [ ]    \n- [-] dash\n- [xx] two\n[ ] bare").is_empty());
    }

    #[test]
    fn parse_keeps_duplicates_in_order() {
        let items = parse_checklist("- [x] a\r\n- [ ] a\r\n");
        assert_eq!(
            items,
            vec![ChecklistItem::new("a", true), ChecklistItem::new("a", false)]
        );
    }

    #[test]
    fn strip_removes_checkbox_lines() {
        let stripped = strip_checklist("Shopping\n- [ ] milk\n\nremember cash\n- [x] eggs\n");
        assert_eq!(stripped, "Shopping\n\nremember cash");
    }

    #[test]
    fn set_status_flips_only_the_marker() {
        let content = "title\n  * [ ] milk  \r\n- [ ] eggs";
        let updated = set_item_status(content, "milk", true).unwrap();
        assert_eq!(updated, "title\n  * [x] milk  \r\n- [ ] eggs");
    }

    #[test]
    fn set_status_walks_duplicates_by_state() {
        let content = "- [ ] a\n- [ ] a\n";
        let first = set_item_status(content, "a", true).unwrap();
        assert_eq!(first, "- [x] a\n- [ ] a\n");
        let second = set_item_status(&first, "a", true).unwrap();
        assert_eq!(second, "- [x] a\n- [x] a\n");
        let third = set_item_status(&second, "a", true).unwrap();
        assert_eq!(third, second);
    }

    #[test]
    fn set_status_misses_unknown_text() {
        assert!(set_item_status("- [ ] a", "b", true).is_none());
        assert!(set_item_status_at("- [ ] a", "a", 1, true).is_none());
    }

    #[test]
    fn rename_and_remove_target_one_occurrence() {
        let content = "- [ ] a\n- [x] a\nend";
        assert_eq!(
            rename_item_at(content, "a", 1, "b").unwrap(),
            "- [ ] a\n- [x] b\nend"
        );
        assert_eq!(remove_item_at(content, "a", 0).unwrap(), "- [x] a\nend");
    }

    #[test]
    fn progress_handles_empty_list() {
        assert_eq!(progress_percent(&[]), 0.0);
        let items = vec![
            ChecklistItem::new("a", true),
            ChecklistItem::new("b", false),
            ChecklistItem::new("c", false),
            ChecklistItem::new("d", true),
        ];
        assert_eq!(count_completed(&items), 2);
        assert_eq!(progress_percent(&items), 50.0);
    }

    #[test]
    fn format_emits_canonical_lines() {
        let items = vec![ChecklistItem::new("a", true), ChecklistItem::new("b", false)];
        assert_eq!(format_checklist(&items), "- [x] a\n- [ ] b");
    }

    fn child(title: &str, is_done: bool, position: i64) -> ExistingChild {
        ExistingChild {
            id: Uuid::new_v4(),
            title: title.to_string(),
            is_done,
            position,
        }
    }

    #[test]
    fn plan_matches_by_text_and_removes_stale_children() {
        let existing = vec![child("a", false, 0), child("b", false, 1), child("c", true, 2)];
        let items = vec![ChecklistItem::new("c", true), ChecklistItem::new("d", false)];
        let plan = plan_reconcile(&existing, &items);

        assert_eq!(
            plan.update,
            vec![ChildUpdate {
                id: existing[2].id,
                is_done: true,
                position: 0
            }]
        );
        assert_eq!(
            plan.create,
            vec![NewChild {
                title: "d".to_string(),
                is_done: false,
                position: 1
            }]
        );
        assert_eq!(plan.remove, vec![existing[0].id, existing[1].id]);
    }

    #[test]
    fn plan_binds_duplicate_texts_positionally() {
        let existing = vec![child("a", true, 0), child("a", false, 1)];
        let items = vec![ChecklistItem::new("a", true), ChecklistItem::new("a", true)];
        let plan = plan_reconcile(&existing, &items);

        assert!(plan.create.is_empty());
        assert!(plan.remove.is_empty());
        assert_eq!(plan.update.len(), 1);
        assert_eq!(plan.update[0].id, existing[1].id);
    }

    #[test]
    fn plan_is_empty_when_children_already_match() {
        let existing = vec![child("a", true, 0), child("b", false, 1)];
        let items = vec![ChecklistItem::new("a", true), ChecklistItem::new("b", false)];
        assert!(plan_reconcile(&existing, &items).is_empty());
    }
}
