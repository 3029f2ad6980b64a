use uuid::Uuid;

use super::catalog::LineCatalog;
use super::collection::CollectionTags;
use super::types::{ChoiceRecord, LineRecord, LineWithChoices};

pub const GROUP_LETTERS: [char; 12] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L'];

pub struct ChoiceSpec {
    pub title: String,
    pub primary_points: i32,
    pub secondary_points: i32,
}

impl ChoiceSpec {
    pub fn new(title: impl Into<String>, primary_points: i32, secondary_points: i32) -> Self {
        Self {
            title: title.into(),
            primary_points,
            secondary_points,
        }
    }
}

pub fn line(
    title: &str,
    choice_limit: u32,
    tags: &[&str],
    choice_collection_limit: Option<u32>,
    choices: &[ChoiceSpec],
) -> LineWithChoices {
    let line_id = Uuid::new_v4();
    LineWithChoices {
        line: LineRecord {
            id: line_id,
            title: title.to_owned(),
            choice_limit,
            collection: CollectionTags::new(tags.iter().copied()),
            choice_collection_limit,
            sort_order: 0,
        },
        choices: choices
            .iter()
            .map(|spec| ChoiceRecord {
                id: Uuid::new_v4(),
                line_id,
                title: spec.title.clone(),
                flag: String::new(),
                primary_points: spec.primary_points,
                secondary_points: spec.secondary_points,
                is_primary_win: false,
                is_secondary_win: false,
            })
            .collect(),
    }
}

/// Twelve four-team group lines sharing the `group-winner` tag plus a
/// standalone championship line.
pub fn group_stage_catalog() -> LineCatalog {
    let mut lines: Vec<_> = GROUP_LETTERS
        .iter()
        .map(|letter| {
            let teams: Vec<_> = (1..=4)
                .map(|seed| ChoiceSpec::new(format!("Team {letter}{seed}"), 20, 10))
                .collect();
            line(
                &format!("Group {letter} Winner"),
                1,
                &["group-winner"],
                Some(12),
                &teams,
            )
        })
        .collect();
    lines.push(line(
        "Championship",
        1,
        &[],
        None,
        &[
            ChoiceSpec::new("Team A1", 50, 0),
            ChoiceSpec::new("Team B1", 50, 0),
            ChoiceSpec::new("Team C1", 50, 0),
        ],
    ));
    LineCatalog::new(lines)
}
