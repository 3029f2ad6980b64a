use std::collections::HashSet;

use thiserror::Error;

use super::catalog::LineCatalog;
use super::collection::CollectionTags;
use super::types::{ChoiceId, LineId};

pub const DISPLAY_NAME_MIN_CHARS: usize = 3;
pub const DISPLAY_NAME_MAX_CHARS: usize = 26;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickValidationError {
    #[error("at least one choice id is required")]
    Empty,
    #[error("choice id {0} was submitted more than once")]
    Duplicate(ChoiceId),
    #[error("choice {0} does not exist")]
    UnknownChoice(ChoiceId),
    #[error("choices must all belong to the same collection")]
    MixedCollections,
    #[error("choices must all belong to the same line")]
    MixedLines,
    #[error("expected exactly {expected} choices, received {received}")]
    WrongCount { expected: u32, received: usize },
    #[error(
        "display name must be between {} and {} characters",
        DISPLAY_NAME_MIN_CHARS,
        DISPLAY_NAME_MAX_CHARS
    )]
    DisplayNameLength,
}

/// Set of lines whose prior bets a submission replaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PickScope {
    Collection { tags: CollectionTags, limit: u32 },
    Line { line_id: LineId, limit: u32 },
}

/// Outcome of validating a submission against the catalog: the choices to
/// insert and every choice whose existing bets must be removed first.
#[derive(Clone, Debug)]
pub struct ReplacementPlan {
    pub scope: PickScope,
    pub choice_ids: Vec<ChoiceId>,
    pub replaced_choice_ids: Vec<ChoiceId>,
}

pub fn plan_replacement(
    catalog: &LineCatalog,
    choice_ids: &[ChoiceId],
) -> Result<ReplacementPlan, PickValidationError> {
    let first_id = *choice_ids.first().ok_or(PickValidationError::Empty)?;

    let mut seen = HashSet::with_capacity(choice_ids.len());
    for id in choice_ids {
        if !seen.insert(*id) {
            return Err(PickValidationError::Duplicate(*id));
        }
    }

    let mut lines = Vec::with_capacity(choice_ids.len());
    for id in choice_ids {
        let line = catalog
            .line_of_choice(*id)
            .ok_or(PickValidationError::UnknownChoice(*id))?;
        lines.push(line);
    }

    let anchor = catalog
        .line_of_choice(first_id)
        .ok_or(PickValidationError::UnknownChoice(first_id))?;
    if lines.iter().any(|line| line.collection != anchor.collection) {
        return Err(PickValidationError::MixedCollections);
    }

    let received = choice_ids.len();
    let (scope, replaced_choice_ids) = match anchor.choice_collection_limit {
        Some(limit) => {
            ensure_count(limit, received)?;
            let replaced = catalog
                .lines_in_collection(&anchor.collection)
                .flat_map(|entry| entry.choices.iter().map(|choice| choice.id))
                .collect();
            let scope = PickScope::Collection {
                tags: anchor.collection.clone(),
                limit,
            };
            (scope, replaced)
        }
        None => {
            if lines.iter().any(|line| line.id != anchor.id) {
                return Err(PickValidationError::MixedLines);
            }
            ensure_count(anchor.choice_limit, received)?;
            let replaced = catalog
                .line(anchor.id)
                .map(|entry| entry.choices.iter().map(|choice| choice.id).collect())
                .unwrap_or_default();
            let scope = PickScope::Line {
                line_id: anchor.id,
                limit: anchor.choice_limit,
            };
            (scope, replaced)
        }
    };

    Ok(ReplacementPlan {
        scope,
        choice_ids: choice_ids.to_vec(),
        replaced_choice_ids,
    })
}

fn ensure_count(expected: u32, received: usize) -> Result<(), PickValidationError> {
    if usize::try_from(expected).map_or(true, |expected| expected != received) {
        return Err(PickValidationError::WrongCount { expected, received });
    }
    Ok(())
}

/// Trims and length-checks a requested display name.
pub fn validate_display_name(raw: &str) -> Result<String, PickValidationError> {
    let trimmed = raw.trim();
    let chars = trimmed.chars().count();
    if !(DISPLAY_NAME_MIN_CHARS..=DISPLAY_NAME_MAX_CHARS).contains(&chars) {
        return Err(PickValidationError::DisplayNameLength);
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_fixtures::{group_stage_catalog, line, ChoiceSpec};

    #[test]
    fn collection_submission_replaces_whole_collection() {
        let catalog = group_stage_catalog();
        let picks: Vec<_> = catalog
            .lines_in_collection(&CollectionTags::new(["group-winner"]))
            .map(|entry| entry.choices[0].id)
            .collect();
        assert_eq!(picks.len(), 12);

        let plan = plan_replacement(&catalog, &picks).unwrap();
        assert!(matches!(plan.scope, PickScope::Collection { limit: 12, .. }));
        // 12 groups of 4 teams.
        assert_eq!(plan.replaced_choice_ids.len(), 48);
    }

    #[test]
    fn collection_submission_requires_exact_count() {
        let catalog = group_stage_catalog();
        let picks: Vec<_> = catalog
            .lines_in_collection(&CollectionTags::new(["group-winner"]))
            .take(11)
            .map(|entry| entry.choices[0].id)
            .collect();
        let err = plan_replacement(&catalog, &picks).unwrap_err();
        assert_eq!(
            err,
            PickValidationError::WrongCount {
                expected: 12,
                received: 11
            }
        );
    }

    #[test]
    fn single_line_submission_checks_line_limit() {
        let catalog = group_stage_catalog();
        let championship = catalog
            .lines()
            .iter()
            .find(|entry| entry.line.title == "Championship")
            .unwrap();

        let ok = plan_replacement(&catalog, &[championship.choices[0].id]).unwrap();
        assert_eq!(
            ok.scope,
            PickScope::Line {
                line_id: championship.line.id,
                limit: 1
            }
        );
        assert_eq!(ok.replaced_choice_ids.len(), championship.choices.len());

        let err = plan_replacement(
            &catalog,
            &[championship.choices[0].id, championship.choices[1].id],
        )
        .unwrap_err();
        assert!(matches!(err, PickValidationError::WrongCount { .. }));
    }

    #[test]
    fn untagged_lines_cannot_be_mixed() {
        let golden_boot = line("Golden Boot", 1, &[], None, &[ChoiceSpec::new("Mbappé", 30, 0)]);
        let golden_ball = line("Golden Ball", 1, &[], None, &[ChoiceSpec::new("Messi", 30, 0)]);
        let boot_pick = golden_boot.choices[0].id;
        let ball_pick = golden_ball.choices[0].id;
        let catalog = LineCatalog::new(vec![golden_boot, golden_ball]);

        let err = plan_replacement(&catalog, &[boot_pick, ball_pick]).unwrap_err();
        assert_eq!(err, PickValidationError::MixedLines);
    }

    #[test]
    fn mixed_collections_are_rejected() {
        let catalog = group_stage_catalog();
        let group_pick = catalog
            .lines_in_collection(&CollectionTags::new(["group-winner"]))
            .next()
            .unwrap()
            .choices[0]
            .id;
        let final_pick = catalog
            .lines()
            .iter()
            .find(|entry| entry.line.title == "Championship")
            .unwrap()
            .choices[0]
            .id;

        let err = plan_replacement(&catalog, &[group_pick, final_pick]).unwrap_err();
        assert_eq!(err, PickValidationError::MixedCollections);
    }

    #[test]
    fn rejects_empty_duplicate_and_unknown_ids() {
        let catalog = group_stage_catalog();
        assert_eq!(
            plan_replacement(&catalog, &[]).unwrap_err(),
            PickValidationError::Empty
        );

        let pick = catalog.lines()[0].choices[0].id;
        assert_eq!(
            plan_replacement(&catalog, &[pick, pick]).unwrap_err(),
            PickValidationError::Duplicate(pick)
        );

        let unknown = uuid::Uuid::new_v4();
        assert_eq!(
            plan_replacement(&catalog, &[unknown]).unwrap_err(),
            PickValidationError::UnknownChoice(unknown)
        );
    }

    #[test]
    fn display_name_bounds() {
        assert_eq!(validate_display_name("  Ana  ").unwrap(), "Ana");
        assert!(validate_display_name("Al").is_err());
        assert!(validate_display_name(&"x".repeat(26)).is_ok());
        assert!(validate_display_name(&"x".repeat(27)).is_err());
        assert!(validate_display_name("Zoë").is_ok());
    }
}
