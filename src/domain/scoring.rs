use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::catalog::{ExpandedBet, LineCatalog};
use super::progress::{derive_progress, ProgressReport};
use super::types::{BetRecord, ChoiceRecord, UserId, UserRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PickStatus {
    /// No choice of the line has been graded yet.
    Pending,
    Win,
    /// The line is graded and the picked choice is not a winner.
    Loss,
}

/// Points a graded choice awards: primary wins take precedence.
pub fn points_awarded(choice: &ChoiceRecord) -> i32 {
    if choice.is_primary_win {
        choice.primary_points
    } else if choice.is_secondary_win {
        choice.secondary_points
    } else {
        0
    }
}

pub fn potential_points(choice: &ChoiceRecord) -> i32 {
    choice.primary_points.max(choice.secondary_points)
}

pub fn classify(catalog: &LineCatalog, choice: &ChoiceRecord) -> PickStatus {
    if choice.is_winner() {
        PickStatus::Win
    } else if catalog.line_has_winner(choice.line_id) {
        PickStatus::Loss
    } else {
        PickStatus::Pending
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredBet {
    #[serde(flatten)]
    pub bet: ExpandedBet,
    pub status: PickStatus,
    pub points: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential_points: Option<i32>,
}

impl ScoredBet {
    pub fn new(catalog: &LineCatalog, bet: ExpandedBet) -> Self {
        let status = classify(catalog, &bet.choice);
        let points = points_awarded(&bet.choice);
        let potential_points =
            (status == PickStatus::Pending).then(|| potential_points(&bet.choice));
        Self {
            bet,
            status,
            points,
            potential_points,
        }
    }
}

pub fn score_bets(catalog: &LineCatalog, bets: Vec<BetRecord>) -> Vec<ScoredBet> {
    bets.into_iter()
        .filter_map(|bet| catalog.expand(bet))
        .map(|bet| ScoredBet::new(catalog, bet))
        .collect()
}

pub fn total_score(bets: &[ScoredBet]) -> i32 {
    bets.iter().map(|bet| bet.points).sum()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub display_name: Option<String>,
    pub has_paid: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name.clone(),
            has_paid: user.has_paid,
            created_at: user.created_at,
        }
    }
}

/// One row of the leaderboard / admin completion table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressReport>,
    pub bets: Vec<ScoredBet>,
}

impl Standing {
    /// Drops everything except the user's public profile.
    pub fn redacted(self) -> Self {
        Self {
            user: self.user,
            rank: None,
            score: None,
            progress: None,
            bets: Vec::new(),
        }
    }
}

/// Scores every user and ranks them by total, highest first. Tied totals share
/// a rank and the following rank is skipped.
pub fn build_standings(
    catalog: &LineCatalog,
    users: &[UserRecord],
    bets: Vec<BetRecord>,
) -> Vec<Standing> {
    let mut by_user: HashMap<UserId, Vec<BetRecord>> = HashMap::new();
    for bet in bets {
        by_user.entry(bet.user_id).or_default().push(bet);
    }

    let mut standings: Vec<Standing> = users
        .iter()
        .map(|user| {
            let scored = score_bets(catalog, by_user.remove(&user.id).unwrap_or_default());
            let progress = derive_progress(catalog, scored.iter().map(|bet| &bet.bet));
            Standing {
                user: UserSummary::from(user),
                rank: None,
                score: Some(total_score(&scored)),
                progress: Some(progress),
                bets: scored,
            }
        })
        .collect();

    standings.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| compare_names(&a.user, &b.user))
    });

    let mut previous: Option<(i32, u32)> = None;
    for (position, standing) in standings.iter_mut().enumerate() {
        let score = standing.score.unwrap_or_default();
        let rank = match previous {
            Some((prev_score, prev_rank)) if prev_score == score => prev_rank,
            _ => u32::try_from(position + 1).unwrap_or(u32::MAX),
        };
        standing.rank = Some(rank);
        previous = Some((score, rank));
    }

    standings
}

/// Leaderboard shown while picks are still open: profile only, by name.
pub fn redact_standings(mut standings: Vec<Standing>) -> Vec<Standing> {
    standings.sort_by(|a, b| compare_names(&a.user, &b.user));
    standings.into_iter().map(Standing::redacted).collect()
}

fn compare_names(a: &UserSummary, b: &UserSummary) -> Ordering {
    match (&a.display_name, &b.display_name) {
        (Some(left), Some(right)) => left
            .to_lowercase()
            .cmp(&right.to_lowercase())
            .then_with(|| a.id.cmp(&b.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_fixtures::{group_stage_catalog, line, ChoiceSpec};
    use crate::domain::types::{LineWithChoices, WinStatus};
    use uuid::Uuid;

    fn user(name: &str) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            name: None,
            email: format!("{}@example.com", name.to_lowercase()),
            display_name: Some(name.to_owned()),
            has_paid: true,
            created_at: Utc::now(),
        }
    }

    fn bet(user: &UserRecord, choice: &ChoiceRecord) -> BetRecord {
        let now = Utc::now();
        BetRecord {
            id: Uuid::new_v4(),
            user_id: user.id,
            choice_id: choice.id,
            created_at: now,
            updated_at: now,
        }
    }

    fn grade(lines: &mut [LineWithChoices], choice_id: Uuid, status: WinStatus) {
        for entry in lines.iter_mut() {
            for choice in entry.choices.iter_mut() {
                if choice.id == choice_id {
                    choice.is_primary_win = status.is_primary_win;
                    choice.is_secondary_win = status.is_secondary_win;
                }
            }
        }
    }

    #[test]
    fn primary_points_take_precedence() {
        let mut entry = line("Group A Winner", 1, &["group-winner"], Some(12), &[
            ChoiceSpec::new("Spain", 50, 20),
        ]);
        let choice = &mut entry.choices[0];
        assert_eq!(points_awarded(choice), 0);
        choice.is_secondary_win = true;
        assert_eq!(points_awarded(choice), 20);
        choice.is_primary_win = true;
        assert_eq!(points_awarded(choice), 50);
    }

    #[test]
    fn classification_follows_sibling_grading() {
        let mut lines = group_stage_catalog().into_lines();
        let picked = lines[0].choices[1].clone();
        let sibling = lines[0].choices[0].id;

        let catalog = LineCatalog::new(lines.clone());
        assert_eq!(classify(&catalog, &picked), PickStatus::Pending);

        grade(&mut lines, sibling, WinStatus { is_primary_win: true, is_secondary_win: false });
        let catalog = LineCatalog::new(lines.clone());
        assert_eq!(classify(&catalog, &picked), PickStatus::Loss);

        grade(&mut lines, picked.id, WinStatus { is_primary_win: false, is_secondary_win: true });
        let catalog = LineCatalog::new(lines);
        let picked = catalog.choice(picked.id).unwrap();
        assert_eq!(classify(&catalog, picked), PickStatus::Win);
    }

    #[test]
    fn pending_bets_report_upper_bound() {
        let catalog = LineCatalog::new(vec![line("Group B Winner", 1, &["group-winner"], Some(12), &[
            ChoiceSpec::new("Japan", 20, 35),
        ])]);
        let alice = user("Alice");
        let choice = catalog.lines()[0].choices[0].clone();
        let scored = score_bets(&catalog, vec![bet(&alice, &choice)]);
        assert_eq!(scored[0].status, PickStatus::Pending);
        assert_eq!(scored[0].points, 0);
        assert_eq!(scored[0].potential_points, Some(35));
    }

    #[test]
    fn standings_rank_with_shared_ties() {
        let mut lines = group_stage_catalog().into_lines();
        let winner = lines[0].choices[0].id;
        let loser = lines[0].choices[1].id;
        grade(&mut lines, winner, WinStatus { is_primary_win: true, is_secondary_win: false });
        let catalog = LineCatalog::new(lines);
        let winning_choice = catalog.choice(winner).unwrap().clone();
        let losing_choice = catalog.choice(loser).unwrap().clone();

        let alice = user("Alice");
        let bruno = user("Bruno");
        let chen = user("Chen");
        let bets = vec![
            bet(&alice, &winning_choice),
            bet(&bruno, &winning_choice),
            bet(&chen, &losing_choice),
        ];

        let standings = build_standings(&catalog, &[chen.clone(), bruno, alice], bets);
        let ranks: Vec<_> = standings
            .iter()
            .map(|s| (s.user.display_name.clone().unwrap(), s.rank.unwrap(), s.score.unwrap()))
            .collect();
        assert_eq!(
            ranks,
            vec![
                ("Alice".to_owned(), 1, 20),
                ("Bruno".to_owned(), 1, 20),
                ("Chen".to_owned(), 3, 0),
            ]
        );
        assert_eq!(standings[2].bets[0].status, PickStatus::Loss);
    }

    #[test]
    fn redaction_keeps_only_profile() {
        let catalog = group_stage_catalog();
        let alice = user("Alice");
        let choice = catalog.lines()[0].choices[0].clone();
        let standings = build_standings(&catalog, &[alice.clone()], vec![bet(&alice, &choice)]);
        let redacted = redact_standings(standings);
        assert_eq!(redacted.len(), 1);
        assert!(redacted[0].bets.is_empty());
        assert!(redacted[0].score.is_none());
        assert!(redacted[0].rank.is_none());
        assert_eq!(redacted[0].user.id, alice.id);
    }

    #[test]
    fn bets_on_unknown_choices_are_skipped() {
        let catalog = LineCatalog::new(vec![line("Golden Boot", 1, &[], None, &[
            ChoiceSpec::new("Kane", 30, 0),
        ])]);
        let alice = user("Alice");
        let orphan = BetRecord {
            choice_id: Uuid::new_v4(),
            ..bet(&alice, &catalog.lines()[0].choices[0])
        };
        assert!(score_bets(&catalog, vec![orphan]).is_empty());
    }
}
