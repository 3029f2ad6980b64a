use serde::{Deserialize, Serialize};

use super::catalog::{ExpandedBet, LineCatalog};
use super::types::LineRecord;

/// Pick categories the client walks through, each matched to lines either by
/// collection tag or by line title.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PickCategory {
    GroupWinners,
    Quarterfinalists,
    Semifinalists,
    Finalists,
    Championship,
    PlayerAwards,
}

enum LineMatcher {
    Collection(&'static str),
    Title(&'static str),
    Titles(&'static [&'static str]),
}

pub const PLAYER_AWARD_TITLES: &[&str] =
    &["Golden Ball", "Golden Boot", "Golden Glove", "Best Young Player"];

impl PickCategory {
    pub const ALL: [PickCategory; 6] = [
        PickCategory::GroupWinners,
        PickCategory::Quarterfinalists,
        PickCategory::Semifinalists,
        PickCategory::Finalists,
        PickCategory::Championship,
        PickCategory::PlayerAwards,
    ];

    fn matcher(self) -> LineMatcher {
        match self {
            PickCategory::GroupWinners => LineMatcher::Collection("group-winner"),
            PickCategory::Quarterfinalists => LineMatcher::Title("Quarterfinalists"),
            PickCategory::Semifinalists => LineMatcher::Title("Semifinalists"),
            PickCategory::Finalists => LineMatcher::Title("Finalists"),
            PickCategory::Championship => LineMatcher::Title("Championship"),
            PickCategory::PlayerAwards => LineMatcher::Titles(PLAYER_AWARD_TITLES),
        }
    }

    pub fn matches(self, line: &LineRecord) -> bool {
        match self.matcher() {
            LineMatcher::Collection(tag) => line.collection.contains(tag),
            LineMatcher::Title(title) => line.title == title,
            LineMatcher::Titles(titles) => titles.contains(&line.title.as_str()),
        }
    }

    /// Number of picks the category needs, derived from the matching lines.
    pub fn required(self, catalog: &LineCatalog) -> u32 {
        let lines: Vec<&LineRecord> = catalog
            .lines()
            .iter()
            .map(|entry| &entry.line)
            .filter(|line| self.matches(line))
            .collect();

        if let LineMatcher::Collection(_) = self.matcher() {
            if let Some(limit) = lines.iter().find_map(|line| line.choice_collection_limit) {
                return limit;
            }
        }

        lines.iter().map(|line| line.choice_limit).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProgress {
    pub category: PickCategory,
    pub current: u32,
    pub required: u32,
}

impl CategoryProgress {
    pub fn is_complete(&self) -> bool {
        self.current == self.required
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub categories: Vec<CategoryProgress>,
    pub all_complete: bool,
}

impl ProgressReport {
    pub fn category(&self, category: PickCategory) -> Option<&CategoryProgress> {
        self.categories
            .iter()
            .find(|entry| entry.category == category)
    }
}

pub fn derive_progress<'a, I>(catalog: &LineCatalog, bets: I) -> ProgressReport
where
    I: IntoIterator<Item = &'a ExpandedBet>,
{
    let bets: Vec<&ExpandedBet> = bets.into_iter().collect();
    let categories: Vec<CategoryProgress> = PickCategory::ALL
        .iter()
        .map(|&category| {
            let current = bets
                .iter()
                .filter(|bet| category.matches(&bet.line))
                .count();
            CategoryProgress {
                category,
                current: u32::try_from(current).unwrap_or(u32::MAX),
                required: category.required(catalog),
            }
        })
        .collect();
    let all_complete = categories.iter().all(CategoryProgress::is_complete);

    ProgressReport {
        categories,
        all_complete,
    }
}
