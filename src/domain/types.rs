use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::collection::CollectionTags;

pub type UserId = Uuid;
pub type LineId = Uuid;
pub type ChoiceId = Uuid;
pub type BetId = Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub name: Option<String>,
    pub email: String,
    pub display_name: Option<String>,
    pub has_paid: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
}

/// A votable category, e.g. "Group A Winner" or "Championship".
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRecord {
    pub id: LineId,
    pub title: String,
    /// Selections allowed when this line is submitted on its own.
    pub choice_limit: u32,
    pub collection: CollectionTags,
    /// Selections allowed across every line sharing `collection`. `None`
    /// means the line is scored and limited by itself.
    pub choice_collection_limit: Option<u32>,
    pub sort_order: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRecord {
    pub id: ChoiceId,
    pub line_id: LineId,
    pub title: String,
    pub flag: String,
    pub primary_points: i32,
    pub secondary_points: i32,
    pub is_primary_win: bool,
    pub is_secondary_win: bool,
}

impl ChoiceRecord {
    pub fn is_winner(&self) -> bool {
        self.is_primary_win || self.is_secondary_win
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineWithChoices {
    #[serde(flatten)]
    pub line: LineRecord,
    pub choices: Vec<ChoiceRecord>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLine {
    pub title: String,
    pub choice_limit: u32,
    #[serde(default)]
    pub collection: CollectionTags,
    #[serde(default)]
    pub choice_collection_limit: Option<u32>,
    #[serde(default)]
    pub sort_order: i32,
    pub choices: Vec<NewChoice>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChoice {
    pub title: String,
    #[serde(default)]
    pub flag: String,
    pub primary_points: i32,
    pub secondary_points: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRecord {
    pub id: BetId,
    pub user_id: UserId,
    pub choice_id: ChoiceId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Graded outcome an admin sets on a choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinStatus {
    pub is_primary_win: bool,
    pub is_secondary_win: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestSettings {
    pub contest_closed: bool,
}

impl ContestSettings {
    /// Key of the settings row backing `contest_closed`.
    pub const CONTEST_CLOSED_KEY: &'static str = "contestClosed";

    pub fn from_stored(value: Option<&str>) -> Self {
        Self {
            contest_closed: matches!(value.map(str::trim), Some("true")),
        }
    }

    pub fn stored_value(&self) -> &'static str {
        if self.contest_closed {
            "true"
        } else {
            "false"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contest_settings_parse_stored_flag() {
        assert!(ContestSettings::from_stored(Some("true")).contest_closed);
        assert!(!ContestSettings::from_stored(Some("false")).contest_closed);
        assert!(!ContestSettings::from_stored(None).contest_closed);
        assert!(!ContestSettings::from_stored(Some("yes")).contest_closed);
    }

    #[test]
    fn winner_means_either_flag() {
        let mut choice = ChoiceRecord {
            id: Uuid::new_v4(),
            line_id: Uuid::new_v4(),
            title: "Brazil".into(),
            flag: "🇧🇷".into(),
            primary_points: 50,
            secondary_points: 20,
            is_primary_win: false,
            is_secondary_win: false,
        };
        assert!(!choice.is_winner());
        choice.is_secondary_win = true;
        assert!(choice.is_winner());
    }
}
