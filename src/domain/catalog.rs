use std::collections::HashMap;

use serde::Serialize;

use super::collection::CollectionTags;
use super::types::{BetRecord, ChoiceId, ChoiceRecord, LineId, LineRecord, LineWithChoices};

/// Read-only index over every line and choice, used to expand bets and to
/// evaluate collection membership.
#[derive(Clone, Debug, Default)]
pub struct LineCatalog {
    lines: Vec<LineWithChoices>,
    line_index: HashMap<LineId, usize>,
    choice_index: HashMap<ChoiceId, (usize, usize)>,
}

/// A bet with its choice and the choice's line attached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedBet {
    #[serde(flatten)]
    pub bet: BetRecord,
    pub choice: ChoiceRecord,
    pub line: LineRecord,
}

impl LineCatalog {
    pub fn new(lines: Vec<LineWithChoices>) -> Self {
        let mut line_index = HashMap::with_capacity(lines.len());
        let mut choice_index = HashMap::new();
        for (line_pos, entry) in lines.iter().enumerate() {
            line_index.insert(entry.line.id, line_pos);
            for (choice_pos, choice) in entry.choices.iter().enumerate() {
                choice_index.insert(choice.id, (line_pos, choice_pos));
            }
        }
        Self {
            lines,
            line_index,
            choice_index,
        }
    }

    pub fn lines(&self) -> &[LineWithChoices] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<LineWithChoices> {
        self.lines
    }

    pub fn line(&self, id: LineId) -> Option<&LineWithChoices> {
        self.line_index.get(&id).map(|&pos| &self.lines[pos])
    }

    pub fn choice(&self, id: ChoiceId) -> Option<&ChoiceRecord> {
        self.choice_index
            .get(&id)
            .map(|&(line_pos, choice_pos)| &self.lines[line_pos].choices[choice_pos])
    }

    pub fn line_of_choice(&self, id: ChoiceId) -> Option<&LineRecord> {
        self.choice_index
            .get(&id)
            .map(|&(line_pos, _)| &self.lines[line_pos].line)
    }

    /// Lines whose tag set equals `tags`.
    pub fn lines_in_collection<'a>(
        &'a self,
        tags: &'a CollectionTags,
    ) -> impl Iterator<Item = &'a LineWithChoices> + 'a {
        self.lines
            .iter()
            .filter(move |entry| &entry.line.collection == tags)
    }

    /// Whether any choice of the line has been graded a winner.
    pub fn line_has_winner(&self, id: LineId) -> bool {
        self.line(id)
            .map(|entry| entry.choices.iter().any(ChoiceRecord::is_winner))
            .unwrap_or(false)
    }

    pub fn expand(&self, bet: BetRecord) -> Option<ExpandedBet> {
        let &(line_pos, choice_pos) = self.choice_index.get(&bet.choice_id)?;
        let entry = &self.lines[line_pos];
        Some(ExpandedBet {
            choice: entry.choices[choice_pos].clone(),
            line: entry.line.clone(),
            bet,
        })
    }
}
