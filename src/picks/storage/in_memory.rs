use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::{
    BetRecord, ChoiceId, ChoiceRecord, ContestSettings, LineId, LineRecord, LineWithChoices,
    NewLine, NewUser, UserId, UserRecord, WinStatus,
};
use crate::picks::error::PicksError;

use super::{PicksStorage, PicksStorageTxn};

#[derive(Clone, Default)]
struct Inner {
    settings: ContestSettings,
    users: Vec<UserRecord>,
    lines: Vec<LineRecord>,
    choices: Vec<ChoiceRecord>,
    bets: Vec<BetRecord>,
}

/// Process-local store used by tests and demos. Transactions are serialized:
/// each one works on a copy of the state and swaps it in on commit.
#[derive(Clone, Default)]
pub struct InMemoryPicksStorage {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryPicksStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct InMemoryPicksTxn {
    guard: OwnedMutexGuard<Inner>,
    working: Inner,
}

#[async_trait]
impl PicksStorage for InMemoryPicksStorage {
    async fn begin(&self) -> Result<Box<dyn PicksStorageTxn + Send>, PicksError> {
        let guard = Arc::clone(&self.inner).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryPicksTxn { guard, working }))
    }
}

impl InMemoryPicksTxn {
    fn user_mut(&mut self, id: UserId) -> Result<&mut UserRecord, PicksError> {
        self.working
            .users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(PicksError::NotFound("user"))
    }
}

#[async_trait]
impl PicksStorageTxn for InMemoryPicksTxn {
    async fn load_settings(&mut self) -> Result<ContestSettings, PicksError> {
        Ok(self.working.settings)
    }

    async fn store_settings(&mut self, settings: ContestSettings) -> Result<(), PicksError> {
        self.working.settings = settings;
        Ok(())
    }

    async fn load_lines(&mut self) -> Result<Vec<LineWithChoices>, PicksError> {
        let mut lines = self.working.lines.clone();
        lines.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(lines
            .into_iter()
            .map(|line| {
                let mut choices: Vec<ChoiceRecord> = self
                    .working
                    .choices
                    .iter()
                    .filter(|choice| choice.line_id == line.id)
                    .cloned()
                    .collect();
                choices.sort_by(|a, b| a.title.cmp(&b.title));
                LineWithChoices { line, choices }
            })
            .collect())
    }

    async fn insert_line(&mut self, line: NewLine) -> Result<LineWithChoices, PicksError> {
        let record = LineRecord {
            id: Uuid::new_v4(),
            title: line.title,
            choice_limit: line.choice_limit,
            collection: line.collection,
            choice_collection_limit: line.choice_collection_limit,
            sort_order: line.sort_order,
        };
        let mut choices: Vec<ChoiceRecord> = line
            .choices
            .into_iter()
            .map(|choice| ChoiceRecord {
                id: Uuid::new_v4(),
                line_id: record.id,
                title: choice.title,
                flag: choice.flag,
                primary_points: choice.primary_points,
                secondary_points: choice.secondary_points,
                is_primary_win: false,
                is_secondary_win: false,
            })
            .collect();
        choices.sort_by(|a, b| a.title.cmp(&b.title));

        self.working.lines.push(record.clone());
        self.working.choices.extend(choices.iter().cloned());
        Ok(LineWithChoices {
            line: record,
            choices,
        })
    }

    async fn lock_line(&mut self, id: LineId) -> Result<Option<LineRecord>, PicksError> {
        // The transaction already holds the store-wide lock.
        Ok(self.working.lines.iter().find(|line| line.id == id).cloned())
    }

    async fn load_choice(&mut self, id: ChoiceId) -> Result<Option<ChoiceRecord>, PicksError> {
        Ok(self
            .working
            .choices
            .iter()
            .find(|choice| choice.id == id)
            .cloned())
    }

    async fn update_choice_win_status(
        &mut self,
        id: ChoiceId,
        status: WinStatus,
    ) -> Result<ChoiceRecord, PicksError> {
        let choice = self
            .working
            .choices
            .iter_mut()
            .find(|choice| choice.id == id)
            .ok_or(PicksError::NotFound("choice"))?;
        choice.is_primary_win = status.is_primary_win;
        choice.is_secondary_win = status.is_secondary_win;
        Ok(choice.clone())
    }

    async fn load_user(&mut self, id: UserId) -> Result<Option<UserRecord>, PicksError> {
        Ok(self
            .working
            .users
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn load_user_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<UserRecord>, PicksError> {
        Ok(self
            .working
            .users
            .iter()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn lock_user(&mut self, id: UserId) -> Result<Option<UserRecord>, PicksError> {
        // The transaction already holds the store-wide lock.
        self.load_user(id).await
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<UserRecord, PicksError> {
        if self
            .working
            .users
            .iter()
            .any(|existing| existing.email == user.email)
        {
            return Err(PicksError::invalid("email already registered"));
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            display_name: None,
            has_paid: false,
            created_at: Utc::now(),
        };
        self.working.users.push(record.clone());
        Ok(record)
    }

    async fn list_users(&mut self) -> Result<Vec<UserRecord>, PicksError> {
        let mut users = self.working.users.clone();
        users.sort_by_key(|user| user.created_at);
        Ok(users)
    }

    async fn update_display_name(
        &mut self,
        id: UserId,
        display_name: &str,
    ) -> Result<UserRecord, PicksError> {
        let user = self.user_mut(id)?;
        user.display_name = Some(display_name.to_owned());
        Ok(user.clone())
    }

    async fn update_payment(
        &mut self,
        id: UserId,
        has_paid: bool,
    ) -> Result<UserRecord, PicksError> {
        let user = self.user_mut(id)?;
        user.has_paid = has_paid;
        Ok(user.clone())
    }

    async fn load_user_bets(&mut self, user_id: UserId) -> Result<Vec<BetRecord>, PicksError> {
        Ok(self
            .working
            .bets
            .iter()
            .filter(|bet| bet.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn load_all_bets(&mut self) -> Result<Vec<BetRecord>, PicksError> {
        Ok(self.working.bets.clone())
    }

    async fn delete_user_bets(
        &mut self,
        user_id: UserId,
        choice_ids: &[ChoiceId],
    ) -> Result<u64, PicksError> {
        let before = self.working.bets.len();
        self.working
            .bets
            .retain(|bet| bet.user_id != user_id || !choice_ids.contains(&bet.choice_id));
        Ok((before - self.working.bets.len()) as u64)
    }

    async fn insert_bets(
        &mut self,
        user_id: UserId,
        choice_ids: &[ChoiceId],
    ) -> Result<Vec<BetRecord>, PicksError> {
        let now = Utc::now();
        let records: Vec<BetRecord> = choice_ids
            .iter()
            .map(|&choice_id| BetRecord {
                id: Uuid::new_v4(),
                user_id,
                choice_id,
                created_at: now,
                updated_at: now,
            })
            .collect();
        self.working.bets.extend(records.iter().cloned());
        Ok(records)
    }

    async fn commit(self: Box<Self>) -> Result<(), PicksError> {
        let InMemoryPicksTxn { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) {}
}
