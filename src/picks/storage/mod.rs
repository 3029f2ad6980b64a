use async_trait::async_trait;

use crate::domain::{
    BetRecord, ChoiceId, ChoiceRecord, ContestSettings, LineId, LineRecord, LineWithChoices,
    NewLine, NewUser, UserId, UserRecord, WinStatus,
};
use crate::picks::error::PicksError;

pub mod in_memory;
pub mod sea_orm;

pub use self::in_memory::InMemoryPicksStorage;
pub use self::sea_orm::SeaOrmPicksStorage;

#[async_trait]
pub trait PicksStorage: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn PicksStorageTxn + Send>, PicksError>;
}

/// Unit of work against the store. Nothing is visible to other transactions
/// until `commit`.
#[async_trait]
pub trait PicksStorageTxn: Send {
    async fn load_settings(&mut self) -> Result<ContestSettings, PicksError>;

    async fn store_settings(&mut self, settings: ContestSettings) -> Result<(), PicksError>;

    /// Every line with its choices, ordered by `sort_order` then title;
    /// choices ordered by title.
    async fn load_lines(&mut self) -> Result<Vec<LineWithChoices>, PicksError>;

    async fn insert_line(&mut self, line: NewLine) -> Result<LineWithChoices, PicksError>;

    /// Loads the line and holds a write lock on the row until the
    /// transaction ends.
    async fn lock_line(&mut self, id: LineId) -> Result<Option<LineRecord>, PicksError>;

    async fn load_choice(&mut self, id: ChoiceId) -> Result<Option<ChoiceRecord>, PicksError>;

    async fn update_choice_win_status(
        &mut self,
        id: ChoiceId,
        status: WinStatus,
    ) -> Result<ChoiceRecord, PicksError>;

    async fn load_user(&mut self, id: UserId) -> Result<Option<UserRecord>, PicksError>;

    async fn load_user_by_email(&mut self, email: &str)
        -> Result<Option<UserRecord>, PicksError>;

    /// Loads the user and holds a write lock on the row until the
    /// transaction ends.
    async fn lock_user(&mut self, id: UserId) -> Result<Option<UserRecord>, PicksError>;

    async fn insert_user(&mut self, user: NewUser) -> Result<UserRecord, PicksError>;

    async fn list_users(&mut self) -> Result<Vec<UserRecord>, PicksError>;

    async fn update_display_name(
        &mut self,
        id: UserId,
        display_name: &str,
    ) -> Result<UserRecord, PicksError>;

    async fn update_payment(&mut self, id: UserId, has_paid: bool)
        -> Result<UserRecord, PicksError>;

    async fn load_user_bets(&mut self, user_id: UserId) -> Result<Vec<BetRecord>, PicksError>;

    async fn load_all_bets(&mut self) -> Result<Vec<BetRecord>, PicksError>;

    /// Removes the user's bets on any of `choice_ids`, returning the count.
    async fn delete_user_bets(
        &mut self,
        user_id: UserId,
        choice_ids: &[ChoiceId],
    ) -> Result<u64, PicksError>;

    async fn insert_bets(
        &mut self,
        user_id: UserId,
        choice_ids: &[ChoiceId],
    ) -> Result<Vec<BetRecord>, PicksError>;

    async fn commit(self: Box<Self>) -> Result<(), PicksError>;
    async fn rollback(self: Box<Self>);
}
