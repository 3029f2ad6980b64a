use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{Identity, SessionClaims};
use crate::config::PicksConfig;
use crate::domain::{
    build_standings, derive_progress, plan_replacement, redact_standings, scoring,
    validate_display_name, ChoiceId, ChoiceRecord, ContestSettings, ExpandedBet, LineCatalog,
    LineWithChoices, NewLine, NewUser, PickScope, ProgressReport, ScoredBet, Standing, UserId,
    UserRecord, WinStatus,
};

use super::error::PicksError;
use super::storage::{InMemoryPicksStorage, PicksStorage, PicksStorageTxn, SeaOrmPicksStorage};

const LOG_TARGET: &str = "cup_picks::picks::service";

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    pub contest_closed: bool,
    pub entries: Vec<Standing>,
}

/// Admin view of a user: the full standing plus contact details.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub email: String,
    pub name: Option<String>,
    #[serde(flatten)]
    pub standing: Standing,
}

#[async_trait]
pub trait PicksService: Send + Sync {
    /// Maps session claims to a stored user, creating the user on first sight.
    async fn resolve_identity(&self, claims: SessionClaims) -> Result<Identity, PicksError>;

    async fn profile(&self, identity: &Identity) -> Result<UserRecord, PicksError>;

    async fn set_display_name(
        &self,
        identity: &Identity,
        display_name: &str,
    ) -> Result<UserRecord, PicksError>;

    async fn list_lines(&self) -> Result<Vec<LineWithChoices>, PicksError>;

    async fn create_line(
        &self,
        identity: &Identity,
        line: NewLine,
    ) -> Result<LineWithChoices, PicksError>;

    async fn list_bets(&self, identity: &Identity) -> Result<Vec<ScoredBet>, PicksError>;

    /// Replaces the caller's picks for the scope the submitted choices
    /// belong to.
    async fn submit_bets(
        &self,
        identity: &Identity,
        choice_ids: Vec<ChoiceId>,
    ) -> Result<Vec<ExpandedBet>, PicksError>;

    async fn progress(&self, identity: &Identity) -> Result<ProgressReport, PicksError>;

    async fn settings(&self) -> Result<ContestSettings, PicksError>;

    async fn update_settings(
        &self,
        identity: &Identity,
        settings: ContestSettings,
    ) -> Result<ContestSettings, PicksError>;

    async fn update_win_status(
        &self,
        identity: &Identity,
        choice_id: ChoiceId,
        status: WinStatus,
    ) -> Result<ChoiceRecord, PicksError>;

    async fn admin_users(&self, identity: &Identity) -> Result<Vec<AdminUser>, PicksError>;

    async fn set_payment(
        &self,
        identity: &Identity,
        user_id: UserId,
        has_paid: bool,
    ) -> Result<UserRecord, PicksError>;

    async fn leaderboard(&self, identity: &Identity) -> Result<Leaderboard, PicksError>;
}

#[derive(Clone)]
pub struct PicksServiceFactory {
    storage: Arc<dyn PicksStorage>,
    config: PicksConfig,
}

impl PicksServiceFactory {
    pub fn new(storage: Arc<dyn PicksStorage>, config: PicksConfig) -> Self {
        Self { storage, config }
    }

    pub fn from_sea_orm(connection: DatabaseConnection, config: PicksConfig) -> Self {
        let storage = Arc::new(SeaOrmPicksStorage::new(connection)) as Arc<dyn PicksStorage>;
        Self::new(storage, config)
    }

    pub fn in_memory(config: PicksConfig) -> Self {
        let storage = Arc::new(InMemoryPicksStorage::new()) as Arc<dyn PicksStorage>;
        Self::new(storage, config)
    }

    fn identity_for(&self, user: &UserRecord) -> Identity {
        Identity {
            user_id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            is_admin: self.config.is_admin_email(&user.email),
        }
    }

    async fn find_or_create_user(&self, claims: &SessionClaims) -> Result<UserRecord, PicksError> {
        let mut txn = self.storage.begin().await?;
        let result = async {
            if let Some(user) = txn.load_user_by_email(&claims.email).await? {
                return Ok(user);
            }
            let user = txn
                .insert_user(NewUser {
                    name: claims.name.clone(),
                    email: claims.email.clone(),
                })
                .await?;
            info!(target: LOG_TARGET, user_id = %user.id, "registered new user");
            Ok::<_, PicksError>(user)
        }
        .await;
        finish(txn, result).await
    }
}

async fn finish<T>(
    txn: Box<dyn PicksStorageTxn + Send>,
    result: Result<T, PicksError>,
) -> Result<T, PicksError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            txn.rollback().await;
            Err(err)
        }
    }
}

async fn load_catalog(txn: &mut (dyn PicksStorageTxn + Send)) -> Result<LineCatalog, PicksError> {
    Ok(LineCatalog::new(txn.load_lines().await?))
}

fn validate_new_line(line: &NewLine) -> Result<(), PicksError> {
    if line.title.trim().is_empty() {
        return Err(PicksError::invalid("line title is required"));
    }
    if line.choice_limit == 0 {
        return Err(PicksError::invalid("choice_limit must be at least 1"));
    }
    if line.choice_collection_limit == Some(0) {
        return Err(PicksError::invalid(
            "choice_collection_limit must be at least 1 when set",
        ));
    }
    if line.choices.is_empty() {
        return Err(PicksError::invalid("a line needs at least one choice"));
    }
    if usize::try_from(line.choice_limit).map_or(true, |limit| limit > line.choices.len()) {
        return Err(PicksError::invalid(
            "choice_limit cannot exceed the number of choices",
        ));
    }
    let mut titles = HashSet::new();
    for choice in &line.choices {
        if choice.title.trim().is_empty() {
            return Err(PicksError::invalid("choice title is required"));
        }
        if !titles.insert(choice.title.trim()) {
            return Err(PicksError::invalid(format!(
                "duplicate choice title {}",
                choice.title.trim()
            )));
        }
    }
    Ok(())
}

/// Lines sharing a tag set form one collection, so they must agree on its
/// limit. Otherwise the scope of a submission would depend on pick order.
fn ensure_consistent_collection_limit(
    catalog: &LineCatalog,
    line: &NewLine,
) -> Result<(), PicksError> {
    let conflict = catalog
        .lines_in_collection(&line.collection)
        .find(|entry| entry.line.choice_collection_limit != line.choice_collection_limit);
    match conflict {
        Some(entry) => Err(PicksError::invalid(format!(
            "choice_collection_limit must match line {} ({:?}) sharing the same collection",
            entry.line.title, entry.line.choice_collection_limit
        ))),
        None => Ok(()),
    }
}

#[async_trait]
impl PicksService for PicksServiceFactory {
    async fn resolve_identity(&self, claims: SessionClaims) -> Result<Identity, PicksError> {
        let user = match self.find_or_create_user(&claims).await {
            Ok(user) => user,
            // Lost a race with a concurrent first request for the same e-mail.
            Err(PicksError::Database(err)) => {
                warn!(target: LOG_TARGET, error = %err, "user registration failed; retrying lookup");
                let mut txn = self.storage.begin().await?;
                let result = txn
                    .load_user_by_email(&claims.email)
                    .await
                    .and_then(|user| user.ok_or(PicksError::Database(err)));
                finish(txn, result).await?
            }
            Err(other) => return Err(other),
        };
        Ok(self.identity_for(&user))
    }

    async fn profile(&self, identity: &Identity) -> Result<UserRecord, PicksError> {
        let mut txn = self.storage.begin().await?;
        let result = txn
            .load_user(identity.user_id)
            .await
            .and_then(|user| user.ok_or(PicksError::Unauthorized));
        finish(txn, result).await
    }

    async fn set_display_name(
        &self,
        identity: &Identity,
        display_name: &str,
    ) -> Result<UserRecord, PicksError> {
        let display_name = validate_display_name(display_name)?;

        let mut txn = self.storage.begin().await?;
        let result = async {
            let user = txn
                .lock_user(identity.user_id)
                .await?
                .ok_or(PicksError::Unauthorized)?;
            if user.display_name.is_some() {
                return Err(PicksError::forbidden("display name can only be set once"));
            }
            txn.update_display_name(user.id, &display_name).await
        }
        .await;
        let user = finish(txn, result).await?;

        info!(target: LOG_TARGET, user_id = %user.id, %display_name, "display name set");
        Ok(user)
    }

    async fn list_lines(&self) -> Result<Vec<LineWithChoices>, PicksError> {
        let mut txn = self.storage.begin().await?;
        let result = txn.load_lines().await;
        finish(txn, result).await
    }

    async fn create_line(
        &self,
        identity: &Identity,
        line: NewLine,
    ) -> Result<LineWithChoices, PicksError> {
        identity.require_admin()?;
        validate_new_line(&line)?;

        let mut txn = self.storage.begin().await?;
        let result = async {
            let catalog = load_catalog(txn.as_mut()).await?;
            ensure_consistent_collection_limit(&catalog, &line)?;
            txn.insert_line(line).await
        }
        .await;
        let created = finish(txn, result).await?;

        info!(
            target: LOG_TARGET,
            line_id = %created.line.id,
            title = %created.line.title,
            choices = created.choices.len(),
            "line created"
        );
        Ok(created)
    }

    async fn list_bets(&self, identity: &Identity) -> Result<Vec<ScoredBet>, PicksError> {
        let mut txn = self.storage.begin().await?;
        let result = async {
            let catalog = load_catalog(txn.as_mut()).await?;
            let bets = txn.load_user_bets(identity.user_id).await?;
            Ok::<_, PicksError>(scoring::score_bets(&catalog, bets))
        }
        .await;
        finish(txn, result).await
    }

    async fn submit_bets(
        &self,
        identity: &Identity,
        choice_ids: Vec<ChoiceId>,
    ) -> Result<Vec<ExpandedBet>, PicksError> {
        let mut txn = self.storage.begin().await?;
        let result = async {
            if txn.load_settings().await?.contest_closed {
                return Err(PicksError::forbidden("the contest is closed"));
            }
            txn.lock_user(identity.user_id)
                .await?
                .ok_or(PicksError::Unauthorized)?;

            let catalog = load_catalog(txn.as_mut()).await?;
            let plan = plan_replacement(&catalog, &choice_ids)?;

            let removed = txn
                .delete_user_bets(identity.user_id, &plan.replaced_choice_ids)
                .await?;
            let created = txn.insert_bets(identity.user_id, &plan.choice_ids).await?;

            let expanded = created
                .into_iter()
                .map(|bet| catalog.expand(bet))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| PicksError::invalid("choice disappeared during submission"))?;
            Ok::<_, PicksError>((plan.scope, removed, expanded))
        }
        .await;

        match finish(txn, result).await {
            Ok((scope, removed, expanded)) => {
                let scope = match scope {
                    PickScope::Collection { tags, .. } => tags.to_vec().join(","),
                    PickScope::Line { line_id, .. } => line_id.to_string(),
                };
                info!(
                    target: LOG_TARGET,
                    user_id = %identity.user_id,
                    %scope,
                    removed,
                    created = expanded.len(),
                    "bets replaced"
                );
                Ok(expanded)
            }
            Err(err) => {
                warn!(
                    target: LOG_TARGET,
                    user_id = %identity.user_id,
                    error = %err,
                    "bet submission rejected"
                );
                Err(err)
            }
        }
    }

    async fn progress(&self, identity: &Identity) -> Result<ProgressReport, PicksError> {
        let mut txn = self.storage.begin().await?;
        let result = async {
            let catalog = load_catalog(txn.as_mut()).await?;
            let bets: Vec<ExpandedBet> = txn
                .load_user_bets(identity.user_id)
                .await?
                .into_iter()
                .filter_map(|bet| catalog.expand(bet))
                .collect();
            Ok::<_, PicksError>(derive_progress(&catalog, &bets))
        }
        .await;
        finish(txn, result).await
    }

    async fn settings(&self) -> Result<ContestSettings, PicksError> {
        let mut txn = self.storage.begin().await?;
        let result = txn.load_settings().await;
        finish(txn, result).await
    }

    async fn update_settings(
        &self,
        identity: &Identity,
        settings: ContestSettings,
    ) -> Result<ContestSettings, PicksError> {
        identity.require_admin()?;

        let mut txn = self.storage.begin().await?;
        let result = txn.store_settings(settings).await.map(|()| settings);
        let stored = finish(txn, result).await?;

        info!(
            target: LOG_TARGET,
            admin = %identity.email,
            contest_closed = stored.contest_closed,
            "settings updated"
        );
        Ok(stored)
    }

    async fn update_win_status(
        &self,
        identity: &Identity,
        choice_id: ChoiceId,
        status: WinStatus,
    ) -> Result<ChoiceRecord, PicksError> {
        identity.require_admin()?;

        let mut txn = self.storage.begin().await?;
        let result = async {
            let choice = txn
                .load_choice(choice_id)
                .await?
                .ok_or(PicksError::NotFound("choice"))?;

            if status.is_primary_win && !self.config.allow_multiple_primary_winners {
                // Serializes concurrent grades on the same line.
                txn.lock_line(choice.line_id)
                    .await?
                    .ok_or(PicksError::NotFound("line"))?;
                let catalog = load_catalog(txn.as_mut()).await?;
                if let Some(entry) = catalog.line(choice.line_id) {
                    let others = entry
                        .choices
                        .iter()
                        .filter(|sibling| sibling.id != choice_id && sibling.is_primary_win)
                        .count();
                    let limit = usize::try_from(entry.line.choice_limit).unwrap_or(usize::MAX);
                    if others >= limit {
                        return Err(PicksError::invalid(format!(
                            "line {} already has {others} primary winner(s); limit is {limit}",
                            entry.line.title
                        )));
                    }
                }
            }

            txn.update_choice_win_status(choice_id, status).await
        }
        .await;
        let updated = finish(txn, result).await?;

        info!(
            target: LOG_TARGET,
            choice_id = %updated.id,
            is_primary_win = updated.is_primary_win,
            is_secondary_win = updated.is_secondary_win,
            "win status updated"
        );
        Ok(updated)
    }

    async fn admin_users(&self, identity: &Identity) -> Result<Vec<AdminUser>, PicksError> {
        identity.require_admin()?;

        let mut txn = self.storage.begin().await?;
        let result = async {
            let catalog = load_catalog(txn.as_mut()).await?;
            let users = txn.list_users().await?;
            let bets = txn.load_all_bets().await?;
            let standings = build_standings(&catalog, &users, bets);
            Ok::<_, PicksError>((users, standings))
        }
        .await;
        let (users, standings) = finish(txn, result).await?;

        Ok(standings
            .into_iter()
            .filter_map(|standing| {
                let user = users.iter().find(|user| user.id == standing.user.id)?;
                Some(AdminUser {
                    email: user.email.clone(),
                    name: user.name.clone(),
                    standing,
                })
            })
            .collect())
    }

    async fn set_payment(
        &self,
        identity: &Identity,
        user_id: UserId,
        has_paid: bool,
    ) -> Result<UserRecord, PicksError> {
        identity.require_admin()?;

        let mut txn = self.storage.begin().await?;
        let result = async {
            txn.load_user(user_id)
                .await?
                .ok_or(PicksError::NotFound("user"))?;
            txn.update_payment(user_id, has_paid).await
        }
        .await;
        let user = finish(txn, result).await?;

        info!(
            target: LOG_TARGET,
            admin = %identity.email,
            user_id = %user.id,
            has_paid,
            "payment status updated"
        );
        Ok(user)
    }

    async fn leaderboard(&self, _identity: &Identity) -> Result<Leaderboard, PicksError> {
        let mut txn = self.storage.begin().await?;
        let result = async {
            let settings = txn.load_settings().await?;
            let catalog = load_catalog(txn.as_mut()).await?;
            let users = txn.list_users().await?;
            let bets = txn.load_all_bets().await?;
            Ok::<_, PicksError>((settings, build_standings(&catalog, &users, bets)))
        }
        .await;
        let (settings, standings) = finish(txn, result).await?;

        let entries = if settings.contest_closed {
            standings
        } else {
            redact_standings(standings)
        };
        Ok(Leaderboard {
            contest_closed: settings.contest_closed,
            entries,
        })
    }
}
