use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::warn;
use uuid::Uuid;

use crate::db::entity::{bets, choices, lines, settings, users};
use crate::domain::{
    BetRecord, ChoiceId, ChoiceRecord, CollectionTags, ContestSettings, LineId, LineRecord,
    LineWithChoices, NewLine, NewUser, UserId, UserRecord, WinStatus,
};
use crate::picks::error::PicksError;

use super::{PicksStorage, PicksStorageTxn};

const LOG_TARGET: &str = "cup_picks::picks::storage";

pub struct SeaOrmPicksStorage {
    connection: DatabaseConnection,
}

impl SeaOrmPicksStorage {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }
}

pub struct SeaOrmPicksTxn {
    txn: DatabaseTransaction,
}

#[async_trait]
impl PicksStorage for SeaOrmPicksStorage {
    async fn begin(&self) -> Result<Box<dyn PicksStorageTxn + Send>, PicksError> {
        let txn = self.connection.begin().await?;
        Ok(Box::new(SeaOrmPicksTxn { txn }))
    }
}

#[async_trait]
impl PicksStorageTxn for SeaOrmPicksTxn {
    async fn load_settings(&mut self) -> Result<ContestSettings, PicksError> {
        let row = settings::Entity::find_by_id(ContestSettings::CONTEST_CLOSED_KEY.to_owned())
            .one(&self.txn)
            .await?;
        Ok(ContestSettings::from_stored(
            row.as_ref().map(|model| model.value.as_str()),
        ))
    }

    async fn store_settings(&mut self, value: ContestSettings) -> Result<(), PicksError> {
        let model = settings::ActiveModel {
            key: Set(ContestSettings::CONTEST_CLOSED_KEY.to_owned()),
            value: Set(value.stored_value().to_owned()),
            updated_at: Set(Utc::now()),
        };
        settings::Entity::insert(model)
            .on_conflict(
                OnConflict::column(settings::Column::Key)
                    .update_columns([settings::Column::Value, settings::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await?;
        Ok(())
    }

    async fn load_lines(&mut self) -> Result<Vec<LineWithChoices>, PicksError> {
        let rows = lines::Entity::find()
            .order_by_asc(lines::Column::SortOrder)
            .order_by_asc(lines::Column::Title)
            .find_with_related(choices::Entity)
            .all(&self.txn)
            .await?;

        let mut result = Vec::with_capacity(rows.len());
        for (line, choices) in rows {
            let mut choices: Vec<ChoiceRecord> = choices.into_iter().map(choice_record).collect();
            choices.sort_by(|a, b| a.title.cmp(&b.title));
            result.push(LineWithChoices {
                line: line_record(line)?,
                choices,
            });
        }
        // find_with_related may reorder by primary key.
        result.sort_by(|a, b| {
            a.line
                .sort_order
                .cmp(&b.line.sort_order)
                .then_with(|| a.line.title.cmp(&b.line.title))
        });
        Ok(result)
    }

    async fn insert_line(&mut self, line: NewLine) -> Result<LineWithChoices, PicksError> {
        let line_id = Uuid::new_v4();
        let inserted = lines::ActiveModel {
            id: Set(line_id),
            title: Set(line.title),
            choice_limit: Set(to_i32(line.choice_limit, "choice_limit")?),
            collection: Set(line.collection.to_vec()),
            choice_collection_limit: Set(line
                .choice_collection_limit
                .map(|limit| to_i32(limit, "choice_collection_limit"))
                .transpose()?),
            sort_order: Set(line.sort_order),
        }
        .insert(&self.txn)
        .await?;

        let mut created = Vec::with_capacity(line.choices.len());
        for choice in line.choices {
            let model = choices::ActiveModel {
                id: Set(Uuid::new_v4()),
                line_id: Set(line_id),
                title: Set(choice.title),
                flag: Set(choice.flag),
                primary_points: Set(choice.primary_points),
                secondary_points: Set(choice.secondary_points),
                is_primary_win: Set(false),
                is_secondary_win: Set(false),
            }
            .insert(&self.txn)
            .await?;
            created.push(choice_record(model));
        }
        created.sort_by(|a, b| a.title.cmp(&b.title));

        Ok(LineWithChoices {
            line: line_record(inserted)?,
            choices: created,
        })
    }

    async fn lock_line(&mut self, id: LineId) -> Result<Option<LineRecord>, PicksError> {
        let record = lines::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&self.txn)
            .await?;
        record.map(line_record).transpose()
    }

    async fn load_choice(&mut self, id: ChoiceId) -> Result<Option<ChoiceRecord>, PicksError> {
        let record = choices::Entity::find_by_id(id).one(&self.txn).await?;
        Ok(record.map(choice_record))
    }

    async fn update_choice_win_status(
        &mut self,
        id: ChoiceId,
        status: WinStatus,
    ) -> Result<ChoiceRecord, PicksError> {
        let model = choices::ActiveModel {
            id: Set(id),
            is_primary_win: Set(status.is_primary_win),
            is_secondary_win: Set(status.is_secondary_win),
            ..Default::default()
        };
        let updated = model
            .update(&self.txn)
            .await
            .map_err(|err| not_updated(err, "choice"))?;
        Ok(choice_record(updated))
    }

    async fn load_user(&mut self, id: UserId) -> Result<Option<UserRecord>, PicksError> {
        let record = users::Entity::find_by_id(id).one(&self.txn).await?;
        Ok(record.map(user_record))
    }

    async fn load_user_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<UserRecord>, PicksError> {
        let record = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.txn)
            .await?;
        Ok(record.map(user_record))
    }

    async fn lock_user(&mut self, id: UserId) -> Result<Option<UserRecord>, PicksError> {
        let record = users::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&self.txn)
            .await?;
        Ok(record.map(user_record))
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<UserRecord, PicksError> {
        let model = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(user.name),
            email: Set(user.email),
            display_name: Set(None),
            has_paid: Set(false),
            created_at: Set(Utc::now()),
        };
        let inserted = model.insert(&self.txn).await?;
        Ok(user_record(inserted))
    }

    async fn list_users(&mut self) -> Result<Vec<UserRecord>, PicksError> {
        let records = users::Entity::find()
            .order_by_asc(users::Column::CreatedAt)
            .all(&self.txn)
            .await?;
        Ok(records.into_iter().map(user_record).collect())
    }

    async fn update_display_name(
        &mut self,
        id: UserId,
        display_name: &str,
    ) -> Result<UserRecord, PicksError> {
        let model = users::ActiveModel {
            id: Set(id),
            display_name: Set(Some(display_name.to_owned())),
            ..Default::default()
        };
        let updated = model
            .update(&self.txn)
            .await
            .map_err(|err| not_updated(err, "user"))?;
        Ok(user_record(updated))
    }

    async fn update_payment(
        &mut self,
        id: UserId,
        has_paid: bool,
    ) -> Result<UserRecord, PicksError> {
        let model = users::ActiveModel {
            id: Set(id),
            has_paid: Set(has_paid),
            ..Default::default()
        };
        let updated = model
            .update(&self.txn)
            .await
            .map_err(|err| not_updated(err, "user"))?;
        Ok(user_record(updated))
    }

    async fn load_user_bets(&mut self, user_id: UserId) -> Result<Vec<BetRecord>, PicksError> {
        let records = bets::Entity::find()
            .filter(bets::Column::UserId.eq(user_id))
            .order_by_asc(bets::Column::CreatedAt)
            .all(&self.txn)
            .await?;
        Ok(records.into_iter().map(bet_record).collect())
    }

    async fn load_all_bets(&mut self) -> Result<Vec<BetRecord>, PicksError> {
        let records = bets::Entity::find()
            .order_by_asc(bets::Column::CreatedAt)
            .all(&self.txn)
            .await?;
        Ok(records.into_iter().map(bet_record).collect())
    }

    async fn delete_user_bets(
        &mut self,
        user_id: UserId,
        choice_ids: &[ChoiceId],
    ) -> Result<u64, PicksError> {
        if choice_ids.is_empty() {
            return Ok(0);
        }
        let result = bets::Entity::delete_many()
            .filter(bets::Column::UserId.eq(user_id))
            .filter(bets::Column::ChoiceId.is_in(choice_ids.iter().copied()))
            .exec(&self.txn)
            .await?;
        Ok(result.rows_affected)
    }

    async fn insert_bets(
        &mut self,
        user_id: UserId,
        choice_ids: &[ChoiceId],
    ) -> Result<Vec<BetRecord>, PicksError> {
        if choice_ids.is_empty() {
            return Ok(Vec::new());
        }
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

        let models = records.iter().map(|bet| bets::ActiveModel {
            id: Set(bet.id),
            user_id: Set(bet.user_id),
            choice_id: Set(bet.choice_id),
            created_at: Set(bet.created_at),
            updated_at: Set(bet.updated_at),
        });
        bets::Entity::insert_many(models)
            .exec_without_returning(&self.txn)
            .await?;
        Ok(records)
    }

    async fn commit(self: Box<Self>) -> Result<(), PicksError> {
        let SeaOrmPicksTxn { txn } = *self;
        txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) {
        let SeaOrmPicksTxn { txn } = *self;
        report_rollback(txn.rollback().await);
    }
}

/// Logs a failed rollback; returns whether the rollback succeeded.
fn report_rollback(result: Result<(), DbErr>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!(target: LOG_TARGET, error = %err, "transaction rollback failed");
            false
        }
    }
}

fn not_updated(err: DbErr, entity: &'static str) -> PicksError {
    match err {
        DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => PicksError::NotFound(entity),
        other => PicksError::Database(other),
    }
}

fn to_i32(value: u32, field: &str) -> Result<i32, PicksError> {
    i32::try_from(value).map_err(|_| PicksError::invalid(format!("{field} is out of range")))
}

fn to_u32(value: i32, field: &str) -> Result<u32, PicksError> {
    u32::try_from(value).map_err(|_| {
        PicksError::Database(DbErr::Custom(format!("negative {field} stored: {value}")))
    })
}

fn line_record(model: lines::Model) -> Result<LineRecord, PicksError> {
    Ok(LineRecord {
        id: model.id,
        title: model.title,
        choice_limit: to_u32(model.choice_limit, "choice_limit")?,
        collection: CollectionTags::from(model.collection),
        choice_collection_limit: model
            .choice_collection_limit
            .map(|limit| to_u32(limit, "choice_collection_limit"))
            .transpose()?,
        sort_order: model.sort_order,
    })
}

fn choice_record(model: choices::Model) -> ChoiceRecord {
    ChoiceRecord {
        id: model.id,
        line_id: model.line_id,
        title: model.title,
        flag: model.flag,
        primary_points: model.primary_points,
        secondary_points: model.secondary_points,
        is_primary_win: model.is_primary_win,
        is_secondary_win: model.is_secondary_win,
    }
}

fn user_record(model: users::Model) -> UserRecord {
    UserRecord {
        id: model.id,
        name: model.name,
        email: model.email,
        display_name: model.display_name,
        has_paid: model.has_paid,
        created_at: model.created_at,
    }
}

fn bet_record(model: bets::Model) -> BetRecord {
    BetRecord {
        id: model.id,
        user_id: model.user_id,
        choice_id: model.choice_id,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::time::Duration as StdDuration;

    use sea_orm::{ConnectOptions, Database};

    use super::*;
    use crate::auth::SessionClaims;
    use crate::config::PicksConfig;
    use crate::db::create_schema;
    use crate::domain::NewChoice;
    use crate::picks::{PicksService, PicksServiceFactory};

    /// Connects only to an explicitly configured test database.
    async fn setup() -> Option<DatabaseConnection> {
        let Ok(url) = env::var("TEST_DATABASE_URL") else {
            eprintln!("skipping picks storage test: TEST_DATABASE_URL is not set");
            return None;
        };

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(5)
            .min_connections(1)
            .connect_timeout(StdDuration::from_secs(5))
            .sqlx_logging(false);

        let conn = match Database::connect(opt).await {
            Ok(conn) => conn,
            Err(err) => {
                eprintln!("skipping picks storage test: failed to connect to postgres ({err})");
                return None;
            }
        };
        if let Err(err) = conn.ping().await {
            eprintln!("skipping picks storage test: ping postgres failed ({err})");
            return None;
        }
        if let Err(err) = create_schema(&conn).await {
            eprintln!("skipping picks storage test: failed to create schema ({err})");
            return None;
        }
        Some(conn)
    }

    #[test]
    fn failed_rollback_is_reported() {
        assert!(report_rollback(Ok(())));
        assert!(!report_rollback(Err(DbErr::Custom("connection closed".into()))));
    }

    #[tokio::test]
    async fn submissions_round_trip_through_postgres() {
        let Some(conn) = setup().await else {
            return;
        };
        let admin_email = format!("admin-{}@example.com", Uuid::new_v4());
        let fan_email = format!("fan-{}@example.com", Uuid::new_v4());
        let service =
            PicksServiceFactory::from_sea_orm(conn, PicksConfig::new([admin_email.as_str()]));

        let admin = service
            .resolve_identity(SessionClaims {
                email: admin_email.clone(),
                name: Some("Admin".into()),
            })
            .await
            .expect("admin identity");
        let fan = service
            .resolve_identity(SessionClaims {
                email: fan_email.clone(),
                name: None,
            })
            .await
            .expect("fan identity");
        service
            .update_settings(&admin, ContestSettings::default())
            .await
            .expect("open contest");

        let line = service
            .create_line(
                &admin,
                NewLine {
                    title: format!("Golden Boot {}", Uuid::new_v4()),
                    choice_limit: 2,
                    collection: CollectionTags::new(["storage-test"]),
                    choice_collection_limit: None,
                    sort_order: 0,
                    choices: ["Kane", "Mbappe", "Messi"]
                        .into_iter()
                        .map(|title| NewChoice {
                            title: title.to_owned(),
                            flag: String::new(),
                            primary_points: 15,
                            secondary_points: 5,
                        })
                        .collect(),
                },
            )
            .await
            .expect("create line");
        assert_eq!(line.choices.len(), 3);
        assert!(line.line.collection.contains("storage-test"));

        let first = vec![line.choices[0].id, line.choices[1].id];
        service
            .submit_bets(&fan, first)
            .await
            .expect("first submission");
        let second = vec![line.choices[1].id, line.choices[2].id];
        service
            .submit_bets(&fan, second.clone())
            .await
            .expect("second submission");

        let mut stored: Vec<ChoiceId> = service
            .list_bets(&fan)
            .await
            .expect("list bets")
            .into_iter()
            .map(|bet| bet.bet.choice.id)
            .collect();
        stored.sort();
        let mut expected = second;
        expected.sort();
        assert_eq!(stored, expected);

        let again = service
            .resolve_identity(SessionClaims {
                email: fan_email,
                name: None,
            })
            .await
            .expect("existing identity");
        assert_eq!(again.user_id, fan.user_id);
    }
}
