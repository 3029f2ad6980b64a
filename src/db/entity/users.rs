use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: Option<String>,
    #[sea_orm(unique)]
    pub email: String,
    pub display_name: Option<String>,
    pub has_paid: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bets::Entity")]
    Bets,
}

impl Related<super::bets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
