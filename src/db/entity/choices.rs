use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "choices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub line_id: Uuid,
    pub title: String,
    pub flag: String,
    pub primary_points: i32,
    pub secondary_points: i32,
    pub is_primary_win: bool,
    pub is_secondary_win: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lines::Entity",
        from = "Column::LineId",
        to = "super::lines::Column::Id",
        on_delete = "Cascade"
    )]
    Lines,
    #[sea_orm(has_many = "super::bets::Entity")]
    Bets,
}

impl Related<super::lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::bets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
