use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "alert_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub name: String,
    pub metric: String,
    pub condition: String,
    pub threshold: f64,
    pub category: Option<String>,
    pub enabled: bool,
    pub trigger_count: i64,
    pub last_triggered_at: Option<DateTimeWithTimeZone>,
    pub cooldown_secs: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::alert_history::Entity")]
    AlertHistory,
}

impl Related<super::alert_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AlertHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
