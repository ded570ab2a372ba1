use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::policy::{OwnedEntity, Table};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owner. Immutable after creation.
    pub user_id: Uuid,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,

    /// Written by the timestamp trigger, never by callers.
    pub created_at: DateTimeUtc,
    /// Written by the timestamp trigger, never by callers.
    pub updated_at: DateTimeUtc,
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        crate::triggers::refresh_note_timestamps(self, insert, chrono::Utc::now())
    }
}

impl OwnedEntity for Entity {
    const TABLE: Table = Table::Notes;

    fn owner_column() -> Self::Column {
        Column::UserId
    }
}
