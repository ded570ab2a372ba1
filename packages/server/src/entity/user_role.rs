use common::Role;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::policy::{OwnedEntity, Table};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique_key = "user_role")]
    pub user_id: Uuid,
    #[sea_orm(unique_key = "user_role")]
    pub role: Role,

    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub created_at: DateTimeUtc,
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            return Err(DbErr::Custom(
                "role assignments cannot be updated; delete and re-insert instead".into(),
            ));
        }
        Ok(self)
    }
}

impl OwnedEntity for Entity {
    const TABLE: Table = Table::UserRoles;

    fn owner_column() -> Self::Column {
        Column::UserId
    }
}
