use common::FileCategory;
use common::storage::ObjectKey;
use sea_orm::ActiveValue;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::policy::{OwnedEntity, Table};

/// Metadata for an uploaded object. The object itself lives in the bucket
/// of `category` under `storage_path`; nothing links the two beyond the path.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_uploads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    /// Original upload filename.
    pub file_name: String,
    /// MIME content type.
    pub file_type: String,
    /// Size in bytes.
    pub file_size: i64,
    /// `{user_id}/{generated_id}.{ext}`.
    pub storage_path: String,
    pub category: FileCategory,

    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn object_key(&self) -> Result<ObjectKey, common::storage::StorageError> {
        ObjectKey::parse(&self.storage_path)
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            return Err(DbErr::Custom("file uploads cannot be updated".into()));
        }

        if let (ActiveValue::Set(owner), ActiveValue::Set(path)) = (&self.user_id, &self.storage_path)
        {
            let owned = ObjectKey::parse(path).is_ok_and(|key| key.is_owned_by(*owner));
            if !owned {
                return Err(DbErr::Custom(format!(
                    "storage path '{path}' does not start with the owner's id"
                )));
            }
        }
        Ok(self)
    }
}

impl OwnedEntity for Entity {
    const TABLE: Table = Table::FileUploads;

    fn owner_column() -> Self::Column {
        Column::UserId
    }
}
