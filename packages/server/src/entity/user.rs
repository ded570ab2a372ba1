use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An identity: the account a caller authenticates as.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Normalized (trimmed, lowercase).
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string. `None` for accounts that only ever used magic links.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    #[sea_orm(has_one)]
    pub profile: HasOne<super::profile::Entity>,

    #[sea_orm(has_many)]
    pub roles: HasMany<super::user_role::Entity>,

    #[sea_orm(has_many)]
    pub notes: HasMany<super::note::Entity>,

    #[sea_orm(has_many)]
    pub file_uploads: HasMany<super::file_upload::Entity>,

    #[sea_orm(has_many)]
    pub sessions: HasMany<super::session::Entity>,

    pub created_at: DateTimeUtc,
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn after_save<C>(model: Model, db: &C, insert: bool) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert {
            crate::triggers::assign_initial_role(db, model.id).await?;
        }
        Ok(model)
    }
}
