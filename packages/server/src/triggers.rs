//! Row triggers, run from the entities' `ActiveModelBehavior` hooks so they
//! execute on the same connection (and transaction) as the write that fires them.

use chrono::{DateTime, Utc};
use common::Role;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use crate::entity::{note, user, user_role};

/// Role-assignment trigger, fired after an identity row is inserted.
///
/// The very first identity becomes `admin`; every later one becomes `user`.
/// Runs below the policy layer, so it is never blocked by the admin-only
/// insert rule on `user_roles`. An error here aborts the identity insert.
pub async fn assign_initial_role<C>(db: &C, user_id: Uuid) -> Result<user_role::Model, DbErr>
where
    C: ConnectionTrait,
{
    let others = user::Entity::find()
        .filter(user::Column::Id.ne(user_id))
        .count(db)
        .await?;

    let role = if others == 0 { Role::Admin } else { Role::User };

    let assignment = user_role::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(user_id),
        role: Set(role),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(%user_id, %role, "Assigned initial role");
    Ok(assignment)
}

/// Timestamp trigger for notes, fired before every insert and update.
///
/// Timestamps supplied by the caller are always overwritten. On update,
/// `updated_at` never moves backwards and the owner cannot change.
pub fn refresh_note_timestamps(
    mut active: note::ActiveModel,
    insert: bool,
    now: DateTime<Utc>,
) -> Result<note::ActiveModel, DbErr> {
    if insert {
        active.created_at = Set(now);
        active.updated_at = Set(now);
        return Ok(active);
    }

    if matches!(active.user_id, ActiveValue::Set(_)) {
        return Err(DbErr::Custom("note owner cannot be changed".into()));
    }

    let stamp = match &active.updated_at {
        ActiveValue::Unchanged(previous) => now.max(*previous),
        _ => now,
    };
    active.updated_at = Set(stamp);
    Ok(active)
}
