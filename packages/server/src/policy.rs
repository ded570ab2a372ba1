//! Row-level and object-level access rules.
//!
//! Every read and write on an owner-scoped table goes through this module.
//! The rule for a `(table, operation)` pair is fixed at compile time; the
//! admin check is a fresh query each time it is needed, so role changes take
//! effect on the very next request.

use common::Role;
use common::storage::ObjectKey;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Select};
use uuid::Uuid;

use crate::entity::user_role;
use crate::error::AppError;

/// Tables protected by row policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Table {
    Profiles,
    UserRoles,
    Notes,
    FileUploads,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

/// Who a policy lets through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    Deny,
    /// The row's `user_id` is the caller.
    Owner,
    /// The caller holds the `admin` role.
    Admin,
    OwnerOrAdmin,
}

pub const fn rule_for(table: Table, op: Operation) -> Rule {
    use Operation::*;
    match (table, op) {
        (Table::Profiles, Select) => Rule::OwnerOrAdmin,
        (Table::Profiles, Insert) => Rule::Owner,
        (Table::Profiles, Update) => Rule::Owner,
        (Table::Profiles, Delete) => Rule::OwnerOrAdmin,

        (Table::UserRoles, Select) => Rule::OwnerOrAdmin,
        (Table::UserRoles, Insert) => Rule::Admin,
        (Table::UserRoles, Update) => Rule::Deny,
        (Table::UserRoles, Delete) => Rule::Admin,

        (Table::Notes, Select) => Rule::OwnerOrAdmin,
        (Table::Notes, Insert) => Rule::Owner,
        (Table::Notes, Update) => Rule::Owner,
        (Table::Notes, Delete) => Rule::OwnerOrAdmin,

        (Table::FileUploads, Select) => Rule::OwnerOrAdmin,
        (Table::FileUploads, Insert) => Rule::Owner,
        (Table::FileUploads, Update) => Rule::Deny,
        (Table::FileUploads, Delete) => Rule::OwnerOrAdmin,
    }
}

/// An entity whose rows belong to one identity.
pub trait OwnedEntity: EntityTrait {
    const TABLE: Table;

    fn owner_column() -> Self::Column;
}

/// Role-check predicate.
///
/// Reads `user_roles` directly, below the policy layer, so policies on
/// `user_roles` itself can call it without recursing.
pub async fn has_role<C>(db: &C, user_id: Uuid, role: Role) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let count = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(user_id))
        .filter(user_role::Column::Role.eq(role))
        .count(db)
        .await?;
    Ok(count > 0)
}

pub async fn is_admin<C>(db: &C, user_id: Uuid) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    has_role(db, user_id, Role::Admin).await
}

/// Whether `caller` may perform `op` on a row of `table` owned by `owner`.
pub async fn permits<C>(
    db: &C,
    caller: Uuid,
    table: Table,
    op: Operation,
    owner: Uuid,
) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    match rule_for(table, op) {
        Rule::Deny => Ok(false),
        Rule::Owner => Ok(caller == owner),
        Rule::Admin => is_admin(db, caller).await,
        Rule::OwnerOrAdmin => Ok(caller == owner || is_admin(db, caller).await?),
    }
}

/// Fails with `PERMISSION_DENIED` unless the caller is an admin.
pub async fn require_admin<C>(db: &C, caller: Uuid) -> Result<(), AppError>
where
    C: ConnectionTrait,
{
    if is_admin(db, caller).await? {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

/// The set of rows a caller can see in one table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    All,
    OwnedBy(Uuid),
    Nothing,
}

impl Scope {
    /// Restrict a query to the rows this scope admits.
    pub fn apply<E>(self, select: Select<E>) -> Select<E>
    where
        E: OwnedEntity,
    {
        match self {
            Scope::All => select,
            Scope::OwnedBy(owner) => select.filter(E::owner_column().eq(owner)),
            // Owner columns are never null.
            Scope::Nothing => select.filter(E::owner_column().is_null()),
        }
    }
}

/// Resolve the select policy of `table` for `caller` into a row scope.
pub async fn select_scope<C>(db: &C, caller: Uuid, table: Table) -> Result<Scope, DbErr>
where
    C: ConnectionTrait,
{
    let scope = match rule_for(table, Operation::Select) {
        Rule::Deny => Scope::Nothing,
        Rule::Owner => Scope::OwnedBy(caller),
        Rule::Admin if is_admin(db, caller).await? => Scope::All,
        Rule::Admin => Scope::Nothing,
        Rule::OwnerOrAdmin if is_admin(db, caller).await? => Scope::All,
        Rule::OwnerOrAdmin => Scope::OwnedBy(caller),
    };
    Ok(scope)
}

/// Object policy: the first path segment must be the caller's id.
///
/// Admins get no special treatment unless `admin_override` is set, so by
/// default an admin who deletes another user's file row leaves the object
/// behind.
pub async fn permits_object<C>(
    db: &C,
    caller: Uuid,
    key: &ObjectKey,
    admin_override: bool,
) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    if key.is_owned_by(caller) {
        return Ok(true);
    }
    if admin_override {
        return is_admin(db, caller).await;
    }
    Ok(false)
}
