use std::time::Duration;

use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::entity::{file_upload, note, session};

pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.to_owned());

    opt.max_connections(config.max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("vault_server::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

/// Ensure the lookup indexes behind the owner-scoped list queries exist.
///
/// Schema sync only creates unique keys, so composite non-unique indexes
/// are created here on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let indexes = [
        (
            "idx_notes_user_created",
            Index::create()
                .if_not_exists()
                .name("idx_notes_user_created")
                .table(note::Entity)
                .col(note::Column::UserId)
                .col(note::Column::CreatedAt)
                .to_owned(),
        ),
        (
            "idx_file_uploads_user_category",
            Index::create()
                .if_not_exists()
                .name("idx_file_uploads_user_category")
                .table(file_upload::Entity)
                .col(file_upload::Column::UserId)
                .col(file_upload::Column::Category)
                .to_owned(),
        ),
        (
            "idx_sessions_user",
            Index::create()
                .if_not_exists()
                .name("idx_sessions_user")
                .table(session::Entity)
                .col(session::Column::UserId)
                .to_owned(),
        ),
    ];

    let backend = db.get_database_backend();
    for (name, stmt) in &indexes {
        match db.execute_unprepared(&build_index(backend, stmt)).await {
            Ok(_) => info!("Ensured index {name} exists"),
            Err(e) => tracing::warn!("Failed to create index {name}: {e}"),
        }
    }

    Ok(())
}

fn build_index(backend: DbBackend, stmt: &IndexCreateStatement) -> String {
    match backend {
        DbBackend::Postgres => stmt.to_string(PostgresQueryBuilder),
        _ => stmt.to_string(SqliteQueryBuilder),
    }
}
