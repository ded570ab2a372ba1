use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tempfile::TempDir;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::database::init_db;
use crate::entity::{note, user};

/// Fresh SQLite database in a temp dir. Keep the `TempDir` alive for the test.
pub async fn test_db() -> (DatabaseConnection, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}/vault.db?mode=rwc", dir.path().display()),
        max_connections: 1,
    };
    let db = init_db(&config).await.unwrap();
    (db, dir)
}

pub async fn insert_user(db: &DatabaseConnection, email: &str) -> Uuid {
    user::ActiveModel {
        id: Set(Uuid::now_v7()),
        email: Set(email.to_string()),
        password: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

pub async fn insert_note(db: &DatabaseConnection, owner: Uuid, title: &str) -> note::Model {
    note::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(owner),
        title: Set(title.to_string()),
        content: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}
