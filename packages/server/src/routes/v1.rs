use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers::{admin, auth, files, notes, profile, storage};
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .merge(profile_routes())
        .nest("/notes", note_routes())
        .nest("/files", file_routes(config))
        .nest("/storage", storage_routes())
        .nest("/admin", admin_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(auth::signup))
        .routes(routes!(auth::login))
        .routes(routes!(auth::request_magic_link))
        .routes(routes!(auth::verify_magic_link))
        .routes(routes!(auth::logout))
        .routes(routes!(auth::me))
        .routes(routes!(auth::events))
}

fn profile_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(profile::get_own_profile, profile::update_own_profile))
        .routes(routes!(profile::get_profile, profile::delete_profile))
}

fn note_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(notes::list_notes, notes::create_note))
        .routes(routes!(notes::create_chat_note))
        .routes(routes!(notes::get_note, notes::update_note, notes::delete_note))
}

fn file_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(files::list_files, files::upload_file))
        .routes(routes!(files::get_file, files::delete_file))
        .routes(routes!(files::download_file))
        .routes(routes!(files::get_file_url))
        .layer(files::upload_body_limit(&config.storage))
}

fn storage_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            storage::put_object,
            storage::get_object,
            storage::delete_object
        ))
        .routes(routes!(storage::sign_object_url))
        .routes(routes!(storage::get_signed_object))
        .routes(routes!(storage::get_public_object))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(admin::list_users))
        .routes(routes!(admin::get_user_roles, admin::grant_role))
        .routes(routes!(admin::revoke_role))
        .routes(routes!(admin::list_all_notes))
        .routes(routes!(admin::list_all_files))
}
