//! Page-level navigation guards.
//!
//! The frontend is a static bundle served by `FileServer`; these routes
//! sit in front of it and implement the session bridge: a request
//! without a valid session is sent to `/login` (unless already there),
//! and an authenticated request to `/login` is sent back to the app.

use rocket::Route;
use rocket::fs::NamedFile;
use rocket::response::Redirect;
use std::path::PathBuf;

use crate::session_guards::AuthenticatedUser;

fn static_dir() -> PathBuf {
    std::env::var("ZELA_STATIC_DIR")
        .unwrap_or_else(|_| "static".to_string())
        .into()
}

/// The SPA entry point; `Ok(None)` turns into 404 when the bundle is
/// not deployed, which keeps tests independent of frontend assets.
async fn spa_index() -> Option<NamedFile> {
    NamedFile::open(static_dir().join("index.html")).await.ok()
}

async fn guarded_page(user: Option<AuthenticatedUser>) -> Result<Option<NamedFile>, Redirect> {
    match user {
        Some(_) => Ok(spa_index().await),
        None => Err(Redirect::to(uri!(login_page))),
    }
}

#[get("/login")]
pub async fn login_page(user: Option<AuthenticatedUser>) -> Result<Option<NamedFile>, Redirect> {
    match user {
        Some(_) => Err(Redirect::to("/")),
        None => Ok(spa_index().await),
    }
}

#[get("/")]
pub async fn index_page(user: Option<AuthenticatedUser>) -> Result<Option<NamedFile>, Redirect> {
    guarded_page(user).await
}

#[get("/schools")]
pub async fn schools_page(user: Option<AuthenticatedUser>) -> Result<Option<NamedFile>, Redirect> {
    guarded_page(user).await
}

#[get("/water")]
pub async fn water_page(user: Option<AuthenticatedUser>) -> Result<Option<NamedFile>, Redirect> {
    guarded_page(user).await
}

#[get("/processes")]
pub async fn processes_page(
    user: Option<AuthenticatedUser>,
) -> Result<Option<NamedFile>, Redirect> {
    guarded_page(user).await
}

#[get("/inspections")]
pub async fn inspections_page(
    user: Option<AuthenticatedUser>,
) -> Result<Option<NamedFile>, Redirect> {
    guarded_page(user).await
}

#[get("/users")]
pub async fn users_page(user: Option<AuthenticatedUser>) -> Result<Option<NamedFile>, Redirect> {
    guarded_page(user).await
}

/// Returns all page routes for mounting at the site root.
pub fn routes() -> Vec<Route> {
    routes![
        login_page,
        index_page,
        schools_page,
        water_page,
        processes_page,
        inspections_page,
        users_page
    ]
}
