#[macro_use]
extern crate rocket;

use rocket::figment::value::Map;
use rocket::figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use rocket::fs::FileServer;
use rocket::request::Request;
use rocket::serde::json::{Json, Value, json};
use rocket::{Build, Rocket};

pub mod admin_init_fairing;
pub mod api;
pub mod consumption;
pub mod list_query;
pub mod logged_json;
pub mod models;
pub mod orm;
pub use orm::DbConn;
pub mod pages;
pub mod permit;
pub mod reports;
pub mod schema;
pub mod session_guards;

#[catch(401)]
fn unauthorized(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Unauthorized",
        "path": req.uri().path().to_string(),
        "status": 401
    }))
}

#[catch(403)]
fn forbidden(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Forbidden",
        "path": req.uri().path().to_string(),
        "status": 403
    }))
}

#[catch(404)]
fn not_found(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Not Found",
        "path": req.uri().path().to_string(),
        "status": 404
    }))
}

#[catch(409)]
fn conflict(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Conflict",
        "path": req.uri().path().to_string(),
        "status": 409
    }))
}

#[catch(422)]
fn unprocessable_entity(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Unprocessable Entity",
        "path": req.uri().path().to_string(),
        "status": 422
    }))
}

#[catch(500)]
fn internal_server_error(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Internal Server Error",
        "path": req.uri().path().to_string(),
        "status": 500
    }))
}

#[catch(default)]
fn default_catcher(status: rocket::http::Status, req: &Request) -> Json<Value> {
    Json(json!({
        "error": status.reason().unwrap_or("Unknown Error"),
        "path": req.uri().path().to_string(),
        "status": status.code
    }))
}

/// JSON catchers registered on every instance, test rockets included.
pub fn catchers() -> Vec<rocket::Catcher> {
    catchers![
        unauthorized,
        forbidden,
        not_found,
        conflict,
        unprocessable_entity,
        internal_server_error,
        default_catcher
    ]
}

pub fn mount_api_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount("/api", api::routes())
}

pub fn mount_page_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount("/", pages::routes())
}

fn log_rocket_info(rocket: &Rocket<Build>) {
    let figment = rocket.figment();

    if let Ok(address) = figment.extract_inner::<String>("address") {
        info!("Rocket is running at: {}", address);
    }

    if let Ok(port) = figment.extract_inner::<u16>("port") {
        info!("Rocket is listening on port: {}", port);
    }

    match figment.extract_inner::<Map<String, Value>>("databases.sqlite_db") {
        Ok(db_config) => {
            if let Some(Value::String(url)) = db_config.get("url") {
                info!("Database URL: {}", url);
            } else {
                warn!("Database URL not found in configuration");
            }
        }
        Err(e) => {
            warn!("Failed to extract database configuration: {}", e);
        }
    }
}

/// Builds the production Rocket instance. Tests use the in-memory
/// variant in `orm::testing` instead.
pub fn rocket() -> Rocket<Build> {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let figment = Figment::from(rocket::Config::default())
        .merge(Toml::file("Rocket.toml").nested())
        .merge(Env::prefixed("ROCKET_").global())
        .merge(("databases.sqlite_db.url", database_url));

    let rocket = rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(orm::set_foreign_keys_fairing())
        .attach(orm::run_migrations_fairing())
        .attach(admin_init_fairing::admin_init_fairing())
        .register("/", catchers());

    log_rocket_info(&rocket);

    let static_dir = std::env::var("ZELA_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
    mount_page_routes(mount_api_routes(rocket)).mount("/", FileServer::from(static_dir).rank(10))
}
