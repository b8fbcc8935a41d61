use diesel::prelude::*;
use dotenvy::dotenv;
use rocket::Rocket;
use rocket::fairing::AdHoc;

use crate::models::{ROLE_DISTRICT, User, UserInput};
use crate::orm::DbConn;
use crate::orm::login::hash_password;
use crate::orm::user::insert_user;
use crate::schema::users::dsl::*;

/// Add a default district-level user if none exists.
///
/// Credentials come from ZELA_DEFAULT_EMAIL and ZELA_DEFAULT_PASSWORD;
/// without them the instance boots with admin@zela.local / admin and
/// expects the operator to change the password.
pub fn admin_init_fairing() -> AdHoc {
    AdHoc::try_on_ignite("Admin User Initialization", |rocket| async {
        dotenv().ok();

        let conn = match get_db_connection(&rocket).await {
            Some(conn) => conn,
            None => return Err(rocket),
        };

        let admin_email = get_admin_email();
        match conn
            .run(move |c| create_admin_user_if_needed(c, &admin_email))
            .await
        {
            Ok(()) => Ok(rocket),
            Err(e) => {
                error!("[admin-init] FATAL: Admin user creation failed: {:?}", e);
                Err(rocket)
            }
        }
    })
}

async fn get_db_connection(rocket: &Rocket<rocket::Build>) -> Option<DbConn> {
    match DbConn::get_one(rocket).await {
        Some(conn) => Some(conn),
        None => {
            error!("[admin-init] ERROR: Could not get DB connection.");
            None
        }
    }
}

fn get_admin_email() -> String {
    std::env::var("ZELA_DEFAULT_EMAIL").unwrap_or_else(|_| "admin@zela.local".to_string())
}

fn get_admin_password() -> String {
    std::env::var("ZELA_DEFAULT_PASSWORD").unwrap_or_else(|_| "admin".to_string())
}

fn create_admin_user_if_needed(
    c: &mut SqliteConnection,
    admin_email: &str,
) -> Result<(), diesel::result::Error> {
    if district_user_exists(c)? {
        info!("[admin-init] A district user already exists");
        return Ok(());
    }

    let admin_password = get_admin_password();
    let passhash = hash_password(&admin_password);

    let admin_user = UserInput {
        name: "Administrador".to_string(),
        email: admin_email.to_string(),
        password_hash: passhash,
        role: ROLE_DISTRICT.to_string(),
        school_id: None,
    };

    match insert_user(c, admin_user) {
        Ok(_) => {
            info!("[admin-init] Created district user: '{}'", admin_email);
            Ok(())
        }
        Err(e) => {
            error!("[admin-init] ERROR creating district user: {:?}", e);
            Err(e)
        }
    }
}

fn district_user_exists(c: &mut SqliteConnection) -> Result<bool, diesel::result::Error> {
    let existing = users
        .filter(role.eq(ROLE_DISTRICT))
        .first::<User>(c)
        .optional()?;
    Ok(existing.is_some())
}
