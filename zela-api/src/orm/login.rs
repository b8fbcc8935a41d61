//! Database operations for user authentication and session management.
//!
//! Login, session creation, password hashing and verification. The
//! [`DbRunner`] trait lets the same functions run against the Rocket
//! pool in production and a plain in-memory connection in tests.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use diesel::prelude::*;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use uuid::Uuid;

use crate::DbConn;
use crate::models::{NewSession, User};
use crate::orm::testing::FakeDbConn;
use crate::schema::{sessions, users};

/// Abstracts database access so login logic works with both `DbConn`
/// (production) and `FakeDbConn` (tests).
pub trait DbRunner {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static;
}

impl DbRunner for DbConn {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        DbConn::run(self, f)
    }
}

impl<'a> DbRunner for FakeDbConn<'a> {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        FakeDbConn::run(self, f)
    }
}

fn generate_session_token() -> String {
    Uuid::new_v4().to_string()
}

/// Finds a user by email address (exact match).
///
/// # Returns
/// * `Ok(Some(User))` - User found with matching email
/// * `Ok(None)` - No user found with that email
/// * `Err(Status::InternalServerError)` - Database query failed
pub async fn find_user_by_email<D: DbRunner>(db: &D, email: &str) -> Result<Option<User>, Status> {
    let email = email.to_owned();
    db.run(move |conn| {
        users::table
            .filter(users::email.eq(email))
            .first::<User>(conn)
            .optional()
    })
    .await
    .map_err(|_| Status::InternalServerError)
}

/// Verifies a password against a stored Argon2 hash.
///
/// Returns false for a wrong password or an unparseable hash; a
/// corrupted hash must never let a login through.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Creates a new session row and returns its opaque token.
pub async fn create_and_store_session<D: DbRunner>(db: &D, user_id: i32) -> Result<String, Status> {
    let session_token = generate_session_token();
    let now = Utc::now().naive_utc();

    let new_session = NewSession {
        id: session_token.clone(),
        user_id,
        created_at: now,
        expires_at: None,
        revoked: false,
    };

    db.run(move |conn| {
        diesel::insert_into(sessions::table)
            .values(&new_session)
            .execute(conn)
    })
    .await
    .map_err(|_| Status::InternalServerError)?;

    Ok(session_token)
}

/// Sets the session cookie: HTTP-only, SameSite=Lax, secure outside tests.
fn set_session_cookie(cookies: &CookieJar<'_>, session_token: &str) {
    let secure_flag = !cfg!(test);
    let cookie = Cookie::build(("session", session_token.to_string()))
        .http_only(true)
        .secure(secure_flag)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    cookies.add(cookie);
}

/// Full login workflow: validate input, check credentials, create the
/// session and set the cookie.
///
/// # Returns
/// * `Ok(User)` - Login successful, session created and cookie set
/// * `Err(Status::BadRequest)` - Empty email or password
/// * `Err(Status::Unauthorized)` - Unknown user or wrong password
/// * `Err(Status::InternalServerError)` - Database operation failed
///
/// Unknown users and wrong passwords are indistinguishable to the caller.
pub async fn process_login<D: DbRunner>(
    db: &D,
    cookies: &CookieJar<'_>,
    login: &crate::api::login::LoginRequest,
) -> Result<User, Status> {
    if login.email.trim().is_empty() || login.password.trim().is_empty() {
        return Err(Status::BadRequest);
    }

    let user = match find_user_by_email(db, &login.email).await? {
        Some(user) => user,
        None => return Err(Status::Unauthorized),
    };

    if !verify_password(&login.password, &user.password_hash) {
        return Err(Status::Unauthorized);
    }

    let session_token = create_and_store_session(db, user.id).await?;
    set_session_cookie(cookies, &session_token);

    Ok(user)
}

/// Hashes a password with Argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("Hashing should succeed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ROLE_DISTRICT, UserInput};
    use crate::orm::testing::{setup_test_db, setup_test_dbconn};
    use crate::orm::user::insert_user;

    fn insert_dummy_user(conn: &mut diesel::SqliteConnection) -> User {
        let hash = hash_password("dummy password");
        let dummy_user = UserInput {
            name: "Dummy User".to_string(),
            email: "dummy@zela.local".to_string(),
            password_hash: hash,
            role: ROLE_DISTRICT.to_string(),
            school_id: None,
        };
        insert_user(conn, dummy_user).expect("insert dummy user")
    }

    #[test]
    fn test_verify_password() {
        let password = "correct_password";
        let hash = hash_password(password);

        assert!(verify_password(password, &hash));
        assert!(!verify_password("wrong_password", &hash));
        assert!(!verify_password(password, "not-an-argon2-hash"));
    }

    #[tokio::test]
    async fn test_find_user_by_email() {
        let mut conn = setup_test_db();
        let inserted_user = insert_dummy_user(&mut conn);

        let fake_db = setup_test_dbconn(&mut conn);

        let found = find_user_by_email(&fake_db, "dummy@zela.local")
            .await
            .expect("db query should succeed");

        assert!(found.is_some());
        let found_user = found.unwrap();
        assert_eq!(found_user.email, inserted_user.email);
        assert_eq!(found_user.password_hash, inserted_user.password_hash);

        let missing = find_user_by_email(&fake_db, "nobody@zela.local")
            .await
            .expect("db query should succeed");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_create_and_store_session() {
        let mut conn = setup_test_db();
        let inserted_user = insert_dummy_user(&mut conn);

        let fake_db = setup_test_dbconn(&mut conn);

        let session_token = create_and_store_session(&fake_db, inserted_user.id)
            .await
            .expect("session creation should succeed");

        let token = session_token.clone();
        let stored_session = fake_db
            .run(move |conn| {
                sessions::table
                    .filter(sessions::id.eq(&token))
                    .first::<crate::models::Session>(conn)
                    .optional()
            })
            .await
            .expect("db query should succeed");

        let session = stored_session.expect("session should be stored");
        assert_eq!(session.id, session_token);
        assert_eq!(session.user_id, inserted_user.id);
        assert!(!session.revoked);
        assert!(session.expires_at.is_none());
    }
}
