//! Test support: in-memory databases and fully wired Rocket instances.
//!
//! `setup_test_db()` gives unit tests a migrated synchronous connection;
//! `FakeDbConn` adapts one to the async `.run()` interface the login
//! helpers expect; `test_rocket()` builds the whole application against
//! a unique shared in-memory database seeded with a standard data set.

use diesel::connection::SimpleConnection;
use diesel::sqlite::SqliteConnection;
use rocket::figment::{
    util::map,
    value::{Map, Value},
};
use rocket::{Build, Rocket, fairing::AdHoc};
use rocket_sync_db_pools::diesel;

use super::db::{DbConn, run_pending_migrations, set_foreign_keys};
use crate::admin_init_fairing::admin_init_fairing;
use crate::models::{ROLE_SCHOOL, SchoolInput, UserInput};
use crate::orm::login::hash_password;
use crate::orm::school::{get_school_by_name_case_insensitive, insert_school};
use crate::orm::user::{get_user_by_email, insert_user};

/// Builds a `SchoolInput` with plausible defaults for tests.
pub fn sample_school_input(name: &str, polo: i32) -> SchoolInput {
    SchoolInput {
        name: name.to_string(),
        city: "Porto Velho".to_string(),
        state: "RO".to_string(),
        director_name: "Ana Pereira".to_string(),
        phone: "(69) 3200-0000".to_string(),
        email: "direcao@escola.example".to_string(),
        polo,
    }
}

fn set_sqlite_test_pragmas(conn: &mut diesel::SqliteConnection) {
    // Faster but non-durable writes; test databases are disposable.
    conn.batch_execute(
        r#"
        PRAGMA synchronous = OFF;
        PRAGMA journal_mode = OFF;
        "#,
    )
    .expect("Failed to set SQLite PRAGMAs");
}

fn set_sqlite_test_pragmas_fairing() -> AdHoc {
    AdHoc::on_ignite("Set SQLite Test Pragmas", |rocket| async {
        let conn = DbConn::get_one(&rocket)
            .await
            .expect("database connection for migration");
        conn.run(|c| {
            set_sqlite_test_pragmas(c);
        })
        .await;
        rocket
    })
}

/// Creates a Rocket fairing that initializes standard test data.
///
/// Every integration test can rely on these rows existing: two schools,
/// a district user and a school-level user bound to the first school.
fn test_data_init_fairing() -> AdHoc {
    AdHoc::on_ignite("Test Data Initialization", |rocket| async {
        let conn = DbConn::get_one(&rocket)
            .await
            .expect("database connection for test data initialization");

        conn.run(|c| {
            if let Err(e) = create_test_data(c) {
                eprintln!("[test-data-init] ERROR: Failed to create test data: {:?}", e);
            }
        })
        .await;

        rocket
    })
}

/// Creates standard test data for all tests to use.
pub fn create_test_data(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    let school1 = find_or_create_school(conn, "EM Paulo Freire", 1)?;
    let _school2 = find_or_create_school(conn, "EM Anisio Teixeira", 2)?;

    // The district user comes from admin_init_fairing; add a school-level
    // account tied to the first school.
    create_school_user(conn, "diretor@escola1.example", "diretor", school1.id)?;

    Ok(())
}

fn find_or_create_school(
    conn: &mut SqliteConnection,
    name: &str,
    polo: i32,
) -> Result<crate::models::School, diesel::result::Error> {
    match get_school_by_name_case_insensitive(conn, name)? {
        Some(school) => Ok(school),
        None => insert_school(conn, sample_school_input(name, polo)),
    }
}

fn create_school_user(
    conn: &mut SqliteConnection,
    email: &str,
    password: &str,
    school_id: i32,
) -> Result<(), diesel::result::Error> {
    if get_user_by_email(conn, email)?.is_some() {
        return Ok(());
    }

    insert_user(
        conn,
        UserInput {
            name: "Diretor Escola".to_string(),
            email: email.to_string(),
            password_hash: hash_password(password),
            role: ROLE_SCHOOL.to_string(),
            school_id: Some(school_id),
        },
    )?;

    Ok(())
}

/// Creates and configures a Rocket instance for testing with an
/// in-memory SQLite database.
///
/// The returned Rocket instance will have:
/// - A unique shared in-memory SQLite database configured
/// - Foreign keys enabled and testing pragmas set
/// - All migrations run
/// - Admin initialization and standard test data created
/// - API and page routes mounted, catchers registered
pub fn test_rocket() -> Rocket<Build> {
    use uuid::Uuid;

    // Unique shared in-memory DB per test instance; shared cache keeps
    // all pool connections on the same database.
    let unique_db_name = format!("file:test_db_{}?mode=memory&cache=shared", Uuid::new_v4());

    let db_config: Map<_, Value> = map! {
        "url" => unique_db_name.into(),
        "pool_size" => 5.into(),
        "timeout" => 5.into(),
    };

    let databases = map!["sqlite_db" => db_config];

    let figment = rocket::Config::figment().merge(("databases", databases));

    let rocket = rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(super::db::set_foreign_keys_fairing())
        .attach(set_sqlite_test_pragmas_fairing())
        .attach(super::db::run_migrations_fairing())
        .attach(admin_init_fairing())
        .attach(test_data_init_fairing());

    crate::mount_page_routes(crate::mount_api_routes(rocket).register("/", crate::catchers()))
}

/// Creates a synchronous in-memory SQLite database connection for unit
/// tests, with migrations run and foreign keys enabled.
///
/// Each call returns a new, independent in-memory database.
pub fn setup_test_db() -> SqliteConnection {
    use diesel::Connection;

    let mut conn = SqliteConnection::establish(":memory:")
        .expect("Failed to create in-memory SQLite database");
    set_foreign_keys(&mut conn);
    run_pending_migrations(&mut conn);
    conn
}

/// A minimal async-compatible wrapper around a synchronous SQLite
/// connection, mimicking the `.run()` interface of `DbConn` for unit
/// tests of async database helpers.
pub struct FakeDbConn<'a>(pub &'a mut diesel::SqliteConnection);

impl<'a> FakeDbConn<'a> {
    /// Executes a closure with a mutable reference to the underlying
    /// SQLite connection.
    ///
    /// # Safety
    /// Converts an immutable reference to mutable; safe here because
    /// tests hold exclusive access to the wrapped connection.
    pub async fn run<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        unsafe {
            let conn_ptr =
                self.0 as *const diesel::SqliteConnection as *mut diesel::SqliteConnection;
            f(&mut *conn_ptr)
        }
    }
}

/// Wraps a test connection in a [`FakeDbConn`].
pub fn setup_test_dbconn<'a>(conn: &'a mut diesel::SqliteConnection) -> FakeDbConn<'a> {
    FakeDbConn(conn)
}
