use chrono::Utc;
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use crate::models::{NewUser, User, UserInput};

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = BigInt)]
    last_insert_rowid: i64,
}

/// Inserts a new user and returns the stored row.
pub fn insert_user(
    conn: &mut SqliteConnection,
    new_user: UserInput,
) -> Result<User, diesel::result::Error> {
    use crate::schema::users::dsl::*;

    let now = Utc::now().naive_utc();
    let insertable_user = NewUser {
        name: new_user.name,
        email: new_user.email,
        password_hash: new_user.password_hash,
        role: new_user.role,
        school_id: new_user.school_id,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(users)
        .values(&insertable_user)
        .execute(conn)?;

    let last_id = diesel::sql_query("SELECT last_insert_rowid() as last_insert_rowid")
        .get_result::<LastInsertRowId>(conn)?
        .last_insert_rowid;

    users.filter(id.eq(last_id as i32)).first::<User>(conn)
}

/// Gets a single user by ID.
pub fn get_user(
    conn: &mut SqliteConnection,
    user_id: i32,
) -> Result<Option<User>, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    users.filter(id.eq(user_id)).first::<User>(conn).optional()
}

/// Gets a single user by email (case-insensitive).
pub fn get_user_by_email(
    conn: &mut SqliteConnection,
    user_email: &str,
) -> Result<Option<User>, diesel::result::Error> {
    diesel::sql_query("SELECT * FROM users WHERE LOWER(email) = LOWER(?)")
        .bind::<diesel::sql_types::Text, _>(user_email)
        .get_result::<User>(conn)
        .optional()
}

/// Returns all users in ascending order by id.
pub fn list_all_users(conn: &mut SqliteConnection) -> Result<Vec<User>, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    users.order(id.asc()).load::<User>(conn)
}

/// One page of users matching an optional name/email search term,
/// together with the total match count.
pub fn search_users(
    conn: &mut SqliteConnection,
    term: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<User>, i64), diesel::result::Error> {
    use crate::schema::users::dsl::*;

    let pattern = term.map(|t| format!("%{}%", t));

    let mut query = users.into_boxed();
    if let Some(pat) = &pattern {
        query = query.filter(name.like(pat.clone()).or(email.like(pat.clone())));
    }
    let items = query
        .order(id.asc())
        .limit(limit)
        .offset(offset)
        .load::<User>(conn)?;

    let mut count_query = users.into_boxed();
    if let Some(pat) = &pattern {
        count_query = count_query.filter(name.like(pat.clone()).or(email.like(pat.clone())));
    }
    let total = count_query.count().get_result::<i64>(conn)?;

    Ok((items, total))
}

/// Updates a user's fields. All fields are optional - only provided
/// fields change. Bumps `updated_at` whenever anything was set.
pub fn update_user(
    conn: &mut SqliteConnection,
    user_id: i32,
    new_name: Option<String>,
    new_email: Option<String>,
    new_password_hash: Option<String>,
    new_role: Option<String>,
    new_school_id: Option<Option<i32>>,
) -> Result<User, diesel::result::Error> {
    use crate::schema::users::dsl::*;

    if let Some(name_val) = new_name {
        diesel::update(users.filter(id.eq(user_id)))
            .set(name.eq(name_val))
            .execute(conn)?;
    }

    if let Some(email_val) = new_email {
        diesel::update(users.filter(id.eq(user_id)))
            .set(email.eq(email_val))
            .execute(conn)?;
    }

    if let Some(password_val) = new_password_hash {
        diesel::update(users.filter(id.eq(user_id)))
            .set(password_hash.eq(password_val))
            .execute(conn)?;
    }

    if let Some(role_val) = new_role {
        diesel::update(users.filter(id.eq(user_id)))
            .set(role.eq(role_val))
            .execute(conn)?;
    }

    if let Some(school_val) = new_school_id {
        diesel::update(users.filter(id.eq(user_id)))
            .set(school_id.eq(school_val))
            .execute(conn)?;
    }

    diesel::update(users.filter(id.eq(user_id)))
        .set(updated_at.eq(Utc::now().naive_utc()))
        .execute(conn)?;

    users.filter(id.eq(user_id)).first::<User>(conn)
}

/// Deletes a user after revoking their sessions.
/// Returns Ok(true) if the user existed, Ok(false) if not.
pub fn delete_user(
    conn: &mut SqliteConnection,
    user_id: i32,
) -> Result<bool, diesel::result::Error> {
    use crate::schema::users::dsl::*;

    crate::orm::logout::revoke_sessions_for_user(conn, user_id)?;
    let rows_affected = diesel::delete(users.filter(id.eq(user_id))).execute(conn)?;
    Ok(rows_affected > 0)
}
