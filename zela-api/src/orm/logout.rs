//! Database operations for user logout and session revocation.

use diesel::prelude::*;

use crate::{DbConn, schema::sessions::dsl::*};

/// Revokes a session by marking it as revoked in the database.
///
/// The session row is kept for auditing; only the `revoked` flag flips,
/// which invalidates the token for the session guard. Unknown session
/// ids affect zero rows and are not an error.
pub async fn revoke_session(db: &DbConn, session_id: &str) -> Result<usize, diesel::result::Error> {
    let session_id = session_id.to_string();
    db.run(move |conn| {
        diesel::update(sessions.filter(id.eq(&session_id)))
            .set(revoked.eq(true))
            .execute(conn)
    })
    .await
}

/// Revokes every active session belonging to a user.
///
/// Used when a user is deleted or has their password reset so stale
/// cookies cannot keep a terminated account alive.
pub fn revoke_sessions_for_user(
    conn: &mut SqliteConnection,
    target_user_id: i32,
) -> Result<usize, diesel::result::Error> {
    diesel::update(sessions.filter(user_id.eq(target_user_id)))
        .set(revoked.eq(true))
        .execute(conn)
}
