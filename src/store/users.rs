use std::collections::HashMap;

use chrono::Duration;
use diesel::prelude::*;

use crate::crypto::CryptoUtils;
use crate::error::ApiError;
use crate::models::{NewSession, NewUser, User};
use crate::schema::{sessions, users};

pub fn find_by_username(conn: &mut PgConnection, username: &str) -> QueryResult<Option<User>> {
    users::table
        .filter(users::username.eq(username))
        .select(User::as_select())
        .first(conn)
        .optional()
}

/// The user owning an unexpired session.
pub fn find_by_session(conn: &mut PgConnection, token: &str) -> QueryResult<Option<User>> {
    sessions::table
        .inner_join(users::table)
        .filter(sessions::token.eq(token))
        .filter(sessions::expires_at.gt(super::now()))
        .select(User::as_select())
        .first(conn)
        .optional()
}

/// Checks credentials. `Ok(None)` means unknown user or wrong password.
pub fn authenticate(conn: &mut PgConnection, username: &str, password: &str) -> Result<Option<User>, ApiError> {
    let Some(user) = find_by_username(conn, username)? else {
        return Ok(None);
    };
    if CryptoUtils::verify_password(password, &user.password_hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

pub fn create_session(conn: &mut PgConnection, user_id: i32, ttl_hours: i64) -> QueryResult<String> {
    let token = CryptoUtils::generate_session_token();
    let expires_at = super::now() + Duration::hours(ttl_hours);

    diesel::delete(sessions::table.filter(sessions::expires_at.le(super::now()))).execute(conn)?;
    diesel::insert_into(sessions::table)
        .values(&NewSession { token: &token, user_id, expires_at })
        .execute(conn)?;
    Ok(token)
}

pub fn delete_session(conn: &mut PgConnection, token: &str) -> QueryResult<bool> {
    let deleted = diesel::delete(sessions::table.filter(sessions::token.eq(token))).execute(conn)?;
    Ok(deleted == 1)
}

pub fn insert_user(conn: &mut PgConnection, new_user: &NewUser<'_>) -> QueryResult<User> {
    diesel::insert_into(users::table)
        .values(new_user)
        .returning(User::as_returning())
        .get_result(conn)
}

pub fn count(conn: &mut PgConnection) -> QueryResult<i64> {
    users::table.count().get_result(conn)
}

/// Display names for a set of user ids.
pub fn names(conn: &mut PgConnection, ids: &[i32]) -> QueryResult<HashMap<i32, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, String)> = users::table
        .filter(users::id.eq_any(ids))
        .select((users::id, users::full_name))
        .load(conn)?;
    Ok(rows.into_iter().collect())
}
