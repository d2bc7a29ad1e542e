//! SQLSTATE predicates for PostgreSQL errors surfaced through SeaORM.

use sea_orm::{DbErr, RuntimeErr};

pub const UNIQUE_VIOLATION: &str = "23505";
pub const FOREIGN_KEY_VIOLATION: &str = "23503";
pub const NOT_NULL_VIOLATION: &str = "23502";
pub const INVALID_TEXT_REPRESENTATION: &str = "22P02";

pub fn is_unique_violation(err: &DbErr) -> bool {
    has_sqlstate(err, UNIQUE_VIOLATION)
}

pub fn is_foreign_key_violation(err: &DbErr) -> bool {
    has_sqlstate(err, FOREIGN_KEY_VIOLATION)
}

pub fn is_invalid_text_representation(err: &DbErr) -> bool {
    has_sqlstate(err, INVALID_TEXT_REPRESENTATION)
}

pub fn is_not_null_violation(err: &DbErr) -> bool {
    has_sqlstate(err, NOT_NULL_VIOLATION)
}

/// SQLSTATE reported by the database, when the error came from the server.
pub fn sqlstate(err: &DbErr) -> Option<String> {
    let runtime = match err {
        DbErr::Exec(e) | DbErr::Query(e) | DbErr::Conn(e) => e,
        _ => return None,
    };
    match runtime {
        RuntimeErr::SqlxError(e) => e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned()),
        _ => None,
    }
}

fn has_sqlstate(err: &DbErr, code: &str) -> bool {
    match sqlstate(err) {
        Some(actual) => actual == code,
        None => mentions_sqlstate(&err.to_string(), code),
    }
}

// Wrapped or re-raised errors only keep the code in their message.
fn mentions_sqlstate(msg: &str, code: &str) -> bool {
    msg.contains(&format!("SQLSTATE({code})")) || msg.contains(&format!("SQLSTATE {code}"))
}
