//! User repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Rows are keyed by normalized (trimmed, lower-cased) email.
//! - `upsert` overwrites the whole profile (last write wins).

use crate::model::user::{normalize_email, User, UserRole};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const USER_SELECT_SQL: &str = "SELECT
    email,
    name,
    surname,
    password,
    rut,
    address,
    phone,
    role,
    created_at
FROM users";

/// Repository interface for cached profiles.
pub trait UserRepository {
    fn upsert(&self, user: &User) -> RepoResult<()>;
    fn get(&self, email: &str) -> RepoResult<Option<User>>;
    fn list_all(&self) -> RepoResult<Vec<User>>;
    fn update_role(&self, email: &str, role: UserRole) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn upsert(&self, user: &User) -> RepoResult<()> {
        user.validate()?;

        self.conn.execute(
            "INSERT INTO users (
                email, name, surname, password, rut, address, phone, role, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(email) DO UPDATE SET
                name = excluded.name,
                surname = excluded.surname,
                password = excluded.password,
                rut = excluded.rut,
                address = excluded.address,
                phone = excluded.phone,
                role = excluded.role,
                created_at = COALESCE(users.created_at, excluded.created_at);",
            params![
                normalize_email(&user.email),
                user.name,
                user.surname,
                user.password,
                user.rut,
                user.address,
                user.phone,
                user.role.as_str(),
                user.created_at,
            ],
        )?;
        Ok(())
    }

    fn get(&self, email: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([normalize_email(email)])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_all(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY email ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn update_role(&self, email: &str, role: UserRole) -> RepoResult<()> {
        let key = normalize_email(email);
        let changed = self.conn.execute(
            "UPDATE users SET role = ?1 WHERE email = ?2;",
            params![role.as_str(), key],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("user", key));
        }
        Ok(())
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let role_text: String = row.get("role")?;
    let role = UserRole::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;

    Ok(User {
        email: row.get("email")?,
        name: row.get("name")?,
        surname: row.get("surname")?,
        password: row.get("password")?,
        rut: row.get("rut")?,
        address: row.get("address")?,
        phone: row.get("phone")?,
        role,
        created_at: row.get("created_at")?,
    })
}
