use chrono::Utc;
use district_types::models::{Account, NewAccount};
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::models::{ACCOUNT_COLUMNS, AccountRow, account_row};
use crate::{AccountStore, Database, StoreError};

impl AccountStore for Database {
    fn has_username(&self, username: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = ?1)",
                [username],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError> {
        self.with_conn(|conn| {
            let now = Utc::now();
            let sql = format!(
                "INSERT INTO accounts (id, username, email, first_name, last_name, password_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 RETURNING {ACCOUNT_COLUMNS}"
            );
            let row = conn
                .query_row(
                    &sql,
                    rusqlite::params![
                        account.id,
                        account.username,
                        account.email,
                        account.first_name,
                        account.last_name,
                        account.password_hash,
                        now,
                    ],
                    account_row,
                )
                .map_err(StoreError::from_account_insert)?;

            info!("Account {} created for {}", row.account.id, row.account.username);
            Ok(row.account)
        })
    }

    fn get_account(&self, id: &str) -> Result<Account, StoreError> {
        self.with_conn(|conn| {
            query_account(conn, "id = ?1", id)?
                .map(|row| row.account)
                .ok_or(StoreError::NotFound)
        })
    }

    fn find_by_username_or_email(&self, needle: &str) -> Result<Option<AccountRow>, StoreError> {
        self.with_conn(|conn| query_account(conn, "username = ?1 OR email = ?1", needle))
    }
}

fn query_account(
    conn: &Connection,
    predicate: &str,
    value: &str,
) -> Result<Option<AccountRow>, StoreError> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {predicate}");
    let row = conn.query_row(&sql, [value], account_row).optional()?;
    Ok(row)
}
