//! Database row types and their column mappings.
//! Rows that carry secrets stay in this crate's types, never in district-types.

use district_types::models::{Account, Campaign, CampaignEditHistory};
use rusqlite::Row;

pub struct AccountRow {
    pub account: Account,
    pub password_hash: String,
}

pub(crate) const ACCOUNT_COLUMNS: &str =
    "id, username, email, first_name, last_name, created_at, updated_at, password_hash";

pub(crate) const CAMPAIGN_COLUMNS: &str = "id, creator_id, name, description, goal, current_amount, deadline, archived, created_at, updated_at";

pub(crate) const HISTORY_COLUMNS: &str =
    "id, campaign_id, description, goal, current_amount, deadline, modified_at";

pub(crate) fn account_row(row: &Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        account: Account {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        },
        password_hash: row.get(7)?,
    })
}

pub(crate) fn campaign_row(row: &Row<'_>) -> rusqlite::Result<Campaign> {
    Ok(Campaign {
        id: row.get(0)?,
        creator_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        goal: row.get(4)?,
        current_amount: row.get(5)?,
        deadline: row.get(6)?,
        archived: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub(crate) fn history_row(row: &Row<'_>) -> rusqlite::Result<CampaignEditHistory> {
    Ok(CampaignEditHistory {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        description: row.get(2)?,
        goal: row.get(3)?,
        current_amount: row.get(4)?,
        deadline: row.get(5)?,
        modified_at: row.get(6)?,
    })
}
