//! Capability traits over the persistence backend. `Database` is the one
//! implementation; handlers and the mutation coordinator only see these.

use district_types::models::{
    Account, Campaign, CampaignDiff, CampaignEditHistory, NewAccount, NewCampaign,
};

use crate::StoreError;
use crate::models::AccountRow;

pub trait AccountStore: Send + Sync {
    fn has_username(&self, username: &str) -> Result<bool, StoreError>;

    /// Fails with `DuplicateAccount` when the username or email is taken.
    fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError>;

    fn get_account(&self, id: &str) -> Result<Account, StoreError>;

    /// Includes the stored credential hash, for sign-in only.
    fn find_by_username_or_email(&self, needle: &str) -> Result<Option<AccountRow>, StoreError>;
}

pub trait CampaignStore: Send + Sync {
    fn get_campaign(&self, id: i64) -> Result<Campaign, StoreError>;

    /// Inserts a fresh, unarchived campaign with nothing collected and
    /// returns it with its id assigned.
    fn create_campaign(&self, campaign: &NewCampaign) -> Result<Campaign, StoreError>;

    /// Within one transaction: re-reads the campaign, rejects archived ones,
    /// appends a history row with the pre-edit values and writes the diff.
    /// Either both writes commit or neither does.
    fn update_with_history(&self, id: i64, diff: &CampaignDiff) -> Result<Campaign, StoreError>;

    /// One-way transition; fails with `AlreadyArchived` the second time.
    fn archive_campaign(&self, id: i64) -> Result<Campaign, StoreError>;

    /// Records a donation and raises `current_amount` in the same transaction.
    fn record_donation(&self, id: i64, account_id: &str, amount: i64)
    -> Result<Campaign, StoreError>;

    /// Oldest first.
    fn edit_history(&self, id: i64) -> Result<Vec<CampaignEditHistory>, StoreError>;
}
