use chrono::Utc;
use district_types::models::{Campaign, CampaignDiff, CampaignEditHistory, NewCampaign};
use rusqlite::{Connection, TransactionBehavior};
use tracing::info;

use crate::models::{CAMPAIGN_COLUMNS, HISTORY_COLUMNS, campaign_row, history_row};
use crate::{CampaignStore, Database, StoreError};

impl CampaignStore for Database {
    fn get_campaign(&self, id: i64) -> Result<Campaign, StoreError> {
        self.with_conn(|conn| select_campaign(conn, id))
    }

    fn create_campaign(&self, campaign: &NewCampaign) -> Result<Campaign, StoreError> {
        self.with_conn(|conn| {
            let now = Utc::now();
            let sql = format!(
                "INSERT INTO campaigns (creator_id, name, description, goal, deadline, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 RETURNING {CAMPAIGN_COLUMNS}"
            );
            let created = conn.query_row(
                &sql,
                rusqlite::params![
                    campaign.creator_id,
                    campaign.name,
                    campaign.description,
                    campaign.goal,
                    campaign.deadline,
                    now,
                ],
                campaign_row,
            )?;

            info!("Campaign {} created by {}", created.id, created.creator_id);
            Ok(created)
        })
    }

    fn update_with_history(&self, id: i64, diff: &CampaignDiff) -> Result<Campaign, StoreError> {
        self.with_conn_mut(|conn| {
            // IMMEDIATE takes the write lock up front, so the re-read below
            // cannot be invalidated before commit.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let current = select_campaign(&tx, id)?;
            if current.archived {
                return Err(StoreError::Archived);
            }

            let now = Utc::now();
            tx.execute(
                "INSERT INTO campaign_edit_history (campaign_id, description, goal, current_amount, deadline, modified_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    current.id,
                    current.description,
                    current.goal,
                    current.current_amount,
                    current.deadline,
                    now,
                ],
            )?;

            let next = diff.apply(&current);
            let sql = format!(
                "UPDATE campaigns SET description = ?1, goal = ?2, deadline = ?3, updated_at = ?4
                 WHERE id = ?5
                 RETURNING {CAMPAIGN_COLUMNS}"
            );
            let updated = tx.query_row(
                &sql,
                rusqlite::params![next.description, next.goal, next.deadline, now, id],
                campaign_row,
            )?;

            tx.commit()?;
            Ok(updated)
        })
    }

    fn archive_campaign(&self, id: i64) -> Result<Campaign, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let current = select_campaign(&tx, id)?;
            if current.archived {
                return Err(StoreError::AlreadyArchived);
            }

            let sql = format!(
                "UPDATE campaigns SET archived = 1, updated_at = ?1
                 WHERE id = ?2
                 RETURNING {CAMPAIGN_COLUMNS}"
            );
            let archived = tx.query_row(&sql, rusqlite::params![Utc::now(), id], campaign_row)?;

            tx.commit()?;
            Ok(archived)
        })
    }

    fn record_donation(
        &self,
        id: i64,
        account_id: &str,
        amount: i64,
    ) -> Result<Campaign, StoreError> {
        if amount <= 0 {
            return Err(StoreError::InvalidAmount);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let current = select_campaign(&tx, id)?;
            if current.archived {
                return Err(StoreError::Archived);
            }
            let total = current
                .current_amount
                .checked_add(amount)
                .ok_or(StoreError::InvalidAmount)?;

            let now = Utc::now();
            tx.execute(
                "INSERT INTO campaign_donations (campaign_id, account_id, amount, donated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, account_id, amount, now],
            )?;

            let sql = format!(
                "UPDATE campaigns SET current_amount = ?1, updated_at = ?2
                 WHERE id = ?3
                 RETURNING {CAMPAIGN_COLUMNS}"
            );
            let updated = tx.query_row(&sql, rusqlite::params![total, now, id], campaign_row)?;

            tx.commit()?;
            Ok(updated)
        })
    }

    fn edit_history(&self, id: i64) -> Result<Vec<CampaignEditHistory>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {HISTORY_COLUMNS} FROM campaign_edit_history
                 WHERE campaign_id = ?1
                 ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([id], history_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn select_campaign(conn: &Connection, id: i64) -> Result<Campaign, StoreError> {
    let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1");
    // QueryReturnedNoRows converts to StoreError::NotFound
    let campaign = conn.query_row(&sql, [id], campaign_row)?;
    Ok(campaign)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, DurationRound};
    use std::sync::Arc;
    use std::thread;

    fn new_campaign(db: &Database) -> Campaign {
        // Whole seconds keep equality checks independent of text precision
        let deadline = (Utc::now() + Duration::days(30))
            .duration_trunc(Duration::seconds(1))
            .unwrap();
        db.create_campaign(&NewCampaign {
            creator_id: "alice".into(),
            name: "Playground".into(),
            description: "New swings".into(),
            goal: 1000,
            deadline,
        })
        .unwrap()
    }

    #[test]
    fn create_assigns_id_and_defaults() {
        let db = Database::open_in_memory().unwrap();
        let c = new_campaign(&db);
        assert_eq!(c.id, 1);
        assert_eq!(c.current_amount, 0);
        assert!(!c.archived);
        assert_eq!(db.get_campaign(1).unwrap(), c);
        assert!(matches!(db.get_campaign(2), Err(StoreError::NotFound)));
    }

    #[test]
    fn update_writes_one_history_row_with_pre_edit_values() {
        let db = Database::open_in_memory().unwrap();
        let before = new_campaign(&db);

        let diff = CampaignDiff {
            goal: Some(2000),
            ..Default::default()
        };
        let after = db.update_with_history(before.id, &diff).unwrap();
        assert_eq!(after.goal, 2000);
        assert_eq!(after.description, before.description);

        let history = db.edit_history(before.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].campaign_id, before.id);
        assert_eq!(history[0].goal, 1000);
        assert_eq!(history[0].description, before.description);
        assert_eq!(history[0].deadline, before.deadline);
        assert_eq!(history[0].current_amount, 0);
    }

    #[test]
    fn update_missing_campaign_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let diff = CampaignDiff {
            goal: Some(5),
            ..Default::default()
        };
        assert!(matches!(
            db.update_with_history(42, &diff),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn failed_update_leaves_no_history_behind() {
        let db = Database::open_in_memory().unwrap();
        let c = new_campaign(&db);

        // goal > 0 is a table constraint, so the UPDATE fails after the
        // history INSERT already ran inside the transaction.
        let diff = CampaignDiff {
            goal: Some(-5),
            ..Default::default()
        };
        assert!(matches!(
            db.update_with_history(c.id, &diff),
            Err(StoreError::Backend(_))
        ));

        assert!(db.edit_history(c.id).unwrap().is_empty());
        assert_eq!(db.get_campaign(c.id).unwrap(), c);
    }

    #[test]
    fn archived_campaign_rejects_edits_and_second_archive() {
        let db = Database::open_in_memory().unwrap();
        let c = new_campaign(&db);

        let archived = db.archive_campaign(c.id).unwrap();
        assert!(archived.archived);

        let diff = CampaignDiff {
            description: Some("changed".into()),
            ..Default::default()
        };
        assert!(matches!(
            db.update_with_history(c.id, &diff),
            Err(StoreError::Archived)
        ));
        assert!(matches!(
            db.archive_campaign(c.id),
            Err(StoreError::AlreadyArchived)
        ));
        assert!(matches!(
            db.record_donation(c.id, "bob", 10),
            Err(StoreError::Archived)
        ));

        assert!(db.edit_history(c.id).unwrap().is_empty());
        assert_eq!(db.get_campaign(c.id).unwrap(), archived);
    }

    #[test]
    fn donations_only_raise_the_collected_amount() {
        let db = Database::open_in_memory().unwrap();
        let c = new_campaign(&db);

        assert_eq!(db.record_donation(c.id, "bob", 150).unwrap().current_amount, 150);
        assert_eq!(db.record_donation(c.id, "carol", 50).unwrap().current_amount, 200);

        assert!(matches!(
            db.record_donation(c.id, "bob", 0),
            Err(StoreError::InvalidAmount)
        ));
        assert!(matches!(
            db.record_donation(c.id, "bob", -10),
            Err(StoreError::InvalidAmount)
        ));
        assert!(matches!(
            db.record_donation(c.id, "bob", i64::MAX),
            Err(StoreError::InvalidAmount)
        ));
        assert_eq!(db.get_campaign(c.id).unwrap().current_amount, 200);

        // Donations are not edits
        assert!(db.edit_history(c.id).unwrap().is_empty());
    }

    #[test]
    fn concurrent_updates_keep_history_and_state_consistent() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let id = new_campaign(&db).id;

        let handles: Vec<_> = (1..=8)
            .map(|i| {
                let db = db.clone();
                thread::spawn(move || {
                    let diff = CampaignDiff {
                        goal: Some(1000 + i),
                        ..Default::default()
                    };
                    db.update_with_history(id, &diff).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let history = db.edit_history(id).unwrap();
        assert_eq!(history.len(), 8);

        // Every value ever held appears exactly once: seven overwritten
        // edits plus the initial goal in history, and the last edit as state.
        let mut seen: Vec<i64> = history.iter().map(|h| h.goal).collect();
        seen.push(db.get_campaign(id).unwrap().goal);
        seen.sort_unstable();
        let expected: Vec<i64> = (0..=8).map(|i| 1000 + i).collect();
        assert_eq!(seen, expected);
    }
}
