use chrono::{DateTime, Utc};
use tracing::info;

use district_db::{CampaignStore, StoreError};
use district_types::api::CreateCampaignRequest;
use district_types::models::{Campaign, CampaignDiff, Identity, NewCampaign};

use crate::error::ApiError;
use crate::middleware::OwnedCampaign;

const MAX_NAME_LEN: usize = 200;

/// Validates campaign mutations and hands them to the store's atomic
/// operations. Methods block on storage; call them from `run_blocking`.
pub struct MutationCoordinator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> MutationCoordinator<'a, S>
where
    S: CampaignStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn create(
        &self,
        creator: &Identity,
        req: CreateCampaignRequest,
        now: DateTime<Utc>,
    ) -> Result<Campaign, ApiError> {
        let name = req.name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(ApiError::ValidationFailed(format!(
                "name must be between 1 and {MAX_NAME_LEN} characters"
            )));
        }
        validate_goal(req.goal)?;
        validate_deadline(req.deadline, now)?;

        let campaign = self.store.create_campaign(&NewCampaign {
            creator_id: creator.subject.clone(),
            name: name.to_string(),
            description: req.description,
            goal: req.goal,
            deadline: req.deadline,
        })?;
        Ok(campaign)
    }

    /// Applies only the fields present in `diff`, recording the previous
    /// values in the campaign's edit history.
    pub fn update(
        &self,
        target: &OwnedCampaign,
        diff: CampaignDiff,
        now: DateTime<Utc>,
    ) -> Result<Campaign, ApiError> {
        if diff.is_empty() {
            return Err(ApiError::ValidationFailed(
                "update must change at least one of description, goal, deadline".into(),
            ));
        }
        if let Some(goal) = diff.goal {
            validate_goal(goal)?;
        }
        if let Some(deadline) = diff.deadline {
            validate_deadline(deadline, now)?;
        }

        let campaign = target.campaign();
        if campaign.archived {
            return Err(StoreError::Archived.into());
        }

        // The store re-reads and re-checks inside its transaction
        let updated = self.store.update_with_history(campaign.id, &diff)?;

        info!(
            campaign_id = updated.id,
            fields = ?diff.fields(),
            "Campaign {} edited by {}",
            updated.id,
            target.identity().subject
        );
        Ok(updated)
    }

    /// One-way. Collected funds stay where they are.
    pub fn archive(&self, target: &OwnedCampaign) -> Result<Campaign, ApiError> {
        let campaign = target.campaign();
        if campaign.archived {
            return Err(StoreError::AlreadyArchived.into());
        }

        let archived = self.store.archive_campaign(campaign.id)?;

        info!("Campaign {} archived by {}", archived.id, target.identity().subject);
        Ok(archived)
    }

    pub fn donate(
        &self,
        donor: &Identity,
        campaign_id: i64,
        amount: i64,
    ) -> Result<Campaign, ApiError> {
        if amount <= 0 {
            return Err(ApiError::ValidationFailed(
                "donation amount must be positive".into(),
            ));
        }

        let updated = self.store.record_donation(campaign_id, &donor.subject, amount)?;

        info!(
            "Donation of {} to campaign {} by {} (total {})",
            amount, campaign_id, donor.subject, updated.current_amount
        );
        Ok(updated)
    }
}

fn validate_goal(goal: i64) -> Result<(), ApiError> {
    if goal <= 0 {
        return Err(ApiError::ValidationFailed("goal must be positive".into()));
    }
    Ok(())
}

fn validate_deadline(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), ApiError> {
    if deadline <= now {
        return Err(ApiError::ValidationFailed(
            "deadline must be in the future".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{authorize, found};
    use chrono::Duration;
    use district_db::Database;

    fn identity(subject: &str) -> Identity {
        let now = Utc::now();
        Identity {
            subject: subject.into(),
            issued_at: now,
            expires_at: now + Duration::hours(24),
        }
    }

    fn setup() -> (Database, Identity, Campaign) {
        let db = Database::open_in_memory().unwrap();
        let alice = identity("alice");
        let now = Utc::now();
        let campaign = MutationCoordinator::new(&db)
            .create(
                &alice,
                CreateCampaignRequest {
                    name: "  Playground  ".into(),
                    description: "New swings".into(),
                    goal: 1000,
                    deadline: now + Duration::days(30),
                },
                now,
            )
            .unwrap();
        (db, alice, campaign)
    }

    fn owned(db: &Database, who: &Identity, id: i64) -> OwnedCampaign {
        authorize(who, &found(db.get_campaign(id).unwrap())).unwrap()
    }

    #[test]
    fn create_validates_and_trims() {
        let (db, alice, campaign) = setup();
        assert_eq!(campaign.name, "Playground");
        assert_eq!(campaign.creator_id, "alice");

        let now = Utc::now();
        let coordinator = MutationCoordinator::new(&db);
        let bad = |goal: i64, deadline: DateTime<Utc>, name: &str| CreateCampaignRequest {
            name: name.into(),
            description: String::new(),
            goal,
            deadline,
        };

        for req in [
            bad(0, now + Duration::days(1), "x"),
            bad(10, now - Duration::days(1), "x"),
            bad(10, now + Duration::days(1), "   "),
        ] {
            assert!(matches!(
                coordinator.create(&alice, req, now),
                Err(ApiError::ValidationFailed(_))
            ));
        }
    }

    #[test]
    fn empty_diff_is_rejected_without_history() {
        let (db, alice, campaign) = setup();
        let target = owned(&db, &alice, campaign.id);

        let result = MutationCoordinator::new(&db).update(&target, CampaignDiff::default(), Utc::now());
        assert!(matches!(result, Err(ApiError::ValidationFailed(_))));
        assert!(db.edit_history(campaign.id).unwrap().is_empty());
    }

    #[test]
    fn update_changes_only_present_fields() {
        let (db, alice, campaign) = setup();
        let target = owned(&db, &alice, campaign.id);

        let diff = CampaignDiff {
            description: Some("Swings and a slide".into()),
            ..Default::default()
        };
        let updated = MutationCoordinator::new(&db)
            .update(&target, diff, Utc::now())
            .unwrap();

        assert_eq!(updated.description, "Swings and a slide");
        assert_eq!(updated.goal, campaign.goal);
        assert_eq!(updated.deadline, campaign.deadline);

        let history = db.edit_history(campaign.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].description, "New swings");
    }

    #[test]
    fn invalid_goal_or_deadline_is_rejected() {
        let (db, alice, campaign) = setup();
        let target = owned(&db, &alice, campaign.id);
        let coordinator = MutationCoordinator::new(&db);
        let now = Utc::now();

        let negative = CampaignDiff {
            goal: Some(-1),
            ..Default::default()
        };
        let past = CampaignDiff {
            deadline: Some(now - Duration::seconds(1)),
            ..Default::default()
        };
        assert!(matches!(
            coordinator.update(&target, negative, now),
            Err(ApiError::ValidationFailed(_))
        ));
        assert!(matches!(
            coordinator.update(&target, past, now),
            Err(ApiError::ValidationFailed(_))
        ));
        assert!(db.edit_history(campaign.id).unwrap().is_empty());
    }

    #[test]
    fn archive_is_one_way() {
        let (db, alice, campaign) = setup();
        let coordinator = MutationCoordinator::new(&db);

        let archived = coordinator.archive(&owned(&db, &alice, campaign.id)).unwrap();
        assert!(archived.archived);

        // A fresh guard snapshot sees the flag
        let target = owned(&db, &alice, campaign.id);
        assert!(matches!(coordinator.archive(&target), Err(ApiError::Conflict(_))));

        let diff = CampaignDiff {
            goal: Some(5000),
            ..Default::default()
        };
        assert!(matches!(
            coordinator.update(&target, diff, Utc::now()),
            Err(ApiError::Conflict(_))
        ));
        assert!(db.edit_history(campaign.id).unwrap().is_empty());
    }

    #[test]
    fn stale_snapshot_still_hits_the_store_check() {
        let (db, alice, campaign) = setup();
        let coordinator = MutationCoordinator::new(&db);

        // Snapshot taken before another request archives the campaign
        let stale = owned(&db, &alice, campaign.id);
        db.archive_campaign(campaign.id).unwrap();

        let diff = CampaignDiff {
            goal: Some(5000),
            ..Default::default()
        };
        assert!(matches!(
            coordinator.update(&stale, diff, Utc::now()),
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(coordinator.archive(&stale), Err(ApiError::Conflict(_))));
        assert!(db.edit_history(campaign.id).unwrap().is_empty());
    }

    #[test]
    fn donations_accumulate() {
        let (db, _alice, campaign) = setup();
        let bob = identity("bob");
        let coordinator = MutationCoordinator::new(&db);

        assert_eq!(coordinator.donate(&bob, campaign.id, 300).unwrap().current_amount, 300);
        assert_eq!(coordinator.donate(&bob, campaign.id, 200).unwrap().current_amount, 500);
        assert!(matches!(
            coordinator.donate(&bob, campaign.id, 0),
            Err(ApiError::ValidationFailed(_))
        ));
        assert!(matches!(
            coordinator.donate(&bob, 999, 10),
            Err(ApiError::NotFound(_))
        ));
    }
}
