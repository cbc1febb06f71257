use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A verified claim of an account id, derived from a bearer token.
/// Produced once per request by the token codec and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// A funding campaign. `current_amount` only ever grows, and only through
/// donations; `archived` flips to true once and stays there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: i64,
    pub creator_id: String,
    pub name: String,
    pub description: String,
    pub goal: i64,
    pub current_amount: i64,
    pub deadline: DateTime<Utc>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn is_owned_by(&self, subject: &str) -> bool {
        self.creator_id == subject
    }
}

#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub creator_id: String,
    pub name: String,
    pub description: String,
    pub goal: i64,
    pub deadline: DateTime<Utc>,
}

/// Snapshot of a campaign's editable fields taken right before an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignEditHistory {
    pub id: i64,
    pub campaign_id: i64,
    pub description: String,
    pub goal: i64,
    pub current_amount: i64,
    pub deadline: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Sparse set of field changes for a campaign edit.
/// `None` means "leave untouched", never "reset".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignDiff {
    pub description: Option<String>,
    pub goal: Option<i64>,
    pub deadline: Option<DateTime<Utc>>,
}

impl CampaignDiff {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.goal.is_none() && self.deadline.is_none()
    }

    /// Names of the fields this diff touches, in declaration order.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::with_capacity(3);
        if self.description.is_some() {
            fields.push("description");
        }
        if self.goal.is_some() {
            fields.push("goal");
        }
        if self.deadline.is_some() {
            fields.push("deadline");
        }
        fields
    }

    /// Returns `current` with the present fields overwritten.
    pub fn apply(&self, current: &Campaign) -> Campaign {
        let mut next = current.clone();
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(goal) = self.goal {
            next.goal = goal;
        }
        if let Some(deadline) = self.deadline {
            next.deadline = deadline;
        }
        next
    }
}
