use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle states of a stock transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferStatus {
    Pending,
    InTransit,
    Completed,
    Cancelled,
    Rejected,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::InTransit => "in_transit",
            TransferStatus::Completed => "completed",
            TransferStatus::Cancelled => "cancelled",
            TransferStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransferStatus::Pending),
            "in_transit" => Some(TransferStatus::InTransit),
            "completed" => Some(TransferStatus::Completed),
            "cancelled" => Some(TransferStatus::Cancelled),
            "rejected" => Some(TransferStatus::Rejected),
            _ => None,
        }
    }

    /// Completed, Cancelled and Rejected accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Completed | TransferStatus::Cancelled | TransferStatus::Rejected
        )
    }

    /// A Pending or InTransit transfer holds its items reserved.
    pub fn is_open(&self) -> bool {
        matches!(self, TransferStatus::Pending | TransferStatus::InTransit)
    }

    /// The full transition table. Everything not listed here is an
    /// invalid operation.
    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        use TransferStatus::*;
        matches!(
            (*self, next),
            (Pending, InTransit)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (InTransit, Completed)
                | (InTransit, Cancelled)
        )
    }
}

/// What kind of relocation a transfer describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferType {
    Branch,
    Counter,
    Box,
    Mixed,
}

impl TransferType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferType::Branch => "branch",
            TransferType::Counter => "counter",
            TransferType::Box => "box",
            TransferType::Mixed => "mixed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "branch" => Some(TransferType::Branch),
            "counter" => Some(TransferType::Counter),
            "box" => Some(TransferType::Box),
            "mixed" => Some(TransferType::Mixed),
            _ => None,
        }
    }
}

/// Header row of a stock transfer.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub transfer_number: String,
    pub transfer_type: String,
    pub status: String,
    pub source_branch: String,
    pub source_counter: Option<String>,
    pub source_box: Option<String>,
    pub destination_branch: String,
    pub destination_counter: Option<String>,
    pub destination_box: Option<String>,
    pub requested_by: String,
    pub approved_by: Option<String>,
    pub completed_by: Option<String>,
    pub cancelled_by: Option<String>,
    pub rejected_by: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn status(&self) -> Option<TransferStatus> {
        TransferStatus::from_str(&self.status)
    }

    pub fn transfer_type(&self) -> Option<TransferType> {
        TransferType::from_str(&self.transfer_type)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transfer_item::Entity")]
    TransferItem,
}

impl Related<super::transfer_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransferItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for s in [
            TransferStatus::Pending,
            TransferStatus::InTransit,
            TransferStatus::Completed,
            TransferStatus::Cancelled,
            TransferStatus::Rejected,
        ] {
            assert_eq!(TransferStatus::from_str(s.as_str()), Some(s));
        }
        assert_eq!(TransferStatus::from_str("shipped"), None);
    }

    #[test]
    fn transition_table_is_exact() {
        use TransferStatus::*;
        let all = [Pending, InTransit, Completed, Cancelled, Rejected];
        let allowed = [
            (Pending, InTransit),
            (Pending, Rejected),
            (Pending, Cancelled),
            (InTransit, Completed),
            (InTransit, Cancelled),
        ];
        for from in all {
            for to in all {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn terminal_states_are_closed() {
        assert!(TransferStatus::Completed.is_terminal());
        assert!(TransferStatus::Cancelled.is_terminal());
        assert!(TransferStatus::Rejected.is_terminal());
        assert!(!TransferStatus::Pending.is_terminal());
        assert!(!TransferStatus::InTransit.is_terminal());
    }
}
