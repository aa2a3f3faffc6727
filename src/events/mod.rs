use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

/// Domain events emitted by the inventory core.
///
/// Events are a secondary effect: they carry identifiers for downstream
/// consumers (reporting, notifications), never state the ledger depends on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    MovementRecorded {
        movement_id: Uuid,
        product_id: Uuid,
        movement_type: String,
        quantity: i32,
        total_amount: Decimal,
        branch_code: String,
    },
    DailyBalanceCalculated {
        product_id: Uuid,
        balance_date: NaiveDate,
        closing_quantity: i32,
        closing_value: Decimal,
    },
    BalancesRecalculated {
        from: NaiveDate,
        to: NaiveDate,
        products_processed: u64,
        failures: u64,
    },
    TransferCreated {
        transfer_id: Uuid,
        transfer_number: String,
    },
    TransferApproved {
        transfer_id: Uuid,
    },
    TransferRejected {
        transfer_id: Uuid,
        reason: Option<String>,
    },
    TransferCompleted {
        transfer_id: Uuid,
        completed_at: DateTime<Utc>,
    },
    TransferCancelled {
        transfer_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publishes an event without letting a delivery failure surface.
    ///
    /// Event delivery is bookkeeping relative to the ledger write that
    /// precedes it, so a full channel or dropped receiver is logged and
    /// swallowed rather than rolling back the primary operation.
    pub async fn publish_best_effort(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Event publication failed; continuing");
        }
    }
}

/// Builds an event channel pair with the given capacity.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}
