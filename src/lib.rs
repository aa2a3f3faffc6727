//! Gemtrack Inventory Core
//!
//! Movement ledger, daily balance reconciliation, and stock transfer
//! state machine for RFID-tagged retail jewelry inventory. Every call is
//! parameterized by a [`tenant::TenantContext`], so one process serves
//! many isolated client stores.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod migrator;
pub mod services;
pub mod tenant;

use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::events::{Event, EventSender};
use crate::services::balances::BalanceService;
use crate::services::movements::MovementService;
use crate::services::stock::StockService;
use crate::services::transfers::TransferService;

/// The wired service layer: the crate's public API surface.
///
/// One instance serves every tenant; per-call routing happens through the
/// `TenantContext` argument on each operation.
#[derive(Clone)]
pub struct AppServices {
    pub config: AppConfig,
    pub event_sender: EventSender,
    pub movements: MovementService,
    pub balances: BalanceService,
    pub stock: StockService,
    pub transfers: TransferService,
}

impl AppServices {
    /// Builds the service set and the event stream receiver the embedder
    /// drains (reporting, notifications, audit sinks).
    pub fn build(config: AppConfig) -> (Self, mpsc::Receiver<Event>) {
        let (event_sender, receiver) = events::channel(config.event_channel_capacity);

        let stock = StockService::new();
        let services = Self {
            movements: MovementService::new(event_sender.clone(), config.bulk_max_items),
            balances: BalanceService::new(event_sender.clone(), config.recalc_max_days),
            stock: stock.clone(),
            transfers: TransferService::new(event_sender.clone(), stock, config.bulk_max_items),
            event_sender,
            config,
        };

        (services, receiver)
    }
}
