// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Gas Station
//!
//! This library provides a concurrent transaction engine for a gas station:
//! customers buy a volume of one fuel type at no more than a given unit price,
//! and each purchase is served in full by a single pump or rejected.
//!
//! ## Core Components
//!
//! - [`Station`]: Facade that runs purchases on a worker pool
//! - [`Pump`]: Dispenser with an atomically drained remaining volume
//! - [`PumpRegistry`]: First-fit allocation over pumps grouped by fuel type
//! - [`PriceBoard`]: Per-fuel-type unit prices
//! - [`Ledger`]: Lock-free revenue, sales and cancellation counters
//! - [`TransactionScheduler`]: Bounded-growth worker pool with blocking replies
//! - [`StationError`]: Error types for rejected or failed purchases
//!
//! ## Example
//!
//! ```
//! use gas_station_rs::{FuelType, Pump, Station, StationError};
//! use rust_decimal_macros::dec;
//!
//! let station = Station::new(4).unwrap();
//! station.add_gas_pump(Pump::new(FuelType::Regular, dec!(500)).unwrap());
//! station.set_price(FuelType::Regular, dec!(1.50)).unwrap();
//!
//! // Charged at the customer's stated maximum by default
//! let cost = station.buy_gas(FuelType::Regular, dec!(100), dec!(2.00)).unwrap();
//! assert_eq!(cost, dec!(200.00));
//!
//! let result = station.buy_gas(FuelType::Regular, dec!(100), dec!(1.00));
//! assert_eq!(result, Err(StationError::TooExpensive));
//!
//! assert_eq!(station.number_of_sales(), 1);
//! assert_eq!(station.number_of_cancellations_too_expensive(), 1);
//! ```
//!
//! ## Thread Safety
//!
//! Each pump guards its own volume; nothing else is locked while a purchase
//! runs, so purchases of different fuel types proceed fully in parallel.

mod base;
pub mod config;
pub mod error;
pub mod ledger;
mod price_board;
pub mod pump;
mod registry;
mod scheduler;
pub mod settlement;
mod station;

pub use base::{FuelType, PumpId};
pub use config::StationConfig;
pub use error::{ParseFuelTypeError, StationError};
pub use ledger::{Ledger, LedgerSnapshot};
pub use price_board::PriceBoard;
pub use pump::{Pump, PumpSnapshot};
pub use registry::{Allocation, PumpRegistry};
pub use scheduler::TransactionScheduler;
pub use settlement::{Cost, SettlementPolicy};
pub use station::{BuyRequest, Station};
