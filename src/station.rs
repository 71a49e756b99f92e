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

//! Gas station facade.
//!
//! The [`Station`] owns the pumps, the price board and the ledger, and runs
//! every purchase as a task on its [`TransactionScheduler`].
//!
//! # Purchase Processing
//!
//! 1. **Price gate**: the board price is read once. A maximum below it is
//!    rejected as too expensive; an equal maximum passes.
//! 2. **Allocation**: the first pump of the requested type still holding the
//!    full volume is drained by that volume.
//! 3. **Settlement**: the cost is booked in the ledger while the chosen pump
//!    is still locked, then returned. A cost that would overflow the revenue
//!    total fails the purchase before any fuel leaves the pump.
//!
//! # Thread Safety
//!
//! The only lock taken during a purchase is the chosen pump's own. Prices
//! live in a [`DashMap`](dashmap::DashMap) and the ledger is a set of atomics,
//! so purchases of different fuel types never contend.

use crate::base::{FuelType, PumpId};
use crate::config::StationConfig;
use crate::ledger::{Ledger, LedgerSnapshot};
use crate::price_board::PriceBoard;
use crate::pump::{Pump, PumpSnapshot};
use crate::registry::PumpRegistry;
use crate::scheduler::TransactionScheduler;
use crate::settlement::{Cost, SettlementPolicy};
use crate::StationError;
use log::debug;
use rust_decimal::Decimal;
use std::sync::Arc;

/// A validated purchase request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyRequest {
    fuel_type: FuelType,
    amount: Decimal,
    max_unit_price: Decimal,
}

impl BuyRequest {
    /// # Errors
    ///
    /// - [`StationError::InvalidAmount`] - `amount` is zero or negative.
    /// - [`StationError::InvalidPrice`] - `max_unit_price` is negative.
    /// - [`StationError::CostOverflow`] - the cost at `max_unit_price` does not fit.
    pub fn new(
        fuel_type: FuelType,
        amount: Decimal,
        max_unit_price: Decimal,
    ) -> Result<Self, StationError> {
        if amount <= Decimal::ZERO {
            return Err(StationError::InvalidAmount);
        }
        if max_unit_price < Decimal::ZERO {
            return Err(StationError::InvalidPrice);
        }
        // Any charged unit price is at most the maximum, so this bounds every settlement.
        Cost::for_purchase(max_unit_price, amount)?;
        Ok(Self {
            fuel_type,
            amount,
            max_unit_price,
        })
    }

    pub fn fuel_type(&self) -> FuelType {
        self.fuel_type
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn max_unit_price(&self) -> Decimal {
        self.max_unit_price
    }
}

/// State shared between the facade and its worker tasks.
#[derive(Debug)]
struct StationCore {
    pumps: PumpRegistry,
    prices: PriceBoard,
    ledger: Ledger,
    settlement: SettlementPolicy,
}

impl StationCore {
    /// Runs one purchase to completion on the calling worker.
    fn transact(&self, request: BuyRequest) -> Result<Decimal, StationError> {
        let BuyRequest {
            fuel_type,
            amount,
            max_unit_price,
        } = request;

        let board_price = self.prices.get(fuel_type);
        if max_unit_price < board_price {
            self.ledger.record_too_expensive();
            debug!(
                "Rejected {} L of {}: max {} below board price {}",
                amount, fuel_type, max_unit_price, board_price
            );
            return Err(StationError::TooExpensive);
        }

        // Priced before allocation so a failure here leaves every pump untouched.
        let unit_price = self.settlement.unit_price(max_unit_price, board_price);
        let cost = Cost::for_purchase(unit_price, amount)?;

        // Booked inside the pump's critical section: a sale the ledger cannot
        // hold fails with CostOverflow and dispenses nothing.
        match self
            .pumps
            .allocate_with(fuel_type, amount, || self.ledger.record_sale(cost))
        {
            Ok(allocation) => {
                debug!(
                    "Sold {} L of {} from pump {} for {} ({} L left)",
                    amount,
                    fuel_type,
                    allocation.pump_id,
                    cost.to_decimal(),
                    allocation.remaining
                );
                Ok(cost.to_decimal())
            }
            Err(StationError::NotEnoughGas) => {
                self.ledger.record_no_gas();
                debug!("Rejected {} L of {}: no pump holds enough", amount, fuel_type);
                Err(StationError::NotEnoughGas)
            }
            Err(e) => Err(e),
        }
    }
}

/// Gas station serving concurrent purchases.
///
/// # Invariants
///
/// - `sales + no-gas cancellations + too-expensive cancellations` equals the
///   number of purchases that finished with a business outcome.
/// - Revenue never decreases and no pump's remaining volume goes negative.
/// - A rejected purchase changes no pump.
#[derive(Debug)]
pub struct Station {
    core: Arc<StationCore>,
    scheduler: TransactionScheduler,
}

impl Station {
    /// Creates a station with `workers` core transaction workers.
    ///
    /// # Errors
    ///
    /// See [`Station::with_config`].
    pub fn new(workers: usize) -> Result<Self, StationError> {
        Self::with_config(StationConfig::new(workers))
    }

    /// Creates a station and registers `pumps` in iteration order.
    pub fn with_pumps(
        workers: usize,
        pumps: impl IntoIterator<Item = Pump>,
    ) -> Result<Self, StationError> {
        let station = Self::new(workers)?;
        for pump in pumps {
            station.add_gas_pump(pump);
        }
        Ok(station)
    }

    /// # Errors
    ///
    /// - [`StationError::InvalidWorkerCount`] - `config.workers` is zero.
    /// - [`StationError::WorkerSpawn`] - a worker thread could not be started.
    pub fn with_config(config: StationConfig) -> Result<Self, StationError> {
        config.validate()?;
        let scheduler = TransactionScheduler::new(config.workers)?;
        debug!("Station settles purchases at the {} price", config.settlement);
        Ok(Self {
            core: Arc::new(StationCore {
                pumps: PumpRegistry::new(),
                prices: PriceBoard::new(),
                ledger: Ledger::new(),
                settlement: config.settlement,
            }),
            scheduler,
        })
    }

    /// Registers a pump; it is offered after every pump added before it.
    pub fn add_gas_pump(&self, pump: Pump) -> PumpId {
        self.core.pumps.add(pump)
    }

    /// Read-only copies of every pump, in registration order.
    pub fn gas_pumps(&self) -> Vec<PumpSnapshot> {
        self.core.pumps.snapshot()
    }

    /// Buys `amount` liters of `fuel_type` at no more than `max_unit_price`.
    ///
    /// Blocks until a worker has run the purchase. Returns the charged cost.
    ///
    /// # Errors
    ///
    /// - [`StationError::TooExpensive`] - `max_unit_price` is below the board price.
    /// - [`StationError::NotEnoughGas`] - no single pump holds `amount`.
    /// - [`StationError::InvalidAmount`] / [`StationError::InvalidPrice`] /
    ///   [`StationError::CostOverflow`] - the request was malformed and never ran.
    /// - [`StationError::CostOverflow`] - revenue could not absorb this sale;
    ///   no fuel was dispensed and nothing was counted.
    /// - [`StationError::TaskPanicked`] / [`StationError::SchedulerClosed`] -
    ///   the purchase did not complete and was not counted.
    pub fn buy_gas(
        &self,
        fuel_type: FuelType,
        amount: Decimal,
        max_unit_price: Decimal,
    ) -> Result<Decimal, StationError> {
        self.buy(BuyRequest::new(fuel_type, amount, max_unit_price)?)
    }

    /// Runs an already validated request. See [`Station::buy_gas`].
    pub fn buy(&self, request: BuyRequest) -> Result<Decimal, StationError> {
        let core = Arc::clone(&self.core);
        self.scheduler.execute(move || core.transact(request))?
    }

    pub fn revenue(&self) -> Decimal {
        self.core.ledger.revenue()
    }

    pub fn number_of_sales(&self) -> u64 {
        self.core.ledger.sales()
    }

    pub fn number_of_cancellations_no_gas(&self) -> u64 {
        self.core.ledger.cancellations_no_gas()
    }

    pub fn number_of_cancellations_too_expensive(&self) -> u64 {
        self.core.ledger.cancellations_too_expensive()
    }

    /// All ledger counters at once (each read individually).
    pub fn ledger(&self) -> LedgerSnapshot {
        self.core.ledger.snapshot()
    }

    /// Board price for `fuel_type`; zero if never set.
    pub fn price(&self, fuel_type: FuelType) -> Decimal {
        self.core.prices.get(fuel_type)
    }

    /// # Errors
    ///
    /// Returns [`StationError::InvalidPrice`] for a negative price.
    pub fn set_price(&self, fuel_type: FuelType, price: Decimal) -> Result<(), StationError> {
        self.core.prices.set(fuel_type, price)
    }

    /// Every explicitly set price, ordered by fuel type.
    pub fn prices(&self) -> Vec<(FuelType, Decimal)> {
        self.core.prices.snapshot()
    }

    /// Total volume left across the pumps of one fuel type.
    pub fn remaining(&self, fuel_type: FuelType) -> Decimal {
        self.core.pumps.remaining(fuel_type)
    }

    pub fn settlement(&self) -> SettlementPolicy {
        self.core.settlement
    }

    /// Transaction workers currently running.
    pub fn workers(&self) -> usize {
        self.scheduler.live_workers()
    }
}
