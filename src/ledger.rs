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

//! Station-wide sales statistics.
//!
//! Each counter is its own atomic. Readers may see a sale's revenue before
//! its sales increment (or the reverse); only individual fields are exact.

use crate::StationError;
use crate::settlement::{Cost, cents_to_decimal};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free aggregate of revenue, sales and cancellations.
#[derive(Debug, Default)]
pub struct Ledger {
    /// Revenue in cents.
    revenue: AtomicU64,
    sales: AtomicU64,
    cancellations_no_gas: AtomicU64,
    cancellations_too_expensive: AtomicU64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Books a completed sale.
    ///
    /// # Errors
    ///
    /// Returns [`StationError::CostOverflow`] when revenue would no longer be
    /// representable; nothing is booked in that case.
    pub fn record_sale(&self, cost: Cost) -> Result<(), StationError> {
        self.revenue
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |revenue| {
                revenue.checked_add(cost.cents())
            })
            .map_err(|_| StationError::CostOverflow)?;
        self.sales.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_no_gas(&self) {
        self.cancellations_no_gas.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_too_expensive(&self) {
        self.cancellations_too_expensive
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn revenue(&self) -> Decimal {
        cents_to_decimal(self.revenue.load(Ordering::Relaxed))
    }

    pub fn sales(&self) -> u64 {
        self.sales.load(Ordering::Relaxed)
    }

    pub fn cancellations_no_gas(&self) -> u64 {
        self.cancellations_no_gas.load(Ordering::Relaxed)
    }

    pub fn cancellations_too_expensive(&self) -> u64 {
        self.cancellations_too_expensive.load(Ordering::Relaxed)
    }

    /// Reads all four counters, one at a time.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            revenue: self.revenue(),
            sales: self.sales(),
            cancellations_no_gas: self.cancellations_no_gas(),
            cancellations_too_expensive: self.cancellations_too_expensive(),
        }
    }
}

/// Point-in-time copy of the ledger counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    pub revenue: Decimal,
    pub sales: u64,
    pub cancellations_no_gas: u64,
    pub cancellations_too_expensive: u64,
}

impl LedgerSnapshot {
    /// Sales plus both kinds of cancellation.
    pub fn transactions(&self) -> u64 {
        self.sales + self.cancellations_no_gas + self.cancellations_too_expensive
    }
}
