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

//! Per-fuel-type unit prices.
//!
//! A fuel type that was never priced reads as free (`0`). Price changes are
//! visible to the next gate evaluation on any thread, including purchases
//! that were queued before the change.

use crate::StationError;
use crate::base::FuelType;
use dashmap::DashMap;
use log::info;
use rust_decimal::Decimal;

/// Concurrent fuel-type to unit-price map.
#[derive(Debug, Default)]
pub struct PriceBoard {
    prices: DashMap<FuelType, Decimal>,
}

impl PriceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current unit price, or zero if the fuel type was never priced.
    pub fn get(&self, fuel_type: FuelType) -> Decimal {
        self.prices
            .get(&fuel_type)
            .map(|price| *price)
            .unwrap_or(Decimal::ZERO)
    }

    /// Sets the unit price for a fuel type.
    ///
    /// # Errors
    ///
    /// Returns [`StationError::InvalidPrice`] for a negative price.
    pub fn set(&self, fuel_type: FuelType, price: Decimal) -> Result<(), StationError> {
        if price < Decimal::ZERO {
            return Err(StationError::InvalidPrice);
        }
        let previous = self.prices.insert(fuel_type, price);
        info!(
            "Price of {} set to {} (was {})",
            fuel_type,
            price,
            previous.unwrap_or(Decimal::ZERO)
        );
        Ok(())
    }

    /// Explicitly set prices, ordered by fuel type.
    pub fn snapshot(&self) -> Vec<(FuelType, Decimal)> {
        let mut prices: Vec<(FuelType, Decimal)> = self
            .prices
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        prices.sort_by_key(|(fuel_type, _)| *fuel_type);
        prices
    }
}
