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

//! Settlement of a successful purchase.
//!
//! The charged cost is `unit price × amount`, rounded to cents with ties
//! going toward zero. Which unit price is charged is a station-wide policy.

use crate::StationError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fractional digits kept on a charged cost.
pub const COST_PRECISION: u32 = 2;

/// Unit price a successful purchase is charged at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SettlementPolicy {
    /// Charge the customer's stated maximum unit price.
    #[default]
    StatedMaximum,
    /// Charge the board price read when the purchase passed the price gate.
    BoardPrice,
}

impl SettlementPolicy {
    /// Picks the unit price to charge.
    pub fn unit_price(self, max_unit_price: Decimal, board_price: Decimal) -> Decimal {
        match self {
            SettlementPolicy::StatedMaximum => max_unit_price,
            SettlementPolicy::BoardPrice => board_price,
        }
    }
}

impl fmt::Display for SettlementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementPolicy::StatedMaximum => f.write_str("stated-maximum"),
            SettlementPolicy::BoardPrice => f.write_str("board-price"),
        }
    }
}

/// Cost of one sale, held as a whole number of cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cost {
    cents: u64,
}

impl Cost {
    /// Computes `unit_price × amount` rounded half-down to cents.
    ///
    /// # Errors
    ///
    /// - [`StationError::InvalidPrice`] - the product is negative.
    /// - [`StationError::CostOverflow`] - the product does not fit.
    pub fn for_purchase(unit_price: Decimal, amount: Decimal) -> Result<Self, StationError> {
        let raw = unit_price
            .checked_mul(amount)
            .ok_or(StationError::CostOverflow)?;
        if raw < Decimal::ZERO {
            return Err(StationError::InvalidPrice);
        }
        let mut rounded =
            raw.round_dp_with_strategy(COST_PRECISION, RoundingStrategy::MidpointTowardZero);
        rounded.rescale(COST_PRECISION);
        // rescale stops short of the target scale instead of overflowing
        if rounded.scale() != COST_PRECISION {
            return Err(StationError::CostOverflow);
        }
        let cents = u64::try_from(rounded.mantissa()).map_err(|_| StationError::CostOverflow)?;
        Ok(Self { cents })
    }

    pub fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub fn cents(self) -> u64 {
        self.cents
    }

    pub fn to_decimal(self) -> Decimal {
        cents_to_decimal(self.cents)
    }
}

pub(crate) fn cents_to_decimal(cents: u64) -> Decimal {
    Decimal::from_i128_with_scale(i128::from(cents), COST_PRECISION)
}
