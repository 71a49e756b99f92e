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

//! Pump management.
//!
//! A pump dispenses one fuel type out of a fixed capacity. The only mutable
//! state is the remaining volume, guarded by a mutex scoped to that pump, so
//! "has at least `amount` left and subtract `amount`" is one indivisible step.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use gas_station_rs::{FuelType, Pump};
//!
//! let pump = Pump::new(FuelType::Diesel, dec!(500)).unwrap();
//! assert_eq!(pump.remaining(), dec!(500));
//! assert_eq!(pump.try_withdraw(dec!(120)), Ok(dec!(380)));
//! ```

use crate::StationError;
use crate::base::{FuelType, PumpId};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug)]
struct PumpData {
    capacity: Decimal,
    remaining: Decimal,
}

impl PumpData {
    fn new(capacity: Decimal) -> Self {
        Self {
            capacity,
            remaining: capacity,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.remaining >= Decimal::ZERO,
            "Invariant violated: remaining volume went negative: {}",
            self.remaining
        );
        debug_assert!(
            self.remaining <= self.capacity,
            "Invariant violated: remaining volume {} exceeds capacity {}",
            self.remaining,
            self.capacity
        );
    }

    /// Decreases remaining volume once `commit` accepts the withdrawal.
    fn withdraw<F>(&mut self, amount: Decimal, commit: F) -> Result<Decimal, StationError>
    where
        F: FnOnce() -> Result<(), StationError>,
    {
        if amount <= Decimal::ZERO {
            return Err(StationError::InvalidAmount);
        }
        if self.remaining < amount {
            return Err(StationError::NotEnoughGas);
        }
        commit()?;
        self.remaining -= amount;
        self.assert_invariants();
        Ok(self.remaining)
    }
}

/// A single dispenser.
#[derive(Debug)]
pub struct Pump {
    fuel_type: FuelType,
    capacity: Decimal,
    inner: Mutex<PumpData>,
}

impl Pump {
    /// Creates a full pump.
    ///
    /// # Errors
    ///
    /// Returns [`StationError::InvalidAmount`] for a negative capacity.
    pub fn new(fuel_type: FuelType, capacity: Decimal) -> Result<Self, StationError> {
        if capacity < Decimal::ZERO {
            return Err(StationError::InvalidAmount);
        }
        Ok(Self {
            fuel_type,
            capacity,
            inner: Mutex::new(PumpData::new(capacity)),
        })
    }

    pub fn fuel_type(&self) -> FuelType {
        self.fuel_type
    }

    pub fn capacity(&self) -> Decimal {
        self.capacity
    }

    pub fn remaining(&self) -> Decimal {
        self.inner.lock().remaining
    }

    /// Withdraws `amount` if the pump still holds at least that much.
    ///
    /// Returns the volume left afterwards. On failure nothing is withdrawn.
    ///
    /// # Errors
    ///
    /// - [`StationError::InvalidAmount`] - `amount` is zero or negative.
    /// - [`StationError::NotEnoughGas`] - less than `amount` remains.
    pub fn try_withdraw(&self, amount: Decimal) -> Result<Decimal, StationError> {
        self.try_withdraw_with(amount, || Ok(()))
    }

    /// Like [`Pump::try_withdraw`], but runs `commit` under the pump's lock
    /// after the volume is confirmed and before it is subtracted.
    ///
    /// If `commit` fails, its error is returned and the pump is left as it was.
    pub fn try_withdraw_with<F>(&self, amount: Decimal, commit: F) -> Result<Decimal, StationError>
    where
        F: FnOnce() -> Result<(), StationError>,
    {
        self.inner.lock().withdraw(amount, commit)
    }

    /// Copies the pump's current state under the given id.
    pub(crate) fn snapshot(&self, id: PumpId) -> PumpSnapshot {
        PumpSnapshot {
            id,
            fuel_type: self.fuel_type,
            capacity: self.capacity,
            remaining: self.remaining(),
        }
    }
}

/// Read-only copy of a registered pump.
///
/// Holding a snapshot grants no access to the live pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PumpSnapshot {
    pub id: PumpId,
    pub fuel_type: FuelType,
    pub capacity: Decimal,
    pub remaining: Decimal,
}

impl PumpSnapshot {
    /// Volume dispensed since registration.
    pub fn dispensed(&self) -> Decimal {
        self.capacity - self.remaining
    }
}
