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

//! Pump registry with first-fit allocation.
//!
//! Pumps are grouped by fuel type. Each group is an append-only,
//! copy-on-write list: adding a pump swaps in a new list while allocation
//! scans keep iterating the list they already hold, without any lock.

use crate::StationError;
use crate::base::{FuelType, PumpId};
use crate::pump::{Pump, PumpSnapshot};
use dashmap::DashMap;
use log::{debug, trace};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug)]
struct RegisteredPump {
    id: PumpId,
    pump: Pump,
}

type Bucket = Arc<Vec<Arc<RegisteredPump>>>;

/// Result of a successful first-fit allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// Pump the volume was withdrawn from.
    pub pump_id: PumpId,
    pub fuel_type: FuelType,
    pub amount: Decimal,
    /// Volume left in that pump right after the withdrawal.
    pub remaining: Decimal,
}

/// Owns every registered pump.
///
/// # Invariants
///
/// - A pump belongs to exactly one fuel-type bucket for its whole lifetime.
/// - Buckets only grow; registration order is allocation priority.
#[derive(Debug, Default)]
pub struct PumpRegistry {
    buckets: DashMap<FuelType, Bucket>,
    next_id: AtomicU32,
}

impl PumpRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pump to the bucket of its fuel type.
    ///
    /// Duplicates are not detected; every call registers a new pump.
    pub fn add(&self, pump: Pump) -> PumpId {
        let fuel_type = pump.fuel_type();

        // Hold the shard guard while numbering so ids follow bucket order.
        let mut bucket = self.buckets.entry(fuel_type).or_default();
        let id = PumpId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(
            "Registered pump {} ({}, capacity {})",
            id,
            fuel_type,
            pump.capacity()
        );
        Arc::make_mut(bucket.value_mut()).push(Arc::new(RegisteredPump { id, pump }));
        id
    }

    /// Withdraws `amount` from the first pump of `fuel_type` able to supply it.
    ///
    /// Pumps are tried in registration order. A pump that loses a race to a
    /// concurrent allocation is skipped and the scan moves on; volumes are
    /// never combined across pumps.
    ///
    /// # Errors
    ///
    /// - [`StationError::InvalidAmount`] - `amount` is zero or negative.
    /// - [`StationError::NotEnoughGas`] - no single pump holds `amount`, or
    ///   the fuel type has no pumps at all.
    pub fn allocate(&self, fuel_type: FuelType, amount: Decimal) -> Result<Allocation, StationError> {
        self.allocate_with(fuel_type, amount, || Ok(()))
    }

    /// Like [`PumpRegistry::allocate`], but runs `commit` inside the chosen
    /// pump's critical section, right before the volume is subtracted.
    ///
    /// `commit` runs at most once. Its error aborts the scan and leaves every
    /// pump untouched.
    pub fn allocate_with<F>(
        &self,
        fuel_type: FuelType,
        amount: Decimal,
        commit: F,
    ) -> Result<Allocation, StationError>
    where
        F: FnOnce() -> Result<(), StationError>,
    {
        self.scan(fuel_type, amount, commit, |_| {})
    }

    /// First-fit scan. `before_withdraw` sees each candidate after it passed
    /// the lock-free volume check and before its lock is taken.
    fn scan<F, P>(
        &self,
        fuel_type: FuelType,
        amount: Decimal,
        commit: F,
        mut before_withdraw: P,
    ) -> Result<Allocation, StationError>
    where
        F: FnOnce() -> Result<(), StationError>,
        P: FnMut(&Pump),
    {
        if amount <= Decimal::ZERO {
            return Err(StationError::InvalidAmount);
        }
        let Some(bucket) = self.bucket(fuel_type) else {
            return Err(StationError::NotEnoughGas);
        };

        // Taken by the pump that accepts the withdrawal.
        let mut commit = Some(commit);
        for entry in bucket.iter() {
            if entry.pump.remaining() < amount {
                continue;
            }
            before_withdraw(&entry.pump);
            let result = entry.pump.try_withdraw_with(amount, || match commit.take() {
                Some(commit) => commit(),
                None => Ok(()),
            });
            match result {
                Ok(remaining) => {
                    return Ok(Allocation {
                        pump_id: entry.id,
                        fuel_type,
                        amount,
                        remaining,
                    });
                }
                Err(StationError::NotEnoughGas) => {
                    trace!("Pump {} drained by a concurrent sale, trying next", entry.id);
                }
                Err(e) => return Err(e),
            }
        }

        Err(StationError::NotEnoughGas)
    }

    /// Returns read-only copies of every pump, in registration order.
    pub fn snapshot(&self) -> Vec<PumpSnapshot> {
        let mut pumps: Vec<PumpSnapshot> = self
            .buckets
            .iter()
            .flat_map(|bucket| {
                bucket
                    .value()
                    .iter()
                    .map(|entry| entry.pump.snapshot(entry.id))
                    .collect::<Vec<_>>()
            })
            .collect();
        pumps.sort_by_key(|pump| pump.id);
        pumps
    }

    /// Total volume left across the pumps of one fuel type.
    pub fn remaining(&self, fuel_type: FuelType) -> Decimal {
        self.bucket(fuel_type)
            .map(|bucket| bucket.iter().map(|entry| entry.pump.remaining()).sum::<Decimal>())
            .unwrap_or(Decimal::ZERO)
    }

    /// Number of registered pumps.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clones the current list for a fuel type, releasing the shard at once.
    fn bucket(&self, fuel_type: FuelType) -> Option<Bucket> {
        self.buckets.get(&fuel_type).map(|bucket| Arc::clone(bucket.value()))
    }
}
