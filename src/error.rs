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

//! Error types for station operations.

use thiserror::Error;

/// Station errors.
///
/// [`NotEnoughGas`](StationError::NotEnoughGas) and
/// [`TooExpensive`](StationError::TooExpensive) are business outcomes and are
/// counted by the ledger. Every other variant means the purchase never took
/// place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StationError {
    /// No single pump of the requested type holds the requested volume
    #[error("not enough gas of the requested type in any single pump")]
    NotEnoughGas,

    /// Customer's maximum unit price is below the board price
    #[error("gas is too expensive for the requested maximum price")]
    TooExpensive,

    /// Volume is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Price is negative
    #[error("invalid price (must not be negative)")]
    InvalidPrice,

    /// Cost of the purchase cannot be represented
    #[error("purchase cost overflows")]
    CostOverflow,

    /// Worker pool must have at least one worker
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    /// Operating system refused to start a worker thread
    #[error("failed to spawn worker: {0}")]
    WorkerSpawn(String),

    /// Scheduler stopped accepting or answering work
    #[error("transaction scheduler is closed")]
    SchedulerClosed,

    /// Task panicked on a worker
    #[error("transaction task panicked: {0}")]
    TaskPanicked(String),
}

/// Fuel type name that matches no [`FuelType`](crate::FuelType).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown fuel type: {0}")]
pub struct ParseFuelTypeError(pub String);

impl StationError {
    /// Returns `true` for the outcomes that count as a cancelled sale.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StationError::NotEnoughGas | StationError::TooExpensive)
    }
}
