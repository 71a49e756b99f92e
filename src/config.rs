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

//! Station configuration.

use crate::StationError;
use crate::settlement::SettlementPolicy;
use serde::{Deserialize, Serialize};
use std::thread;

/// Settings fixed when a station is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StationConfig {
    /// Core size of the transaction worker pool; the pool may double it.
    pub workers: usize,
    pub settlement: SettlementPolicy,
}

impl StationConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub fn with_settlement(mut self, settlement: SettlementPolicy) -> Self {
        self.settlement = settlement;
        self
    }

    /// # Errors
    ///
    /// Returns [`StationError::InvalidWorkerCount`] when `workers` is zero.
    pub fn validate(&self) -> Result<(), StationError> {
        if self.workers == 0 {
            return Err(StationError::InvalidWorkerCount);
        }
        Ok(())
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(1, |n| n.get()),
            settlement: SettlementPolicy::default(),
        }
    }
}
