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

//! Core identifier types for fuel grades and pumps.

use crate::error::ParseFuelTypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grade of fuel a pump dispenses and a price applies to.
///
/// Used purely as a lookup key; it carries no behaviour of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Regular,
    Diesel,
    Super,
}

impl FuelType {
    /// Every fuel grade, in declaration order.
    pub const ALL: [FuelType; 3] = [FuelType::Regular, FuelType::Diesel, FuelType::Super];
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FuelType::Regular => "regular",
            FuelType::Diesel => "diesel",
            FuelType::Super => "super",
        };
        f.write_str(name)
    }
}

impl FromStr for FuelType {
    type Err = ParseFuelTypeError;

    /// Parses a fuel type name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "regular" => Ok(FuelType::Regular),
            "diesel" => Ok(FuelType::Diesel),
            "super" => Ok(FuelType::Super),
            _ => Err(ParseFuelTypeError(s.to_string())),
        }
    }
}

/// Identifier handed out by the registry when a pump is added.
///
/// Ids are sequential, so ordering by id is ordering by registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PumpId(pub u32);

impl fmt::Display for PumpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuel_type_displays_lowercase() {
        assert_eq!(FuelType::Regular.to_string(), "regular");
        assert_eq!(FuelType::Diesel.to_string(), "diesel");
        assert_eq!(FuelType::Super.to_string(), "super");
    }

    #[test]
    fn fuel_type_serde_matches_display() {
        for fuel in FuelType::ALL {
            let json = serde_json::to_string(&fuel).unwrap();
            assert_eq!(json, format!("\"{fuel}\""));
            let parsed: FuelType = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, fuel);
        }
    }

    #[test]
    fn fuel_type_parses_case_insensitively() {
        assert_eq!(" Diesel ".parse::<FuelType>(), Ok(FuelType::Diesel));
        assert_eq!("SUPER".parse::<FuelType>(), Ok(FuelType::Super));
        assert_eq!(
            "kerosene".parse::<FuelType>(),
            Err(ParseFuelTypeError("kerosene".to_string()))
        );
    }

    #[test]
    fn pump_ids_order_by_registration() {
        assert!(PumpId(1) < PumpId(2));
        assert_eq!(PumpId(7).to_string(), "7");
    }
}
