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

//! Concurrent purchase tests.
//!
//! These tests hammer a shared station from many caller threads and check
//! that pumps are never overdrawn and that every completed purchase is
//! counted exactly once.

use gas_station_rs::{
    FuelType, Pump, SettlementPolicy, Station, StationConfig, StationError,
};
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

fn make_pump(fuel_type: FuelType, capacity: Decimal) -> Pump {
    Pump::new(fuel_type, capacity).unwrap()
}

/// Runs `requests` from one caller thread each and returns the results.
fn buy_concurrently(
    station: &Arc<Station>,
    requests: Vec<(FuelType, Decimal, Decimal)>,
) -> Vec<Result<Decimal, StationError>> {
    let handles: Vec<_> = requests
        .into_iter()
        .map(|(fuel_type, amount, max_price)| {
            let station = Arc::clone(station);
            thread::spawn(move || station.buy_gas(fuel_type, amount, max_price))
        })
        .collect();

    handles
        .into_iter()
        .map(|handle| handle.join().expect("Thread panicked"))
        .collect()
}

#[test]
fn equal_shares_drain_pump_exactly() {
    const BUYERS: usize = 100;
    let station = Arc::new(Station::new(8).unwrap());
    station.add_gas_pump(make_pump(FuelType::Regular, dec!(1000)));

    let requests = vec![(FuelType::Regular, dec!(10), dec!(1)); BUYERS];
    let results = buy_concurrently(&station, requests);

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(station.gas_pumps()[0].remaining, Decimal::ZERO);
    assert_eq!(station.number_of_sales(), BUYERS as u64);
}

#[test]
fn oversubscribed_pump_is_never_overdrawn() {
    let station = Arc::new(Station::new(8).unwrap());
    station.add_gas_pump(make_pump(FuelType::Diesel, dec!(1000)));

    let requests = vec![(FuelType::Diesel, dec!(11), dec!(1)); 100];
    let results = buy_concurrently(&station, requests);

    let sold = results.iter().filter(|r| r.is_ok()).count();
    let no_gas = results
        .iter()
        .filter(|r| **r == Err(StationError::NotEnoughGas))
        .count();

    assert_eq!(sold, 90);
    assert_eq!(no_gas, 10);
    assert_eq!(station.gas_pumps()[0].remaining, dec!(10));
    assert_eq!(station.number_of_cancellations_no_gas(), 10);
}

#[test]
fn lost_races_fall_through_to_next_pump() {
    let station = Arc::new(Station::new(8).unwrap());
    station.add_gas_pump(make_pump(FuelType::Super, dec!(1000)));
    station.add_gas_pump(make_pump(FuelType::Super, dec!(55)));

    let requests = vec![(FuelType::Super, dec!(11), dec!(1)); 100];
    let results = buy_concurrently(&station, requests);

    let sold = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(sold, 95);
    assert_eq!(station.number_of_cancellations_no_gas(), 5);

    let pumps = station.gas_pumps();
    assert_eq!(pumps[0].remaining, dec!(10));
    assert_eq!(pumps[1].remaining, Decimal::ZERO);
}

/// 105 customers across three fuel types, three pumps each.
///
/// The first 99 buy 50 L at 1.50 and all succeed. Of the last six, three ask
/// for 100 L when no pump has that much left, and three offer 0.01.
fn mixed_batch(settlement: SettlementPolicy) -> Station {
    let station = Arc::new(
        Station::with_config(StationConfig::new(105).with_settlement(settlement)).unwrap(),
    );
    for fuel_type in FuelType::ALL {
        for capacity in [dec!(1000), dec!(500), dec!(200)] {
            station.add_gas_pump(make_pump(fuel_type, capacity));
        }
    }
    station.set_price(FuelType::Regular, dec!(1.50)).unwrap();
    station.set_price(FuelType::Diesel, dec!(1.00)).unwrap();
    station.set_price(FuelType::Super, dec!(1.20)).unwrap();

    let request = |index: usize| {
        let fuel_type = FuelType::ALL[index % 3];
        let amount = if index < 99 { dec!(50) } else { dec!(100) };
        let max_price = if index < 102 { dec!(1.50) } else { dec!(0.01) };
        (fuel_type, amount, max_price)
    };

    let first: Vec<_> = (0..99).map(request).collect();
    assert!(buy_concurrently(&station, first).iter().all(Result::is_ok));

    let rest: Vec<_> = (99..105).map(request).collect();
    let results = buy_concurrently(&station, rest);
    assert!(results[..3].iter().all(|r| *r == Err(StationError::NotEnoughGas)));
    assert!(results[3..].iter().all(|r| *r == Err(StationError::TooExpensive)));

    Arc::try_unwrap(station).expect("station still shared")
}

#[test]
fn mixed_batch_with_board_price_settlement() {
    let station = mixed_batch(SettlementPolicy::BoardPrice);

    // 33*50*1.5 + 33*50*1.0 + 33*50*1.2
    assert_eq!(station.revenue(), dec!(6105.00));
    assert_eq!(station.number_of_sales(), 99);
    assert_eq!(station.number_of_cancellations_no_gas(), 3);
    assert_eq!(station.number_of_cancellations_too_expensive(), 3);
}

#[test]
fn mixed_batch_with_stated_maximum_settlement() {
    let station = mixed_batch(SettlementPolicy::StatedMaximum);

    // 99*50*1.5
    assert_eq!(station.revenue(), dec!(7425.00));
    assert_eq!(station.number_of_sales(), 99);
    assert_eq!(station.number_of_cancellations_no_gas(), 3);
    assert_eq!(station.number_of_cancellations_too_expensive(), 3);
}

#[test]
fn counters_conserved_across_parallel_purchases() {
    const PURCHASES: usize = 2_000;
    let station = Station::new(4).unwrap();
    for fuel_type in FuelType::ALL {
        station.add_gas_pump(make_pump(fuel_type, dec!(3000)));
        station.add_gas_pump(make_pump(fuel_type, dec!(700)));
    }
    station.set_price(FuelType::Regular, dec!(1.50)).unwrap();
    station.set_price(FuelType::Diesel, dec!(1.10)).unwrap();
    station.set_price(FuelType::Super, dec!(1.90)).unwrap();

    let charged = AtomicU64::new(0);
    (0..PURCHASES).into_par_iter().for_each(|i| {
        let fuel_type = FuelType::ALL[i % 3];
        let amount = Decimal::from(1 + (i % 17) as u32);
        let max_price = Decimal::new(100 + (i % 120) as i64, 2);
        if let Ok(cost) = station.buy_gas(fuel_type, amount, max_price) {
            let cents = (cost * dec!(100)).trunc();
            charged.fetch_add(u64::try_from(cents.mantissa()).unwrap(), Ordering::Relaxed);
        }
    });

    let ledger = station.ledger();
    assert_eq!(ledger.transactions(), PURCHASES as u64);
    assert_eq!(
        ledger.revenue,
        Decimal::new(charged.load(Ordering::Relaxed) as i64, 2)
    );
    for pump in station.gas_pumps() {
        assert!(pump.remaining >= Decimal::ZERO);
    }
}

#[test]
fn volume_sold_matches_volume_dispensed() {
    let station = Station::new(6).unwrap();
    station.add_gas_pump(make_pump(FuelType::Regular, dec!(400)));
    station.add_gas_pump(make_pump(FuelType::Regular, dec!(250)));
    station.add_gas_pump(make_pump(FuelType::Regular, dec!(75)));

    let sold: Decimal = (0..300usize)
        .into_par_iter()
        .filter_map(|i| {
            let amount = Decimal::from(1 + (i % 9) as u32);
            station
                .buy_gas(FuelType::Regular, amount, dec!(1))
                .ok()
                .map(|_| amount)
        })
        .sum();

    let dispensed: Decimal = station.gas_pumps().iter().map(|p| p.dispensed()).sum();
    assert_eq!(sold, dispensed);
    assert!(station.remaining(FuelType::Regular) >= Decimal::ZERO);
}

#[test]
fn pool_never_grows_past_twice_core_size() {
    let station = Arc::new(Station::new(3).unwrap());
    station.add_gas_pump(make_pump(FuelType::Diesel, dec!(100000)));

    let requests = vec![(FuelType::Diesel, dec!(1), dec!(1)); 200];
    buy_concurrently(&station, requests);

    assert!(station.workers() >= 3);
    assert!(station.workers() <= 6);
}
