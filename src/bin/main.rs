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

use clap::{Parser, ValueEnum};
use csv::{ReaderBuilder, Trim, Writer};
use gas_station_rs::{
    BuyRequest, FuelType, Pump, SettlementPolicy, Station, StationConfig,
};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::thread;

/// Gas Station - Replay station operations from a CSV file
///
/// Registers pumps, sets prices and runs purchases, then writes the
/// resulting ledger or pump states to stdout.
#[derive(Parser, Debug)]
#[command(name = "gas-station-rs")]
#[command(about = "A gas station engine that replays operation CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,fuel,amount,price
    /// Example: cargo run -- operations.csv > ledger.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Core size of the transaction worker pool
    #[arg(short, long)]
    workers: Option<usize>,

    /// Unit price a successful purchase is charged at
    #[arg(short, long, value_enum, default_value_t = Settlement::StatedMaximum)]
    settlement: Settlement,

    /// Customer threads issuing each run of consecutive purchases
    #[arg(short, long, default_value_t = 8)]
    clients: usize,

    /// What to write to stdout
    #[arg(short, long, value_enum, default_value_t = Report::Ledger)]
    report: Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Settlement {
    StatedMaximum,
    BoardPrice,
}

impl From<Settlement> for SettlementPolicy {
    fn from(settlement: Settlement) -> Self {
        match settlement {
            Settlement::StatedMaximum => SettlementPolicy::StatedMaximum,
            Settlement::BoardPrice => SettlementPolicy::BoardPrice,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Report {
    Ledger,
    Pumps,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Parse command line arguments
    let args = Args::parse();

    let mut config = StationConfig::default().with_settlement(args.settlement.into());
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    let station = match Station::with_config(config) {
        Ok(station) => station,
        Err(e) => {
            eprintln!("Error starting station: {}", e);
            process::exit(1);
        }
    };

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    if let Err(e) = process_operations(BufReader::new(file), &station, args.clients) {
        eprintln!("Error processing operations: {}", e);
        process::exit(1);
    }

    let ledger = station.ledger();
    info!(
        "Revenue {} from {} sales; {} cancelled for lack of gas, {} as too expensive",
        ledger.revenue,
        ledger.sales,
        ledger.cancellations_no_gas,
        ledger.cancellations_too_expensive
    );

    let written = match args.report {
        Report::Ledger => write_ledger(&station, std::io::stdout()),
        Report::Pumps => write_pumps(&station, std::io::stdout()),
    };
    if let Err(e) = written {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, fuel, amount, price`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    fuel: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    price: Option<Decimal>,
}

#[derive(Debug)]
enum Operation {
    AddPump(Pump),
    SetPrice(FuelType, Decimal),
    Buy(BuyRequest),
}

impl CsvRecord {
    /// Converts CSV record to an operation.
    ///
    /// Returns `None` for unknown operations or fuel types, missing required
    /// fields, and values the station would reject.
    fn into_operation(self) -> Option<Operation> {
        let fuel_type: FuelType = self.fuel.parse().ok()?;

        match self.op.to_lowercase().as_str() {
            "pump" => Pump::new(fuel_type, self.amount?).ok().map(Operation::AddPump),
            "price" => Some(Operation::SetPrice(fuel_type, self.price?)),
            "buy" => BuyRequest::new(fuel_type, self.amount?, self.price?)
                .ok()
                .map(Operation::Buy),
            _ => None,
        }
    }
}

/// Replay operations from a CSV reader against a station.
///
/// Rows take effect in file order, except that each run of consecutive `buy`
/// rows is issued concurrently by up to `clients` threads. Malformed rows and
/// rejected operations are skipped.
///
/// # CSV Format
///
/// Expected columns: `op, fuel, amount, price`
/// - `op`: Operation (pump, price, buy)
/// - `fuel`: Fuel type (regular, diesel, super)
/// - `amount`: Liters (pump capacity or purchase volume)
/// - `price`: Unit price (board price or purchase maximum)
///
/// # Example
///
/// ```csv
/// op,fuel,amount,price
/// pump,regular,500,
/// price,regular,,1.50
/// buy,regular,100,2.00
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn process_operations<R: Read>(
    reader: R,
    station: &Station,
    clients: usize,
) -> Result<(), csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let mut batch = Vec::new();
    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                let Some(operation) = record.into_operation() else {
                    warn!("Skipping invalid operation record");
                    continue;
                };

                match operation {
                    Operation::Buy(request) => batch.push(request),
                    Operation::AddPump(pump) => {
                        run_purchases(station, &batch, clients);
                        batch.clear();
                        station.add_gas_pump(pump);
                    }
                    Operation::SetPrice(fuel_type, price) => {
                        run_purchases(station, &batch, clients);
                        batch.clear();
                        if let Err(e) = station.set_price(fuel_type, price) {
                            warn!("Skipping price for {}: {}", fuel_type, e);
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Skipping malformed row: {}", e);
                continue;
            }
        }
    }
    run_purchases(station, &batch, clients);

    Ok(())
}

/// Issues purchases from `clients` scoped threads and waits for all of them.
fn run_purchases(station: &Station, requests: &[BuyRequest], clients: usize) {
    if requests.is_empty() {
        return;
    }
    let chunk_size = requests.len().div_ceil(clients.max(1));

    thread::scope(|scope| {
        for chunk in requests.chunks(chunk_size) {
            scope.spawn(move || {
                for request in chunk {
                    if let Err(e) = station.buy(*request) {
                        debug!(
                            "Purchase of {} L of {} failed: {}",
                            request.amount(),
                            request.fuel_type(),
                            e
                        );
                    }
                }
            });
        }
    });
}

/// Ledger summary row.
#[derive(Debug, Serialize)]
struct LedgerRow {
    revenue: Decimal,
    sales: u64,
    cancellations_no_gas: u64,
    cancellations_too_expensive: u64,
}

/// Write the ledger summary to a CSV writer.
///
/// # CSV Format
///
/// Columns: `revenue, sales, cancellations_no_gas, cancellations_too_expensive`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_ledger<W: Write>(station: &Station, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    let ledger = station.ledger();
    wtr.serialize(LedgerRow {
        revenue: ledger.revenue,
        sales: ledger.sales,
        cancellations_no_gas: ledger.cancellations_no_gas,
        cancellations_too_expensive: ledger.cancellations_too_expensive,
    })?;
    wtr.flush()?;
    Ok(())
}

/// Pump state row.
#[derive(Debug, Serialize)]
struct PumpRow {
    pump: u32,
    fuel: FuelType,
    capacity: Decimal,
    remaining: Decimal,
}

/// Write one row per registered pump to a CSV writer.
///
/// # CSV Format
///
/// Columns: `pump, fuel, capacity, remaining`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_pumps<W: Write>(station: &Station, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for pump in station.gas_pumps() {
        wtr.serialize(PumpRow {
            pump: pump.id.0,
            fuel: pump.fuel_type,
            capacity: report_decimal(pump.capacity),
            remaining: report_decimal(pump.remaining),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Rounds to 2 places and pads, so `100` is written as `100.00`.
fn report_decimal(value: Decimal) -> Decimal {
    let mut value = value.round_dp(2);
    value.rescale(2);
    value
}
