//! Loads the "Transactions" sheet of an uploaded workbook (or its CSV
//! export) into a row table, adding the derived `hour` and `day_of_week`
//! columns.
//!
//! Parse policy: any unparseable cell rejects the whole file, naming the
//! offending field. A file that loads at all is therefore fully typed.

use crate::error::{Result, SalesInsightsError};
use crate::schema::{Table, Transaction};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, info};
use std::io::{Cursor, Read};
use std::path::Path;

/// The sheet the dashboard reads from an uploaded workbook.
pub const TRANSACTIONS_SHEET: &str = "Transactions";

/// Columns that must be present in the header row, workbook or CSV alike.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "transaction_date",
    "transaction_time",
    "transaction_qty",
    "unit_price",
    "product_detail",
    "product_type",
    "product_category",
    "store_location",
];

/// Positions of the required columns within a header row.
#[derive(Debug)]
struct ColumnMap {
    date: usize,
    time: usize,
    qty: usize,
    price: usize,
    detail: usize,
    product_type: usize,
    category: usize,
    location: usize,
}

impl ColumnMap {
    fn from_headers(headers: &[String]) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| find(name).is_none())
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(SalesInsightsError::Format(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            date: find("transaction_date").unwrap(),
            time: find("transaction_time").unwrap(),
            qty: find("transaction_qty").unwrap(),
            price: find("unit_price").unwrap(),
            detail: find("product_detail").unwrap(),
            product_type: find("product_type").unwrap(),
            category: find("product_category").unwrap(),
            location: find("store_location").unwrap(),
        })
    }
}

/// Reads the [`TRANSACTIONS_SHEET`] of an xlsx/xls/ods workbook held fully
/// in memory, the way an upload buffer arrives from the presentation layer.
pub fn load_workbook(bytes: &[u8]) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let range = workbook.worksheet_range(TRANSACTIONS_SHEET).map_err(|_| {
        SalesInsightsError::Format(format!("missing sheet '{}'", TRANSACTIONS_SHEET))
    })?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| SalesInsightsError::Format("sheet has no header row".to_string()))?;
    let headers: Vec<String> = header_row.iter().map(cell_to_header).collect();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut table = Vec::new();
    for row in rows {
        // Trailing blank rows are common in hand-edited workbooks.
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        table.push(convert_workbook_row(row, &columns)?);
    }

    info!(
        "Loaded {} transactions from sheet '{}'",
        table.len(),
        TRANSACTIONS_SHEET
    );
    Ok(table)
}

/// Reads the same table from a CSV export with identical header
/// requirements and parse policy.
pub fn load_csv<R: Read>(reader: R) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut table = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        table.push(Transaction::new(
            parse_date(field(columns.date), "transaction_date")?,
            parse_time(field(columns.time), "transaction_time")?,
            parse_qty(field(columns.qty))?,
            parse_price(field(columns.price))?,
            field(columns.detail).to_string(),
            field(columns.product_type).to_string(),
            field(columns.category).to_string(),
            field(columns.location).to_string(),
        ));
    }

    debug!("Loaded {} transactions from CSV", table.len());
    Ok(table)
}

pub fn load_csv_path<P: AsRef<Path>>(path: P) -> Result<Table> {
    let file = std::fs::File::open(path)?;
    load_csv(file)
}

fn convert_workbook_row(row: &[Data], columns: &ColumnMap) -> Result<Transaction> {
    let cell = |idx: usize| row.get(idx).unwrap_or(&Data::Empty);

    Ok(Transaction::new(
        cell_date(cell(columns.date), "transaction_date")?,
        cell_time(cell(columns.time), "transaction_time")?,
        cell_qty(cell(columns.qty))?,
        cell_price(cell(columns.price))?,
        cell_text(cell(columns.detail), "product_detail")?,
        cell_text(cell(columns.product_type), "product_type")?,
        cell_text(cell(columns.category), "product_category")?,
        cell_text(cell(columns.location), "store_location")?,
    ))
}

fn cell_to_header(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cell_date(cell: &Data, field: &str) -> Result<NaiveDate> {
    match cell {
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.date())
            .ok_or_else(|| SalesInsightsError::parse(field, "unrepresentable date cell")),
        Data::String(s) => parse_date(s, field),
        Data::DateTimeIso(s) => parse_date(s, field),
        other => Err(SalesInsightsError::parse(
            field,
            format!("expected a date, got '{}'", other),
        )),
    }
}

fn cell_time(cell: &Data, field: &str) -> Result<NaiveTime> {
    match cell {
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.time())
            .ok_or_else(|| SalesInsightsError::parse(field, "unrepresentable time cell")),
        Data::String(s) => parse_time(s, field),
        Data::DateTimeIso(s) => parse_time(s, field),
        other => Err(SalesInsightsError::parse(
            field,
            format!("expected a time, got '{}'", other),
        )),
    }
}

fn cell_qty(cell: &Data) -> Result<u32> {
    match cell {
        Data::Int(i) => int_to_qty(*i),
        Data::Float(f) if f.fract() == 0.0 => int_to_qty(*f as i64),
        Data::String(s) => parse_qty(s),
        other => Err(SalesInsightsError::parse(
            "transaction_qty",
            format!("expected a non-negative integer, got '{}'", other),
        )),
    }
}

fn cell_price(cell: &Data) -> Result<f64> {
    match cell {
        Data::Float(f) => float_to_price(*f),
        Data::Int(i) => float_to_price(*i as f64),
        Data::String(s) => parse_price(s),
        other => Err(SalesInsightsError::parse(
            "unit_price",
            format!("expected a non-negative number, got '{}'", other),
        )),
    }
}

fn cell_text(cell: &Data, field: &str) -> Result<String> {
    match cell {
        Data::String(s) => Ok(s.clone()),
        // Numeric product ids are legal; stringify them.
        Data::Int(i) => Ok(i.to_string()),
        Data::Float(f) => Ok(f.to_string()),
        other => Err(SalesInsightsError::parse(
            field,
            format!("expected text, got '{}'", other),
        )),
    }
}

/// ISO dates, with or without a time-of-day suffix.
fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.date());
        }
    }
    Err(SalesInsightsError::parse(
        field,
        format!("'{}' is not an ISO date", value),
    ))
}

fn parse_time(value: &str, field: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M:%S").map_err(|_| {
        SalesInsightsError::parse(field, format!("'{}' is not a HH:MM:SS time", value))
    })
}

fn parse_qty(value: &str) -> Result<u32> {
    let parsed: i64 = value.trim().parse().map_err(|_| {
        SalesInsightsError::parse(
            "transaction_qty",
            format!("'{}' is not a non-negative integer", value),
        )
    })?;
    int_to_qty(parsed)
}

fn int_to_qty(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        SalesInsightsError::parse(
            "transaction_qty",
            format!("{} is out of range for a quantity", value),
        )
    })
}

fn parse_price(value: &str) -> Result<f64> {
    let parsed: f64 = value.trim().parse().map_err(|_| {
        SalesInsightsError::parse("unit_price", format!("'{}' is not a number", value))
    })?;
    float_to_price(parsed)
}

fn float_to_price(value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(SalesInsightsError::parse(
            "unit_price",
            format!("{} is not a non-negative price", value),
        ));
    }
    Ok(value)
}
