use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::{CustomerId, GiftId, Operation, Points, Reconciliation, StaffId};

/// Errors that can occur when reading operations or writing balances
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("cannot open {path}: {source}")]
    Open { path: String, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized operation type '{op_type}'")]
    UnrecognizedType { line: usize, op_type: String },

    #[error("line {line}: {op_type} missing {field}")]
    MissingField {
        line: usize,
        op_type: String,
        field: &'static str,
    },

    #[error("failed to write balances: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush balances: {0}")]
    Flush(#[from] io::Error),
}

#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    customer: Option<CustomerId>,
    gift: Option<GiftId>,
    staff: Option<StaffId>,
    amount: Option<i64>,
    stock: Option<u32>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct OutputRow {
    customer: CustomerId,
    total_points: i64,
    entries: usize,
    reconciled: bool,
}

/// Pull a required column out of a row
fn required<T>(
    value: Option<T>,
    line: usize,
    op_type: &str,
    field: &'static str,
) -> Result<T, CsvError> {
    value.ok_or_else(|| CsvError::MissingField {
        line,
        op_type: op_type.to_string(),
        field,
    })
}

fn parse_row(line: usize, row: InputRow) -> Result<Operation, CsvError> {
    let op_type = row.r#type.as_str();

    match op_type {
        "customer" => Ok(Operation::OpenCustomer {
            customer: required(row.customer, line, op_type, "customer")?,
        }),
        "gift" => Ok(Operation::AddGift {
            gift: required(row.gift, line, op_type, "gift")?,
            name: required(row.description, line, op_type, "description")?,
            points_required: Points::new(required(row.amount, line, op_type, "amount")?),
            stock: row.stock.unwrap_or(0),
        }),
        "stock" => Ok(Operation::SetStock {
            gift: required(row.gift, line, op_type, "gift")?,
            stock: required(row.stock, line, op_type, "stock")?,
        }),
        "earn" | "deduct" => {
            let customer = required(row.customer, line, op_type, "customer")?;
            let staff = required(row.staff, line, op_type, "staff")?;
            let amount = Points::new(required(row.amount, line, op_type, "amount")?);
            let description = required(row.description, line, op_type, "description")?;
            if op_type == "earn" {
                Ok(Operation::Earn {
                    customer,
                    staff,
                    amount,
                    description,
                })
            } else {
                Ok(Operation::Deduct {
                    customer,
                    staff,
                    amount,
                    description,
                })
            }
        }
        "redeem" => Ok(Operation::Redeem {
            customer: required(row.customer, line, op_type, "customer")?,
            gift: required(row.gift, line, op_type, "gift")?,
            staff: required(row.staff, line, op_type, "staff")?,
        }),
        "remove" => Ok(Operation::RemoveCustomer {
            customer: required(row.customer, line, op_type, "customer")?,
        }),
        "remove_gift" => Ok(Operation::RemoveGift {
            gift: required(row.gift, line, op_type, "gift")?,
        }),
        other => Err(CsvError::UnrecognizedType {
            line,
            op_type: other.to_string(),
        }),
    }
}

/// Read operations from a csv file
pub fn read_operations(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Operation, CsvError>>, CsvError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            parse_row(line, row)
        }))
}

/// Write one balance row per customer in csv format
pub fn write_balances<'a>(
    writer: impl io::Write,
    report: impl IntoIterator<Item = &'a Reconciliation>,
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(writer);

    for entry in report {
        writer.serialize(OutputRow {
            customer: entry.customer,
            total_points: entry.balance.value(),
            entries: entry.entries,
            reconciled: entry.is_balanced(),
        })?;
    }

    writer.flush()?;
    Ok(())
}
