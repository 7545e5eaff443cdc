use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::classify::KeywordClassifier;
use crate::columns::{ColumnBindings, ColumnTable};
use crate::dates::parse_date_or_serial;
use crate::numeric::parse_amount;
use crate::table::Table;
use crate::types::{
    FlowDirection, FundFlow, Operation, OperationDetail, OperationKind, SignPolicy,
};

/// Logical field names understood by the row normalizer. Formats bind these
/// to their own concrete headers via the column table.
pub const FIELD_KIND: &str = "tipo";
pub const FIELD_DATE: &str = "fecha";
pub const FIELD_SYMBOL: &str = "especie";
pub const FIELD_QUANTITY: &str = "cantidad";
pub const FIELD_PRICE: &str = "precio";
pub const FIELD_AMOUNT: &str = "importe";
pub const FIELD_CURRENCY: &str = "moneda";
pub const FIELD_REFERENCE: &str = "referencia";
pub const FIELD_COMMISSION: &str = "comision";
pub const FIELD_TAXES: &str = "impuestos";

/// Why a row was excluded from the output without failing the file.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    BlankKindCell,
    SentinelRow,
    UnparseableDate,
    Malformed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::BlankKindCell => write!(f, "blank kind cell"),
            SkipReason::SentinelRow => write!(f, "sentinel row"),
            SkipReason::UnparseableDate => write!(f, "unparseable date"),
            SkipReason::Malformed(detail) => write!(f, "malformed row: {}", detail),
        }
    }
}

/// Per-row result: either a normalized operation or a skip with its reason.
#[derive(Debug)]
pub enum RowOutcome {
    Operation(Operation),
    Skip(SkipReason),
}

/// Declarative description of one broker statement format.
///
/// New formats ship as data (compiled-in or JSON) rather than as resolver or
/// classifier code changes.
#[derive(Debug, Clone, Deserialize)]
pub struct StatementFormat {
    pub broker: String,
    pub columns: ColumnTable,
    pub classifier: KeywordClassifier,
    pub sign_policy: SignPolicy,
    /// Kind-cell prefixes marking repeated header/title rows.
    #[serde(default)]
    pub sentinels: Vec<String>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_date_format() -> String {
    crate::dates::DAY_FIRST_FORMAT.to_string()
}

fn default_currency() -> String {
    "ARS".to_string()
}

impl StatementFormat {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Cannot open format file {}", path.as_ref().display()))?;
        serde_json::from_str(&content).with_context(|| {
            format!(
                "{} is not a valid statement format description",
                path.as_ref().display()
            )
        })
    }
}

/// A numeric cell that failed to convert and was coerced to 0.0.
#[derive(Debug, Clone)]
pub struct CoercedValue {
    pub row: usize,
    pub field: String,
    pub raw: String,
}

/// Everything one file normalized into: the operations plus the skips and
/// value coercions that would otherwise only live in the logs.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub operations: Vec<Operation>,
    pub skips: Vec<(usize, SkipReason)>,
    pub coercions: Vec<CoercedValue>,
}

impl NormalizedBatch {
    pub fn record_skip(&mut self, row: usize, reason: SkipReason) {
        debug!("skipping row {}: {}", row, reason);
        self.skips.push((row, reason));
    }

    /// Operation counts per kind, in declaration order, zero-count kinds
    /// omitted.
    pub fn kind_counts(&self) -> Vec<(OperationKind, usize)> {
        let kinds = [
            OperationKind::Trade,
            OperationKind::MonetaryFlow,
            OperationKind::SecurityFlow,
            OperationKind::MutualFund,
        ];
        kinds
            .iter()
            .map(|kind| {
                (
                    *kind,
                    self.operations.iter().filter(|op| op.kind() == *kind).count(),
                )
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

/// Shared screening steps for any format: blank kind cell and sentinel rows
/// are skipped, then the date must parse.
pub fn screen_row<'a>(
    row: &'a [String],
    bindings: &ColumnBindings,
    format: &StatementFormat,
) -> Result<(&'a str, NaiveDate), SkipReason> {
    let label = bindings
        .cell(row, FIELD_KIND)
        .map(str::trim)
        .unwrap_or_default();
    if label.is_empty() {
        return Err(SkipReason::BlankKindCell);
    }
    if format.sentinels.iter().any(|s| label.starts_with(s.as_str())) {
        return Err(SkipReason::SentinelRow);
    }

    let date_cell = bindings.cell(row, FIELD_DATE).unwrap_or_default();
    match parse_date_or_serial(date_cell, &format.date_format) {
        Some(date) => Ok((label, date)),
        None => Err(SkipReason::UnparseableDate),
    }
}

/// Normalize one row into an operation or a skip. Never fails: anything
/// unexpected while building the record becomes `Skip(Malformed)`.
pub fn normalize_row(
    row: &[String],
    bindings: &ColumnBindings,
    format: &StatementFormat,
    row_idx: usize,
    coercions: &mut Vec<CoercedValue>,
) -> RowOutcome {
    let (label, date) = match screen_row(row, bindings, format) {
        Ok(pair) => pair,
        Err(reason) => return RowOutcome::Skip(reason),
    };

    match build_operation(label, date, row, bindings, format, row_idx, coercions) {
        Ok(operation) => RowOutcome::Operation(operation),
        Err(err) => {
            warn!("row {}: {:#}", row_idx, err);
            RowOutcome::Skip(SkipReason::Malformed(err.to_string()))
        }
    }
}

/// Normalize every data row of a table against one format.
///
/// Only column resolution fails the file; row problems are absorbed into the
/// batch as skips and coercions.
pub fn normalize_rows(table: &Table, format: &StatementFormat) -> Result<NormalizedBatch> {
    let bindings = format.columns.resolve(&table.headers)?;
    let mut batch = NormalizedBatch::default();

    for (idx, row) in table.rows.iter().enumerate() {
        match normalize_row(row, &bindings, format, idx, &mut batch.coercions) {
            RowOutcome::Operation(operation) => batch.operations.push(operation),
            RowOutcome::Skip(reason) => batch.record_skip(idx, reason),
        }
    }

    info!(
        "{}: normalized {} operations, skipped {} rows, {} coerced values",
        format.broker,
        batch.operations.len(),
        batch.skips.len(),
        batch.coercions.len()
    );

    Ok(batch)
}

fn build_operation(
    label: &str,
    date: NaiveDate,
    row: &[String],
    bindings: &ColumnBindings,
    format: &StatementFormat,
    row_idx: usize,
    coercions: &mut Vec<CoercedValue>,
) -> Result<Operation> {
    let kind = format.classifier.classify(label);
    let policy = format.sign_policy;

    let currency = text_cell(row, bindings, FIELD_CURRENCY)
        .unwrap_or_else(|| format.currency.clone());

    let raw_amount = numeric_cell(row, bindings, FIELD_AMOUNT, row_idx, coercions);

    let detail = match kind {
        OperationKind::Trade => {
            bindings.index(FIELD_QUANTITY)?;
            bindings.index(FIELD_PRICE)?;
            OperationDetail::Trade {
                symbol: text_cell(row, bindings, FIELD_SYMBOL).unwrap_or_default(),
                quantity: policy.apply(numeric_cell(
                    row, bindings, FIELD_QUANTITY, row_idx, coercions,
                )),
                price: numeric_cell(row, bindings, FIELD_PRICE, row_idx, coercions),
                total_amount: policy.apply(raw_amount),
                commission: optional_numeric_cell(row, bindings, FIELD_COMMISSION),
                taxes: optional_numeric_cell(row, bindings, FIELD_TAXES),
            }
        }
        OperationKind::MonetaryFlow => OperationDetail::MonetaryFlow {
            direction: FlowDirection::from_sign(raw_amount),
            reference: text_cell(row, bindings, FIELD_REFERENCE),
        },
        OperationKind::SecurityFlow => {
            bindings.index(FIELD_QUANTITY)?;
            let quantity = numeric_cell(row, bindings, FIELD_QUANTITY, row_idx, coercions);
            OperationDetail::SecurityFlow {
                symbol: text_cell(row, bindings, FIELD_SYMBOL).unwrap_or_default(),
                direction: FlowDirection::from_sign(quantity),
                quantity: policy.apply(quantity),
            }
        }
        OperationKind::MutualFund => {
            bindings.index(FIELD_QUANTITY)?;
            bindings.index(FIELD_PRICE)?;
            OperationDetail::MutualFund {
                flow: FundFlow::from_label(label),
                fund_name: text_cell(row, bindings, FIELD_SYMBOL).unwrap_or_default(),
                quantity: policy.apply(numeric_cell(
                    row, bindings, FIELD_QUANTITY, row_idx, coercions,
                )),
                nav: numeric_cell(row, bindings, FIELD_PRICE, row_idx, coercions),
                total_amount: policy.apply(raw_amount),
            }
        }
    };

    Ok(Operation {
        date,
        description: label.to_string(),
        amount: policy.apply(raw_amount),
        currency,
        broker: format.broker.clone(),
        detail,
    })
}

fn text_cell(row: &[String], bindings: &ColumnBindings, field: &str) -> Option<String> {
    bindings
        .cell(row, field)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn numeric_cell(
    row: &[String],
    bindings: &ColumnBindings,
    field: &str,
    row_idx: usize,
    coercions: &mut Vec<CoercedValue>,
) -> f64 {
    let raw = bindings.cell(row, field).unwrap_or_default();
    let parsed = parse_amount(raw);
    if parsed.coerced && !raw.trim().is_empty() {
        coercions.push(CoercedValue {
            row: row_idx,
            field: field.to_string(),
            raw: raw.to_string(),
        });
    }
    parsed.value
}

fn optional_numeric_cell(row: &[String], bindings: &ColumnBindings, field: &str) -> Option<f64> {
    let raw = bindings.cell(row, field)?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(parse_amount(raw).value)
}
