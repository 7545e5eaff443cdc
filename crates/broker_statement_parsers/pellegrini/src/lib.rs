use anyhow::{anyhow, Context, Result};
use log::info;
use std::path::Path;

use broker_core::classify::KeywordClassifier;
use broker_core::columns::{ColumnBindings, ColumnSpec, ColumnTable};
use broker_core::normalize::{
    screen_row, CoercedValue, NormalizedBatch, RowOutcome, StatementFormat, FIELD_AMOUNT,
    FIELD_DATE, FIELD_KIND, FIELD_PRICE, FIELD_QUANTITY,
};
use broker_core::numeric::parse_amount;
use broker_core::table::Table;
use broker_core::types::{
    FundFlow, Operation, OperationDetail, OperationKind, SignPolicy,
};

mod especies;

pub use especies::{TickerEntry, TickerTable};

pub const PARSER_NAME: &str = "pellegrini";
pub const BROKER_NAME: &str = "Pellegrini";
pub const DEFAULT_ESPECIES_FILE: &str = "Especies.csv";

/// Pellegrini-only logical fields beyond the shared normalizer set.
pub const FIELD_SHARE_CLASS: &str = "tipo_cuota";
pub const FIELD_NUMBER: &str = "numero";

/// The Pellegrini statement layout. Every accented header carries its ASCII
/// and mojibake spellings; the files reach us both ways.
pub fn pellegrini_format() -> StatementFormat {
    StatementFormat {
        broker: BROKER_NAME.to_string(),
        columns: ColumnTable::new(vec![
            ColumnSpec::required(
                FIELD_KIND,
                &[
                    "Tipo de Liquidación",
                    "Tipo de Liquidacion",
                    "Tipo de LiquidaciÃ³n",
                ],
            ),
            ColumnSpec::required(
                FIELD_DATE,
                &[
                    "Fecha de Concertación",
                    "Fecha de Concertacion",
                    "Fecha de ConcertaciÃ³n",
                ],
            ),
            ColumnSpec::required(FIELD_SHARE_CLASS, &["Tipo de Cuota"]),
            ColumnSpec::optional(FIELD_NUMBER, &["Número", "Numero", "NÃºmero"]),
            ColumnSpec::required(FIELD_QUANTITY, &["Cuotapartes"]),
            ColumnSpec::required(FIELD_PRICE, &["Valor Cuota"]),
            ColumnSpec::required(
                FIELD_AMOUNT,
                &["Inversión Neta", "Inversion Neta", "InversiÃ³n Neta"],
            ),
        ]),
        classifier: KeywordClassifier::fixed(OperationKind::MutualFund),
        sign_policy: SignPolicy::AbsoluteValue,
        // Fund banner rows repeat "Fondo <NAME>" in the settlement column
        sentinels: vec!["Fondo".to_string()],
        date_format: broker_core::dates::DAY_FIRST_FORMAT.to_string(),
        currency: "ARS".to_string(),
    }
}

/// Parser for Pellegrini mutual-fund statements.
///
/// Every data row is a fund subscription or redemption; quantities and
/// amounts are stored as magnitudes and the fund name is replaced by its
/// resolved ticker.
pub struct PellegriniParser {
    pub format: StatementFormat,
    tickers: TickerTable,
}

impl PellegriniParser {
    pub fn new() -> Self {
        Self::with_ticker_table(TickerTable::load_or_empty(DEFAULT_ESPECIES_FILE))
    }

    pub fn with_especies_file<P: AsRef<Path>>(path: P) -> Self {
        Self::with_ticker_table(TickerTable::load_or_empty(path))
    }

    pub fn with_ticker_table(tickers: TickerTable) -> Self {
        Self {
            format: pellegrini_format(),
            tickers,
        }
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<NormalizedBatch> {
        let table = Table::load(path.as_ref())
            .with_context(|| format!("Failed parsing {}", path.as_ref().display()))?;
        self.parse_table(&table)
    }

    pub fn parse_table(&self, table: &Table) -> Result<NormalizedBatch> {
        let bindings = self.format.columns.resolve(&table.headers)?;

        let fund_name = extract_fund_name(table);
        info!("processing operations for fund: {}", fund_name);

        let mut batch = NormalizedBatch::default();
        for (idx, row) in table.rows.iter().enumerate() {
            match self.normalize_row(row, &bindings, &fund_name, idx, &mut batch.coercions) {
                RowOutcome::Operation(operation) => batch.operations.push(operation),
                RowOutcome::Skip(reason) => batch.record_skip(idx, reason),
            }
        }

        info!(
            "{}: normalized {} operations, skipped {} rows, {} coerced values",
            BROKER_NAME,
            batch.operations.len(),
            batch.skips.len(),
            batch.coercions.len()
        );

        Ok(batch)
    }

    fn normalize_row(
        &self,
        row: &[String],
        bindings: &ColumnBindings,
        fund_name: &str,
        row_idx: usize,
        coercions: &mut Vec<CoercedValue>,
    ) -> RowOutcome {
        let (label, date) = match screen_row(row, bindings, &self.format) {
            Ok(pair) => pair,
            Err(reason) => return RowOutcome::Skip(reason),
        };

        let share_class = bindings
            .cell(row, FIELD_SHARE_CLASS)
            .map(str::trim)
            .unwrap_or_default();
        let ticker = self.tickers.resolve(fund_name, share_class);

        let quantity = numeric_cell(row, bindings, FIELD_QUANTITY, row_idx, coercions);
        let nav = numeric_cell(row, bindings, FIELD_PRICE, row_idx, coercions);
        let net_amount = numeric_cell(row, bindings, FIELD_AMOUNT, row_idx, coercions);

        let policy = self.format.sign_policy;

        RowOutcome::Operation(Operation {
            date,
            description: label.to_string(),
            amount: policy.apply(net_amount),
            currency: self.format.currency.clone(),
            broker: self.format.broker.clone(),
            detail: OperationDetail::MutualFund {
                flow: FundFlow::from_label(label),
                fund_name: ticker,
                quantity: policy.apply(quantity),
                nav,
                total_amount: policy.apply(net_amount),
            },
        })
    }
}

impl Default for PellegriniParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the base fund name from the statement's banner row
/// (`"Fondo PELLEGRINI RENTA PESOS"` in the first cell of the first row).
pub fn extract_fund_name(table: &Table) -> String {
    let raw = table
        .rows
        .first()
        .and_then(|row| row.first())
        .map(|cell| cell.trim())
        .unwrap_or_default();

    let name = raw.strip_prefix("Fondo").unwrap_or(raw).trim();
    if name.is_empty() {
        BROKER_NAME.to_string()
    } else {
        name.to_string()
    }
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

/// Column layout of the reconciliation export consumed downstream.
pub const EXPORT_HEADERS: [&str; 9] = [
    "fund_operation_type",
    "agreement_date",
    "settlement_term",
    "settlement_date",
    "exchange",
    "security_amount",
    "security_name",
    "net_payment_amount",
    "currency",
];

/// Render a mutual-fund operation into the export layout. Settlement data is
/// not present in the statement, so the term is "T" and the settlement date
/// equals the agreement date.
pub fn export_row(op: &Operation) -> Option<Vec<String>> {
    match &op.detail {
        OperationDetail::MutualFund {
            flow,
            fund_name,
            quantity,
            total_amount,
            ..
        } => {
            let agreement_date = op.date.format("%m/%d/%Y").to_string();
            Some(vec![
                flow.as_str().to_string(),
                agreement_date.clone(),
                "T".to_string(),
                agreement_date,
                "Mercado de Fondos".to_string(),
                quantity.to_string(),
                fund_name.clone(),
                total_amount.to_string(),
                op.currency.clone(),
            ])
        }
        _ => None,
    }
}

/// Write the reconciliation export. An empty operation set is a file-level
/// error.
pub fn write_export_csv<P: AsRef<Path>>(path: P, operations: &[Operation]) -> Result<()> {
    if operations.is_empty() {
        return Err(anyhow!("No operations to write"));
    }

    let mut writer = csv::Writer::from_path(path.as_ref())
        .with_context(|| format!("Cannot create output file {}", path.as_ref().display()))?;

    writer.write_record(EXPORT_HEADERS)?;
    for op in operations {
        if let Some(row) = export_row(op) {
            writer.write_record(row)?;
        }
    }
    writer
        .flush()
        .with_context(|| format!("Failed writing {}", path.as_ref().display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker_core::normalize::SkipReason;
    use chrono::NaiveDate;

    fn lookup() -> TickerTable {
        TickerTable::from_entries(vec![
            TickerEntry::new("Pellegrini Renta Pesos - Clase A", "PRPA"),
            TickerEntry::new("Pellegrini Renta Pesos - Clase B", "PRPB"),
        ])
    }

    fn statement() -> Table {
        Table::from_csv_bytes(
            "Tipo de Liquidación,Fecha de Concertación,Tipo de Cuota,Número,Cuotapartes,Valor Cuota,Inversión Neta\n\
             Fondo PELLEGRINI RENTA PESOS,,,,,,\n\
             Suscripción,02/01/2024,A,1001,\"1,234.56\",4.5,\"$ 5,555.52\"\n\
             Rescate,15/01/2024,A,1002,-500,4.6,\"-2,300\"\n\
             Suscripción,,A,1003,100,4.7,470\n\
             Suscripción,20/01/2024,B,1004,200,4.8,960\n"
                .as_bytes(),
        )
        .unwrap()
    }

    fn parser() -> PellegriniParser {
        PellegriniParser::with_ticker_table(lookup())
    }

    #[test]
    fn test_five_rows_yield_three_operations_two_skips() {
        let batch = parser().parse_table(&statement()).unwrap();

        assert_eq!(batch.operations.len(), 3);
        assert_eq!(batch.skips.len(), 2);
        assert!(batch
            .skips
            .iter()
            .any(|(_, reason)| *reason == SkipReason::SentinelRow));
        assert!(batch
            .skips
            .iter()
            .any(|(_, reason)| *reason == SkipReason::UnparseableDate));
    }

    #[test]
    fn test_redemption_amounts_are_magnitudes() {
        let batch = parser().parse_table(&statement()).unwrap();
        let redemption = &batch.operations[1];

        assert_eq!(
            redemption.date,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        match &redemption.detail {
            OperationDetail::MutualFund {
                flow,
                quantity,
                total_amount,
                ..
            } => {
                assert_eq!(*flow, FundFlow::Redemption);
                assert_eq!(*quantity, 500.0);
                assert_eq!(*total_amount, 2300.0);
            }
            other => panic!("expected MutualFund, got {:?}", other),
        }
        assert_eq!(redemption.amount, 2300.0);
    }

    #[test]
    fn test_fund_name_resolves_through_ticker_table() {
        let batch = parser().parse_table(&statement()).unwrap();

        let tickers: Vec<&str> = batch
            .operations
            .iter()
            .map(|op| match &op.detail {
                OperationDetail::MutualFund { fund_name, .. } => fund_name.as_str(),
                other => panic!("expected MutualFund, got {:?}", other),
            })
            .collect();

        assert_eq!(tickers, vec!["PRPA", "PRPA", "PRPB"]);
    }

    #[test]
    fn test_extract_fund_name_strips_banner_prefix() {
        assert_eq!(extract_fund_name(&statement()), "PELLEGRINI RENTA PESOS");
    }

    #[test]
    fn test_missing_ticker_table_falls_back() {
        let parser = PellegriniParser::with_ticker_table(TickerTable::empty());
        let batch = parser.parse_table(&statement()).unwrap();

        match &batch.operations[0].detail {
            OperationDetail::MutualFund { fund_name, .. } => {
                assert!(fund_name.contains("renta pesos"));
                assert!(fund_name.contains("clase a"));
            }
            other => panic!("expected MutualFund, got {:?}", other),
        }
    }

    #[test]
    fn test_export_row_layout() {
        let batch = parser().parse_table(&statement()).unwrap();
        let row = export_row(&batch.operations[1]).unwrap();

        assert_eq!(row.len(), EXPORT_HEADERS.len());
        assert_eq!(row[0], "FundRedemption");
        assert_eq!(row[1], "01/15/2024");
        assert_eq!(row[2], "T");
        assert_eq!(row[3], "01/15/2024");
        assert_eq!(row[4], "Mercado de Fondos");
        assert_eq!(row[6], "PRPA");
        assert_eq!(row[8], "ARS");
    }

    #[test]
    fn test_missing_required_column_fails_the_file() {
        let table = Table::from_csv_bytes(
            "Fecha de Concertación,Cuotapartes\n02/01/2024,100\n".as_bytes(),
        )
        .unwrap();
        assert!(parser().parse_table(&table).is_err());
    }
}
