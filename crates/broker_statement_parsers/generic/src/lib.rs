use anyhow::Result;
use std::path::Path;

use broker_core::classify::{default_rules, KeywordClassifier};
use broker_core::columns::{ColumnSpec, ColumnTable};
use broker_core::normalize::{
    self, normalize_rows, NormalizedBatch, StatementFormat,
};
use broker_core::table::Table;
use broker_core::types::{OperationKind, SignPolicy};

pub const PARSER_NAME: &str = "generic";

/// Keyword-classified statement parser for brokers whose exports mix trades,
/// cash movements, security transfers and fund operations in one table.
///
/// The default format covers the common Spanish header spellings; brokers
/// with diverging layouts ship their own format description as JSON.
pub struct GenericStatementParser {
    pub format: StatementFormat,
}

impl GenericStatementParser {
    pub fn new() -> Self {
        Self {
            format: default_format(),
        }
    }

    pub fn with_format(format: StatementFormat) -> Self {
        Self { format }
    }

    pub fn from_format_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            format: StatementFormat::from_json_file(path)?,
        })
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<NormalizedBatch> {
        let table = Table::load(path)?;
        self.parse_table(&table)
    }

    pub fn parse_table(&self, table: &Table) -> Result<NormalizedBatch> {
        normalize_rows(table, &self.format)
    }
}

impl Default for GenericStatementParser {
    fn default() -> Self {
        Self::new()
    }
}

/// The compiled-in format: Spanish logical columns with their accented,
/// ASCII and mojibake header spellings, the shared keyword rules, and
/// as-signed amounts.
pub fn default_format() -> StatementFormat {
    StatementFormat {
        broker: "Generic".to_string(),
        columns: ColumnTable::new(vec![
            ColumnSpec::required(
                normalize::FIELD_KIND,
                &[
                    "Tipo de Operación",
                    "Tipo de Operacion",
                    "Tipo de OperaciÃ³n",
                ],
            ),
            ColumnSpec::required(
                normalize::FIELD_DATE,
                &[
                    "Fecha de Concertación",
                    "Fecha de Concertacion",
                    "Fecha de ConcertaciÃ³n",
                    "Fecha",
                ],
            ),
            ColumnSpec::optional(normalize::FIELD_SYMBOL, &["Especie", "Instrumento"]),
            ColumnSpec::optional(normalize::FIELD_QUANTITY, &["Cantidad", "Cuotapartes"]),
            ColumnSpec::optional(normalize::FIELD_PRICE, &["Precio", "Valor Cuota"]),
            ColumnSpec::required(normalize::FIELD_AMOUNT, &["Importe", "Monto"]),
            ColumnSpec::optional(normalize::FIELD_CURRENCY, &["Moneda"]),
            ColumnSpec::optional(
                normalize::FIELD_REFERENCE,
                &["Referencia", "Comprobante"],
            ),
            ColumnSpec::optional(
                normalize::FIELD_COMMISSION,
                &["Comisión", "Comision", "ComisiÃ³n"],
            ),
            ColumnSpec::optional(normalize::FIELD_TAXES, &["Impuestos", "Derechos"]),
        ]),
        classifier: KeywordClassifier::new(default_rules(), OperationKind::MonetaryFlow),
        sign_policy: SignPolicy::PreserveSign,
        sentinels: vec![
            "Tipo de Operación".to_string(),
            "Tipo de Operacion".to_string(),
        ],
        date_format: broker_core::dates::DAY_FIRST_FORMAT.to_string(),
        currency: "ARS".to_string(),
    }
}
