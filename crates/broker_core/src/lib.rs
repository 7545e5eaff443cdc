pub mod classify;
pub mod columns;
pub mod dates;
pub mod normalize;
pub mod numeric;
pub mod output;
pub mod table;
pub mod types;

// Re-export commonly used items
pub use crate::classify::KeywordClassifier;
pub use crate::columns::{ColumnBindings, ColumnSpec, ColumnTable};
pub use crate::dates::{parse_date, parse_date_or_serial, parse_date_with};
pub use crate::normalize::{
    normalize_rows, NormalizedBatch, RowOutcome, SkipReason, StatementFormat,
};
pub use crate::numeric::{parse_amount, ParsedAmount};
pub use crate::output::write_operations_csv;
pub use crate::table::Table;
pub use crate::types::{
    FlowDirection, FundFlow, Operation, OperationDetail, OperationKind, SignPolicy,
};
