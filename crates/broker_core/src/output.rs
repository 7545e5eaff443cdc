use anyhow::{anyhow, Context, Result};
use std::path::Path;

use crate::types::{Operation, OperationDetail};

/// Column set of the flattened output table. Fields that do not exist for an
/// operation's kind are left empty.
pub const OUTPUT_HEADERS: [&str; 13] = [
    "date",
    "operation_type",
    "description",
    "symbol",
    "quantity",
    "price",
    "amount",
    "currency",
    "flow",
    "reference",
    "commission",
    "taxes",
    "broker",
];

/// Flatten one operation into the output column set.
pub fn operation_to_row(op: &Operation) -> Vec<String> {
    let mut symbol = String::new();
    let mut quantity = String::new();
    let mut price = String::new();
    let mut flow = String::new();
    let mut reference = String::new();
    let mut commission = String::new();
    let mut taxes = String::new();

    match &op.detail {
        OperationDetail::Trade {
            symbol: s,
            quantity: q,
            price: p,
            commission: c,
            taxes: t,
            ..
        } => {
            symbol = s.clone();
            quantity = fmt_number(*q);
            price = fmt_number(*p);
            commission = c.map(fmt_number).unwrap_or_default();
            taxes = t.map(fmt_number).unwrap_or_default();
        }
        OperationDetail::MonetaryFlow {
            direction,
            reference: r,
        } => {
            flow = direction.as_str().to_string();
            reference = r.clone().unwrap_or_default();
        }
        OperationDetail::SecurityFlow {
            symbol: s,
            quantity: q,
            direction,
        } => {
            symbol = s.clone();
            quantity = fmt_number(*q);
            flow = direction.as_str().to_string();
        }
        OperationDetail::MutualFund {
            flow: fund_flow,
            fund_name,
            quantity: q,
            nav,
            ..
        } => {
            symbol = fund_name.clone();
            quantity = fmt_number(*q);
            price = fmt_number(*nav);
            flow = fund_flow.as_str().to_string();
        }
    }

    vec![
        op.date.format("%Y-%m-%d").to_string(),
        op.kind().as_str().to_string(),
        op.description.clone(),
        symbol,
        quantity,
        price,
        fmt_number(op.amount),
        op.currency.clone(),
        flow,
        reference,
        commission,
        taxes,
        op.broker.clone(),
    ]
}

/// Write the flattened operation table. An empty operation set is a
/// file-level error, matching the "empty result set" taxonomy.
pub fn write_operations_csv<P: AsRef<Path>>(path: P, operations: &[Operation]) -> Result<()> {
    if operations.is_empty() {
        return Err(anyhow!("No operations to write"));
    }

    let mut writer = csv::Writer::from_path(path.as_ref())
        .with_context(|| format!("Cannot create output file {}", path.as_ref().display()))?;

    writer.write_record(OUTPUT_HEADERS)?;
    for op in operations {
        writer.write_record(operation_to_row(op))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed writing {}", path.as_ref().display()))?;

    Ok(())
}

fn fmt_number(value: f64) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FlowDirection, FundFlow};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn test_trade_row_flattening() {
        let op = Operation {
            date: date(),
            description: "Compra de Acciones".to_string(),
            amount: -125050.0,
            currency: "ARS".to_string(),
            broker: "TestBroker".to_string(),
            detail: OperationDetail::Trade {
                symbol: "GGAL".to_string(),
                quantity: 100.0,
                price: 1250.5,
                total_amount: -125050.0,
                commission: Some(150.0),
                taxes: None,
            },
        };

        let row = operation_to_row(&op);
        assert_eq!(row[0], "2024-03-15");
        assert_eq!(row[1], "Trade");
        assert_eq!(row[3], "GGAL");
        assert_eq!(row[4], "100");
        assert_eq!(row[10], "150");
        assert_eq!(row[11], "");
    }

    #[test]
    fn test_mutual_fund_row_flattening() {
        let op = Operation {
            date: date(),
            description: "Rescate".to_string(),
            amount: 1500.0,
            currency: "ARS".to_string(),
            broker: "Pellegrini".to_string(),
            detail: OperationDetail::MutualFund {
                flow: FundFlow::Redemption,
                fund_name: "PRFA".to_string(),
                quantity: 10.0,
                nav: 150.0,
                total_amount: 1500.0,
            },
        };

        let row = operation_to_row(&op);
        assert_eq!(row[1], "MutualFund");
        assert_eq!(row[3], "PRFA");
        assert_eq!(row[5], "150");
        assert_eq!(row[8], "FundRedemption");
    }

    #[test]
    fn test_monetary_flow_row_flattening() {
        let op = Operation {
            date: date(),
            description: "Transferencia Enviada".to_string(),
            amount: -3000.0,
            currency: "ARS".to_string(),
            broker: "TestBroker".to_string(),
            detail: OperationDetail::MonetaryFlow {
                direction: FlowDirection::Out,
                reference: Some("CBU 1234".to_string()),
            },
        };

        let row = operation_to_row(&op);
        assert_eq!(row[8], "OUT");
        assert_eq!(row[9], "CBU 1234");
        assert_eq!(row[3], "");
    }

    #[test]
    fn test_empty_operation_set_is_an_error() {
        let err = write_operations_csv("/tmp/should_not_exist.csv", &[]).unwrap_err();
        assert!(err.to_string().contains("No operations"));
    }
}
