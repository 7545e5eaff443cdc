use anyhow::{anyhow, Result};
use log::{info, warn};
use std::path::Path;

use broker_core::table::Table;

/// One `(Instrumento, Ticker)` row of the lookup file.
#[derive(Debug, Clone)]
pub struct TickerEntry {
    pub instrument: String,
    pub ticker: String,
}

impl TickerEntry {
    pub fn new(instrument: &str, ticker: &str) -> Self {
        TickerEntry {
            instrument: instrument.to_string(),
            ticker: ticker.to_string(),
        }
    }
}

/// Instrument-name to ticker lookup loaded once from `Especies.csv`.
///
/// Matching is fuzzy: an entry matches when its instrument text contains both
/// the fund-name substring and the share-class token. An empty table never
/// fails a row; every lookup falls back to a synthesized name.
#[derive(Debug, Default)]
pub struct TickerTable {
    entries: Vec<TickerEntry>,
}

impl TickerTable {
    pub fn empty() -> Self {
        TickerTable::default()
    }

    pub fn from_entries(entries: Vec<TickerEntry>) -> Self {
        TickerTable { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let table = Table::load(path.as_ref())?;

        let instrument_idx = column_index(&table.headers, "Instrumento")?;
        let ticker_idx = column_index(&table.headers, "Ticker")?;

        let entries: Vec<TickerEntry> = table
            .rows
            .iter()
            .filter_map(|row| {
                let instrument = row.get(instrument_idx)?.trim();
                let ticker = row.get(ticker_idx)?.trim();
                if instrument.is_empty() || ticker.is_empty() {
                    return None;
                }
                Some(TickerEntry::new(instrument, ticker))
            })
            .collect();

        info!(
            "loaded {} instrument entries from {}",
            entries.len(),
            path.as_ref().display()
        );

        Ok(TickerTable { entries })
    }

    /// Load the lookup file, degrading to an empty table when it is missing
    /// or malformed so ticker resolution falls back instead of failing.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(table) => table,
            Err(err) => {
                warn!(
                    "ticker table {} unavailable ({:#}); fallback names will be used",
                    path.as_ref().display(),
                    err
                );
                TickerTable::empty()
            }
        }
    }

    /// Resolve a fund display name plus share class to a ticker.
    ///
    /// Zero matches synthesize a fallback name; multiple matches take the
    /// first in table order.
    pub fn resolve(&self, fund_name: &str, share_class: &str) -> String {
        let mut fund = fund_name.trim().to_lowercase();
        let class_token = format!("clase {}", share_class.trim().to_lowercase());

        // The broker's own name is often duplicated in the fund display name
        if let Some(stripped) = fund.strip_prefix("pellegrini") {
            fund = stripped.trim().to_string();
        }

        let matches: Vec<&TickerEntry> = self
            .entries
            .iter()
            .filter(|entry| {
                let instrument = entry.instrument.to_lowercase();
                instrument.contains(&fund) && instrument.contains(&class_token)
            })
            .collect();

        match matches.as_slice() {
            [] => {
                warn!("no ticker found for '{}' {}", fund, class_token);
                format!("pellegrini {} - {}", fund, class_token)
            }
            [entry] => entry.ticker.clone(),
            [first, rest @ ..] => {
                warn!(
                    "{} tickers match '{}' {}; using {}",
                    rest.len() + 1,
                    fund,
                    class_token,
                    first.ticker
                );
                first.ticker.clone()
            }
        }
    }
}

fn column_index(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| anyhow!("Missing required column '{}'", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> TickerTable {
        TickerTable::from_entries(vec![
            TickerEntry::new("Pellegrini Renta Pesos - Clase A", "PRPA"),
            TickerEntry::new("Pellegrini Renta Fija - Clase A", "PRFA"),
            TickerEntry::new("Pellegrini Renta Fija - Clase B", "PRFB"),
        ])
    }

    #[test]
    fn test_unique_match_returns_ticker() {
        assert_eq!(lookup().resolve("PELLEGRINI RENTA FIJA", "A"), "PRFA");
        assert_eq!(lookup().resolve("PELLEGRINI RENTA FIJA", "B"), "PRFB");
    }

    #[test]
    fn test_broker_prefix_is_stripped_once() {
        // With the leading broker name stripped, "renta pesos" still matches
        assert_eq!(lookup().resolve("Pellegrini Renta Pesos", "a"), "PRPA");
    }

    #[test]
    fn test_no_match_synthesizes_fallback() {
        let resolved = lookup().resolve("PELLEGRINI ACCIONES", "C");
        assert!(resolved.contains("acciones"));
        assert!(resolved.contains("clase c"));
    }

    #[test]
    fn test_multiple_matches_take_first_in_table_order() {
        let ambiguous = TickerTable::from_entries(vec![
            TickerEntry::new("Renta Fija Plus - Clase A", "RFP1"),
            TickerEntry::new("Renta Fija Premium - Clase A", "RFP2"),
        ]);
        assert_eq!(ambiguous.resolve("renta fija", "A"), "RFP1");
    }

    #[test]
    fn test_empty_table_always_falls_back() {
        let resolved = TickerTable::empty().resolve("Renta Pesos", "A");
        assert_eq!(resolved, "pellegrini renta pesos - clase a");
    }
}
