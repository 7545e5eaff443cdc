use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use encoding_rs::WINDOWS_1252;
use std::fs;
use std::path::Path;

/// An input statement loaded wholly into memory: one header row plus data
/// rows, every cell as text.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Load a statement file, dispatching on the extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Table> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(anyhow!("File not found: {}", path.display()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => {
                let bytes = fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Table::from_csv_bytes(&bytes)
            }
            "xlsx" | "xls" => Table::from_workbook(path),
            other => Err(anyhow!(
                "Unsupported input extension '.{}' (expected .csv, .xlsx or .xls)",
                other
            )),
        }
    }

    /// Parse delimited bytes into a table.
    ///
    /// Exports are UTF-8 or Windows-1252 depending on which tool produced
    /// them; a UTF-8 BOM is tolerated.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Table> {
        let text = decode_text(bytes);

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .context("Missing CSV header row")?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("CSV read error at row {}", idx + 2))?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }

        Ok(Table { headers, rows })
    }

    fn from_workbook(path: &Path) -> Result<Table> {
        let mut workbook = open_workbook_auto(path)
            .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("No sheets found in {}", path.display()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .with_context(|| format!("Failed to read sheet '{}'", sheet_name))?;

        let mut row_iter = range.rows();
        let headers: Vec<String> = row_iter
            .next()
            .ok_or_else(|| anyhow!("Worksheet '{}' is empty", sheet_name))?
            .iter()
            .map(cell_to_string)
            .collect();

        let rows = row_iter
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        Ok(Table { headers, rows })
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    let (decoded, _, _) = WINDOWS_1252.decode(bytes);
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_csv() {
        let table =
            Table::from_csv_bytes("Fecha,Importe\n01/02/2024,\"$ 1,000\"\n".as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["Fecha", "Importe"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], "$ 1,000");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("Fecha,Importe\n01/02/2024,10\n".as_bytes());
        let table = Table::from_csv_bytes(&bytes).unwrap();
        assert_eq!(table.headers[0], "Fecha");
    }

    #[test]
    fn test_windows_1252_header_decodes() {
        // "Inversión Neta" with 0xF3 for the accented o
        let mut bytes = b"Fecha,Inversi".to_vec();
        bytes.push(0xF3);
        bytes.extend_from_slice(b"n Neta\n01/02/2024,500\n");

        let table = Table::from_csv_bytes(&bytes).unwrap();
        assert_eq!(table.headers[1], "Inversión Neta");
    }

    #[test]
    fn test_short_rows_are_kept() {
        let table = Table::from_csv_bytes("A,B,C\n1,2\n".as_bytes()).unwrap();
        assert_eq!(table.rows[0].len(), 2);
    }
}
