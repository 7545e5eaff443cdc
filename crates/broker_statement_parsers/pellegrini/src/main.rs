use anyhow::{Context, Result};
use broker_core::types::{FundFlow, OperationDetail};
use pellegrini::PellegriniParser;
use std::env;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    env_logger::init();

    // Usage:
    //   pellegrini <movimientos.(csv|xlsx|xls)> [output.csv] [Especies.csv]
    //
    // Defaults:
    //   output: <input stem>_parsed.csv next to the input
    //   especies: Especies.csv in the current directory

    let args: Vec<String> = env::args().collect();

    let Some(input) = args.get(1) else {
        println!("Usage: pellegrini <movimientos.(csv|xlsx|xls)> [output.csv] [Especies.csv]");
        return Ok(());
    };

    let output = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output_path(input));

    let parser = match args.get(3) {
        Some(especies) => PellegriniParser::with_especies_file(especies),
        None => PellegriniParser::new(),
    };

    println!("📖 Parsing: {}", input);
    let batch = parser
        .parse_file(input)
        .with_context(|| format!("Failed parsing {}", input))?;

    pellegrini::write_export_csv(&output, &batch.operations)
        .with_context(|| format!("Failed writing {}", output.display()))?;

    let redemptions = batch
        .operations
        .iter()
        .filter(|op| {
            matches!(
                &op.detail,
                OperationDetail::MutualFund {
                    flow: FundFlow::Redemption,
                    ..
                }
            )
        })
        .count();

    println!("\n📊 Summary:");
    println!("─────────────────────────────────────────");
    println!("✓ Fund operations: {}", batch.operations.len());
    println!("  - Subscriptions: {}", batch.operations.len() - redemptions);
    println!("  - Redemptions: {}", redemptions);
    println!("✓ Skipped rows: {}", batch.skips.len());
    if !batch.coercions.is_empty() {
        println!(
            "⚠️  Values coerced to 0.0: {} (run with RUST_LOG=warn for details)",
            batch.coercions.len()
        );
    }
    println!("─────────────────────────────────────────");
    println!("✅ Output written to: {}", output.display());

    Ok(())
}

fn default_output_path(input: &str) -> PathBuf {
    let path = Path::new(input);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("parsed");
    path.with_file_name(format!("{}_parsed.csv", stem))
}
