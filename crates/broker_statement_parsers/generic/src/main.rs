use anyhow::{Context, Result};
use generic_parser::GenericStatementParser;
use std::env;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    env_logger::init();

    // Usage:
    //   generic_parser <input.(csv|xlsx|xls)> [output.csv] [format.json]
    //
    // Defaults:
    //   output: <input stem>_parsed.csv next to the input
    //   format: compiled-in Spanish statement layout

    let args: Vec<String> = env::args().collect();

    let Some(input) = args.get(1) else {
        println!("Usage: generic_parser <input.(csv|xlsx|xls)> [output.csv] [format.json]");
        return Ok(());
    };

    let output = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output_path(input));

    let parser = match args.get(3) {
        Some(format_path) => {
            println!("📖 Loading format from: {}", format_path);
            GenericStatementParser::from_format_file(format_path)?
        }
        None => GenericStatementParser::new(),
    };

    println!("📖 Parsing: {}", input);
    let batch = parser
        .parse_file(input)
        .with_context(|| format!("Failed parsing {}", input))?;

    broker_core::write_operations_csv(&output, &batch.operations)
        .with_context(|| format!("Failed writing {}", output.display()))?;

    println!("\n📊 Summary:");
    println!("─────────────────────────────────────────");
    println!("✓ Operations: {}", batch.operations.len());
    for (kind, count) in batch.kind_counts() {
        println!("  - {}: {}", kind.as_str(), count);
    }
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
