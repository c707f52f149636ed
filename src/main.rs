// Merchant classification CLI
// One-shot mode classifies a single description; batch mode reads a CSV
// of transactions (description[,mcc]) and writes classified rows to stdout.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;

use merchant_classifier::{Classifier, KnowledgeBase, MatchBasis};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() > 1 && args[1] == "batch" {
        let path = args
            .get(2)
            .context("Usage: merchant-classifier batch <transactions.csv>")?;
        run_batch(Path::new(path))?;
    } else if args.len() > 1 {
        run_single(&args[1], args.get(2).map(String::as_str))?;
    } else {
        eprintln!("Usage: merchant-classifier <description> [mcc]");
        eprintln!("       merchant-classifier batch <transactions.csv>");
        eprintln!();
        eprintln!("Set MERCHANT_KB to point at a custom knowledge base JSON file.");
        std::process::exit(2);
    }

    Ok(())
}

/// Load the knowledge base from MERCHANT_KB, or fall back to the builtin
fn load_knowledge() -> Result<KnowledgeBase> {
    match env::var("MERCHANT_KB") {
        Ok(path) => KnowledgeBase::from_file(&path)
            .with_context(|| format!("Failed to load knowledge base from {}", path)),
        Err(_) => KnowledgeBase::builtin().context("Builtin knowledge base is invalid"),
    }
}

fn run_single(description: &str, mcc_code: Option<&str>) -> Result<()> {
    println!("🏷️  Merchant Classifier");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let knowledge = load_knowledge()?;
    println!(
        "✓ Knowledge base: {} merchants, {} MCC codes",
        knowledge.merchant_count(),
        knowledge.mcc_count()
    );

    let classifier = Classifier::new(knowledge);
    let result = classifier.classify(description, mcc_code);

    println!();
    match &result.merchant_key {
        Some(key) => {
            let record = classifier
                .knowledge()
                .merchant(key)
                .context("matched merchant missing from knowledge base")?;
            println!("✓ Merchant:   {} ({})", record.display_name, key);
            println!("  Type:       {}", record.category_type.as_str());
        }
        None => println!("✗ Merchant:   (no match)"),
    }
    println!("  Category:   {}", result.category);
    println!("  Confidence: {}", result.confidence);
    println!("  Basis:      {}", result.match_basis.as_str());

    Ok(())
}

/// One input transaction row. The `mcc` column is optional.
#[derive(Debug, Deserialize)]
struct BatchRow {
    description: String,
    #[serde(default)]
    mcc: Option<String>,
}

fn run_batch(path: &Path) -> Result<()> {
    let knowledge = load_knowledge()?;
    let classifier = Classifier::new(knowledge);

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    writer.write_record([
        "description",
        "mcc",
        "merchant",
        "category",
        "confidence",
        "basis",
    ])?;

    let mut total = 0usize;
    let mut matched = 0usize;

    for row in reader.deserialize() {
        let row: BatchRow = row.with_context(|| format!("Bad row in {}", path.display()))?;
        let result = classifier.classify(&row.description, row.mcc.as_deref());

        total += 1;
        if result.match_basis != MatchBasis::None {
            matched += 1;
        }

        let confidence = result.confidence.to_string();
        writer.write_record([
            row.description.as_str(),
            row.mcc.as_deref().unwrap_or(""),
            result.merchant_key.as_deref().unwrap_or(""),
            result.category.as_str(),
            confidence.as_str(),
            result.match_basis.as_str(),
        ])?;
    }

    writer.flush()?;
    eprintln!("✓ Classified {} transactions ({} matched)", total, matched);

    Ok(())
}
