//! Term counts for a document, page by page and per chunk.
//!
//! Run with a provider JSON file, or without arguments for a built-in sample:
//! ```bash
//! RUST_LOG=folios=debug cargo run --example term_counts -- volume.json
//! ```

use std::env;
use std::fs;

use folios::{
    DocumentAggregate, DocumentConfig, DocumentInput, PageInput, SchemaVersion, SectionInput,
    SectionSelect, ViewSpec,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn sample() -> DocumentInput {
    let body = |triples: &[(&str, &str, i64)]| {
        SectionInput::from_triples(triples.iter().copied()).with_lines(4, 0, 2)
    };
    DocumentInput {
        id: "sample.moby".into(),
        schema_version: SchemaVersion::V2,
        pages: vec![
            PageInput::with_body(1, body(&[("Call", "VB", 1), ("me", "PRP", 1), ("Ishmael", "NNP", 1)])),
            PageInput::with_body(2, body(&[("The", "DT", 2), ("whale", "NN", 3), ("the", "DT", 4)])),
            PageInput::with_body(3, body(&[("Whale", "NNP", 1), ("whale", "NN", 2), ("sea", "NN", 5)])),
            PageInput::with_body(4, body(&[("the", "DT", 3), ("sea", "NN", 1)])),
        ],
        advanced: None,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let input = match env::args().nth(1) {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => sample(),
    };

    let ingested = DocumentAggregate::ingest(input, DocumentConfig::default());
    for rejected in &ingested.rejected {
        eprintln!("skipped: {rejected}");
    }
    let doc = ingested.document;
    info!(document = doc.id(), pages = doc.len(), "loaded");

    let view = ViewSpec::new(SectionSelect::Body)
        .fold_case(true)
        .collapse_tag(true);

    println!("Top terms:");
    for freq in doc.term_frequencies(false, view).iter().take(10) {
        println!("  {:<16} {:>6}", freq.term, freq.count);
    }

    println!("\nTerm matrix (body, folded):");
    let matrix = doc.term_matrix(false, true);
    let header: Vec<&str> = matrix.vocabulary().iter().map(|t| &**t).collect();
    println!("  page  {}", header.join("\t"));
    for (page, row) in matrix.dense_rows() {
        let cells: Vec<String> = row.iter().map(u64::to_string).collect();
        println!("  {page:>4}  {}", cells.join("\t"));
    }

    let chunked = doc.chunk(10, view)?;
    println!("\nChunks at 10 tokens:");
    for bounds in &chunked.boundaries {
        println!("  {bounds}: {} distinct terms", chunked.table.restrict_row(bounds.chunk).terms().len());
    }

    Ok(())
}
