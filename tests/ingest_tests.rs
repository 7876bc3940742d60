//! Ingestion from provider JSON across schema versions.

use std::collections::BTreeMap;

use folios::{
    AdvancedSource, CountKey, DocumentAggregate, DocumentConfig, DocumentInput, Error, PageInput,
    Position, Scalar, ScalarValue, SchemaVersion, Section, SectionInput, SectionSelect, ViewSpec,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn parse(value: serde_json::Value) -> DocumentInput {
    serde_json::from_value(value).unwrap()
}

fn empty_inline() -> serde_json::Value {
    json!({ "capAlphaSeq": 0, "beginLineChars": {}, "endLineChars": {} })
}

// =============================================================================
// Split schema (1.0 / 2.0)
// =============================================================================

fn split_document(with_companion: bool) -> DocumentInput {
    let mut doc = json!({
        "id": "mdp.39015000000001",
        "schemaVersion": "2.0",
        "pages": [
            {
                "seq": 1,
                "header": { "tokens": [["CHAPTER", "NN", 1]], "lineCount": 1 },
                "body": {
                    "tokenCount": 5,
                    "lineCount": 4,
                    "emptyLineCount": 1,
                    "sentenceCount": 2,
                    "tokens": [["The", "DT", 1], ["whale", "NN", 2], ["dived", "VBD", 1], [".", ".", 1]]
                }
            },
            {
                "seq": 2,
                "body": { "tokens": [["whale", "NN", 1]], "lineCount": 1, "sentenceCount": 1 }
            }
        ]
    });
    if with_companion {
        doc["advanced"] = json!([
            {
                "seq": 1,
                "body": { "capAlphaSeq": 3, "beginLineChars": { "T": 2, "w": 1 }, "endLineChars": { ".": 2 } }
            },
            {
                "seq": 2,
                "body": { "capAlphaSeq": 0, "beginLineChars": { "w": 1 }, "endLineChars": { "e": 1 } }
            }
        ]);
    }
    parse(doc)
}

#[test]
fn split_schema_parses_and_counts() {
    init_tracing();
    let input = split_document(false);
    assert_eq!(input.schema_version, SchemaVersion::V2);
    let ingested = DocumentAggregate::ingest(input, DocumentConfig::default());
    assert!(ingested.rejected.is_empty());

    let doc = ingested.document;
    assert_eq!(doc.page_numbers(), vec![1, 2]);
    assert_eq!(doc.tokens_per_page(SectionSelect::Body), vec![5, 1]);
    assert_eq!(doc.tokens_per_page(SectionSelect::Group), vec![6, 1]);

    let view = ViewSpec::new(SectionSelect::Body).collapse_tag(true);
    let totals = doc.counts(view, true);
    assert_eq!(totals.get(&CountKey::term("whale").with_section(Section::Body)), 3);
}

#[test]
fn split_schema_without_companion_reports_unavailable() {
    init_tracing();
    let doc = DocumentAggregate::ingest(split_document(false), DocumentConfig::default()).document;
    let page = doc.page(1).unwrap();
    assert_eq!(page.record().advanced_source(), AdvancedSource::Missing);
    assert_eq!(
        doc.edge_chars(SectionSelect::Body, Position::Start).unwrap_err(),
        Error::UnavailableFeature {
            page: 1,
            feature: "beginLineChars"
        }
    );
    assert!(matches!(
        doc.scalars(Scalar::CapAlphaSeqMax, SectionSelect::Body),
        Err(Error::UnavailableFeature { page: 1, .. })
    ));
    // Basic features never depend on the companion.
    assert_eq!(
        doc.scalars(Scalar::SentenceCount, SectionSelect::Body).unwrap(),
        vec![(1, ScalarValue::Total(2)), (2, ScalarValue::Total(1))]
    );
}

#[test]
fn split_schema_with_companion_exposes_advanced() {
    init_tracing();
    let doc = DocumentAggregate::ingest(split_document(true), DocumentConfig::default()).document;
    assert!(doc.pages().iter().all(|p| p.has_advanced()));

    let starts = doc.edge_chars(SectionSelect::Group, Position::Start).unwrap();
    assert_eq!(starts.get(&CountKey::term("T").with_row(1)), 2);
    assert_eq!(starts.get(&CountKey::term("w").with_row(2)), 1);
    assert_eq!(starts.total(), 4);

    let caps = doc.scalars(Scalar::CapAlphaSeqMax, SectionSelect::Body).unwrap();
    assert_eq!(caps, vec![(1, ScalarValue::Total(3)), (2, ScalarValue::Total(0))]);
}

#[test]
fn unmatched_companion_is_ignored() {
    init_tracing();
    let mut input = split_document(true);
    if let Some(advanced) = input.advanced.as_mut() {
        advanced[1].page_number = 9;
    }
    let ingested = DocumentAggregate::ingest(input, DocumentConfig::default());
    assert!(ingested.rejected.is_empty());
    let doc = ingested.document;
    assert!(doc.page(1).unwrap().has_advanced());
    assert!(!doc.page(2).unwrap().has_advanced());
}

#[test]
fn advanced_fields_in_split_basic_record_are_rejected() {
    init_tracing();
    let input = parse(json!({
        "id": "x",
        "schemaVersion": "1.0",
        "pages": [
            { "seq": 1, "body": { "tokens": [["a", "DT", 1]], "capAlphaSeq": 2 } },
            { "seq": 2, "body": { "tokens": [["b", "NN", 1]] } }
        ]
    }));
    let ingested = DocumentAggregate::ingest(input, DocumentConfig::default());
    assert_eq!(ingested.document.page_numbers(), vec![2]);
    assert_eq!(ingested.rejected.len(), 1);
    assert_eq!(ingested.rejected[0].page, 1);
}

// =============================================================================
// Inline schema (3.0)
// =============================================================================

#[test]
fn inline_schema_carries_advanced_fields() {
    init_tracing();
    let input = parse(json!({
        "id": "inline.1",
        "schemaVersion": "https://schemas.hathitrust.org/EF_Schema_FeaturesSubSchema_v_3.0",
        "pages": [{
            "seq": 1,
            "header": empty_inline(),
            "footer": empty_inline(),
            "body": {
                "tokens": [["Call", "VB", 1], ["me", "PRP", 1], ["Ishmael", "NNP", 1]],
                "lineCount": 1,
                "sentenceCount": 1,
                "capAlphaSeq": 1,
                "beginLineChars": { "C": 1 },
                "endLineChars": { "l": 1 }
            }
        }]
    }));
    assert_eq!(input.schema_version, SchemaVersion::V3);
    let ingested = DocumentAggregate::ingest(input, DocumentConfig::default());
    assert!(ingested.rejected.is_empty());
    let doc = ingested.document;
    assert_eq!(
        doc.page(1).unwrap().record().advanced_source(),
        AdvancedSource::Inline
    );
    let ends = doc.edge_chars(SectionSelect::Body, Position::End).unwrap();
    assert_eq!(
        ends.get(&CountKey::term("l").with_row(1).with_section(Section::Body)),
        1
    );
}

#[test]
fn inline_schema_without_advanced_fields_is_rejected() {
    init_tracing();
    let input = parse(json!({
        "id": "inline.2",
        "schemaVersion": "3.0",
        "pages": [{ "seq": 1, "body": { "tokens": [["a", "DT", 1]] } }]
    }));
    let ingested = DocumentAggregate::ingest(input, DocumentConfig::default());
    assert!(ingested.document.is_empty());
    assert!(matches!(
        ingested.rejected[0].source,
        Error::InconsistentSchema { page: 1, .. }
    ));
}

#[test]
fn inline_schema_with_companion_is_rejected() {
    init_tracing();
    let input = parse(json!({
        "id": "inline.3",
        "schemaVersion": "3.0",
        "pages": [{
            "seq": 1,
            "header": empty_inline(),
            "body": empty_inline(),
            "footer": empty_inline()
        }],
        "advanced": [{ "seq": 1 }]
    }));
    let ingested = DocumentAggregate::ingest(input, DocumentConfig::default());
    assert_eq!(ingested.rejected.len(), 1);
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn unknown_schema_version_fails_to_parse() {
    let result: Result<DocumentInput, _> = serde_json::from_value(json!({
        "id": "x",
        "schemaVersion": "4.0",
        "pages": []
    }));
    assert!(result.is_err());
}

#[test]
fn declared_token_count_must_match() {
    init_tracing();
    let input = parse(json!({
        "id": "x",
        "schemaVersion": "2.0",
        "pages": [
            { "seq": 1, "body": { "tokenCount": 3, "tokens": [["a", "DT", 1]] } },
            { "seq": 2, "body": { "tokenCount": 1, "tokens": [["a", "DT", 1]] } }
        ]
    }));
    let ingested = DocumentAggregate::ingest(input, DocumentConfig::default());
    assert_eq!(ingested.document.page_numbers(), vec![2]);
    let message = ingested.rejected[0].to_string();
    assert!(message.contains("tokenCount"), "{message}");
}

#[test]
fn rejected_page_leaves_its_number_free() {
    init_tracing();
    let input = parse(json!({
        "id": "x",
        "schemaVersion": "2.0",
        "pages": [
            { "seq": 1, "body": { "tokens": [["a", "DT", 1]] } },
            { "seq": 2, "body": { "tokens": [["b", "NN", -1]] } },
            { "seq": 2, "body": { "tokens": [["b", "NN", 4]] } }
        ]
    }));
    let ingested = DocumentAggregate::ingest(input, DocumentConfig::default());
    assert_eq!(ingested.document.page_numbers(), vec![1, 2]);
    assert_eq!(ingested.rejected.len(), 1);
    assert!(matches!(
        ingested.rejected[0].source,
        Error::InconsistentSchema { page: 2, .. }
    ));
    let page = ingested.document.page(2).unwrap();
    assert_eq!(page.token_count(SectionSelect::Body), 4);
}

#[test]
fn repeated_page_number_rejects_later_page() {
    init_tracing();
    let input = parse(json!({
        "id": "x",
        "schemaVersion": "2.0",
        "pages": [
            { "seq": 1, "body": { "tokens": [["a", "DT", 2]] } },
            { "seq": 1, "body": { "tokens": [["a", "DT", 7]] } }
        ]
    }));
    let ingested = DocumentAggregate::ingest(input, DocumentConfig::default());
    assert_eq!(ingested.document.page_numbers(), vec![1]);
    assert_eq!(ingested.document.page(1).unwrap().token_count(SectionSelect::Body), 2);
    let message = ingested.rejected[0].to_string();
    assert!(message.contains("duplicate"), "{message}");
}

#[test]
fn edge_characters_must_be_single_graphemes() {
    init_tracing();
    let body = |key: &str| {
        let mut begin = BTreeMap::new();
        begin.insert(key.to_owned(), 1);
        folios::AdvancedSectionInput {
            cap_alpha_seq_max: 0,
            begin_line_chars: begin,
            end_line_chars: BTreeMap::new(),
        }
    };
    let companion = |seq, key: &str| folios::AdvancedPageInput {
        page_number: seq,
        body: body(key),
        ..folios::AdvancedPageInput::default()
    };
    let input = DocumentInput {
        id: "x".into(),
        schema_version: SchemaVersion::V2,
        pages: (1..=3)
            .map(|n| PageInput::with_body(n, SectionInput::from_triples([("a", "DT", 1)])))
            .collect(),
        // "e" + combining acute is one grapheme; "ab" is two.
        advanced: Some(vec![
            companion(1, "e\u{301}"),
            companion(2, "ab"),
            companion(3, "\u{1F600}"),
        ]),
    };
    let ingested = DocumentAggregate::ingest(input, DocumentConfig::default());
    assert_eq!(ingested.document.page_numbers(), vec![1, 3]);
    assert_eq!(ingested.rejected[0].page, 2);
}

#[test]
fn nested_pos_counts_match_triples() {
    let nested = SectionInput::from_pos_counts([
        ("run".to_owned(), vec![("VB".to_owned(), 2), ("NN".to_owned(), 1)]),
        ("fast".to_owned(), vec![("RB".to_owned(), 1)]),
    ]);
    let flat = SectionInput::from_triples([("run", "VB", 2), ("run", "NN", 1), ("fast", "RB", 1)]);
    let build = |body| {
        let input = DocumentInput {
            id: "x".into(),
            schema_version: SchemaVersion::V2,
            pages: vec![PageInput::with_body(1, body)],
            advanced: None,
        };
        DocumentAggregate::ingest(input, DocumentConfig::default()).document
    };
    let view = ViewSpec::general();
    assert_eq!(
        build(nested).counts(view, false),
        build(flat).counts(view, false)
    );
}
