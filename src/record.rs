//! Raw page records: the unit of input.
//!
//! ## Schema Versions
//!
//! Input comes in several schema revisions. The difference that matters here
//! is *where* the advanced per-section fields live:
//!
//! ```text
//! V1 / V2 (split):   basic record      advanced companion record
//!                    +-------------+   +-----------------------+
//!                    | tokens      |   | capAlphaSeq           |
//!                    | lineCount   |   | beginLineChars        |
//!                    | ...         |   | endLineChars          |
//!                    +-------------+   +-----------------------+
//!
//! V3 (inline):       one record carrying everything
//! ```
//!
//! Under a split schema the companion is optional. A page built without one
//! reports [`AdvancedSource::Missing`], and every accessor for an advanced
//! field fails with [`Error::UnavailableFeature`] instead of pretending the
//! value is zero.
//!
//! ## Validation
//!
//! Validation happens exactly once, in [`RawPageRecord::new`]. Everything
//! downstream (folding, collapsing, merging, chunking) works on records that
//! are already known to be consistent and therefore cannot fail.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::section::{Position, Section};

const SCHEMA_3_URL: &str = "https://schemas.hathitrust.org/EF_Schema_FeaturesSubSchema_v_3.0";

/// Input format revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum SchemaVersion {
    /// 1.0: split basic/advanced files.
    V1,
    /// 2.0: split basic/advanced files.
    V2,
    /// 3.0: advanced fields inline.
    V3,
}

impl SchemaVersion {
    /// Whether advanced fields ship in a separate companion record.
    #[must_use]
    pub const fn requires_companion(self) -> bool {
        !matches!(self, Self::V3)
    }
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "1.0" => Ok(Self::V1),
            "2.0" => Ok(Self::V2),
            "3.0" | SCHEMA_3_URL => Ok(Self::V3),
            other => Err(format!("unsupported schema version: {other}")),
        }
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::V1 => "1.0",
            Self::V2 => "2.0",
            Self::V3 => "3.0",
        })
    }
}

// =============================================================================
// Input shapes
// =============================================================================

/// One `(token, tag, count)` triple as supplied by the provider.
///
/// Deserializes from a three-element array: `["cat", "NN", 2]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenEntry(pub String, pub String, pub i64);

/// One section of a basic page record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionInput {
    /// `(token, tag, count)` triples.
    pub tokens: Vec<TokenEntry>,
    /// Declared token total; checked against the triples when present.
    pub token_count: Option<i64>,
    /// Number of physical lines.
    pub line_count: i64,
    /// Number of empty lines.
    pub empty_line_count: i64,
    /// Number of sentences.
    pub sentence_count: i64,
    /// Longest capital-letter run at line starts (inline schemas only).
    #[serde(alias = "capAlphaSeq")]
    pub cap_alpha_seq_max: Option<i64>,
    /// Line-initial character tallies (inline schemas only).
    pub begin_line_chars: Option<BTreeMap<String, i64>>,
    /// Line-final character tallies (inline schemas only).
    pub end_line_chars: Option<BTreeMap<String, i64>>,
}

impl SectionInput {
    /// Build a section from `(token, tag, count)` triples.
    pub fn from_triples<I, S, T>(triples: I) -> Self
    where
        I: IntoIterator<Item = (S, T, i64)>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            tokens: triples
                .into_iter()
                .map(|(token, tag, count)| TokenEntry(token.into(), tag.into(), count))
                .collect(),
            ..Self::default()
        }
    }

    /// Build a section from the nested `token -> tag -> count` layout used by
    /// Extracted Features files (`tokenPosCount`).
    pub fn from_pos_counts<I, P>(pos_counts: I) -> Self
    where
        I: IntoIterator<Item = (String, P)>,
        P: IntoIterator<Item = (String, i64)>,
    {
        Self {
            tokens: pos_counts
                .into_iter()
                .flat_map(|(token, tags)| {
                    tags.into_iter()
                        .map(move |(tag, count)| TokenEntry(token.clone(), tag, count))
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Set line, empty-line and sentence counts.
    #[must_use]
    pub fn with_lines(mut self, lines: i64, empty_lines: i64, sentences: i64) -> Self {
        self.line_count = lines;
        self.empty_line_count = empty_lines;
        self.sentence_count = sentences;
        self
    }

    /// Attach inline advanced fields.
    #[must_use]
    pub fn with_advanced(mut self, advanced: AdvancedSectionInput) -> Self {
        self.cap_alpha_seq_max = Some(advanced.cap_alpha_seq_max);
        self.begin_line_chars = Some(advanced.begin_line_chars);
        self.end_line_chars = Some(advanced.end_line_chars);
        self
    }

    fn has_advanced_fields(&self) -> bool {
        self.cap_alpha_seq_max.is_some()
            || self.begin_line_chars.is_some()
            || self.end_line_chars.is_some()
    }
}

/// A basic page record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInput {
    /// 1-based page number.
    #[serde(alias = "seq")]
    pub page_number: u32,
    /// Running header.
    #[serde(default)]
    pub header: SectionInput,
    /// Main text block.
    #[serde(default)]
    pub body: SectionInput,
    /// Running footer.
    #[serde(default)]
    pub footer: SectionInput,
}

impl PageInput {
    /// A page with only a body section.
    #[must_use]
    pub fn with_body(page_number: u32, body: SectionInput) -> Self {
        Self {
            page_number,
            body,
            ..Self::default()
        }
    }

    /// The input for one section.
    #[must_use]
    pub fn section(&self, section: Section) -> &SectionInput {
        match section {
            Section::Header => &self.header,
            Section::Body => &self.body,
            Section::Footer => &self.footer,
        }
    }
}

/// Advanced fields for one section of a companion record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvancedSectionInput {
    /// Longest capital-letter run at line starts.
    #[serde(alias = "capAlphaSeq")]
    pub cap_alpha_seq_max: i64,
    /// Line-initial character tallies.
    pub begin_line_chars: BTreeMap<String, i64>,
    /// Line-final character tallies.
    pub end_line_chars: BTreeMap<String, i64>,
}

/// A companion "advanced" record for one page of a split-schema document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedPageInput {
    /// Page number this companion belongs to.
    #[serde(alias = "seq")]
    pub page_number: u32,
    /// Running header.
    #[serde(default)]
    pub header: AdvancedSectionInput,
    /// Main text block.
    #[serde(default)]
    pub body: AdvancedSectionInput,
    /// Running footer.
    #[serde(default)]
    pub footer: AdvancedSectionInput,
}

impl AdvancedPageInput {
    fn section(&self, section: Section) -> &AdvancedSectionInput {
        match section {
            Section::Header => &self.header,
            Section::Body => &self.body,
            Section::Footer => &self.footer,
        }
    }
}

/// Everything the record provider hands over for one document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInput {
    /// Document identifier.
    pub id: String,
    /// Schema revision shared by every page.
    pub schema_version: SchemaVersion,
    /// Basic per-page records.
    pub pages: Vec<PageInput>,
    /// Companion records, when the provider supplied them.
    #[serde(default)]
    pub advanced: Option<Vec<AdvancedPageInput>>,
}

// =============================================================================
// Validated record
// =============================================================================

/// One `(token, tag)` count of a validated record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCount {
    /// Surface token, case preserved.
    pub token: Arc<str>,
    /// Part-of-speech tag.
    pub tag: Arc<str>,
    /// Occurrences (always > 0).
    pub count: u64,
}

/// Advanced per-section fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvancedSection {
    /// Longest capital-letter run at line starts.
    pub cap_alpha_seq_max: u64,
    /// Line-initial character tallies, keyed by grapheme.
    pub begin_chars: BTreeMap<Arc<str>, u64>,
    /// Line-final character tallies, keyed by grapheme.
    pub end_chars: BTreeMap<Arc<str>, u64>,
}

impl AdvancedSection {
    /// Tallies for one line position.
    #[must_use]
    pub fn chars(&self, position: Position) -> &BTreeMap<Arc<str>, u64> {
        match position {
            Position::Start => &self.begin_chars,
            Position::End => &self.end_chars,
        }
    }
}

/// Where a page's advanced fields came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvancedSource {
    /// Carried by the basic record itself (inline schema).
    Inline,
    /// Merged in from a companion record (split schema).
    Companion,
    /// Split schema, no companion supplied.
    Missing,
}

/// One validated section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionRecord {
    tokens: Vec<TokenCount>,
    token_total: u64,
    line_count: u64,
    empty_line_count: u64,
    sentence_count: u64,
    advanced: Option<AdvancedSection>,
}

impl SectionRecord {
    /// Sum of all token counts in this section.
    #[must_use]
    pub fn token_total(&self) -> u64 {
        self.token_total
    }

    /// Number of physical lines.
    #[must_use]
    pub fn line_count(&self) -> u64 {
        self.line_count
    }

    /// Number of empty lines.
    #[must_use]
    pub fn empty_line_count(&self) -> u64 {
        self.empty_line_count
    }

    /// Number of sentences.
    #[must_use]
    pub fn sentence_count(&self) -> u64 {
        self.sentence_count
    }

    /// Advanced fields, if available.
    #[must_use]
    pub fn advanced(&self) -> Option<&AdvancedSection> {
        self.advanced.as_ref()
    }
}

/// An immutable, validated page of counts.
#[derive(Debug)]
pub struct RawPageRecord {
    document_id: Arc<str>,
    page: u32,
    schema: SchemaVersion,
    source: AdvancedSource,
    sections: [SectionRecord; 3],
    token_reads: AtomicUsize,
}

impl RawPageRecord {
    /// Validate a basic page record and its optional companion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InconsistentSchema`] when:
    /// - the page number is 0, or the companion's page number differs
    /// - any count is negative
    /// - a declared `tokenCount` disagrees with the triples
    /// - a split-schema basic record carries advanced fields
    /// - an inline-schema record lacks advanced fields, or has a companion
    /// - an edge-character key is not exactly one grapheme
    ///
    /// ```rust
    /// use folios::{Error, PageInput, RawPageRecord, SchemaVersion, SectionInput};
    ///
    /// let body = || SectionInput::from_triples([("The", "DT", 1), ("end", "NN", 1)]);
    ///
    /// // Inline schema pages must carry advanced fields.
    /// let inline = RawPageRecord::new("doc", SchemaVersion::V3, PageInput::with_body(1, body()), None);
    /// assert!(matches!(inline, Err(Error::InconsistentSchema { page: 1, .. })));
    ///
    /// let split = RawPageRecord::new("doc", SchemaVersion::V2, PageInput::with_body(1, body()), None);
    /// assert_eq!(split.unwrap().section(folios::Section::Body).token_total(), 2);
    /// ```
    pub fn new(
        document_id: impl Into<Arc<str>>,
        schema: SchemaVersion,
        input: PageInput,
        companion: Option<AdvancedPageInput>,
    ) -> Result<Self> {
        let page = input.page_number;
        if page == 0 {
            return Err(Error::inconsistent(page, "page numbers are 1-based"));
        }

        let source = match (schema.requires_companion(), &companion) {
            (true, Some(c)) if c.page_number != page => {
                return Err(Error::inconsistent(
                    page,
                    format!("companion record is for page {}", c.page_number),
                ));
            }
            (true, Some(_)) => AdvancedSource::Companion,
            (true, None) => AdvancedSource::Missing,
            (false, Some(_)) => {
                return Err(Error::inconsistent(
                    page,
                    format!("schema {schema} does not use companion records"),
                ));
            }
            (false, None) => AdvancedSource::Inline,
        };

        let mut tags = HashMap::new();
        let mut build = |section: Section| -> Result<SectionRecord> {
            let basic = input.section(section);
            let advanced = match source {
                AdvancedSource::Inline => Some(inline_advanced(page, section, basic)?),
                AdvancedSource::Companion => {
                    if basic.has_advanced_fields() {
                        return Err(Error::inconsistent(
                            page,
                            format!(
                                "{section}: advanced fields in a basic record of schema {schema}"
                            ),
                        ));
                    }
                    companion
                        .as_ref()
                        .map(|c| advanced_section(page, section, c.section(section)))
                        .transpose()?
                }
                AdvancedSource::Missing => {
                    if basic.has_advanced_fields() {
                        return Err(Error::inconsistent(
                            page,
                            format!(
                                "{section}: advanced fields in a basic record of schema {schema}"
                            ),
                        ));
                    }
                    None
                }
            };
            section_record(page, section, basic, advanced, &mut tags)
        };

        let sections = [
            build(Section::Header)?,
            build(Section::Body)?,
            build(Section::Footer)?,
        ];

        Ok(Self {
            document_id: document_id.into(),
            page,
            schema,
            source,
            sections,
            token_reads: AtomicUsize::new(0),
        })
    }

    /// Identifier of the document this page belongs to.
    #[must_use]
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// 1-based page number.
    #[must_use]
    pub fn page_number(&self) -> u32 {
        self.page
    }

    /// Schema revision the page was read under.
    #[must_use]
    pub fn schema_version(&self) -> SchemaVersion {
        self.schema
    }

    /// Where the advanced fields came from.
    #[must_use]
    pub fn advanced_source(&self) -> AdvancedSource {
        self.source
    }

    /// Validated data for one section.
    #[must_use]
    pub fn section(&self, section: Section) -> &SectionRecord {
        &self.sections[section as usize]
    }

    /// Token counts of one section.
    ///
    /// Every call is tallied in [`Self::token_reads`].
    pub fn tokens(&self, section: Section) -> &[TokenCount] {
        self.token_reads.fetch_add(1, Ordering::Relaxed);
        &self.section(section).tokens
    }

    /// How many times token counts were enumerated from this record.
    #[must_use]
    pub fn token_reads(&self) -> usize {
        self.token_reads.load(Ordering::Relaxed)
    }

    /// Advanced fields of one section.
    ///
    /// # Errors
    ///
    /// [`Error::UnavailableFeature`] when no companion record was supplied.
    pub fn advanced(&self, section: Section, feature: &'static str) -> Result<&AdvancedSection> {
        self.section(section)
            .advanced
            .as_ref()
            .ok_or(Error::UnavailableFeature {
                page: self.page,
                feature,
            })
    }
}

fn non_negative(page: u32, what: impl fmt::Display, value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| Error::inconsistent(page, format!("{what}: negative count {value}")))
}

fn section_record(
    page: u32,
    section: Section,
    input: &SectionInput,
    advanced: Option<AdvancedSection>,
    tags: &mut HashMap<String, Arc<str>>,
) -> Result<SectionRecord> {
    // Duplicate (token, tag) triples are summed; zero counts are dropped.
    let mut merged: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    for TokenEntry(token, tag, count) in &input.tokens {
        let count = non_negative(page, format_args!("{section} token {token:?}"), *count)?;
        if count > 0 {
            *merged.entry((token.as_str(), tag.as_str())).or_insert(0) += count;
        }
    }

    let token_total = merged.values().sum();
    if let Some(declared) = input.token_count {
        let declared = non_negative(page, format_args!("{section} tokenCount"), declared)?;
        if declared != token_total {
            return Err(Error::inconsistent(
                page,
                format!("{section}: tokenCount {declared} but tokens sum to {token_total}"),
            ));
        }
    }

    let tokens = merged
        .into_iter()
        .map(|((token, tag), count)| {
            let tag = tags
                .entry(tag.to_owned())
                .or_insert_with(|| Arc::from(tag))
                .clone();
            TokenCount {
                token: Arc::from(token),
                tag,
                count,
            }
        })
        .collect();

    Ok(SectionRecord {
        tokens,
        token_total,
        line_count: non_negative(page, format_args!("{section} lineCount"), input.line_count)?,
        empty_line_count: non_negative(
            page,
            format_args!("{section} emptyLineCount"),
            input.empty_line_count,
        )?,
        sentence_count: non_negative(
            page,
            format_args!("{section} sentenceCount"),
            input.sentence_count,
        )?,
        advanced,
    })
}

fn inline_advanced(page: u32, section: Section, input: &SectionInput) -> Result<AdvancedSection> {
    let (Some(cap), Some(begin), Some(end)) = (
        input.cap_alpha_seq_max,
        input.begin_line_chars.as_ref(),
        input.end_line_chars.as_ref(),
    ) else {
        return Err(Error::inconsistent(
            page,
            format!("{section}: inline schema record lacks advanced fields"),
        ));
    };
    Ok(AdvancedSection {
        cap_alpha_seq_max: non_negative(page, format_args!("{section} capAlphaSeq"), cap)?,
        begin_chars: char_tallies(page, section, begin)?,
        end_chars: char_tallies(page, section, end)?,
    })
}

fn advanced_section(
    page: u32,
    section: Section,
    input: &AdvancedSectionInput,
) -> Result<AdvancedSection> {
    Ok(AdvancedSection {
        cap_alpha_seq_max: non_negative(
            page,
            format_args!("{section} capAlphaSeq"),
            input.cap_alpha_seq_max,
        )?,
        begin_chars: char_tallies(page, section, &input.begin_line_chars)?,
        end_chars: char_tallies(page, section, &input.end_line_chars)?,
    })
}

fn char_tallies(
    page: u32,
    section: Section,
    input: &BTreeMap<String, i64>,
) -> Result<BTreeMap<Arc<str>, u64>> {
    let mut out = BTreeMap::new();
    for (ch, count) in input {
        if ch.graphemes(true).count() != 1 {
            return Err(Error::inconsistent(
                page,
                format!("{section}: edge character key {ch:?} is not a single character"),
            ));
        }
        let count = non_negative(page, format_args!("{section} edge char {ch:?}"), *count)?;
        if count > 0 {
            out.insert(Arc::from(ch.as_str()), count);
        }
    }
    Ok(out)
}
