//! Page sections, section selectors and per-section scalar features.
//!
//! A digitized page is segmented into three physical regions:
//!
//! ```text
//! +---------------------------+
//! | header   (running title)  |
//! +---------------------------+
//! |                           |
//! | body                      |
//! |                           |
//! +---------------------------+
//! | footer   (page number)    |
//! +---------------------------+
//! ```
//!
//! Queries name either one of those regions or one of two derived views:
//! `Group` sums the three regions into one, `All` keeps them side by side.

use std::fmt;
use std::str::FromStr;

/// A physical region of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    /// Running header.
    Header,
    /// Main text block.
    Body,
    /// Running footer.
    Footer,
}

impl Section {
    /// All sections, in layout order.
    pub const ALL: [Self; 3] = [Self::Header, Self::Body, Self::Footer];

    /// Lowercase name as used in input records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Body => "body",
            Self::Footer => "footer",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which section(s) a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SectionSelect {
    /// Only the header.
    Header,
    /// Only the body.
    #[default]
    Body,
    /// Only the footer.
    Footer,
    /// Header, body and footer summed together; the section dimension is dropped.
    Group,
    /// Header, body and footer kept separate.
    All,
}

impl SectionSelect {
    /// The single section this selector names, if any.
    #[must_use]
    pub const fn single(self) -> Option<Section> {
        match self {
            Self::Header => Some(Section::Header),
            Self::Body => Some(Section::Body),
            Self::Footer => Some(Section::Footer),
            Self::Group | Self::All => None,
        }
    }

    /// Whether `section` is covered by this selector.
    #[must_use]
    pub fn covers(self, section: Section) -> bool {
        self.single().map_or(true, |s| s == section)
    }

    /// Whether results keep a section dimension.
    #[must_use]
    pub const fn keeps_section(self) -> bool {
        !matches!(self, Self::Group)
    }
}

impl From<Section> for SectionSelect {
    fn from(section: Section) -> Self {
        match section {
            Section::Header => Self::Header,
            Section::Body => Self::Body,
            Section::Footer => Self::Footer,
        }
    }
}

impl FromStr for SectionSelect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "header" => Ok(Self::Header),
            "body" => Ok(Self::Body),
            "footer" => Ok(Self::Footer),
            "group" => Ok(Self::Group),
            "all" => Ok(Self::All),
            other => Err(format!("unknown section: {other}")),
        }
    }
}

/// Where on a physical line an edge character sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// First character of the line.
    Start,
    /// Last character of the line.
    End,
}

/// A per-section scalar feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    /// Number of physical lines.
    LineCount,
    /// Number of empty lines.
    EmptyLineCount,
    /// Number of sentences.
    SentenceCount,
    /// Longest run of capital letters starting a line.
    ///
    /// Only present when advanced data is available for the page.
    CapAlphaSeqMax,
}

impl Scalar {
    /// Feature name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LineCount => "lineCount",
            Self::EmptyLineCount => "emptyLineCount",
            Self::SentenceCount => "sentenceCount",
            Self::CapAlphaSeqMax => "capAlphaSeq",
        }
    }

    /// Whether this feature lives in the advanced companion record under
    /// split schemas.
    #[must_use]
    pub const fn is_advanced(self) -> bool {
        matches!(self, Self::CapAlphaSeqMax)
    }
}

/// The answer to a scalar query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarValue {
    /// A single section's value, or the sum over sections for `Group`.
    Total(u64),
    /// One value per section, in layout order, for `All`.
    PerSection([(Section, u64); 3]),
}

impl ScalarValue {
    /// Collapse to a single number (summing per-section values).
    #[must_use]
    pub fn total(&self) -> u64 {
        match self {
            Self::Total(n) => *n,
            Self::PerSection(values) => values.iter().map(|(_, n)| n).sum(),
        }
    }
}
