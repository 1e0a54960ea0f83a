use core::{fmt, ops};

use crate::TableTag;

/// Kind of a font [`ParseError`].
#[derive(Debug)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// Unexpected end of the font data.
    UnexpectedEof,
    /// Unexpected font version.
    UnexpectedFontVersion,
    /// Font container or feature that cannot be processed (e.g., font collections).
    UnsupportedFormat(&'static str),
    /// Missing required font table (e.g., `head`).
    MissingTable,
    /// No supported subtable in the `cmap` table.
    NoSupportedCmap,
    /// Offset inferred from the table data is out of bounds.
    OffsetOutOfBounds(usize),
    /// Range inferred from the table data is out of bounds.
    RangeOutOfBounds {
        /// Inferred range.
        range: ops::Range<usize>,
        /// Length of the indexed data.
        len: usize,
    },
    /// Unexpected table version.
    UnexpectedTableVersion {
        /// Version read from the font data.
        version: u32,
    },
    /// Unexpected table length.
    UnexpectedTableLen {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// Unexpected table format (e.g., for a `cmap` subtable).
    UnexpectedTableFormat {
        /// Format read from the font data.
        format: u16,
    },
    /// Unexpected `loca` table format specified in the `head` table.
    UnexpectedLocaFormat(u16),
    /// Compressed table data cannot be inflated.
    Compression,
    /// Value or glyph data violating its encoding rules (e.g., in a WOFF2 transformed table).
    InvalidEncoding(&'static str),
    /// The text shaper rejected the font data.
    Shaper,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => formatter.write_str("unexpected end of the font data"),
            Self::UnexpectedFontVersion => formatter.write_str("unexpected font version"),
            Self::UnsupportedFormat(format) => {
                write!(formatter, "unsupported font format: {format}")
            }
            Self::MissingTable => formatter.write_str("missing required font table"),
            Self::NoSupportedCmap => {
                formatter.write_str("no supported subtable in the `cmap` table")
            }
            Self::OffsetOutOfBounds(val) => {
                write!(
                    formatter,
                    "offset ({val}) inferred from the table data is out of bounds"
                )
            }
            Self::RangeOutOfBounds { range, len } => {
                write!(
                    formatter,
                    "range ({range:?}) inferred from the table data is out of bounds (..{len})"
                )
            }
            Self::UnexpectedTableVersion { version } => {
                write!(formatter, "unexpected table version ({version})")
            }
            Self::UnexpectedTableLen { expected, actual } => {
                write!(
                    formatter,
                    "unexpected table length: expected {expected}, got {actual}"
                )
            }
            Self::UnexpectedTableFormat { format } => {
                write!(formatter, "unexpected table format ({format})")
            }
            Self::UnexpectedLocaFormat(format) => {
                write!(formatter, "unexpected `loca` table format ({format})")
            }
            Self::Compression => formatter.write_str("compressed table data is corrupted"),
            Self::InvalidEncoding(what) => write!(formatter, "invalid {what} encoding"),
            Self::Shaper => formatter.write_str("font data was rejected by the text shaper"),
        }
    }
}

impl std::error::Error for ParseErrorKind {}

/// Errors that can occur when parsing an OpenType font.
#[derive(Debug)]
pub struct ParseError {
    pub(crate) kind: ParseErrorKind,
    pub(crate) offset: usize,
    pub(crate) table: Option<TableTag>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = self.table {
            write!(formatter, "[{table}] ")?;
        }
        if self.offset > 0 {
            write!(formatter, "{}: ", self.offset)?;
        }
        fmt::Display::fmt(&self.kind, formatter)
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind) -> Self {
        Self {
            kind,
            offset: 0,
            table: None,
        }
    }

    pub(crate) fn missing_table(tag: TableTag) -> Self {
        Self {
            kind: ParseErrorKind::MissingTable,
            offset: 0,
            table: Some(tag),
        }
    }

    /// Gets the error kind.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// Gets the table this error relates to.
    pub fn table(&self) -> Option<TableTag> {
        self.table
    }

    /// Gets the offset in the font data.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Errors mapping a char to a glyph using the `cmap` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MapError {
    /// Char is outside the range covered by the subtable format.
    CharTooLarge,
    /// Glyph ID offset points outside the subtable.
    InvalidOffset,
}

/// Reasons an extraction request is rejected before any font data is processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum IllegalRequest {
    /// Target font name is empty.
    #[error("font name is empty")]
    EmptyFontName,
    /// No output formats are requested.
    #[error("no output formats are requested")]
    NoFormats,
    /// Neither ligatures nor raw sequences are specified.
    #[error("neither ligatures nor raw sequences are specified")]
    NoGlyphs,
    /// Unknown font format identifier.
    #[error("unknown font format `{0}`")]
    UnknownFormat(String),
}

/// Fatal errors aborting an [`extract()`](crate::extract()) call.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExtractError {
    /// Request options are invalid.
    #[error("illegal request: {0}")]
    IllegalRequest(#[from] IllegalRequest),
    /// Source font data cannot be read.
    #[error("malformed font: {0}")]
    MalformedFont(#[from] ParseError),
}
