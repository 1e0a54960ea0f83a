//! OpenType parsing logic.

use core::{fmt, ops};
use std::borrow::Cow;

pub(crate) use self::{
    cmap::CmapTable,
    glyph::{ContourPoint, SimpleGlyph, SubsetGlyph},
    gsub::{GsubTable, LigatureCandidate, Lookup},
};
#[cfg(test)]
pub(crate) use self::gsub::Coverage;
use crate::errors::{MapError, ParseError, ParseErrorKind};

mod cmap;
mod glyph;
mod gsub;
mod woff;
pub(crate) mod woff2;

/// Tag of an OpenType table, such as `cmap` or `GSUB`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableTag(pub(crate) [u8; 4]);

impl fmt::Debug for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, formatter)
    }
}

impl fmt::Display for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(formatter, "{}", char::from(byte))?;
            } else {
                write!(formatter, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

impl TableTag {
    /// Character to glyph mapping.
    pub const CMAP: Self = Self(*b"cmap");
    /// Font header.
    pub const HEAD: Self = Self(*b"head");
    /// Horizontal header.
    pub const HHEA: Self = Self(*b"hhea");
    /// Horizontal metrics.
    pub const HMTX: Self = Self(*b"hmtx");
    /// Maximum profile.
    pub const MAXP: Self = Self(*b"maxp");
    /// Naming table.
    pub const NAME: Self = Self(*b"name");
    /// OS/2 and Windows-specific metrics.
    pub const OS2: Self = Self(*b"OS/2");
    /// PostScript information.
    pub const POST: Self = Self(*b"post");
    /// Index to location.
    pub const LOCA: Self = Self(*b"loca");
    /// Glyph data.
    pub const GLYF: Self = Self(*b"glyf");
    /// Compact Font Format outlines.
    pub const CFF: Self = Self(*b"CFF ");
    /// Glyph substitution data.
    pub const GSUB: Self = Self(*b"GSUB");
}

/// Big-endian reader over a part of the font data that remembers where it is located
/// (for error reporting).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    pub(crate) bytes: &'a [u8],
    offset: usize,
    table: Option<TableTag>,
}

impl AsRef<[u8]> for Cursor<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            table: None,
        }
    }

    fn with_table(self, table: TableTag) -> Self {
        Self {
            table: Some(table),
            ..self
        }
    }

    pub(crate) fn err(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            offset: self.offset,
            table: self.table,
        }
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), ParseError> {
        if self.bytes.len() < len {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        }
        self.bytes = &self.bytes[len..];
        self.offset += len;
        Ok(())
    }

    /// Splits off the first `len` bytes, advancing this cursor past them.
    pub(crate) fn split_at(&mut self, len: usize) -> Result<Self, ParseError> {
        if self.bytes.len() < len {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        }
        let (head, tail) = self.bytes.split_at(len);
        let head = Self {
            bytes: head,
            ..*self
        };
        self.bytes = tail;
        self.offset += len;
        Ok(head)
    }

    /// Narrows the cursor to the specified range relative to its current position.
    pub(crate) fn range(self, range: ops::Range<usize>) -> Result<Self, ParseError> {
        let len = self.bytes.len();
        let Some(bytes) = self.bytes.get(range.clone()) else {
            return Err(self.err(ParseErrorKind::RangeOutOfBounds { range, len }));
        };
        Ok(Self {
            bytes,
            offset: self.offset + range.start,
            table: self.table,
        })
    }

    /// Returns a cursor starting at `offset` from the current position. Used to follow
    /// offsets stored in table headers.
    pub(crate) fn at(self, offset: usize) -> Result<Self, ParseError> {
        if offset > self.bytes.len() {
            return Err(self.err(ParseErrorKind::OffsetOutOfBounds(offset)));
        }
        Ok(Self {
            bytes: &self.bytes[offset..],
            offset: self.offset + offset,
            table: self.table,
        })
    }

    pub(crate) fn read_byte_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let Some((head, tail)) = self.bytes.split_first_chunk::<N>() else {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        };
        self.bytes = tail;
        self.offset += N;
        Ok(*head)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, ParseError> {
        self.read_byte_array().map(|[byte]| byte)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, ParseError> {
        self.read_byte_array().map(u16::from_be_bytes)
    }

    pub(crate) fn read_i16(&mut self) -> Result<i16, ParseError> {
        self.read_byte_array().map(i16::from_be_bytes)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, ParseError> {
        self.read_byte_array().map(u32::from_be_bytes)
    }

    /// Reads a `u16` value and validates it; the error is attributed to the value position.
    pub(crate) fn read_u16_checked<T>(
        &mut self,
        check: impl FnOnce(u16) -> Result<T, ParseErrorKind>,
    ) -> Result<T, ParseError> {
        let value_cursor = *self;
        let value = self.read_u16()?;
        check(value).map_err(|kind| value_cursor.err(kind))
    }

    pub(crate) fn read_u32_checked<T>(
        &mut self,
        check: impl FnOnce(u32) -> Result<T, ParseErrorKind>,
    ) -> Result<T, ParseError> {
        let value_cursor = *self;
        let value = self.read_u32()?;
        check(value).map_err(|kind| value_cursor.err(kind))
    }
}

/// Converts a supported font container into plain sfnt data. WOFF and WOFF2 fonts
/// are decompressed; sfnt data is borrowed as is.
pub(crate) fn sfnt_bytes(bytes: &[u8]) -> Result<Cow<'_, [u8]>, ParseError> {
    match bytes.first_chunk::<4>() {
        Some(&woff::SIGNATURE) => woff::decode(bytes).map(Cow::Owned),
        Some(&woff2::SIGNATURE) => woff2::decode(bytes).map(Cow::Owned),
        _ => Ok(Cow::Borrowed(bytes)),
    }
}

/// Checks that an sfnt version denotes TrueType or CFF outlines.
pub(crate) fn check_sfnt_version(version: u32) -> Result<(), ParseErrorKind> {
    match version {
        Font::SFNT_VERSION | Font::APPLE_SFNT_VERSION | Font::CFF_SFNT_VERSION => Ok(()),
        Font::COLLECTION_TAG => Err(ParseErrorKind::UnsupportedFormat("font collections")),
        _ => Err(ParseErrorKind::UnexpectedFontVersion),
    }
}

/// Parsed font. Only the tables read during extraction or copied into the produced fonts
/// are retained; outlines and metrics are read through the shaper.
#[derive(Debug, Clone)]
pub(crate) struct Font<'a> {
    pub(crate) cmap: CmapTable<'a>,
    pub(crate) head: Cursor<'a>,
    pub(crate) hhea: Cursor<'a>,
    pub(crate) os2: Cursor<'a>,
    pub(crate) post: Cursor<'a>,
    pub(crate) gsub: Option<GsubTable<'a>>,
    glyph_count: u16,
}

impl<'a> Font<'a> {
    pub(crate) const SFNT_VERSION: u32 = 0x_0001_0000;
    const APPLE_SFNT_VERSION: u32 = u32::from_be_bytes(*b"true");
    pub(crate) const CFF_SFNT_VERSION: u32 = u32::from_be_bytes(*b"OTTO");
    const COLLECTION_TAG: u32 = u32::from_be_bytes(*b"ttcf");
    /// Magic number the whole-font checksum must be equal to.
    pub(crate) const SFNT_CHECKSUM: u32 = 0x_b1b0_afba;
    pub(crate) const HEAD_CHECKSUM_OFFSET: usize = 8;
    const HEAD_UNITS_PER_EM_OFFSET: usize = 18;
    pub(crate) const HEAD_LEN: usize = 54;
    pub(crate) const HHEA_LEN: usize = 36;
    /// `post` header up to the glyph names.
    pub(crate) const POST_HEADER_LEN: usize = 32;

    pub(crate) fn new(bytes: &'a [u8]) -> Result<Self, ParseError> {
        let font_cursor = Cursor::new(bytes);
        let mut cursor = font_cursor;
        cursor.read_u32_checked(check_sfnt_version)?;
        let table_count = cursor.read_u16()?;
        cursor.skip(6)?; // searchRange, entrySelector, rangeShift

        let (mut cmap, mut head, mut hhea, mut maxp) = (None, None, None, None);
        let (mut os2, mut post, mut gsub) = (None, None, None);
        for _ in 0..table_count {
            let (tag, table) = Self::read_table_record(&mut cursor, font_cursor)?;
            match tag {
                TableTag::CMAP => cmap = Some(CmapTable::parse(table)?),
                TableTag::HEAD => head = Some(Self::check_len(table, Self::HEAD_LEN)?),
                TableTag::HHEA => hhea = Some(Self::check_len(table, Self::HHEA_LEN)?),
                TableTag::MAXP => maxp = Some(table),
                TableTag::OS2 => os2 = Some(table),
                TableTag::POST => post = Some(Self::check_len(table, Self::POST_HEADER_LEN)?),
                TableTag::GSUB => gsub = Some(GsubTable::parse(table)?),
                _ => { /* skip table */ }
            }
        }

        let head = head.ok_or_else(|| ParseError::missing_table(TableTag::HEAD))?;
        Self::check_head_version(head)?;
        let maxp = maxp.ok_or_else(|| ParseError::missing_table(TableTag::MAXP))?;
        Ok(Self {
            cmap: cmap.ok_or_else(|| ParseError::missing_table(TableTag::CMAP))?,
            head,
            hhea: hhea.ok_or_else(|| ParseError::missing_table(TableTag::HHEA))?,
            os2: os2.ok_or_else(|| ParseError::missing_table(TableTag::OS2))?,
            post: post.ok_or_else(|| ParseError::missing_table(TableTag::POST))?,
            gsub,
            glyph_count: Self::parse_glyph_count(maxp)?,
        })
    }

    fn read_table_record(
        header: &mut Cursor<'_>,
        font: Cursor<'a>,
    ) -> Result<(TableTag, Cursor<'a>), ParseError> {
        let tag = TableTag(header.read_byte_array()?);
        header.skip(4)?; // checksum
        let offset = header.read_u32()? as usize;
        let len = header.read_u32()? as usize;
        let end = offset
            .checked_add(len)
            .ok_or_else(|| header.err(ParseErrorKind::OffsetOutOfBounds(offset)))?;
        let table = font.range(offset..end)?.with_table(tag);
        Ok((tag, table))
    }

    /// Rejects tables shorter than the fixed part read or copied by the writer.
    fn check_len(table: Cursor<'a>, min_len: usize) -> Result<Cursor<'a>, ParseError> {
        if table.bytes.len() < min_len {
            return Err(table.err(ParseErrorKind::UnexpectedTableLen {
                expected: min_len,
                actual: table.bytes.len(),
            }));
        }
        Ok(table)
    }

    fn check_head_version(head: Cursor<'_>) -> Result<(), ParseError> {
        let mut cursor = head;
        cursor.read_u32_checked(|version| {
            if version != 0x_0001_0000 {
                return Err(ParseErrorKind::UnexpectedTableVersion { version });
            }
            Ok(())
        })
    }

    fn parse_glyph_count(maxp: Cursor<'_>) -> Result<u16, ParseError> {
        let mut cursor = maxp;
        cursor.read_u32_checked(|version| {
            if version != 0x_0000_5000 && version != 0x_0001_0000 {
                return Err(ParseErrorKind::UnexpectedTableVersion { version });
            }
            Ok(())
        })?;
        cursor.read_u16()
    }

    /// Computes the OpenType checksum of the provided data, padding it with zeros
    /// to a 4-byte boundary.
    pub(crate) fn checksum(data: &[u8]) -> u32 {
        data.chunks(4).fold(0_u32, |sum, chunk| {
            let mut word = [0_u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            sum.wrapping_add(u32::from_be_bytes(word))
        })
    }

    pub(crate) fn units_per_em(&self) -> Result<u16, ParseError> {
        self.head.at(Self::HEAD_UNITS_PER_EM_OFFSET)?.read_u16()
    }

    pub(crate) fn glyph_count(&self) -> u16 {
        self.glyph_count
    }

    pub(crate) fn map_char(&self, ch: char) -> Result<u16, MapError> {
        self.cmap.map_char(ch)
    }

    /// Performs reverse `cmap` lookup. Chars are returned in the ascending order.
    pub(crate) fn chars_for_glyph(&self, glyph_idx: u16) -> Vec<char> {
        self.cmap.chars_for_glyph(glyph_idx)
    }
}
