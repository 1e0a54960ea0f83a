//! `cmap` table processing.
//!
//! Subtables are read lazily: lookups binary-search the big-endian arrays in place,
//! so parsing a font with a large `cmap` only validates the subtable bounds.

use super::Cursor;
use crate::{
    errors::{MapError, ParseErrorKind},
    ParseError,
};

/// Segment mapping to delta values (format 4). Covers the Basic Multilingual Plane only.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SegmentMap<'a> {
    segment_count: usize,
    end_codes: Cursor<'a>,
    start_codes: Cursor<'a>,
    id_deltas: Cursor<'a>,
    /// `idRangeOffset` array followed by `glyphIdArray` up to the end of the subtable.
    id_range_offsets: Cursor<'a>,
}

/// Single segment of a [`SegmentMap`].
#[derive(Debug, Clone, Copy)]
struct Segment {
    start: u16,
    end: u16,
    id_delta: u16,
    id_range_offset: u16,
}

impl<'a> SegmentMap<'a> {
    const FORMAT: u16 = 4;

    fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        cursor.skip(2)?; // format
        let len = cursor.read_u16_checked(|len| {
            usize::from(len)
                .checked_sub(4)
                .ok_or(ParseErrorKind::UnexpectedEof)
        })?;
        let mut cursor = cursor.range(0..len)?;
        cursor.skip(2)?; // language
        let segment_count = usize::from(cursor.read_u16()? / 2);
        cursor.skip(6)?; // searchRange, entrySelector, rangeShift

        let array_len = 2 * segment_count;
        let end_codes = cursor.split_at(array_len)?;
        cursor.skip(2)?; // reservedPad
        let start_codes = cursor.split_at(array_len)?;
        let id_deltas = cursor.split_at(array_len)?;
        if cursor.bytes.len() < array_len {
            return Err(cursor.err(ParseErrorKind::UnexpectedEof));
        }
        Ok(Self {
            segment_count,
            end_codes,
            start_codes,
            id_deltas,
            id_range_offsets: cursor,
        })
    }

    fn read_at(array: Cursor<'_>, idx: usize) -> Result<u16, ParseError> {
        array.at(2 * idx)?.read_u16()
    }

    fn segment(&self, idx: usize) -> Result<Segment, ParseError> {
        Ok(Segment {
            start: Self::read_at(self.start_codes, idx)?,
            end: Self::read_at(self.end_codes, idx)?,
            id_delta: Self::read_at(self.id_deltas, idx)?,
            id_range_offset: Self::read_at(self.id_range_offsets, idx)?,
        })
    }

    /// Finds the first segment with the end code not less than `code`.
    fn find_segment(&self, code: u16) -> Result<Option<(usize, Segment)>, ParseError> {
        let (mut low, mut high) = (0, self.segment_count);
        while low < high {
            let mid = low + (high - low) / 2;
            if Self::read_at(self.end_codes, mid)? < code {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        if low == self.segment_count {
            return Ok(None);
        }
        let segment = self.segment(low)?;
        Ok((segment.start <= code).then_some((low, segment)))
    }

    fn map_code(&self, idx: usize, segment: &Segment, code: u16) -> Result<u16, ParseError> {
        if segment.id_range_offset == 0 {
            return Ok(code.wrapping_add(segment.id_delta));
        }
        // The offset is relative to the position of the `idRangeOffset` entry itself.
        let offset = 2 * idx
            + usize::from(segment.id_range_offset)
            + 2 * usize::from(code - segment.start);
        let glyph_id = self.id_range_offsets.at(offset)?.read_u16()?;
        Ok(if glyph_id == 0 {
            0
        } else {
            glyph_id.wrapping_add(segment.id_delta)
        })
    }

    fn map_char(&self, ch: char) -> Result<u16, MapError> {
        let code = u16::try_from(u32::from(ch)).map_err(|_| MapError::CharTooLarge)?;
        let Some((idx, segment)) = self.find_segment(code).map_err(|_| MapError::InvalidOffset)?
        else {
            return Ok(0);
        };
        self.map_code(idx, &segment, code)
            .map_err(|_| MapError::InvalidOffset)
    }

    fn chars_for_glyph(&self, glyph_idx: u16, chars: &mut Vec<char>) {
        for idx in 0..self.segment_count {
            let Ok(segment) = self.segment(idx) else {
                return;
            };
            // The terminating `0xffff` segment never maps a real char.
            let end = segment.end.min(u16::MAX - 1);
            if segment.start > end {
                continue;
            }
            if segment.id_range_offset == 0 {
                let code = glyph_idx.wrapping_sub(segment.id_delta);
                if (segment.start..=end).contains(&code) {
                    chars.extend(char::from_u32(code.into()));
                }
            } else {
                let mapped = (segment.start..=end)
                    .filter(|&code| self.map_code(idx, &segment, code).ok() == Some(glyph_idx))
                    .filter_map(|code| char::from_u32(code.into()));
                chars.extend(mapped);
            }
        }
    }
}

/// Segmented coverage (format 12). Covers all Unicode planes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GroupMap<'a> {
    group_count: usize,
    groups: Cursor<'a>,
}

impl<'a> GroupMap<'a> {
    const FORMAT: u16 = 12;
    const GROUP_LEN: usize = 12;

    fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        cursor.skip(4)?; // format, reserved
        cursor.skip(8)?; // length, language
        let group_count = cursor.read_u32()? as usize;
        let groups_len = group_count
            .checked_mul(Self::GROUP_LEN)
            .ok_or_else(|| cursor.err(ParseErrorKind::UnexpectedEof))?;
        let groups = cursor.split_at(groups_len)?;
        Ok(Self {
            group_count,
            groups,
        })
    }

    /// Returns `(startCharCode, endCharCode, startGlyphID)` for the group.
    fn group(&self, idx: usize) -> Result<(u32, u32, u32), ParseError> {
        let mut cursor = self.groups.at(idx * Self::GROUP_LEN)?;
        Ok((cursor.read_u32()?, cursor.read_u32()?, cursor.read_u32()?))
    }

    fn map_char(&self, ch: char) -> Result<u16, MapError> {
        let code = u32::from(ch);
        let (mut low, mut high) = (0, self.group_count);
        while low < high {
            let mid = low + (high - low) / 2;
            let (start, end, start_glyph) = self.group(mid).map_err(|_| MapError::InvalidOffset)?;
            if end < code {
                low = mid + 1;
            } else if start > code {
                high = mid;
            } else {
                // Glyph IDs beyond `u16::MAX` cannot exist, so map to the missing glyph.
                let glyph_id = start_glyph.wrapping_add(code - start);
                return Ok(glyph_id.try_into().unwrap_or(0));
            }
        }
        Ok(0)
    }

    fn chars_for_glyph(&self, glyph_idx: u16, chars: &mut Vec<char>) {
        let glyph_idx = u32::from(glyph_idx);
        for idx in 0..self.group_count {
            let Ok((start, end, start_glyph)) = self.group(idx) else {
                return;
            };
            let Some(pos) = glyph_idx.checked_sub(start_glyph) else {
                continue;
            };
            if end.checked_sub(start).is_some_and(|len| pos <= len) {
                chars.extend(char::from_u32(start + pos));
            }
        }
    }
}

/// Unicode subtable of the `cmap` table used for char lookups.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CmapTable<'a> {
    Segments(SegmentMap<'a>),
    Groups(GroupMap<'a>),
}

impl<'a> CmapTable<'a> {
    const UNICODE_PLATFORM: u16 = 0;
    const WINDOWS_PLATFORM: u16 = 3;

    fn is_unicode_encoding(platform_id: u16, encoding_id: u16) -> bool {
        match platform_id {
            // Encoding 5 is reserved for variation sequences (format 14).
            Self::UNICODE_PLATFORM => encoding_id != 5,
            Self::WINDOWS_PLATFORM => matches!(encoding_id, 1 | 10),
            _ => false,
        }
    }

    /// Selects a Unicode subtable. A format 12 subtable is preferred since it is a superset
    /// of the format 4 one; among subtables of the same format, the first one wins.
    pub(super) fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let table_cursor = cursor;
        cursor.read_u16_checked(|version| {
            if version != 0 {
                return Err(ParseErrorKind::UnexpectedTableVersion {
                    version: version.into(),
                });
            }
            Ok(())
        })?;

        let num_tables = cursor.read_u16()?;
        let (mut segments, mut groups) = (None, None);
        for _ in 0..num_tables {
            let platform_id = cursor.read_u16()?;
            let encoding_id = cursor.read_u16()?;
            let offset = cursor.read_u32()? as usize;
            if !Self::is_unicode_encoding(platform_id, encoding_id) {
                continue;
            }

            let subtable = table_cursor.at(offset)?;
            match subtable.at(0)?.read_u16()? {
                SegmentMap::FORMAT if segments.is_none() => {
                    segments = Some(SegmentMap::parse(subtable)?);
                }
                GroupMap::FORMAT if groups.is_none() => {
                    groups = Some(GroupMap::parse(subtable)?);
                }
                _ => { /* unsupported format or an already selected one */ }
            }
        }

        match (groups, segments) {
            (Some(groups), _) => Ok(Self::Groups(groups)),
            (None, Some(segments)) => Ok(Self::Segments(segments)),
            (None, None) => Err(cursor.err(ParseErrorKind::NoSupportedCmap)),
        }
    }

    pub(super) fn map_char(&self, ch: char) -> Result<u16, MapError> {
        match self {
            Self::Segments(segments) => segments.map_char(ch),
            Self::Groups(groups) => groups.map_char(ch),
        }
    }

    /// Returns all chars mapped to the specified glyph in the ascending order.
    /// The missing glyph (#0) is never reverse-mapped.
    pub(super) fn chars_for_glyph(&self, glyph_idx: u16) -> Vec<char> {
        let mut chars = vec![];
        if glyph_idx == 0 {
            return chars;
        }
        match self {
            Self::Segments(segments) => segments.chars_for_glyph(glyph_idx, &mut chars),
            Self::Groups(groups) => groups.chars_for_glyph(glyph_idx, &mut chars),
        }
        chars.sort_unstable();
        chars.dedup();
        chars
    }
}
