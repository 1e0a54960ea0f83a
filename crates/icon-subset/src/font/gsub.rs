//! `GSUB` table processing. Only ligature substitution lookups are decoded.

use super::Cursor;
use crate::{errors::ParseErrorKind, ParseError};

/// Inclusive range of glyph IDs in a [`Coverage`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CoverageRange {
    pub(crate) start: u16,
    pub(crate) end: u16,
}

/// Coverage table: the ordered glyphs a lookup subtable applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Coverage {
    /// Explicit list of glyphs (format 1).
    Glyphs(Vec<u16>),
    /// Glyph ranges (format 2).
    Ranges(Vec<CoverageRange>),
}

impl Coverage {
    fn parse(mut cursor: Cursor<'_>) -> Result<Self, ParseError> {
        let is_ranges = cursor.read_u16_checked(|format| match format {
            1 => Ok(false),
            2 => Ok(true),
            _ => Err(ParseErrorKind::UnexpectedTableFormat { format }),
        })?;
        let count = cursor.read_u16()?;

        if is_ranges {
            let ranges = (0..count).map(|_| {
                let start = cursor.read_u16()?;
                let end = cursor.read_u16()?;
                cursor.skip(2)?; // startCoverageIndex
                Ok(CoverageRange { start, end })
            });
            Ok(Self::Ranges(ranges.collect::<Result<_, ParseError>>()?))
        } else {
            let glyphs = (0..count).map(|_| cursor.read_u16());
            Ok(Self::Glyphs(glyphs.collect::<Result<_, _>>()?))
        }
    }

    /// Lists covered glyphs in the coverage index order. Ranges are enumerated inclusively
    /// in the ascending order.
    pub(crate) fn glyphs(&self) -> Vec<u16> {
        match self {
            Self::Glyphs(glyphs) => glyphs.clone(),
            Self::Ranges(ranges) => ranges
                .iter()
                .flat_map(|range| range.start..=range.end)
                .collect(),
        }
    }
}

/// Ligature formed by an (implicit) leading glyph and the trailing component glyphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LigatureCandidate {
    pub(crate) ligature_glyph: u16,
    /// Components following the leading glyph.
    pub(crate) component_glyphs: Vec<u16>,
}

impl LigatureCandidate {
    fn parse(mut cursor: Cursor<'_>) -> Result<Self, ParseError> {
        let ligature_glyph = cursor.read_u16()?;
        // The count includes the leading glyph.
        let component_count = cursor.read_u16()?.saturating_sub(1);
        let component_glyphs = (0..component_count).map(|_| cursor.read_u16());
        Ok(Self {
            ligature_glyph,
            component_glyphs: component_glyphs.collect::<Result<_, _>>()?,
        })
    }
}

/// Ligature substitution subtable (lookup type 4, format 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LigatureSubstitution {
    pub(crate) coverage: Coverage,
    /// Ligature sets positionally aligned with the [`Coverage::glyphs()`].
    pub(crate) ligature_sets: Vec<Vec<LigatureCandidate>>,
}

impl LigatureSubstitution {
    fn parse(table: Cursor<'_>) -> Result<Self, ParseError> {
        let mut cursor = table;
        cursor.read_u16_checked(|format| {
            if format != 1 {
                return Err(ParseErrorKind::UnexpectedTableFormat { format });
            }
            Ok(())
        })?;
        let coverage_offset = cursor.read_u16()?;
        let coverage = Coverage::parse(table.at(coverage_offset.into())?)?;

        let set_count = cursor.read_u16()?;
        let ligature_sets = (0..set_count).map(|_| {
            let set_offset = cursor.read_u16()?;
            Self::parse_set(table.at(set_offset.into())?)
        });
        Ok(Self {
            coverage,
            ligature_sets: ligature_sets.collect::<Result<_, ParseError>>()?,
        })
    }

    fn parse_set(set: Cursor<'_>) -> Result<Vec<LigatureCandidate>, ParseError> {
        let mut cursor = set;
        let count = cursor.read_u16()?;
        (0..count)
            .map(|_| {
                let offset = cursor.read_u16()?;
                LigatureCandidate::parse(set.at(offset.into())?)
            })
            .collect()
    }
}

/// Lookup from the `GSUB` lookup list. Extension lookups are unwrapped, so `lookup_type`
/// is the type of the wrapped subtables.
#[derive(Debug, Clone)]
pub(crate) struct Lookup<'a> {
    pub(crate) lookup_type: u16,
    subtables: Vec<Cursor<'a>>,
}

impl<'a> Lookup<'a> {
    pub(crate) const LIGATURE_TYPE: u16 = 4;
    const EXTENSION_TYPE: u16 = 7;

    fn parse(table: Cursor<'a>) -> Result<Self, ParseError> {
        let mut cursor = table;
        let mut lookup_type = cursor.read_u16()?;
        cursor.skip(2)?; // lookupFlag
        let subtable_count = cursor.read_u16()?;
        let mut subtables = (0..subtable_count)
            .map(|_| table.at(cursor.read_u16()?.into()))
            .collect::<Result<Vec<_>, _>>()?;

        if lookup_type == Self::EXTENSION_TYPE {
            let mut extension_type = None;
            for subtable in &mut subtables {
                let (wrapped_type, wrapped) = Self::unwrap_extension(*subtable)?;
                extension_type.get_or_insert(wrapped_type);
                *subtable = wrapped;
            }
            lookup_type = extension_type.unwrap_or(Self::EXTENSION_TYPE);
        }
        Ok(Self {
            lookup_type,
            subtables,
        })
    }

    fn unwrap_extension(table: Cursor<'a>) -> Result<(u16, Cursor<'a>), ParseError> {
        let mut cursor = table;
        cursor.read_u16_checked(|format| {
            if format != 1 {
                return Err(ParseErrorKind::UnexpectedTableFormat { format });
            }
            Ok(())
        })?;
        let lookup_type = cursor.read_u16()?;
        let offset = cursor.read_u32()? as usize;
        Ok((lookup_type, table.at(offset)?))
    }

    pub(crate) fn is_ligature(&self) -> bool {
        self.lookup_type == Self::LIGATURE_TYPE
    }

    pub(crate) fn subtable_count(&self) -> usize {
        self.subtables.len()
    }

    /// Decodes a ligature substitution subtable. Returns `Ok(None)` for other lookup types
    /// or if there is no subtable with the specified index.
    pub(crate) fn ligature_subtable(
        &self,
        idx: usize,
    ) -> Result<Option<LigatureSubstitution>, ParseError> {
        if !self.is_ligature() {
            return Ok(None);
        }
        let Some(&subtable) = self.subtables.get(idx) else {
            return Ok(None);
        };
        LigatureSubstitution::parse(subtable).map(Some)
    }
}

/// Glyph substitution table. Only the lookup list is retained; scripts and features
/// are irrelevant for discovering ligatures.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GsubTable<'a> {
    lookup_list: Cursor<'a>,
}

impl<'a> GsubTable<'a> {
    pub(crate) fn parse(table: Cursor<'a>) -> Result<Self, ParseError> {
        let mut cursor = table;
        cursor.read_u32_checked(|version| match version {
            0x_0001_0000 | 0x_0001_0001 => Ok(()),
            _ => Err(ParseErrorKind::UnexpectedTableVersion { version }),
        })?;
        cursor.skip(4)?; // scriptListOffset, featureListOffset
        let lookup_list_offset = cursor.read_u16()?;
        Ok(Self {
            lookup_list: table.at(lookup_list_offset.into())?,
        })
    }

    pub(crate) fn lookups(&self) -> Result<Vec<Lookup<'a>>, ParseError> {
        let mut cursor = self.lookup_list;
        let count = cursor.read_u16()?;
        (0..count)
            .map(|_| {
                let offset = cursor.read_u16()?;
                Lookup::parse(self.lookup_list.at(offset.into())?)
            })
            .collect()
    }
}
