//! Font reader: table access via the crate's own parser, shaping and outlines via `rustybuzz`.

use rustybuzz::{
    ttf_parser::{GlyphId, OutlineBuilder},
    Face, UnicodeBuffer,
};

use crate::{
    errors::ParseErrorKind,
    font::{Font, Lookup},
    ParseError,
};

/// Glyph produced by shaping together with the input substring it represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ShapedGlyph {
    pub(crate) id: u16,
    pub(crate) text: String,
}

/// Parsed font used for a single purpose within an extraction (e.g., ligature discovery).
/// Glyph IDs are only meaningful within a handle.
pub(crate) struct FontHandle<'a> {
    font: Font<'a>,
    face: Face<'a>,
    units_per_em: u16,
}

impl std::fmt::Debug for FontHandle<'_> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("FontHandle")
            .field("glyph_count", &self.font.glyph_count())
            .field("has_gsub", &self.font.gsub.is_some())
            .field("units_per_em", &self.units_per_em)
            .finish_non_exhaustive()
    }
}

impl<'a> FontHandle<'a> {
    /// Opens a handle over sfnt data. Both the table parser and the shaper must accept the data.
    pub(crate) fn open(bytes: &'a [u8]) -> Result<Self, ParseError> {
        let font = Font::new(bytes)?;
        let units_per_em = font.units_per_em()?;
        let face =
            Face::from_slice(bytes, 0).ok_or_else(|| ParseError::new(ParseErrorKind::Shaper))?;
        Ok(Self {
            font,
            face,
            units_per_em,
        })
    }

    pub(crate) fn font(&self) -> &Font<'a> {
        &self.font
    }

    /// Maps chars in `text` to glyphs one by one, without shaping. Unmapped chars
    /// produce the missing glyph (0).
    pub(crate) fn glyphs_for(&self, text: &str) -> Vec<u16> {
        text.chars()
            .map(|ch| self.font.map_char(ch).unwrap_or(0))
            .collect()
    }

    /// Shapes `text` with the default features (script and direction are guessed).
    pub(crate) fn layout(&self, text: &str) -> Vec<ShapedGlyph> {
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.guess_segment_properties();
        let output = rustybuzz::shape(&self.face, &[], buffer);
        let infos = output.glyph_infos();

        // Clusters are byte offsets of the first char represented by a glyph.
        let mut cluster_starts: Vec<_> = infos.iter().map(|info| info.cluster as usize).collect();
        cluster_starts.sort_unstable();
        cluster_starts.dedup();

        infos
            .iter()
            .map(|info| {
                let start = info.cluster as usize;
                let end = cluster_starts
                    .iter()
                    .find(|&&next_start| next_start > start)
                    .copied()
                    .unwrap_or(text.len());
                ShapedGlyph {
                    id: u16::try_from(info.glyph_id).unwrap_or_default(),
                    text: text.get(start..end).unwrap_or_default().to_owned(),
                }
            })
            .collect()
    }

    /// Performs reverse `cmap` lookup. Strings are ordered by code point.
    pub(crate) fn texts_for(&self, glyph: u16) -> Vec<String> {
        self.font
            .chars_for_glyph(glyph)
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Returns the first reverse `cmap` lookup result for the glyph, if any.
    pub(crate) fn text_for(&self, glyph: u16) -> Option<String> {
        self.font.chars_for_glyph(glyph).first().copied().map(String::from)
    }

    /// Returns lookups from the `GSUB` table. Fonts without `GSUB` have no lookups.
    pub(crate) fn ligature_lookups(&self) -> Result<Vec<Lookup<'a>>, ParseError> {
        match &self.font.gsub {
            Some(gsub) => gsub.lookups(),
            None => Ok(vec![]),
        }
    }

    /// Feeds the glyph outline (in font units, y axis pointing up) to `pen`. Returns `false`
    /// if the glyph has no outline.
    pub(crate) fn outline(&self, glyph: u16, pen: &mut dyn OutlineBuilder) -> bool {
        self.face.outline_glyph(GlyphId(glyph), pen).is_some()
    }

    pub(crate) fn advance_width(&self, glyph: u16) -> Option<u16> {
        self.face.glyph_hor_advance(GlyphId(glyph))
    }

    /// Returns the vertical advance from `vmtx`, falling back to the line height.
    pub(crate) fn advance_height(&self, glyph: u16) -> Option<u16> {
        self.face.glyph_ver_advance(GlyphId(glyph)).or_else(|| {
            let line_height = i32::from(self.ascender()) - i32::from(self.descender());
            u16::try_from(line_height).ok()
        })
    }

    /// Em size from `head`.
    pub(crate) fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub(crate) fn ascender(&self) -> i16 {
        self.face.ascender()
    }

    pub(crate) fn descender(&self) -> i16 {
        self.face.descender()
    }
}
