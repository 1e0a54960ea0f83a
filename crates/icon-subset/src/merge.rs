//! Merging rendered glyphs into output fonts.

use tokio::sync::mpsc;

use crate::{
    extract::Format,
    font::{SimpleGlyph, SubsetGlyph},
    reader::FontHandle,
    render::{self, RenderedGlyph},
    subset::FontSubset,
    write::{SvgFont, SvgFontGlyph},
};

/// Glyph sent to a [`GlyphMerger`].
#[derive(Debug, Clone)]
pub(crate) struct MergeItem {
    /// Glyph ID in the shaping font handle.
    pub(crate) glyph: u16,
    pub(crate) name: String,
    /// Strings that should produce the glyph in the merged font.
    pub(crate) triggers: Vec<String>,
    pub(crate) rendered: RenderedGlyph,
}

/// Consumes rendered glyphs and assembles them into an SVG font and a binary font subset.
#[derive(Debug)]
pub(crate) struct GlyphMerger<'a> {
    subset: FontSubset<'a>,
    svg_font: SvgFont,
}

impl<'a> GlyphMerger<'a> {
    pub(crate) fn new(handle: &FontHandle<'a>, family_name: &str) -> Self {
        let svg_font = SvgFont::new(
            family_name,
            handle.units_per_em(),
            handle.ascender(),
            handle.descender(),
        );
        let notdef = SubsetGlyph {
            outline: SimpleGlyph::from_outline(&render::glyph_outline(handle, 0)),
            advance: handle.advance_width(0).unwrap_or(0),
        };
        Self {
            subset: FontSubset::new(handle.font().clone(), family_name, notdef),
            svg_font,
        }
    }

    fn push(&mut self, item: MergeItem) {
        let glyph = SubsetGlyph {
            outline: SimpleGlyph::from_outline(&item.rendered.outline),
            advance: item.rendered.advance_width,
        };
        let new_idx = self.subset.push(item.glyph, glyph, &item.triggers);
        log::trace!("merged glyph {} as {new_idx} ({:?})", item.glyph, item.name);
        self.svg_font.push(SvgFontGlyph {
            name: item.name,
            triggers: item.triggers,
            path: item.rendered.outline.to_svg(),
            advance_width: item.rendered.advance_width,
        });
    }

    /// Merges glyphs until the sending side of the channel is dropped.
    pub(crate) async fn run(mut self, mut items: mpsc::Receiver<MergeItem>) -> MergedFont<'a> {
        while let Some(item) = items.recv().await {
            self.push(item);
        }
        self.subset.resolve_ligatures();
        log::debug!(
            "merged {} glyphs into a font with {} glyphs and {} ligatures",
            self.svg_font.glyph_count(),
            self.subset.glyphs.len(),
            self.subset.ligatures.len()
        );

        MergedFont {
            svg: self.svg_font.to_document(),
            subset: self.subset,
        }
    }
}

/// Result of merging glyphs, from which fonts in all supported formats can be produced.
#[derive(Debug)]
pub(crate) struct MergedFont<'a> {
    svg: String,
    subset: FontSubset<'a>,
}

impl MergedFont<'_> {
    #[cfg(test)]
    pub(crate) fn svg(&self) -> &str {
        &self.svg
    }

    pub(crate) fn transcode(&self, format: Format) -> Vec<u8> {
        match format {
            Format::Ttf => self.subset.to_truetype(),
            Format::Eot => self.subset.to_eot(),
            Format::Woff => self.subset.to_woff(),
            Format::Woff2 => self.subset.to_woff2(),
            Format::Svg => self.svg.as_bytes().to_vec(),
        }
    }
}
