//! Selecting glyphs to extract by shaping requested strings.

use std::collections::HashSet;

use crate::reader::FontHandle;

const WHITESPACE: &str = " ";

/// Glyph selected for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectedGlyph {
    pub(crate) id: u16,
    /// Text represented by the glyph in the shaped string.
    pub(crate) name: String,
    /// Reverse `cmap` strings followed by `name`, without duplicates.
    pub(crate) unicode: Vec<String>,
}

/// Shapes `strings` joined with a space and returns distinct glyphs in the order of their
/// first occurrence. The glyph the space is mapped to is dropped unless `with_whitespace` is set.
pub(crate) fn build_glyph_set(
    handle: &FontHandle<'_>,
    strings: &[String],
    with_whitespace: bool,
) -> Vec<SelectedGlyph> {
    let whitespace_glyph = handle.glyphs_for(WHITESPACE).first().copied();
    let joined = strings.join(WHITESPACE);

    let mut seen_ids = HashSet::new();
    let mut glyphs = vec![];
    for shaped in handle.layout(&joined) {
        if !seen_ids.insert(shaped.id) {
            continue;
        }
        if !with_whitespace && Some(shaped.id) == whitespace_glyph {
            log::trace!("dropping whitespace glyph {}", shaped.id);
            continue;
        }

        let mut unicode = handle.texts_for(shaped.id);
        unicode.push(shaped.text.clone());
        let mut seen_strings = HashSet::new();
        unicode.retain(|text| seen_strings.insert(text.clone()));

        log::trace!("selected glyph {} for {:?}", shaped.id, shaped.text);
        glyphs.push(SelectedGlyph {
            id: shaped.id,
            name: shaped.text,
            unicode,
        });
    }
    log::debug!("selected {} glyphs from {} strings", glyphs.len(), strings.len());
    glyphs
}
