//! SVG font serialization.

use svg::{
    node::element::{Definitions, Element},
    Document, Node,
};

use super::FontNames;

const XML_PROLOG: &str = "<?xml version=\"1.0\" standalone=\"no\"?>\n\
    <!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \
    \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n";

/// Glyph of an [`SvgFont`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SvgFontGlyph {
    pub(crate) name: String,
    /// Strings triggering the glyph; each one produces a separate `<glyph>` element.
    pub(crate) triggers: Vec<String>,
    /// Path data in font units with the y axis pointing up.
    pub(crate) path: String,
    pub(crate) advance_width: u16,
}

impl SvgFontGlyph {
    /// Element names are suffixed with the trigger index starting from the second trigger.
    fn elements(&self) -> impl Iterator<Item = Element> + '_ {
        self.triggers.iter().enumerate().map(|(i, trigger)| {
            let name = if i == 0 {
                self.name.clone()
            } else {
                format!("{}-{i}", self.name)
            };
            let mut element = Element::new("glyph");
            element.assign("glyph-name", name);
            element.assign("unicode", trigger.as_str());
            element.assign("horiz-adv-x", u32::from(self.advance_width));
            element.assign("d", self.path.as_str());
            element
        })
    }
}

/// SVG font document assembled from rendered glyphs.
#[derive(Debug, Clone)]
pub(crate) struct SvgFont {
    family: String,
    id: String,
    units_per_em: u16,
    ascent: i16,
    descent: i16,
    glyphs: Vec<SvgFontGlyph>,
}

impl SvgFont {
    pub(crate) fn new(family: &str, units_per_em: u16, ascent: i16, descent: i16) -> Self {
        Self {
            family: family.to_owned(),
            id: FontNames::new(family).postscript_name,
            units_per_em,
            ascent,
            descent,
            glyphs: vec![],
        }
    }

    pub(crate) fn push(&mut self, glyph: SvgFontGlyph) {
        self.glyphs.push(glyph);
    }

    pub(crate) fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Font-wide advance: the widest glyph advance, or the em size if there are no glyphs.
    fn horiz_adv_x(&self) -> u16 {
        self.glyphs
            .iter()
            .map(|glyph| glyph.advance_width)
            .max()
            .unwrap_or(self.units_per_em)
    }

    fn font_element(&self) -> Element {
        let mut font = Element::new("font");
        font.assign("id", self.id.as_str());
        font.assign("horiz-adv-x", u32::from(self.horiz_adv_x()));

        let mut face = Element::new("font-face");
        face.assign("font-family", self.family.as_str());
        face.assign("units-per-em", u32::from(self.units_per_em));
        face.assign("ascent", i32::from(self.ascent));
        face.assign("descent", i32::from(self.descent));
        font.append(face);

        let mut missing_glyph = Element::new("missing-glyph");
        missing_glyph.assign("horiz-adv-x", 0);
        font.append(missing_glyph);

        for glyph in self.glyphs.iter().flat_map(SvgFontGlyph::elements) {
            font.append(glyph);
        }
        font
    }

    pub(crate) fn to_document(&self) -> String {
        let document = Document::new()
            .set("xmlns", "http://www.w3.org/2000/svg")
            .add(Definitions::new().add(self.font_element()));
        format!("{XML_PROLOG}{document}\n")
    }
}
