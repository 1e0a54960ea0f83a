use std::collections::{btree_map, BTreeMap};

use crate::font::{Font, SubsetGlyph};

/// Subset of a [`Font`] containing the extracted glyphs together with the strings
/// triggering them.
#[derive(Debug)]
pub(crate) struct FontSubset<'a> {
    pub(crate) font: Font<'a>,
    pub(crate) family_name: String,
    pub(crate) char_map: BTreeMap<char, u16>,
    /// Component glyphs (including the leading one) and the produced ligature glyph.
    pub(crate) ligatures: Vec<(Vec<u16>, u16)>,
    old_to_new_glyph_idx: BTreeMap<u16, u16>,
    pub(crate) glyphs: Vec<SubsetGlyph>,
    /// Multi-char triggers waiting for [`Self::resolve_ligatures()`].
    pending_ligatures: Vec<(String, u16)>,
}

impl<'a> FontSubset<'a> {
    /// Creates a subset with the specified `.notdef` glyph.
    pub(crate) fn new(font: Font<'a>, family_name: &str, notdef: SubsetGlyph) -> Self {
        Self {
            font,
            family_name: family_name.to_owned(),
            char_map: BTreeMap::new(),
            ligatures: vec![],
            // The 0th glyph must always be mapped to itself
            old_to_new_glyph_idx: BTreeMap::from([(0, 0)]),
            glyphs: vec![notdef],
            pending_ligatures: vec![],
        }
    }

    fn push_glyph(&mut self, glyph: SubsetGlyph) -> u16 {
        let new_idx = u16::try_from(self.glyphs.len()).expect("too many glyphs");
        self.glyphs.push(glyph);
        new_idx
    }

    /// Adds a glyph of the source font with the index `old_idx`. A glyph is only added once;
    /// later pushes with the same `old_idx` reuse it and only contribute `triggers`.
    ///
    /// Single-char `triggers` are mapped to the glyph directly (the first glyph claiming
    /// a char wins); longer triggers become ligatures.
    pub(crate) fn push(&mut self, old_idx: u16, glyph: SubsetGlyph, triggers: &[String]) -> u16 {
        let new_idx = match self.old_to_new_glyph_idx.get(&old_idx) {
            Some(&new_idx) => new_idx,
            None => {
                let new_idx = self.push_glyph(glyph);
                self.old_to_new_glyph_idx.insert(old_idx, new_idx);
                new_idx
            }
        };

        for trigger in triggers {
            let mut chars = trigger.chars();
            match (chars.next(), chars.next()) {
                (None, _) => { /* nothing to map */ }
                (Some(ch), None) => {
                    self.char_map.entry(ch).or_insert(new_idx);
                }
                (Some(_), Some(_)) => self.pending_ligatures.push((trigger.clone(), new_idx)),
            }
        }
        new_idx
    }

    /// Converts pending multi-char triggers to ligatures. Chars not mapped by the subset
    /// are mapped to new empty glyphs, so that the ligatures can be typed.
    pub(crate) fn resolve_ligatures(&mut self) {
        for (trigger, ligature_idx) in std::mem::take(&mut self.pending_ligatures) {
            let components: Vec<_> = trigger
                .chars()
                .map(|ch| self.component_glyph(ch))
                .collect();
            if self.ligatures.iter().any(|(existing, _)| *existing == components) {
                log::debug!("ligature {trigger:?} is already defined; skipping");
                continue;
            }
            self.ligatures.push((components, ligature_idx));
        }
    }

    fn component_glyph(&mut self, ch: char) -> u16 {
        if let btree_map::Entry::Occupied(entry) = self.char_map.entry(ch) {
            return *entry.get();
        }
        let new_idx = self.push_glyph(SubsetGlyph::placeholder());
        self.char_map.insert(ch, new_idx);
        new_idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{
        ligature_font, rect_glyph, CoverageFormat, GLYPH_A, GLYPH_ABC, GLYPH_XY,
    };

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn pushing_glyphs_with_triggers() {
        let bytes = ligature_font(CoverageFormat::Glyphs);
        let font = Font::new(&bytes).unwrap();
        let notdef = rect_glyph([50, 0, 450, 700], 500);
        let mut subset = FontSubset::new(font, "icons", notdef);

        let abc_glyph = rect_glyph([100, 0, 1100, 700], 1_200);
        let abc = subset.push(GLYPH_ABC, abc_glyph.clone(), &strings(&["\u{e000}", "abc", "ca"]));
        let a = subset.push(GLYPH_A, rect_glyph([100, 0, 500, 700], 600), &strings(&["a"]));
        let xy_glyph = rect_glyph([100, -200, 1100, 400], 1_200);
        let xy = subset.push(GLYPH_XY, xy_glyph, &strings(&["xy", "xy"]));
        assert_eq!((abc, a, xy), (1, 2, 3));
        subset.resolve_ligatures();

        // `b`, `c`, `x` and `y` get placeholder glyphs; `a` is mapped to the real glyph.
        let expected_map = BTreeMap::from([
            ('\u{e000}', abc),
            ('a', a),
            ('b', 4),
            ('c', 5),
            ('x', 6),
            ('y', 7),
        ]);
        assert_eq!(subset.char_map, expected_map);
        assert_eq!(
            subset.ligatures,
            [(vec![a, 4, 5], abc), (vec![5, a], abc), (vec![6, 7], xy)]
        );
        assert_eq!(subset.glyphs.len(), 8);
        assert_eq!(subset.glyphs[1], abc_glyph);
        for placeholder in &subset.glyphs[4..] {
            assert_eq!(*placeholder, SubsetGlyph::placeholder());
        }
    }

    #[test]
    fn repeated_source_glyph_is_added_once() {
        let bytes = ligature_font(CoverageFormat::Glyphs);
        let font = Font::new(&bytes).unwrap();
        let mut subset = FontSubset::new(font, "icons", SubsetGlyph::placeholder());

        let a_glyph = rect_glyph([100, 0, 500, 700], 600);
        assert_eq!(subset.push(GLYPH_A, a_glyph.clone(), &strings(&["a"])), 1);
        assert_eq!(subset.push(GLYPH_A, a_glyph, &strings(&["\u{e001}"])), 1);
        assert_eq!(subset.glyphs.len(), 2);
        assert_eq!(
            subset.char_map,
            BTreeMap::from([('a', 1), ('\u{e001}', 1)])
        );
    }
}
