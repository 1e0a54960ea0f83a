//! `GSUB` table with a single ligature substitution lookup.

use std::collections::BTreeMap;

use super::{write_u16, write_u32};

/// Format of the coverage table written for a ligature substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoverageFormat {
    /// Explicit glyph list (format 1).
    Glyphs,
    /// Glyph ranges (format 2).
    Ranges,
}

/// For each leading glyph, trailing components and the ligature glyph.
type LigatureSets = BTreeMap<u16, Vec<(Vec<u16>, u16)>>;

/// Ligatures grouped by the leading glyph.
#[derive(Debug, Clone)]
pub(crate) struct LigatureTable {
    /// Sub-tables of the single ligature lookup. The subset writer always produces one.
    subtables: Vec<LigatureSets>,
    coverage_format: Option<CoverageFormat>,
}

impl LigatureTable {
    /// Scripts sorted by tag.
    const SCRIPTS: [[u8; 4]; 2] = [*b"DFLT", *b"latn"];
    const FEATURE: [u8; 4] = *b"liga";

    /// Creates a table from `(components, ligature)` tuples. Components include the leading glyph.
    /// If several ligatures have the same components, the first one wins.
    pub(crate) fn new(ligatures: impl IntoIterator<Item = (Vec<u16>, u16)>) -> Self {
        Self {
            subtables: vec![Self::group(ligatures)],
            coverage_format: None,
        }
    }

    fn group(ligatures: impl IntoIterator<Item = (Vec<u16>, u16)>) -> LigatureSets {
        let mut sets = LigatureSets::new();
        for (components, ligature) in ligatures {
            let Some((&leading, trailing)) = components.split_first() else {
                continue;
            };
            let set = sets.entry(leading).or_default();
            if set.iter().all(|(existing, _)| existing != trailing) {
                set.push((trailing.to_vec(), ligature));
            }
        }
        // Longer ligatures must be tried first.
        for set in sets.values_mut() {
            set.sort_by_key(|(trailing, _)| std::cmp::Reverse(trailing.len()));
        }
        sets
    }

    /// Appends another sub-table to the lookup.
    #[cfg(test)]
    pub(crate) fn with_subtable(
        mut self,
        ligatures: impl IntoIterator<Item = (Vec<u16>, u16)>,
    ) -> Self {
        self.subtables.push(Self::group(ligatures));
        self
    }

    /// Forces the coverage format. By default, the shortest format is selected.
    #[cfg(test)]
    pub(crate) fn with_coverage_format(mut self, format: CoverageFormat) -> Self {
        self.coverage_format = Some(format);
        self
    }

    fn coverage_ranges(sets: &LigatureSets) -> Vec<(u16, u16)> {
        let mut ranges: Vec<(u16, u16)> = vec![];
        for &glyph in sets.keys() {
            match ranges.last_mut() {
                Some((_, end)) if end.checked_add(1) == Some(glyph) => *end = glyph,
                _ => ranges.push((glyph, glyph)),
            }
        }
        ranges
    }

    pub(crate) fn write(&self, writer: &mut Vec<u8>) {
        let start = writer.len();
        write_u32(writer, 0x_0001_0000); // version
        let script_list = reserve_offset(writer);
        let feature_list = reserve_offset(writer);
        let lookup_list = reserve_offset(writer);

        patch_offset(writer, script_list, start);
        Self::write_script_list(writer);
        patch_offset(writer, feature_list, start);
        Self::write_feature_list(writer);
        patch_offset(writer, lookup_list, start);
        self.write_lookup_list(writer);
    }

    fn write_script_list(writer: &mut Vec<u8>) {
        let start = writer.len();
        write_u16(writer, 2); // scriptCount
        let offsets: Vec<_> = Self::SCRIPTS
            .iter()
            .map(|tag| {
                writer.extend_from_slice(tag);
                reserve_offset(writer)
            })
            .collect();

        for offset in offsets {
            patch_offset(writer, offset, start);
            write_u16(writer, 4); // defaultLangSysOffset
            write_u16(writer, 0); // langSysCount
            write_u16(writer, 0); // lookupOrderOffset
            write_u16(writer, u16::MAX); // requiredFeatureIndex
            write_u16(writer, 1); // featureIndexCount
            write_u16(writer, 0);
        }
    }

    fn write_feature_list(writer: &mut Vec<u8>) {
        write_u16(writer, 1); // featureCount
        writer.extend_from_slice(&Self::FEATURE);
        write_u16(writer, 8); // featureOffset
        write_u16(writer, 0); // featureParamsOffset
        write_u16(writer, 1); // lookupIndexCount
        write_u16(writer, 0);
    }

    fn write_lookup_list(&self, writer: &mut Vec<u8>) {
        write_u16(writer, 1); // lookupCount
        write_u16(writer, 4); // lookupOffset
        let lookup_start = writer.len();
        write_u16(writer, 4); // lookupType: ligature substitution
        write_u16(writer, 0); // lookupFlag
        let subtable_count = u16::try_from(self.subtables.len()).expect("too many sub-tables");
        write_u16(writer, subtable_count);
        let offsets: Vec<_> = self.subtables.iter().map(|_| reserve_offset(writer)).collect();
        for (sets, offset) in self.subtables.iter().zip(offsets) {
            patch_offset(writer, offset, lookup_start);
            self.write_subtable(sets, writer);
        }
    }

    fn write_subtable(&self, sets: &LigatureSets, writer: &mut Vec<u8>) {
        let start = writer.len();
        write_u16(writer, 1); // substFormat
        let coverage = reserve_offset(writer);
        let set_count = u16::try_from(sets.len()).expect("too many ligature sets");
        write_u16(writer, set_count);
        let set_offsets: Vec<_> = sets.keys().map(|_| reserve_offset(writer)).collect();

        patch_offset(writer, coverage, start);
        self.write_coverage(sets, writer);
        for (set, offset) in sets.values().zip(set_offsets) {
            patch_offset(writer, offset, start);
            Self::write_ligature_set(set, writer);
        }
    }

    fn write_coverage(&self, sets: &LigatureSets, writer: &mut Vec<u8>) {
        let ranges = Self::coverage_ranges(sets);
        let format = self.coverage_format.unwrap_or_else(|| {
            // Format 1 takes 2 bytes per glyph, format 2 takes 6 bytes per range.
            if ranges.len() * 6 < sets.len() * 2 {
                CoverageFormat::Ranges
            } else {
                CoverageFormat::Glyphs
            }
        });

        match format {
            CoverageFormat::Glyphs => {
                write_u16(writer, 1);
                write_u16(writer, u16::try_from(sets.len()).expect("too many glyphs"));
                for &glyph in sets.keys() {
                    write_u16(writer, glyph);
                }
            }
            CoverageFormat::Ranges => {
                write_u16(writer, 2);
                write_u16(writer, u16::try_from(ranges.len()).expect("too many ranges"));
                let mut coverage_idx = 0_u16;
                for (start, end) in ranges {
                    write_u16(writer, start);
                    write_u16(writer, end);
                    write_u16(writer, coverage_idx);
                    coverage_idx += end - start + 1;
                }
            }
        }
    }

    fn write_ligature_set(set: &[(Vec<u16>, u16)], writer: &mut Vec<u8>) {
        let start = writer.len();
        write_u16(writer, u16::try_from(set.len()).expect("too many ligatures"));
        let offsets: Vec<_> = set.iter().map(|_| reserve_offset(writer)).collect();
        for ((trailing, ligature), offset) in set.iter().zip(offsets) {
            patch_offset(writer, offset, start);
            write_u16(writer, *ligature);
            let component_count = u16::try_from(trailing.len() + 1).expect("too many components");
            write_u16(writer, component_count);
            for &component in trailing {
                write_u16(writer, component);
            }
        }
    }
}

fn reserve_offset(writer: &mut Vec<u8>) -> usize {
    let pos = writer.len();
    write_u16(writer, 0);
    pos
}

/// Sets the offset at `pos` to point to the current end of `writer`, relative to `base`.
fn patch_offset(writer: &mut Vec<u8>, pos: usize, base: usize) {
    let offset = u16::try_from(writer.len() - base).expect("GSUB offset overflow");
    writer[pos..pos + 2].copy_from_slice(&offset.to_be_bytes());
}
