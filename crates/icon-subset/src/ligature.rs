//! Ligature discovery: indexing the `GSUB` ligature table and expanding raw sequences
//! into ligature strings the font encodes.

use std::{collections::BTreeMap, fmt};

use crate::{font::LigatureCandidate, reader::FontHandle, ParseError};

/// Non-fatal condition encountered during extraction. Diagnostics are logged and returned
/// alongside the extraction results.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "camelCase")
)]
#[non_exhaustive]
pub enum Diagnostic {
    /// The font has no ligature substitution lookups, so a raw sequence cannot be resolved.
    NoLigatureTable {
        /// Raw sequence that was skipped.
        raw: String,
    },
    /// A raw sequence doesn't shape to a glyph produced by a known ligature.
    UnresolvedRawSequence {
        /// Raw sequence that was dropped.
        raw: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLigatureTable { raw } => {
                write!(formatter, "font has no ligature table; skipped raw sequence {raw:?}")
            }
            Self::UnresolvedRawSequence { raw } => {
                write!(formatter, "no ligature found for raw sequence {raw:?}")
            }
        }
    }
}

/// Ligature contributing to a ligature glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LigatureEntry {
    /// Text of the leading glyph; `None` if the glyph is not reverse-mapped by `cmap`.
    pub(crate) leading_text: Option<String>,
    pub(crate) candidate: LigatureCandidate,
}

/// Mapping from ligature glyphs to all ligatures producing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LigatureIndex {
    entries: BTreeMap<u16, Vec<LigatureEntry>>,
}

impl LigatureIndex {
    /// Builds an index from the first sub-table of the first ligature substitution lookup.
    /// Returns `Ok(None)` if the font has no such lookup.
    pub(crate) fn build(handle: &FontHandle<'_>) -> Result<Option<Self>, ParseError> {
        let lookups = handle.ligature_lookups()?;
        let Some(lookup) = lookups.iter().find(|lookup| lookup.is_ligature()) else {
            return Ok(None);
        };
        if lookup.subtable_count() > 1 {
            log::debug!(
                "ligature lookup has {} sub-tables; only the first one is indexed",
                lookup.subtable_count()
            );
        }
        let Some(subtable) = lookup.ligature_subtable(0)? else {
            return Ok(Some(Self::default()));
        };

        let leading_glyphs = subtable.coverage.glyphs();
        if leading_glyphs.len() != subtable.ligature_sets.len() {
            log::debug!(
                "coverage lists {} glyphs, but there are {} ligature sets",
                leading_glyphs.len(),
                subtable.ligature_sets.len()
            );
        }

        let mut entries = BTreeMap::<_, Vec<_>>::new();
        for (leading_glyph, set) in leading_glyphs.into_iter().zip(subtable.ligature_sets) {
            let leading_text = handle.text_for(leading_glyph);
            for candidate in set {
                entries
                    .entry(candidate.ligature_glyph)
                    .or_default()
                    .push(LigatureEntry {
                        leading_text: leading_text.clone(),
                        candidate,
                    });
            }
        }
        let this = Self { entries };
        log::debug!("indexed {} ligature glyphs", this.entries.len());
        Ok(Some(this))
    }

    pub(crate) fn get(&self, ligature_glyph: u16) -> &[LigatureEntry] {
        self.entries.get(&ligature_glyph).map_or(&[], Vec::as_slice)
    }

    /// Reconstructs the text producing a ligature. Returns `None` if the leading glyph
    /// or one of the components has no textual representation.
    fn reconstruct(handle: &FontHandle<'_>, entry: &LigatureEntry) -> Option<String> {
        let mut text = entry.leading_text.clone()?;
        for &component in &entry.candidate.component_glyphs {
            text.push_str(&handle.text_for(component)?);
        }
        Some(text)
    }
}

/// Expands raw sequences into the ligature strings producing the same glyphs. A single
/// raw sequence may expand into multiple strings; all of them are retained in the index order.
///
/// `handle` must be the handle `index` was built with.
pub(crate) fn resolve_raws(
    handle: &FontHandle<'_>,
    index: Option<&LigatureIndex>,
    raws: &[String],
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<String> {
    let mut resolved = vec![];
    for raw in raws {
        let Some(index) = index else {
            log::warn!("font has no ligature table; skipping raw sequence {raw:?}");
            diagnostics.push(Diagnostic::NoLigatureTable { raw: raw.clone() });
            continue;
        };

        let shaped = handle.layout(raw);
        let entries = match shaped.as_slice() {
            [glyph] => index.get(glyph.id),
            _ => &[],
        };
        let len_before = resolved.len();
        for entry in entries {
            if let Some(text) = LigatureIndex::reconstruct(handle, entry) {
                log::trace!("resolved raw sequence {raw:?} to {text:?}");
                resolved.push(text);
            } else {
                log::debug!(
                    "skipping ligature {:?} for raw sequence {raw:?}: not all glyphs map to chars",
                    entry.candidate
                );
            }
        }

        if resolved.len() == len_before {
            log::warn!("no ligature found for raw sequence {raw:?}");
            diagnostics.push(Diagnostic::UnresolvedRawSequence { raw: raw.clone() });
        }
    }
    resolved
}
