//! Extraction entry point and its request / response types.

use core::{fmt, str::FromStr};
use std::collections::BTreeMap;

use tokio::sync::mpsc;

use crate::{
    errors::{ExtractError, IllegalRequest},
    font::sfnt_bytes,
    glyph_set::{build_glyph_set, SelectedGlyph},
    ligature::{resolve_raws, Diagnostic, LigatureIndex},
    merge::{GlyphMerger, MergeItem},
    reader::FontHandle,
    render::{OutlineRenderer, RenderedGlyph, SvgTemplate},
};

/// Number of rendered glyphs that may wait in the merge queue.
const MERGE_CHANNEL_CAPACITY: usize = 16;

/// Output font format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Format {
    /// TrueType font.
    Ttf,
    /// Embedded OpenType font.
    Eot,
    /// WOFF 1.0 font.
    Woff,
    /// WOFF 2.0 font.
    Woff2,
    /// SVG font.
    Svg,
}

impl Format {
    /// All supported formats.
    pub const ALL: [Self; 5] = [Self::Ttf, Self::Eot, Self::Woff, Self::Woff2, Self::Svg];

    /// Returns the identifier of this format, which is also the conventional file extension.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ttf => "ttf",
            Self::Eot => "eot",
            Self::Woff => "woff",
            Self::Woff2 => "woff2",
            Self::Svg => "svg",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = IllegalRequest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| IllegalRequest::UnknownFormat(s.to_owned()))
    }
}

/// Options for an [`extract()`] call.
///
/// # Examples
///
/// ```
/// use icon_subset::{ExtractOptions, Format};
///
/// let options = ExtractOptions::new("My Icons")
///     .with_ligatures(["home", "search"])
///     .with_formats([Format::Woff2, Format::Svg]);
/// assert_eq!(options.formats, [Format::Woff2, Format::Svg]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct ExtractOptions {
    /// Family name of the produced fonts. Must be non-empty.
    pub font_name: String,
    /// Ligature strings to extract glyphs for.
    pub ligatures: Vec<String>,
    /// Raw sequences (usually Private Use Area code points) expanded into the ligature strings
    /// producing the same glyphs.
    pub raws: Vec<String>,
    /// Formats to produce. Must be non-empty.
    pub formats: Vec<Format>,
    /// Keeps the glyph of the space char if it is produced by shaping.
    pub with_whitespace: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            font_name: String::new(),
            ligatures: vec![],
            raws: vec![],
            formats: Format::ALL.to_vec(),
            with_whitespace: false,
        }
    }
}

impl ExtractOptions {
    /// Creates options with the specified font name and all output formats.
    pub fn new(font_name: impl Into<String>) -> Self {
        Self {
            font_name: font_name.into(),
            ..Self::default()
        }
    }

    /// Sets ligature strings.
    #[must_use]
    pub fn with_ligatures<S: Into<String>>(
        mut self,
        ligatures: impl IntoIterator<Item = S>,
    ) -> Self {
        self.ligatures = ligatures.into_iter().map(Into::into).collect();
        self
    }

    /// Sets raw sequences.
    #[must_use]
    pub fn with_raws<S: Into<String>>(mut self, raws: impl IntoIterator<Item = S>) -> Self {
        self.raws = raws.into_iter().map(Into::into).collect();
        self
    }

    /// Sets output formats.
    #[must_use]
    pub fn with_formats(mut self, formats: impl IntoIterator<Item = Format>) -> Self {
        self.formats = formats.into_iter().collect();
        self
    }

    /// Sets whether the space glyph is retained.
    #[must_use]
    pub fn with_whitespace(mut self, with_whitespace: bool) -> Self {
        self.with_whitespace = with_whitespace;
        self
    }

    fn validate(&self) -> Result<(), IllegalRequest> {
        if self.font_name.is_empty() {
            Err(IllegalRequest::EmptyFontName)
        } else if self.formats.is_empty() {
            Err(IllegalRequest::NoFormats)
        } else if self.ligatures.is_empty() && self.raws.is_empty() {
            Err(IllegalRequest::NoGlyphs)
        } else {
            Ok(())
        }
    }
}

/// Metadata for an extracted glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct GlyphMeta {
    /// Text the glyph represents in the shaped input.
    pub name: String,
    /// All strings producing the glyph; always contains [`Self::name`].
    pub unicode: Vec<String>,
    /// Standalone SVG document with the glyph outline.
    pub svg: String,
}

/// Result of an [`extract()`] call.
#[derive(Debug, Clone)]
pub struct Extracted {
    /// Produced fonts keyed by their format.
    pub fonts: BTreeMap<Format, Vec<u8>>,
    /// Extracted glyphs in the order of their first occurrence in the shaped input.
    pub meta: Vec<GlyphMeta>,
    /// Non-fatal conditions encountered during extraction.
    pub diagnostics: Vec<Diagnostic>,
}

impl Extracted {
    /// Gets the font in the specified format, if it was requested.
    pub fn get(&self, format: Format) -> Option<&[u8]> {
        self.fonts.get(&format).map(Vec::as_slice)
    }
}

pub(crate) fn assemble_meta(
    glyphs: &[SelectedGlyph],
    rendered: &[RenderedGlyph],
) -> Vec<GlyphMeta> {
    glyphs
        .iter()
        .zip(rendered)
        .map(|(glyph, rendered)| GlyphMeta {
            name: glyph.name.clone(),
            unicode: glyph.unicode.clone(),
            svg: rendered.svg.clone(),
        })
        .collect()
}

/// Extracts glyphs for the requested ligatures and raw sequences from an icon font
/// and packs them into new fonts.
///
/// `font_bytes` may contain an OpenType font with TrueType or CFF outlines, either as is
/// or wrapped into WOFF 1.0 or WOFF2. The produced fonts always have TrueType outlines.
///
/// # Errors
///
/// Returns an error if `options` are invalid (this is checked before `font_bytes` are read),
/// or if the font cannot be parsed. Conditions such as unresolved raw sequences are not errors;
/// they are reported in [`Extracted::diagnostics`].
pub async fn extract(
    font_bytes: &[u8],
    options: &ExtractOptions,
) -> Result<Extracted, ExtractError> {
    options.validate()?;
    let sfnt = sfnt_bytes(font_bytes)?;

    let mut diagnostics = vec![];
    let resolved = if options.raws.is_empty() {
        vec![]
    } else {
        let discovery = FontHandle::open(&sfnt)?;
        let index = LigatureIndex::build(&discovery)?;
        resolve_raws(&discovery, index.as_ref(), &options.raws, &mut diagnostics)
    };

    let handle = FontHandle::open(&sfnt)?;
    let strings: Vec<_> = options.ligatures.iter().chain(&resolved).cloned().collect();
    let glyphs = build_glyph_set(&handle, &strings, options.with_whitespace);
    let renderer = OutlineRenderer::new(SvgTemplate::new(handle.ascender()));
    let rendered: Vec<_> = glyphs
        .iter()
        .map(|glyph| renderer.render(&handle, glyph.id))
        .collect();
    let meta = assemble_meta(&glyphs, &rendered);

    let merger = GlyphMerger::new(&handle, &options.font_name);
    let (sender, receiver) = mpsc::channel(MERGE_CHANNEL_CAPACITY);
    let produce = async move {
        for (glyph, rendered) in glyphs.into_iter().zip(rendered) {
            let item = MergeItem {
                glyph: glyph.id,
                name: glyph.name,
                triggers: glyph.unicode,
                rendered,
            };
            if sender.send(item).await.is_err() {
                break; // the merger has stopped
            }
        }
    };
    let ((), merged) = tokio::join!(produce, merger.run(receiver));

    let mut fonts = BTreeMap::new();
    for &format in &options.formats {
        fonts.entry(format).or_insert_with(|| {
            let bytes = merged.transcode(format);
            log::debug!("produced {format} font ({} bytes)", bytes.len());
            bytes
        });
    }

    Ok(Extracted {
        fonts,
        meta,
        diagnostics,
    })
}
