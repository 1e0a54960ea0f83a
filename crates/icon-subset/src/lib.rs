//! Extraction of icon glyphs from ligature-based icon fonts.
//!
//! Given a font and a list of ligature strings (e.g., `home`) and / or raw sequences
//! (e.g., Private Use Area code points), [`extract()`] shapes the strings, selects
//! the produced glyphs, renders each one to a standalone SVG document, and packs the glyphs
//! into new fonts (TrueType, EOT, WOFF, WOFF2 and SVG) with the same ligatures.
//!
//! # Examples
//!
//! ```no_run
//! use icon_subset::{extract, ExtractOptions, Format};
//!
//! # async fn test_wrapper() -> Result<(), Box<dyn std::error::Error>> {
//! let font_bytes = std::fs::read("MaterialIcons-Regular.ttf")?;
//! let options = ExtractOptions::new("My Icons")
//!     .with_ligatures(["home", "search"])
//!     .with_formats([Format::Woff2]);
//! let extracted = extract(&font_bytes, &options).await?;
//! for glyph in &extracted.meta {
//!     println!("{}: {:?}", glyph.name, glyph.unicode);
//! }
//! let woff2 = extracted.get(Format::Woff2).unwrap();
//! assert!(!woff2.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! # Crate features
//!
//! ## `serde`
//!
//! *(Off by default)*
//!
//! Implements `serde` traits for [`ExtractOptions`], [`Format`], [`GlyphMeta`]
//! and [`Diagnostic`].

mod compression;
mod errors;
mod extract;
mod font;
mod glyph_set;
mod ligature;
mod merge;
mod reader;
mod render;
mod subset;
#[cfg(test)]
pub(crate) mod tests;
mod write;

pub use crate::{
    errors::{ExtractError, IllegalRequest, ParseError, ParseErrorKind},
    extract::{extract, ExtractOptions, Extracted, Format, GlyphMeta},
    font::TableTag,
    ligature::Diagnostic,
};
