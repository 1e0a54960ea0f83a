//! Synthetic test fonts and end-to-end extraction tests.

use std::{collections::BTreeMap, env, io::Write, process::Command, sync::OnceLock};

use allsorts::{binary::read::ReadScope, font::MatchingPresentation, font_data::FontData};
use test_casing::test_casing;

pub(crate) use crate::write::CoverageFormat;
use crate::{
    extract,
    font::{ContourPoint, Font, SimpleGlyph, SubsetGlyph},
    subset::FontSubset,
    write::{
        write_cmap, write_u16, write_u32, FontNames, FontWriter, GlyfBuilder, LigatureTable,
        LocaFormat,
    },
    Diagnostic, ExtractError, ExtractOptions, Format, GlyphMeta, IllegalRequest, TableTag,
};

pub(crate) const GLYPH_SPACE: u16 = 1;
pub(crate) const GLYPH_A: u16 = 2;
pub(crate) const GLYPH_B: u16 = 3;
pub(crate) const GLYPH_C: u16 = 4;
pub(crate) const GLYPH_X: u16 = 5;
pub(crate) const GLYPH_Y: u16 = 6;
pub(crate) const GLYPH_ABC: u16 = 7;
pub(crate) const GLYPH_XY: u16 = 8;
pub(crate) const GLYPH_BC: u16 = 9;
pub(crate) const GLYPH_A_UMLAUT: u16 = 10;

const UNITS_PER_EM: u16 = 1_000;
const ASCENDER: i16 = 800;
const DESCENDER: i16 = -200;
/// Supplementary-plane char mapped to the `bc` glyph in [`supplementary_font()`].
const SUPPLEMENTARY_CHAR: char = '\u{f0001}';

#[derive(Debug, Clone, Copy)]
enum TestGlyph {
    Empty,
    /// Rectangle `[x_min, y_min, x_max, y_max]`.
    Rect([i16; 4]),
    /// Composite glyph referencing a single glyph without offset.
    Composite { component: u16, bbox: [i16; 4] },
}

/// Glyphs with their advance widths, indexed by the glyph ID.
const GLYPHS: [(TestGlyph, u16); 11] = [
    (TestGlyph::Rect([50, 0, 450, 700]), 500),  // .notdef
    (TestGlyph::Empty, 300),                    // space
    (TestGlyph::Rect([100, 0, 500, 700]), 600), // a
    (TestGlyph::Rect([100, 0, 500, 600]), 600), // b
    (TestGlyph::Rect([100, 0, 500, 500]), 600), // c
    (TestGlyph::Rect([100, 0, 500, 400]), 600), // x
    (TestGlyph::Rect([100, -200, 500, 400]), 600), // y
    (TestGlyph::Rect([100, 0, 1_100, 700]), 1_200), // abc
    (TestGlyph::Rect([100, -200, 1_100, 400]), 1_200), // xy
    (TestGlyph::Rect([100, 0, 900, 600]), 1_000), // bc
    (
        TestGlyph::Composite {
            component: GLYPH_A,
            bbox: [100, 0, 500, 700],
        },
        600,
    ), // ä
];

const CHAR_MAP: [(char, u16); 8] = [
    (' ', GLYPH_SPACE),
    ('a', GLYPH_A),
    ('b', GLYPH_B),
    ('c', GLYPH_C),
    ('x', GLYPH_X),
    ('y', GLYPH_Y),
    ('ä', GLYPH_A_UMLAUT),
    ('\u{e000}', GLYPH_ABC),
];

fn ligatures() -> Vec<(Vec<u16>, u16)> {
    vec![
        (vec![GLYPH_A, GLYPH_B, GLYPH_C], GLYPH_ABC),
        (vec![GLYPH_C, GLYPH_A], GLYPH_ABC),
        (vec![GLYPH_B, GLYPH_C], GLYPH_BC),
        (vec![GLYPH_X, GLYPH_Y], GLYPH_XY),
    ]
}

fn write_i16(buffer: &mut Vec<u8>, value: i16) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

/// Creates a glyph with a clockwise rectangular contour `[x_min, y_min, x_max, y_max]`.
pub(crate) fn rect_glyph([x_min, y_min, x_max, y_max]: [i16; 4], advance: u16) -> SubsetGlyph {
    SubsetGlyph {
        outline: SimpleGlyph {
            contours: vec![vec![
                ContourPoint::on(x_min, y_min),
                ContourPoint::on(x_min, y_max),
                ContourPoint::on(x_max, y_max),
                ContourPoint::on(x_max, y_min),
            ]],
            instructions: vec![],
        },
        advance,
    }
}

impl TestGlyph {
    fn bbox(self) -> Option<[i16; 4]> {
        match self {
            Self::Empty => None,
            Self::Rect(bbox) | Self::Composite { bbox, .. } => Some(bbox),
        }
    }

    fn x_min(self) -> i16 {
        self.bbox().map_or(0, |[x_min, ..]| x_min)
    }

    fn push_to(self, builder: &mut GlyfBuilder) {
        match self {
            Self::Empty => builder.push_raw(&[]),
            Self::Rect(bbox) => builder.push_simple(&rect_glyph(bbox, 0).outline),
            Self::Composite { component, bbox } => {
                const ARGS_ARE_XY_VALUES: u16 = 0x0002;

                let mut buffer = vec![];
                write_i16(&mut buffer, -1); // numberOfContours
                for coord in bbox {
                    write_i16(&mut buffer, coord);
                }
                write_u16(&mut buffer, ARGS_ARE_XY_VALUES);
                write_u16(&mut buffer, component);
                write_u16(&mut buffer, 0); // zero x and y offsets
                builder.push_raw(&buffer);
            }
        }
    }

    /// Encodes the glyph as a Type 2 charstring. The top edge of rectangles is drawn
    /// as a flat cubic curve.
    fn charstring(self) -> Vec<u8> {
        const RLINETO: u8 = 5;
        const ENDCHAR: u8 = 14;
        const RMOVETO: u8 = 21;
        const RRCURVETO: u8 = 8;
        const SHORTINT: u8 = 28;

        fn write_args(buffer: &mut Vec<u8>, args: &[i16]) {
            for &arg in args {
                buffer.push(SHORTINT);
                write_i16(buffer, arg);
            }
        }

        let mut buffer = vec![];
        if let Some([x_min, y_min, x_max, y_max]) = self.bbox() {
            let (width, height) = (x_max - x_min, y_max - y_min);
            let third = width / 3;
            write_args(&mut buffer, &[x_min, y_min]);
            buffer.push(RMOVETO);
            write_args(&mut buffer, &[0, height]);
            buffer.push(RLINETO);
            write_args(&mut buffer, &[third, 0, width - 2 * third, 0, third, 0]);
            buffer.push(RRCURVETO);
            write_args(&mut buffer, &[0, -height]);
            buffer.push(RLINETO);
        }
        buffer.push(ENDCHAR);
        buffer
    }
}

fn head_table(loca_format: LocaFormat) -> Vec<u8> {
    let mut buffer = vec![];
    write_u32(&mut buffer, 0x_0001_0000); // version
    write_u32(&mut buffer, 0x_0001_0000); // fontRevision
    write_u32(&mut buffer, 0); // checksumAdjustment
    write_u32(&mut buffer, 0x_5f0f_3cf5); // magicNumber
    write_u16(&mut buffer, 0x000b); // flags
    write_u16(&mut buffer, UNITS_PER_EM);
    buffer.extend_from_slice(&[0; 16]); // created, modified
    for coord in [50, -200, 1_100, 700] {
        write_i16(&mut buffer, coord);
    }
    write_u16(&mut buffer, 0); // macStyle
    write_u16(&mut buffer, 8); // lowestRecPPEM
    write_i16(&mut buffer, 2); // fontDirectionHint
    write_u16(&mut buffer, loca_format.head_field());
    write_u16(&mut buffer, 0); // glyphDataFormat
    assert_eq!(buffer.len(), Font::HEAD_LEN);
    buffer
}
fn hhea_table() -> Vec<u8> {
    let mut buffer = vec![];
    write_u32(&mut buffer, 0x_0001_0000); // version
    write_i16(&mut buffer, ASCENDER);
    write_i16(&mut buffer, DESCENDER);
    write_i16(&mut buffer, 0); // lineGap
    write_u16(&mut buffer, 1_200); // advanceWidthMax
    write_i16(&mut buffer, 50); // minLeftSideBearing
    write_i16(&mut buffer, 0); // minRightSideBearing
    write_i16(&mut buffer, 1_100); // xMaxExtent
    write_i16(&mut buffer, 1); // caretSlopeRise
    write_i16(&mut buffer, 0); // caretSlopeRun
    buffer.extend_from_slice(&[0; 12]); // caretOffset, reserved, metricDataFormat
    write_u16(&mut buffer, GLYPHS.len().try_into().unwrap()); // numberOfHMetrics
    assert_eq!(buffer.len(), 36);
    buffer
}

fn maxp_table() -> Vec<u8> {
    let mut buffer = vec![];
    write_u32(&mut buffer, 0x_0001_0000); // version
    write_u16(&mut buffer, GLYPHS.len().try_into().unwrap());
    write_u16(&mut buffer, 4); // maxPoints
    write_u16(&mut buffer, 1); // maxContours
    write_u16(&mut buffer, 4); // maxCompositePoints
    write_u16(&mut buffer, 1); // maxCompositeContours
    write_u16(&mut buffer, 2); // maxZones
    buffer.extend_from_slice(&[0; 12]); // twilight points, storage, function defs, etc.
    write_u16(&mut buffer, 1); // maxComponentElements
    write_u16(&mut buffer, 1); // maxComponentDepth
    assert_eq!(buffer.len(), 32);
    buffer
}

fn os2_table() -> Vec<u8> {
    let mut buffer = vec![];
    write_u16(&mut buffer, 1); // version
    write_i16(&mut buffer, 600); // xAvgCharWidth
    write_u16(&mut buffer, 400); // usWeightClass
    write_u16(&mut buffer, 5); // usWidthClass
    write_u16(&mut buffer, 0); // fsType
    for value in [650, 700, 0, 140, 650, 700, 0, 480, 50, 250] {
        write_i16(&mut buffer, value); // sub- and superscript metrics, strikeout
    }
    write_i16(&mut buffer, 0); // sFamilyClass
    buffer.extend_from_slice(&[0; 10]); // panose
    write_u32(&mut buffer, 1); // ulUnicodeRange1: Basic Latin
    write_u32(&mut buffer, 1 << 28); // ulUnicodeRange2: Private Use Area
    write_u32(&mut buffer, 0);
    write_u32(&mut buffer, 0);
    buffer.extend_from_slice(b"TEST"); // achVendID
    write_u16(&mut buffer, 0x0040); // fsSelection: REGULAR
    write_u16(&mut buffer, 0x20); // usFirstCharIndex
    write_u16(&mut buffer, 0xe000); // usLastCharIndex
    write_i16(&mut buffer, ASCENDER); // sTypoAscender
    write_i16(&mut buffer, DESCENDER); // sTypoDescender
    write_i16(&mut buffer, 0); // sTypoLineGap
    write_u16(&mut buffer, ASCENDER.unsigned_abs()); // usWinAscent
    write_u16(&mut buffer, DESCENDER.unsigned_abs()); // usWinDescent
    write_u32(&mut buffer, 1); // ulCodePageRange1: Latin 1
    write_u32(&mut buffer, 0);
    assert_eq!(buffer.len(), 86);
    buffer
}

fn post_table() -> Vec<u8> {
    let mut buffer = vec![];
    write_u32(&mut buffer, 0x_0003_0000); // version
    write_u32(&mut buffer, 0); // italicAngle
    write_i16(&mut buffer, -100); // underlinePosition
    write_i16(&mut buffer, 50); // underlineThickness
    buffer.extend_from_slice(&[0; 20]); // isFixedPitch, memory usage
    assert_eq!(buffer.len(), 32);
    buffer
}

/// Writes a CFF table with a charstring per glyph and no private dict.
fn cff_table() -> Vec<u8> {
    fn write_index(buffer: &mut Vec<u8>, items: &[Vec<u8>]) {
        write_u16(buffer, items.len().try_into().unwrap());
        if items.is_empty() {
            return;
        }
        buffer.push(2); // offSize
        let mut offset = 1_u16;
        write_u16(buffer, offset);
        for item in items {
            offset += u16::try_from(item.len()).unwrap();
            write_u16(buffer, offset);
        }
        for item in items {
            buffer.extend_from_slice(item);
        }
    }

    const CHAR_STRINGS_OP: u8 = 17;
    const LONGINT: u8 = 29;

    let mut prefix = vec![1, 0, 4, 2]; // major, minor, hdrSize, offSize
    write_index(&mut prefix, &[b"LigatureTest".to_vec()]);
    // Top DICT has a fixed size since the offset is encoded as a 32-bit integer.
    let top_dict_len = 6;
    let top_dict_index_len = 2 + 1 + 2 * 2 + top_dict_len;
    let empty_indexes_len = 2 * 2; // String INDEX, Global Subr INDEX
    let char_strings_offset = prefix.len() + top_dict_index_len + empty_indexes_len;

    let mut top_dict = vec![LONGINT];
    write_u32(&mut top_dict, char_strings_offset.try_into().unwrap());
    top_dict.push(CHAR_STRINGS_OP);
    assert_eq!(top_dict.len(), top_dict_len);

    let mut buffer = prefix;
    write_index(&mut buffer, &[top_dict]);
    write_index(&mut buffer, &[]);
    write_index(&mut buffer, &[]);
    assert_eq!(buffer.len(), char_strings_offset);
    let char_strings: Vec<_> = GLYPHS.iter().map(|(glyph, _)| glyph.charstring()).collect();
    write_index(&mut buffer, &char_strings);
    buffer
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outlines {
    TrueType,
    Cff,
}

fn build_font(
    gsub: Option<LigatureTable>,
    outlines: Outlines,
    extra_chars: &[(char, u16)],
) -> Vec<u8> {
    let mut writer = match outlines {
        Outlines::TrueType => FontWriter::default(),
        Outlines::Cff => FontWriter::new(Font::CFF_SFNT_VERSION),
    };
    let char_map: BTreeMap<_, _> = CHAR_MAP.iter().chain(extra_chars).copied().collect();
    writer.table(TableTag::CMAP, |buffer| write_cmap(&char_map, buffer));
    writer.raw_table(TableTag::HHEA, hhea_table());
    writer.table(TableTag::HMTX, |buffer| {
        for (glyph, advance) in GLYPHS {
            write_u16(buffer, advance);
            write_i16(buffer, glyph.x_min());
        }
    });
    writer.raw_table(TableTag::MAXP, maxp_table());
    writer.table(TableTag::NAME, |buffer| {
        FontNames::new("Ligature Test").write(buffer);
    });
    writer.raw_table(TableTag::OS2, os2_table());
    writer.raw_table(TableTag::POST, post_table());

    match outlines {
        Outlines::TrueType => {
            let mut glyf = GlyfBuilder::default();
            for (glyph, _) in GLYPHS {
                glyph.push_to(&mut glyf);
            }
            let (glyf, loca) = glyf.finish(LocaFormat::Short).unwrap();
            writer.raw_table(TableTag::GLYF, glyf);
            writer.raw_table(TableTag::LOCA, loca);
        }
        Outlines::Cff => writer.raw_table(TableTag::CFF, cff_table()),
    }
    writer.raw_table(TableTag::HEAD, head_table(LocaFormat::Short));
    if let Some(gsub) = gsub {
        writer.table(TableTag::GSUB, |buffer| gsub.write(buffer));
    }
    writer.finish().to_bytes()
}

/// Creates a font with ligatures `abc`, `ca` (both mapped to the `abc` glyph), `bc` and `xy`.
/// The `abc` glyph is additionally mapped to U+E000.
pub(crate) fn ligature_font(coverage_format: CoverageFormat) -> Vec<u8> {
    let gsub = LigatureTable::new(ligatures()).with_coverage_format(coverage_format);
    build_font(Some(gsub), Outlines::TrueType, &[])
}

/// Creates a font with the same glyphs and char mapping as [`ligature_font()`], but with
/// the specified ligatures.
pub(crate) fn font_with_ligatures(gsub: LigatureTable) -> Vec<u8> {
    build_font(Some(gsub), Outlines::TrueType, &[])
}

/// Creates a font with the same glyphs as [`ligature_font()`], but without `GSUB`.
pub(crate) fn plain_font() -> Vec<u8> {
    build_font(None, Outlines::TrueType, &[])
}

/// Same as [`ligature_font()`], but with CFF outlines.
fn cff_ligature_font() -> Vec<u8> {
    build_font(Some(LigatureTable::new(ligatures())), Outlines::Cff, &[])
}

/// Same as [`ligature_font()`], but the `bc` glyph is additionally mapped to a supplementary-plane
/// char, so that `cmap` contains both format 4 and format 12 subtables.
fn supplementary_font() -> Vec<u8> {
    let gsub = LigatureTable::new(ligatures());
    build_font(Some(gsub), Outlines::TrueType, &[(SUPPLEMENTARY_CHAR, GLYPH_BC)])
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|&s| s.to_owned()).collect()
}

/// Creates a subset with the `abc` glyph (triggered by U+E000 and `abc`) and the `xy` glyph.
pub(crate) fn test_subset(font: Font<'_>) -> FontSubset<'_> {
    let notdef = rect_glyph([50, 0, 450, 700], 500);
    let mut subset = FontSubset::new(font, "Test Icons", notdef);
    let abc = rect_glyph([100, 0, 1_100, 700], 1_200);
    subset.push(GLYPH_ABC, abc, &strings(&["\u{e000}", "abc"]));
    let xy = rect_glyph([100, -200, 1_100, 400], 1_200);
    subset.push(GLYPH_XY, xy, &strings(&["xy"]));
    subset.resolve_ligatures();
    subset
}

#[derive(Debug)]
struct OpenTypeSanitizer {
    path: Option<String>,
}

impl Default for OpenTypeSanitizer {
    fn default() -> Self {
        let Ok(path) = env::var("OTS_SANITIZER") else {
            return Self { path: None };
        };
        let output = Command::new(&path)
            .arg("--version")
            .output()
            .unwrap_or_else(|err| {
                panic!("failed getting version for ots-sanitize at {path}: {err}");
            });
        assert!(
            output.status.success(),
            "failed getting version for ots-sanitize at {path}: non-zero exit code"
        );
        println!(
            "ots-sanitize version: {}",
            String::from_utf8_lossy(&output.stdout)
        );
        Self { path: Some(path) }
    }
}

impl OpenTypeSanitizer {
    fn get() -> &'static Self {
        static SANITIZER: OnceLock<OpenTypeSanitizer> = OnceLock::new();
        SANITIZER.get_or_init(Self::default)
    }

    fn validate(&self, content: &[u8]) {
        let Some(path) = &self.path else {
            println!("OTS_SANITIZER env var is missing; skipping checks");
            return;
        };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.as_file_mut().write_all(content).unwrap();
        file.as_file_mut().flush().unwrap();
        let file_path = file.into_temp_path();

        let output = Command::new(path)
            .arg(&file_path)
            .output()
            .expect("failed running ots-sanitize");
        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("ots-sanitize failed:\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}");
        }
    }
}

fn assert_valid_font(raw: &[u8], expected_chars: impl Iterator<Item = char>) {
    let font_file = ReadScope::new(raw).read::<FontData>().unwrap();
    let font_provider = font_file.table_provider(0).unwrap();
    let mut font = allsorts::Font::new(font_provider).unwrap();
    for ch in expected_chars {
        let (glyph_id, _) = font.lookup_glyph_index(ch, MatchingPresentation::NotRequired, None);
        assert_ne!(glyph_id, 0, "{ch:?} is not mapped");
    }

    OpenTypeSanitizer::get().validate(raw);
}

/// Shapes `text` with the default features and returns the produced glyph IDs.
fn shape(font_bytes: &[u8], text: &str) -> Vec<u32> {
    let face = rustybuzz::Face::from_slice(font_bytes, 0).unwrap();
    let mut buffer = rustybuzz::UnicodeBuffer::new();
    buffer.push_str(text);
    buffer.guess_segment_properties();
    let output = rustybuzz::shape(&face, &[], buffer);
    output.glyph_infos().iter().map(|info| info.glyph_id).collect()
}

#[test_casing(2, [CoverageFormat::Glyphs, CoverageFormat::Ranges])]
fn reading_test_font(coverage_format: CoverageFormat) {
    let bytes = ligature_font(coverage_format);
    let font = Font::new(&bytes).unwrap();
    assert_eq!(usize::from(font.glyph_count()), GLYPHS.len());

    let font_file = ReadScope::new(&bytes).read::<FontData>().unwrap();
    let font_provider = font_file.table_provider(0).unwrap();
    let mut reference_font = allsorts::Font::new(font_provider).unwrap();
    for (ch, expected_idx) in CHAR_MAP {
        assert_eq!(font.map_char(ch), Ok(expected_idx));
        let (reference_idx, _) =
            reference_font.lookup_glyph_index(ch, MatchingPresentation::NotRequired, None);
        assert_eq!(reference_idx, expected_idx);
    }

    assert_eq!(shape(&bytes, "abc"), [u32::from(GLYPH_ABC)]);
    assert_eq!(shape(&bytes, "ca"), [u32::from(GLYPH_ABC)]);
    assert_eq!(shape(&bytes, "bc"), [u32::from(GLYPH_BC)]);
    OpenTypeSanitizer::get().validate(&bytes);
}

#[tokio::test]
async fn extracting_single_ligature() {
    let bytes = ligature_font(CoverageFormat::Glyphs);
    let options = ExtractOptions::new("My Icons")
        .with_ligatures(["abc"])
        .with_formats([Format::Ttf, Format::Woff2]);
    let extracted = extract(&bytes, &options).await.unwrap();

    assert_eq!(extracted.fonts.len(), 2);
    let ttf = extracted.get(Format::Ttf).unwrap();
    assert!(!ttf.is_empty());
    let woff2 = extracted.get(Format::Woff2).unwrap();
    assert!(!woff2.is_empty());
    assert!(extracted.get(Format::Svg).is_none());

    assert_eq!(extracted.meta.len(), 1);
    let meta = &extracted.meta[0];
    assert_eq!(meta.name, "abc");
    assert_eq!(meta.unicode, ["\u{e000}", "abc"]);
    assert!(meta.svg.starts_with("<svg "), "{}", meta.svg);
    assert!(extracted.diagnostics.is_empty());

    assert_valid_font(ttf, "\u{e000}abc".chars());
    assert_valid_font(woff2, "\u{e000}abc".chars());
}

#[tokio::test]
async fn produced_font_applies_ligatures() {
    let bytes = ligature_font(CoverageFormat::Ranges);
    let options = ExtractOptions::new("My Icons")
        .with_ligatures(["abc", "xy"])
        .with_formats([Format::Ttf]);
    let extracted = extract(&bytes, &options).await.unwrap();
    let ttf = extracted.get(Format::Ttf).unwrap();

    for ligature in ["abc", "xy", "\u{e000}"] {
        let glyphs = shape(ttf, ligature);
        assert_eq!(glyphs.len(), 1, "{ligature:?} -> {glyphs:?}");
        assert_ne!(glyphs[0], 0, "{ligature:?} -> {glyphs:?}");
    }
    // `bc` is not a requested ligature, so it's not substituted.
    assert_eq!(shape(ttf, "bc").len(), 2);

    assert_eq!(Font::checksum(ttf), Font::SFNT_CHECKSUM);
}

#[tokio::test]
async fn illegal_request_is_rejected_before_parsing() {
    let options = ExtractOptions::new("").with_ligatures(["abc"]);
    let err = extract(b"not a font", &options).await.unwrap_err();
    assert!(
        matches!(err, ExtractError::IllegalRequest(IllegalRequest::EmptyFontName)),
        "{err}"
    );

    let options = ExtractOptions::new("icons").with_ligatures(["abc"]);
    let err = extract(b"not a font", &options).await.unwrap_err();
    assert!(matches!(err, ExtractError::MalformedFont(_)), "{err}");
}

#[tokio::test]
async fn raw_sequences_without_ligature_table() {
    let bytes = plain_font();
    let options = ExtractOptions::new("icons")
        .with_ligatures(["a"])
        .with_raws(["\u{e000}"])
        .with_formats([Format::Svg]);
    let extracted = extract(&bytes, &options).await.unwrap();

    assert_eq!(extracted.meta.len(), 1);
    assert_eq!(extracted.meta[0].name, "a");
    assert_eq!(
        extracted.diagnostics,
        [Diagnostic::NoLigatureTable {
            raw: "\u{e000}".to_owned()
        }]
    );
}

#[tokio::test]
async fn resolving_raw_sequences() {
    let bytes = ligature_font(CoverageFormat::Glyphs);
    let options = ExtractOptions::new("icons")
        .with_raws(["\u{e000}", "zz"])
        .with_formats([Format::Ttf]);
    let extracted = extract(&bytes, &options).await.unwrap();

    // Both `abc` and `ca` are shaped to the same glyph.
    assert_eq!(extracted.meta.len(), 1);
    assert_eq!(extracted.meta[0].name, "abc");
    // `ca` is shaped to the same glyph, so it's not added as a trigger.
    assert_eq!(extracted.meta[0].unicode, ["\u{e000}", "abc"]);
    assert_eq!(
        extracted.diagnostics,
        [Diagnostic::UnresolvedRawSequence {
            raw: "zz".to_owned()
        }]
    );

    let ttf = extracted.get(Format::Ttf).unwrap();
    let abc = shape(ttf, "abc");
    assert_eq!(abc.len(), 1);
    assert_ne!(abc[0], 0);
    // Only triggers are encoded as ligatures in the produced font.
    assert_eq!(shape(ttf, "ca").len(), 2);
}

#[test_casing(2, [false, true])]
#[tokio::test]
async fn whitespace_policy(with_whitespace: bool) {
    let bytes = ligature_font(CoverageFormat::Glyphs);
    let options = ExtractOptions::new("icons")
        .with_ligatures(["abc", "xy"])
        .with_whitespace(with_whitespace)
        .with_formats([Format::Svg]);
    let extracted = extract(&bytes, &options).await.unwrap();

    let names: Vec<_> = extracted.meta.iter().map(|meta| meta.name.as_str()).collect();
    if with_whitespace {
        assert_eq!(names, ["abc", " ", "xy"]);
    } else {
        assert_eq!(names, ["abc", "xy"]);
    }
    for meta in &extracted.meta {
        assert!(meta.unicode.contains(&meta.name), "{meta:?}");
    }
}

#[tokio::test]
async fn extraction_is_deterministic() {
    let bytes = ligature_font(CoverageFormat::Glyphs);
    let options = ExtractOptions::new("icons").with_ligatures(strings(&["xy", "abc", "a"]));
    let first = extract(&bytes, &options).await.unwrap();
    let second = extract(&bytes, &options).await.unwrap();

    assert_eq!(first.fonts, second.fonts);
    assert_eq!(first.meta, second.meta);
    let names: Vec<_> = first.meta.iter().map(|meta| meta.name.as_str()).collect();
    assert_eq!(names, ["xy", "abc", "a"]);
}

#[tokio::test]
async fn producing_all_formats() {
    let bytes = ligature_font(CoverageFormat::Glyphs);
    let options = ExtractOptions::new("icons").with_ligatures(["abc", "xy", "ä"]);
    let extracted = extract(&bytes, &options).await.unwrap();

    let formats: Vec<_> = extracted.fonts.keys().copied().collect();
    assert_eq!(formats, Format::ALL);
    let svg = std::str::from_utf8(extracted.get(Format::Svg).unwrap()).unwrap();
    assert!(svg.contains("font-family=\"icons\""), "{svg}");
    let eot = extracted.get(Format::Eot).unwrap();
    assert!(eot.ends_with(extracted.get(Format::Ttf).unwrap()));

    let expected_chars = "\u{e000}abcxyä";
    assert_valid_font(extracted.get(Format::Ttf).unwrap(), expected_chars.chars());
    assert_valid_font(extracted.get(Format::Woff).unwrap(), expected_chars.chars());
    assert_valid_font(extracted.get(Format::Woff2).unwrap(), expected_chars.chars());
}

#[tokio::test]
async fn reextracting_from_woff() {
    let bytes = ligature_font(CoverageFormat::Glyphs);
    let options = ExtractOptions::new("icons")
        .with_ligatures(["abc", "xy"])
        .with_formats([Format::Woff]);
    let extracted = extract(&bytes, &options).await.unwrap();
    let woff = extracted.get(Format::Woff).unwrap();

    let options = ExtractOptions::new("icons")
        .with_ligatures(["xy"])
        .with_raws(["\u{e000}"])
        .with_formats([Format::Ttf]);
    let reextracted = extract(woff, &options).await.unwrap();
    let names: Vec<_> = reextracted.meta.iter().map(|meta| meta.name.as_str()).collect();
    assert_eq!(names, ["xy", "abc"]);
    assert!(reextracted.diagnostics.is_empty(), "{:?}", reextracted.diagnostics);
}

#[tokio::test]
async fn reextracting_from_woff2() {
    let bytes = ligature_font(CoverageFormat::Glyphs);
    let options = ExtractOptions::new("icons")
        .with_ligatures(["abc", "xy"])
        .with_formats([Format::Woff2, Format::Ttf]);
    let extracted = extract(&bytes, &options).await.unwrap();
    let woff2 = extracted.get(Format::Woff2).unwrap();
    let reextracted = extract(woff2, &options).await.unwrap();

    let summary = |meta: &[GlyphMeta]| -> Vec<_> {
        meta.iter()
            .map(|meta| (meta.name.clone(), meta.unicode.clone()))
            .collect()
    };
    assert_eq!(summary(&reextracted.meta), summary(&extracted.meta));
    assert!(reextracted.diagnostics.is_empty(), "{:?}", reextracted.diagnostics);
    let ttf = reextracted.get(Format::Ttf).unwrap();
    for ligature in ["abc", "xy"] {
        assert_eq!(shape(ttf, ligature).len(), 1, "{ligature:?}");
    }
}

#[tokio::test]
async fn supplementary_chars_are_mapped() {
    let bytes = supplementary_font();
    let font = Font::new(&bytes).unwrap();
    assert_eq!(font.map_char(SUPPLEMENTARY_CHAR), Ok(GLYPH_BC));
    assert_eq!(font.map_char('a'), Ok(GLYPH_A));

    let options = ExtractOptions::new("icons")
        .with_ligatures(["bc"])
        .with_formats([Format::Ttf]);
    let extracted = extract(&bytes, &options).await.unwrap();
    assert_eq!(extracted.meta.len(), 1);
    assert_eq!(extracted.meta[0].unicode, ["\u{f0001}", "bc"]);

    let ttf = extracted.get(Format::Ttf).unwrap();
    let glyphs = shape(ttf, "\u{f0001}");
    assert_eq!(glyphs.len(), 1);
    assert_ne!(glyphs[0], 0);
    assert_eq!(shape(ttf, "bc"), glyphs);
    assert_valid_font(ttf, "bc".chars());
}

#[test]
fn reading_cff_font() {
    let bytes = cff_ligature_font();
    assert_eq!(bytes[..4], *b"OTTO");
    let font = Font::new(&bytes).unwrap();
    assert_eq!(usize::from(font.glyph_count()), GLYPHS.len());
    assert_eq!(shape(&bytes, "abc"), [u32::from(GLYPH_ABC)]);

    let face = rustybuzz::Face::from_slice(&bytes, 0).unwrap();
    let bbox = face
        .glyph_bounding_box(rustybuzz::ttf_parser::GlyphId(GLYPH_ABC))
        .unwrap();
    assert_eq!((bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max), (100, 0, 1_100, 700));
}

#[tokio::test]
async fn extracting_from_cff_font() {
    let bytes = cff_ligature_font();
    let options = ExtractOptions::new("icons")
        .with_ligatures(["abc", "xy"])
        .with_formats([Format::Ttf, Format::Woff2]);
    let extracted = extract(&bytes, &options).await.unwrap();
    let names: Vec<_> = extracted.meta.iter().map(|meta| meta.name.as_str()).collect();
    assert_eq!(names, ["abc", "xy"]);

    // Cubic curves are converted to quadratic TrueType outlines.
    let ttf = extracted.get(Format::Ttf).unwrap();
    assert_eq!(ttf[..4], Font::SFNT_VERSION.to_be_bytes());
    let glyphs = shape(ttf, "abc");
    assert_eq!(glyphs.len(), 1);
    let face = rustybuzz::Face::from_slice(ttf, 0).unwrap();
    let glyph = rustybuzz::ttf_parser::GlyphId(glyphs[0].try_into().unwrap());
    let bbox = face.glyph_bounding_box(glyph).unwrap();
    assert_eq!((bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max), (100, 0, 1_100, 700));
    assert_eq!(face.glyph_hor_advance(glyph), Some(1_200));

    assert_valid_font(ttf, "\u{e000}abcxy".chars());
    assert_valid_font(extracted.get(Format::Woff2).unwrap(), "\u{e000}abcxy".chars());
}
