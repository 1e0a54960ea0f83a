//! WOFF2 decoding, including reconstruction of the transformed `glyf`, `loca` and `hmtx` tables.

use std::mem;

use super::{check_sfnt_version, ContourPoint, Cursor, SimpleGlyph, TableTag};
use crate::{
    compression,
    errors::{ParseError, ParseErrorKind},
    write::{FontWriter, GlyfBuilder, LocaFormat},
};

pub(crate) const SIGNATURE: [u8; 4] = *b"wOF2";

/// Tags encoded by their index in the table directory.
pub(crate) const KNOWN_TAGS: [TableTag; 63] = [
    TableTag(*b"cmap"),
    TableTag(*b"head"),
    TableTag(*b"hhea"),
    TableTag(*b"hmtx"),
    TableTag(*b"maxp"),
    TableTag(*b"name"),
    TableTag(*b"OS/2"),
    TableTag(*b"post"),
    TableTag(*b"cvt "),
    TableTag(*b"fpgm"),
    TableTag(*b"glyf"),
    TableTag(*b"loca"),
    TableTag(*b"prep"),
    TableTag(*b"CFF "),
    TableTag(*b"VORG"),
    TableTag(*b"EBDT"),
    TableTag(*b"EBLC"),
    TableTag(*b"gasp"),
    TableTag(*b"hdmx"),
    TableTag(*b"kern"),
    TableTag(*b"LTSH"),
    TableTag(*b"PCLT"),
    TableTag(*b"VDMX"),
    TableTag(*b"vhea"),
    TableTag(*b"vmtx"),
    TableTag(*b"BASE"),
    TableTag(*b"GDEF"),
    TableTag(*b"GPOS"),
    TableTag(*b"GSUB"),
    TableTag(*b"EBSC"),
    TableTag(*b"JSTF"),
    TableTag(*b"MATH"),
    TableTag(*b"CBDT"),
    TableTag(*b"CBLC"),
    TableTag(*b"COLR"),
    TableTag(*b"CPAL"),
    TableTag(*b"SVG "),
    TableTag(*b"sbix"),
    TableTag(*b"acnt"),
    TableTag(*b"avar"),
    TableTag(*b"bdat"),
    TableTag(*b"bloc"),
    TableTag(*b"bsln"),
    TableTag(*b"cvar"),
    TableTag(*b"fdsc"),
    TableTag(*b"feat"),
    TableTag(*b"fmtx"),
    TableTag(*b"fvar"),
    TableTag(*b"gvar"),
    TableTag(*b"hsty"),
    TableTag(*b"just"),
    TableTag(*b"lcar"),
    TableTag(*b"mort"),
    TableTag(*b"morx"),
    TableTag(*b"opbd"),
    TableTag(*b"prop"),
    TableTag(*b"trak"),
    TableTag(*b"Zapf"),
    TableTag(*b"Silf"),
    TableTag(*b"Glat"),
    TableTag(*b"Gloc"),
    TableTag(*b"Feat"),
    TableTag(*b"Sill"),
];

pub(crate) const HEADER_LEN: usize = 48;
/// Tag index signalling that an explicit tag follows the flags byte.
pub(crate) const EXPLICIT_TAG: u8 = 63;
const SFNT_HEADER_LEN: usize = 12;
const SFNT_RECORD_LEN: usize = 16;
const HHEA_METRICS_COUNT_OFFSET: usize = 34;
/// Points of a simple glyph are indexed by `u16` values.
const MAX_GLYPH_POINTS: usize = 1 << 16;

fn read_uint_base128(cursor: &mut Cursor<'_>) -> Result<u32, ParseError> {
    let start = *cursor;
    let mut value = 0_u32;
    for i in 0..5 {
        let byte = cursor.read_u8()?;
        // Leading zeros and values exceeding 32 bits are forbidden.
        if (i == 0 && byte == 0x80) || value & 0xfe00_0000 != 0 {
            break;
        }
        value = (value << 7) | u32::from(byte & 0x7f);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(start.err(ParseErrorKind::InvalidEncoding("UIntBase128")))
}

fn read_255_u16(cursor: &mut Cursor<'_>) -> Result<u16, ParseError> {
    const WORD_CODE: u8 = 253;
    const ONE_MORE_BYTE_CODE2: u8 = 254;
    const ONE_MORE_BYTE_CODE1: u8 = 255;
    const LOWEST_U_CODE: u16 = 253;

    Ok(match cursor.read_u8()? {
        WORD_CODE => cursor.read_u16()?,
        ONE_MORE_BYTE_CODE1 => u16::from(cursor.read_u8()?) + LOWEST_U_CODE,
        ONE_MORE_BYTE_CODE2 => u16::from(cursor.read_u8()?) + LOWEST_U_CODE * 2,
        code => code.into(),
    })
}

/// Reads coordinate deltas for a point with the specified flag (without the on-curve bit).
fn read_triplet(flag: u8, glyphs: &mut Cursor<'_>) -> Result<(i32, i32), ParseError> {
    let with_sign = |flag: u8, value: i32| if flag & 1 == 0 { -value } else { value };
    let mut read = || glyphs.read_u8().map(i32::from);

    let flag_value = i32::from(flag);
    Ok(match flag {
        0..10 => (0, with_sign(flag, ((flag_value & 14) << 7) + read()?)),
        10..20 => (with_sign(flag, (((flag_value - 10) & 14) << 7) + read()?), 0),
        20..84 => {
            let base = flag_value - 20;
            let b0 = read()?;
            (
                with_sign(flag, 1 + (base & 0x30) + (b0 >> 4)),
                with_sign(flag >> 1, 1 + ((base & 0x0c) << 2) + (b0 & 0x0f)),
            )
        }
        84..120 => {
            let base = flag_value - 84;
            let (b0, b1) = (read()?, read()?);
            (
                with_sign(flag, 1 + ((base / 12) << 8) + b0),
                with_sign(flag >> 1, 1 + (((base % 12) >> 2) << 8) + b1),
            )
        }
        120..124 => {
            let (b0, b1, b2) = (read()?, read()?, read()?);
            (
                with_sign(flag, (b0 << 4) + (b1 >> 4)),
                with_sign(flag >> 1, ((b1 & 0x0f) << 8) + b2),
            )
        }
        _ => {
            let (b0, b1, b2, b3) = (read()?, read()?, read()?, read()?);
            (
                with_sign(flag, (b0 << 8) + b1),
                with_sign(flag >> 1, (b2 << 8) + b3),
            )
        }
    })
}

#[derive(Debug)]
struct TableEntry {
    tag: TableTag,
    transformed: bool,
    /// Length of the table data in the decompressed stream.
    stream_len: usize,
}

impl TableEntry {
    fn read(cursor: &mut Cursor<'_>) -> Result<Self, ParseError> {
        let entry_cursor = *cursor;
        let flags = cursor.read_u8()?;
        let tag = match flags & 0x3f {
            EXPLICIT_TAG => TableTag(cursor.read_byte_array()?),
            idx => KNOWN_TAGS[usize::from(idx)],
        };
        let version = flags >> 6;
        let transformed = match (tag, version) {
            (TableTag::GLYF | TableTag::LOCA, 0) | (TableTag::HMTX, 1) => true,
            (TableTag::GLYF | TableTag::LOCA, 3) | (_, 0) => false,
            _ => {
                let kind = ParseErrorKind::UnsupportedFormat("WOFF2 table transform");
                return Err(entry_cursor.err(kind));
            }
        };

        let original_len = read_uint_base128(cursor)? as usize;
        let stream_len = if transformed {
            read_uint_base128(cursor)? as usize
        } else {
            original_len
        };
        Ok(Self {
            tag,
            transformed,
            stream_len,
        })
    }
}

/// Streams of a transformed `glyf` table.
#[derive(Debug)]
struct GlyfStreams<'a> {
    contour_counts: Cursor<'a>,
    point_counts: Cursor<'a>,
    flags: Cursor<'a>,
    glyphs: Cursor<'a>,
    composites: Cursor<'a>,
    bbox_bitmap: Cursor<'a>,
    bboxes: Cursor<'a>,
    instructions: Cursor<'a>,
}

/// `glyf` and `loca` tables reconstructed from the transformed `glyf` data.
#[derive(Debug, Default)]
struct DecodedGlyf {
    glyf: Vec<u8>,
    loca: Vec<u8>,
    /// Needed to reconstruct the transformed `hmtx`.
    x_mins: Vec<i16>,
}

impl<'a> GlyfStreams<'a> {
    const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
    const WE_HAVE_A_SCALE: u16 = 0x0008;
    const MORE_COMPONENTS: u16 = 0x0020;
    const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
    const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
    const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;

    fn decode(table: Cursor<'a>) -> Result<DecodedGlyf, ParseError> {
        let mut cursor = table;
        cursor.skip(4)?; // reserved, optionFlags
        let glyph_count = cursor.read_u16()?;
        let loca_format = cursor.read_u16_checked(|format| {
            LocaFormat::from_head_field(format).ok_or(ParseErrorKind::UnexpectedLocaFormat(format))
        })?;
        let mut stream_lens = [0_usize; 7];
        for len in &mut stream_lens {
            *len = cursor.read_u32()? as usize;
        }
        let [
            contours_len,
            points_len,
            flags_len,
            glyphs_len,
            composites_len,
            bbox_len,
            instructions_len,
        ] = stream_lens;

        let contour_counts = cursor.split_at(contours_len)?;
        let point_counts = cursor.split_at(points_len)?;
        let flags = cursor.split_at(flags_len)?;
        let glyphs = cursor.split_at(glyphs_len)?;
        let composites = cursor.split_at(composites_len)?;
        let mut bboxes = cursor.split_at(bbox_len)?;
        let bbox_bitmap = bboxes.split_at(4 * usize::from(glyph_count).div_ceil(32))?;
        let mut streams = Self {
            contour_counts,
            point_counts,
            flags,
            glyphs,
            composites,
            bbox_bitmap,
            bboxes,
            instructions: cursor.split_at(instructions_len)?,
        };

        let mut builder = GlyfBuilder::default();
        let mut x_mins = Vec::with_capacity(glyph_count.into());
        for idx in 0..usize::from(glyph_count) {
            let x_min = streams.decode_glyph(idx, &mut builder)?;
            x_mins.push(x_min);
        }

        let (glyf, loca) = builder
            .finish(loca_format)
            .ok_or_else(|| table.err(ParseErrorKind::InvalidEncoding("`loca` offsets")))?;
        Ok(DecodedGlyf { glyf, loca, x_mins })
    }

    fn has_explicit_bbox(&self, idx: usize) -> bool {
        self.bbox_bitmap
            .bytes
            .get(idx >> 3)
            .is_some_and(|&bits| bits & (0x80 >> (idx & 7)) != 0)
    }

    fn read_bbox(&mut self) -> Result<[i16; 4], ParseError> {
        Ok([
            self.bboxes.read_i16()?,
            self.bboxes.read_i16()?,
            self.bboxes.read_i16()?,
            self.bboxes.read_i16()?,
        ])
    }

    /// Decodes a single glyph into `builder` and returns its `xMin`.
    fn decode_glyph(&mut self, idx: usize, builder: &mut GlyfBuilder) -> Result<i16, ParseError> {
        let contours_cursor = self.contour_counts;
        match self.contour_counts.read_i16()? {
            0 => {
                builder.push_raw(&[]);
                Ok(0)
            }
            -1 => {
                if !self.has_explicit_bbox(idx) {
                    let kind = ParseErrorKind::InvalidEncoding("composite glyph bounding box");
                    return Err(self.bbox_bitmap.err(kind));
                }
                let bbox = self.read_bbox()?;
                builder.push_raw(&self.decode_composite(bbox)?);
                Ok(bbox[0])
            }
            count if count > 0 => {
                let glyph = self.decode_simple(count.unsigned_abs())?;
                let bbox = if self.has_explicit_bbox(idx) {
                    self.read_bbox()?
                } else {
                    glyph.bbox().unwrap_or_default()
                };
                builder.push_simple_with_bbox(&glyph, bbox);
                Ok(bbox[0])
            }
            _ => Err(contours_cursor.err(ParseErrorKind::InvalidEncoding("contour count"))),
        }
    }

    fn decode_simple(&mut self, contour_count: u16) -> Result<SimpleGlyph, ParseError> {
        let mut contours = Vec::with_capacity(contour_count.into());
        let mut total_points = 0_usize;
        let (mut x, mut y) = (0_i16, 0_i16);
        for _ in 0..contour_count {
            let count_cursor = self.point_counts;
            let point_count = read_255_u16(&mut self.point_counts)?;
            total_points += usize::from(point_count);
            if point_count == 0 || total_points > MAX_GLYPH_POINTS {
                return Err(count_cursor.err(ParseErrorKind::InvalidEncoding("glyph point count")));
            }

            let mut contour = Vec::with_capacity(point_count.into());
            for _ in 0..point_count {
                let flag = self.flags.read_u8()?;
                let triplet_cursor = self.glyphs;
                let (dx, dy) = read_triplet(flag & 0x7f, &mut self.glyphs)?;
                let coordinates = i16::try_from(i32::from(x) + dx)
                    .and_then(|new_x| Ok((new_x, i16::try_from(i32::from(y) + dy)?)));
                (x, y) = coordinates.map_err(|_| {
                    triplet_cursor.err(ParseErrorKind::InvalidEncoding("glyph coordinates"))
                })?;
                contour.push(ContourPoint {
                    x,
                    y,
                    on_curve: flag >> 7 == 0,
                });
            }
            contours.push(contour);
        }

        let instructions_len = read_255_u16(&mut self.glyphs)?;
        let instructions = self.instructions.split_at(instructions_len.into())?;
        Ok(SimpleGlyph {
            contours,
            instructions: instructions.bytes.to_vec(),
        })
    }

    /// Copies composite glyph components; the instructions are read from their own stream.
    fn decode_composite(&mut self, bbox: [i16; 4]) -> Result<Vec<u8>, ParseError> {
        let mut components = self.composites;
        let mut have_instructions = false;
        loop {
            let flags = components.read_u16()?;
            components.skip(2)?; // glyphIndex
            let mut args_len = if flags & Self::ARG_1_AND_2_ARE_WORDS == 0 { 2 } else { 4 };
            if flags & Self::WE_HAVE_A_SCALE != 0 {
                args_len += 2;
            } else if flags & Self::WE_HAVE_AN_X_AND_Y_SCALE != 0 {
                args_len += 4;
            } else if flags & Self::WE_HAVE_A_TWO_BY_TWO != 0 {
                args_len += 8;
            }
            components.skip(args_len)?;
            have_instructions |= flags & Self::WE_HAVE_INSTRUCTIONS != 0;
            if flags & Self::MORE_COMPONENTS == 0 {
                break;
            }
        }
        let components_len = self.composites.bytes.len() - components.bytes.len();
        let components = self.composites.split_at(components_len)?;

        let mut glyph = Vec::with_capacity(10 + components_len);
        glyph.extend_from_slice(&(-1_i16).to_be_bytes());
        for value in bbox {
            glyph.extend_from_slice(&value.to_be_bytes());
        }
        glyph.extend_from_slice(components.bytes);
        if have_instructions {
            let instructions_len = read_255_u16(&mut self.glyphs)?;
            let instructions = self.instructions.split_at(instructions_len.into())?;
            glyph.extend_from_slice(&instructions_len.to_be_bytes());
            glyph.extend_from_slice(instructions.bytes);
        }
        Ok(glyph)
    }
}

/// Reconstructs `hmtx` with side bearings omitted from the transformed data set to `xMin`s.
fn decode_hmtx(
    table: Cursor<'_>,
    x_mins: &[i16],
    metric_count: u16,
) -> Result<Vec<u8>, ParseError> {
    const NO_PROPORTIONAL_LSBS: u8 = 1;
    const NO_MONOSPACE_LSBS: u8 = 2;

    let metric_count = usize::from(metric_count);
    if metric_count == 0 || metric_count > x_mins.len() {
        return Err(table.err(ParseErrorKind::InvalidEncoding("`hmtx` metrics count")));
    }
    let mut cursor = table;
    let flags = cursor.read_u8()?;
    let advances = (0..metric_count)
        .map(|_| cursor.read_u16())
        .collect::<Result<Vec<_>, _>>()?;

    let mut hmtx = Vec::with_capacity(2 * (metric_count + x_mins.len()));
    for (idx, &x_min) in x_mins.iter().enumerate() {
        let advance = advances.get(idx);
        let omitted = if advance.is_some() {
            NO_PROPORTIONAL_LSBS
        } else {
            NO_MONOSPACE_LSBS
        };
        let lsb = if flags & omitted == 0 {
            cursor.read_i16()?
        } else {
            x_min
        };
        if let Some(advance) = advance {
            hmtx.extend_from_slice(&advance.to_be_bytes());
        }
        hmtx.extend_from_slice(&lsb.to_be_bytes());
    }
    Ok(hmtx)
}

/// Decodes a WOFF2 font into sfnt data. Metadata and private blocks are ignored;
/// table checksums are recomputed.
pub(crate) fn decode(bytes: &[u8]) -> Result<Vec<u8>, ParseError> {
    let file = Cursor::new(bytes);
    let mut cursor = file;
    cursor.skip(4)?; // signature
    let flavor = cursor.read_u32_checked(|flavor| check_sfnt_version(flavor).map(|()| flavor))?;
    cursor.skip(4)?; // length
    let table_count = cursor.read_u16()?;
    cursor.skip(6)?; // reserved, totalSfntSize
    let compressed_len = cursor.read_u32()? as usize;
    cursor.skip(HEADER_LEN - 24)?;

    let entries = (0..table_count)
        .map(|_| TableEntry::read(&mut cursor))
        .collect::<Result<Vec<_>, _>>()?;
    let compressed = cursor.split_at(compressed_len)?;
    let decompressed_len = entries
        .iter()
        .try_fold(0_usize, |acc, entry| acc.checked_add(entry.stream_len))
        .ok_or_else(|| compressed.err(ParseErrorKind::Compression))?;
    let decompressed = compression::brotli_decompress(compressed.bytes, decompressed_len)
        .ok_or_else(|| compressed.err(ParseErrorKind::Compression))?;

    let mut stream = Cursor::new(&decompressed);
    let tables = entries
        .iter()
        .map(|entry| Ok((entry, stream.split_at(entry.stream_len)?.with_table(entry.tag))))
        .collect::<Result<Vec<_>, ParseError>>()?;
    let find_table = |tag: TableTag| tables.iter().find(|(entry, _)| entry.tag == tag);

    let glyf = find_table(TableTag::GLYF);
    let loca = find_table(TableTag::LOCA);
    let mut decoded_glyf = match (glyf, loca) {
        (Some((glyf_entry, glyf)), Some((loca_entry, _)))
            if glyf_entry.transformed && loca_entry.transformed =>
        {
            Some(GlyfStreams::decode(*glyf)?)
        }
        (Some((entry, table)), _) | (_, Some((entry, table))) if entry.transformed => {
            let kind = ParseErrorKind::UnsupportedFormat("separate `glyf` and `loca` transforms");
            return Err(table.err(kind));
        }
        _ => None,
    };

    let mut writer = FontWriter::new(flavor);
    let mut sfnt_len = SFNT_HEADER_LEN + SFNT_RECORD_LEN * tables.len();
    for &(entry, table) in &tables {
        let data = match (entry.tag, &mut decoded_glyf) {
            (_, _) if !entry.transformed => table.bytes.to_vec(),
            (TableTag::GLYF, Some(decoded)) => mem::take(&mut decoded.glyf),
            (TableTag::LOCA, Some(decoded)) => mem::take(&mut decoded.loca),
            (TableTag::HMTX, Some(decoded)) => {
                let (_, hhea) = find_table(TableTag::HHEA)
                    .ok_or_else(|| ParseError::missing_table(TableTag::HHEA))?;
                let metric_count = hhea.at(HHEA_METRICS_COUNT_OFFSET)?.read_u16()?;
                decode_hmtx(table, &decoded.x_mins, metric_count)?
            }
            _ => {
                let kind = ParseErrorKind::UnsupportedFormat("`hmtx` transform alone");
                return Err(table.err(kind));
            }
        };
        sfnt_len += data.len().next_multiple_of(4);
        writer.raw_table(entry.tag, data);
    }

    if u32::try_from(sfnt_len).is_err() {
        return Err(file.err(ParseErrorKind::OffsetOutOfBounds(sfnt_len)));
    }
    Ok(writer.finish().to_bytes())
}
