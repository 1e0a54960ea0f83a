//! Logic for serializing `FontSubset`s in OpenType-based formats.

pub(crate) use self::{
    cmap::write_cmap,
    glyf::{GlyfBuilder, LocaFormat},
    gsub::LigatureTable,
    name::FontNames,
    sfnt::{FontWriter, Sfnt},
    svg::{SvgFont, SvgFontGlyph},
};
#[cfg(test)]
pub(crate) use self::gsub::CoverageFormat;
use crate::{
    font::{Font, SubsetGlyph},
    subset::FontSubset,
    TableTag,
};

mod cmap;
mod eot;
mod glyf;
mod gsub;
mod name;
mod sfnt;
mod svg;
mod woff;
mod woff2;

pub(crate) fn write_u16(writer: &mut Vec<u8>, value: u16) {
    writer.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn write_u32(writer: &mut Vec<u8>, value: u32) {
    writer.extend_from_slice(&value.to_be_bytes());
}

fn write_i16(writer: &mut Vec<u8>, value: i16) {
    writer.extend_from_slice(&value.to_be_bytes());
}

/// Copies `source` into `writer` applying `patches` (offset + big-endian value) on top.
fn write_patched(writer: &mut Vec<u8>, source: &[u8], patches: &[(usize, [u8; 2])]) {
    let start = writer.len();
    writer.extend_from_slice(source);
    for &(offset, value) in patches {
        if let Some(field) = writer.get_mut(start + offset..start + offset + 2) {
            field.copy_from_slice(&value);
        }
    }
}

/// Metrics derived from the outlines of the subset glyphs.
#[derive(Debug, Default, PartialEq, Eq)]
struct SubsetMetrics {
    /// `[xMin, yMin, xMax, yMax]` over all glyphs with contours.
    bbox: [i16; 4],
    advance_width_max: u16,
    min_lsb: i16,
    min_rsb: i16,
    x_max_extent: i16,
    max_points: u16,
    max_contours: u16,
}

impl SubsetMetrics {
    fn new(glyphs: &[SubsetGlyph]) -> Self {
        let mut metrics = Self::default();
        let mut has_contours = false;
        for glyph in glyphs {
            metrics.advance_width_max = metrics.advance_width_max.max(glyph.advance);
            let Some([x_min, y_min, x_max, y_max]) = glyph.outline.bbox() else {
                continue;
            };
            let advance = i32::from(glyph.advance);
            let rsb = clamp_i16(advance - i32::from(x_max));
            let points = u16::try_from(glyph.outline.point_count()).unwrap_or(u16::MAX);
            let contours = u16::try_from(glyph.outline.contours.len()).unwrap_or(u16::MAX);

            if has_contours {
                let [bx_min, by_min, bx_max, by_max] = &mut metrics.bbox;
                *bx_min = (*bx_min).min(x_min);
                *by_min = (*by_min).min(y_min);
                *bx_max = (*bx_max).max(x_max);
                *by_max = (*by_max).max(y_max);
                metrics.min_lsb = metrics.min_lsb.min(x_min);
                metrics.min_rsb = metrics.min_rsb.min(rsb);
                metrics.x_max_extent = metrics.x_max_extent.max(x_max);
            } else {
                has_contours = true;
                metrics.bbox = [x_min, y_min, x_max, y_max];
                metrics.min_lsb = x_min;
                metrics.min_rsb = rsb;
                metrics.x_max_extent = x_max;
            }
            metrics.max_points = metrics.max_points.max(points);
            metrics.max_contours = metrics.max_contours.max(contours);
        }
        metrics
    }
}

#[allow(clippy::cast_possible_truncation)] // clamped to the `i16` range
fn clamp_i16(value: i32) -> i16 {
    value.clamp(i16::MIN.into(), i16::MAX.into()) as i16
}

impl FontSubset<'_> {
    const OS2_FIRST_CHAR_OFFSET: usize = 64;
    const HEAD_BBOX_OFFSET: usize = 36;
    const HEAD_LOCA_FORMAT_OFFSET: usize = 50;
    const HHEA_ADVANCE_MAX_OFFSET: usize = 10;
    const HHEA_METRICS_COUNT_OFFSET: usize = 34;

    /// Serializes this subset to the TrueType format.
    pub(crate) fn to_truetype(&self) -> Vec<u8> {
        self.to_sfnt().to_bytes()
    }

    /// Serializes this subset to the WOFF2 format.
    pub(crate) fn to_woff2(&self) -> Vec<u8> {
        self.to_sfnt().to_woff2()
    }

    /// Serializes this subset to the WOFF 1.0 format.
    pub(crate) fn to_woff(&self) -> Vec<u8> {
        self.to_sfnt().to_woff()
    }

    /// Assembles the tables of the subset font. The produced font always has TrueType outlines,
    /// even if the source font is CFF-based.
    pub(crate) fn to_sfnt(&self) -> Sfnt {
        let metrics = SubsetMetrics::new(&self.glyphs);
        let mut writer = FontWriter::default();
        writer.table(TableTag::CMAP, |buffer| write_cmap(&self.char_map, buffer));

        let mut glyf = GlyfBuilder::default();
        for glyph in &self.glyphs {
            glyf.push_simple(&glyph.outline);
        }
        let loca_format = glyf.preferred_loca_format();
        let (glyf, loca) = glyf
            .finish(loca_format)
            .expect("glyph offsets always fit into the preferred `loca` format");
        writer.raw_table(TableTag::GLYF, glyf);
        writer.raw_table(TableTag::LOCA, loca);
        writer.table(TableTag::HEAD, |buffer| {
            self.write_head(&metrics, loca_format, buffer);
        });

        let number_of_h_metrics = writer.table(TableTag::HMTX, |buffer| self.write_hmtx(buffer));
        writer.table(TableTag::HHEA, |buffer| {
            self.write_hhea(&metrics, number_of_h_metrics, buffer);
        });
        writer.table(TableTag::MAXP, |buffer| self.write_maxp(&metrics, buffer));

        let names = FontNames::new(&self.family_name);
        writer.table(TableTag::NAME, |buffer| names.write(buffer));
        writer.table(TableTag::OS2, |buffer| self.write_os2(buffer));
        writer.table(TableTag::POST, |buffer| {
            // Version 3 carries no glyph names
            write_u32(buffer, 0x_0003_0000);
            buffer.extend_from_slice(&self.font.post.bytes[4..Font::POST_HEADER_LEN]);
        });

        if !self.ligatures.is_empty() {
            let gsub = LigatureTable::new(self.ligatures.iter().cloned());
            writer.table(TableTag::GSUB, |buffer| gsub.write(buffer));
        }
        writer.finish()
    }

    fn glyph_count(&self) -> u16 {
        // Checked when pushing glyphs to the subset.
        u16::try_from(self.glyphs.len()).unwrap_or(u16::MAX)
    }

    fn write_head(&self, metrics: &SubsetMetrics, loca_format: LocaFormat, writer: &mut Vec<u8>) {
        let [x_min, y_min, x_max, y_max] = metrics.bbox;
        let offset = Self::HEAD_BBOX_OFFSET;
        let patches = [
            (offset, x_min.to_be_bytes()),
            (offset + 2, y_min.to_be_bytes()),
            (offset + 4, x_max.to_be_bytes()),
            (offset + 6, y_max.to_be_bytes()),
            (Self::HEAD_LOCA_FORMAT_OFFSET, loca_format.head_field().to_be_bytes()),
        ];
        write_patched(writer, &self.font.head.bytes[..Font::HEAD_LEN], &patches);
    }

    /// Writes `hmtx` and returns the number of full metric records in it. Trailing glyphs
    /// sharing the advance of the last full record only store their side bearings.
    fn write_hmtx(&self, writer: &mut Vec<u8>) -> u16 {
        let advances: Vec<_> = self.glyphs.iter().map(|glyph| glyph.advance).collect();
        let mut full_records = advances.len();
        while full_records > 1 && advances[full_records - 2] == advances[full_records - 1] {
            full_records -= 1;
        }

        for (i, glyph) in self.glyphs.iter().enumerate() {
            if i < full_records {
                write_u16(writer, glyph.advance);
            }
            write_i16(writer, glyph.lsb());
        }
        u16::try_from(full_records).unwrap_or(u16::MAX)
    }

    fn write_hhea(&self, metrics: &SubsetMetrics, number_of_h_metrics: u16, writer: &mut Vec<u8>) {
        let offset = Self::HHEA_ADVANCE_MAX_OFFSET;
        let patches = [
            (offset, metrics.advance_width_max.to_be_bytes()),
            (offset + 2, metrics.min_lsb.to_be_bytes()),
            (offset + 4, metrics.min_rsb.to_be_bytes()),
            (offset + 6, metrics.x_max_extent.to_be_bytes()),
            (Self::HHEA_METRICS_COUNT_OFFSET, number_of_h_metrics.to_be_bytes()),
        ];
        write_patched(writer, &self.font.hhea.bytes[..Font::HHEA_LEN], &patches);
    }

    /// Writes `maxp` version 1.0. The produced glyphs have no hinting instructions
    /// and no composites, so only point and contour limits are non-trivial.
    fn write_maxp(&self, metrics: &SubsetMetrics, writer: &mut Vec<u8>) {
        write_u32(writer, 0x_0001_0000);
        write_u16(writer, self.glyph_count());
        write_u16(writer, metrics.max_points);
        write_u16(writer, metrics.max_contours);
        write_u16(writer, 0); // maxCompositePoints
        write_u16(writer, 0); // maxCompositeContours
        write_u16(writer, 2); // maxZones
        for _ in 0..8 {
            write_u16(writer, 0);
        }
    }

    /// Copies `OS/2` patching the first and last mapped chars.
    fn write_os2(&self, writer: &mut Vec<u8>) {
        let char_index = |ch: Option<(&char, &u16)>| {
            ch.map_or(0, |(&ch, _)| u16::try_from(u32::from(ch)).unwrap_or(u16::MAX))
        };
        let offset = Self::OS2_FIRST_CHAR_OFFSET;
        let patches = [
            (offset, char_index(self.char_map.first_key_value()).to_be_bytes()),
            (offset + 2, char_index(self.char_map.last_key_value()).to_be_bytes()),
        ];
        write_patched(writer, self.font.os2.as_ref(), &patches);
    }
}
