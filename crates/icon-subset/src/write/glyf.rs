//! `glyf` and `loca` table compilation.

use super::{write_u16, write_u32};
use crate::font::{ContourPoint, SimpleGlyph};

const ON_CURVE_POINT: u8 = 0x01;
const X_SHORT_VECTOR: u8 = 0x02;
const Y_SHORT_VECTOR: u8 = 0x04;
const REPEAT_FLAG: u8 = 0x08;
const X_IS_SAME_OR_POSITIVE: u8 = 0x10;
const Y_IS_SAME_OR_POSITIVE: u8 = 0x20;

/// Encodes a coordinate delta, returning the flag bits for it.
fn encode_delta(delta: i32, short_flag: u8, same_flag: u8, coords: &mut Vec<u8>) -> u8 {
    if delta == 0 {
        same_flag
    } else if let Ok(magnitude) = u8::try_from(delta.unsigned_abs()) {
        coords.push(magnitude);
        if delta > 0 {
            short_flag | same_flag
        } else {
            short_flag
        }
    } else {
        // Deltas between `i16` coordinates always fit into 16 bits modulo 2^16.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        write_u16(coords, delta as u16);
        0
    }
}

impl SimpleGlyph {
    pub(crate) fn write(&self, writer: &mut Vec<u8>) {
        if let Some(bbox) = self.bbox() {
            self.write_with_bbox(bbox, writer);
        }
    }

    /// Writes the glyph with the specified bounding box. Empty glyphs take no space in `glyf`
    /// and are never written.
    pub(crate) fn write_with_bbox(&self, bbox: [i16; 4], writer: &mut Vec<u8>) {
        let contour_count = i16::try_from(self.contours.len()).expect("too many contours");
        writer.extend_from_slice(&contour_count.to_be_bytes());
        for value in bbox {
            writer.extend_from_slice(&value.to_be_bytes());
        }
        let mut end_point = 0_usize;
        for contour in &self.contours {
            end_point += contour.len();
            let end_point = u16::try_from(end_point - 1).expect("too many points");
            write_u16(writer, end_point);
        }
        let instructions_len =
            u16::try_from(self.instructions.len()).expect("instructions too long");
        write_u16(writer, instructions_len);
        writer.extend_from_slice(&self.instructions);

        let mut flags = Vec::with_capacity(self.point_count());
        let (mut x_coords, mut y_coords) = (vec![], vec![]);
        let mut prev = ContourPoint::on(0, 0);
        for &point in self.contours.iter().flatten() {
            let dx = i32::from(point.x) - i32::from(prev.x);
            let dy = i32::from(point.y) - i32::from(prev.y);
            let mut flag = if point.on_curve { ON_CURVE_POINT } else { 0 };
            flag |= encode_delta(dx, X_SHORT_VECTOR, X_IS_SAME_OR_POSITIVE, &mut x_coords);
            flag |= encode_delta(dy, Y_SHORT_VECTOR, Y_IS_SAME_OR_POSITIVE, &mut y_coords);
            flags.push(flag);
            prev = point;
        }

        let mut flags = flags.into_iter().peekable();
        while let Some(flag) = flags.next() {
            let mut repeats = 0_u8;
            while repeats < u8::MAX && flags.next_if_eq(&flag).is_some() {
                repeats += 1;
            }
            if repeats == 0 {
                writer.push(flag);
            } else {
                writer.extend_from_slice(&[flag | REPEAT_FLAG, repeats]);
            }
        }
        writer.extend_from_slice(&x_coords);
        writer.extend_from_slice(&y_coords);
    }
}

/// Offset format of the `loca` table, as encoded in the `indexToLocFormat` field of `head`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LocaFormat {
    Short,
    Long,
}

impl LocaFormat {
    pub(crate) fn from_head_field(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::Short),
            1 => Some(Self::Long),
            _ => None,
        }
    }

    pub(crate) fn head_field(self) -> u16 {
        match self {
            Self::Short => 0,
            Self::Long => 1,
        }
    }
}

/// Accumulates glyph data for the `glyf` table together with the `loca` offsets.
/// Each glyph is padded to a 4-byte boundary.
#[derive(Debug)]
pub(crate) struct GlyfBuilder {
    data: Vec<u8>,
    offsets: Vec<usize>,
}

impl Default for GlyfBuilder {
    fn default() -> Self {
        Self {
            data: vec![],
            offsets: vec![0],
        }
    }
}

impl GlyfBuilder {
    pub(crate) fn push_simple(&mut self, glyph: &SimpleGlyph) {
        glyph.write(&mut self.data);
        self.end_glyph();
    }

    pub(crate) fn push_simple_with_bbox(&mut self, glyph: &SimpleGlyph, bbox: [i16; 4]) {
        glyph.write_with_bbox(bbox, &mut self.data);
        self.end_glyph();
    }

    /// Pushes already encoded glyph data (e.g., a composite glyph).
    pub(crate) fn push_raw(&mut self, glyph: &[u8]) {
        self.data.extend_from_slice(glyph);
        self.end_glyph();
    }

    fn end_glyph(&mut self) {
        self.data.resize(self.data.len().next_multiple_of(4), 0);
        self.offsets.push(self.data.len());
    }

    /// Chooses the short `loca` format if possible.
    pub(crate) fn preferred_loca_format(&self) -> LocaFormat {
        if self.data.len() / 2 <= usize::from(u16::MAX) {
            LocaFormat::Short
        } else {
            LocaFormat::Long
        }
    }

    /// Returns the `glyf` and `loca` tables, or `None` if the offsets do not fit
    /// into the requested `loca` format.
    pub(crate) fn finish(self, format: LocaFormat) -> Option<(Vec<u8>, Vec<u8>)> {
        let mut loca = vec![];
        for &offset in &self.offsets {
            match format {
                LocaFormat::Short => write_u16(&mut loca, u16::try_from(offset / 2).ok()?),
                LocaFormat::Long => write_u32(&mut loca, u32::try_from(offset).ok()?),
            }
        }
        Some((self.data, loca))
    }
}
