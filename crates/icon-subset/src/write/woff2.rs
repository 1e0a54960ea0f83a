//! WOFF2 serialization. Tables are stored without transforms.

use super::{sfnt::Sfnt, write_u16, write_u32};
use crate::{
    compression,
    font::woff2::{EXPLICIT_TAG, HEADER_LEN, KNOWN_TAGS, SIGNATURE},
    TableTag,
};

/// Transform version 3, which is the null transform for `glyf` and `loca`.
const NULL_TRANSFORM: u8 = 3 << 6;

/// Writes a `UIntBase128` value: 7-bit groups, most significant first, with the high bit
/// set on all bytes but the last one.
fn write_uint_base128(buffer: &mut Vec<u8>, value: u32) {
    let significant_bits = u32::BITS - value.leading_zeros();
    let group_count = significant_bits.div_ceil(7).max(1);
    for group_idx in (0..group_count).rev() {
        let group = (value >> (7 * group_idx)).to_le_bytes()[0] & 0x7f;
        let continues = if group_idx == 0 { 0 } else { 0x80 };
        buffer.push(group | continues);
    }
}

fn write_directory_entry(buffer: &mut Vec<u8>, tag: TableTag, len: u32) {
    let known_idx = KNOWN_TAGS
        .iter()
        .position(|&known| known == tag)
        .and_then(|idx| u8::try_from(idx).ok());
    let mut flags = known_idx.unwrap_or(EXPLICIT_TAG);
    if tag == TableTag::GLYF || tag == TableTag::LOCA {
        flags |= NULL_TRANSFORM;
    }
    buffer.push(flags);
    if known_idx.is_none() {
        buffer.extend_from_slice(&tag.0);
    }
    write_uint_base128(buffer, len);
}

impl Sfnt {
    pub(crate) fn to_woff2(&self) -> Vec<u8> {
        let compressed = compression::brotli_compress(
            self.tables.iter().map(|table| table.data.as_slice()),
        );

        let mut directory = vec![];
        for table in &self.tables {
            let len = u32::try_from(table.data.len()).expect("table too large");
            write_directory_entry(&mut directory, table.tag, len);
        }
        // The file is padded even though there are no metadata or private blocks.
        let file_len = (HEADER_LEN + directory.len() + compressed.len()).next_multiple_of(4);

        let mut buffer = Vec::with_capacity(file_len);
        buffer.extend_from_slice(&SIGNATURE);
        write_u32(&mut buffer, self.version);
        write_u32(&mut buffer, file_len.try_into().expect("file length overflow"));
        write_u16(&mut buffer, self.tables.len().try_into().expect("too many tables"));
        write_u16(&mut buffer, 0);
        write_u32(&mut buffer, self.len().try_into().expect("sfnt length overflow"));
        let compressed_len = compressed.len().try_into().expect("compressed length overflow");
        write_u32(&mut buffer, compressed_len);
        write_u16(&mut buffer, 1); // majorVersion
        write_u16(&mut buffer, 0); // minorVersion
        // Offsets and lengths of the metadata and private blocks, all zero.
        buffer.resize(HEADER_LEN, 0);

        buffer.extend(directory);
        buffer.extend(compressed);
        buffer.resize(file_len, 0);
        buffer
    }
}
