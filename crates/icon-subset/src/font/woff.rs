//! WOFF 1.0 decoding.

use super::{check_sfnt_version, Cursor, TableTag};
use crate::{
    compression,
    errors::{ParseError, ParseErrorKind},
    write::FontWriter,
};

pub(crate) const SIGNATURE: [u8; 4] = *b"wOFF";
const HEADER_LEN: usize = 44;
const SFNT_HEADER_LEN: usize = 12;
const SFNT_RECORD_LEN: usize = 16;

/// Decodes a WOFF 1.0 font into sfnt data. Metadata and private blocks are ignored;
/// table checksums are recomputed.
pub(crate) fn decode(bytes: &[u8]) -> Result<Vec<u8>, ParseError> {
    let file = Cursor::new(bytes);
    let mut cursor = file;
    cursor.skip(4)?; // signature
    let flavor = cursor.read_u32_checked(|flavor| check_sfnt_version(flavor).map(|()| flavor))?;
    cursor.skip(4)?; // length
    let table_count = cursor.read_u16()?;
    cursor.skip(HEADER_LEN - 14)?;

    let mut writer = FontWriter::new(flavor);
    let mut sfnt_len = SFNT_HEADER_LEN + SFNT_RECORD_LEN * usize::from(table_count);
    let mut has_head = false;
    for _ in 0..table_count {
        let tag = TableTag(cursor.read_byte_array()?);
        let offset = cursor.read_u32()? as usize;
        let stored_len = cursor.read_u32()? as usize;
        let original_len = cursor.read_u32()? as usize;
        cursor.skip(4)?; // checksum
        let end = offset
            .checked_add(stored_len)
            .ok_or_else(|| cursor.err(ParseErrorKind::OffsetOutOfBounds(offset)))?;
        let stored = file.range(offset..end)?.with_table(tag);

        let data = if stored_len == original_len {
            stored.bytes.to_vec()
        } else if stored_len > original_len {
            return Err(stored.err(ParseErrorKind::UnexpectedTableLen {
                expected: original_len,
                actual: stored_len,
            }));
        } else {
            compression::zlib_decompress(stored.bytes, original_len)
                .ok_or_else(|| stored.err(ParseErrorKind::Compression))?
        };
        sfnt_len += data.len().next_multiple_of(4);
        has_head |= tag == TableTag::HEAD;
        writer.raw_table(tag, data);
    }

    if !has_head {
        return Err(ParseError::missing_table(TableTag::HEAD));
    }
    if u32::try_from(sfnt_len).is_err() {
        return Err(file.err(ParseErrorKind::OffsetOutOfBounds(sfnt_len)));
    }
    Ok(writer.finish().to_bytes())
}
