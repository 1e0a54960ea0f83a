//! Assembly of sfnt table directories shared by all produced containers.

use super::{write_u16, write_u32};
use crate::{font::Font, TableTag};

/// Table ready for serialization.
#[derive(Debug, Clone)]
pub(crate) struct SfntTable {
    pub(crate) tag: TableTag,
    /// Checksum of the table data; for `head`, computed with zero `checksumAdjustment`.
    pub(crate) checksum: u32,
    /// Unpadded table data.
    pub(crate) data: Vec<u8>,
}

impl SfntTable {
    pub(crate) fn padded_len(&self) -> usize {
        self.data.len().next_multiple_of(4)
    }
}

/// Collects tables of a font being built. Tables may be added in any order.
#[derive(Debug)]
pub(crate) struct FontWriter {
    sfnt_version: u32,
    tables: Vec<SfntTable>,
}

impl Default for FontWriter {
    fn default() -> Self {
        Self::new(Font::SFNT_VERSION)
    }
}

impl FontWriter {
    pub(crate) fn new(sfnt_version: u32) -> Self {
        Self {
            sfnt_version,
            tables: vec![],
        }
    }

    /// Adds a table with the data produced by `with`.
    pub(crate) fn table<T>(&mut self, tag: TableTag, with: impl FnOnce(&mut Vec<u8>) -> T) -> T {
        let mut data = vec![];
        let output = with(&mut data);
        self.raw_table(tag, data);
        output
    }

    pub(crate) fn raw_table(&mut self, tag: TableTag, data: Vec<u8>) {
        self.tables.push(SfntTable {
            tag,
            checksum: 0,
            data,
        });
    }

    /// Orders tables by tag, computes their checksums and patches `checksumAdjustment`
    /// in `head` (if it is present) so that the whole font sums up to the magic value.
    pub(crate) fn finish(mut self) -> Sfnt {
        const ADJUSTMENT: core::ops::Range<usize> =
            Font::HEAD_CHECKSUM_OFFSET..Font::HEAD_CHECKSUM_OFFSET + 4;

        self.tables.sort_by_key(|table| table.tag);
        for table in &mut self.tables {
            if table.tag == TableTag::HEAD {
                if let Some(field) = table.data.get_mut(ADJUSTMENT) {
                    field.fill(0);
                }
            }
            table.checksum = Font::checksum(&table.data);
        }

        let mut sfnt = Sfnt {
            version: self.sfnt_version,
            tables: self.tables,
            checksum_adjustment: 0,
        };
        let font_checksum = sfnt
            .tables
            .iter()
            .fold(Font::checksum(&sfnt.header()), |sum, table| {
                sum.wrapping_add(table.checksum)
            });
        let adjustment = Font::SFNT_CHECKSUM.wrapping_sub(font_checksum);
        let head = sfnt
            .tables
            .iter_mut()
            .find(|table| table.tag == TableTag::HEAD);
        if let Some(field) = head.and_then(|head| head.data.get_mut(ADJUSTMENT)) {
            field.copy_from_slice(&adjustment.to_be_bytes());
            sfnt.checksum_adjustment = adjustment;
        }
        sfnt
    }
}

/// Finished font: tables sorted by tag with all checksums computed.
#[derive(Debug, Clone)]
pub(crate) struct Sfnt {
    pub(crate) version: u32,
    pub(crate) tables: Vec<SfntTable>,
    /// Value written to the `checksumAdjustment` field of `head`.
    pub(crate) checksum_adjustment: u32,
}

impl Sfnt {
    const HEADER_LEN: usize = 12;
    const RECORD_LEN: usize = 16;

    fn data_offset(&self) -> usize {
        Self::HEADER_LEN + Self::RECORD_LEN * self.tables.len()
    }

    /// Length of the serialized font.
    pub(crate) fn len(&self) -> usize {
        self.data_offset() + self.tables.iter().map(SfntTable::padded_len).sum::<usize>()
    }

    /// Offset table followed by the table records.
    fn header(&self) -> Vec<u8> {
        let table_count = u16::try_from(self.tables.len()).expect("too many tables");
        let mut buffer = Vec::with_capacity(self.data_offset());
        write_u32(&mut buffer, self.version);
        write_u16(&mut buffer, table_count);
        #[allow(clippy::cast_possible_truncation)] // log2 of a `u16` value always fits
        let entry_selector = table_count.checked_ilog2().unwrap_or(0) as u16;
        let search_range = 16_u16 << entry_selector;
        write_u16(&mut buffer, search_range);
        write_u16(&mut buffer, entry_selector);
        write_u16(
            &mut buffer,
            table_count.wrapping_mul(16).wrapping_sub(search_range),
        );

        let mut offset = self.data_offset();
        for table in &self.tables {
            buffer.extend_from_slice(&table.tag.0);
            write_u32(&mut buffer, table.checksum);
            write_u32(&mut buffer, u32::try_from(offset).expect("font too large"));
            write_u32(&mut buffer, u32::try_from(table.data.len()).expect("table too large"));
            offset += table.padded_len();
        }
        buffer
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = self.header();
        buffer.reserve(self.len() - buffer.len());
        for table in &self.tables {
            buffer.extend_from_slice(&table.data);
            buffer.resize(buffer.len().next_multiple_of(4), 0);
        }
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_sorted_and_padded() {
        let mut writer = FontWriter::default();
        writer.raw_table(TableTag::POST, vec![1, 2, 3]);
        writer.raw_table(TableTag::CMAP, vec![4; 8]);
        let sfnt = writer.finish();
        assert_eq!(sfnt.checksum_adjustment, 0); // no `head`

        let bytes = sfnt.to_bytes();
        assert_eq!(bytes.len(), sfnt.len());
        assert_eq!(bytes.len(), 12 + 2 * 16 + 8 + 4);
        assert_eq!(bytes[4..12], [0, 2, 0, 32, 0, 1, 0, 0]);
        assert_eq!(&bytes[12..16], b"cmap");
        assert_eq!(&bytes[28..32], b"post");
        assert_eq!(bytes[36..40], 52_u32.to_be_bytes()); // `post` offset
        assert_eq!(bytes[52..], [1, 2, 3, 0]);
    }

    #[test]
    fn head_checksum_is_adjusted() {
        let mut writer = FontWriter::default();
        let mut head = vec![0; 54];
        head[8..12].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        writer.raw_table(TableTag::HEAD, head);
        writer.raw_table(TableTag::NAME, vec![7; 10]);
        let sfnt = writer.finish();

        let bytes = sfnt.to_bytes();
        assert_eq!(Font::checksum(&bytes), Font::SFNT_CHECKSUM);
        let head = &sfnt.tables[0];
        assert_eq!(head.tag, TableTag::HEAD);
        assert_eq!(head.data[8..12], sfnt.checksum_adjustment.to_be_bytes());
        // The recorded `head` checksum ignores the adjustment.
        assert_eq!(head.checksum, 0);
    }
}
