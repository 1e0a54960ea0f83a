//! WOFF 1.0 serialization.

use std::borrow::Cow;

use super::{sfnt::Sfnt, write_u16, write_u32};
use crate::compression;

const SIGNATURE: u32 = u32::from_be_bytes(*b"wOFF");
const HEADER_LEN: usize = 44;
const TABLE_ENTRY_LEN: usize = 20;

impl Sfnt {
    pub(crate) fn to_woff(&self) -> Vec<u8> {
        // Tables are only stored compressed if this saves space.
        let stored: Vec<Cow<'_, [u8]>> = self
            .tables
            .iter()
            .map(|table| {
                compression::zlib_compress(&table.data)
                    .map_or(Cow::Borrowed(table.data.as_slice()), Cow::Owned)
            })
            .collect();

        let mut offset = HEADER_LEN + TABLE_ENTRY_LEN * self.tables.len();
        let mut directory = Vec::with_capacity(TABLE_ENTRY_LEN * self.tables.len());
        for (table, data) in self.tables.iter().zip(&stored) {
            directory.extend_from_slice(&table.tag.0);
            write_u32(&mut directory, offset.try_into().expect("offset overflow"));
            write_u32(&mut directory, data.len().try_into().expect("table too large"));
            write_u32(&mut directory, table.data.len().try_into().expect("table too large"));
            write_u32(&mut directory, table.checksum);
            offset += data.len().next_multiple_of(4);
        }
        let file_len = offset;

        let mut buffer = Vec::with_capacity(file_len);
        write_u32(&mut buffer, SIGNATURE);
        write_u32(&mut buffer, self.version);
        write_u32(&mut buffer, file_len.try_into().expect("file length overflow"));
        write_u16(&mut buffer, self.tables.len().try_into().expect("too many tables"));
        write_u16(&mut buffer, 0); // reserved
        write_u32(&mut buffer, self.len().try_into().expect("sfnt length overflow"));
        write_u16(&mut buffer, 1); // major version
        write_u16(&mut buffer, 0); // minor version
        write_u32(&mut buffer, 0); // metadata offset
        write_u32(&mut buffer, 0); // metadata length
        write_u32(&mut buffer, 0); // original metadata length
        write_u32(&mut buffer, 0); // private block offset
        write_u32(&mut buffer, 0); // private block length
        debug_assert_eq!(buffer.len(), HEADER_LEN);

        buffer.extend(directory);
        for data in stored {
            buffer.extend_from_slice(&data);
            buffer.resize(buffer.len().next_multiple_of(4), 0);
        }
        debug_assert_eq!(buffer.len(), file_len);
        buffer
    }
}
