//! Embedded OpenType (EOT) serialization.

use super::FontNames;
use crate::subset::FontSubset;

/// Version 2.1 of the header: root strings are present, but are empty.
const EOT_VERSION: u32 = 0x_0002_0001;
const MAGIC_NUMBER: u16 = 0x504c;
const DEFAULT_CHARSET: u8 = 1;

fn write_u16_le(writer: &mut Vec<u8>, value: u16) {
    writer.extend_from_slice(&value.to_le_bytes());
}

fn write_u32_le(writer: &mut Vec<u8>, value: u32) {
    writer.extend_from_slice(&value.to_le_bytes());
}

/// Writes a name preceded by padding and its byte size. Names are encoded as UTF-16LE.
fn write_name(writer: &mut Vec<u8>, name: &str) {
    let encoded: Vec<u8> = name.encode_utf16().flat_map(u16::to_le_bytes).collect();
    write_u16_le(writer, 0); // padding
    write_u16_le(writer, u16::try_from(encoded.len()).expect("name is too long"));
    writer.extend(encoded);
}

/// Fields of the EOT header copied from the `OS/2` table.
#[derive(Debug, Default)]
struct Os2Fields {
    panose: [u8; 10],
    italic: bool,
    weight: u16,
    fs_type: u16,
    unicode_range: [u32; 4],
    code_page_range: [u32; 2],
}

impl Os2Fields {
    const WEIGHT_OFFSET: usize = 4;
    const FS_TYPE_OFFSET: usize = 8;
    const PANOSE_OFFSET: usize = 32;
    const UNICODE_RANGE_OFFSET: usize = 42;
    const FS_SELECTION_OFFSET: usize = 62;
    const CODE_PAGE_RANGE_OFFSET: usize = 78;

    fn new(os2: &[u8]) -> Self {
        let read_u16 = |offset: usize| {
            os2.get(offset..offset + 2)
                .map_or(0, |bytes| u16::from_be_bytes([bytes[0], bytes[1]]))
        };
        let read_u32 = |offset: usize| {
            os2.get(offset..offset + 4).map_or(0, |bytes| {
                u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
            })
        };

        let mut panose = [0; 10];
        if let Some(bytes) = os2.get(Self::PANOSE_OFFSET..Self::PANOSE_OFFSET + 10) {
            panose.copy_from_slice(bytes);
        }
        Self {
            panose,
            italic: read_u16(Self::FS_SELECTION_OFFSET) & 1 != 0,
            weight: read_u16(Self::WEIGHT_OFFSET),
            fs_type: read_u16(Self::FS_TYPE_OFFSET),
            unicode_range: [0, 4, 8, 12].map(|i| read_u32(Self::UNICODE_RANGE_OFFSET + i)),
            // Code page ranges are absent in version 0 tables; `read_u32` returns 0 in this case.
            code_page_range: [0, 4].map(|i| read_u32(Self::CODE_PAGE_RANGE_OFFSET + i)),
        }
    }
}

impl FontSubset<'_> {
    /// Serializes this subset to the Embedded OpenType format, wrapping the TrueType data.
    pub(crate) fn to_eot(&self) -> Vec<u8> {
        let sfnt = self.to_sfnt();
        let font_data = sfnt.to_bytes();
        let os2 = Os2Fields::new(self.font.os2.as_ref());
        let names = FontNames::new(&self.family_name);

        let mut header = vec![];
        write_u32_le(&mut header, 0); // EOT size; patched below
        let font_data_len = u32::try_from(font_data.len()).expect("font data length overflow");
        write_u32_le(&mut header, font_data_len);
        write_u32_le(&mut header, EOT_VERSION);
        write_u32_le(&mut header, 0); // flags
        header.extend_from_slice(&os2.panose);
        header.push(DEFAULT_CHARSET);
        header.push(u8::from(os2.italic));
        write_u32_le(&mut header, os2.weight.into());
        write_u16_le(&mut header, os2.fs_type);
        write_u16_le(&mut header, MAGIC_NUMBER);
        for range in os2.unicode_range {
            write_u32_le(&mut header, range);
        }
        for range in os2.code_page_range {
            write_u32_le(&mut header, range);
        }
        write_u32_le(&mut header, sfnt.checksum_adjustment);
        for _ in 0..4 {
            write_u32_le(&mut header, 0); // reserved
        }

        write_name(&mut header, &names.family);
        write_name(&mut header, names.style);
        write_name(&mut header, names.version);
        write_name(&mut header, &names.full_name);
        write_name(&mut header, ""); // root string

        let eot_len = u32::try_from(header.len() + font_data.len()).expect("EOT length overflow");
        header[..4].copy_from_slice(&eot_len.to_le_bytes());
        header.extend(font_data);
        header
    }
}
