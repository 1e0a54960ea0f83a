//! `name` table for the produced fonts.

use super::write_u16;

/// Names identifying the produced font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FontNames {
    pub(crate) family: String,
    pub(crate) style: &'static str,
    pub(crate) version: &'static str,
    pub(crate) full_name: String,
    pub(crate) postscript_name: String,
}

impl FontNames {
    const WINDOWS_PLATFORM: u16 = 3;
    const UNICODE_BMP_ENCODING: u16 = 1;
    const EN_US_LANGUAGE: u16 = 0x409;
    const RECORD_COUNT: u16 = 6;
    /// Longer family names are truncated.
    const MAX_FAMILY_CHARS: usize = 255;

    pub(crate) fn new(family: &str) -> Self {
        let family: String = family.chars().take(Self::MAX_FAMILY_CHARS).collect();
        let postscript_name: String = family
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
            .take(63)
            .collect();
        Self {
            full_name: family.clone(),
            family,
            style: "Regular",
            version: "Version 1.0",
            postscript_name: if postscript_name.is_empty() {
                "icons".to_owned()
            } else {
                postscript_name
            },
        }
    }

    /// Returns `(name_id, value)` records ordered by name ID.
    fn records(&self) -> [(u16, &str); Self::RECORD_COUNT as usize] {
        [
            (1, self.family.as_str()),
            (2, self.style),
            (3, self.full_name.as_str()), // unique ID
            (4, self.full_name.as_str()),
            (5, self.version),
            (6, self.postscript_name.as_str()),
        ]
    }

    /// Writes a format 0 table with Windows Unicode records.
    pub(crate) fn write(&self, writer: &mut Vec<u8>) {
        const RECORD_LEN: u16 = 12;

        let records = self.records();
        let encoded: Vec<Vec<u8>> = records
            .iter()
            .map(|(_, value)| value.encode_utf16().flat_map(u16::to_be_bytes).collect())
            .collect();

        write_u16(writer, 0); // format
        write_u16(writer, Self::RECORD_COUNT);
        write_u16(writer, 6 + RECORD_LEN * Self::RECORD_COUNT); // storageOffset

        let mut string_offset = 0_u16;
        for ((name_id, _), bytes) in records.iter().zip(&encoded) {
            let len = u16::try_from(bytes.len()).expect("name is too long");
            write_u16(writer, Self::WINDOWS_PLATFORM);
            write_u16(writer, Self::UNICODE_BMP_ENCODING);
            write_u16(writer, Self::EN_US_LANGUAGE);
            write_u16(writer, *name_id);
            write_u16(writer, len);
            write_u16(writer, string_offset);
            string_offset = string_offset.checked_add(len).expect("names are too long");
        }
        for bytes in encoded {
            writer.extend(bytes);
        }
    }
}
