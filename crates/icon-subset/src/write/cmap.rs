//! `cmap` table serialization.

use std::collections::BTreeMap;

use super::{write_u16, write_u32};

/// Run of consecutive chars mapped to consecutive glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CharRun {
    start: u32,
    end: u32,
    start_glyph: u16,
}

impl CharRun {
    fn runs(map: &BTreeMap<char, u16>) -> Vec<Self> {
        let mut runs: Vec<Self> = vec![];
        for (&ch, &glyph_idx) in map {
            let code = u32::from(ch);
            if let Some(run) = runs.last_mut() {
                let continues = code == run.end + 1
                    && u32::from(glyph_idx) == u32::from(run.start_glyph) + code - run.start;
                if continues {
                    run.end = code;
                    continue;
                }
            }
            runs.push(Self {
                start: code,
                end: code,
                start_glyph: glyph_idx,
            });
        }
        runs
    }
}

/// Writes a format 4 subtable covering BMP chars from `runs`.
#[allow(clippy::cast_possible_truncation)] // codes are checked to be in the BMP
fn write_segments(runs: &[CharRun], writer: &mut Vec<u8>) {
    const LAST_CODE: u32 = 0xfffe;

    let segments: Vec<_> = runs
        .iter()
        .filter(|run| run.start <= LAST_CODE)
        .map(|run| {
            let start = run.start as u16;
            let end = run.end.min(LAST_CODE) as u16;
            (start, end, run.start_glyph.wrapping_sub(start))
        })
        // The terminating segment maps 0xffff to the missing glyph.
        .chain([(u16::MAX, u16::MAX, 1)])
        .collect();

    let segment_count = u16::try_from(segments.len()).expect("too many `cmap` segments");
    let subtable_len = 16 + 8 * u32::from(segment_count);
    write_u16(writer, 4); // format
    write_u16(
        writer,
        u16::try_from(subtable_len).expect("too many `cmap` segments"),
    );
    write_u16(writer, 0); // language
    write_u16(writer, 2 * segment_count);
    let entry_selector = segment_count.ilog2() as u16;
    let search_range = 2 << entry_selector;
    write_u16(writer, search_range);
    write_u16(writer, entry_selector);
    write_u16(writer, 2 * segment_count - search_range);

    for &(_, end, _) in &segments {
        write_u16(writer, end);
    }
    write_u16(writer, 0); // reservedPad
    for &(start, ..) in &segments {
        write_u16(writer, start);
    }
    for &(.., delta) in &segments {
        write_u16(writer, delta);
    }
    for _ in &segments {
        write_u16(writer, 0); // idRangeOffset
    }
}

/// Writes a format 12 subtable covering all chars from `runs`.
fn write_groups(runs: &[CharRun], writer: &mut Vec<u8>) {
    let group_count = u32::try_from(runs.len()).expect("too many `cmap` groups");
    write_u16(writer, 12); // format
    write_u16(writer, 0); // reserved
    write_u32(writer, 16 + 12 * group_count);
    write_u32(writer, 0); // language
    write_u32(writer, group_count);
    for run in runs {
        write_u32(writer, run.start);
        write_u32(writer, run.end);
        write_u32(writer, run.start_glyph.into());
    }
}

/// Writes a `cmap` table with a Unicode BMP subtable (format 4). If the map contains
/// supplementary-plane chars, a full-repertoire subtable (format 12) is added.
pub(crate) fn write_cmap(map: &BTreeMap<char, u16>, writer: &mut Vec<u8>) {
    const UNICODE_PLATFORM: u16 = 0;
    const HEADER_LEN: u32 = 4;
    const RECORD_LEN: u32 = 8;

    let runs = CharRun::runs(map);
    let needs_groups = runs.last().is_some_and(|run| run.end > 0xffff);
    let mut segments = vec![];
    write_segments(&runs, &mut segments);

    let record_count: u16 = if needs_groups { 2 } else { 1 };
    let segments_offset = HEADER_LEN + RECORD_LEN * u32::from(record_count);
    write_u16(writer, 0); // version
    write_u16(writer, record_count);
    write_u16(writer, UNICODE_PLATFORM);
    write_u16(writer, 3); // Unicode 2.0+, BMP only
    write_u32(writer, segments_offset);
    if needs_groups {
        write_u16(writer, UNICODE_PLATFORM);
        write_u16(writer, 4); // Unicode 2.0+, full repertoire
        let segments_len = u32::try_from(segments.len()).expect("`cmap` subtable too long");
        write_u32(writer, segments_offset + segments_len);
    }
    writer.extend_from_slice(&segments);
    if needs_groups {
        write_groups(&runs, writer);
    }
}
