//! Compression glue for the WOFF containers: zlib (WOFF 1.0) via `flate2`
//! and brotli (WOFF2) via `brotli` with a heap-backed allocator.

use std::io::{Read as _, Write as _};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

/// Streams unpadded table data into the brotli encoder.
struct TableStream<'a, I> {
    tables: I,
    current: &'a [u8],
}

impl<'a, I: Iterator<Item = &'a [u8]>> TableStream<'a, I> {
    fn new(tables: I) -> Self {
        Self {
            tables,
            current: &[],
        }
    }
}

impl<'a, I: Iterator<Item = &'a [u8]>> brotli::CustomRead<()> for TableStream<'a, I> {
    fn read(&mut self, data: &mut [u8]) -> Result<usize, ()> {
        let mut total_read = 0;
        while total_read < data.len() {
            if self.current.is_empty() {
                let Some(next_table) = self.tables.next() else {
                    break; // nothing left to read
                };
                self.current = next_table;
                continue;
            }

            let chunk_len = self.current.len().min(data.len() - total_read);
            let (chunk, rest) = self.current.split_at(chunk_len);
            data[total_read..total_read + chunk_len].copy_from_slice(chunk);
            self.current = rest;
            total_read += chunk_len;
        }
        Ok(total_read)
    }
}

/// Output buffer, optionally capped so that a malformed stream cannot inflate unboundedly.
#[derive(Debug, Default)]
struct Buffer {
    data: Vec<u8>,
    limit: Option<usize>,
}

impl brotli::CustomWrite<()> for Buffer {
    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        if self
            .limit
            .is_some_and(|limit| self.data.len() + data.len() > limit)
        {
            return Err(());
        }
        self.data.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct BoxedSlice<T>(Box<[T]>);

impl<T> Default for BoxedSlice<T> {
    fn default() -> Self {
        Self(Box::default())
    }
}

impl<T> brotli::SliceWrapper<T> for BoxedSlice<T> {
    fn slice(&self) -> &[T] {
        self.0.as_ref()
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

impl<T> brotli::SliceWrapperMut<T> for BoxedSlice<T> {
    fn slice_mut(&mut self) -> &mut [T] {
        self.0.as_mut()
    }
}

/// Allocator used both by the encoder and the decoder.
#[derive(Debug, Clone, Copy)]
struct GlobalAlloc;

impl<T: Clone + Default> brotli::Allocator<T> for GlobalAlloc {
    type AllocatedMemory = BoxedSlice<T>;

    fn alloc_cell(&mut self, len: usize) -> Self::AllocatedMemory {
        BoxedSlice(vec![T::default(); len].into())
    }

    fn free_cell(&mut self, data: Self::AllocatedMemory) {
        drop(data);
    }
}

impl brotli::enc::BrotliAlloc for GlobalAlloc {}

const BUFFER_LEN: usize = 4_096;
/// Upper bound on preallocated output; lengths come from untrusted headers.
const MAX_PREALLOCATED_LEN: usize = 1 << 24;

/// Compresses the concatenation of `chunks` with brotli.
pub(crate) fn brotli_compress<'a>(chunks: impl Iterator<Item = &'a [u8]>) -> Vec<u8> {
    let mut buffer = Buffer::default();
    brotli::BrotliCompressCustomIo(
        &mut TableStream::new(chunks),
        &mut buffer,
        &mut [0_u8; BUFFER_LEN],
        &mut [0_u8; BUFFER_LEN],
        &brotli::enc::BrotliEncoderParams::default(),
        GlobalAlloc,
        &mut |_, _, _, _| { /* do nothing */ },
        (),
    )
    .expect("Writing to Vec never fails");
    buffer.data
}

/// Decompresses brotli data that is expected to inflate to exactly `expected_len` bytes.
pub(crate) fn brotli_decompress(data: &[u8], expected_len: usize) -> Option<Vec<u8>> {
    let mut buffer = Buffer {
        data: Vec::with_capacity(expected_len.min(MAX_PREALLOCATED_LEN)),
        limit: Some(expected_len),
    };
    brotli::BrotliDecompressCustomIo(
        &mut TableStream::new([data].into_iter()),
        &mut buffer,
        &mut [0_u8; BUFFER_LEN],
        &mut [0_u8; BUFFER_LEN],
        GlobalAlloc,
        GlobalAlloc,
        GlobalAlloc,
        (),
    )
    .ok()?;
    (buffer.data.len() == expected_len).then_some(buffer.data)
}

/// Compresses data with zlib. Returns `None` if compression does not save space.
pub(crate) fn zlib_compress(data: &[u8]) -> Option<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).ok()?;
    let compressed = encoder.finish().ok()?;
    (compressed.len() < data.len()).then_some(compressed)
}

/// Inflates zlib data that is expected to inflate to exactly `expected_len` bytes.
pub(crate) fn zlib_decompress(data: &[u8], expected_len: usize) -> Option<Vec<u8>> {
    let mut inflated = Vec::with_capacity(expected_len.min(MAX_PREALLOCATED_LEN));
    let limit = u64::try_from(expected_len).ok()?.saturating_add(1);
    ZlibDecoder::new(data)
        .take(limit)
        .read_to_end(&mut inflated)
        .ok()?;
    (inflated.len() == expected_len).then_some(inflated)
}
