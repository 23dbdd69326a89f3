//! Blob Codec (§4.2): a length-prefixed byte buffer with typed append/retrieve.
//! The record codec (`crate::record::codec`) builds property triples on top
//! of this; it has no knowledge of property semantics itself.

/// Growable output buffer. `append` mirrors the original's `append(ptr, n)`:
/// it just extends the backing `Vec<u8>` with raw bytes.
#[derive(Debug, Default, Clone)]
pub struct BlobWriter {
    buf: Vec<u8>,
}

impl BlobWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn append_u16(&mut self, v: u16) {
        self.append(&v.to_le_bytes());
    }

    pub fn append_u32(&mut self, v: u32) {
        self.append(&v.to_le_bytes());
    }

    pub fn append_u64(&mut self, v: u64) {
        self.append(&v.to_le_bytes());
    }

    /// Appends a 16-bit collection-size prefix followed by `count` raw items'
    /// worth of nothing — callers append the items themselves; this only
    /// writes the length header (§4.2 "Collection sizes are encoded as a
    /// 16-bit `collection-size` prefix").
    pub fn append_collection_size(&mut self, count: u16) {
        self.append_u16(count);
    }

    /// Appends a 16-bit length-prefixed string (raw UTF-8 bytes, no NUL).
    pub fn append_string(&mut self, s: &str) {
        self.append_u16(s.len() as u16);
        self.append(s.as_bytes());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Read-only cursor over a blob. `retrieve(dst, offset, n)` in the original
/// becomes `read(n)` returning a slice and advancing the cursor — idiomatic
/// Rust has no need for a caller-supplied destination buffer.
#[derive(Debug, Clone, Copy)]
pub struct BlobReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("attempted to read {requested} bytes at offset {offset}, but only {available} remain")]
    Truncated {
        offset: usize,
        requested: usize,
        available: usize,
    },
}

impl<'a> BlobReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.buf.len()
    }

    /// Retrieves `n` raw bytes starting at the cursor, advancing it by `n`.
    /// Looks at the next byte without advancing the cursor.
    pub fn peek_u8(&self) -> Result<u8, BlobError> {
        self.buf.get(self.offset).copied().ok_or(BlobError::Truncated {
            offset: self.offset,
            requested: 1,
            available: self.remaining(),
        })
    }

    pub fn retrieve(&mut self, n: usize) -> Result<&'a [u8], BlobError> {
        if self.offset + n > self.buf.len() {
            return Err(BlobError::Truncated {
                offset: self.offset,
                requested: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    pub fn retrieve_u16(&mut self) -> Result<u16, BlobError> {
        let bytes = self.retrieve(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn retrieve_u32(&mut self) -> Result<u32, BlobError> {
        let bytes = self.retrieve(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn retrieve_u64(&mut self) -> Result<u64, BlobError> {
        let bytes = self.retrieve(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn retrieve_collection_size(&mut self) -> Result<u16, BlobError> {
        self.retrieve_u16()
    }

    pub fn retrieve_string(&mut self) -> Result<&'a str, BlobError> {
        let len = self.retrieve_u16()? as usize;
        let bytes = self.retrieve(len)?;
        Ok(std::str::from_utf8(bytes).unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_retrieve_roundtrip() {
        let mut w = BlobWriter::new();
        w.append_u16(7);
        w.append_string("hello");
        w.append_u64(0xdead_beef_cafe_babe);
        let bytes = w.into_bytes();

        let mut r = BlobReader::new(&bytes);
        assert_eq!(r.retrieve_u16().unwrap(), 7);
        assert_eq!(r.retrieve_string().unwrap(), "hello");
        assert_eq!(r.retrieve_u64().unwrap(), 0xdead_beef_cafe_babe);
        assert!(r.is_exhausted());
    }

    #[test]
    fn retrieve_past_end_errors() {
        let bytes = [1u8, 2, 3];
        let mut r = BlobReader::new(&bytes);
        assert!(r.retrieve(10).is_err());
    }

    #[test]
    fn decoder_tolerates_trailing_bytes() {
        // Forward compatibility: reading fewer fields than were written and
        // simply stopping is fine, matching the record codec's requirement
        // that decoders tolerate trailing bytes.
        let mut w = BlobWriter::new();
        w.append_u16(1);
        w.append_u16(2);
        let bytes = w.into_bytes();
        let mut r = BlobReader::new(&bytes);
        assert_eq!(r.retrieve_u16().unwrap(), 1);
        // Don't read the second field; no error results from stopping early.
    }
}
