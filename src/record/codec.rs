//! Record Codec (§4.4): property triples, and the fixed vertex/edge headers
//! that wrap them. Operates purely on `PropertyId`s and raw bytes — name
//! resolution against the schema lives one layer up in `crate::record`.
//!
//! Triple layout: `property-id:u16 | length | bytes`. `length` is a single
//! byte when the value is under 128 bytes; otherwise a 4-byte big-endian u32
//! with its top bit set, so a decoder can tell which form it's looking at
//! from the very first byte without any external hint.

use crate::codec::{BlobError, BlobReader, BlobWriter};
use crate::ids::{PositionId, PropertyId, RecordId, VersionId};

const LENGTH_EXTENDED_FLAG: u32 = 0x8000_0000;
const LENGTH_SHORT_MAX: usize = 127;

fn write_length(w: &mut BlobWriter, len: usize) {
    if len <= LENGTH_SHORT_MAX {
        w.append(&[len as u8]);
    } else {
        let tagged = (len as u32) | LENGTH_EXTENDED_FLAG;
        w.append(&tagged.to_be_bytes());
    }
}

fn read_length(r: &mut BlobReader<'_>) -> Result<usize, BlobError> {
    let first = r.peek_u8()?;
    if first & 0x80 == 0 {
        Ok(r.retrieve(1)?[0] as usize)
    } else {
        let bytes = r.retrieve(4)?;
        let tagged = u32::from_be_bytes(bytes.try_into().expect("4 bytes"));
        Ok((tagged & !LENGTH_EXTENDED_FLAG) as usize)
    }
}

/// Appends one `property-id | length | bytes` triple.
pub fn write_triple(w: &mut BlobWriter, property_id: PropertyId, value: &[u8]) {
    w.append_u16(property_id);
    write_length(w, value.len());
    w.append(value);
}

/// Decodes every triple remaining in the reader. Tolerates — in fact
/// requires nothing of — what came before; callers position the reader past
/// any header first.
pub fn decode_triples(r: &mut BlobReader<'_>) -> Result<Vec<(PropertyId, Vec<u8>)>, BlobError> {
    let mut out = Vec::new();
    while !r.is_exhausted() {
        let property_id = r.retrieve_u16()?;
        let len = read_length(r)?;
        let bytes = r.retrieve(len)?.to_vec();
        out.push((property_id, bytes));
    }
    Ok(out)
}

pub fn encode_triples(triples: &[(PropertyId, Vec<u8>)]) -> Vec<u8> {
    let mut w = BlobWriter::new();
    for (id, bytes) in triples {
        write_triple(&mut w, *id, bytes);
    }
    w.into_bytes()
}

/// On-disk vertex record: `[versionId:u64]? | triples*` (§4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct VertexRecord {
    pub version: Option<VersionId>,
    pub triples: Vec<(PropertyId, Vec<u8>)>,
}

impl VertexRecord {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = BlobWriter::new();
        if let Some(v) = self.version {
            w.append_u64(v);
        }
        for (id, bytes) in &self.triples {
            write_triple(&mut w, *id, bytes);
        }
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8], versioned: bool) -> Result<Self, BlobError> {
        let mut r = BlobReader::new(bytes);
        let version = if versioned { Some(r.retrieve_u64()?) } else { None };
        let triples = decode_triples(&mut r)?;
        Ok(Self { version, triples })
    }
}

/// On-disk edge record: `[versionId:u64]? | srcClassId:u16 | srcPos:u32 |
/// dstClassId:u16 | dstPos:u32 | triples*` (§4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub version: Option<VersionId>,
    pub src: RecordId,
    pub dst: RecordId,
    pub triples: Vec<(PropertyId, Vec<u8>)>,
}

impl EdgeRecord {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = BlobWriter::new();
        if let Some(v) = self.version {
            w.append_u64(v);
        }
        w.append(&self.src.to_packed_bytes());
        w.append(&self.dst.to_packed_bytes());
        for (id, bytes) in &self.triples {
            write_triple(&mut w, *id, bytes);
        }
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8], versioned: bool) -> Result<Self, BlobError> {
        let mut r = BlobReader::new(bytes);
        let version = if versioned { Some(r.retrieve_u64()?) } else { None };
        let src = RecordId::from_packed_bytes(r.retrieve(6)?.try_into().expect("6 bytes"));
        let dst = RecordId::from_packed_bytes(r.retrieve(6)?.try_into().expect("6 bytes"));
        let triples = decode_triples(&mut r)?;
        Ok(Self { version, src, dst, triples })
    }

    fn endpoints_offset(versioned: bool) -> usize {
        if versioned { 8 } else { 0 }
    }

    fn header_len(versioned: bool) -> usize {
        Self::endpoints_offset(versioned) + 12
    }
}

/// Replaces only the 8-byte version field, leaving everything else —
/// including the user payload — byte-identical. Panics if `bytes` is shorter
/// than 8 bytes, which would mean the record wasn't versioned to begin with.
pub fn parse_only_update_version(bytes: &[u8], new_version: VersionId) -> Vec<u8> {
    let mut out = bytes.to_vec();
    out[0..8].copy_from_slice(&new_version.to_le_bytes());
    out
}

/// Replaces the src endpoint of an edge record in place.
pub fn parse_only_update_src_vertex(bytes: &[u8], versioned: bool, new_src: RecordId) -> Vec<u8> {
    let mut out = bytes.to_vec();
    let off = EdgeRecord::endpoints_offset(versioned);
    out[off..off + 6].copy_from_slice(&new_src.to_packed_bytes());
    out
}

/// Replaces the dst endpoint of an edge record in place.
pub fn parse_only_update_dst_vertex(bytes: &[u8], versioned: bool, new_dst: RecordId) -> Vec<u8> {
    let mut out = bytes.to_vec();
    let off = EdgeRecord::endpoints_offset(versioned) + 6;
    out[off..off + 6].copy_from_slice(&new_dst.to_packed_bytes());
    out
}

/// Replaces the user payload (the triples) of a vertex record, preserving any
/// version prefix.
pub fn parse_only_update_vertex_payload(bytes: &[u8], versioned: bool, new_triples: &[(PropertyId, Vec<u8>)]) -> Vec<u8> {
    let header_len = if versioned { 8 } else { 0 };
    let mut out = bytes[..header_len].to_vec();
    out.extend(encode_triples(new_triples));
    out
}

/// Replaces the user payload of an edge record, preserving version and both
/// endpoints.
pub fn parse_only_update_edge_payload(bytes: &[u8], versioned: bool, new_triples: &[(PropertyId, Vec<u8>)]) -> Vec<u8> {
    let header_len = EdgeRecord::header_len(versioned);
    let mut out = bytes[..header_len].to_vec();
    out.extend(encode_triples(new_triples));
    out
}

/// Packs a position id as the 4-byte LE key used by the data record store.
pub fn position_key_bytes(position_id: PositionId) -> [u8; 4] {
    position_id.to_le_bytes()
}
