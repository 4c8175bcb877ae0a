// auth-server/src/proof/boc.rs
//! Minimal bag-of-cells reader, just enough to hash a wallet state init.
//!
//! Parses the serialized BOC layout (magic, size descriptors, root list,
//! flattened cells) and computes the root cell's representation hash:
//! sha256(d1, d2, data, ref depths, ref hashes), references resolved
//! bottom-up. Only ordinary level-zero cells are accepted, which is all a
//! wallet contract's state init ever contains.

use sha2::{Digest, Sha256};
use thiserror::Error;

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

#[derive(Debug, Error)]
pub enum BocError {
    #[error("bag of cells truncated")]
    Truncated,
    #[error("bad bag-of-cells magic")]
    BadMagic,
    #[error("unsupported bag of cells: {0}")]
    Unsupported(&'static str),
    #[error("cell reference out of order")]
    BadReference,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], BocError> {
        let end = self.pos.checked_add(n).ok_or(BocError::Truncated)?;
        if end > self.bytes.len() {
            return Err(BocError::Truncated);
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, BocError> {
        Ok(self.take(1)?[0])
    }

    /// Big-endian unsigned integer over `n` bytes
    fn uint(&mut self, n: usize) -> Result<u64, BocError> {
        let mut value = 0u64;
        for &b in self.take(n)? {
            value = (value << 8) | b as u64;
        }
        Ok(value)
    }
}

struct RawCell {
    d1: u8,
    d2: u8,
    data: Vec<u8>,
    refs: Vec<usize>,
}

/// Parse a serialized bag of cells and return the representation hash of
/// its single root cell.
pub fn root_hash(bytes: &[u8]) -> Result<[u8; 32], BocError> {
    let mut reader = Reader::new(bytes);

    if reader.take(4)? != BOC_MAGIC {
        return Err(BocError::BadMagic);
    }

    let flags = reader.byte()?;
    let has_index = flags & 0x80 != 0;
    let ref_size = (flags & 0x07) as usize;
    if ref_size == 0 || ref_size > 4 {
        return Err(BocError::Unsupported("reference size"));
    }

    let off_bytes = reader.byte()? as usize;
    if off_bytes == 0 || off_bytes > 8 {
        return Err(BocError::Unsupported("offset size"));
    }

    let cell_count = reader.uint(ref_size)? as usize;
    let root_count = reader.uint(ref_size)? as usize;
    let absent_count = reader.uint(ref_size)?;
    let _total_cells_size = reader.uint(off_bytes)?;

    if root_count != 1 {
        return Err(BocError::Unsupported("expected a single root cell"));
    }
    if absent_count != 0 {
        return Err(BocError::Unsupported("absent cells"));
    }

    let root_index = reader.uint(ref_size)? as usize;

    if has_index {
        reader.take(cell_count.checked_mul(off_bytes).ok_or(BocError::Truncated)?)?;
    }

    let mut cells = Vec::with_capacity(cell_count);
    for i in 0..cell_count {
        let d1 = reader.byte()?;
        let d2 = reader.byte()?;

        if d1 & 0x08 != 0 {
            return Err(BocError::Unsupported("exotic cells"));
        }
        if d1 >> 5 != 0 {
            return Err(BocError::Unsupported("nonzero level cells"));
        }
        let ref_count = (d1 & 0x07) as usize;
        if ref_count > 4 {
            return Err(BocError::Unsupported("cell with more than four references"));
        }

        // d2 = floor(bits/8) + ceil(bits/8); stored bytes include the
        // completion tag when the bit length is not byte-aligned
        let data_len = (d2 as usize + 1) / 2;
        let data = reader.take(data_len)?.to_vec();

        let mut refs = Vec::with_capacity(ref_count);
        for _ in 0..ref_count {
            let idx = reader.uint(ref_size)? as usize;
            // topological order: references only point to later cells
            if idx <= i || idx >= cell_count {
                return Err(BocError::BadReference);
            }
            refs.push(idx);
        }

        cells.push(RawCell { d1, d2, data, refs });
    }

    if root_index >= cell_count {
        return Err(BocError::BadReference);
    }

    // Hash bottom-up; reference order guarantees children come later
    let mut hashes = vec![[0u8; 32]; cell_count];
    let mut depths = vec![0u16; cell_count];
    for i in (0..cell_count).rev() {
        let cell = &cells[i];

        let mut depth = 0u16;
        for &r in &cell.refs {
            depth = depth.max(depths[r].saturating_add(1));
        }

        let mut repr = Vec::with_capacity(2 + cell.data.len() + cell.refs.len() * 34);
        repr.push(cell.d1);
        repr.push(cell.d2);
        repr.extend_from_slice(&cell.data);
        for &r in &cell.refs {
            repr.extend_from_slice(&depths[r].to_be_bytes());
        }
        for &r in &cell.refs {
            repr.extend_from_slice(&hashes[r]);
        }

        depths[i] = depth;
        let mut hasher = Sha256::new();
        hasher.update(&repr);
        hashes[i] = hasher.finalize().into();
    }

    Ok(hashes[root_index])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sha256(input: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(input);
        hasher.finalize().into()
    }

    #[test]
    fn test_single_cell_hash() {
        // One cell, no refs, 16 data bits (0xABCD): d1 = 0, d2 = 4
        let boc = [
            0xb5, 0xee, 0x9c, 0x72, // magic
            0x01, // flags: ref size 1
            0x01, // offset size 1
            0x01, // cell count
            0x01, // root count
            0x00, // absent count
            0x04, // total cells size
            0x00, // root index
            0x00, 0x04, 0xab, 0xcd, // the cell
        ];

        let hash = root_hash(&boc).unwrap();
        assert_eq!(hash, sha256(&[0x00, 0x04, 0xab, 0xcd]));
    }

    #[test]
    fn test_two_cell_hash_with_reference() {
        // Root (1 ref, no data) -> child (8 data bits 0x55)
        let boc = [
            0xb5, 0xee, 0x9c, 0x72, // magic
            0x01, // flags: ref size 1
            0x01, // offset size 1
            0x02, // cell count
            0x01, // root count
            0x00, // absent count
            0x06, // total cells size
            0x00, // root index
            0x01, 0x00, 0x01, // root cell: d1=1 ref, d2=0, ref -> cell 1
            0x00, 0x02, 0x55, // child cell
        ];

        let child_hash = sha256(&[0x00, 0x02, 0x55]);
        let mut root_repr = vec![0x01, 0x00];
        root_repr.extend_from_slice(&0u16.to_be_bytes()); // child depth
        root_repr.extend_from_slice(&child_hash);

        let hash = root_hash(&boc).unwrap();
        assert_eq!(hash, sha256(&root_repr));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let boc = [0u8; 16];
        assert!(matches!(root_hash(&boc), Err(BocError::BadMagic)));
    }

    #[test]
    fn test_rejects_truncated_input() {
        let boc = [0xb5, 0xee, 0x9c, 0x72, 0x01, 0x01, 0x01];
        assert!(matches!(root_hash(&boc), Err(BocError::Truncated)));
    }

    #[test]
    fn test_rejects_backward_reference() {
        let boc = [
            0xb5, 0xee, 0x9c, 0x72,
            0x01, 0x01,
            0x02, 0x01, 0x00, 0x06,
            0x00,
            0x00, 0x00, // cell 0: no refs, no data
            0x01, 0x00, 0x00, // cell 1: ref back to cell 0
        ];
        assert!(matches!(root_hash(&boc), Err(BocError::BadReference)));
    }
}
