//! Exact squared-L2 vector index with a flat little-endian file format.
//!
//! Layout of a persisted index:
//!
//! ```text
//! magic   b"CIDX"
//! version u32 LE (currently 1)
//! dim     u32 LE
//! count   u64 LE
//! data    count * dim f32 LE, row-major, row i = passage id i
//! ```

use std::path::Path;

use crate::error::{RagError, Result};

const MAGIC: &[u8; 4] = b"CIDX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// One search hit: passage id and squared Euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: usize,
    pub distance: f32,
}

/// Brute-force nearest-neighbor index. Vector position is the passage id.
///
/// A fresh index has no dimension; the first [`add`](Self::add) pins it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Empty index with a fixed dimension.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Build an index from vectors in id order.
    ///
    /// # Errors
    ///
    /// Returns `RagError::DimensionMismatch` if the vectors differ in width.
    pub fn from_vectors(vectors: &[Vec<f32>]) -> Result<Self> {
        let mut index = Self::default();
        index.add(vectors)?;
        Ok(index)
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Vector stored under `id`.
    #[must_use]
    pub fn vector(&self, id: usize) -> Option<&[f32]> {
        if id >= self.len() {
            return None;
        }
        let start = id * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    /// Append vectors; they receive consecutive ids starting at the current length.
    ///
    /// Nothing is appended if any vector has the wrong width.
    ///
    /// # Errors
    ///
    /// Returns `RagError::DimensionMismatch` on a width mismatch and
    /// `RagError::InvalidConfig` for zero-width vectors.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<std::ops::Range<usize>> {
        let first_id = self.len();
        let Some(first) = vectors.first() else {
            return Ok(first_id..first_id);
        };
        if first.is_empty() {
            return Err(RagError::InvalidConfig(
                "cannot index zero-width vectors".into(),
            ));
        }
        let dimension = if self.dimension == 0 {
            first.len()
        } else {
            self.dimension
        };
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        self.dimension = dimension;
        self.data.reserve(vectors.len() * dimension);
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(first_id..first_id + vectors.len())
    }

    /// The `min(k, len)` nearest vectors, ascending by distance, ties by id.
    ///
    /// # Errors
    ///
    /// Returns `RagError::InvalidConfig` for `k == 0` and
    /// `RagError::DimensionMismatch` when the query width differs from the index.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(RagError::InvalidConfig("k must be positive".into()));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(id, row)| Neighbor {
                id,
                distance: squared_l2(query, row),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        hits.truncate(k);
        Ok(hits)
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + std::mem::size_of_val(self.data.as_slice()));
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        // Dimensions come from embedding models and always fit in u32.
        #[allow(clippy::cast_possible_truncation)]
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for &value in &self.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// # Errors
    ///
    /// Returns `RagError::CorruptIndex` if the header or payload length is invalid.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(RagError::CorruptIndex(format!(
                "truncated header: {} bytes",
                bytes.len()
            )));
        }
        let (header, payload) = bytes.split_at(HEADER_LEN);
        if &header[0..4] != MAGIC {
            return Err(RagError::CorruptIndex("bad magic".into()));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != FORMAT_VERSION {
            return Err(RagError::CorruptIndex(format!(
                "unsupported format version {version}"
            )));
        }
        let dimension = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&header[12..20]);
        let count = usize::try_from(u64::from_le_bytes(count_bytes))
            .map_err(|_| RagError::CorruptIndex("vector count overflows usize".into()))?;

        if dimension == 0 && count != 0 {
            return Err(RagError::CorruptIndex(
                "non-empty index with zero dimension".into(),
            ));
        }
        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(std::mem::size_of::<f32>()))
            .ok_or_else(|| RagError::CorruptIndex("payload length overflows usize".into()))?;
        if payload.len() != expected {
            return Err(RagError::CorruptIndex(format!(
                "expected {expected} payload bytes, found {}",
                payload.len()
            )));
        }

        let data = payload
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { dimension, data })
    }

    /// # Errors
    ///
    /// Returns an IO error if the file cannot be written.
    pub fn persist(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or `RagError::CorruptIndex`.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn sample() -> FlatIndex {
        FlatIndex::from_vectors(&[vec![0.0, 0.0], vec![1.0, 0.0], vec![3.0, 4.0]]).unwrap()
    }

    #[test]
    fn add_assigns_consecutive_ids() {
        let mut index = FlatIndex::default();
        assert_eq!(index.add(&[vec![1.0], vec![2.0]]).unwrap(), 0..2);
        assert_eq!(index.add(&[vec![3.0]]).unwrap(), 2..3);
        assert_eq!(index.len(), 3);
        assert_eq!(index.vector(2), Some(&[3.0][..]));
    }

    #[test]
    fn add_rejects_width_mismatch_atomically() {
        let mut index = sample();
        let err = index.add(&[vec![1.0, 1.0], vec![1.0]]).unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn search_orders_by_squared_distance() {
        let hits = sample().search(&[0.9, 0.0], 3).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, [1, 0, 2]);
        assert!((hits[0].distance - 0.01).abs() < 1e-6);
        assert!((hits[2].distance - (2.1f32 * 2.1 + 16.0)).abs() < 1e-4);
    }

    #[test]
    fn search_truncates_to_len() {
        assert_eq!(sample().search(&[0.0, 0.0], 10).unwrap().len(), 3);
    }

    #[test]
    fn search_empty_index_is_empty() {
        assert!(FlatIndex::default().search(&[1.0, 2.0], 5).unwrap().is_empty());
    }

    #[test]
    fn search_zero_k_rejected() {
        assert!(matches!(
            sample().search(&[0.0, 0.0], 0),
            Err(RagError::InvalidConfig(_))
        ));
    }

    #[test]
    fn search_query_width_mismatch() {
        assert!(matches!(
            sample().search(&[0.0], 1),
            Err(RagError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn ties_break_by_id() {
        let index = FlatIndex::from_vectors(&[vec![1.0], vec![-1.0], vec![1.0]]).unwrap();
        let ids: Vec<_> = index.search(&[0.0], 3).unwrap().iter().map(|h| h.id).collect();
        assert_eq!(ids, [0, 1, 2]);
    }

    #[test]
    fn persist_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.bin");
        let index = sample();
        index.persist(&path).unwrap();
        assert_eq!(FlatIndex::load(&path).unwrap(), index);
    }

    #[test]
    fn empty_index_round_trips() {
        let bytes = FlatIndex::default().to_bytes();
        let loaded = FlatIndex::from_bytes(&bytes).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dimension(), 0);
    }

    #[test]
    fn truncated_payload_is_corrupt() {
        let mut bytes = sample().to_bytes();
        bytes.pop();
        assert!(matches!(
            FlatIndex::from_bytes(&bytes),
            Err(RagError::CorruptIndex(_))
        ));
    }

    #[test]
    fn bad_magic_is_corrupt() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            FlatIndex::from_bytes(&bytes),
            Err(RagError::CorruptIndex(_))
        ));
    }

    #[test]
    fn unknown_version_is_corrupt() {
        let mut bytes = sample().to_bytes();
        bytes[4] = 9;
        assert!(matches!(
            FlatIndex::from_bytes(&bytes),
            Err(RagError::CorruptIndex(_))
        ));
    }

    fn vectors(dim: usize) -> impl Strategy<Value = Vec<Vec<f32>>> {
        prop::collection::vec(prop::collection::vec(-1000.0f32..1000.0, dim), 0..40)
    }

    proptest! {
        #[test]
        fn bytes_round_trip_bit_exact(vs in (1usize..8).prop_flat_map(vectors)) {
            let index = FlatIndex::from_vectors(&vs).unwrap();
            let loaded = FlatIndex::from_bytes(&index.to_bytes()).unwrap();
            prop_assert_eq!(loaded.len(), vs.len());
            for (id, v) in vs.iter().enumerate() {
                let stored = loaded.vector(id).unwrap();
                let same = stored.iter().zip(v).all(|(a, b)| a.to_bits() == b.to_bits());
                prop_assert!(same);
            }
        }

        #[test]
        fn search_sorted_and_bounded(
            vs in vectors(4),
            query in prop::collection::vec(-1000.0f32..1000.0, 4),
            k in 1usize..50,
        ) {
            let index = FlatIndex::from_vectors(&vs).unwrap();
            let hits = index.search(&query, k).unwrap();
            prop_assert_eq!(hits.len(), k.min(vs.len()));
            for pair in hits.windows(2) {
                prop_assert!(pair[0].distance <= pair[1].distance);
            }
        }
    }
}
