/// Byte range of one chunk-loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// Zero-based position in the chunk sequence.
    pub index: u64,
    /// First byte of the chunk (inclusive).
    pub chunk_start: u64,
    /// End of the chunk (exclusive).
    pub chunk_end: u64,
    /// Configured maximum bytes per chunk.
    pub chunk_size: u64,
}

impl ChunkDescriptor {
    /// Number of bytes covered by this chunk.
    pub fn len(&self) -> u64 {
        self.chunk_end - self.chunk_start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this chunk reaches the end of a file of `file_size` bytes.
    pub fn is_last(&self, file_size: u64) -> bool {
        self.chunk_end >= file_size
    }
}

/// Chunk size in bytes. Zero or negative values disable chunking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChunkSize(i64);

impl ChunkSize {
    /// Whole-file mode.
    pub const DISABLED: ChunkSize = ChunkSize(0);

    pub fn from_bytes(bytes: i64) -> Self {
        Self(bytes)
    }

    /// Converts a size given in KiB, the unit many upload endpoints document.
    pub fn from_kib(kib: i64) -> Self {
        Self(kib.saturating_mul(1024))
    }

    /// Returns the size in bytes when chunking is enabled.
    pub fn get(self) -> Option<u64> {
        (self.0 > 0).then_some(self.0 as u64)
    }

    pub fn is_chunked(self) -> bool {
        self.0 > 0
    }
}

impl From<i64> for ChunkSize {
    fn from(bytes: i64) -> Self {
        Self(bytes)
    }
}

/// Number of requests needed for a file of `file_size` bytes.
///
/// `ceil(file_size / chunk_size)` when chunking is enabled, else `1`.
pub fn chunk_total(file_size: u64, chunk_size: ChunkSize) -> u64 {
    match chunk_size.get() {
        Some(size) => file_size.div_ceil(size),
        None => 1,
    }
}

/// Plans the byte ranges for a file.
///
/// Chunk `i` covers `[i * S, min(N, (i + 1) * S))`. The ranges cover
/// `[0, N)` without gaps or overlaps. With chunking disabled the single
/// range is the whole file.
pub fn plan_chunks(file_size: u64, chunk_size: ChunkSize) -> ChunkPlan {
    let size = chunk_size.get().unwrap_or(file_size);
    ChunkPlan {
        file_size,
        chunk_size: size,
        total: chunk_total(file_size, chunk_size),
        next: 0,
    }
}

/// Iterator over the chunks of one file.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    file_size: u64,
    chunk_size: u64,
    total: u64,
    next: u64,
}

impl ChunkPlan {
    /// Total number of chunks in the plan.
    pub fn total(&self) -> u64 {
        self.total
    }
}

impl Iterator for ChunkPlan {
    type Item = ChunkDescriptor;

    fn next(&mut self) -> Option<ChunkDescriptor> {
        if self.next >= self.total {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let chunk_start = index * self.chunk_size;
        let chunk_end = self.file_size.min(chunk_start + self.chunk_size);
        Some(ChunkDescriptor {
            index,
            chunk_start,
            chunk_end,
            chunk_size: self.chunk_size,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkPlan {}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(size: u64, chunk: i64) -> Vec<(u64, u64)> {
        plan_chunks(size, ChunkSize::from_bytes(chunk))
            .map(|c| (c.chunk_start, c.chunk_end))
            .collect()
    }

    #[test]
    fn disabled_chunking_is_one_request() {
        assert_eq!(chunk_total(250, ChunkSize::DISABLED), 1);
        assert_eq!(chunk_total(250, ChunkSize::from_bytes(-5)), 1);
        assert_eq!(ranges(250, 0), vec![(0, 250)]);
    }

    #[test]
    fn scenario_250_bytes_by_100() {
        let plan: Vec<_> = plan_chunks(250, ChunkSize::from_bytes(100)).collect();
        assert_eq!(plan.len(), 3);
        assert_eq!(
            plan.iter().map(|c| (c.chunk_start, c.chunk_end)).collect::<Vec<_>>(),
            vec![(0, 100), (100, 200), (200, 250)]
        );
        assert!(!plan[0].is_last(250));
        assert!(!plan[1].is_last(250));
        assert!(plan[2].is_last(250));
        assert_eq!(plan[2].len(), 50);
        assert!(plan.iter().all(|c| c.chunk_size == 100));
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_chunk() {
        assert_eq!(ranges(300, 100), vec![(0, 100), (100, 200), (200, 300)]);
    }

    #[test]
    fn chunk_larger_than_file() {
        assert_eq!(ranges(42, 1024), vec![(0, 42)]);
    }

    #[test]
    fn ranges_cover_file_without_gaps() {
        for size in [1u64, 7, 99, 100, 101, 1000, 4097] {
            for chunk in [1i64, 3, 64, 100, 4096] {
                let plan = ranges(size, chunk);
                assert_eq!(plan.len() as u64, size.div_ceil(chunk as u64));
                assert_eq!(plan.first().unwrap().0, 0);
                assert_eq!(plan.last().unwrap().1, size);
                for pair in plan.windows(2) {
                    assert_eq!(pair[0].1, pair[1].0);
                }
            }
        }
    }

    #[test]
    fn empty_file_in_chunked_mode_has_no_chunks() {
        assert_eq!(chunk_total(0, ChunkSize::from_bytes(100)), 0);
        assert!(ranges(0, 100).is_empty());
    }

    #[test]
    fn from_kib_converts_to_bytes() {
        assert_eq!(ChunkSize::from_kib(100).get(), Some(102_400));
        assert_eq!(ChunkSize::from_kib(0).get(), None);
    }

    #[test]
    fn plan_reports_exact_size() {
        let plan = plan_chunks(250, ChunkSize::from_bytes(100));
        assert_eq!(plan.total(), 3);
        assert_eq!(plan.len(), 3);
    }
}
