//! Frame cache for one block
//!
//! Structure: ordered sequences (metadata only) + `HashMap<PathBuf, FrameImage>`
//! - Load order: flattened frame references of all sequences, block order,
//!   each distinct reference once (`IndexSet`)
//! - Cursor: next position in the load order
//!
//! Images are loaded incrementally with [`BlockData::cache_batch`] while the
//! block is preloading, and on demand by [`BlockData::get_frame_image`] when
//! playback outruns the preload. Nothing is evicted while the block lives.

use indexmap::IndexSet;
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::entities::{BlockInfo, FrameImage, FrameInfo, ImageLoader, Sequence, SequenceSource};
use crate::error::{LoadError, PlaybackError};

/// Collaborators that turn a block descriptor into frames and pixels
#[derive(Clone)]
pub struct Sources {
    pub sequences: Arc<dyn SequenceSource>,
    pub images: Arc<dyn ImageLoader>,
}

impl Sources {
    pub fn new(sequences: Arc<dyn SequenceSource>, images: Arc<dyn ImageLoader>) -> Self {
        Self { sequences, images }
    }
}

/// Cache statistics for monitoring on-demand loads during playback
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    hits: u64,
    misses: u64,
}

impl CacheStats {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

/// A sequence of the block together with the rate it plays at
#[derive(Debug, Clone)]
pub struct BlockSequence {
    pub sequence: Sequence,
    pub fps: u32,
}

pub struct BlockData {
    sequences: Vec<BlockSequence>,
    load_order: IndexSet<PathBuf>,
    cursor: usize,
    cache: HashMap<PathBuf, FrameImage>,
    loader: Arc<dyn ImageLoader>,
    stats: CacheStats,
    /// Bytes held by cached images
    memory: usize,
}

impl BlockData {
    /// Resolve every sequence of the block; no images are loaded
    pub fn new(block: &BlockInfo, sources: &Sources) -> Result<Self, PlaybackError> {
        if block.is_empty() {
            return Err(PlaybackError::EmptyBlock);
        }

        let mut sequences = Vec::with_capacity(block.len());
        let mut load_order = IndexSet::new();
        for entry in block.iter() {
            let sequence = sources.sequences.load_sequence(&entry.sequence)?;
            if sequence.is_empty() {
                return Err(PlaybackError::EmptySequence(entry.sequence.clone()));
            }
            load_order.extend(sequence.frames().iter().map(|f| f.file.clone()));
            sequences.push(BlockSequence {
                sequence,
                fps: entry.fps,
            });
        }

        info!(
            "Block data: {} sequences, {} distinct images",
            sequences.len(),
            load_order.len()
        );

        Ok(Self {
            sequences,
            load_order,
            cursor: 0,
            cache: HashMap::new(),
            loader: Arc::clone(&sources.images),
            stats: CacheStats::default(),
            memory: 0,
        })
    }

    /// Load up to `n` not yet cached images in load order
    ///
    /// References already cached by an on-demand load are skipped and do not
    /// count towards `n`. On error the cursor stays at the failing reference.
    pub fn cache_batch(&mut self, n: usize) -> Result<usize, LoadError> {
        let mut loaded = 0;
        while loaded < n && self.cursor < self.load_order.len() {
            let path = &self.load_order[self.cursor];
            if !self.cache.contains_key(path) {
                let image = self.loader.load_image(path)?;
                self.memory += image.mem();
                self.cache.insert(path.clone(), image);
                loaded += 1;
            }
            self.cursor += 1;
        }

        if loaded > 0 {
            debug!(
                "Cached {} images ({}/{})",
                loaded,
                self.cache.len(),
                self.load_order.len()
            );
        }
        Ok(loaded)
    }

    /// Fraction of distinct images cached, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.cache.len() as f64 / self.load_order.len() as f64
    }

    pub fn is_complete(&self) -> bool {
        self.cache.len() == self.load_order.len()
    }

    /// Frame metadata; panics when `seq`/`idx` is out of range
    pub fn get_frame_info(&self, seq: usize, idx: usize) -> &FrameInfo {
        &self.sequences[seq].sequence.frames()[idx]
    }

    /// Cached image, or a synchronous load on miss
    pub fn get_frame_image(&mut self, seq: usize, idx: usize) -> Result<FrameImage, LoadError> {
        let path = &self.sequences[seq].sequence.frames()[idx].file;
        if let Some(image) = self.cache.get(path) {
            self.stats.record_hit();
            return Ok(image.clone());
        }

        self.stats.record_miss();
        debug!("Cache miss, loading {}", path.display());
        let image = self.loader.load_image(path)?;
        self.memory += image.mem();
        self.cache.insert(path.clone(), image.clone());
        Ok(image)
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    pub fn sequence(&self, seq: usize) -> &BlockSequence {
        &self.sequences[seq]
    }

    /// Distinct image count
    pub fn len(&self) -> usize {
        self.load_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.load_order.is_empty()
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn mem(&self) -> usize {
        self.memory
    }
}

impl fmt::Debug for BlockData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockData")
            .field("sequences", &self.sequences.len())
            .field("images", &self.load_order.len())
            .field("cached", &self.cache.len())
            .field("cursor", &self.cursor)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Drop for BlockData {
    fn drop(&mut self) {
        debug!(
            "Block data dropped: {} images, {} MB, hits={} misses={} ({:.1}%)",
            self.cache.len(),
            self.memory / 1024 / 1024,
            self.stats.hits(),
            self.stats.misses(),
            self.stats.hit_rate() * 100.0
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{CountingLoader, frames, sources};
    use crate::entities::MemorySource;

    fn block_sources(loader: &Arc<CountingLoader>) -> Sources {
        let seqs = MemorySource::new()
            .with("a", frames(&["a0.png", "a1.png", "shared.png"]))
            .with("b", frames(&["shared.png", "b0.png"]))
            .with("empty", vec![]);
        sources(seqs, loader)
    }

    #[test]
    fn test_new_loads_no_images() {
        let loader = CountingLoader::new();
        let data = BlockData::new(&BlockInfo::from_pairs([("a", 10), ("b", 5)]), &block_sources(&loader)).unwrap();

        assert_eq!(data.sequence_count(), 2);
        assert_eq!(data.sequence(1).fps, 5);
        assert_eq!(data.len(), 4);
        assert_eq!(data.progress(), 0.0);
        assert!(loader.loaded().is_empty());
    }

    #[test]
    fn test_empty_block_and_sequence_are_errors() {
        let loader = CountingLoader::new();
        let src = block_sources(&loader);
        assert!(matches!(
            BlockData::new(&BlockInfo::default(), &src),
            Err(PlaybackError::EmptyBlock)
        ));
        assert!(matches!(
            BlockData::new(&BlockInfo::from_pairs([("a", 10), ("empty", 10)]), &src),
            Err(PlaybackError::EmptySequence(name)) if name == "empty"
        ));
        assert!(matches!(
            BlockData::new(&BlockInfo::from_pairs([("nope", 10)]), &src),
            Err(PlaybackError::SeqFile(_))
        ));
    }

    #[test]
    fn test_cache_batch_loads_each_reference_once() {
        for batch in 1..=6 {
            let loader = CountingLoader::new();
            let mut data =
                BlockData::new(&BlockInfo::from_pairs([("a", 10), ("b", 5)]), &block_sources(&loader)).unwrap();

            let mut last = 0.0;
            while !data.is_complete() {
                let n = data.cache_batch(batch).unwrap();
                assert!(n >= 1 && n <= batch);
                assert!(data.progress() >= last);
                last = data.progress();
            }
            assert_eq!(data.cache_batch(batch).unwrap(), 0);
            assert_eq!(data.progress(), 1.0);
            assert!(data.cursor() <= data.len());

            let mut loaded = loader.loaded();
            assert_eq!(loaded.len(), 4, "batch size {}", batch);
            loaded.sort();
            loaded.dedup();
            assert_eq!(loaded.len(), 4);
        }
    }

    #[test]
    fn test_on_demand_load_is_not_repeated_by_batch() {
        let loader = CountingLoader::new();
        let mut data = BlockData::new(&BlockInfo::from_pairs([("a", 10)]), &block_sources(&loader)).unwrap();

        data.get_frame_image(0, 1).unwrap();
        data.get_frame_image(0, 1).unwrap();
        assert_eq!(data.stats().misses(), 1);
        assert_eq!(data.stats().hits(), 1);

        // a0 + shared: a1 is skipped without counting
        assert_eq!(data.cache_batch(2).unwrap(), 2);
        assert!(data.is_complete());
        assert_eq!(loader.loaded().len(), 3);
    }

    #[test]
    fn test_load_error_keeps_cursor() {
        let loader = CountingLoader::failing(&["a1.png"]);
        let mut data = BlockData::new(&BlockInfo::from_pairs([("a", 10)]), &block_sources(&loader)).unwrap();

        let err = data.cache_batch(5).unwrap_err();
        assert_eq!(err.path(), &PathBuf::from("a1.png"));
        assert_eq!(data.cursor(), 1);
        assert_eq!(data.cached_count(), 1);
    }

    #[test]
    fn test_frame_info() {
        let loader = CountingLoader::new();
        let data = BlockData::new(&BlockInfo::from_pairs([("a", 10), ("b", 5)]), &block_sources(&loader)).unwrap();
        assert_eq!(data.get_frame_info(1, 1).file, PathBuf::from("b0.png"));
    }

    #[test]
    #[should_panic]
    fn test_frame_info_out_of_range_panics() {
        let loader = CountingLoader::new();
        let data = BlockData::new(&BlockInfo::from_pairs([("b", 5)]), &block_sources(&loader)).unwrap();
        data.get_frame_info(0, 2);
    }
}
