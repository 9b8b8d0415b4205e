use std::collections::HashMap;

use crate::{
    error::{TiffError, TiffFormatError, TiffResult},
    tags::IfdPointer,
};

/// Ordinal to offset mapping of the directories visited in one chain.
///
/// The cache always describes a gap free prefix of the chain: ordinals `0..len` are known. The
/// reverse map doubles as the visited set of every walk that extends the cache, an offset can not
/// be recorded at two different ordinals.
#[derive(Debug, Default)]
pub(crate) struct OffsetCache {
    by_ordinal: Vec<IfdPointer>,
    by_offset: HashMap<IfdPointer, u64>,
    max_len: Option<u64>,
}

impl OffsetCache {
    pub(crate) fn new(max_len: u64) -> Self {
        OffsetCache {
            by_ordinal: Vec::new(),
            by_offset: HashMap::new(),
            max_len: Some(max_len),
        }
    }

    pub(crate) fn lookup(&self, ordinal: u64) -> Option<IfdPointer> {
        let idx = usize::try_from(ordinal).ok()?;
        self.by_ordinal.get(idx).copied()
    }

    /// Furthest known position.
    pub(crate) fn last(&self) -> Option<(u64, IfdPointer)> {
        let offset = *self.by_ordinal.last()?;
        Some((self.len() - 1, offset))
    }

    pub(crate) fn len(&self) -> u64 {
        self.by_ordinal.len() as u64
    }

    /// Remember that directory `ordinal` lives at `offset`.
    ///
    /// Recording a known pair again is a no-op. An offset that already sits at a lower ordinal
    /// means the chain loops back on itself. A different offset for a known ordinal replaces it
    /// and everything after it. Ordinals beyond the end of the cache would leave a gap and are
    /// not recorded.
    pub(crate) fn record(&mut self, ordinal: u64, offset: IfdPointer) -> TiffResult<()> {
        match self.by_offset.get(&offset) {
            Some(&known) if known == ordinal => return Ok(()),
            Some(&known) if known < ordinal => {
                return Err(TiffError::FormatError(TiffFormatError::CycleInOffsets))
            }
            _ => {}
        }

        if ordinal > self.len() {
            return Ok(());
        }

        self.truncate_from(ordinal);

        if self.max_len.is_some_and(|max| self.len() >= max) {
            return Err(TiffError::LimitsExceeded);
        }

        self.by_ordinal.push(offset);
        self.by_offset.insert(offset, ordinal);
        Ok(())
    }

    /// Forget all ordinals starting at `ordinal`.
    pub(crate) fn truncate_from(&mut self, ordinal: u64) {
        let keep = usize::try_from(ordinal).unwrap_or(usize::MAX);
        if keep >= self.by_ordinal.len() {
            return;
        }

        for offset in self.by_ordinal.drain(keep..) {
            self.by_offset.remove(&offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(offsets: &[u64]) -> OffsetCache {
        let mut cache = OffsetCache::new(16);
        for (i, &offset) in offsets.iter().enumerate() {
            cache.record(i as u64, IfdPointer(offset)).unwrap();
        }
        cache
    }

    #[test]
    fn record_is_idempotent() {
        let mut cache = filled(&[8, 100, 200]);
        cache.record(1, IfdPointer(100)).unwrap();
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.lookup(2), Some(IfdPointer(200)));
        assert_eq!(cache.last(), Some((2, IfdPointer(200))));
    }

    #[test]
    fn revisits_are_cycles() {
        let mut cache = filled(&[8, 100, 200]);
        let err = cache.record(3, IfdPointer(100)).unwrap_err();
        assert!(err.is_cycle());
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn replacing_an_ordinal_drops_the_tail() {
        let mut cache = filled(&[8, 100, 200, 300]);
        cache.record(1, IfdPointer(400)).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup(1), Some(IfdPointer(400)));
        // The dropped offsets are forgotten, not cycles.
        cache.record(2, IfdPointer(200)).unwrap();
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn gaps_are_not_recorded() {
        let mut cache = filled(&[8]);
        cache.record(5, IfdPointer(500)).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(5), None);
    }

    #[test]
    fn truncate_forgets_offsets() {
        let mut cache = filled(&[8, 100, 200]);
        cache.truncate_from(1);
        assert_eq!(cache.last(), Some((0, IfdPointer(8))));
        // The dropped offset can be recorded again later in the chain.
        cache.record(1, IfdPointer(200)).unwrap();
        assert_eq!(cache.last(), Some((1, IfdPointer(200))));
        cache.truncate_from(0);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.last(), None);
    }

    #[test]
    fn bounded_length() {
        let mut cache = OffsetCache::new(2);
        cache.record(0, IfdPointer(8)).unwrap();
        cache.record(1, IfdPointer(16)).unwrap();
        assert!(matches!(
            cache.record(2, IfdPointer(24)),
            Err(TiffError::LimitsExceeded)
        ));
    }
}
