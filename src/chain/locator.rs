use log::debug;

use super::{DirectoryChain, DirectoryNumber, Excursion, OffsetCache};
use crate::{
    directory::Directory,
    error::{TiffError, TiffResult},
    tags::{IfdPointer, TagSet},
};

impl<S: crate::stream::BackingStore> DirectoryChain<S> {
    /// Make the `n`-th directory of the main chain (counting from 0) the active directory.
    ///
    /// Offsets found on the way are cached so that later calls jump directly. When the chain
    /// ends before `n` or the `n`-th directory fails to load, the active directory is discarded
    /// and the current directory becomes [`DirectoryNumber::Unknown`]. A corrupt directory or a
    /// loop before `n` only returns the error, the active directory and position are kept.
    /// Cached offsets of preceding directories stay valid either way.
    pub fn set_directory(&mut self, n: u64) -> TiffResult<()> {
        let offset = match self.walk_cached(n)? {
            Some((ordinal, offset)) if ordinal == n => offset,
            Some((ordinal, _)) => return self.fail(TiffError::DirectoryNotFound(n, ordinal + 1)),
            None => return self.fail(TiffError::DirectoryNotFound(n, 0)),
        };

        self.excursion = None;
        self.tag_set = &TagSet::IMAGE;

        match self.load(offset) {
            Ok(Ok(dir)) => {
                self.active = dir;
                self.current = DirectoryNumber::Known(n);
                Ok(())
            }
            // The directory was there, it stays cached.
            Ok(Err(err)) => self.fail(err),
            Err(err) => {
                self.cache.truncate_from(n);
                self.fail(err)
            }
        }
    }

    /// Make the directory at `offset` the active directory, outside of the main chain.
    ///
    /// The current directory becomes [`DirectoryNumber::Unknown`] before anything is read. The
    /// directory starts an excursion whose directories are numbered from 0, see
    /// [`sub_directory_ordinal`](Self::sub_directory_ordinal). Offset 0 only discards the active
    /// directory.
    ///
    /// A failure does not restore the previously active directory, call
    /// [`set_directory`](Self::set_directory) to return to a known position.
    pub fn set_sub_directory(&mut self, offset: IfdPointer) -> TiffResult<()> {
        self.current = DirectoryNumber::Unknown;
        self.excursion = None;
        self.active = Directory::empty();
        self.tag_set = &TagSet::IMAGE;

        if offset.0 == 0 {
            return Ok(());
        }

        self.enter_excursion(offset)
    }

    /// Load `offset` with the active tag set as local directory 0 of a new excursion.
    pub(crate) fn enter_excursion(&mut self, offset: IfdPointer) -> TiffResult<()> {
        let max = self.limits.max_directories;
        match self.load(offset) {
            Ok(Ok(dir)) => {
                self.sub_caches
                    .entry(offset)
                    .or_insert_with(|| OffsetCache::new(max))
                    .record(0, offset)?;
                self.active = dir;
                self.excursion = Some(Excursion {
                    root: offset,
                    local: 0,
                });
                Ok(())
            }
            Ok(Err(err)) => {
                self.sub_caches
                    .entry(offset)
                    .or_insert_with(|| OffsetCache::new(max))
                    .record(0, offset)?;
                self.fail(err)
            }
            Err(err) => self.fail(err),
        }
    }

    /// Advance to the directory the active directory links to.
    ///
    /// Returns `false` when the chain ends here, in which case nothing changes. On the main chain
    /// the current directory number advances by one, during an excursion the local ordinal does.
    /// A link back to a directory already seen is reported as a cycle and leaves the state as it
    /// was.
    pub fn read_next(&mut self) -> TiffResult<bool> {
        let Some(position) = self.position()? else {
            debug!("no active directory to advance from");
            return Ok(false);
        };

        let next = match self.walker().next_link(position) {
            Ok(Some(next)) => next,
            Ok(None) => return Ok(false),
            Err(err) => return self.fail(err),
        };

        match (self.excursion, self.current) {
            (Some(excursion), _) => {
                let local = excursion.local + 1;
                let max = self.limits.max_directories;
                self.sub_caches
                    .entry(excursion.root)
                    .or_insert_with(|| OffsetCache::new(max))
                    .record(local, next)?;

                match self.load(next) {
                    Ok(Ok(dir)) => {
                        self.active = dir;
                        self.excursion = Some(Excursion { local, ..excursion });
                        Ok(true)
                    }
                    Ok(Err(err)) => self.fail(err),
                    Err(err) => {
                        if let Some(cache) = self.sub_caches.get_mut(&excursion.root) {
                            cache.truncate_from(local);
                        }
                        self.fail(err)
                    }
                }
            }
            (None, DirectoryNumber::Known(n)) => {
                // The cache must reach `n` to notice links back into the chain.
                if self.cache.len() <= n {
                    if let Err(err) = self.walk_cached(n) {
                        return self.fail(err);
                    }
                }
                self.cache.record(n + 1, next)?;

                match self.load(next) {
                    Ok(Ok(dir)) => {
                        self.active = dir;
                        self.current = DirectoryNumber::Known(n + 1);
                        Ok(true)
                    }
                    Ok(Err(err)) => self.fail(err),
                    Err(err) => {
                        self.cache.truncate_from(n + 1);
                        self.fail(err)
                    }
                }
            }
            (None, DirectoryNumber::Unknown) => match self.load(next) {
                Ok(Ok(dir)) => {
                    self.active = dir;
                    Ok(true)
                }
                Ok(Err(err)) | Err(err) => self.fail(err),
            },
        }
    }

    /// Whether the active directory links to another directory.
    pub fn more_directories(&mut self) -> TiffResult<bool> {
        match self.position()? {
            Some(position) => Ok(self.walker().next_link(position)?.is_some()),
            None => Ok(false),
        }
    }

    /// Count the directories of the main chain.
    ///
    /// This walks the chain to its end once, later counts only follow the links that were added
    /// since. The active directory is not affected.
    pub fn number_of_directories(&mut self) -> TiffResult<u64> {
        Ok(self
            .walk_cached(u64::MAX)?
            .map_or(0, |(ordinal, _)| ordinal + 1))
    }

    /// The on-disk position to follow links from.
    ///
    /// This is the active directory when it is persisted, otherwise the directory the current
    /// number refers to (the one just written, for example).
    fn position(&mut self) -> TiffResult<Option<IfdPointer>> {
        if let Some(offset) = self.active.offset() {
            return Ok(Some(offset));
        }

        match self.current {
            DirectoryNumber::Known(n) => match self.walk_cached(n) {
                Ok(Some((ordinal, offset))) if ordinal == n => Ok(Some(offset)),
                Ok(_) => self.fail(TiffError::DirectoryNotFound(n, self.cache.len())),
                Err(err) => self.fail(err),
            },
            DirectoryNumber::Unknown => Ok(None),
        }
    }
}
