use std::mem;

use log::debug;

use super::{DirectoryChain, DirectoryNumber};
use crate::{
    directory::Directory,
    error::{TiffError, TiffResult, UsageError},
    stream::BackingStore,
    tags::IfdPointer,
};

impl<S: BackingStore> DirectoryChain<S> {
    /// Persist the active directory and start a fresh one.
    ///
    /// A directory that was never written is appended behind the last directory of the main
    /// chain and becomes the current directory. A persisted directory is written back in place
    /// when it still fits, otherwise it is relocated like with
    /// [`rewrite_directory`](Self::rewrite_directory), the current directory number stays.
    pub fn write_directory(&mut self) -> TiffResult<()> {
        let mut dir = mem::take(&mut self.active);
        let result = if dir.is_persisted() {
            self.store_in_place(&mut dir)
        } else {
            self.append(&mut dir).map(|ordinal| {
                self.current = DirectoryNumber::Known(ordinal);
            })
        };

        match result {
            Ok(()) => {
                self.excursion = None;
                Ok(())
            }
            Err(err) => {
                self.active = dir;
                Err(err)
            }
        }
    }

    /// Persist the active directory and keep editing it.
    ///
    /// The first checkpoint of a new directory appends it like
    /// [`write_directory`](Self::write_directory) does. Later checkpoints write to the same
    /// offset as long as the directory fits there, so repeating a checkpoint without changes
    /// writes identical bytes.
    pub fn checkpoint_directory(&mut self) -> TiffResult<()> {
        let mut dir = mem::take(&mut self.active);
        let result = if dir.is_persisted() {
            self.store_in_place(&mut dir)
        } else {
            self.append(&mut dir).map(|ordinal| {
                self.current = DirectoryNumber::Known(ordinal);
                self.excursion = None;
            })
        };

        self.active = dir;
        result
    }

    /// Move the active directory to the end of the store and start a fresh one.
    ///
    /// The link that pointed to the old location, either of the preceding directory or of the
    /// header, is patched to the new location. The current directory number stays. Once a
    /// directory was relocated, appends no longer trust the remembered tail and find the end of
    /// the chain by following links.
    pub fn rewrite_directory(&mut self) -> TiffResult<()> {
        if !self.active.is_persisted() {
            return self.write_directory();
        }

        let mut dir = mem::take(&mut self.active);
        match self.relocate(&mut dir) {
            Ok(()) => {
                self.excursion = None;
                Ok(())
            }
            Err(err) => {
                self.active = dir;
                Err(err)
            }
        }
    }

    /// Write a directory that is not linked into any chain and return its offset.
    ///
    /// Neither the main chain nor the active directory are touched. The offset must be stored in
    /// a tag of another directory to make the directory reachable.
    pub fn write_custom_directory(&mut self, dir: &mut Directory) -> TiffResult<IfdPointer> {
        let (offset, len) = self.append_block(dir, 0)?;
        dir.set_next(None);
        dir.persist_at(offset, len);
        debug!("wrote custom directory at {}", offset.0);
        Ok(offset)
    }

    /// Write `dir` at the word aligned end of the store, linking to `next`.
    ///
    /// Returns the offset of the directory and the length of its block.
    pub(crate) fn append_block(
        &mut self,
        dir: &Directory,
        next: u64,
    ) -> TiffResult<(IfdPointer, u64)> {
        ensure_complete(dir)?;
        if dir.len() as u64 > self.limits.max_entries {
            return Err(TiffError::LimitsExceeded);
        }

        let end = self.store.len()?;
        let base = self.kind.align(end);
        let block = self.encoder().encode(dir, base, next)?;

        let mut bytes = vec![0; usize::try_from(base - end)?];
        bytes.extend_from_slice(&block.bytes);
        self.store.write_at(end, &bytes)?;

        Ok((IfdPointer(base), block.bytes.len() as u64))
    }

    /// Last directory of the main chain, from the session's tail hint when it can be trusted.
    fn tail(&mut self) -> TiffResult<Option<(u64, IfdPointer)>> {
        match self.tail {
            Some(tail) if self.fast_append => Ok(Some(tail)),
            _ => self.walk_cached(u64::MAX),
        }
    }

    /// Append an unpersisted directory to the main chain, returning its ordinal.
    fn append(&mut self, dir: &mut Directory) -> TiffResult<u64> {
        let tail = self.tail()?;
        let link_pos = match tail {
            Some((_, offset)) => self.walker().link_position(offset)?,
            None => self.kind.root_pos(),
        };

        // The block is complete before the link makes it reachable.
        let (offset, len) = self.append_block(dir, 0)?;
        self.patch_link(link_pos, offset.0)?;

        let ordinal = tail.map_or(0, |(ordinal, _)| ordinal + 1);
        self.cache.record(ordinal, offset)?;
        self.tail = Some((ordinal, offset));

        dir.set_next(None);
        dir.persist_at(offset, len);
        debug!("appended directory {} at {}", ordinal, offset.0);
        Ok(ordinal)
    }

    /// Write a persisted directory back to its offset, relocating it when it outgrew its slot.
    fn store_in_place(&mut self, dir: &mut Directory) -> TiffResult<()> {
        let Some(offset) = dir.offset() else {
            return Err(TiffError::UsageError(UsageError::EmptyDirectory));
        };
        ensure_complete(dir)?;

        // The link on disk wins over the one read earlier, the chain may have grown since.
        let next = self.walker().next_link(offset)?;
        let block = self
            .encoder()
            .encode(dir, offset.0, next.map_or(0, |next| next.0))?;

        if block.bytes.len() as u64 > dir.slot_len || dir.len() as u64 > self.limits.max_entries
        {
            return self.relocate(dir);
        }

        self.store.write_at(offset.0, &block.bytes)?;
        dir.set_next(next);
        debug!("wrote directory in place at {}", offset.0);
        Ok(())
    }

    /// Move a persisted main chain directory to the end of the store.
    fn relocate(&mut self, dir: &mut Directory) -> TiffResult<()> {
        let Some(old) = dir.offset() else {
            return Err(TiffError::UsageError(UsageError::EmptyDirectory));
        };

        // Found anew from the root, an earlier relocation may have moved the predecessor.
        let linked = self
            .find_linked(|_, offset| offset == old)?
            .ok_or(UsageError::NotInMainChain(old))?;
        let next = self.walker().next_link(old)?;

        let (offset, len) = self.append_block(dir, next.map_or(0, |next| next.0))?;
        self.patch_link(linked.link_pos, offset.0)?;

        self.cache.truncate_from(linked.ordinal);
        self.cache.record(linked.ordinal, offset)?;
        self.fast_append = false;
        self.tail = None;

        dir.set_next(next);
        dir.persist_at(offset, len);
        debug!(
            "relocated directory {} from {} to {}",
            linked.ordinal, old.0, offset.0
        );
        Ok(())
    }
}

/// Refuse to encode a directory that was read without some of its entries.
fn ensure_complete(dir: &Directory) -> TiffResult<()> {
    if dir.is_complete() {
        return Ok(());
    }
    let at = dir.offset().unwrap_or(IfdPointer(0));
    Err(UsageError::UnknownEntries(at).into())
}
