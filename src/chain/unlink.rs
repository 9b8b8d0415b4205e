use log::debug;

use super::{DirectoryChain, DirectoryNumber};
use crate::{
    directory::Directory,
    error::{TiffError, TiffResult, UsageError},
    stream::BackingStore,
};

impl<S: BackingStore> DirectoryChain<S> {
    /// Remove the `n`-th directory of the main chain, counting from 1.
    ///
    /// The predecessor (or the header, for the first directory) is linked to the successor. The
    /// bytes of the removed directory stay in the store and can still be read with
    /// [`set_sub_directory`](Self::set_sub_directory). All later directories move down by one.
    /// Afterwards there is no active directory and the current directory is unknown.
    pub fn unlink_directory(&mut self, n: u64) -> TiffResult<()> {
        if n == 0 {
            return Err(UsageError::ZeroDirectoryIndex.into());
        }
        let target = n - 1;

        let Some(linked) = self.find_linked(|ordinal, _| ordinal == target)? else {
            let count = self.number_of_directories()?;
            return Err(TiffError::DirectoryNotFound(target, count));
        };

        let successor = self.walker().next_link(linked.offset)?;
        self.patch_link(linked.link_pos, successor.map_or(0, |next| next.0))?;

        self.cache.truncate_from(target);
        self.tail = None;
        self.current = DirectoryNumber::Unknown;
        self.excursion = None;
        self.active = Directory::empty();

        debug!("unlinked directory {} at {}", target, linked.offset.0);
        Ok(())
    }
}
