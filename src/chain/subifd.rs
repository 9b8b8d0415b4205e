use log::debug;

use super::{DirectoryChain, DirectoryNumber};
use crate::{
    directory::Directory,
    encoder::{Ifd, Ifd8},
    error::{TiffFormatError, TiffResult},
    stream::BackingStore,
    tags::{IfdPointer, Tag, TagSet},
};

/// How a group of SubIFDs is linked from its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubIfdLayout {
    /// Every directory is listed in the parent's SubIFD tag and ends its own chain.
    Array,
    /// The directories link to each other and only the first one is listed.
    Chained,
}

impl<S: BackingStore> DirectoryChain<S> {
    /// Write child directories of the active directory and list them in its SubIFD tag.
    ///
    /// The children are written right away, the active directory only records their offsets and
    /// is persisted by the next write. Returns the offsets in the order of `dirs`.
    pub fn write_sub_directories(
        &mut self,
        dirs: &mut [Directory],
        layout: SubIfdLayout,
    ) -> TiffResult<Vec<IfdPointer>> {
        let mut offsets = vec![IfdPointer(0); dirs.len()];

        match layout {
            SubIfdLayout::Array => {
                for (dir, offset) in dirs.iter_mut().zip(offsets.iter_mut()) {
                    *offset = self.write_custom_directory(dir)?;
                }
            }
            SubIfdLayout::Chained => {
                // Back to front, so that each directory knows its successor when written.
                let mut next = 0;
                for (dir, offset) in dirs.iter_mut().zip(offsets.iter_mut()).rev() {
                    let (at, len) = self.append_block(dir, next)?;
                    dir.set_next(Some(IfdPointer(next)));
                    dir.persist_at(at, len);
                    *offset = at;
                    next = at.0;
                }
            }
        }

        let listed = match layout {
            SubIfdLayout::Array => &offsets[..],
            SubIfdLayout::Chained => &offsets[..offsets.len().min(1)],
        };

        if listed.is_empty() {
            self.active.remove(Tag::SubIfd);
        } else if self.kind.is_big() {
            let values: Vec<Ifd8> = listed.iter().map(|offset| Ifd8(offset.0)).collect();
            self.active.set(Tag::SubIfd, &values[..])?;
        } else {
            let values = listed
                .iter()
                .map(|offset| -> TiffResult<Ifd> { Ok(Ifd(u32::try_from(offset.0)?)) })
                .collect::<TiffResult<Vec<_>>>()?;
            self.active.set(Tag::SubIfd, &values[..])?;
        }

        debug!("wrote {} sub directories ({:?})", dirs.len(), layout);
        Ok(offsets)
    }

    /// Make the directory at `offset` the active directory, reading it with `tag_set`.
    ///
    /// This is meant for private directories such as Exif blocks that are not images. Like
    /// [`set_sub_directory`](Self::set_sub_directory) the current directory becomes unknown and
    /// an excursion starts at `offset`. It does not need any directory to have been loaded
    /// before.
    pub fn read_custom_directory(
        &mut self,
        offset: IfdPointer,
        tag_set: &'static TagSet,
    ) -> TiffResult<()> {
        self.current = DirectoryNumber::Unknown;
        self.excursion = None;
        self.active = Directory::empty();
        self.tag_set = tag_set;

        self.enter_excursion(offset)
    }

    /// Follow the Exif pointer of the active directory.
    pub fn read_exif_directory(&mut self) -> TiffResult<()> {
        let offset = self.private_pointer(Tag::ExifDirectory)?;
        self.read_custom_directory(offset, &TagSet::EXIF)
    }

    /// Follow the GPS pointer of the active directory.
    pub fn read_gps_directory(&mut self) -> TiffResult<()> {
        let offset = self.private_pointer(Tag::GpsDirectory)?;
        self.read_custom_directory(offset, &TagSet::GPS)
    }

    fn private_pointer(&self, tag: Tag) -> TiffResult<IfdPointer> {
        match self.active.pointers(tag)?.first() {
            Some(&offset) => Ok(offset),
            None => Err(TiffFormatError::RequiredTagNotFound(tag).into()),
        }
    }
}
