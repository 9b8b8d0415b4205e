use core::fmt;
use std::{collections::BTreeMap, num::NonZeroU64};

use crate::{
    encoder::TiffValue,
    error::{TiffError, TiffFormatError, TiffResult},
    ifd::Entry,
    tags::{IfdPointer, Tag},
};

/// An Image File Directory (IFD).
///
/// A directory is a map of [`Tag`]s to [`Entry`] values together with the link to the next
/// directory of its chain. Directories read from a file remember where they were found and how
/// many bytes they occupied there, which decides whether a later write can happen in place.
///
/// A directory can be obtained from a [`DirectoryChain`](crate::DirectoryChain) or created as an
/// empty directory to be extended with entries.
#[doc(alias = "IFD")]
#[derive(Clone, PartialEq)]
pub struct Directory {
    /// There are at most `u16::MAX` entries in any single directory, the count is stored as a
    /// 2-byte value. The order in the file is implied to be ascending by tag value (the reader
    /// does not mind unordered entries).
    pub(crate) entries: BTreeMap<u16, Entry>,
    pub(crate) next_ifd: Option<NonZeroU64>,
    /// Where the directory was last read from or written to.
    pub(crate) offset: Option<IfdPointer>,
    /// Bytes available at `offset` for the directory block with all of its out-of-line values.
    pub(crate) slot_len: u64,
    /// Entries of the stored directory were left out when reading it.
    pub(crate) skipped_entries: bool,
}

impl Directory {
    /// Create a directory in an initial state without entries. Note that an empty directory can
    /// not be encoded in a file, it must contain at least one entry.
    pub fn empty() -> Self {
        Directory {
            entries: BTreeMap::new(),
            next_ifd: None,
            offset: None,
            slot_len: 0,
            skipped_entries: false,
        }
    }

    /// Retrieve the value associated with a tag.
    pub fn get(&self, tag: Tag) -> Option<&Entry> {
        self.entries.get(&tag.to_u16())
    }

    /// Check if the directory contains a specified tag.
    pub fn contains(&self, tag: Tag) -> bool {
        self.entries.contains_key(&tag.to_u16())
    }

    /// Iterate over all known and unknown tags in this directory.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &Entry)> + '_ {
        self.entries
            .iter()
            .map(|(k, v)| (Tag::from_u16_exhaustive(*k), v))
    }

    /// Set a tag to an encodable value, replacing any previous entry.
    pub fn set<V: TiffValue + ?Sized>(&mut self, tag: Tag, value: &V) -> TiffResult<()> {
        let entry = Entry::new(value);
        // Strings that are not plain ASCII produce no data.
        if entry.data().len() != value.bytes() {
            return Err(TiffError::FormatError(TiffFormatError::InvalidTagValueType(
                tag,
            )));
        }

        self.entries.insert(tag.to_u16(), entry);
        Ok(())
    }

    /// Insert a prepared entry, returning the one it replaces.
    pub fn insert(&mut self, tag: Tag, entry: Entry) -> Option<Entry> {
        self.entries.insert(tag.to_u16(), entry)
    }

    pub fn remove(&mut self, tag: Tag) -> Option<Entry> {
        self.entries.remove(&tag.to_u16())
    }

    /// Insert additional entries into the directory.
    ///
    /// Providing a tag multiple times or a tag that already exists within this directory
    /// overwrites the entry.
    pub fn extend(&mut self, iter: impl IntoIterator<Item = (Tag, Entry)>) {
        self.extend_inner(iter.into_iter().by_ref())
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are any entries in this directory. Note that an empty directory can not be
    /// encoded in the file, it must contain at least one entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the pointer to the next IFD, if it was defined.
    pub fn next(&self) -> Option<IfdPointer> {
        self.next_ifd.map(|n| IfdPointer(n.get()))
    }

    pub fn set_next(&mut self, next: Option<IfdPointer>) {
        self.next_ifd = next.and_then(|n| NonZeroU64::new(n.0));
    }

    /// The offset this directory was read from or last written to.
    pub fn offset(&self) -> Option<IfdPointer> {
        self.offset
    }

    /// Whether the directory exists in the file, i.e. it has been read or written before.
    pub fn is_persisted(&self) -> bool {
        self.offset.is_some()
    }

    /// Whether all entries of the stored directory could be read. Entries of an unknown field
    /// type are skipped, such a directory can not be written back.
    pub fn is_complete(&self) -> bool {
        !self.skipped_entries
    }

    /// Offsets of the child directories listed in the SubIFD tag.
    pub fn sub_ifds(&self) -> TiffResult<Vec<IfdPointer>> {
        self.pointers(Tag::SubIfd)
    }

    /// Read a tag holding one or more directory offsets. A missing tag yields no offsets.
    pub fn pointers(&self, tag: Tag) -> TiffResult<Vec<IfdPointer>> {
        let Some(entry) = self.get(tag) else {
            return Ok(Vec::new());
        };

        Ok(entry
            .value()?
            .into_u64_vec()?
            .into_iter()
            .map(IfdPointer)
            .collect())
    }

    pub(crate) fn persist_at(&mut self, offset: IfdPointer, slot_len: u64) {
        self.offset = Some(offset);
        self.slot_len = slot_len;
    }

    fn extend_inner(&mut self, iter: &mut dyn Iterator<Item = (Tag, Entry)>) {
        for (tag, entry) in iter {
            // If the tag is already present, it will be overwritten.
            self.entries.insert(tag.to_u16(), entry);
        }
    }
}

impl Default for Directory {
    fn default() -> Self {
        Directory::empty()
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field(
                "entries",
                &self
                    .entries
                    .iter()
                    .map(|(k, v)| (Tag::from_u16_exhaustive(*k), v))
                    .collect::<Vec<_>>(),
            )
            .field("next_ifd", &self.next_ifd)
            .field("offset", &self.offset)
            .finish()
    }
}
