//! The directory chain engine.
//!
//! A [`DirectoryChain`] owns a backing store and keeps exactly one active [`Directory`] together
//! with the knowledge of where that directory sits in the main chain.

use std::collections::HashMap;

use log::debug;

use crate::{
    directory::Directory,
    encoder::DirectoryEncoder,
    error::{TiffError, TiffFormatError, TiffResult},
    stream::{BackingStore, SmartReader},
    tags::{ByteOrder, IfdPointer, TagSet},
    tiff_kind::TiffKind,
};

use self::offset_cache::OffsetCache;
use self::walker::ChainWalker;

mod locator;
mod offset_cache;
mod subifd;
mod unlink;
mod walker;
mod writer;

pub use self::subifd::SubIfdLayout;
pub use self::walker::ChainWalk;

/// Limits applied while reading and writing directories.
#[derive(Clone, Debug)]
pub struct Limits {
    /// The maximum size of any ifd value in bytes, the default is
    /// 1MiB.
    pub ifd_value_size: usize,
    /// The maximum number of entries in a single directory, the default is 4096.
    pub max_entries: u64,
    /// The maximum number of directories followed in one chain, the default is 1048576. This
    /// bounds the work of every walk, including the ones that end in a cycle.
    pub max_directories: u64,
    /// The purpose of this is to prevent all the fields of the struct from
    /// being public, as this would make adding new fields a major version
    /// bump.
    _non_exhaustive: (),
}

impl Limits {
    /// A configuration that does not impose any limits.
    ///
    /// This is a good start if the caller only wants to impose selective limits, contrary to the
    /// default limits which allows selectively disabling limits.
    pub fn unlimited() -> Limits {
        Limits {
            ifd_value_size: usize::MAX,
            max_entries: u64::MAX,
            max_directories: u64::MAX,
            _non_exhaustive: (),
        }
    }
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            ifd_value_size: 1024 * 1024,
            max_entries: 4096,
            max_directories: 1 << 20,
            _non_exhaustive: (),
        }
    }
}

/// Position of the active directory within the main chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectoryNumber {
    /// The active directory is the n-th directory of the main chain, counting from 0.
    Known(u64),
    /// The active directory is not (known to be) part of the main chain.
    Unknown,
}

/// An excursion into a chain that is not the main chain.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Excursion {
    /// Offset the excursion started at, which names its ordinal namespace.
    pub(crate) root: IfdPointer,
    /// Ordinal of the active directory within the excursion.
    pub(crate) local: u64,
}

/// Navigation and modification of the directory chain of a TIFF file.
///
/// Reading moves the single active directory around the main chain with
/// [`set_directory`](Self::set_directory) and [`read_next`](Self::read_next) or away from it with
/// [`set_sub_directory`](Self::set_sub_directory). Writing persists the active directory, either
/// appended to the chain, in place, or relocated.
///
/// The engine is single threaded and owns its store exclusively, state is never shared between
/// two chains opened on the same file.
pub struct DirectoryChain<S> {
    store: S,
    kind: TiffKind,
    byte_order: ByteOrder,
    limits: Limits,
    current: DirectoryNumber,
    active: Directory,
    cache: OffsetCache,
    excursion: Option<Excursion>,
    sub_caches: HashMap<IfdPointer, OffsetCache>,
    tag_set: &'static TagSet,
    /// Last directory appended in this session, as `(ordinal, offset)`.
    tail: Option<(u64, IfdPointer)>,
    /// Cleared for good once a rewrite moved a directory behind the tail.
    fast_append: bool,
}

impl<S: BackingStore> DirectoryChain<S> {
    /// Start a new file in an empty store by writing a header without directories.
    pub fn create(store: S, byte_order: ByteOrder, kind: TiffKind) -> TiffResult<Self> {
        let mut chain = Self::with_layout(store, byte_order, kind);
        let header = kind.header(byte_order);
        chain.store.write_at(0, &header)?;
        Ok(chain)
    }

    /// Open an existing file and load its first directory, if there is one.
    pub fn open(store: S) -> TiffResult<Self> {
        let mut chain = Self::open_deferred(store)?;
        if chain.root()?.is_some() {
            chain.set_directory(0)?;
        }
        Ok(chain)
    }

    /// Open an existing file, validating only its header.
    ///
    /// No directory is loaded, the first operation may as well be a
    /// [`read_custom_directory`](Self::read_custom_directory).
    pub fn open_deferred(mut store: S) -> TiffResult<Self> {
        let mut header = [0; 16];
        let len = store.len()?.min(16) as usize;
        store.read_at(0, &mut header[..len])?;
        let (byte_order, kind) = TiffKind::parse_header(&header[..len])?;
        debug!("opened {:?} {:?} file", kind, byte_order);
        Ok(Self::with_layout(store, byte_order, kind))
    }

    fn with_layout(store: S, byte_order: ByteOrder, kind: TiffKind) -> Self {
        let limits = Limits::default();
        DirectoryChain {
            store,
            kind,
            byte_order,
            cache: OffsetCache::new(limits.max_directories),
            limits,
            current: DirectoryNumber::Unknown,
            active: Directory::empty(),
            excursion: None,
            sub_caches: HashMap::new(),
            tag_set: &TagSet::IMAGE,
            tail: None,
            fast_append: true,
        }
    }

    /// Replace the limits, dropping all cached offsets.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.cache = OffsetCache::new(limits.max_directories);
        self.sub_caches.clear();
        self.limits = limits;
        self
    }

    /// Offset of the first directory of the main chain, read from the header.
    pub fn root(&mut self) -> TiffResult<Option<IfdPointer>> {
        let mut buf = [0; 8];
        let field = &mut buf[..self.kind.offset_len() as usize];
        self.store.read_at(self.kind.root_pos(), field)?;
        let root = SmartReader::wrap(field, self.byte_order).read_offset(self.kind.is_big())?;
        Ok(match root {
            0 => None,
            n => Some(IfdPointer(n)),
        })
    }

    pub fn current_directory(&self) -> DirectoryNumber {
        self.current
    }

    /// Ordinal of the active directory within the current SubIFD excursion.
    pub fn sub_directory_ordinal(&self) -> Option<u64> {
        self.excursion.map(|excursion| excursion.local)
    }

    /// The active directory.
    pub fn current(&self) -> &Directory {
        &self.active
    }

    /// The active directory, for populating or changing its entries before a write.
    pub fn current_mut(&mut self) -> &mut Directory {
        &mut self.active
    }

    /// Where the active directory is persisted, if it is.
    pub fn current_offset(&self) -> Option<IfdPointer> {
        self.active.offset()
    }

    /// Replace the active directory by a fresh, empty one.
    ///
    /// The position in the chain is kept, the next write appends the new directory.
    pub fn create_directory(&mut self) -> &mut Directory {
        self.active = Directory::empty();
        &mut self.active
    }

    pub fn kind(&self) -> TiffKind {
        self.kind
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Iterate over the directories of the main chain, independent of the active directory.
    pub fn directories(&mut self) -> TiffResult<ChainWalk<'_, S>> {
        let root = self.root()?;
        Ok(self.walker().walk_from(root))
    }

    /// Gets a reference to the backing store.
    pub fn get_ref(&self) -> &S {
        &self.store
    }

    /// Release the backing store.
    pub fn into_inner(self) -> S {
        self.store
    }

    pub(crate) fn walker(&mut self) -> ChainWalker<'_, S> {
        ChainWalker {
            store: &mut self.store,
            kind: self.kind,
            byte_order: self.byte_order,
            limits: &self.limits,
        }
    }

    pub(crate) fn encoder(&self) -> DirectoryEncoder {
        DirectoryEncoder::new(self.kind, self.byte_order)
    }

    /// Read a directory and check it against the active tag set.
    ///
    /// A structural failure is returned as the outer error, a directory that parses but misses a
    /// required tag is returned as `Ok(Err(_))` so that callers can still count it as visited.
    pub(crate) fn load(&mut self, offset: IfdPointer) -> TiffResult<TiffResult<Directory>> {
        let dir = self.walker().fetch(offset)?;
        let tag_set = self.tag_set;

        for (tag, entry) in dir.iter() {
            if let Some(types) = tag_set.expected_types(tag) {
                if !types.contains(&entry.field_type()) {
                    log::warn!(
                        "{} directory at {}: tag {:?} has unexpected type {:?}",
                        tag_set.name,
                        offset.0,
                        tag,
                        entry.field_type()
                    );
                }
            }
        }

        if let Some(&missing) = tag_set.required.iter().find(|&&tag| !dir.contains(tag)) {
            return Ok(Err(TiffFormatError::RequiredTagNotFound(missing).into()));
        }

        debug!("loaded {} directory at {}", tag_set.name, offset.0);
        Ok(Ok(dir))
    }

    /// Drop the notion of a current directory after a failed operation.
    pub(crate) fn fail<T>(&mut self, err: TiffError) -> TiffResult<T> {
        self.current = DirectoryNumber::Unknown;
        self.excursion = None;
        self.active = Directory::empty();
        Err(err)
    }

    /// Extend the offset cache along the main chain until `until` or the end of the chain.
    ///
    /// Returns the furthest `(ordinal, offset)` reached, `None` for an empty chain.
    pub(crate) fn walk_cached(&mut self, until: u64) -> TiffResult<Option<(u64, IfdPointer)>> {
        let (mut ordinal, mut offset) = match self.cache.last() {
            Some(last) => last,
            None => match self.root()? {
                Some(root) => {
                    self.cache.record(0, root)?;
                    (0, root)
                }
                None => return Ok(None),
            },
        };

        if ordinal > until {
            return Ok(self.cache.lookup(until).map(|offset| (until, offset)));
        }

        while ordinal < until {
            let next = match self.walker().next_link(offset) {
                Ok(next) => next,
                Err(err) => {
                    if err.is_corrupt() {
                        self.cache.truncate_from(ordinal);
                    }
                    return Err(err);
                }
            };

            match next {
                Some(next) => {
                    ordinal += 1;
                    self.cache.record(ordinal, next)?;
                    offset = next;
                }
                None => break,
            }
        }

        Ok(Some((ordinal, offset)))
    }

    /// Find a main chain directory by walking the links from the root, bypassing the cache.
    ///
    /// Returns the ordinal and offset of the first directory matching `pred` together with the
    /// position of the link that points to it.
    pub(crate) fn find_linked(
        &mut self,
        mut pred: impl FnMut(u64, IfdPointer) -> bool,
    ) -> TiffResult<Option<Linked>> {
        let root = self.root()?;
        let root_pos = self.kind.root_pos();

        let mut previous: Option<IfdPointer> = None;
        let mut found = None;
        for link in self.walker().links_from(root) {
            let (ordinal, offset) = link?;
            if pred(ordinal, offset) {
                found = Some((ordinal, offset));
                break;
            }
            previous = Some(offset);
        }

        let Some((ordinal, offset)) = found else {
            return Ok(None);
        };

        let link_pos = match previous {
            Some(previous) => self.walker().link_position(previous)?,
            None => root_pos,
        };

        Ok(Some(Linked {
            ordinal,
            offset,
            link_pos,
        }))
    }

    /// Point the link field at `link_pos` to `target`.
    pub(crate) fn patch_link(&mut self, link_pos: u64, target: u64) -> TiffResult<()> {
        let link = self.encoder().link(target)?;
        self.store.write_at(link_pos, &link)?;
        Ok(())
    }
}

/// A main chain directory and the link pointing to it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Linked {
    pub(crate) ordinal: u64,
    pub(crate) offset: IfdPointer,
    /// The predecessor's next-directory link, or the root pointer of the header.
    pub(crate) link_pos: u64,
}
