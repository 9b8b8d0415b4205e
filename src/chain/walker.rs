use std::collections::HashSet;

use log::warn;

use super::Limits;
use crate::{
    directory::Directory,
    error::{TiffError, TiffFormatError, TiffResult},
    ifd::Entry,
    stream::{BackingStore, EndianReader, SmartReader},
    tags::{ByteOrder, IfdPointer, Tag, Type},
    tiff_kind::TiffKind,
};

/// Reads directory blocks from a store.
///
/// The walker knows the layout of the file and applies the structural checks against the store
/// size, it does not know anything about which tags a directory needs.
pub(crate) struct ChainWalker<'a, S> {
    pub(crate) store: &'a mut S,
    pub(crate) kind: TiffKind,
    pub(crate) byte_order: ByteOrder,
    pub(crate) limits: &'a Limits,
}

/// Location of a directory's table within the store.
struct Table {
    count: u64,
    /// Position of the next-directory link.
    link_pos: u64,
}

impl<'a, S: BackingStore> ChainWalker<'a, S> {
    fn table(&mut self, offset: IfdPointer) -> TiffResult<Table> {
        let kind = self.kind;
        let file_len = self.store.len()?;

        if offset.0 < kind.header_len() {
            return Err(TiffFormatError::OffsetOutOfBounds(offset).into());
        }
        match offset.0.checked_add(kind.count_len()) {
            Some(end) if end <= file_len => {}
            _ => return Err(TiffFormatError::OffsetOutOfBounds(offset).into()),
        }
        if offset.0 % kind.alignment() != 0 {
            warn!("directory at {} is not word aligned", offset.0);
        }

        let mut buf = [0; 8];
        let count_buf = &mut buf[..kind.count_len() as usize];
        self.store.read_at(offset.0, count_buf)?;
        let mut reader = SmartReader::wrap(count_buf, self.byte_order);
        let count = if kind.is_big() {
            reader.read_u64()?
        } else {
            u64::from(reader.read_u16()?)
        };

        let out_of_bounds = || TiffFormatError::EntryCountOutOfBounds(offset, count);
        if count == 0 || count > self.limits.max_entries {
            return Err(out_of_bounds().into());
        }

        let link_pos = count
            .checked_mul(kind.entry_len())
            .and_then(|entries| entries.checked_add(offset.0 + kind.count_len()));
        match link_pos.and_then(|pos| Some((pos, pos.checked_add(kind.offset_len())?))) {
            Some((link_pos, end)) if end <= file_len => Ok(Table { count, link_pos }),
            _ => Err(out_of_bounds().into()),
        }
    }

    /// Position of the next-directory link of the directory at `offset`.
    pub(crate) fn link_position(&mut self, offset: IfdPointer) -> TiffResult<u64> {
        Ok(self.table(offset)?.link_pos)
    }

    /// The next-directory link of the directory at `offset`, `None` at the end of the chain.
    pub(crate) fn next_link(&mut self, offset: IfdPointer) -> TiffResult<Option<IfdPointer>> {
        let table = self.table(offset)?;
        let mut buf = [0; 8];
        let link_buf = &mut buf[..self.kind.offset_len() as usize];
        self.store.read_at(table.link_pos, link_buf)?;

        let next = SmartReader::wrap(link_buf, self.byte_order).read_offset(self.kind.is_big())?;
        Ok(match next {
            0 => None,
            n => Some(IfdPointer(n)),
        })
    }

    /// Read the directory at `offset` with all of its values.
    pub(crate) fn fetch(&mut self, offset: IfdPointer) -> TiffResult<Directory> {
        let kind = self.kind;
        let big = kind.is_big();
        let inline_len = kind.offset_len() as usize;
        let file_len = self.store.len()?;

        let table = self.table(offset)?;
        let table_start = offset.0 + kind.count_len();
        let table_end = table.link_pos + kind.offset_len();

        let mut block = vec![0; usize::try_from(table_end - table_start)?];
        self.store.read_at(table_start, &mut block)?;
        let mut reader = SmartReader::wrap(&block, self.byte_order);

        let mut dir = Directory::empty();
        // Out-of-line values as (start, end), used to find the extent of the directory.
        let mut values = Vec::new();
        let mut last_tag = None;

        for _ in 0..table.count {
            let tag = reader.read_u16()?;
            let type_ = reader.read_u16()?;
            let count = reader.read_offset(big)?;
            let field = reader.read_raw(inline_len)?;

            if last_tag.is_some_and(|last| last >= tag) {
                warn!("directory at {}: tag {} out of ascending order", offset.0, tag);
            }
            last_tag = Some(tag);

            let Some(type_) = Type::from_u16(type_) else {
                warn!("directory at {}: skipping tag {} of unknown type {}", offset.0, tag, type_);
                dir.skipped_entries = true;
                continue;
            };

            let tag = Tag::from_u16_exhaustive(tag);
            let value_len = type_.value_bytes(count)?;
            if value_len > self.limits.ifd_value_size as u64 {
                return Err(TiffError::LimitsExceeded);
            }

            let mut data = if value_len <= inline_len as u64 {
                field[..value_len as usize].to_vec()
            } else {
                let start = SmartReader::wrap(&field, self.byte_order).read_offset(big)?;
                let end = start
                    .checked_add(value_len)
                    .filter(|&end| end <= file_len)
                    .ok_or(TiffFormatError::ValueOutOfBounds(tag))?;

                let mut data = vec![0; usize::try_from(value_len)?];
                self.store.read_at(start, &mut data)?;
                values.push((start, end));
                data
            };

            self.byte_order
                .convert(type_, &mut data, ByteOrder::native());
            dir.insert(tag, Entry::from_parts(type_, count, data));
        }

        let next = reader.read_offset(big)?;
        dir.set_next(Some(IfdPointer(next)));
        dir.persist_at(offset, self.extent(offset, table_end, values));

        Ok(dir)
    }

    /// Bytes at `offset` that belong to the directory alone.
    ///
    /// That is the table followed by the out-of-line values when these are packed directly behind
    /// it, otherwise only the table.
    fn extent(&self, offset: IfdPointer, table_end: u64, mut values: Vec<(u64, u64)>) -> u64 {
        values.sort_unstable();

        let mut end = table_end;
        for (start, value_end) in values {
            if start < table_end || start > self.kind.align(end) {
                return table_end - offset.0;
            }
            end = end.max(value_end);
        }

        end - offset.0
    }

    /// Follow the chain from `root`, yielding each directory with its ordinal.
    pub(crate) fn walk_from(self, root: Option<IfdPointer>) -> ChainWalk<'a, S> {
        ChainWalk {
            links: self.links_from(root),
        }
    }

    /// Follow the links from `root` without reading the directories' entries.
    pub(crate) fn links_from(self, root: Option<IfdPointer>) -> LinkWalk<'a, S> {
        LinkWalk {
            walker: self,
            next: root,
            ordinal: 0,
            visited: HashSet::new(),
            done: false,
        }
    }
}

/// Iterator over the `(ordinal, offset)` pairs of a chain.
///
/// A link back to an already visited offset ends the iteration with
/// [`TiffFormatError::CycleInOffsets`], as does any other error.
pub(crate) struct LinkWalk<'a, S> {
    walker: ChainWalker<'a, S>,
    next: Option<IfdPointer>,
    ordinal: u64,
    visited: HashSet<IfdPointer>,
    done: bool,
}

impl<S: BackingStore> LinkWalk<'_, S> {
    fn step(&mut self) -> TiffResult<Option<(u64, IfdPointer)>> {
        let Some(offset) = self.next else {
            return Ok(None);
        };

        if !self.visited.insert(offset) {
            return Err(TiffFormatError::CycleInOffsets.into());
        }
        if self.visited.len() as u64 > self.walker.limits.max_directories {
            return Err(TiffError::LimitsExceeded);
        }

        self.next = self.walker.next_link(offset)?;
        let ordinal = self.ordinal;
        self.ordinal += 1;
        Ok(Some((ordinal, offset)))
    }
}

impl<S: BackingStore> Iterator for LinkWalk<'_, S> {
    type Item = TiffResult<(u64, IfdPointer)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let item = self.step().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

/// Lazy sequence of `(ordinal, offset, directory)` along a chain.
pub struct ChainWalk<'a, S> {
    links: LinkWalk<'a, S>,
}

impl<S: BackingStore> Iterator for ChainWalk<'_, S> {
    type Item = TiffResult<(u64, IfdPointer, Directory)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (ordinal, offset) = match self.links.next()? {
            Ok(link) => link,
            Err(err) => return Some(Err(err)),
        };

        match self.links.walker.fetch(offset) {
            Ok(dir) => Some(Ok((ordinal, offset, dir))),
            Err(err) => {
                self.links.done = true;
                Some(Err(err))
            }
        }
    }
}
