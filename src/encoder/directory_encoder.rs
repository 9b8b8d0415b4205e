use crate::{
    directory::Directory,
    error::{TiffResult, UsageError},
    tags::ByteOrder,
    tiff_kind::{put_u16, TiffKind},
};

/// A directory block laid out for a specific position in the file.
#[derive(Debug)]
pub struct EncodedDirectory {
    /// Directory followed by its out-of-line values, ready for a single write.
    pub bytes: Vec<u8>,
}

/// Low level interface to encode ifd directories.
///
/// The directory itself is placed at `base` and the values that do not fit into their entries
/// follow it, each starting on a word boundary. Nothing is written here, the caller places the
/// whole block with one write.
pub struct DirectoryEncoder {
    kind: TiffKind,
    byte_order: ByteOrder,
}

impl DirectoryEncoder {
    pub fn new(kind: TiffKind, byte_order: ByteOrder) -> Self {
        DirectoryEncoder { kind, byte_order }
    }

    /// Lay out `dir` at the word aligned offset `base`, linking to `next` (0 ends the chain).
    pub fn encode(&self, dir: &Directory, base: u64, next: u64) -> TiffResult<EncodedDirectory> {
        if dir.is_empty() {
            return Err(UsageError::EmptyDirectory.into());
        }

        let kind = self.kind;
        let inline_len = kind.offset_len() as usize;
        let ifd_len = kind.directory_len(dir.len() as u64);

        let mut ifd = Vec::with_capacity(ifd_len as usize);
        let mut values: Vec<u8> = Vec::new();

        kind.put_entry_count(&mut ifd, self.byte_order, dir.len())?;
        // Entries are kept ordered by tag, as the format requires.
        for (tag, entry) in dir.iter() {
            let mut data = entry.data().to_vec();
            ByteOrder::native().convert(entry.field_type(), &mut data, self.byte_order);

            put_u16(&mut ifd, self.byte_order, tag.to_u16());
            put_u16(&mut ifd, self.byte_order, entry.field_type().to_u16());
            kind.put_value_count(&mut ifd, self.byte_order, entry.count())?;

            if data.len() <= inline_len {
                // Pad the data with zeros to the correct length
                data.resize(inline_len, 0);
                ifd.extend_from_slice(&data);
            } else {
                let relative = kind.align(ifd_len + values.len() as u64) - ifd_len;
                values.resize(relative as usize, 0);
                let offset = base + ifd_len + relative;
                ifd.extend_from_slice(&kind.offset_bytes(self.byte_order, offset)?);
                values.extend_from_slice(&data);
            }
        }

        ifd.extend_from_slice(&kind.offset_bytes(self.byte_order, next)?);
        debug_assert_eq!(ifd.len() as u64, ifd_len);

        ifd.extend_from_slice(&values);
        // The block must be addressable as a whole.
        kind.convert_offset(base + ifd.len() as u64)?;

        Ok(EncodedDirectory { bytes: ifd })
    }

    /// Encode an offset field for patching a link.
    pub fn link(&self, target: u64) -> TiffResult<Vec<u8>> {
        self.kind.offset_bytes(self.byte_order, target)
    }
}
