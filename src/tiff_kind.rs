use crate::{
    error::{TiffError, TiffFormatError, TiffResult, UsageError},
    tags::ByteOrder,
};

/// Abstracts over the differences between classic Tiff and BigTiff.
///
/// The layout is only known after reading a header, so this is a runtime value instead of a type
/// parameter. All field widths of a directory block are derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TiffKind {
    /// Classic Tiff with 32-bit offsets.
    Standard,
    /// BigTiff with 64-bit offsets.
    Big,
}

impl TiffKind {
    pub fn is_big(self) -> bool {
        self == TiffKind::Big
    }

    /// Width of offset fields, the next-directory link and inline values.
    pub fn offset_len(self) -> u64 {
        match self {
            TiffKind::Standard => 4,
            TiffKind::Big => 8,
        }
    }

    /// Width of the entry count field opening a directory.
    pub fn count_len(self) -> u64 {
        match self {
            TiffKind::Standard => 2,
            TiffKind::Big => 8,
        }
    }

    /// Size of a single directory entry: tag, type, count and value or offset.
    pub fn entry_len(self) -> u64 {
        4 + 2 * self.offset_len()
    }

    /// Position of the root directory pointer in the header.
    pub fn root_pos(self) -> u64 {
        match self {
            TiffKind::Standard => 4,
            TiffKind::Big => 8,
        }
    }

    /// Length of the file header, including the root directory pointer.
    pub fn header_len(self) -> u64 {
        self.root_pos() + self.offset_len()
    }

    /// Directories and out-of-line values start on multiples of this.
    pub fn alignment(self) -> u64 {
        match self {
            TiffKind::Standard => 2,
            TiffKind::Big => 8,
        }
    }

    /// Total size of a directory with `entries` entries, from the count field up to and
    /// including the next-directory link.
    pub fn directory_len(self, entries: u64) -> u64 {
        self.count_len() + entries * self.entry_len() + self.offset_len()
    }

    /// Round `offset` up to the next word boundary.
    pub fn align(self, offset: u64) -> u64 {
        let word = self.alignment();
        match offset % word {
            0 => offset,
            rem => offset + (word - rem),
        }
    }

    /// Interpret a header, returning the byte order and the layout it announces.
    pub fn parse_header(header: &[u8]) -> TiffResult<(ByteOrder, TiffKind)> {
        if header.len() < 8 {
            return Err(TiffFormatError::TiffSignatureNotFound.into());
        }

        let byte_order = match &header[..2] {
            b"II" => ByteOrder::LittleEndian,
            b"MM" => ByteOrder::BigEndian,
            _ => return Err(TiffFormatError::TiffSignatureNotFound.into()),
        };

        let read_u16 = |b: [u8; 2]| match byte_order {
            ByteOrder::LittleEndian => u16::from_le_bytes(b),
            ByteOrder::BigEndian => u16::from_be_bytes(b),
        };

        match read_u16([header[2], header[3]]) {
            42 => Ok((byte_order, TiffKind::Standard)),
            43 => {
                // Offset size must be 8 and the two reserved bytes zero.
                if read_u16([header[4], header[5]]) != 8 || read_u16([header[6], header[7]]) != 0
                {
                    return Err(TiffFormatError::TiffSignatureInvalid.into());
                }
                if header.len() < 16 {
                    return Err(TiffFormatError::TiffSignatureNotFound.into());
                }
                Ok((byte_order, TiffKind::Big))
            }
            _ => Err(TiffFormatError::TiffSignatureInvalid.into()),
        }
    }

    /// Encode a header with a blank root directory pointer.
    pub fn header(self, byte_order: ByteOrder) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.header_len() as usize);
        buf.extend_from_slice(&byte_order.signature());
        match self {
            TiffKind::Standard => {
                put_u16(&mut buf, byte_order, 42);
            }
            TiffKind::Big => {
                put_u16(&mut buf, byte_order, 43);
                put_u16(&mut buf, byte_order, 8);
                put_u16(&mut buf, byte_order, 0);
            }
        }
        buf.resize(self.header_len() as usize, 0);
        buf
    }

    /// Check that `offset` is representable in an offset field.
    ///
    /// This returns an error for normal Tiff if the offset is larger than `u32::MAX`.
    pub fn convert_offset(self, offset: u64) -> TiffResult<u64> {
        match self {
            TiffKind::Standard if u32::try_from(offset).is_err() => {
                Err(UsageError::OffsetTooLarge(offset).into())
            }
            _ => Ok(offset),
        }
    }

    /// Encode an offset field.
    pub fn offset_bytes(self, byte_order: ByteOrder, offset: u64) -> TiffResult<Vec<u8>> {
        let offset = self.convert_offset(offset)?;
        let mut buf = Vec::with_capacity(self.offset_len() as usize);
        match self {
            TiffKind::Standard => put_u32(&mut buf, byte_order, offset as u32),
            TiffKind::Big => put_u64(&mut buf, byte_order, offset),
        }
        Ok(buf)
    }

    /// Append the entry count field for `count` entries.
    pub fn put_entry_count(
        self,
        buf: &mut Vec<u8>,
        byte_order: ByteOrder,
        count: usize,
    ) -> TiffResult<()> {
        match self {
            TiffKind::Standard => put_u16(buf, byte_order, u16::try_from(count)?),
            TiffKind::Big => put_u64(buf, byte_order, u64::try_from(count)?),
        }
        Ok(())
    }

    /// Append the value count of an entry, an offset-width field.
    pub fn put_value_count(
        self,
        buf: &mut Vec<u8>,
        byte_order: ByteOrder,
        count: u64,
    ) -> TiffResult<()> {
        match self {
            TiffKind::Standard => {
                let count = u32::try_from(count).map_err(|_| TiffError::LimitsExceeded)?;
                put_u32(buf, byte_order, count)
            }
            TiffKind::Big => put_u64(buf, byte_order, count),
        }
        Ok(())
    }
}

pub(crate) fn put_u16(buf: &mut Vec<u8>, byte_order: ByteOrder, n: u16) {
    match byte_order {
        ByteOrder::LittleEndian => buf.extend_from_slice(&n.to_le_bytes()),
        ByteOrder::BigEndian => buf.extend_from_slice(&n.to_be_bytes()),
    }
}

pub(crate) fn put_u32(buf: &mut Vec<u8>, byte_order: ByteOrder, n: u32) {
    match byte_order {
        ByteOrder::LittleEndian => buf.extend_from_slice(&n.to_le_bytes()),
        ByteOrder::BigEndian => buf.extend_from_slice(&n.to_be_bytes()),
    }
}

pub(crate) fn put_u64(buf: &mut Vec<u8>, byte_order: ByteOrder, n: u64) {
    match byte_order {
        ByteOrder::LittleEndian => buf.extend_from_slice(&n.to_le_bytes()),
        ByteOrder::BigEndian => buf.extend_from_slice(&n.to_be_bytes()),
    }
}
