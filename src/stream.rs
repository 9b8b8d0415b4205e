//! All IO functionality needed to navigate and modify a directory chain

use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use crate::tags::ByteOrder;

/// Random access storage holding a TIFF file.
///
/// Every access names its position explicitly, the chain never relies on a shared cursor. This is
/// implemented for all seekable readers and writers, such as [`std::fs::File`] and
/// `Cursor<Vec<u8>>`.
pub trait BackingStore {
    /// Fill `buf` with the bytes starting at `offset`, failing if the store ends before.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Write all of `buf` at `offset`, growing the store if necessary.
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()>;

    /// The current length of the store in bytes.
    fn len(&mut self) -> io::Result<u64>;
}

impl<T: Read + Write + Seek> BackingStore for T {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.write_all(buf)
    }

    fn len(&mut self) -> io::Result<u64> {
        self.seek(SeekFrom::End(0))
    }
}

macro_rules! read_fn {
    ($name:ident, $type:ty) => {
        /// reads an $type
        #[inline(always)]
        fn $name(&mut self) -> Result<$type, io::Error> {
            let mut n = [0u8; std::mem::size_of::<$type>()];
            self.read_exact(&mut n)?;
            Ok(match self.byte_order() {
                ByteOrder::LittleEndian => <$type>::from_le_bytes(n),
                ByteOrder::BigEndian => <$type>::from_be_bytes(n),
            })
        }
    };
}

/// Reader that is aware of the byte order.
pub trait EndianReader: Read {
    /// Byte order that should be adhered to
    fn byte_order(&self) -> ByteOrder;

    read_fn!(read_u16, u16);
    read_fn!(read_u32, u32);
    read_fn!(read_u64, u64);
}

/// Reader over an in-memory directory block.
#[derive(Debug)]
pub(crate) struct SmartReader<'a> {
    reader: Cursor<&'a [u8]>,
    byte_order: ByteOrder,
}

impl<'a> SmartReader<'a> {
    pub(crate) fn wrap(bytes: &'a [u8], byte_order: ByteOrder) -> Self {
        SmartReader {
            reader: Cursor::new(bytes),
            byte_order,
        }
    }

    /// Read an offset-width field, 8 bytes when `big` and 4 bytes otherwise.
    pub(crate) fn read_offset(&mut self, big: bool) -> io::Result<u64> {
        if big {
            self.read_u64()
        } else {
            self.read_u32().map(u64::from)
        }
    }

    /// Take the next `len` bytes as they are.
    pub(crate) fn read_raw(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl EndianReader for SmartReader<'_> {
    #[inline(always)]
    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }
}

impl Read for SmartReader<'_> {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positioned_access_on_cursor() {
        let mut store = Cursor::new(Vec::new());
        store.write_at(4, &[1, 2]).unwrap();
        assert_eq!(BackingStore::len(&mut store).unwrap(), 6);

        let mut buf = [0xff; 3];
        store.read_at(3, &mut buf).unwrap();
        assert_eq!(buf, [0, 1, 2]);
        assert!(store.read_at(5, &mut buf).is_err());
    }

    #[test]
    fn endian_reads() {
        let bytes = [0x12, 0x34, 0, 0, 0, 1];
        let mut be = SmartReader::wrap(&bytes, ByteOrder::BigEndian);
        assert_eq!(be.read_u16().unwrap(), 0x1234);
        assert_eq!(be.read_offset(false).unwrap(), 1);

        let mut le = SmartReader::wrap(&bytes, ByteOrder::LittleEndian);
        assert_eq!(le.read_u16().unwrap(), 0x3412);
        assert!(le.read_offset(true).is_err());
    }
}
