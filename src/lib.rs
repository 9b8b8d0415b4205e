//! Navigation and modification of TIFF directory chains
//!
//! A TIFF file is a header followed by Image File Directories (IFDs). The directories of the main
//! chain link to each other, starting at a pointer in the header. Further directories, such as
//! SubIFDs or Exif blocks, are only reachable through tags of other directories.
//!
//! [`DirectoryChain`] moves one active [`Directory`] around these chains, appends, rewrites and
//! unlinks directories, and stays consistent when the file is corrupt or loops back on itself.
//!
//! # Related Links
//! * <https://web.archive.org/web/20210108073850/https://www.adobe.io/open/standards/TIFF.html> - The TIFF specification

mod chain;
mod directory;
pub mod encoder;
mod error;
mod ifd;
mod stream;
pub mod tags;
mod tiff_kind;

pub use self::chain::{ChainWalk, DirectoryChain, DirectoryNumber, Limits, SubIfdLayout};
pub use self::directory::Directory;
pub use self::error::{TiffError, TiffFormatError, TiffResult, UsageError};
pub use self::ifd::{Entry, Value};
pub use self::stream::BackingStore;
pub use self::tiff_kind::TiffKind;
