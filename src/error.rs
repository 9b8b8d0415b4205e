use std::io;
use std::num::TryFromIntError;
use std::string::FromUtf8Error;

use quick_error::quick_error;

use crate::tags::{IfdPointer, Tag, Type};

quick_error! {
    /// Tiff error kinds.
    #[derive(Debug)]
    pub enum TiffError {
        /// A directory or the file header is not formatted properly.
        FormatError(err: TiffFormatError) {
            display("Format error: {}", err)
            from()
        }

        /// The engine was asked to do something that makes no sense in its current state.
        UsageError(err: UsageError) {
            display("Usage error: {}", err)
            from()
        }

        /// The requested directory does not exist in the chain.
        DirectoryNotFound(index: u64, count: u64) {
            display("Directory {} requested but the chain ends after {} directories", index, count)
        }

        /// An I/O Error occurred while accessing the backing store.
        IoError(err: io::Error) {
            display("{}", err)
            source(err)
            from()
        }

        /// The limits of the engine are exceeded.
        LimitsExceeded {
            display("The engine limits are exceeded")
        }

        /// An integer conversion to or from a platform size failed.
        IntSizeError {
            display("Platform or format size limits exceeded")
            from(TryFromIntError)
        }
    }
}

quick_error! {
    /// The file is not formatted properly.
    ///
    /// This indicates that the encoder producing the file might behave incorrectly or that the
    /// input file has been corrupted.
    #[derive(Debug, Clone, PartialEq)]
    #[non_exhaustive]
    pub enum TiffFormatError {
        TiffSignatureNotFound {
            display("TIFF signature not found.")
        }
        TiffSignatureInvalid {
            display("TIFF signature invalid.")
        }
        /// The entry count at a directory offset implies entries past the end of the file.
        EntryCountOutOfBounds(at: IfdPointer, count: u64) {
            display("Directory at {} claims {} entries which exceed the file.", at.0, count)
        }
        /// A directory offset points outside of the file.
        OffsetOutOfBounds(at: IfdPointer) {
            display("Directory offset {} is outside of the file.", at.0)
        }
        /// An out-of-line value points outside of the file.
        ValueOutOfBounds(tag: Tag) {
            display("Value of tag {:?} is outside of the file.", tag)
        }
        RequiredTagNotFound(tag: Tag) {
            display("Required tag `{:?}` not found.", tag)
        }
        InvalidTagValueType(tag: Tag) {
            display("Tag `{:?}` did not have the expected value type.", tag)
        }
        InvalidTag {
            display("Image contains invalid tag.")
        }
        UnexpectedValueType(ty: Type) {
            display("Value of type {:?} can not be converted as requested.", ty)
        }
        /// Following the directory links revisited a directory.
        CycleInOffsets {
            display("File contained a cycle in the list of IFDs")
        }
    }
}

quick_error! {
    /// User attempted to use the engine in a way that is incompatible with its state.
    #[derive(Debug, Clone, PartialEq, Eq)]
    #[non_exhaustive]
    pub enum UsageError {
        /// Directory numbers for unlinking are 1-based.
        ZeroDirectoryIndex {
            display("Directory numbers for unlinking start at 1")
        }
        /// The directory is not linked from the main chain, so it can not be relocated.
        NotInMainChain(at: IfdPointer) {
            display("Directory at {} is not part of the main chain", at.0)
        }
        /// An empty directory can not be encoded.
        EmptyDirectory {
            display("A directory must contain at least one entry to be written")
        }
        /// The offset does not fit into the offset width of the file.
        OffsetTooLarge(offset: u64) {
            display("Offset {} does not fit the file's offset width", offset)
        }
        /// The directory was loaded without some of its entries, writing it back would drop them.
        UnknownEntries(at: IfdPointer) {
            display("Directory at {} has entries of unknown type and can not be written back", at.0)
        }
    }
}

impl TiffError {
    /// The directory data is structurally invalid.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, TiffError::FormatError(err) if *err != TiffFormatError::CycleInOffsets)
    }

    /// Following the chain revisited a directory.
    pub fn is_cycle(&self) -> bool {
        matches!(
            self,
            TiffError::FormatError(TiffFormatError::CycleInOffsets)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TiffError::DirectoryNotFound { .. })
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, TiffError::UsageError(_))
    }
}

impl From<FromUtf8Error> for TiffError {
    fn from(_err: FromUtf8Error) -> TiffError {
        TiffError::FormatError(TiffFormatError::InvalidTag)
    }
}

/// Result of a directory chain operation
pub type TiffResult<T> = Result<T, TiffError>;

#[test]
fn classification() {
    let cycle: TiffError = TiffFormatError::CycleInOffsets.into();
    assert!(cycle.is_cycle());
    assert!(!cycle.is_corrupt());

    let corrupt: TiffError = TiffFormatError::OffsetOutOfBounds(IfdPointer(8)).into();
    assert!(corrupt.is_corrupt());
    assert!(!corrupt.is_not_found());

    let usage: TiffError = UsageError::ZeroDirectoryIndex.into();
    assert!(usage.is_usage());

    let missing = TiffError::DirectoryNotFound(3, 2);
    assert!(missing.is_not_found());
    assert!(!missing.is_corrupt());
}
