//! Encoding of directory blocks and the values stored in them

mod directory_encoder;
mod tiff_value;

pub use self::directory_encoder::{DirectoryEncoder, EncodedDirectory};
pub use self::tiff_value::{Ifd, Ifd8, Rational, TiffValue};
