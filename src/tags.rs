macro_rules! tags {
    {
        // Permit arbitrary meta items, which include documentation.
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident($ty:tt) $(unknown(#[$unknown_meta:meta] $unknown_doc:ident))* {
            // Each of the `Name = Val,` permitting documentation.
            $($(#[$ident_attr:meta])* $tag:ident = $val:expr,)*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
        #[non_exhaustive]
        pub enum $name {
            $($(#[$ident_attr])* $tag,)*
            $(
                #[$unknown_meta]
                Unknown($ty),
            )*
        }

        impl $name {
            #[inline(always)]
            fn __from_inner_type(n: $ty) -> Result<Self, $ty> {
                match n {
                    $( $val => Ok($name::$tag), )*
                    n => Err(n),
                }
            }

            #[inline(always)]
            fn __to_inner_type(&self) -> $ty {
                match *self {
                    $( $name::$tag => $val, )*
                    $( $name::Unknown($unknown_doc) => { $unknown_doc }, )*
                }
            }
        }

        tags!($name, $ty, $($unknown_doc)*);
    };
    // For u16 tags, provide direct inherent primitive conversion methods.
    ($name:tt, u16, $($unknown_doc:ident)*) => {
        impl $name {
            #[inline(always)]
            pub fn from_u16(val: u16) -> Option<Self> {
                Self::__from_inner_type(val).ok()
            }

            $(
            #[inline(always)]
            pub fn from_u16_exhaustive($unknown_doc: u16) -> Self {
                Self::__from_inner_type($unknown_doc).unwrap_or_else(|_| $name::Unknown($unknown_doc))
            }
            )*

            #[inline(always)]
            pub fn to_u16(&self) -> u16 {
                Self::__to_inner_type(self)
            }
        }
    };
}

tags! {
/// TIFF tags
///
/// Only the tags the directory engine itself interprets or validates are named, everything else
/// is carried as [`Tag::Unknown`] and round-trips untouched.
pub enum Tag(u16) unknown(
    /// A private or extension tag
    unknown
) {
    NewSubfileType = 254,
    ImageWidth = 256,
    ImageLength = 257,
    BitsPerSample = 258,
    Compression = 259,
    PhotometricInterpretation = 262,
    ImageDescription = 270,
    StripOffsets = 273,
    SamplesPerPixel = 277,
    RowsPerStrip = 278,
    StripByteCounts = 279,
    PageName = 285,
    PageNumber = 297,
    Software = 305,
    DateTime = 306,
    SubIfd = 330,
    // <https://web.archive.org/web/20131111073619/http://www.exif.org/Exif2-1.PDF>
    ExifDirectory = 0x8769,
    GpsDirectory = 0x8825,
    // Exif private directory
    ExposureTime = 0x829a,
    FNumber = 0x829d,
    ExifVersion = 0x9000,
    DateTimeOriginal = 0x9003,
    InteroperabilityDirectory = 0xa005,
    // GPS private directory
    GpsVersionId = 0x0000,
    GpsLatitudeRef = 0x0001,
    GpsLatitude = 0x0002,
    GpsLongitudeRef = 0x0003,
    GpsLongitude = 0x0004,
}
}

/// Identifies the offset of an IFD.
///
/// This is represented as a 64-bit integer but only BigTIFF can utilize the bits. It is encoded
/// as 32-bit unsigned value ([`Type::LONG`]) in regular TIFF files and as 64-bit unsigned value
/// ([`Type::IFD8`]) in BigTIFF files.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
// The semantics of treating `0` as an end marker are imposed by the IFD, not by this type.
pub struct IfdPointer(pub u64);

tags! {
/// The type of an IFD entry (a 2 byte field).
pub enum Type(u16) {
    /// 8-bit unsigned integer
    BYTE = 1,
    /// 8-bit byte that contains a 7-bit ASCII code; the last byte must be zero
    ASCII = 2,
    /// 16-bit unsigned integer
    SHORT = 3,
    /// 32-bit unsigned integer
    LONG = 4,
    /// Fraction stored as two 32-bit unsigned integers
    RATIONAL = 5,
    /// 8-bit signed integer
    SBYTE = 6,
    /// 8-bit byte that may contain anything, depending on the field
    UNDEFINED = 7,
    /// 16-bit signed integer
    SSHORT = 8,
    /// 32-bit signed integer
    SLONG = 9,
    /// Fraction stored as two 32-bit signed integers
    SRATIONAL = 10,
    /// 32-bit IEEE floating point
    FLOAT = 11,
    /// 64-bit IEEE floating point
    DOUBLE = 12,
    /// 32-bit unsigned integer (offset)
    IFD = 13,
    /// BigTIFF 64-bit unsigned integer
    LONG8 = 16,
    /// BigTIFF 64-bit signed integer
    SLONG8 = 17,
    /// BigTIFF 64-bit unsigned integer (offset)
    IFD8 = 18,
}
}

impl Type {
    pub(crate) fn byte_len(&self) -> u8 {
        match *self {
            Type::BYTE | Type::SBYTE | Type::ASCII | Type::UNDEFINED => 1,
            Type::SHORT | Type::SSHORT => 2,
            Type::LONG | Type::SLONG | Type::FLOAT | Type::IFD => 4,
            Type::LONG8
            | Type::SLONG8
            | Type::DOUBLE
            | Type::RATIONAL
            | Type::SRATIONAL
            | Type::IFD8 => 8,
        }
    }

    pub(crate) fn value_bytes(&self, count: u64) -> Result<u64, crate::error::TiffError> {
        let tag_size = u64::from(self.byte_len());

        match count.checked_mul(tag_size) {
            Some(n) => Ok(n),
            None => Err(crate::error::TiffError::LimitsExceeded),
        }
    }

    /// Width of the units that are swapped when the byte order changes. Rationals swap their
    /// numerator and denominator separately.
    pub(crate) fn endian_unit(self) -> usize {
        match self {
            Type::BYTE | Type::SBYTE | Type::ASCII | Type::UNDEFINED => 1,
            Type::SHORT | Type::SSHORT => 2,
            Type::LONG
            | Type::SLONG
            | Type::FLOAT
            | Type::IFD
            | Type::RATIONAL
            | Type::SRATIONAL => 4,
            Type::LONG8 | Type::SLONG8 | Type::DOUBLE | Type::IFD8 => 8,
        }
    }
}

/// Byte order of the TIFF file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    /// little endian byte order
    LittleEndian,
    /// big endian byte order
    BigEndian,
}

impl ByteOrder {
    /// Get the byte order representing the running target.
    pub const fn native() -> Self {
        #[cfg(target_endian = "little")]
        {
            ByteOrder::LittleEndian
        }
        #[cfg(target_endian = "big")]
        {
            ByteOrder::BigEndian
        }
    }

    /// The two signature bytes opening a file of this byte order.
    pub(crate) fn signature(self) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => *b"II",
            ByteOrder::BigEndian => *b"MM",
        }
    }

    /// Given a typed buffer, convert its contents to the specified byte order in-place.
    ///
    /// The buffer is assumed to represent an array of the given type. If the length of the buffer
    /// is not divisible into an integer number of values, the trailing bytes are left alone.
    pub fn convert(self, ty: Type, buffer: &mut [u8], to: ByteOrder) {
        if self == to {
            return;
        }

        let unit = ty.endian_unit();
        if unit > 1 {
            for chunk in buffer.chunks_exact_mut(unit) {
                chunk.reverse();
            }
        }
    }
}

/// Describes which tags a kind of directory knows and requires.
///
/// Reading a directory happens against exactly one tag set. Main chain directories and SubIFDs
/// describe images and use [`TagSet::IMAGE`], private directories such as Exif use their own.
#[derive(Debug)]
pub struct TagSet {
    pub name: &'static str,
    /// Known tags with the field types they may be stored as.
    pub known: &'static [(Tag, &'static [Type])],
    /// Tags whose absence makes the directory unusable.
    pub required: &'static [Tag],
}

const UNSIGNED: &[Type] = &[Type::SHORT, Type::LONG];
const OFFSETS: &[Type] = &[Type::SHORT, Type::LONG, Type::LONG8];
const POINTERS: &[Type] = &[Type::LONG, Type::IFD, Type::LONG8, Type::IFD8];
const ASCII: &[Type] = &[Type::ASCII];
const RATIONAL: &[Type] = &[Type::RATIONAL];

impl TagSet {
    pub const IMAGE: TagSet = TagSet {
        name: "image",
        known: &[
            (Tag::NewSubfileType, &[Type::LONG]),
            (Tag::ImageWidth, UNSIGNED),
            (Tag::ImageLength, UNSIGNED),
            (Tag::BitsPerSample, &[Type::SHORT]),
            (Tag::Compression, &[Type::SHORT]),
            (Tag::PhotometricInterpretation, &[Type::SHORT]),
            (Tag::ImageDescription, ASCII),
            (Tag::StripOffsets, OFFSETS),
            (Tag::SamplesPerPixel, &[Type::SHORT]),
            (Tag::RowsPerStrip, UNSIGNED),
            (Tag::StripByteCounts, OFFSETS),
            (Tag::PageName, ASCII),
            (Tag::PageNumber, &[Type::SHORT]),
            (Tag::Software, ASCII),
            (Tag::DateTime, ASCII),
            (Tag::SubIfd, POINTERS),
            (Tag::ExifDirectory, POINTERS),
            (Tag::GpsDirectory, POINTERS),
        ],
        required: &[Tag::ImageWidth],
    };

    pub const EXIF: TagSet = TagSet {
        name: "exif",
        known: &[
            (Tag::ExposureTime, RATIONAL),
            (Tag::FNumber, RATIONAL),
            (Tag::ExifVersion, &[Type::UNDEFINED]),
            (Tag::DateTimeOriginal, ASCII),
            (Tag::InteroperabilityDirectory, POINTERS),
        ],
        required: &[],
    };

    pub const GPS: TagSet = TagSet {
        name: "gps",
        known: &[
            (Tag::GpsVersionId, &[Type::BYTE]),
            (Tag::GpsLatitudeRef, ASCII),
            (Tag::GpsLatitude, RATIONAL),
            (Tag::GpsLongitudeRef, ASCII),
            (Tag::GpsLongitude, RATIONAL),
        ],
        required: &[],
    };

    /// Accepts everything and requires nothing.
    pub const GENERIC: TagSet = TagSet {
        name: "generic",
        known: &[],
        required: &[],
    };

    /// The field types a tag may have, `None` if the tag is not known to this set.
    pub fn expected_types(&self, tag: Tag) -> Option<&'static [Type]> {
        self.known
            .iter()
            .find(|(known, _)| *known == tag)
            .map(|(_, types)| *types)
    }
}

#[test]
fn generic_tag_set_has_no_policy() {
    assert_eq!(TagSet::GENERIC.expected_types(Tag::ImageWidth), None);
    assert!(TagSet::GENERIC.required.is_empty());
    assert!(TagSet::IMAGE.expected_types(Tag::ImageWidth).is_some());
}

#[test]
fn convert_long_roundtrip() {
    let mut buf = 0x0102_0304u32.to_le_bytes();
    ByteOrder::LittleEndian.convert(Type::LONG, &mut buf, ByteOrder::BigEndian);
    assert_eq!(buf, [1, 2, 3, 4]);
    ByteOrder::BigEndian.convert(Type::LONG, &mut buf, ByteOrder::LittleEndian);
    assert_eq!(u32::from_le_bytes(buf), 0x0102_0304);
}

#[test]
fn convert_rational_swaps_halves_separately() {
    let mut buf = [0u8; 8];
    buf[..4].copy_from_slice(&1u32.to_le_bytes());
    buf[4..].copy_from_slice(&2u32.to_le_bytes());
    ByteOrder::LittleEndian.convert(Type::RATIONAL, &mut buf, ByteOrder::BigEndian);
    assert_eq!(buf, [0, 0, 0, 1, 0, 0, 0, 2]);
}

#[test]
fn gps_version_is_tag_zero() {
    assert_eq!(Tag::from_u16_exhaustive(0), Tag::GpsVersionId);
    assert_eq!(Tag::from_u16_exhaustive(0xfe00), Tag::Unknown(0xfe00));
    assert_eq!(Tag::SubIfd.to_u16(), 330);
}
