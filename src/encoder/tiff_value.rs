use std::borrow::Cow;

use crate::tags::Type;

/// Trait for types that can be stored as the value of a directory entry.
///
/// Values are produced in native byte order, the directory encoder converts them to the byte
/// order of the file.
pub trait TiffValue {
    const BYTE_LEN: u8;
    const FIELD_TYPE: Type;
    fn count(&self) -> usize;
    fn bytes(&self) -> usize {
        self.count() * usize::from(Self::BYTE_LEN)
    }

    /// Access this value as an contiguous sequence of bytes.
    /// If their is no trivial representation, allocate it on the heap.
    fn data(&self) -> Cow<'_, [u8]>;
}

macro_rules! impl_tiff_value_for_primitive {
    ($inner_type:ty; $bytes:expr; $field_type:expr) => {
        impl TiffValue for $inner_type {
            const BYTE_LEN: u8 = $bytes;
            const FIELD_TYPE: Type = $field_type;

            fn count(&self) -> usize {
                1
            }

            fn data(&self) -> Cow<'_, [u8]> {
                Cow::Owned(self.to_ne_bytes().to_vec())
            }
        }

        impl TiffValue for [$inner_type] {
            const BYTE_LEN: u8 = $bytes;
            const FIELD_TYPE: Type = $field_type;

            fn count(&self) -> usize {
                self.len()
            }

            fn data(&self) -> Cow<'_, [u8]> {
                let mut buf: Vec<u8> = Vec::with_capacity(Self::BYTE_LEN as usize * self.len());
                for x in self {
                    buf.extend_from_slice(&x.to_ne_bytes());
                }
                Cow::Owned(buf)
            }
        }
    };
}

impl_tiff_value_for_primitive!(i8; 1; Type::SBYTE);
impl_tiff_value_for_primitive!(u16; 2; Type::SHORT);
impl_tiff_value_for_primitive!(i16; 2; Type::SSHORT);
impl_tiff_value_for_primitive!(u32; 4; Type::LONG);
impl_tiff_value_for_primitive!(i32; 4; Type::SLONG);
impl_tiff_value_for_primitive!(u64; 8; Type::LONG8);
impl_tiff_value_for_primitive!(i64; 8; Type::SLONG8);
impl_tiff_value_for_primitive!(f32; 4; Type::FLOAT);
impl_tiff_value_for_primitive!(f64; 8; Type::DOUBLE);

impl TiffValue for u8 {
    const BYTE_LEN: u8 = 1;
    const FIELD_TYPE: Type = Type::BYTE;

    fn count(&self) -> usize {
        1
    }

    fn data(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(std::slice::from_ref(self))
    }
}

impl TiffValue for [u8] {
    const BYTE_LEN: u8 = 1;
    const FIELD_TYPE: Type = Type::BYTE;

    fn count(&self) -> usize {
        self.len()
    }

    fn data(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl TiffValue for Ifd {
    const BYTE_LEN: u8 = 4;
    const FIELD_TYPE: Type = Type::IFD;

    fn count(&self) -> usize {
        1
    }

    fn data(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.0.to_ne_bytes().to_vec())
    }
}

impl TiffValue for Ifd8 {
    const BYTE_LEN: u8 = 8;
    const FIELD_TYPE: Type = Type::IFD8;

    fn count(&self) -> usize {
        1
    }

    fn data(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.0.to_ne_bytes().to_vec())
    }
}

impl TiffValue for Rational {
    const BYTE_LEN: u8 = 8;
    const FIELD_TYPE: Type = Type::RATIONAL;

    fn count(&self) -> usize {
        1
    }

    fn data(&self) -> Cow<'_, [u8]> {
        Cow::Owned([self.n.to_ne_bytes(), self.d.to_ne_bytes()].concat())
    }
}

impl TiffValue for str {
    const BYTE_LEN: u8 = 1;
    const FIELD_TYPE: Type = Type::ASCII;

    fn count(&self) -> usize {
        self.len() + 1
    }

    fn data(&self) -> Cow<'_, [u8]> {
        Cow::Owned({
            if self.is_ascii() && !self.bytes().any(|b| b == 0) {
                let bytes: &[u8] = self.as_bytes();
                [bytes, &[0]].concat()
            } else {
                vec![]
            }
        })
    }
}

impl<T: TiffValue + ?Sized> TiffValue for &'_ T {
    const BYTE_LEN: u8 = T::BYTE_LEN;
    const FIELD_TYPE: Type = T::FIELD_TYPE;

    fn count(&self) -> usize {
        (*self).count()
    }

    fn data(&self) -> Cow<'_, [u8]> {
        T::data(self)
    }
}

macro_rules! impl_tiff_value_for_contiguous_sequence {
    ($inner_type:ty; $bytes:expr; $field_type:expr) => {
        impl TiffValue for [$inner_type] {
            const BYTE_LEN: u8 = $bytes;
            const FIELD_TYPE: Type = $field_type;

            fn count(&self) -> usize {
                self.len()
            }

            fn data(&self) -> Cow<'_, [u8]> {
                let mut buf: Vec<u8> = Vec::with_capacity(Self::BYTE_LEN as usize * self.len());
                for x in self {
                    buf.extend_from_slice(&x.data());
                }
                Cow::Owned(buf)
            }
        }
    };
}

impl_tiff_value_for_contiguous_sequence!(Ifd; 4; Type::IFD);
impl_tiff_value_for_contiguous_sequence!(Ifd8; 8; Type::IFD8);
impl_tiff_value_for_contiguous_sequence!(Rational; 8; Type::RATIONAL);

/// Type to represent tiff values of type `IFD`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ifd(pub u32);

/// Type to represent tiff values of type `IFD8`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ifd8(pub u64);

/// Type to represent tiff values of type `RATIONAL`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rational {
    pub n: u32,
    pub d: u32,
}
