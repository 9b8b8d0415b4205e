//! Abstractions over TIFF tags

use self::Value::{
    Ascii, Byte, Double, Float, Ifd, IfdBig, List, Rational, SRational, Short, Signed, SignedBig,
    SignedByte, SignedShort, Undefined, Unsigned, UnsignedBig,
};
use crate::{
    encoder::TiffValue,
    error::{TiffError, TiffFormatError, TiffResult},
    tags::Type,
};

#[allow(unused_qualifications)]
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    Byte(u8),
    Short(u16),
    SignedByte(i8),
    SignedShort(i16),
    Signed(i32),
    SignedBig(i64),
    Unsigned(u32),
    UnsignedBig(u64),
    Float(f32),
    Double(f64),
    List(Vec<Value>),
    Rational(u32, u32),
    SRational(i32, i32),
    Ascii(String),
    Ifd(u32),
    IfdBig(u64),
    Undefined(u8),
}

impl Value {
    fn unexpected(&self) -> TiffError {
        let ty = match self {
            Byte(_) => Type::BYTE,
            Short(_) => Type::SHORT,
            SignedByte(_) => Type::SBYTE,
            SignedShort(_) => Type::SSHORT,
            Signed(_) => Type::SLONG,
            SignedBig(_) => Type::SLONG8,
            Unsigned(_) => Type::LONG,
            UnsignedBig(_) => Type::LONG8,
            Float(_) => Type::FLOAT,
            Double(_) => Type::DOUBLE,
            Rational(..) => Type::RATIONAL,
            SRational(..) => Type::SRATIONAL,
            Ascii(_) => Type::ASCII,
            Ifd(_) => Type::IFD,
            IfdBig(_) => Type::IFD8,
            Undefined(_) => Type::UNDEFINED,
            List(list) => match list.first() {
                Some(first) => return first.unexpected(),
                None => Type::UNDEFINED,
            },
        };

        TiffError::FormatError(TiffFormatError::UnexpectedValueType(ty))
    }

    pub fn into_u16(self) -> TiffResult<u16> {
        match self {
            Short(val) => Ok(val),
            Unsigned(val) => Ok(u16::try_from(val)?),
            UnsignedBig(val) => Ok(u16::try_from(val)?),
            val => Err(val.unexpected()),
        }
    }

    pub fn into_u32(self) -> TiffResult<u32> {
        match self {
            Byte(val) => Ok(val.into()),
            Short(val) => Ok(val.into()),
            Unsigned(val) => Ok(val),
            UnsignedBig(val) => Ok(u32::try_from(val)?),
            Ifd(val) => Ok(val),
            IfdBig(val) => Ok(u32::try_from(val)?),
            val => Err(val.unexpected()),
        }
    }

    pub fn into_u64(self) -> TiffResult<u64> {
        match self {
            Byte(val) => Ok(val.into()),
            Short(val) => Ok(val.into()),
            Unsigned(val) => Ok(val.into()),
            UnsignedBig(val) => Ok(val),
            Ifd(val) => Ok(val.into()),
            IfdBig(val) => Ok(val),
            val => Err(val.unexpected()),
        }
    }

    pub fn into_f64(self) -> TiffResult<f64> {
        match self {
            Float(val) => Ok(val as f64),
            Rational(num, den) => Ok(num as f64 / den as f64),
            SRational(num, den) => Ok(num as f64 / den as f64),
            Double(val) => Ok(val),
            val => Err(val.unexpected()),
        }
    }

    pub fn into_string(self) -> TiffResult<String> {
        match self {
            Ascii(val) => Ok(val),
            val => Err(val.unexpected()),
        }
    }

    pub fn into_u64_vec(self) -> TiffResult<Vec<u64>> {
        match self {
            List(vec) => {
                let mut new_vec = Vec::with_capacity(vec.len());
                for v in vec {
                    new_vec.push(v.into_u64()?)
                }
                Ok(new_vec)
            }
            Rational(numerator, denominator) => Ok(vec![numerator.into(), denominator.into()]),
            val => Ok(vec![val.into_u64()?]),
        }
    }
}

/// A single directory entry with its value fully loaded.
///
/// The value bytes are kept in native byte order regardless of the file they were read from, the
/// conversion happens when reading and encoding a directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    type_: Type,
    count: u64,
    data: Vec<u8>,
}

impl Entry {
    /// Create an entry holding an encodable value.
    pub fn new<V: TiffValue + ?Sized>(value: &V) -> Self {
        Entry {
            type_: V::FIELD_TYPE,
            count: value.count() as u64,
            data: value.data().into_owned(),
        }
    }

    /// Create an entry from raw native-endian bytes of the given field type.
    ///
    /// Trailing bytes that do not form a whole value are dropped.
    pub fn from_raw(type_: Type, mut data: Vec<u8>) -> Self {
        let width = usize::from(type_.byte_len());
        let count = data.len() / width;
        data.truncate(count * width);
        Entry {
            type_,
            count: count as u64,
            data,
        }
    }

    pub(crate) fn from_parts(type_: Type, count: u64, data: Vec<u8>) -> Self {
        Entry {
            type_,
            count,
            data,
        }
    }

    pub fn field_type(&self) -> Type {
        self.type_
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// The value bytes in native byte order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Interpret the stored bytes according to the field type.
    ///
    /// Single values are returned as is, multiple values as a [`Value::List`].
    pub fn value(&self) -> TiffResult<Value> {
        if self.type_ == Type::ASCII {
            let end = self
                .data
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(self.data.len());
            return Ok(Ascii(String::from_utf8(self.data[..end].to_vec())?));
        }

        let width = usize::from(self.type_.byte_len());
        let mut values: Vec<Value> = self
            .data
            .chunks_exact(width)
            .map(|chunk| decode_one(self.type_, chunk))
            .collect();

        match values.len() {
            1 => Ok(values.remove(0)),
            _ => Ok(List(values)),
        }
    }
}

fn decode_one(type_: Type, chunk: &[u8]) -> Value {
    let b2 = |i: usize| [chunk[i], chunk[i + 1]];
    let b4 = |i: usize| [chunk[i], chunk[i + 1], chunk[i + 2], chunk[i + 3]];
    let b8 = || {
        let mut buf = [0; 8];
        buf.copy_from_slice(&chunk[..8]);
        buf
    };

    match type_ {
        Type::BYTE => Byte(chunk[0]),
        Type::SBYTE => SignedByte(chunk[0] as i8),
        Type::UNDEFINED | Type::ASCII => Undefined(chunk[0]),
        Type::SHORT => Short(u16::from_ne_bytes(b2(0))),
        Type::SSHORT => SignedShort(i16::from_ne_bytes(b2(0))),
        Type::LONG => Unsigned(u32::from_ne_bytes(b4(0))),
        Type::SLONG => Signed(i32::from_ne_bytes(b4(0))),
        Type::FLOAT => Float(f32::from_ne_bytes(b4(0))),
        Type::IFD => Ifd(u32::from_ne_bytes(b4(0))),
        Type::RATIONAL => Rational(u32::from_ne_bytes(b4(0)), u32::from_ne_bytes(b4(4))),
        Type::SRATIONAL => SRational(i32::from_ne_bytes(b4(0)), i32::from_ne_bytes(b4(4))),
        Type::LONG8 => UnsignedBig(u64::from_ne_bytes(b8())),
        Type::SLONG8 => SignedBig(i64::from_ne_bytes(b8())),
        Type::DOUBLE => Double(f64::from_ne_bytes(b8())),
        Type::IFD8 => IfdBig(u64::from_ne_bytes(b8())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{Ifd8, Rational as RationalValue};

    #[test]
    fn scalar_and_list_values() {
        assert_eq!(Entry::new(&7u16).value().unwrap(), Short(7));
        assert_eq!(
            Entry::new(&[1u32, 2][..]).value().unwrap(),
            List(vec![Unsigned(1), Unsigned(2)])
        );
        assert_eq!(
            Entry::new(&[Ifd8(16), Ifd8(32)][..])
                .value()
                .unwrap()
                .into_u64_vec()
                .unwrap(),
            vec![16, 32]
        );
    }

    #[test]
    fn ascii_strips_terminator() {
        let entry = Entry::new("tiff");
        assert_eq!(entry.count(), 5);
        assert_eq!(entry.value().unwrap().into_string().unwrap(), "tiff");
    }

    #[test]
    fn rational_is_not_an_integer() {
        let entry = Entry::new(&RationalValue { n: 1, d: 2 });
        assert_eq!(entry.value().unwrap().into_f64().unwrap(), 0.5);
        assert!(entry.value().unwrap().into_u32().is_err());
    }

    #[test]
    fn raw_entries_drop_partial_values() {
        let entry = Entry::from_raw(Type::SHORT, vec![1, 0, 2]);
        assert_eq!(entry.count(), 1);
        assert_eq!(entry.data().len(), 2);
    }
}
