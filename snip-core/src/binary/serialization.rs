mod serializer;

pub use serializer::*;

use std::io::{Cursor, Write};

use uuid::Uuid;

use crate::binary::{Error, ErrorKind, ResultContextExt};

pub trait Serialize {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error>;
}

impl Serialize for () {
    fn serialize(&self, _: &mut Serializer<impl Write>) -> Result<(), Error> {
        Ok(())
    }
}

macro_rules! serialize_primitive_le {
    ($T:ty) => {
        impl Serialize for $T {
            fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
                serializer.write_bytes(&self.to_le_bytes())
            }
        }
    };
}

serialize_primitive_le!(u8);
serialize_primitive_le!(u16);
serialize_primitive_le!(u32);
serialize_primitive_le!(u64);

serialize_primitive_le!(i8);
serialize_primitive_le!(i16);
serialize_primitive_le!(i32);
serialize_primitive_le!(i64);

serialize_primitive_le!(f32);
serialize_primitive_le!(f64);

impl Serialize for bool {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        (*self as u8).serialize(serializer)
    }
}

impl<T> Serialize for &T
where
    T: Serialize + ?Sized,
{
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        (**self).serialize(serializer)
    }
}

/// Serializes the length of an array as a `u32`.
pub fn serialize_len(len: usize, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
    u32::try_from(len)
        .map_err(|_| ErrorKind::Serialize.make(format!("array of length {len} is too long")))?
        .serialize(serializer)
        .context("cannot serialize length of array")
}

impl<T> Serialize for [T]
where
    T: Serialize,
{
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        serialize_len(self.len(), serializer)?;
        for (i, element) in self.iter().enumerate() {
            element
                .serialize(serializer)
                .with_context(|| format!("cannot serialize array element at index {i}"))?;
        }
        Ok(())
    }
}

impl<T> Serialize for Vec<T>
where
    T: Serialize,
{
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        self.as_slice().serialize(serializer)
    }
}

impl<T> Serialize for Option<T>
where
    T: Serialize,
{
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        match self {
            Some(value) => {
                1_u8.serialize(serializer)?;
                value.serialize(serializer)
            }
            None => 0_u8.serialize(serializer),
        }
    }
}

impl Serialize for Uuid {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        serializer.write_bytes(&self.to_bytes_le())
    }
}

pub fn serialize(value: &impl Serialize) -> Result<Vec<u8>, Error> {
    let mut buffer = vec![];
    value.serialize(&mut Serializer::new(Cursor::new(&mut buffer)))?;
    Ok(buffer)
}
