mod deserializer;

pub use deserializer::*;

use std::io::Read;

use uuid::Uuid;

use crate::binary::{Error, ErrorKind, ResultContextExt};

pub trait Deserialize: Sized {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error>;
}

impl Deserialize for () {
    fn deserialize(_: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        Ok(())
    }
}

macro_rules! deserialize_primitive_le {
    ($T:ty) => {
        impl Deserialize for $T {
            fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
                let mut buf = [0; std::mem::size_of::<$T>()];
                deserializer.read_bytes(&mut buf)?;
                Ok(<$T>::from_le_bytes(buf))
            }
        }
    };
}

deserialize_primitive_le!(u8);
deserialize_primitive_le!(u16);
deserialize_primitive_le!(u32);
deserialize_primitive_le!(u64);

deserialize_primitive_le!(i8);
deserialize_primitive_le!(i16);
deserialize_primitive_le!(i32);
deserialize_primitive_le!(i64);

deserialize_primitive_le!(f32);
deserialize_primitive_le!(f64);

impl Deserialize for bool {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        match deserializer.deserialize::<u8>()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ErrorKind::Deserialize.make(format!(
                "bool has invalid value {other} (must be 0 or 1)"
            ))),
        }
    }
}

/// Deserializes an array length previously written by [`serialize_len`][crate::binary::serialize_len].
pub fn deserialize_len(deserializer: &mut Deserializer<impl Read>) -> Result<usize, Error> {
    Ok(deserializer
        .deserialize::<u32>()
        .context("cannot read array length")? as usize)
}

impl<T> Deserialize for Vec<T>
where
    T: Deserialize,
{
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        let len = deserialize_len(deserializer)?;
        // Lengths come from untrusted input, so never preallocate past the end of the stream.
        let remaining = deserializer
            .stream_len()
            .saturating_sub(deserializer.stream_position());
        let capacity = len.min(remaining as usize);
        let mut vec = Vec::with_capacity(capacity);
        for i in 0..len {
            vec.push(deserializer.deserialize().with_context(|| {
                format!("cannot deserialize array field {i} (array of length {len})")
            })?);
        }
        Ok(vec)
    }
}

impl<T> Deserialize for Option<T>
where
    T: Deserialize,
{
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        match deserializer.deserialize::<u8>()? {
            0 => Ok(None),
            1 => Ok(Some(deserializer.deserialize()?)),
            other => Err(ErrorKind::Deserialize.make(format!("invalid option tag {other}"))),
        }
    }
}

impl Deserialize for Uuid {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        let mut buf = [0; 16];
        deserializer.read_bytes(&mut buf)?;
        Ok(Uuid::from_bytes_le(buf))
    }
}

impl<R> Deserializer<R> {
    pub fn deserialize<T>(&mut self) -> Result<T, Error>
    where
        R: Read,
        T: Deserialize,
    {
        T::deserialize(self)
    }
}

pub fn deserialize<T>(buffer: &[u8]) -> Result<T, Error>
where
    T: Deserialize,
{
    T::deserialize(&mut Deserializer::from_buffer(buffer))
}
