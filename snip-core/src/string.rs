//! Strings are stored as a `u32` byte length followed by UTF-8 bytes, without a terminator.

use std::{
    io::{Read, Write},
    sync::Arc,
};

use crate::binary::{
    deserialize_len, serialize_len, Deserialize, Deserializer, Error, ErrorKind, ResultContextExt,
    Serialize, Serializer,
};

impl Serialize for str {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        serialize_len(self.len(), serializer).context("cannot serialize string length")?;
        serializer.write_bytes(self.as_bytes())
    }
}

impl Serialize for String {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        self.as_str().serialize(serializer)
    }
}

impl Serialize for Arc<str> {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        (**self).serialize(serializer)
    }
}

impl Deserialize for String {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        let length = deserialize_len(deserializer)?;
        let bytes = deserializer
            .read_vec(length)
            .with_context(|| format!("cannot read string of length {length}"))?;
        String::from_utf8(bytes)
            .map_err(|_| ErrorKind::Deserialize.make("string is not valid UTF-8"))
    }
}

impl Deserialize for Arc<str> {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        Ok(Arc::from(deserializer.deserialize::<String>()?))
    }
}

#[cfg(test)]
mod tests {
    use crate::binary::{deserialize, serialize};

    #[test]
    fn strings_are_length_prefixed() {
        let bytes = serialize(&String::from("hé")).unwrap();
        assert_eq!(bytes, [3, 0, 0, 0, b'h', 0xc3, 0xa9]);
        assert_eq!(deserialize::<String>(&bytes).unwrap(), "hé");
    }

    #[test]
    fn oversized_length_is_rejected_before_allocating() {
        let bytes = [0xff, 0xff, 0xff, 0x7f, b'a'];
        let error = deserialize::<String>(&bytes).unwrap_err();
        assert!(error.to_string().contains("cannot read string"));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let bytes = [2, 0, 0, 0, 0xc3, 0x28];
        assert!(deserialize::<String>(&bytes).is_err());
    }
}
