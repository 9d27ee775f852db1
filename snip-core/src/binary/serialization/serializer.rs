use std::io::{Seek, SeekFrom, Write};

use crate::binary::{Error, ErrorKind, ResultMapToBinaryErrorExt};

#[derive(Debug, Clone, Copy)]
pub struct Serializer<W> {
    stream: W,
}

impl<W> Serializer<W> {
    pub fn new(writer: W) -> Self {
        Self { stream: writer }
    }

    pub fn into_inner(self) -> W {
        self.stream
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error>
    where
        W: Write,
    {
        self.stream
            .write_all(bytes)
            .map_err_to_binary_error(ErrorKind::Serialize)
    }

    pub fn stream_position(&mut self) -> Result<u64, Error>
    where
        W: Seek,
    {
        self.stream
            .stream_position()
            .map_err_to_binary_error(ErrorKind::Serialize)
    }

    pub fn seek(&mut self, whence: SeekFrom) -> Result<u64, Error>
    where
        W: Seek,
    {
        self.stream
            .seek(whence)
            .map_err_to_binary_error(ErrorKind::Serialize)
    }
}
