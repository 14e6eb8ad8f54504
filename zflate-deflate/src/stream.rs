//! `std::io` adapters around [`Deflater`] and [`Inflater`].
//!
//! [`DeflaterWriter`] compresses everything written to it into an inner
//! writer; [`InflaterReader`] decompresses an inner reader. Codec errors are
//! surfaced as [`io::Error`]s with kind `InvalidData` (or `UnexpectedEof` for
//! a truncated stream); the original [`ZflateError`] is kept as the source.

use crate::deflate::Deflater;
use crate::inflate::Inflater;
use std::io::{self, Read, Write};
use zflate_core::error::ZflateError;
use zflate_core::traits::CompressionLevel;

const CHUNK_SIZE: usize = 16 * 1024;

/// Compressing writer.
#[derive(Debug)]
pub struct DeflaterWriter<W: Write> {
    inner: Option<W>,
    deflater: Deflater,
    buf: Vec<u8>,
}

impl<W: Write> DeflaterWriter<W> {
    /// Write a zlib stream at `level` into `inner`.
    pub fn new(inner: W, level: CompressionLevel) -> Self {
        Self::with_deflater(inner, Deflater::new(level))
    }

    /// Write with a preconfigured deflater, e.g. one holding a dictionary.
    pub fn with_deflater(inner: W, deflater: Deflater) -> Self {
        Self {
            inner: Some(inner),
            deflater,
            buf: vec![0; CHUNK_SIZE],
        }
    }

    /// The deflater.
    pub fn deflater(&self) -> &Deflater {
        &self.deflater
    }

    /// The inner writer.
    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    /// Move compressed output to the inner writer until the deflater has
    /// nothing more to say.
    fn drain(&mut self) -> io::Result<()> {
        let Some(inner) = self.inner.as_mut() else {
            return Err(ZflateError::invalid_state("writer already finished").into());
        };
        loop {
            let n = self.deflater.deflate(&mut self.buf)?;
            if n == 0 {
                return Ok(());
            }
            inner.write_all(&self.buf[..n])?;
        }
    }

    fn finish_stream(&mut self) -> io::Result<()> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(());
        };
        self.deflater.finish();
        while !self.deflater.is_finished() {
            let n = self.deflater.deflate(&mut self.buf)?;
            inner.write_all(&self.buf[..n])?;
        }
        inner.flush()
    }

    /// End the stream and return the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.finish_stream()?;
        self.inner
            .take()
            .ok_or_else(|| ZflateError::invalid_state("writer already finished").into())
    }
}

impl<W: Write> Write for DeflaterWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        while !self.deflater.is_needing_input() {
            self.drain()?;
        }
        self.deflater.set_input(data)?;
        self.drain()?;
        Ok(data.len())
    }

    /// Sync flush: everything written so far becomes decodable from the
    /// inner writer's output.
    fn flush(&mut self) -> io::Result<()> {
        self.deflater.flush();
        self.drain()?;
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for DeflaterWriter<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            let _ = self.finish_stream();
        }
    }
}

/// Decompressing reader.
///
/// Reads ahead from the inner reader in chunks, so bytes following the
/// compressed stream may be consumed; they remain visible through
/// [`Inflater::remaining_input`].
#[derive(Debug)]
pub struct InflaterReader<R: Read> {
    inner: R,
    inflater: Inflater,
    buf: Vec<u8>,
}

impl<R: Read> InflaterReader<R> {
    /// Read a zlib stream from `inner`.
    pub fn new(inner: R) -> Self {
        Self::with_inflater(inner, Inflater::new())
    }

    /// Read a raw DEFLATE stream from `inner`.
    pub fn raw(inner: R) -> Self {
        Self::with_inflater(inner, Inflater::raw())
    }

    /// Read with a preconfigured inflater.
    pub fn with_inflater(inner: R, inflater: Inflater) -> Self {
        Self {
            inner,
            inflater,
            buf: vec![0; CHUNK_SIZE],
        }
    }

    /// The inflater.
    pub fn inflater(&self) -> &Inflater {
        &self.inflater
    }

    /// The inflater, to supply a preset dictionary.
    pub fn inflater_mut(&mut self) -> &mut Inflater {
        &mut self.inflater
    }

    /// Pull the next chunk of compressed input.
    ///
    /// Returns `Ok(false)` at the end of the inner reader.
    pub fn fill(&mut self) -> io::Result<bool> {
        let n = self.inner.read(&mut self.buf)?;
        if n == 0 {
            return Ok(false);
        }
        self.inflater.set_input(&self.buf[..n]);
        Ok(true)
    }

    /// The inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// The inflater and the inner reader.
    pub fn into_parts(self) -> (Inflater, R) {
        (self.inflater, self.inner)
    }
}

impl<R: Read> Read for InflaterReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }

        loop {
            let n = self.inflater.inflate(out)?;
            if n > 0 {
                return Ok(n);
            }
            if self.inflater.is_finished() {
                return Ok(0);
            }
            if self.inflater.is_needing_dictionary() {
                return Err(ZflateError::invalid_state(format!(
                    "stream requires preset dictionary {:#010x}",
                    self.inflater.adler()
                ))
                .into());
            }
            if !self.fill()? {
                return Err(ZflateError::unexpected_eof("compressed stream ended early").into());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Vec<u8> {
        (0..50_000u32)
            .map(|i| b"streaming adapters "[(i % 19) as usize] ^ (i / 997) as u8)
            .collect()
    }

    #[test]
    fn test_writer_reader_roundtrip() {
        let data = sample();
        let mut writer = DeflaterWriter::new(Vec::new(), CompressionLevel::DEFAULT);
        for chunk in data.chunks(1000) {
            writer.write_all(chunk).unwrap();
        }
        let compressed = writer.finish().unwrap();
        assert!(compressed.len() < data.len());

        let mut reader = InflaterReader::new(Cursor::new(compressed));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_small_reads() {
        let data = sample();
        let compressed = crate::zlib::zlib_compress(&data, CompressionLevel::FAST).unwrap();
        let mut reader = InflaterReader::new(Cursor::new(compressed));
        let mut out = Vec::new();
        let mut buf = [0u8; 7];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, data);
    }

    #[test]
    fn test_drop_finishes_stream() {
        let mut sink = Vec::new();
        {
            let mut writer = DeflaterWriter::new(&mut sink, CompressionLevel::BEST);
            writer.write_all(b"finished on drop").unwrap();
        }
        assert_eq!(
            crate::zlib::zlib_decompress(&sink).unwrap(),
            b"finished on drop"
        );
    }

    #[test]
    fn test_flush_exposes_data() {
        let mut writer = DeflaterWriter::new(Vec::new(), CompressionLevel::DEFAULT);
        writer.write_all(b"flushed line\n").unwrap();
        writer.flush().unwrap();
        let partial = writer.get_ref().unwrap().clone();

        let mut inflater = Inflater::new();
        inflater.set_input(&partial);
        let mut buf = [0u8; 32];
        let n = inflater.inflate(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"flushed line\n");
    }

    #[test]
    fn test_truncated_input_is_unexpected_eof() {
        let compressed =
            crate::zlib::zlib_compress(&sample(), CompressionLevel::DEFAULT).unwrap();
        let truncated = &compressed[..compressed.len() / 2];
        let mut reader = InflaterReader::new(Cursor::new(truncated));
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_corrupt_input_is_invalid_data() {
        let mut compressed = crate::zlib::zlib_compress(b"checksum me", CompressionLevel::DEFAULT)
            .unwrap();
        let last = compressed.len() - 1;
        compressed[last] ^= 0x01;
        let mut reader = InflaterReader::new(Cursor::new(compressed));
        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_reader_with_dictionary() {
        let dict = b"common prefix material";
        let data = b"common prefix material with a twist";
        let compressed =
            crate::zlib::zlib_compress_with_dict(data, dict, CompressionLevel::DEFAULT).unwrap();

        let mut reader = InflaterReader::new(Cursor::new(compressed));
        let mut buf = [0u8; 64];
        assert!(reader.read(&mut buf).is_err());
        assert!(reader.inflater().is_needing_dictionary());
        reader.inflater_mut().set_dictionary(dict).unwrap();

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
