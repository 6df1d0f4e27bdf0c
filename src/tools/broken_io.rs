//! Streams that fail partway through, for exercising error paths in tests.

use std::io::{Read,Write,Seek,SeekFrom,ErrorKind};

/// Passes through `limit` bytes of the inner reader, then fails with `ErrorKind::Other`
pub struct BrokenReader<R: Read> {
    inner: R,
    remaining: usize
}

/// Accepts `limit` bytes, then fails with `ErrorKind::Other`
pub struct BrokenWriter {
    remaining: usize
}

impl <R: Read> BrokenReader<R> {
    pub fn new(inner: R,limit: usize) -> Self {
        Self { inner, remaining: limit }
    }
}

impl <R: Read> Read for BrokenReader<R> {
    fn read(&mut self,buf: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 {
            return Err(std::io::Error::new(ErrorKind::Other,"source failed"));
        }
        let n = usize::min(buf.len(),self.remaining);
        let n = self.inner.read(&mut buf[0..n])?;
        self.remaining -= n;
        Ok(n)
    }
}

impl <R: Read + Seek> Seek for BrokenReader<R> {
    fn seek(&mut self,pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl BrokenWriter {
    pub fn new(limit: usize) -> Self {
        Self { remaining: limit }
    }
}

impl Write for BrokenWriter {
    fn write(&mut self,buf: &[u8]) -> std::io::Result<usize> {
        if self.remaining == 0 {
            return Err(std::io::Error::new(ErrorKind::Other,"sink failed"));
        }
        let n = usize::min(buf.len(),self.remaining);
        self.remaining -= n;
        Ok(n)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn fails_after_limit() {
    let mut reader = BrokenReader::new("abcdef".as_bytes(),4);
    let mut buf: [u8;3] = [0;3];
    assert_eq!(reader.read(&mut buf).unwrap(),3);
    assert_eq!(reader.read(&mut buf).unwrap(),1);
    assert_eq!(reader.read(&mut buf).unwrap_err().kind(),ErrorKind::Other);
    let mut writer = BrokenWriter::new(2);
    assert_eq!(writer.write(b"xyz").unwrap(),2);
    assert_eq!(writer.write(b"z").unwrap_err().kind(),ErrorKind::Other);
}
