//! Byte source with a small lookahead buffer.
//! Bytes can be inspected with `peek` before they are consumed with `discard`.

use std::io::{Read,BufReader,ErrorKind};

pub struct PeekReader<R: Read> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,
    bytes_in: u64
}

impl <R: Read> PeekReader<R> {
    /// `size` is the most bytes `peek` will ever return
    pub fn new(inner: R,size: usize) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: vec![0;size],
            start: 0,
            end: 0,
            eof: false,
            bytes_in: 0
        }
    }
    /// Return up to `size` upcoming bytes without consuming them.
    /// Fewer bytes are returned only when the source is exhausted.
    pub fn peek(&mut self) -> std::io::Result<&[u8]> {
        if self.end - self.start < self.buf.len() && !self.eof {
            self.buf.copy_within(self.start..self.end,0);
            self.end -= self.start;
            self.start = 0;
            while self.end < self.buf.len() {
                match self.reader.read(&mut self.buf[self.end..]) {
                    Ok(0) => {
                        self.eof = true;
                        break;
                    },
                    Ok(n) => self.end += n,
                    Err(e) if e.kind()==ErrorKind::Interrupted => {},
                    Err(e) => return Err(e)
                }
            }
        }
        Ok(&self.buf[self.start..self.end])
    }
    /// Skip up to `n` buffered bytes, returns the number skipped
    pub fn discard(&mut self,n: usize) -> usize {
        let n = usize::min(n,self.end - self.start);
        self.start += n;
        self.bytes_in += n as u64;
        n
    }
    /// bytes consumed so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_in
    }
}

#[test]
fn peek_and_discard() {
    let data = "I am Sam. Sam I am.".as_bytes();
    let mut reader = PeekReader::new(data,4);
    assert_eq!(reader.peek().unwrap(),b"I am");
    assert_eq!(reader.peek().unwrap(),b"I am");
    assert_eq!(reader.discard(2),2);
    assert_eq!(reader.peek().unwrap(),b"am S");
    let mut rest = Vec::new();
    loop {
        let buf = reader.peek().unwrap();
        if buf.is_empty() {
            break;
        }
        rest.push(buf[0]);
        reader.discard(1);
    }
    assert_eq!(rest,"am Sam. Sam I am.".as_bytes());
    assert_eq!(reader.bytes_read(),data.len() as u64);
    assert_eq!(reader.discard(5),0);
}
