//! LZ77 Compression
//!
//! Output is a sequence of blocks.  A block is an 8 bit header followed by at most 8 units.
//! Bit `i` of the header (counting from the MSB) tells the type of unit `i`:
//! * 0 - literal byte
//! * 1 - reference, 16 bit little endian, length in the upper 4 bits, distance in the lower 12
//!
//! The last block can be short, the stream simply ends after its last unit.
//! Window and lookahead sizes are fixed so that a reference packs into 16 bits.
//! The window starts out filled with zeros on both sides.

use std::io::{Cursor,Read,Write,BufWriter,ErrorKind};
use crate::tools::bits::{BitReader,BitWriter};
use crate::tools::dictionary::{Dictionary,DictKey,KEY_SIZE};
use crate::tools::peek_reader::PeekReader;
use crate::tools::ring_buffer::RingBuffer;
use crate::DYNERR;

const REF_LEN_BITS: usize = 4;
const REF_DIST_BITS: usize = 12;
const LOOKAHEAD: usize = (1 << REF_LEN_BITS) - 1;
const WIN_SIZE: usize = (1 << REF_DIST_BITS) - 1;
const UNITS_PER_BLOCK: usize = 8;

/// Points back into the window.  Zero length means no match.
#[derive(Clone,Copy,Debug,Default,PartialEq)]
struct Reference {
    length: u16,
    distance: u16
}

impl Reference {
    fn pack(&self) -> u16 {
        (self.length << REF_DIST_BITS) | self.distance
    }
    fn unpack(val: u16) -> Self {
        Self {
            length: val >> REF_DIST_BITS,
            distance: val & (u16::MAX >> REF_LEN_BITS)
        }
    }
}

enum Unit {
    Literal(u8),
    Reference(Reference)
}

/// Window of recent bytes used on the expansion side
struct Window {
    buf: RingBuffer<u8>
}

impl Window {
    fn new(size: usize) -> Self {
        Self {
            buf: RingBuffer::create(0,size)
        }
    }
    fn push(&mut self,byte: u8) {
        self.buf.push(byte);
    }
    /// Write the referenced bytes to `out`, appending each to the window as we go.
    /// The start index stays put while the window slides, so the reference can
    /// overlap bytes it is producing.
    fn expand_reference<W: Write>(&mut self,out: &mut W,reference: Reference) -> std::io::Result<()> {
        let start = self.buf.len() - reference.distance as usize;
        for _i in 0..reference.length {
            let byte = self.buf.get(start);
            out.write_all(&[byte])?;
            self.buf.push(byte);
        }
        Ok(())
    }
}

/// Window of recent bytes plus the dictionary that indexes it, used on the compression side
struct EncoderWindow {
    buf: RingBuffer<u8>,
    dictionary: Dictionary,
    /// stream position of the byte just past the window, starts at the window size
    /// so that positions of the zero fill are never negative
    pos: i64
}

impl EncoderWindow {
    fn new(size: usize) -> Self {
        Self {
            buf: RingBuffer::create(0,size),
            dictionary: Dictionary::new(),
            pos: size as i64
        }
    }
    fn key(&self,idx: usize) -> DictKey {
        let mut ans: DictKey = [0;KEY_SIZE];
        for (j,byte) in ans.iter_mut().enumerate() {
            *byte = self.buf.get(idx + j);
        }
        ans
    }
    /// Slide `data` into the window.  Keys leaving the window are pruned from the
    /// dictionary, and every key that ends in the new data is added.
    fn append(&mut self,data: &[u8]) {
        let size = self.buf.len() as i64;
        self.pos += data.len() as i64;
        for i in 0..data.len() {
            let key = self.key(i);
            self.dictionary.remove_lesser_than(&key,self.pos - size + i as i64);
        }
        self.buf.extend(data);
        let last = self.buf.len() - KEY_SIZE;
        let first = (last + 1).saturating_sub(data.len());
        for idx in first..=last {
            let key = self.key(idx);
            self.dictionary.add(key,self.pos - size + idx as i64);
        }
    }
    /// Find the longest prefix of `input` that starts in the window.
    /// Matches cannot run past the end of the window.  The earliest of equal
    /// length matches wins.  Returns a zero reference if there is no match.
    fn find_longest_prefix(&self,input: &[u8]) -> Reference {
        if input.len() < KEY_SIZE {
            return Reference::default();
        }
        let size = self.buf.len();
        let base = self.pos - size as i64;
        let mut key: DictKey = [0;KEY_SIZE];
        key.copy_from_slice(&input[0..KEY_SIZE]);
        let mut start = 0;
        let mut length = 0;
        for pos in self.dictionary.get(&key) {
            if pos < base {
                continue;
            }
            let i = (pos - base) as usize;
            let mut j = 0;
            while j < input.len() && i + j < size && self.buf.get(i + j) == input[j] {
                j += 1;
            }
            if j > length {
                start = i;
                length = j;
            }
        }
        if length == 0 {
            return Reference::default();
        }
        Reference {
            length: length as u16,
            distance: (size - start) as u16
        }
    }
}

/// Main compression function.
/// `expanded_in` is an object with `Read` trait, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `compressed_out` is an object with `Write` trait, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error.
pub fn compress<R,W>(expanded_in: &mut R, compressed_out: &mut W) -> Result<(u64,u64),DYNERR>
where R: Read, W: Write {
    let mut reader = PeekReader::new(expanded_in,LOOKAHEAD);
    let mut writer = BitWriter::new(compressed_out);
    let mut window = EncoderWindow::new(WIN_SIZE);
    let mut units: Vec<Unit> = Vec::with_capacity(UNITS_PER_BLOCK);
    let mut block_count = 0;

    log::debug!("entering loop over blocks");
    loop {
        let mut header: u8 = 0;
        units.clear();
        for i in 0..UNITS_PER_BLOCK {
            let lookahead = reader.peek()?;
            if lookahead.is_empty() {
                break;
            }
            let reference = window.find_longest_prefix(lookahead);
            if reference.length == 0 {
                let byte = lookahead[0];
                window.append(&[byte]);
                reader.discard(1);
                log::trace!("literal {}",byte);
                units.push(Unit::Literal(byte));
            } else {
                let length = reference.length as usize;
                window.append(&lookahead[0..length]);
                reader.discard(length);
                log::trace!("reference {:?}",reference);
                header |= 0x80 >> i;
                units.push(Unit::Reference(reference));
            }
        }
        if units.is_empty() {
            break;
        }
        writer.write_byte(header)?;
        for unit in &units {
            match unit {
                Unit::Literal(byte) => writer.write_byte(*byte)?,
                Unit::Reference(reference) => writer.write_u16(reference.pack())?
            }
        }
        block_count += 1;
    }
    log::debug!("wrote {} blocks, dictionary holds {} keys in {} buckets",block_count,
        window.dictionary.len(),window.dictionary.bucket_count());
    writer.flush()?;
    Ok((reader.bytes_read(),writer.bytes_written()))
}

/// Main decompression function.
/// `compressed_in` is an object with `Read` trait, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `expanded_out` is an object with `Write` trait, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error.  The data may end at any header or unit boundary,
/// but not inside a reference.
pub fn expand<R,W>(compressed_in: &mut R, expanded_out: &mut W) -> Result<(u64,u64),DYNERR>
where R: Read, W: Write {
    let mut reader = BitReader::new(compressed_in);
    let mut writer = BufWriter::new(expanded_out);
    let mut window = Window::new(WIN_SIZE);
    let mut out_size: u64 = 0;

    log::debug!("entering loop over blocks");
    'blocks: loop {
        let header = match reader.read_byte() {
            Ok(h) => h,
            Err(e) if e.kind()==ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(Box::new(e))
        };
        for i in 0..UNITS_PER_BLOCK {
            // end of data at the start of a unit ends a short block
            let unit_start = reader.bytes_read();
            if header & (0x80 >> i) == 0 {
                let byte = match reader.read_byte() {
                    Ok(b) => b,
                    Err(e) if e.kind()==ErrorKind::UnexpectedEof => break 'blocks,
                    Err(e) => return Err(Box::new(e))
                };
                writer.write_all(&[byte])?;
                window.push(byte);
                out_size += 1;
            } else {
                let packed = match reader.read_u16() {
                    Ok(val) => val,
                    Err(e) if e.kind()==ErrorKind::UnexpectedEof && reader.bytes_read()==unit_start => break 'blocks,
                    Err(e) => return Err(Box::new(e))
                };
                let reference = Reference::unpack(packed);
                if reference.distance == 0 {
                    log::error!("reference with zero distance");
                    return Err(Box::new(crate::Error::FileFormatMismatch));
                }
                log::trace!("reference {:?}",reference);
                window.expand_reference(&mut writer,reference)?;
                out_size += reference.length as u64;
            }
        }
    }
    log::debug!("end of data, closing stream");
    writer.flush()?;
    Ok((reader.bytes_read(),out_size))
}

/// Convenience function, calls `compress` with a slice returning a Vec
pub fn compress_slice(slice: &[u8]) -> Result<Vec<u8>,DYNERR> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    compress(&mut src,&mut ans)?;
    Ok(ans.into_inner())
}

/// Convenience function, calls `expand` with a slice returning a Vec
pub fn expand_slice(slice: &[u8]) -> Result<Vec<u8>,DYNERR> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    expand(&mut src,&mut ans)?;
    Ok(ans.into_inner())
}

// *************** TESTS *****************

#[cfg(test)]
use crate::tools::broken_io::{BrokenReader,BrokenWriter};

#[cfg(test)]
fn window_contents(buf: &RingBuffer<u8>) -> Vec<u8> {
    (0..buf.len()).map(|i| buf.get(i)).collect()
}

#[test]
fn reference_packing() {
    let reference = Reference { length: 0b1000, distance: 0b100111100110 };
    assert_eq!(reference.pack(),0b10001001_11100110);
    assert_eq!(Reference::unpack(0b10001001_11100110),reference);
    for (length,distance) in [(0,0),(15,4095),(1,1),(15,0),(0,4095),(7,2048)] {
        let reference = Reference { length, distance };
        assert_eq!(Reference::unpack(reference.pack()),reference);
    }
}

#[test]
fn encoder_window() {
    let mut window = EncoderWindow::new(4);
    window.append(&[4,9,1]);
    assert_eq!(window_contents(&window.buf),vec![0,4,9,1]);
    assert_eq!(window.pos,7);
    assert_eq!(window.dictionary.get(&[0,4]).collect::<Vec<i64>>(),vec![3]);
    assert_eq!(window.dictionary.get(&[4,9]).collect::<Vec<i64>>(),vec![4]);
    assert_eq!(window.dictionary.get(&[9,1]).collect::<Vec<i64>>(),vec![5]);

    window.append(&[3,2]);
    assert_eq!(window_contents(&window.buf),vec![9,1,3,2]);
    assert_eq!(window.pos,9);
    assert_eq!(window.dictionary.get(&[0,4]).next(),None);
    assert_eq!(window.dictionary.get(&[4,9]).next(),None);
    assert_eq!(window.dictionary.get(&[9,1]).collect::<Vec<i64>>(),vec![5]);
    assert_eq!(window.dictionary.get(&[1,3]).collect::<Vec<i64>>(),vec![6]);
    assert_eq!(window.dictionary.get(&[3,2]).collect::<Vec<i64>>(),vec![7]);

    assert_eq!(window.find_longest_prefix(&[1,3]),Reference { length: 2, distance: 3 });
    assert_eq!(window.find_longest_prefix(&[0,1]),Reference::default());
    assert_eq!(window.find_longest_prefix(&[1,3,6]),Reference { length: 2, distance: 3 });
    assert_eq!(window.find_longest_prefix(&[1]),Reference::default());
}

#[test]
fn no_prior_occurrence() {
    let mut window = EncoderWindow::new(WIN_SIZE);
    assert_eq!(window.find_longest_prefix(b"ab"),Reference::default());
    window.append(b"xyz");
    assert_eq!(window.find_longest_prefix(b"ab"),Reference::default());
    assert_eq!(window.find_longest_prefix(b"yz"),Reference { length: 2, distance: 2 });
}

#[test]
fn stale_positions_are_pruned() {
    let mut window = EncoderWindow::new(16);
    window.append(b"ab");
    assert_eq!(window.dictionary.get(b"ab").next(),Some(window.pos - 2));
    for _i in 0..40 {
        window.append(b"c");
        if let Some(pos) = window.dictionary.get(b"ab").next() {
            assert!(pos >= window.pos - 16);
        }
    }
    assert_eq!(window.dictionary.get(b"ab").next(),None);
}

#[test]
fn window_expansion() {
    let mut window = Window::new(4);
    for byte in [9,1,3,2] {
        window.push(byte);
    }
    let mut out: Vec<u8> = Vec::new();
    window.expand_reference(&mut out,Reference { length: 3, distance: 4 }).unwrap();
    assert_eq!(out,vec![9,1,3]);
    assert_eq!(window_contents(&window.buf),vec![2,9,1,3]);
    // overlapping reference repeats the last byte
    let mut out: Vec<u8> = Vec::new();
    window.expand_reference(&mut out,Reference { length: 5, distance: 1 }).unwrap();
    assert_eq!(out,vec![3,3,3,3,3]);
}

#[test]
fn compression_works() {
    let compressed = compress_slice("aaaaaaaaaaaaaaaa".as_bytes()).expect("compression failed");
    assert_eq!(compressed,hex::decode("386161022004400880").unwrap());
    assert!(compressed[0] != 0,"expected at least one reference");
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(expanded,"aaaaaaaaaaaaaaaa".as_bytes().to_vec());

    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let lz77_str = "024920616d205304202eb80540200e400a201420646f20006e6f74206c696b650420746869731da00a";
    let compressed = compress_slice(test_data).expect("compression failed");
    assert_eq!(compressed,hex::decode(lz77_str).unwrap());
}

#[test]
fn empty_input() {
    assert_eq!(compress_slice(&[]).expect("compression failed"),Vec::<u8>::new());
    assert_eq!(expand_slice(&[]).expect("expansion failed"),Vec::<u8>::new());
}

#[test]
fn truncated_reference() {
    let compressed = compress_slice("aaaaaaaaaaaaaaaa".as_bytes()).expect("compression failed");
    // cut inside the last reference
    let err = expand_slice(&compressed[0..compressed.len()-1]).expect_err("truncated reference should fail");
    let io_err = err.downcast_ref::<std::io::Error>().expect("not an io error");
    assert_eq!(io_err.kind(),ErrorKind::UnexpectedEof);
    // cut at a unit boundary
    let expanded = expand_slice(&compressed[0..5]).expect("expansion failed");
    assert_eq!(expanded,"aaaa".as_bytes().to_vec());
}

#[test]
fn zero_distance() {
    let err = expand_slice(&[0x80,0x00,0x30]).expect_err("zero distance should fail");
    assert!(matches!(err.downcast_ref::<crate::Error>(),Some(crate::Error::FileFormatMismatch)));
}

#[test]
fn sizes() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let mut ans: Vec<u8> = Vec::new();
    let (in_size,out_size) = compress(&mut &test_data[..],&mut ans).expect("compression failed");
    assert_eq!((in_size,out_size),(test_data.len() as u64,ans.len() as u64));
    let (in_size,out_size) = expand(&mut &ans[..],&mut Vec::<u8>::new()).expect("expansion failed");
    assert_eq!((in_size,out_size),(ans.len() as u64,test_data.len() as u64));
}

#[test]
fn invertibility() {
    let test_data = "aösdkfjaöslkdfjaösldkjfaösldkjföalsdkjflaskjdhfakjsdflkdsajhfaksdjhflsakdjhf".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);

    // long enough for the window to wrap many times
    let mut test_data: Vec<u8> = Vec::new();
    for i in 0..3000u32 {
        test_data.extend_from_slice(format!("line {} of {}\n",i % 97,i / 13).as_bytes());
    }
    let compressed = compress_slice(&test_data).expect("compression failed");
    assert!(compressed.len() < test_data.len());
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(test_data,expanded);

    for test_data in [vec![0u8],vec![0u8;100],vec![7u8,7]] {
        let compressed = compress_slice(&test_data).expect("compression failed");
        let expanded = expand_slice(&compressed).expect("expansion failed");
        assert_eq!(test_data,expanded);
    }
}

#[test]
fn stream_failures() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    let err = compress(&mut BrokenReader::new(test_data,10),&mut Vec::<u8>::new())
        .expect_err("reader failure should propagate");
    assert_eq!(err.downcast_ref::<std::io::Error>().expect("not an io error").kind(),ErrorKind::Other);
    let err = compress(&mut &test_data[..],&mut BrokenWriter::new(5))
        .expect_err("writer failure should propagate");
    assert_eq!(err.downcast_ref::<std::io::Error>().expect("not an io error").kind(),ErrorKind::Other);
    let err = expand(&mut BrokenReader::new(&compressed[..],10),&mut Vec::<u8>::new())
        .expect_err("reader failure should propagate");
    assert_eq!(err.downcast_ref::<std::io::Error>().expect("not an io error").kind(),ErrorKind::Other);
    let err = expand(&mut &compressed[..],&mut BrokenWriter::new(5))
        .expect_err("writer failure should propagate");
    assert_eq!(err.downcast_ref::<std::io::Error>().expect("not an io error").kind(),ErrorKind::Other);
}
