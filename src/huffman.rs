//! Static Huffman Coding
//!
//! The input is scanned twice, first to count byte frequencies, then to encode.
//! The compressed stream is laid out as follows:
//! * code tree, pre-order, a leaf is bit 1 followed by its 8 bit symbol, a branch is bit 0
//!   followed by its left and right subtrees
//! * size of the expanded data, 64 bit little endian
//! * codeword of every input byte, left edges are 0 and right edges are 1
//! * zero bits to pad out the last byte
//!
//! Bits are packed MSB first.  Empty input cannot be encoded since there is no tree to write.

use bit_vec::BitVec;
use std::io::{Cursor,Read,Write,Seek,SeekFrom,BufReader,BufWriter};
use crate::tools::bits::{BitReader,BitWriter};
use crate::tools::priority_queue::PriorityQueue;
use crate::DYNERR;

/// 256 leaves can be at most this deep
const MAX_TREE_DEPTH: usize = 255;

/// Occurrences of each byte value
type FrequencyTable = [u64;256];

/// A leaf has no children, a branch always has two
#[derive(Debug,PartialEq)]
enum CodeTree {
    Leaf(u8),
    Branch(Box<CodeTree>,Box<CodeTree>)
}

/// Codeword for each byte value, empty for symbols that are not in the tree
struct CodeTable {
    codes: Vec<BitVec>
}

/// Count the bytes remaining in `reader`, returns the total count
fn count_frequencies<R: Read>(reader: &mut R,freqs: &mut FrequencyTable) -> std::io::Result<u64> {
    let mut buf: [u8;4096] = [0;4096];
    let mut total: u64 = 0;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind()==std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e)
        };
        for byte in &buf[0..n] {
            freqs[*byte as usize] += 1;
        }
        total += n as u64;
    }
}

impl CodeTree {
    /// Build the tree by repeatedly merging the two least frequent subtrees.
    /// Returns `None` if every frequency is zero.
    fn build(freqs: &FrequencyTable) -> Option<Self> {
        let mut queue = PriorityQueue::new();
        for (symbol,freq) in freqs.iter().enumerate() {
            if *freq > 0 {
                queue.append(CodeTree::Leaf(symbol as u8),*freq);
            }
        }
        queue.init();
        while queue.len() >= 2 {
            let (left,right) = match (queue.pop(),queue.pop()) {
                (Some(l),Some(r)) => (l,r),
                _ => return None
            };
            queue.push(CodeTree::Branch(Box::new(left.value),Box::new(right.value)),left.frequency + right.frequency);
        }
        queue.pop().map(|item| item.value)
    }
    fn encode_to<W: Write>(&self,writer: &mut BitWriter<W>) -> std::io::Result<()> {
        match self {
            CodeTree::Leaf(symbol) => {
                writer.write_bit(true)?;
                writer.write_byte(*symbol)
            },
            CodeTree::Branch(left,right) => {
                writer.write_bit(false)?;
                left.encode_to(writer)?;
                right.encode_to(writer)
            }
        }
    }
    /// Read the subtree rooted at `depth`, a node deeper than any valid tree allows is an error
    fn decode_from<R: Read>(reader: &mut BitReader<R>,depth: usize) -> Result<Self,DYNERR> {
        if depth > MAX_TREE_DEPTH {
            log::error!("code tree deeper than {}",MAX_TREE_DEPTH);
            return Err(Box::new(crate::Error::FileFormatMismatch));
        }
        if reader.read_bit()? {
            return Ok(CodeTree::Leaf(reader.read_byte()?));
        }
        let left = Self::decode_from(reader,depth + 1)?;
        let right = Self::decode_from(reader,depth + 1)?;
        Ok(CodeTree::Branch(Box::new(left),Box::new(right)))
    }
    /// Walk from the root to a leaf, one bit per branch.
    /// A tree that is a single leaf consumes no bits.
    fn read_symbol<R: Read>(&self,reader: &mut BitReader<R>) -> std::io::Result<u8> {
        let mut node = self;
        loop {
            match node {
                CodeTree::Leaf(symbol) => return Ok(*symbol),
                CodeTree::Branch(left,right) => {
                    node = match reader.read_bit()? {
                        true => right.as_ref(),
                        false => left.as_ref()
                    };
                }
            }
        }
    }
}

impl CodeTable {
    fn create(tree: &CodeTree) -> Self {
        let mut table = Self {
            codes: vec![BitVec::new();256]
        };
        let mut code = BitVec::new();
        table.visit(tree,&mut code);
        table
    }
    fn visit(&mut self,node: &CodeTree,code: &mut BitVec) {
        match node {
            CodeTree::Leaf(symbol) => {
                log::trace!("symbol {} has code {:?}",symbol,code);
                self.codes[*symbol as usize] = code.clone();
            },
            CodeTree::Branch(left,right) => {
                code.push(false);
                self.visit(left,code);
                code.pop();
                code.push(true);
                self.visit(right,code);
                code.pop();
            }
        }
    }
    fn get(&self,symbol: u8) -> &BitVec {
        &self.codes[symbol as usize]
    }
}

/// Main compression function.
/// `expanded_in` is an object with `Read` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// It is read from its current position to the end, twice.
/// `compressed_out` is an object with `Write` trait, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error, empty input gives `Error::NoData`.
pub fn compress<R,W>(expanded_in: &mut R, compressed_out: &mut W) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write {
    let mut reader = BufReader::new(expanded_in);
    let start = reader.stream_position()?;
    let mut freqs: FrequencyTable = [0;256];
    log::debug!("counting frequencies");
    let expanded_length = count_frequencies(&mut reader,&mut freqs)?;
    let tree = match CodeTree::build(&freqs) {
        Some(tree) => tree,
        None => return Err(Box::new(crate::Error::NoData))
    };
    let table = CodeTable::create(&tree);
    log::debug!("code tree built for {} bytes",expanded_length);
    reader.seek(SeekFrom::Start(start))?;
    let mut writer = BitWriter::new(compressed_out);
    tree.encode_to(&mut writer)?;
    writer.write_i64(expanded_length as i64)?;
    log::debug!("encoding data");
    let mut buf: [u8;4096] = [0;4096];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind()==std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Box::new(e))
        };
        for byte in &buf[0..n] {
            writer.write_bits(table.get(*byte))?;
        }
    }
    writer.flush()?;
    Ok((expanded_length,writer.bytes_written()))
}

/// Main decompression function.
/// `compressed_in` is an object with `Read` trait, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `expanded_out` is an object with `Write` trait, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error.  Running out of data before the recorded size is reached
/// is an error of kind `UnexpectedEof`, a malformed code tree is `Error::FileFormatMismatch`.
/// The output size comes from the stream header.  If the tree is a single leaf no codeword bits
/// are read at all, so a corrupt header can ask for an arbitrarily large output.
pub fn expand<R,W>(compressed_in: &mut R, expanded_out: &mut W) -> Result<(u64,u64),DYNERR>
where R: Read, W: Write {
    let mut reader = BitReader::new(compressed_in);
    let mut writer = BufWriter::new(expanded_out);
    log::debug!("decoding code tree");
    let tree = CodeTree::decode_from(&mut reader,0)?;
    let byte_count = reader.read_i64()?;
    log::debug!("expanding {} bytes",byte_count);
    let mut out_size: u64 = 0;
    for _i in 0..byte_count.max(0) {
        let symbol = tree.read_symbol(&mut reader)?;
        writer.write_all(&[symbol])?;
        out_size += 1;
    }
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
const DIGITS: &str = "45621354622615342165326143453614216346214";

#[cfg(test)]
fn code_string(code: &BitVec) -> String {
    code.iter().map(|b| if b {'1'} else {'0'}).collect()
}

#[cfg(test)]
fn digit_frequencies() -> FrequencyTable {
    let mut freqs: FrequencyTable = [0;256];
    let total = count_frequencies(&mut DIGITS.as_bytes(),&mut freqs).expect("count failed");
    assert_eq!(total,41);
    freqs
}

#[test]
fn frequencies() {
    let freqs = digit_frequencies();
    assert_eq!(freqs[b'1' as usize],7);
    assert_eq!(freqs[b'2' as usize],7);
    assert_eq!(freqs[b'3' as usize],6);
    assert_eq!(freqs[b'4' as usize],8);
    assert_eq!(freqs[b'5' as usize],5);
    assert_eq!(freqs[b'6' as usize],8);
    assert_eq!(freqs.iter().sum::<u64>(),41);
}

#[test]
fn code_lengths() {
    let tree = CodeTree::build(&digit_frequencies()).expect("no tree");
    let table = CodeTable::create(&tree);
    for (symbol,len) in [(b'4',2),(b'6',2),(b'1',3),(b'2',3),(b'3',3),(b'5',3)] {
        assert_eq!(table.get(symbol).len(),len,"symbol {}",symbol as char);
    }
    assert!(table.get(b'7').is_empty());
}

#[test]
fn code_table() {
    let tree = CodeTree::build(&digit_frequencies()).expect("no tree");
    let table = CodeTable::create(&tree);
    assert_eq!(code_string(table.get(b'4')),"00");
    assert_eq!(code_string(table.get(b'6')),"01");
    assert_eq!(code_string(table.get(b'5')),"100");
    assert_eq!(code_string(table.get(b'3')),"101");
    assert_eq!(code_string(table.get(b'2')),"110");
    assert_eq!(code_string(table.get(b'1')),"111");
}

#[test]
fn tree_encoding() {
    let tree = CodeTree::build(&digit_frequencies()).expect("no tree");
    let mut ans: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut ans);
    tree.encode_to(&mut writer).expect("encoding failed");
    writer.flush().expect("flush failed");
    drop(writer);
    assert_eq!(ans,hex::decode("2693626b334ca620").unwrap());
    let mut reader = BitReader::new(&ans[..]);
    let decoded = CodeTree::decode_from(&mut reader,0).expect("decoding failed");
    assert_eq!(decoded,tree);
}

#[test]
fn compression_works() {
    let compressed = compress_slice(DIGITS.as_bytes()).expect("compression failed");
    let expected = "2693626b334ca625200000000000000477b0767ca6ecb9e52579bb4770";
    assert_eq!(compressed,hex::decode(expected).unwrap());
}

#[test]
fn single_symbol() {
    // tree is one leaf, codewords are empty
    let compressed = compress_slice("zzzz".as_bytes()).expect("compression failed");
    assert_eq!(compressed,hex::decode("bd020000000000000000").unwrap());
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(expanded,"zzzz".as_bytes().to_vec());
}

#[test]
fn empty_input() {
    let err = compress_slice(&[]).expect_err("empty input should fail");
    assert!(matches!(err.downcast_ref::<crate::Error>(),Some(crate::Error::NoData)));
}

#[test]
fn truncated_input() {
    let compressed = compress_slice(DIGITS.as_bytes()).expect("compression failed");
    for len in [0,5,12,20] {
        let err = expand_slice(&compressed[0..len]).expect_err("truncated data should fail");
        let io_err = err.downcast_ref::<std::io::Error>().expect("not an io error");
        assert_eq!(io_err.kind(),std::io::ErrorKind::UnexpectedEof);
    }
}

#[test]
fn sizes() {
    let mut src = Cursor::new(DIGITS.as_bytes());
    let mut ans: Vec<u8> = Vec::new();
    let (in_size,out_size) = compress(&mut src,&mut ans).expect("compression failed");
    assert_eq!((in_size,out_size),(41,29));
    let (in_size,out_size) = expand(&mut &ans[..],&mut Vec::<u8>::new()).expect("expansion failed");
    assert_eq!((in_size,out_size),(29,41));
}

#[test]
fn invertibility() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);

    let test_data: Vec<u8> = (0..20000u32).map(|i| ((i * 7919) % 251) as u8 ^ (i % 3) as u8).collect();
    let compressed = compress_slice(&test_data).expect("compression failed");
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(test_data,expanded);

    let test_data = [0x5a];
    let compressed = compress_slice(&test_data).expect("compression failed");
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);
}

#[test]
fn negative_byte_count() {
    // leaf 'z', byte count -1, then padding
    let expanded = expand_slice(&hex::decode("bd7fffffffffffffff80").unwrap()).expect("expansion failed");
    assert_eq!(expanded,Vec::<u8>::new());
}

#[cfg(test)]
fn skewed_tree(depth: usize) -> CodeTree {
    let mut tree = CodeTree::Leaf(255);
    for i in 0..depth {
        tree = CodeTree::Branch(Box::new(CodeTree::Leaf(i as u8)),Box::new(tree));
    }
    tree
}

#[test]
fn tree_depth_limit() {
    for (depth,ok) in [(MAX_TREE_DEPTH,true),(MAX_TREE_DEPTH+1,false)] {
        let mut ans: Vec<u8> = Vec::new();
        let mut writer = BitWriter::new(&mut ans);
        skewed_tree(depth).encode_to(&mut writer).expect("encoding failed");
        writer.flush().expect("flush failed");
        drop(writer);
        let result = CodeTree::decode_from(&mut BitReader::new(&ans[..]),0);
        match ok {
            true => assert_eq!(result.expect("decoding failed"),skewed_tree(depth)),
            false => {
                let err = result.expect_err("tree too deep");
                assert!(matches!(err.downcast_ref::<crate::Error>(),Some(crate::Error::FileFormatMismatch)));
            }
        }
    }
    // all zero bits would be an endless chain of branches
    let err = expand_slice(&vec![0u8;200_000]).expect_err("corrupt tree should fail");
    assert!(matches!(err.downcast_ref::<crate::Error>(),Some(crate::Error::FileFormatMismatch)));
}

#[test]
fn stream_failures() {
    let compressed = compress_slice(DIGITS.as_bytes()).expect("compression failed");
    let err = compress(&mut BrokenReader::new(Cursor::new(DIGITS.as_bytes()),10),&mut Vec::<u8>::new())
        .expect_err("reader failure should propagate");
    assert_eq!(err.downcast_ref::<std::io::Error>().expect("not an io error").kind(),std::io::ErrorKind::Other);
    let err = compress(&mut Cursor::new(DIGITS.as_bytes()),&mut BrokenWriter::new(5))
        .expect_err("writer failure should propagate");
    assert_eq!(err.downcast_ref::<std::io::Error>().expect("not an io error").kind(),std::io::ErrorKind::Other);
    let err = expand(&mut BrokenReader::new(&compressed[..],10),&mut Vec::<u8>::new())
        .expect_err("reader failure should propagate");
    assert_eq!(err.downcast_ref::<std::io::Error>().expect("not an io error").kind(),std::io::ErrorKind::Other);
    let err = expand(&mut &compressed[..],&mut BrokenWriter::new(5))
        .expect_err("writer failure should propagate");
    assert_eq!(err.downcast_ref::<std::io::Error>().expect("not an io error").kind(),std::io::ErrorKind::Other);
}
