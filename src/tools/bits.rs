//! Bit level access to byte streams.
//! Bits are packed MSB first, multi-byte integers are little endian.
//! The writer pads the final partial byte with zeros when flushed.

use bit_vec::BitVec;
use std::io::{Read,Write,BufReader,BufWriter};

/// Buffers bits into bytes and forwards them to a byte sink
pub struct BitWriter<W: Write> {
    writer: BufWriter<W>,
    /// bits accumulated so far, first bit in the MSB
    acc: u8,
    /// number of bits in `acc`
    count: u8,
    bytes_out: u64
}

/// Reads bits from a byte source, one byte is held back at a time
pub struct BitReader<R: Read> {
    reader: BufReader<R>,
    acc: u8,
    /// bits of `acc` already consumed, 8 means we need another byte
    used: u8,
    bytes_in: u64
}

impl <W: Write> BitWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
            acc: 0,
            count: 0,
            bytes_out: 0
        }
    }
    fn put_byte(&mut self,byte: u8) -> std::io::Result<()> {
        self.writer.write_all(&[byte])?;
        self.bytes_out += 1;
        Ok(())
    }
    pub fn write_bit(&mut self,bit: bool) -> std::io::Result<()> {
        if bit {
            self.acc |= 0x80 >> self.count;
        }
        self.count += 1;
        if self.count == 8 {
            let byte = self.acc;
            self.acc = 0;
            self.count = 0;
            self.put_byte(byte)?;
        }
        Ok(())
    }
    pub fn write_bits(&mut self,bits: &BitVec) -> std::io::Result<()> {
        for bit in bits.iter() {
            self.write_bit(bit)?;
        }
        Ok(())
    }
    /// write 8 bits, MSB first
    pub fn write_byte(&mut self,byte: u8) -> std::io::Result<()> {
        if self.count == 0 {
            return self.put_byte(byte);
        }
        for i in 0..8 {
            self.write_bit(byte & (0x80 >> i) > 0)?;
        }
        Ok(())
    }
    pub fn write_u16(&mut self,val: u16) -> std::io::Result<()> {
        for byte in val.to_le_bytes() {
            self.write_byte(byte)?;
        }
        Ok(())
    }
    pub fn write_i64(&mut self,val: i64) -> std::io::Result<()> {
        for byte in val.to_le_bytes() {
            self.write_byte(byte)?;
        }
        Ok(())
    }
    /// Pad any partial byte with zeros and flush everything to the sink
    pub fn flush(&mut self) -> std::io::Result<()> {
        if self.count > 0 {
            let byte = self.acc;
            self.acc = 0;
            self.count = 0;
            self.put_byte(byte)?;
        }
        self.writer.flush()
    }
    /// bytes handed to the sink so far, including a padded byte after `flush`
    pub fn bytes_written(&self) -> u64 {
        self.bytes_out
    }
}

impl <R: Read> BitReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            acc: 0,
            used: 8,
            bytes_in: 0
        }
    }
    fn get_byte(&mut self) -> std::io::Result<u8> {
        let mut by: [u8;1] = [0];
        self.reader.read_exact(&mut by)?;
        self.bytes_in += 1;
        Ok(by[0])
    }
    /// Get the next bit, end of stream is `ErrorKind::UnexpectedEof`
    pub fn read_bit(&mut self) -> std::io::Result<bool> {
        if self.used == 8 {
            self.acc = self.get_byte()?;
            self.used = 0;
        }
        let bit = self.acc & (0x80 >> self.used) > 0;
        self.used += 1;
        Ok(bit)
    }
    /// read 8 bits, MSB first, the first failing bit aborts the read
    pub fn read_byte(&mut self) -> std::io::Result<u8> {
        if self.used == 8 {
            return self.get_byte();
        }
        let mut ans: u8 = 0;
        for _i in 0..8 {
            ans <<= 1;
            ans |= self.read_bit()? as u8;
        }
        Ok(ans)
    }
    pub fn read_u16(&mut self) -> std::io::Result<u16> {
        let mut bytes: [u8;2] = [0;2];
        for byte in bytes.iter_mut() {
            *byte = self.read_byte()?;
        }
        Ok(u16::from_le_bytes(bytes))
    }
    pub fn read_i64(&mut self) -> std::io::Result<i64> {
        let mut bytes: [u8;8] = [0;8];
        for byte in bytes.iter_mut() {
            *byte = self.read_byte()?;
        }
        Ok(i64::from_le_bytes(bytes))
    }
    /// bytes taken from the source so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_in
    }
}

#[cfg(test)]
fn bits_of(pattern: &str) -> BitVec {
    pattern.chars().filter(|c| *c=='0' || *c=='1').map(|c| c=='1').collect()
}

#[test]
fn read_bits() {
    let input: [u8;3] = [0b00010110, 0b11010010, 0b11010010];
    let expected = bits_of("00010110 11010010 11010010");
    let mut reader = BitReader::new(&input[..]);
    for i in 0..expected.len() {
        assert_eq!(reader.read_bit().expect("read failed"),expected[i],"bit {}",i);
    }
    let err = reader.read_bit().expect_err("read past end");
    assert_eq!(err.kind(),std::io::ErrorKind::UnexpectedEof);
}

#[test]
fn unaligned_reads() {
    let input: [u8;4] = [0b10110100, 0b01111000, 0b00000001, 0b10000000];
    let mut reader = BitReader::new(&input[..]);
    assert!(reader.read_bit().unwrap());
    assert_eq!(reader.read_byte().unwrap(),0b01101000);
    assert_eq!(reader.read_u16().unwrap(),u16::from_le_bytes([0b11110000,0b00000011]));
    // 7 bits left, not enough for a byte
    let err = reader.read_byte().expect_err("read past end");
    assert_eq!(err.kind(),std::io::ErrorKind::UnexpectedEof);
    assert_eq!(reader.bytes_read(),4);
}

#[test]
fn truncated_i64() {
    let input: [u8;5] = [1,2,3,4,5];
    let mut reader = BitReader::new(&input[..]);
    let err = reader.read_i64().expect_err("read past end");
    assert_eq!(err.kind(),std::io::ErrorKind::UnexpectedEof);
}

#[test]
fn write_and_pad() {
    let mut ans: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut ans);
    writer.write_bits(&bits_of("101")).unwrap();
    writer.write_byte(0xff).unwrap();
    writer.write_u16(0x1234).unwrap();
    writer.write_bit(true).unwrap();
    writer.flush().unwrap();
    assert_eq!(writer.bytes_written(),4);
    drop(writer);
    // 101 11111111 00110100 00010010 1 padded with zeros
    assert_eq!(ans,vec![0b10111111,0b11100110,0b10000010,0b01010000]);
}

#[test]
fn integers_are_little_endian() {
    let mut ans: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut ans);
    writer.write_i64(41).unwrap();
    writer.write_u16(0x89e6).unwrap();
    writer.flush().unwrap();
    drop(writer);
    assert_eq!(ans,hex::decode("2900000000000000e689").unwrap());
    let mut reader = BitReader::new(&ans[..]);
    assert_eq!(reader.read_i64().unwrap(),41);
    assert_eq!(reader.read_u16().unwrap(),0x89e6);
}
