//! Ring buffer for LZ type compression windows.
//! Logical index 0 is the oldest element, pushing a new element evicts it.
use num_traits::PrimInt;

pub struct RingBuffer<T: PrimInt> {
    buf: Vec<T>,
    /// absolute position of the oldest element
    pos: usize,
    n: usize
}

impl <T: PrimInt> RingBuffer<T> {
    pub fn create(fill: T,n: usize) -> Self {
        Self {
            buf: vec![fill;n],
            pos: 0,
            n
        }
    }
    pub fn len(&self) -> usize {
        self.n
    }
    /// get absolute position of logical index, wraps around
    pub fn get_pos(&self,idx: usize) -> usize {
        (self.pos + idx) % self.n
    }
    /// get value at logical index, wraps around
    pub fn get(&self,idx: usize) -> T {
        self.buf[self.get_pos(idx)]
    }
    /// advance cursor by 1
    fn advance(&mut self) {
        self.pos = (self.pos + 1) % self.n;
    }
    /// append a value at the end, the oldest value is discarded
    pub fn push(&mut self,val: T) {
        self.buf[self.pos] = val;
        self.advance();
    }
    /// append values at the end, discarding as many from the front
    pub fn extend(&mut self,vals: &[T]) {
        for val in vals {
            self.push(*val);
        }
    }
}

#[test]
fn offset() {
    let mut ring: RingBuffer<u8> = RingBuffer::create(0,4);
    ring.extend(&[1,2,3,4,5]);
    assert_eq!(ring.get_pos(0),1);
    assert_eq!(ring.get_pos(4),1);
    assert_eq!(ring.get_pos(3),0);
}

#[test]
fn sliding() {
    // four positions 0 1 2 3, oldest first
    let mut ring: RingBuffer<u8> = RingBuffer::create(0,4);
    ring.extend(&[4,9,1]);
    assert_eq!((0..4).map(|i| ring.get(i)).collect::<Vec<u8>>(),vec![0,4,9,1]);
    ring.extend(&[3,2]);
    assert_eq!((0..4).map(|i| ring.get(i)).collect::<Vec<u8>>(),vec![9,1,3,2]);
    ring.push(7);
    assert_eq!(ring.get(3),7);
    assert_eq!(ring.get(4),1);
}
