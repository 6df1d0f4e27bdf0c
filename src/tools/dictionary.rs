//! Position dictionary for the LZ77 match search.
//!
//! Maps a key, formed from the first `KEY_SIZE` bytes of a byte sequence, to the stream
//! positions where that key occurred.  Positions under each key are kept in the order they
//! were added, and the caller is expected to add them in ascending order, which is not checked.
//! Keys are spread over a bucket array that doubles when the load factor gets too high.

use std::collections::VecDeque;

pub const KEY_SIZE: usize = 2;
const MAX_LOAD_FACTOR: f32 = 0.75;
const GROWTH_MULTIPLIER: usize = 2;
const HASH_SHIFT: usize = 5;
const HASH_SIZE: usize = 1024;

pub type DictKey = [u8;KEY_SIZE];

fn hash(key: &DictKey) -> usize {
    let mut ans: usize = 0;
    for byte in key {
        ans = ((ans << HASH_SHIFT) ^ *byte as usize) % HASH_SIZE;
    }
    ans
}

struct Entry {
    key: DictKey,
    positions: VecDeque<i64>
}

pub struct Dictionary {
    buckets: Vec<Vec<Entry>>,
    item_count: usize
}

impl Dictionary {
    pub fn new() -> Self {
        let mut buckets = Vec::new();
        buckets.push(Vec::new());
        Self {
            buckets,
            item_count: 0
        }
    }
    fn bucket_index(&self,key: &DictKey) -> usize {
        hash(key) % self.buckets.len()
    }
    fn entry(&self,key: &DictKey) -> Option<&Entry> {
        self.buckets[self.bucket_index(key)].iter().find(|e| e.key==*key)
    }
    fn load_factor(&self) -> f32 {
        self.item_count as f32 / self.buckets.len() as f32
    }
    /// Rehash everything into a bigger bucket array, always adds at least one bucket
    fn expand(&mut self) {
        let mut new_len = GROWTH_MULTIPLIER * self.buckets.len();
        if new_len == self.buckets.len() {
            new_len += 1;
        }
        let old = std::mem::replace(&mut self.buckets,(0..new_len).map(|_| Vec::new()).collect());
        for entry in old.into_iter().flatten() {
            let idx = self.bucket_index(&entry.key);
            self.buckets[idx].push(entry);
        }
        log::trace!("dictionary grew to {} buckets",new_len);
    }
    /// Append `pos` to the positions recorded for `key`
    pub fn add(&mut self,key: DictKey,pos: i64) {
        let idx = self.bucket_index(&key);
        if let Some(entry) = self.buckets[idx].iter_mut().find(|e| e.key==key) {
            entry.positions.push_back(pos);
            return;
        }
        self.buckets[idx].push(Entry { key, positions: VecDeque::from([pos]) });
        self.item_count += 1;
        if self.load_factor() > MAX_LOAD_FACTOR {
            self.expand();
        }
    }
    /// Positions recorded for `key`, starting from the oldest one still kept
    pub fn get<'a>(&'a self,key: &DictKey) -> impl Iterator<Item = i64> + 'a {
        self.entry(key).into_iter().flat_map(|e| e.positions.iter().copied())
    }
    /// Discard positions of `key` that are less than `threshold`.
    /// A key left without positions is removed altogether.
    pub fn remove_lesser_than(&mut self,key: &DictKey,threshold: i64) {
        let idx = self.bucket_index(key);
        let bucket = &mut self.buckets[idx];
        let Some(slot) = bucket.iter().position(|e| e.key==*key) else {
            return;
        };
        let positions = &mut bucket[slot].positions;
        while positions.front().is_some_and(|p| *p < threshold) {
            positions.pop_front();
        }
        if positions.is_empty() {
            bucket.swap_remove(slot);
            self.item_count -= 1;
        }
    }
    /// number of keys with at least one position
    pub fn len(&self) -> usize {
        self.item_count
    }
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[test]
fn hashing() {
    assert_eq!(hash(&[0,0]),0);
    assert_eq!(hash(&[1,2]),(32 ^ 2) % 1024);
    // shifted bits beyond the hash size are dropped
    assert_eq!(hash(&[255,255]),((255 << 5) % 1024) ^ 255);
}

#[test]
fn add_and_get() {
    let mut dict = Dictionary::new();
    assert_eq!(dict.get(b"ab").next(),None);
    dict.add(*b"ab",3);
    dict.add(*b"cd",4);
    dict.add(*b"ab",9);
    assert_eq!(dict.get(b"ab").next(),Some(3));
    assert_eq!(dict.get(b"ab").collect::<Vec<i64>>(),vec![3,9]);
    assert_eq!(dict.get(b"zz").count(),0);
    assert_eq!(dict.len(),2);
}

#[test]
fn pruning() {
    let mut dict = Dictionary::new();
    for pos in [2,5,7,11] {
        dict.add(*b"xy",pos);
    }
    dict.remove_lesser_than(b"xy",6);
    assert_eq!(dict.get(b"xy").collect::<Vec<i64>>(),vec![7,11]);
    dict.remove_lesser_than(b"xy",11);
    assert_eq!(dict.get(b"xy").next(),Some(11));
    dict.remove_lesser_than(b"xy",12);
    assert_eq!(dict.get(b"xy").next(),None);
    assert_eq!(dict.len(),0);
    // missing keys are ignored
    dict.remove_lesser_than(b"qq",100);
    dict.add(*b"xy",20);
    assert_eq!(dict.get(b"xy").next(),Some(20));
}

#[test]
fn growth() {
    let mut dict = Dictionary::new();
    let mut pos = 0;
    for a in 0..32u8 {
        for b in 0..8u8 {
            dict.add([a,b],pos);
            pos += 1;
            assert!(dict.load_factor() <= MAX_LOAD_FACTOR);
        }
    }
    assert_eq!(dict.len(),256);
    assert!(dict.bucket_count() >= 512);
    // every key survives the rehashing
    let mut pos = 0;
    for a in 0..32u8 {
        for b in 0..8u8 {
            assert_eq!(dict.get(&[a,b]).next(),Some(pos));
            pos += 1;
        }
    }
}
