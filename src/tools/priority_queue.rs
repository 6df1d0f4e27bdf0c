//! Binary min-heap keyed on frequency, used to build Huffman code trees.
//!
//! Items with equal frequency come out in whatever order the sift operations
//! leave them, no stability is promised.

pub struct QueueItem<T> {
    pub value: T,
    pub frequency: u64
}

pub struct PriorityQueue<T> {
    heap: Vec<QueueItem<T>>
}

impl <T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: Vec::new()
        }
    }
    /// Add an item without restoring the heap property, call `init` before popping.
    pub fn append(&mut self,value: T,frequency: u64) {
        self.heap.push(QueueItem { value, frequency });
    }
    /// Establish the heap property over everything appended so far
    pub fn init(&mut self) {
        if self.heap.len() < 2 {
            return;
        }
        for i in (0..=(self.heap.len()-1)/2).rev() {
            self.sift_down(i);
        }
    }
    pub fn push(&mut self,value: T,frequency: u64) {
        self.heap.push(QueueItem { value, frequency });
        let mut node = self.heap.len() - 1;
        while node > 0 {
            let parent = (node - 1) / 2;
            if !self.less(node,parent) {
                break;
            }
            self.heap.swap(node,parent);
            node = parent;
        }
    }
    /// Remove and return the item with the smallest frequency
    pub fn pop(&mut self) -> Option<QueueItem<T>> {
        if self.heap.is_empty() {
            return None;
        }
        let item = self.heap.swap_remove(0);
        self.sift_down(0);
        Some(item)
    }
    pub fn len(&self) -> usize {
        self.heap.len()
    }
    fn less(&self,i: usize,j: usize) -> bool {
        self.heap[i].frequency < self.heap[j].frequency
    }
    fn sift_down(&mut self,mut node: usize) {
        loop {
            let mut min = node;
            let left = 2*node + 1;
            let right = 2*node + 2;
            if left < self.heap.len() && self.less(left,min) {
                min = left;
            }
            if right < self.heap.len() && self.less(right,min) {
                min = right;
            }
            if min == node {
                return;
            }
            self.heap.swap(node,min);
            node = min;
        }
    }
}

#[cfg(test)]
fn assert_heap<T>(q: &PriorityQueue<T>) {
    for i in 0..q.len() {
        for child in [2*i+1,2*i+2] {
            if child < q.len() {
                assert!(q.heap[i].frequency <= q.heap[child].frequency,"heap property broken at {}",i);
            }
        }
    }
}

#[test]
fn heap_property() {
    let freqs: [u64;10] = [13,2,19,7,7,0,11,4,16,9];
    let mut q: PriorityQueue<usize> = PriorityQueue::new();
    for (i,f) in freqs.iter().enumerate() {
        q.append(i,*f);
    }
    q.init();
    assert_heap(&q);
    q.push(10,5);
    assert_heap(&q);
    q.push(11,1);
    assert_heap(&q);
    q.push(12,18);
    assert_heap(&q);
    assert_eq!(q.pop().unwrap().frequency,0);
    assert_heap(&q);
    q.push(13,3);
    assert_heap(&q);
    let mut prev = 0;
    while let Some(item) = q.pop() {
        assert!(item.frequency >= prev);
        prev = item.frequency;
        assert_heap(&q);
    }
    assert_eq!(q.len(),0);
}

#[test]
fn pop_from_empty() {
    let mut q: PriorityQueue<u8> = PriorityQueue::new();
    q.init();
    assert!(q.pop().is_none());
    q.push(b'a',3);
    assert_eq!(q.len(),1);
    let item = q.pop().unwrap();
    assert_eq!((item.value,item.frequency),(b'a',3));
}
