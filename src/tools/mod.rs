//! Building blocks shared by the codecs

pub mod bits;
#[cfg(test)]
pub mod broken_io;
pub mod dictionary;
pub mod peek_reader;
pub mod priority_queue;
pub mod ring_buffer;
