//! Fixed-size block iteration over a byte stream
//!
//! `BlockReader` yields blocks of exactly `block_size` bytes until the source
//! runs dry; only the final block may be shorter. The final block is flagged
//! by peeking the underlying `BufReader`, so a stream whose length is an exact
//! multiple of the block size does not produce a trailing empty block. An
//! empty stream yields exactly one empty final block.

use std::io::{self, BufRead, BufReader, Read};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Zero-based position of this block in the stream
    pub index: u64,
    pub data: Vec<u8>,
    /// True for the last block the stream will yield
    pub last: bool,
}

pub struct BlockReader<R> {
    inner: BufReader<R>,
    block_size: usize,
    next_index: u64,
    done: bool,
}

impl<R: Read> BlockReader<R> {
    pub fn new(reader: R, block_size: usize) -> Self {
        assert!(block_size > 0, "block size must be non-zero");
        Self {
            inner: BufReader::new(reader),
            block_size,
            next_index: 0,
            done: false,
        }
    }

    fn read_block(&mut self) -> io::Result<Block> {
        let mut data = vec![0u8; self.block_size];
        let filled = read_full(&mut self.inner, &mut data)?;
        data.truncate(filled);

        let last = filled < self.block_size || at_eof(&mut self.inner)?;

        let index = self.next_index;
        self.next_index += 1;
        Ok(Block { index, data, last })
    }
}

impl<R: Read> Iterator for BlockReader<R> {
    type Item = io::Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let block = self.read_block();
        // An I/O error also ends the sequence; the reader is not restartable.
        self.done = block.as_ref().map_or(true, |b| b.last);
        Some(block)
    }
}

/// Fill `buf` as far as the reader allows. Returns the number of bytes read,
/// which is less than `buf.len()` only at end of stream.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn at_eof<R: Read>(r: &mut BufReader<R>) -> io::Result<bool> {
    loop {
        match r.fill_buf() {
            Ok(buf) => return Ok(buf.is_empty()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(data: &[u8], block_size: usize) -> Vec<Block> {
        BlockReader::new(Cursor::new(data.to_vec()), block_size)
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    /// Reader that hands out at most `step` bytes per read call.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("stream closed"))
        }
    }

    #[test]
    fn empty_stream_yields_one_empty_final_block() {
        let blocks = collect(b"", 4);
        assert_eq!(
            blocks,
            vec![Block {
                index: 0,
                data: vec![],
                last: true
            }]
        );
    }

    #[test]
    fn short_final_block() {
        let blocks = collect(b"abcdefghij", 4);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].data, b"abcd");
        assert_eq!(blocks[2].data, b"ij");
        assert_eq!(
            blocks.iter().map(|b| b.last).collect::<Vec<_>>(),
            vec![false, false, true]
        );
        assert_eq!(blocks.iter().map(|b| b.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_block() {
        let blocks = collect(b"abcdefgh", 4);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[1].last);
        assert_eq!(blocks[1].data, b"efgh");
    }

    #[test]
    fn fragmented_reads_still_fill_blocks() {
        let data: Vec<u8> = (0..=255u8).collect();
        let reader = Trickle {
            data: data.clone(),
            pos: 0,
            step: 3,
        };
        let blocks = BlockReader::new(reader, 100)
            .collect::<io::Result<Vec<_>>>()
            .unwrap();

        assert_eq!(
            blocks.iter().map(|b| b.data.len()).collect::<Vec<_>>(),
            vec![100, 100, 56]
        );
        let joined: Vec<u8> = blocks.into_iter().flat_map(|b| b.data).collect();
        assert_eq!(joined, data);
    }

    #[test]
    fn error_ends_iteration() {
        let mut reader = BlockReader::new(Failing, 4);
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }
}
