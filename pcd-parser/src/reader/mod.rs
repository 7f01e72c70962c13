pub mod las;

use pcd_core::pointcloud::point::Point;

use crate::ParseError;

pub trait PointReader {
    fn next_point(&mut self) -> Result<Option<Point>, ParseError>;
}

pub struct PointIterator<R: PointReader> {
    reader: R,
    chunk_size: usize,
    failed: bool,
}

impl<R: PointReader> PointIterator<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size,
            failed: false,
        }
    }
}

impl<R: PointReader> Iterator for PointIterator<R> {
    type Item = Result<Vec<Point>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let mut buffer = Vec::with_capacity(self.chunk_size);
        for _ in 0..self.chunk_size {
            match self.reader.next_point() {
                Ok(Some(p)) => buffer.push(p),
                Ok(None) => break,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }

        if buffer.is_empty() {
            None
        } else {
            Some(Ok(buffer))
        }
    }
}
