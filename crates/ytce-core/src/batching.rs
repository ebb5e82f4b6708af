use std::iter::FusedIterator;

use crate::models::CoreError;

/// Contiguous, order-preserving windows over a record sequence.
#[derive(Clone, Debug)]
pub struct Batches<'a, T> {
    records: &'a [T],
    size: usize,
}

pub fn batches<T>(records: &[T], size: usize) -> Result<Batches<'_, T>, CoreError> {
    if size == 0 {
        return Err(CoreError::config(None, "batch size must be greater than zero"));
    }
    Ok(Batches { records, size })
}

impl<T> Batches<'_, T> {
    pub fn batch_count(&self) -> usize {
        self.records.len().div_ceil(self.size)
    }
}

impl<'a, T> Iterator for Batches<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        if self.records.is_empty() {
            return None;
        }
        let split = self.size.min(self.records.len());
        let (batch, rest) = self.records.split_at(split);
        self.records = rest;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.batch_count();
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Batches<'_, T> {}

impl<T> FusedIterator for Batches<'_, T> {}
