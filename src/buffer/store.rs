use crate::domain::DataPoint;
use std::slice::Chunks;

/// Points per chunk when `len` points are split under `max_per_connection`.
///
/// Never zero, so it can be handed to `slice::chunks` directly.
pub fn chunk_size(len: usize, max_per_connection: Option<usize>) -> usize {
    max_per_connection
        .filter(|&n| n > 0)
        .unwrap_or(len)
        .min(len)
        .max(1)
}

/// Ordered collection of data points waiting to be sent.
///
/// Owned by a single sender. Sending never mutates it; callers clear or prune
/// it explicitly once they have inspected the results.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    points: Vec<DataPoint>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: DataPoint) {
        self.points.push(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Owned copy of the current contents, in insertion order.
    pub fn snapshot(&self) -> Vec<DataPoint> {
        self.points.clone()
    }

    /// Removes the first entry structurally equal to `point`.
    pub fn remove_first(&mut self, point: &DataPoint) -> bool {
        match self.points.iter().position(|p| p == point) {
            Some(index) => {
                self.points.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DataPoint> {
        self.points.iter()
    }

    /// Consecutive chunks of at most `max_per_connection` points.
    ///
    /// `None` or `Some(0)` yields everything as one chunk. An empty store
    /// yields no chunks at all.
    pub fn chunks(&self, max_per_connection: Option<usize>) -> Chunks<'_, DataPoint> {
        self.points
            .chunks(chunk_size(self.points.len(), max_per_connection))
    }
}

impl<'a> IntoIterator for &'a DataStore {
    type Item = &'a DataPoint;
    type IntoIter = std::slice::Iter<'a, DataPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
