use crate::matcher::{PrimaryKey, TableRowMatcher};
use std::collections::{HashMap, VecDeque};
use tabcompare_common::TableRow;

#[derive(Debug)]
struct Bucket {
    generation: u64,
    rows: VecDeque<TableRow>,
}

/// Rows waiting for a counterpart, bucketed by primary key.
///
/// Buckets drain in the order they were created and rows inside a bucket are
/// FIFO, so draining is deterministic. `order` holds one entry per bucket
/// creation; entries whose bucket has since been emptied are skipped lazily.
#[derive(Debug, Default)]
pub struct IndexedTableData {
    rows: HashMap<PrimaryKey, Bucket>,
    order: VecDeque<(u64, PrimaryKey)>,
    next_generation: u64,
    size: usize,
}

impl IndexedTableData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: PrimaryKey, row: TableRow) {
        match self.rows.get_mut(&key) {
            Some(bucket) => bucket.rows.push_back(row),
            None => {
                let generation = self.next_generation;
                self.next_generation += 1;
                self.order.push_back((generation, key.clone()));
                self.rows.insert(
                    key,
                    Bucket {
                        generation,
                        rows: VecDeque::from([row]),
                    },
                );
            }
        }
        self.size += 1;
    }

    /// Removes and returns the oldest buffered row matching `row` under `key`
    pub fn find_and_remove(
        &mut self,
        key: &PrimaryKey,
        row: &TableRow,
        matcher: &TableRowMatcher,
    ) -> Option<TableRow> {
        let bucket = self.rows.get_mut(key)?;
        let position = bucket.rows.iter().position(|candidate| matcher.matches(row, candidate))?;
        let found = bucket.rows.remove(position)?;
        if bucket.rows.is_empty() {
            self.rows.remove(key);
            self.compact();
        }
        self.size -= 1;
        Some(found)
    }

    /// Removes the oldest row of the oldest bucket
    pub fn pop_first(&mut self) -> Option<(PrimaryKey, TableRow)> {
        while let Some((generation, key)) = self.order.front() {
            let Some(bucket) = self.rows.get_mut(key) else {
                self.order.pop_front();
                continue;
            };
            if bucket.generation != *generation {
                self.order.pop_front();
                continue;
            }

            let row = bucket.rows.pop_front()?;
            let key = key.clone();
            if bucket.rows.is_empty() {
                self.rows.remove(&key);
                self.order.pop_front();
            }
            self.size -= 1;
            return Some((key, row));
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn len(&self) -> usize {
        self.size
    }

    /// Keys of the live buckets, oldest first
    pub fn keys(&self) -> impl Iterator<Item = &PrimaryKey> {
        let rows = &self.rows;
        self.order.iter().filter_map(move |(generation, key)| {
            rows.get(key)
                .filter(|bucket| bucket.generation == *generation)
                .map(|_| key)
        })
    }

    // Drops stale order entries once they outnumber the live buckets
    fn compact(&mut self) {
        if self.order.len() > 2 * self.rows.len() + 32 {
            let rows = &self.rows;
            self.order.retain(|(generation, key)| {
                rows.get(key).map_or(false, |bucket| bucket.generation == *generation)
            });
        }
    }
}
