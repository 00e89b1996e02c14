//! Forward-only batch cursor over a feature table

use crate::dataset::{BatchView, FeatureTable};

/// Hands out disjoint, full-size row batches in order.
///
/// The position only moves forward. A trailing partial batch is never
/// returned and never consumed.
#[derive(Debug)]
pub struct BatchCursor<'a> {
    table: &'a FeatureTable,
    rows_per_batch: usize,
    position: usize,
}

impl<'a> BatchCursor<'a> {
    pub fn new(table: &'a FeatureTable, rows_per_batch: usize) -> Self {
        Self {
            table,
            rows_per_batch,
            position: 0,
        }
    }

    /// Next full batch, or `None` once fewer than `rows_per_batch` rows remain
    pub fn next_batch(&mut self) -> Option<BatchView<'a>> {
        let batch = self.table.batch(self.position, self.rows_per_batch)?;
        self.position += self.rows_per_batch;
        Some(batch)
    }

    /// Rows consumed so far
    pub fn position(&self) -> usize {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_rows(rows: usize) -> FeatureTable {
        let values = (0..rows).map(|r| r as f32).collect();
        FeatureTable::new(vec!["row".to_string()], values, rows)
    }

    #[test]
    fn test_batches_are_disjoint_and_ordered() {
        let table = table_with_rows(10);
        let mut cursor = BatchCursor::new(&table, 3);

        let mut seen = Vec::new();
        while let Some(batch) = cursor.next_batch() {
            seen.extend_from_slice(batch.values());
        }

        assert_eq!(seen, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(cursor.position(), 9);
        assert!(cursor.next_batch().is_none());
    }

    #[test]
    fn test_partial_batch_is_not_consumed() {
        let table = table_with_rows(4);
        let mut cursor = BatchCursor::new(&table, 5);
        assert!(cursor.next_batch().is_none());
        assert_eq!(cursor.position(), 0);
        // Still none on repeated calls; the cursor never moves backward
        assert!(cursor.next_batch().is_none());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_consumed_rows_never_exceed_table() {
        for rows in 0..40 {
            let table = table_with_rows(rows);
            let mut cursor = BatchCursor::new(&table, 7);
            let mut consumed = 0;
            while let Some(batch) = cursor.next_batch() {
                consumed += batch.rows();
            }
            assert!(consumed <= rows);
            assert_eq!(consumed, cursor.position());
            assert_eq!(consumed, (rows / 7) * 7);
        }
    }
}
