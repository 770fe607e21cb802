use crate::error::{AnacodeError, Result};
use crate::table::Table;

/// Aggregations over the `sentiments` table.
#[derive(Debug, Clone, Copy)]
pub struct SentimentsView<'a> {
    sentiments: &'a Table,
}

impl<'a> SentimentsView<'a> {
    pub fn new(sentiments: &'a Table) -> Self {
        Self { sentiments }
    }

    pub fn table(&self) -> &'a Table {
        self.sentiments
    }

    /// Mean of `positive - negative` over all texts, in `[-1, 1]`.
    pub fn average_sentiment(&self) -> Result<f64> {
        if self.sentiments.is_empty() {
            return Err(AnacodeError::empty_dataset("sentiments table has no rows"));
        }
        let positive = self.sentiments.float_column("positive")?;
        let negative = self.sentiments.float_column("negative")?;
        let sum: f64 = positive
            .values()
            .iter()
            .zip(negative.values().iter())
            .map(|(p, n)| p - n)
            .sum();
        Ok(sum / self.sentiments.num_rows() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::sentiments_table;

    #[test]
    fn test_average_sentiment() {
        let table = sentiments_table(&[(0, 0, 0.9, 0.1), (0, 1, 0.3, 0.7)]);
        let average = SentimentsView::new(&table).average_sentiment().unwrap();
        assert!((average - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_average_sentiment_of_empty_table() {
        let table = sentiments_table(&[]);
        assert!(matches!(
            SentimentsView::new(&table).average_sentiment(),
            Err(AnacodeError::EmptyDataset(_))
        ));
    }
}
