use crate::error::{AnacodeError, Result};
use crate::table::Table;

use super::{grouped_means, rank, Score, SortOrder};

/// Aggregations over the `categories` table.
#[derive(Debug, Clone, Copy)]
pub struct CategoriesView<'a> {
    categories: &'a Table,
}

impl<'a> CategoriesView<'a> {
    pub fn new(categories: &'a Table) -> Self {
        Self { categories }
    }

    pub fn table(&self) -> &'a Table {
        self.categories
    }

    /// Mean probability of every category, highest first.
    pub fn categories(&self) -> Result<Vec<Score>> {
        let names = self.categories.text_column("category")?;
        let probabilities = self.categories.float_column("probability")?;
        let means = grouped_means(
            names
                .iter()
                .zip(probabilities.values().iter())
                .map(|(name, p)| (name.unwrap_or(""), *p)),
        );
        let n = means.len();
        Ok(rank(means, SortOrder::Descending, n))
    }

    /// The category with the highest mean probability across all texts.
    pub fn main_category(&self) -> Result<String> {
        self.categories()?
            .into_iter()
            .next()
            .map(|score| score.name)
            .ok_or_else(|| AnacodeError::empty_dataset("categories table has no rows"))
    }
}
