//! Immutable, named tables backed by arrow record batches.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, BooleanBuilder, Float64Array, Float64Builder, Int64Array,
    Int64Builder, StringArray, StringBuilder,
};
use arrow::compute::{concat_batches, filter_record_batch};
use arrow::record_batch::RecordBatch;

use crate::error::{AnacodeError, Result};
use crate::schema::{ColumnKind, TableName};

/// A read-only handle to one of the fixed tables.
///
/// The batch always carries the canonical schema of `name`, so typed column
/// accessors only fail when asked for a column the table does not have.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: TableName,
    batch: RecordBatch,
}

impl Table {
    /// An empty table with the full column set of `name`.
    pub fn empty(name: TableName) -> Self {
        Self {
            name,
            batch: RecordBatch::new_empty(name.schema()),
        }
    }

    /// Wraps a batch, checking that its columns match the table's schema.
    pub fn try_new(name: TableName, batch: RecordBatch) -> Result<Self> {
        validate_batch(name, &batch)?;
        Ok(Self { name, batch })
    }

    /// Concatenates appended batches into one table.
    pub fn concat(name: TableName, batches: &[RecordBatch]) -> Result<Self> {
        for batch in batches {
            validate_batch(name, batch)?;
        }
        let batch = concat_batches(&name.schema(), batches)?;
        Ok(Self { name, batch })
    }

    pub fn name(&self) -> TableName {
        self.name
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn int_column(&self, column: &str) -> Result<&Int64Array> {
        downcast(self.name, column, self.column(column)?)
    }

    pub fn float_column(&self, column: &str) -> Result<&Float64Array> {
        downcast(self.name, column, self.column(column)?)
    }

    pub fn text_column(&self, column: &str) -> Result<&StringArray> {
        downcast(self.name, column, self.column(column)?)
    }

    pub fn bool_column(&self, column: &str) -> Result<&BooleanArray> {
        downcast(self.name, column, self.column(column)?)
    }

    /// `(doc_id, text_order)` of every row, in row order.
    pub fn scopes(&self) -> Result<Vec<(i64, i64)>> {
        let docs = self.int_column("doc_id")?;
        let orders = self.int_column("text_order")?;
        Ok(docs.values().iter().copied().zip(orders.values().iter().copied()).collect())
    }

    /// Keeps the rows for which `keep` returns true.
    pub fn retain<F>(&self, mut keep: F) -> Result<Self>
    where
        F: FnMut(usize) -> bool,
    {
        let mask: BooleanArray = (0..self.num_rows()).map(|i| Some(keep(i))).collect();
        let batch = filter_record_batch(&self.batch, &mask)?;
        Ok(Self {
            name: self.name,
            batch,
        })
    }

    fn column(&self, column: &str) -> Result<&ArrayRef> {
        self.batch.column_by_name(column).ok_or_else(|| {
            AnacodeError::invalid_argument(format!("table '{}' has no column '{column}'", self.name))
        })
    }
}

fn downcast<'a, T: 'static>(table: TableName, column: &str, array: &'a ArrayRef) -> Result<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        AnacodeError::schema(
            table.as_str(),
            format!("column '{column}' has type {}", array.data_type()),
        )
    })
}

/// Checks that a batch has exactly the columns of `table`, in order.
pub fn validate_batch(table: TableName, batch: &RecordBatch) -> Result<()> {
    let expected = table.schema();
    let schema = batch.schema();
    let matches = schema.fields().len() == expected.fields().len()
        && schema
            .fields()
            .iter()
            .zip(expected.fields())
            .all(|(f, e)| f.name() == e.name() && f.data_type() == e.data_type());
    if matches {
        Ok(())
    } else {
        Err(AnacodeError::schema(
            table.as_str(),
            format!(
                "batch columns {:?} do not match {:?}",
                schema.fields().iter().map(|f| f.name()).collect::<Vec<_>>(),
                table.column_names()
            ),
        ))
    }
}

/// A single cell value handed to [`TableBuilder::push`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Datum<'a> {
    Int(i64),
    Float(f64),
    Text(&'a str),
    Bool(bool),
    Null,
}

enum ColumnBuilder {
    Int(Int64Builder),
    Float(Float64Builder),
    Text(StringBuilder),
    OptionalText(StringBuilder),
    Bool(BooleanBuilder),
}

impl ColumnBuilder {
    fn new(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Int => Self::Int(Int64Builder::new()),
            ColumnKind::Float => Self::Float(Float64Builder::new()),
            ColumnKind::Text => Self::Text(StringBuilder::new()),
            ColumnKind::OptionalText => Self::OptionalText(StringBuilder::new()),
            ColumnKind::Bool => Self::Bool(BooleanBuilder::new()),
        }
    }

    fn accepts(&self, value: &Datum<'_>) -> bool {
        matches!(
            (self, value),
            (Self::Int(_), Datum::Int(_))
                | (Self::Float(_), Datum::Float(_))
                | (Self::Text(_), Datum::Text(_))
                | (Self::OptionalText(_), Datum::Text(_) | Datum::Null)
                | (Self::Bool(_), Datum::Bool(_))
        )
    }

    fn append(&mut self, value: Datum<'_>) {
        match (self, value) {
            (Self::Int(b), Datum::Int(v)) => b.append_value(v),
            (Self::Float(b), Datum::Float(v)) => b.append_value(v),
            (Self::Text(b) | Self::OptionalText(b), Datum::Text(v)) => b.append_value(v),
            (Self::OptionalText(b), Datum::Null) => b.append_null(),
            (Self::Bool(b), Datum::Bool(v)) => b.append_value(v),
            // accepts() is checked for the whole row before anything is appended
            _ => {}
        }
    }

    fn finish(&mut self) -> ArrayRef {
        match self {
            Self::Int(b) => Arc::new(b.finish()),
            Self::Float(b) => Arc::new(b.finish()),
            Self::Text(b) | Self::OptionalText(b) => Arc::new(b.finish()),
            Self::Bool(b) => Arc::new(b.finish()),
        }
    }
}

/// Row-wise builder producing a batch with the canonical schema of a table.
pub struct TableBuilder {
    name: TableName,
    columns: Vec<ColumnBuilder>,
    rows: usize,
}

impl TableBuilder {
    pub fn new(name: TableName) -> Self {
        Self {
            name,
            columns: name
                .columns()
                .iter()
                .map(|c| ColumnBuilder::new(c.kind))
                .collect(),
            rows: 0,
        }
    }

    /// Appends one row. The row is rejected as a whole if any cell has the
    /// wrong type or the arity is off.
    pub fn push(&mut self, row: &[Datum<'_>]) -> Result<&mut Self> {
        if row.len() != self.columns.len() {
            return Err(AnacodeError::schema(
                self.name.as_str(),
                format!("row has {} cells, expected {}", row.len(), self.columns.len()),
            ));
        }
        if let Some(i) = self
            .columns
            .iter()
            .zip(row)
            .position(|(column, value)| !column.accepts(value))
        {
            return Err(AnacodeError::schema(
                self.name.as_str(),
                format!(
                    "cell {:?} does not fit column '{}'",
                    row[i],
                    self.name.columns()[i].name
                ),
            ));
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.append(*value);
        }
        self.rows += 1;
        Ok(self)
    }

    pub fn name(&self) -> TableName {
        self.name
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn finish(mut self) -> Result<RecordBatch> {
        let arrays: Vec<ArrayRef> = self.columns.iter_mut().map(|c| c.finish()).collect();
        Ok(RecordBatch::try_new(self.name.schema(), arrays)?)
    }

    pub fn finish_table(self) -> Result<Table> {
        let name = self.name;
        Ok(Table {
            name,
            batch: self.finish()?,
        })
    }
}
