use std::collections::BTreeMap;

use ethereum_types::U256;
use zk_tracer_common::EncodedWord;

use crate::error::TraceError;
use crate::module::ModuleId;

/// One row of values, in the module's column order.
pub type Row = Vec<U256>;

/// Append-only writer of trace rows.
pub trait TraceSink {
    fn append(&mut self, module: ModuleId, row: Row);
}

/// Builds a row column by column, checking that every column of the module is
/// written exactly once and in order. Errors are reported by
/// [`RowBuilder::finish`].
#[derive(Debug)]
pub struct RowBuilder {
    module: ModuleId,
    columns: &'static [&'static str],
    values: Row,
    error: Option<TraceError>,
}

impl RowBuilder {
    pub fn new(module: ModuleId) -> Self {
        let columns = module.columns();
        Self {
            module,
            columns,
            values: Vec::with_capacity(columns.len()),
            error: None,
        }
    }

    pub fn set(mut self, column: &'static str, value: impl Into<U256>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let next = self.values.len();
        match self.columns.get(next) {
            Some(&expected) if expected == column => self.values.push(value.into()),
            Some(&expected) if self.columns[next..].contains(&column) => {
                self.error = Some(TraceError::MissingColumn {
                    module: self.module,
                    column: expected,
                });
            }
            _ => {
                self.error = Some(TraceError::ColumnOrder {
                    module: self.module,
                    column,
                });
            }
        }
        self
    }

    pub fn flag(self, column: &'static str, value: bool) -> Self {
        self.set(column, u8::from(value))
    }

    /// Writes a word as its two limbs.
    pub fn word(self, hi: &'static str, lo: &'static str, word: EncodedWord) -> Self {
        self.set(hi, word.hi()).set(lo, word.lo())
    }

    pub fn finish(self) -> Result<Row, TraceError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        match self.columns.get(self.values.len()) {
            Some(&column) => Err(TraceError::MissingColumn {
                module: self.module,
                column,
            }),
            None => Ok(self.values),
        }
    }
}

/// In-memory, column-major trace of every module.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ColumnarTrace {
    tables: BTreeMap<ModuleId, Vec<Vec<U256>>>,
}

impl ColumnarTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, module: ModuleId, name: &str) -> Option<&[U256]> {
        let ix = module.columns().iter().position(|&c| c == name)?;
        Some(
            self.tables
                .get(&module)
                .map(|table| table[ix].as_slice())
                .unwrap_or_default(),
        )
    }

    /// Number of rows written to a module.
    pub fn height(&self, module: ModuleId) -> usize {
        self.tables
            .get(&module)
            .and_then(|table| table.first())
            .map_or(0, Vec::len)
    }
}

impl TraceSink for ColumnarTrace {
    fn append(&mut self, module: ModuleId, row: Row) {
        let table = self
            .tables
            .entry(module)
            .or_insert_with(|| vec![Vec::new(); module.columns().len()]);
        debug_assert_eq!(table.len(), row.len());
        for (column, value) in table.iter_mut().zip(row) {
            column.push(value);
        }
    }
}
