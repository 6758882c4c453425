// Generic definitions of AST items shared between the parser and the
// compiler's rewriting passes.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnSort<T> {
    pub direction: SortDirection,
    pub column: T,
}

#[derive(Debug, Clone, Copy, Serialize, Default, Deserialize, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl<T> ColumnSort<T> {
    pub fn try_map<U, E, F: FnOnce(T) -> Result<U, E>>(self, f: F) -> Result<ColumnSort<U>, E> {
        Ok(ColumnSort {
            direction: self.direction,
            column: f(self.column)?,
        })
    }
}
