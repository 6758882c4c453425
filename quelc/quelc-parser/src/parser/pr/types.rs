use serde::{Deserialize, Serialize};

/// Coarse value type carried on expressions after semantic analysis.
///
/// ObjectQuel values are dynamically typed at the source level; the compiler
/// only tracks enough to reject illegal operations on whole entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ty {
    String,
    Number,
    Bool,
    Entity,
    Unknown,
}
