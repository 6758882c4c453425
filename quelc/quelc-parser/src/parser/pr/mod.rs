//! Parser-produced representation of an ObjectQuel query.

mod expr;
mod ident;
pub mod ops;
mod query;
mod types;

pub use expr::*;
pub use ident::Ident;
pub use ops::{BinOp, UnOp};
pub use query::*;
pub use types::Ty;
