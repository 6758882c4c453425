//! End-to-end tests over an in-memory entity store: compile ObjectQuel
//! source and assert on the emitted SQL, the bound parameters and the
//! validated tree.

mod error_messages;
mod queries;
mod resolving;
mod sql;
mod stores;
