//! Pieces shared by every tollgate crate: the error type host collaborators
//! report with, and the `FromMessage` / [`impl_context!`] pair that gives each
//! crate's own error a `.context()` extension.

pub mod context;
pub mod error;

pub use {
    context::FromMessage,
    error::{Error, Result},
};
