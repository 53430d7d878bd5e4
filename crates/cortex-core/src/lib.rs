#![allow(clippy::must_use_candidate)]

pub mod error;

pub use error::{HttpError, error_body};
