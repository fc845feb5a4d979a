//! Core business logic for yatube-rs.

pub mod forms;
pub mod pagination;
pub mod services;

pub use forms::{FormErrors, Submission};
pub use pagination::{Page, PageWindow, Paginator};
pub use services::*;
