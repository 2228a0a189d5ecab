//! # MCAT Common Library
//!
//! Shared code for the MCAT music catalog:
//! - Entity schema and database initialization
//! - Error taxonomy (`Error`, `Result`)
//! - Configuration loading and root folder resolution
//! - Pagination math and release date normalization
//! - Utility functions

pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod pagination;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use pagination::{Page, PageRequest, Pagination, SortOrder};
