//! Common utilities and shared types for yatube-rs.
//!
//! This crate provides foundational components used across all yatube-rs crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Storage**: File storage for uploaded post images
//! - **Page cache**: TTL cache for rendered pages (in-process or Redis)
//!
//! # Example
//!
//! ```no_run
//! use yatube_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     println!("{} posts per page, new id {}", config.site.posts_per_page, id_gen.generate());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod page_cache;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use page_cache::{CachedPage, MemoryPageCache, PageCache, RedisPageCache, SharedPageCache};
pub use storage::{LocalStorage, StorageBackend, UploadedFile, generate_storage_key};
