//! # mm_lock
//!
//! In-process locks for named logical resources shared by concurrent tasks.
//!
//! [`LockManager`] grants Read (shared), Write and Exclusive locks with a
//! bounded wait, per-grant expiry and a background sweeper. [`LockGuard`]
//! releases on scope exit, and [`ResourceKey`] fixes the naming used by the
//! trading, signal, portfolio and risk sections.

pub mod bindings;
pub mod config;
pub mod error;
pub mod guard;
pub mod manager;
pub mod types;

pub use bindings::ResourceKey;
pub use config::LockManagerConfig;
pub use error::LockError;
pub use error::Result;
pub use guard::LockGuard;
pub use manager::LockManager;
pub use types::LockHolder;
pub use types::LockInfo;
pub use types::LockManagerStats;
pub use types::LockStatus;
pub use types::LockType;
