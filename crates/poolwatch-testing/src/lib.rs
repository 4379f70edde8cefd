//! # poolwatch-testing
//!
//! Harness for exercising pool configurations.
//!
//! Provides an in-memory pool engine ([`MockPool`]) that honors a
//! [`PoolConfig`](poolwatch_config::PoolConfig), a per-test
//! [`PoolFixture`] that builds pools from the test profile and tears them
//! down without failing, and [`wait_for_active_count`] for asserting that
//! statement counts settle after concurrent work.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use poolwatch_testing::{PoolFixture, wait_for_active_count};
//!
//! #[tokio::test]
//! async fn statements_are_closed() {
//!     let mut fixture = PoolFixture::new();
//!     let pool = fixture.create_default_pool().await.unwrap();
//!
//!     let conn = pool.get().await.unwrap();
//!     conn.prepare("SELECT 1").unwrap().close().await.unwrap();
//!     drop(conn);
//!
//!     let active = wait_for_active_count(fixture.interceptor(), 0, Duration::from_secs(5)).await;
//!     assert_eq!(active, 0);
//!     fixture.teardown().await;
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod fixture;
pub mod mock;
pub mod pool;

pub use error::PoolError;
pub use fixture::{POLL_INTERVAL, PoolFixture, wait_for_active_count};
pub use mock::{MockConnection, MockStatement};
pub use pool::{MockPool, PoolBuilder, PoolMetrics, PoolStatus, PooledConnection};
