//! # poolwatch-intercept
//!
//! Statement lifecycle tracking for connection pools under test.
//!
//! A pool engine routes every statement it creates through a
//! [`StatementLifecycleInterceptor`], which hands back a
//! [`StatementProxy`]. The proxy behaves exactly like the statement it wraps
//! and tells the interceptor when it is closed. The interceptor's
//! [`active_count`](StatementLifecycleInterceptor::active_count) is then a
//! leak oracle: it must settle at zero once every statement is closed.
//!
//! ## Features
//!
//! - Lock-free open/close counters safe under concurrent use
//! - Closure reported at most once per statement, however often it is closed
//! - Errors from wrapped statements passed through unchanged
//! - Pluggable [`StatementObserver`]s, composable with [`ObserverChain`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use poolwatch_intercept::{ConnectionId, Statement, StatementLifecycleInterceptor};
//!
//! let interceptor = Arc::new(StatementLifecycleInterceptor::new());
//!
//! // Inside the pool engine's statement factory
//! let stmt = interceptor.on_statement_created(raw_statement, "SELECT 1", ConnectionId(1));
//! assert_eq!(interceptor.active_count(), 1);
//!
//! stmt.close().await?;
//! assert_eq!(interceptor.active_count(), 0);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod interceptor;
pub mod observer;
pub mod proxy;
pub mod statement;

pub use error::StatementError;
pub use interceptor::{StatementCounts, StatementLifecycleInterceptor};
pub use observer::{ObserverChain, StatementObserver, TracingObserver};
pub use proxy::{StatementDecorator, StatementProxy};
pub use statement::{ConnectionId, Row, Statement, StatementInfo};
