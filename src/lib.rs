//! # babylog
//!
//! REST service for recording a young child's growth, milestones, first
//! words, teeth, food introductions, breastfeeding and sleep.
//!
//! Besides plain CRUD, the service derives two daily summaries from the
//! timelines: breastfeeding minutes per day, and sleep minutes per day with
//! the overnight span credited to the evening it started. A whole day of
//! timeline events can be replaced atomically.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── ChildService / RecordService / TimelineService (service/)
//!     ├── Daily aggregation (stats/)
//!     │
//!     └── Storage (store/): in-memory or PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod stats;
pub mod store;
