//! Query and response types that only exist at the HTTP boundary.
//!
//! Domain types ([`crate::domain::Child`], [`crate::domain::Event`],
//! [`crate::domain::Stored`]) serialize directly; the types here cover
//! query strings and envelopes.

pub mod common_dto;

pub use common_dto::*;
