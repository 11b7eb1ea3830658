//! # pleme-graphql-relay
//!
//! Relay conventions for Pleme GraphQL services, built on the
//! `async_graphql::dynamic` schema API.
//!
//! ## Features
//!
//! - **Global IDs** - opaque `base64("Type:id")` object identifiers
//! - **Node Resolution** - `Node` interface and polymorphic `node(id:)` root field
//! - **Connections** - cursor pagination over slices and paged sources
//! - **Client Mutations** - `input`/payload mutation fields echoing `clientMutationId`
//! - **Server** - axum handler injecting request context
//!
//! ## Usage
//!
//! ```rust
//! use pleme_graphql_relay::pagination::{connection_from_slice, ConnectionArgs};
//!
//! let letters = vec!["A", "B", "C", "D", "E"];
//! let args = ConnectionArgs::default().with_first(2);
//! let connection = connection_from_slice(&letters, &args).unwrap();
//! assert_eq!(connection.edges.len(), 2);
//! assert!(connection.page_info.has_next_page);
//! ```

pub mod global_id;
pub mod pagination;
pub mod connection;
pub mod node;
pub mod mutation;
pub mod server;

pub use connection::{
    connection_definitions, page_info_type, ConnectionDefinitions, FieldConnectionExt,
};
pub use global_id::{from_global_id, to_global_id, ResolvedGlobalId};
pub use mutation::{
    ClientMutation, ClientMutationDefinitions, MutateAndGetPayload, MutationInput,
    MutationPayload,
};
pub use node::{global_id_field, NodeDefinitions, NodeResolver};
pub use pagination::{
    connection_from_array_slice, connection_from_slice, connection_from_source, Connection,
    ConnectionArgs, CursorCodec, Edge, PageInfo, PageLimits, PagedSource, SliceInfo,
};
pub use server::{graphql_handler, request_context, RequestContext};

use thiserror::Error;

/// Relay errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Invalid global id: {0}")]
    InvalidGlobalId(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for Relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
