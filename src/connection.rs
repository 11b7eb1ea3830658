//! `async_graphql::dynamic` types for connections
//! See: https://relay.dev/graphql/connections.htm#sec-Connection-Types
//!
//! A connection field resolves to `FieldValue::owned_any(Connection<T>)`; the
//! generated `Edge`, `Connection` and `PageInfo` objects read from it.

use std::any::Any;

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, Object, SchemaBuilder, TypeRef,
};
use async_graphql::Value;

use crate::pagination::{Connection, Edge, PageInfo};

/// Name of the shared page info type
pub const PAGE_INFO: &str = "PageInfo";

/// Edge and connection objects for one node type
pub struct ConnectionDefinitions {
    pub edge: Object,
    pub connection: Object,
}

impl ConnectionDefinitions {
    /// Register both objects
    ///
    /// `PageInfo` is shared between connections and registered separately with
    /// [`page_info_type`].
    pub fn register(self, builder: SchemaBuilder) -> SchemaBuilder {
        builder.register(self.edge).register(self.connection)
    }
}

/// The `PageInfo` object
pub fn page_info_type() -> Object {
    Object::new(PAGE_INFO)
        .description("Information about pagination in a connection.")
        .field(page_info_field(
            "hasNextPage",
            TypeRef::named_nn(TypeRef::BOOLEAN),
            |info| Value::from(info.has_next_page),
        ))
        .field(page_info_field(
            "hasPreviousPage",
            TypeRef::named_nn(TypeRef::BOOLEAN),
            |info| Value::from(info.has_previous_page),
        ))
        .field(page_info_field(
            "startCursor",
            TypeRef::named(TypeRef::STRING),
            |info| Value::from(info.start_cursor.clone()),
        ))
        .field(page_info_field(
            "endCursor",
            TypeRef::named(TypeRef::STRING),
            |info| Value::from(info.end_cursor.clone()),
        ))
}

fn page_info_field(name: &str, ty: TypeRef, read: fn(&PageInfo) -> Value) -> Field {
    Field::new(name, ty, move |ctx| {
        FieldFuture::new(async move {
            let info = ctx.parent_value.try_downcast_ref::<PageInfo>()?;
            Ok(Some(read(info)))
        })
    })
}

/// `<name>Edge` and `<name>Connection` objects over nodes of `node_type`
///
/// `T` is the Rust type stored in the [`Connection`]; `node_type` must be an
/// object type whose resolvers downcast their parent to `T`.
pub fn connection_definitions<T>(name: &str, node_type: impl Into<String>) -> ConnectionDefinitions
where
    T: Any + Send + Sync,
{
    let edge_name = format!("{name}Edge");

    let edge = Object::new(edge_name.as_str())
        .description("An edge in a connection.")
        .field(
            Field::new("node", TypeRef::named(node_type), |ctx| {
                FieldFuture::new(async move {
                    let edge = ctx.parent_value.try_downcast_ref::<Edge<T>>()?;
                    Ok(Some(FieldValue::borrowed_any(&edge.node)))
                })
            })
            .description("The item at the end of the edge"),
        )
        .field(
            Field::new("cursor", TypeRef::named_nn(TypeRef::STRING), |ctx| {
                FieldFuture::new(async move {
                    let edge = ctx.parent_value.try_downcast_ref::<Edge<T>>()?;
                    Ok(Some(Value::from(edge.cursor.as_str())))
                })
            })
            .description("A cursor for use in pagination"),
        );

    let connection = Object::new(format!("{name}Connection"))
        .description("A connection to a list of items.")
        .field(
            Field::new("edges", TypeRef::named_list(edge_name), |ctx| {
                FieldFuture::new(async move {
                    let connection = ctx.parent_value.try_downcast_ref::<Connection<T>>()?;
                    Ok(Some(FieldValue::list(
                        connection.edges.iter().map(|edge| FieldValue::borrowed_any(edge)),
                    )))
                })
            })
            .description("A list of edges."),
        )
        .field(
            Field::new("pageInfo", TypeRef::named_nn(PAGE_INFO), |ctx| {
                FieldFuture::new(async move {
                    let connection = ctx.parent_value.try_downcast_ref::<Connection<T>>()?;
                    Ok(Some(FieldValue::borrowed_any(&connection.page_info)))
                })
            })
            .description("Information to aid in pagination."),
        );

    ConnectionDefinitions { edge, connection }
}

/// Connection arguments on a field
pub trait FieldConnectionExt {
    /// Add `before`, `after`, `first` and `last`
    fn connection_arguments(self) -> Self;
}

impl FieldConnectionExt for Field {
    fn connection_arguments(self) -> Self {
        self.argument(InputValue::new("before", TypeRef::named(TypeRef::STRING)))
            .argument(InputValue::new("after", TypeRef::named(TypeRef::STRING)))
            .argument(InputValue::new("first", TypeRef::named(TypeRef::INT)))
            .argument(InputValue::new("last", TypeRef::named(TypeRef::INT)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::{connection_from_slice, ConnectionArgs};
    use async_graphql::dynamic::Schema;
    use serde_json::json;

    #[derive(Clone)]
    struct Letter(&'static str);

    fn schema() -> Schema {
        let letter = Object::new("Letter").field(Field::new(
            "value",
            TypeRef::named_nn(TypeRef::STRING),
            |ctx| {
                FieldFuture::new(async move {
                    let letter = ctx.parent_value.try_downcast_ref::<Letter>()?;
                    Ok(Some(Value::from(letter.0)))
                })
            },
        ));

        let query = Object::new("Query").field(
            Field::new("letters", TypeRef::named("LetterConnection"), |ctx| {
                FieldFuture::new(async move {
                    let letters = ["A", "B", "C", "D", "E"].map(Letter);
                    let args = ConnectionArgs::from_accessor(&ctx.args)?;
                    let connection = connection_from_slice(&letters, &args)?;
                    Ok(Some(FieldValue::owned_any(connection)))
                })
            })
            .connection_arguments(),
        );

        let builder = Schema::build("Query", None, None)
            .register(query)
            .register(letter)
            .register(page_info_type());
        connection_definitions::<Letter>("Letter", "Letter")
            .register(builder)
            .finish()
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_and_after_through_schema() {
        let after = crate::CursorCodec::encode_offset(1);
        let query = format!(
            r#"{{
                letters(first: 2, after: "{after}") {{
                    edges {{ cursor node {{ value }} }}
                    pageInfo {{ hasNextPage hasPreviousPage startCursor endCursor }}
                }}
            }}"#
        );
        let response = schema().execute(query.as_str()).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({
                "letters": {
                    "edges": [
                        { "cursor": "YXJyYXljb25uZWN0aW9uOjI=", "node": { "value": "C" } },
                        { "cursor": "YXJyYXljb25uZWN0aW9uOjM=", "node": { "value": "D" } },
                    ],
                    "pageInfo": {
                        "hasNextPage": true,
                        "hasPreviousPage": true,
                        "startCursor": "YXJyYXljb25uZWN0aW9uOjI=",
                        "endCursor": "YXJyYXljb25uZWN0aW9uOjM=",
                    }
                }
            })
        );
    }

    #[tokio::test]
    async fn test_empty_page_through_schema() {
        let response = schema()
            .execute(
                "{ letters(first: 0) { edges { cursor } pageInfo { startCursor endCursor } } }",
            )
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({
                "letters": {
                    "edges": [],
                    "pageInfo": { "startCursor": null, "endCursor": null }
                }
            })
        );
    }

    #[tokio::test]
    async fn test_negative_first_is_a_field_error() {
        let response = schema()
            .execute(
                r#"{
                    bad: letters(first: -1) { edges { cursor } }
                    good: letters(first: 1) { edges { node { value } } }
                }"#,
            )
            .await;
        assert_eq!(response.errors.len(), 1);
        assert_eq!(
            response.errors[0].message,
            "Invalid argument: Argument \"first\" must be a non-negative integer"
        );
        // the failing field is left out, its sibling still resolves
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({ "good": { "edges": [ { "node": { "value": "A" } } ] } })
        );
    }

    #[tokio::test]
    async fn test_garbage_cursor_is_ignored_through_schema() {
        let response = schema()
            .execute(r#"{ letters(last: 1, before: "not-a-cursor") { edges { node { value } } } }"#)
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({ "letters": { "edges": [ { "node": { "value": "E" } } ] } })
        );
    }
}
