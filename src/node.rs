//! Object identification
//! See: https://graphql.org/learn/global-object-identification/
//!
//! [`NodeDefinitions`] bundles the `Node` interface and the `node(id: ID!)` root
//! field around a caller-supplied [`NodeResolver`]. Each call to
//! [`NodeDefinitions::new`] produces an independent bundle; nothing is shared
//! between schemas.
//!
//! An id that fails to decode resolves to `null` without an error, exactly like
//! an id the resolver cannot find. Errors raised by the resolver itself surface
//! as field errors.

use std::any::Any;
use std::sync::Arc;

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, Interface, InterfaceField, SchemaBuilder, TypeRef,
    ValueAccessor,
};
use async_graphql::{Context, Value};
use async_trait::async_trait;

use crate::global_id::{from_global_id, to_global_id, ResolvedGlobalId};

/// Default name of the node interface
pub const NODE: &str = "Node";

/// Default name of the root lookup field
pub const NODE_FIELD: &str = "node";

/// Looks up entities by global id and classifies them
#[async_trait]
pub trait NodeResolver: Send + Sync + 'static {
    /// Handle for a fetched entity
    type Entity: Any + Send + Sync;

    /// Fetch the entity identified by `id`, `None` if it does not exist
    async fn fetch(
        &self,
        id: &ResolvedGlobalId,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Option<Self::Entity>>;

    /// Name of the object type `entity` is rendered as
    async fn resolve_type(
        &self,
        entity: &Self::Entity,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<String>;

    /// Parent value handed to the resolved object type's field resolvers
    ///
    /// Override when the entity is an enum over per-type structs and the object
    /// resolvers expect the inner struct.
    fn into_field_value(entity: Self::Entity) -> FieldValue<'static> {
        FieldValue::owned_any(entity)
    }
}

/// `Node` interface and root field bound to one resolver
pub struct NodeDefinitions<R> {
    resolver: Arc<R>,
    interface_name: String,
    field_name: String,
}

impl<R: NodeResolver> NodeDefinitions<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver: Arc::new(resolver),
            interface_name: NODE.to_string(),
            field_name: NODE_FIELD.to_string(),
        }
    }

    pub fn with_interface_name(mut self, name: impl Into<String>) -> Self {
        self.interface_name = name.into();
        self
    }

    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// Name object types pass to `Object::implement`
    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    /// The interface every identifiable object implements
    pub fn interface(&self) -> Interface {
        Interface::new(self.interface_name.as_str())
            .description("An object with an ID")
            .field(
                InterfaceField::new("id", TypeRef::named_nn(TypeRef::ID))
                    .description("The id of the object."),
            )
    }

    /// Root field resolving any node by global id
    pub fn node_field(&self) -> Field {
        let resolver = Arc::clone(&self.resolver);

        Field::new(
            self.field_name.as_str(),
            TypeRef::named(self.interface_name.as_str()),
            move |ctx| {
                let resolver = Arc::clone(&resolver);
                FieldFuture::new(async move {
                    let raw = id_argument(&ctx.args.try_get("id")?)?;
                    let id = match from_global_id(&raw) {
                        Ok(id) => id,
                        Err(error) => {
                            tracing::debug!(id = %raw, %error, "unresolvable node id");
                            return Ok(None);
                        }
                    };

                    let Some(entity) = resolver.fetch(&id, ctx.ctx).await? else {
                        tracing::debug!(type_name = %id.type_name, id = %id.id, "node not found");
                        return Ok(None);
                    };
                    let type_name = resolver.resolve_type(&entity, ctx.ctx).await?;

                    Ok(Some(R::into_field_value(entity).with_type(type_name)))
                })
            },
        )
        .description("Fetches an object given its ID")
        .argument(
            InputValue::new("id", TypeRef::named_nn(TypeRef::ID))
                .description("The ID of an object"),
        )
    }

    /// Register the interface
    ///
    /// The root field still has to be added to the query object with
    /// [`NodeDefinitions::node_field`].
    pub fn register(&self, builder: SchemaBuilder) -> SchemaBuilder {
        builder.register(self.interface())
    }
}

fn id_argument(value: &ValueAccessor<'_>) -> async_graphql::Result<String> {
    match value.as_value() {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("expected an ID, found {other}").into()),
    }
}

/// Non-null `id: ID!` field encoding the parent's local id as a global id
pub fn global_id_field<T, F>(type_name: impl Into<String>, local_id: F) -> Field
where
    T: Any + Send + Sync,
    F: Fn(&T) -> String + Send + Sync + 'static,
{
    let type_name = type_name.into();

    Field::new("id", TypeRef::named_nn(TypeRef::ID), move |ctx| {
        let global_id = ctx
            .parent_value
            .try_downcast_ref::<T>()
            .map(|source| to_global_id(&type_name, &local_id(source)));
        FieldFuture::new(async move { Ok(Some(Value::from(global_id?))) })
    })
    .description("The ID of an object")
}
