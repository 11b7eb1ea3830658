//! Relay input-object mutations
//!
//! A client mutation takes a single `input` argument of type `<Name>Input` and
//! returns `<Name>Payload`. Both carry an optional `clientMutationId` which is
//! echoed back untouched. No transaction or rollback is provided here.

use std::any::Any;
use std::sync::Arc;

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputObject, InputValue, Object, SchemaBuilder, TypeRef,
};
use async_graphql::{Context, Value};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Correlation token field name
pub const CLIENT_MUTATION_ID: &str = "clientMutationId";

/// Performs a mutation
#[async_trait]
pub trait MutateAndGetPayload: Send + Sync + 'static {
    /// Result handed to the payload's output fields
    type Output: Any + Send + Sync;

    async fn mutate(
        &self,
        input: MutationInput,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Self::Output>;
}

/// Input fields of a mutation, without `clientMutationId`
#[derive(Debug, Clone, PartialEq)]
pub struct MutationInput(Value);

impl MutationInput {
    pub fn get(&self, name: &str) -> Option<&Value> {
        match &self.0 {
            Value::Object(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Deserialize the input fields into a typed struct
    pub fn deserialize<T: DeserializeOwned>(&self) -> async_graphql::Result<T> {
        Ok(async_graphql::from_value(self.0.clone())?)
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Parent value of the payload object
#[derive(Debug, Clone, PartialEq)]
pub struct MutationPayload<T> {
    pub client_mutation_id: Option<String>,
    pub output: T,
}

impl<T: Any + Send + Sync> MutationPayload<T> {
    /// Payload from an output field's parent value
    pub fn from_parent<'a>(parent: &'a FieldValue<'a>) -> async_graphql::Result<&'a Self> {
        parent.try_downcast_ref::<Self>()
    }
}

/// Input object, payload object and field of one mutation
pub struct ClientMutationDefinitions {
    pub input: InputObject,
    pub payload: Object,
    pub field: Field,
}

impl ClientMutationDefinitions {
    /// Register the input and payload types
    ///
    /// The field still has to be added to the mutation object.
    pub fn register(self, builder: SchemaBuilder) -> (SchemaBuilder, Field) {
        (builder.register(self.input).register(self.payload), self.field)
    }
}

/// Builder for a client mutation field
pub struct ClientMutation<M> {
    name: String,
    description: Option<String>,
    mutator: Arc<M>,
    input_fields: Vec<InputValue>,
    output_fields: Vec<Field>,
}

impl<M: MutateAndGetPayload> ClientMutation<M> {
    pub fn new(name: impl Into<String>, mutator: M) -> Self {
        Self {
            name: name.into(),
            description: None,
            mutator: Arc::new(mutator),
            input_fields: Vec::new(),
            output_fields: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn input_field(mut self, field: InputValue) -> Self {
        self.input_fields.push(field);
        self
    }

    /// Add a payload field
    ///
    /// Its resolver reads the mutation result through
    /// [`MutationPayload::from_parent`].
    pub fn output_field(mut self, field: Field) -> Self {
        self.output_fields.push(field);
        self
    }

    pub fn build(self) -> ClientMutationDefinitions {
        let type_prefix = upper_first(&self.name);
        let input_name = format!("{type_prefix}Input");
        let payload_name = format!("{type_prefix}Payload");

        let input = self
            .input_fields
            .into_iter()
            .fold(InputObject::new(input_name.as_str()), InputObject::field)
            .field(InputValue::new(CLIENT_MUTATION_ID, TypeRef::named(TypeRef::STRING)));

        let payload = self
            .output_fields
            .into_iter()
            .fold(Object::new(payload_name.as_str()), Object::field)
            .field(Field::new(
                CLIENT_MUTATION_ID,
                TypeRef::named(TypeRef::STRING),
                |ctx| {
                    FieldFuture::new(async move {
                        let payload = MutationPayload::<M::Output>::from_parent(ctx.parent_value)?;
                        Ok(Some(Value::from(payload.client_mutation_id.clone())))
                    })
                },
            ));

        let mutator = self.mutator;
        let mut field = Field::new(self.name, TypeRef::named(payload_name), move |ctx| {
            let mutator = Arc::clone(&mutator);
            FieldFuture::new(async move {
                let input = ctx.args.try_get("input")?.object()?;
                let client_mutation_id = input
                    .get(CLIENT_MUTATION_ID)
                    .filter(|v| !v.is_null())
                    .map(|v| v.string().map(str::to_owned))
                    .transpose()?;
                let fields = input
                    .iter()
                    .filter(|(name, _)| name.as_str() != CLIENT_MUTATION_ID)
                    .map(|(name, value)| (name.clone(), value.as_value().clone()))
                    .collect();

                let output = mutator.mutate(MutationInput(Value::Object(fields)), ctx.ctx).await?;

                Ok(Some(FieldValue::owned_any(MutationPayload {
                    client_mutation_id,
                    output,
                })))
            })
        })
        .argument(InputValue::new("input", TypeRef::named_nn(input_name)));

        if let Some(description) = self.description {
            field = field.description(description);
        }

        ClientMutationDefinitions {
            input,
            payload,
            field,
        }
    }
}

fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
