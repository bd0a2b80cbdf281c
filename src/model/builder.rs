use crate::{
    client::Client,
    common::{Item, key::KeySchema, update::UpdateAttributes},
    error::{Error, Result},
    model::{Model, ModelDefinition},
    pipeline::{Converter, Creator, Trigger, TriggerEvent, Updater},
};

use indexmap::IndexMap;
use std::{fmt, sync};

/// Values that may be supplied at build time instead of on the builder.
#[derive(Clone, Debug, Default)]
pub struct BuildOptions {
    /// Client, overriding the builder's.
    pub client: Option<Client>,
    /// Model name, overriding the builder's.
    pub name: Option<String>,
    /// Table name, overriding the builder's. Defaults to the model name.
    pub table_name: Option<String>,
}

/// Accumulates a model's configuration.
///
/// Every `with_*` call returns the updated builder; nothing can be removed. Creators,
/// updaters, converters and triggers run in the order they were added. Building never
/// consumes the builder, so one builder can materialize several models (one per table, say).
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_model::{Client, Item, common::key::KeySchema};
///
/// # async fn example(client: Client) -> dynamodb_model::Result<()> {
/// let users = client
///     .model("user", Some("users".to_string()))
///     .with_key(KeySchema::hash("id"))
///     .with_index("by-email", KeySchema::hash("email"))
///     .with_creator(|_: &Item| {
///         Item::from([("kind".to_string(), AttributeValue::S("user".to_string()))])
///     })
///     .build(Default::default())?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct ModelBuilder {
    client: Option<Client>,
    converters: Vec<Converter>,
    creators: Vec<Creator>,
    indices: Vec<(String, KeySchema)>,
    key: Option<KeySchema>,
    name: Option<String>,
    table_name: Option<String>,
    triggers: Vec<Trigger>,
    updaters: Vec<Updater>,
}

impl fmt::Debug for ModelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBuilder")
            .field("name", &self.name)
            .field("table_name", &self.table_name)
            .field("key", &self.key)
            .field("indices", &self.indices)
            .finish_non_exhaustive()
    }
}

impl ModelBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the model name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the table name.
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Sets the table key. A second call replaces the first.
    pub fn with_key(mut self, key: KeySchema) -> Self {
        self.key = Some(key);
        self
    }

    /// Declares a secondary index.
    pub fn with_index(mut self, name: impl Into<String>, key: KeySchema) -> Self {
        self.indices.push((name.into(), key));
        self
    }

    /// Appends a creator.
    pub fn with_creator(mut self, creator: impl Fn(&Item) -> Item + Send + Sync + 'static) -> Self {
        self.creators.push(sync::Arc::new(creator));
        self
    }

    /// Appends an updater.
    pub fn with_updater(
        mut self,
        updater: impl Fn(&UpdateAttributes) -> UpdateAttributes + Send + Sync + 'static,
    ) -> Self {
        self.updaters.push(sync::Arc::new(updater));
        self
    }

    /// Appends a converter.
    pub fn with_converter(
        mut self,
        converter: impl Fn(&mut Item, Option<&[String]>) + Send + Sync + 'static,
    ) -> Self {
        self.converters.push(sync::Arc::new(converter));
        self
    }

    /// Appends a trigger.
    pub fn with_trigger(mut self, trigger: impl Fn(&TriggerEvent) + Send + Sync + 'static) -> Self {
        self.triggers.push(sync::Arc::new(trigger));
        self
    }

    /// Materializes a model.
    ///
    /// Fails with [`Error::MissingConfiguration`] when no client, name or key is resolvable
    /// and with [`Error::InvalidArgument`] when an index name is declared twice.
    pub fn build(&self, options: BuildOptions) -> Result<Model> {
        let client = options
            .client
            .or_else(|| self.client.clone())
            .ok_or(Error::MissingConfiguration("client"))?;
        let definition = self.definition(options.name, options.table_name)?;
        Ok(Model::new(client, definition))
    }

    fn definition(
        &self,
        name: Option<String>,
        table_name: Option<String>,
    ) -> Result<ModelDefinition> {
        let name = name
            .or_else(|| self.name.clone())
            .ok_or(Error::MissingConfiguration("name"))?;
        let table_name = table_name
            .or_else(|| self.table_name.clone())
            .unwrap_or_else(|| name.clone());
        let key = self
            .key
            .clone()
            .ok_or(Error::MissingConfiguration("key"))?;
        let mut indices = IndexMap::with_capacity(self.indices.len());
        for (index_name, index_key) in &self.indices {
            if indices
                .insert(index_name.clone(), index_key.clone())
                .is_some()
            {
                return Err(Error::InvalidArgument(format!(
                    "index `{index_name}` is declared twice"
                )));
            }
        }
        let definition = ModelDefinition {
            converters: self.converters.clone(),
            creators: self.creators.clone(),
            indices,
            key,
            name,
            table_name,
            triggers: self.triggers.clone(),
            updaters: self.updaters.clone(),
        };
        Ok(definition)
    }
}
