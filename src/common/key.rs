use crate::{
    common::Item,
    error::{Error, Result},
};

use serde::Serialize;
use serde_dynamo::to_attribute_value;

/// Key component.
///
/// ```rust
/// use dynamodb_model::common::key;
///
/// let key = key::Key {
///     name: "id".to_string(),
///     value: "1".to_string(),
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Key<T> {
    /// The attribute name of the key.
    pub name: String,
    /// The value of the key.
    pub value: T,
}

/// Typed primary key value (partition key and optional sort key).
///
/// ```rust
/// use dynamodb_model::common::{Item, key};
///
/// let keys = key::Keys {
///     partition_key: key::Key {
///         name: "id".to_string(),
///         value: "1".to_string(),
///     },
///     ..Default::default()
/// };
/// let item: Item = keys.try_into().unwrap();
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Keys<T> {
    /// The partition key (required).
    pub partition_key: Key<T>,
    /// The sort key (optional, only for tables with composite primary keys).
    pub sort_key: Option<Key<T>>,
}

impl<T: Serialize> TryFrom<Keys<T>> for Item {
    type Error = Error;

    fn try_from(key: Keys<T>) -> Result<Self> {
        let partition_key_value = to_attribute_value(key.partition_key.value)?;
        let mut keys = Self::from([(key.partition_key.name, partition_key_value)]);
        if let Some(sort_key) = key.sort_key {
            let sort_key_value = to_attribute_value(sort_key.value)?;
            keys.insert(sort_key.name, sort_key_value);
        }
        Ok(keys)
    }
}

/// The 1 (hash) or 2 (hash + range) attribute names of a table or index key.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct KeySchema {
    /// The partition (hash) key attribute.
    pub partition_key: String,
    /// The sort (range) key attribute.
    pub sort_key: Option<String>,
}

impl KeySchema {
    /// A hash-only key.
    pub fn hash(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    /// A hash + range key.
    pub fn composite(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: Some(sort_key.into()),
        }
    }

    /// The key attribute names, partition key first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.as_str()).chain(self.sort_key.as_deref())
    }

    /// Whether `name` is one of the key attributes.
    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|key| key == name)
    }

    /// Projects an item onto the key attributes.
    ///
    /// Fails when the item lacks one of them.
    pub fn project(&self, item: &Item) -> Result<Item> {
        self.names()
            .map(|name| {
                item.get(name)
                    .map(|value| (name.to_string(), value.clone()))
                    .ok_or_else(|| {
                        Error::InvalidArgument(format!("item is missing key attribute `{name}`"))
                    })
            })
            .collect()
    }
}
