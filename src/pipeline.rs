//! Item pipeline: creators and updaters on the way in, converters on the way out,
//! triggers once the store has confirmed a write.

use crate::common::{Item, update};

use std::{fmt, sync};

/// Produces base attributes for a new item from the caller's item.
pub type Creator = sync::Arc<dyn Fn(&Item) -> Item + Send + Sync>;

/// Produces base update attributes from the caller's update attributes.
pub type Updater =
    sync::Arc<dyn Fn(&update::UpdateAttributes) -> update::UpdateAttributes + Send + Sync>;

/// Rewrites an item read from the store in place, given the projection that was requested.
///
/// Converters must be idempotent.
pub type Converter = sync::Arc<dyn Fn(&mut Item, Option<&[String]>) + Send + Sync>;

/// Post-write hook, called once per confirmed write.
pub type Trigger = sync::Arc<dyn Fn(&TriggerEvent) + Send + Sync>;

/// The kind of write that fired a trigger.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Command {
    /// An item was created or replaced.
    Put,
    /// An item was updated.
    Update,
    /// An item was deleted.
    Delete,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Put => f.write_str("put"),
            Self::Update => f.write_str("update"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// Trigger invocation record.
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerEvent {
    /// The key of the written item.
    pub key: Item,
    /// What happened to it.
    pub command: Command,
    /// Model name.
    pub model: String,
    /// Table name.
    pub table_name: String,
    /// The item view when known: the put item, the updated image, or the deleted image.
    pub item: Option<Item>,
}

/// Runs every creator in registration order and merges its output onto the caller's item.
///
/// Every creator sees the original caller item; creator output overrides caller
/// attributes, later creators override earlier ones.
pub fn apply_creators(creators: &[Creator], item: Item) -> Item {
    let base = creators.iter().fold(Item::new(), |mut base, creator| {
        base.extend(creator(&item));
        base
    });
    let mut item = item;
    item.extend(base);
    item
}

/// Runs every updater in registration order and merges its output onto the attributes.
pub fn apply_updaters(
    updaters: &[Updater],
    attributes: update::UpdateAttributes,
) -> update::UpdateAttributes {
    let base = updaters
        .iter()
        .fold(update::UpdateAttributes::new(), |mut base, updater| {
            base.extend(updater(&attributes));
            base
        });
    let mut attributes = attributes;
    attributes.extend(base);
    attributes
}

/// Runs every converter in registration order over a raw item.
pub fn apply_converters(converters: &[Converter], item: &mut Item, projection: Option<&[String]>) {
    for converter in converters {
        converter(item, projection);
    }
}

/// Calls every trigger in registration order.
pub fn fire_triggers(triggers: &[Trigger], event: &TriggerEvent) {
    for trigger in triggers {
        trigger(event);
    }
}
