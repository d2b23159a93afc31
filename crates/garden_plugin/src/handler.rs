//! Action handlers: plain function values keyed by action name, with `super`
//! links so a handler inherited through a `base` chain can delegate to its
//! parent's implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

/// Error returned by a handler invocation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

/// A plugin action handler: takes the action's resolved parameters and
/// returns its result as JSON.
pub type Handler = Arc<dyn Fn(&Value) -> Result<Value, HandlerError> + Send + Sync>;

/// A single entry in a [`HandlerTable`].
///
/// `super_handler` is set when this entry overrides one inherited from a
/// `base` plugin (or, for module type extensions, from the type's creator);
/// invoking it runs the parent's implementation.
#[derive(Clone)]
pub struct HandlerEntry {
    /// This slot's own handler.
    pub handler: Handler,
    /// The handler this one overrides, if any.
    pub super_handler: Option<Arc<HandlerEntry>>,
}

impl HandlerEntry {
    /// Wraps a handler with no `super` link.
    #[must_use]
    pub fn leaf(handler: Handler) -> Self {
        Self {
            handler,
            super_handler: None,
        }
    }

    /// Invokes this entry's own handler.
    pub fn call(&self, params: &Value) -> Result<Value, HandlerError> {
        (self.handler)(params)
    }

    /// Invokes the handler this entry overrides, if any.
    pub fn call_super(&self, params: &Value) -> Option<Result<Value, HandlerError>> {
        self.super_handler.as_ref().map(|parent| parent.call(params))
    }
}

/// A set of action handlers keyed by action name.
pub type HandlerTable = BTreeMap<String, Arc<HandlerEntry>>;

/// Overlays `child` on top of `base`, leaf wins: every action `base` declares
/// that `child` does not override is carried forward unchanged; every action
/// `child` declares replaces `base`'s entry (if any) and gets a `super` link
/// to it.
#[must_use]
pub fn overlay(base: &HandlerTable, child: &HandlerTable) -> HandlerTable {
    let mut merged = base.clone();
    for (action, entry) in child {
        let super_handler = base.get(action).cloned();
        merged.insert(
            action.clone(),
            Arc::new(HandlerEntry {
                handler: entry.handler.clone(),
                super_handler,
            }),
        );
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant_handler(value: Value) -> Handler {
        Arc::new(move |_params| Ok(value.clone()))
    }

    #[test]
    fn overlay_leaf_wins_and_links_super() {
        let mut base = HandlerTable::new();
        base.insert("build".to_string(), Arc::new(HandlerEntry::leaf(constant_handler(json!("base")))));

        let mut child = HandlerTable::new();
        child.insert("build".to_string(), Arc::new(HandlerEntry::leaf(constant_handler(json!("child")))));

        let merged = overlay(&base, &child);
        let entry = &merged["build"];
        assert_eq!(entry.call(&json!({})).unwrap(), json!("child"));
        assert_eq!(entry.call_super(&json!({})).unwrap().unwrap(), json!("base"));
    }

    #[test]
    fn overlay_keeps_unoverridden_base_actions() {
        let mut base = HandlerTable::new();
        base.insert("configure".to_string(), Arc::new(HandlerEntry::leaf(constant_handler(json!("base-configure")))));

        let child = HandlerTable::new();
        let merged = overlay(&base, &child);
        assert!(merged.contains_key("configure"));
        assert!(merged["configure"].super_handler.is_none());
    }
}
