//! Per-session item store
//!
//! Opaque values attached to a session by the client's protocol handler
//! (authentication context, plugin state). Lives exactly as long as the
//! session that owns it.

use std::any::Any;

use ahash::AHashMap;

type Item = Box<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct SessionItems {
    items: AHashMap<String, Item>,
}

impl SessionItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, returning whatever was there before.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) -> Option<Item> {
        self.items.insert(key.into(), Box::new(value))
    }

    /// Typed lookup; `None` if absent or stored with a different type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.items.get(key)?.downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.items.get_mut(key)?.downcast_mut()
    }

    pub fn remove(&mut self, key: &str) -> Option<Item> {
        self.items.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl std::fmt::Debug for SessionItems {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.items.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let mut items = SessionItems::new();
        assert!(items.insert("tenant", String::from("acme")).is_none());
        items.insert("hits", 3u32);

        assert_eq!(items.get::<String>("tenant").map(String::as_str), Some("acme"));
        assert_eq!(items.get::<u64>("hits"), None);

        *items.get_mut::<u32>("hits").unwrap() += 1;
        assert_eq!(items.get::<u32>("hits"), Some(&4));

        assert!(items.insert("hits", 0u32).is_some());
        assert!(items.remove("tenant").is_some());
        assert!(!items.contains_key("tenant"));
        assert_eq!(items.len(), 1);
    }
}
