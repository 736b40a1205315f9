use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::persistence::HostedStore;

/// In-process JSON tree with the same path semantics as the hosted database:
/// `null` deletes, and emptied parents disappear.
pub struct MemoryStore {
    root: RwLock<Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Value::Object(Map::new())),
        }
    }

    pub fn with_data(data: Value) -> Self {
        Self {
            root: RwLock::new(data),
        }
    }

    pub async fn snapshot(&self) -> Value {
        self.root.read().await.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn set_in(node: &mut Value, path: &[&str], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }

    if let Value::Object(map) = node {
        if value.is_null() && !map.contains_key(*head) {
            return;
        }

        let child = map.entry(head.to_string()).or_insert(Value::Null);
        set_in(child, rest, value);
        if is_empty(child) {
            map.remove(*head);
        }
    }
}

#[async_trait]
impl HostedStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, AppError> {
        let root = self.root.read().await;
        let mut node = &*root;
        for segment in segments(path) {
            match node.get(segment) {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }

        if is_empty(node) {
            Ok(None)
        } else {
            Ok(Some(node.clone()))
        }
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), AppError> {
        let mut root = self.root.write().await;
        set_in(&mut root, &segments(path), value);
        if root.is_null() {
            *root = Value::Object(Map::new());
        }
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), AppError> {
        let mut root = self.root.write().await;
        let base = segments(path);
        for (field, value) in fields {
            let mut target = base.clone();
            target.extend(segments(&field));
            set_in(&mut root, &target, value);
        }
        if root.is_null() {
            *root = Value::Object(Map::new());
        }
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), AppError> {
        self.set(path, Value::Null).await
    }
}
