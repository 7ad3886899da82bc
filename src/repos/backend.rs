//! Resource backend interface consumed by the dispatch adapter.
use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::repos::error::{BackendError, BackendResult};

/// Persistence-side operations behind a resource route.
///
/// The adapter only sees success values or a [`BackendError`]; it never
/// decides what "create" or "patch" mean for the stored data.
///
/// Implementations are shared across requests (`Arc<dyn ResourceBackend>`).
#[async_trait]
pub trait ResourceBackend: Send + Sync + 'static {
    // Backend name (for logging).
    fn backend_name(&self) -> &'static str;

    async fn create(&self, data: Value) -> BackendResult<Value>;

    // `Ok(None)` means nothing matched; the adapter turns that into a 404.
    async fn fetch(&self, id: &str) -> BackendResult<Option<Value>>;

    async fn fetch_all(&self) -> BackendResult<Vec<Value>>;

    async fn update(&self, id: &str, data: Value) -> BackendResult<Value>;

    async fn patch(&self, id: &str, data: Value) -> BackendResult<Value>;

    // `Ok(false)` means nothing was deleted.
    async fn delete(&self, id: &str) -> BackendResult<bool>;

    async fn delete_list(&self) -> BackendResult<bool>;

    async fn patch_list(&self, data: Value) -> BackendResult<Vec<Value>>;

    async fn replace_list(&self, data: Value) -> BackendResult<Vec<Value>>;
}

/// Read an entity's identifier field as a string (string or number).
pub fn identifier_of(entity: &Value, identifier_name: &str) -> Option<String> {
    entity.get(identifier_name).and_then(identifier_value)
}

fn identifier_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn expect_object(data: Value) -> BackendResult<Map<String, Value>> {
    match data {
        Value::Object(obj) => Ok(obj),
        _ => Err(BackendError::invalid_payload(
            "Invalid payload: expected a JSON object",
        )),
    }
}

pub(crate) fn expect_objects(data: Value) -> BackendResult<Vec<Map<String, Value>>> {
    let Value::Array(entries) = data else {
        return Err(BackendError::invalid_payload(
            "Invalid payload: expected a JSON array",
        ));
    };
    entries.into_iter().map(expect_object).collect()
}

/// Make sure `obj` carries an identifier; generate a UUID v4 if absent.
pub(crate) fn ensure_identifier(obj: &mut Map<String, Value>, identifier_name: &str) -> String {
    match obj.get(identifier_name).and_then(identifier_value) {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4().to_string();
            obj.insert(identifier_name.to_string(), Value::String(id.clone()));
            id
        }
    }
}
