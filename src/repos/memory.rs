/*
 * Responsibility
 * - プロセス内 (HashMap 相当) の ResourceBackend 実装
 * - BACKEND=memory 時の既定 / テスト用
 * - entity は JSON object、identifier は identifier_name のフィールドに持つ
 */
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::ApiProblem;
use crate::repos::backend::{
    ResourceBackend, ensure_identifier, expect_object, expect_objects, identifier_of,
};
use crate::repos::error::{BackendError, BackendResult};

/// In-memory backend. Entities are kept ordered by identifier so
/// collection pages are stable between requests.
#[derive(Clone, Debug)]
pub struct MemoryBackend {
    identifier_name: String,
    entities: Arc<RwLock<BTreeMap<String, Map<String, Value>>>>,
}

impl MemoryBackend {
    pub fn new(identifier_name: impl Into<String>) -> Self {
        Self {
            identifier_name: identifier_name.into(),
            entities: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub async fn count(&self) -> usize {
        self.entities.read().await.len()
    }

    fn missing(id: &str) -> BackendError {
        ApiProblem::not_found(format!("Entity '{id}' not found.")).into()
    }
}

#[async_trait]
impl ResourceBackend for MemoryBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, data: Value) -> BackendResult<Value> {
        let mut obj = expect_object(data)?;
        let id = ensure_identifier(&mut obj, &self.identifier_name);

        let mut entities = self.entities.write().await;
        if entities.contains_key(&id) {
            return Err(ApiProblem::new(
                StatusCode::CONFLICT,
                format!("Entity '{id}' already exists."),
            )
            .into());
        }
        entities.insert(id, obj.clone());

        Ok(Value::Object(obj))
    }

    async fn fetch(&self, id: &str) -> BackendResult<Option<Value>> {
        let entities = self.entities.read().await;
        Ok(entities.get(id).cloned().map(Value::Object))
    }

    async fn fetch_all(&self) -> BackendResult<Vec<Value>> {
        let entities = self.entities.read().await;
        Ok(entities.values().cloned().map(Value::Object).collect())
    }

    async fn update(&self, id: &str, data: Value) -> BackendResult<Value> {
        let mut obj = expect_object(data)?;
        // The route identifier wins over whatever the body says.
        obj.insert(self.identifier_name.clone(), Value::String(id.to_string()));

        let mut entities = self.entities.write().await;
        let slot = entities.get_mut(id).ok_or_else(|| Self::missing(id))?;
        *slot = obj.clone();

        Ok(Value::Object(obj))
    }

    async fn patch(&self, id: &str, data: Value) -> BackendResult<Value> {
        let changes = expect_object(data)?;

        let mut entities = self.entities.write().await;
        let slot = entities.get_mut(id).ok_or_else(|| Self::missing(id))?;
        for (key, value) in changes {
            if key != self.identifier_name {
                slot.insert(key, value);
            }
        }

        Ok(Value::Object(slot.clone()))
    }

    async fn delete(&self, id: &str) -> BackendResult<bool> {
        Ok(self.entities.write().await.remove(id).is_some())
    }

    async fn delete_list(&self) -> BackendResult<bool> {
        self.entities.write().await.clear();
        Ok(true)
    }

    async fn patch_list(&self, data: Value) -> BackendResult<Vec<Value>> {
        let entries = expect_objects(data)?;

        let mut targeted = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = identifier_of(&Value::Object(entry.clone()), &self.identifier_name)
                .ok_or_else(|| {
                    BackendError::invalid_payload("Invalid payload: every entry needs an identifier")
                })?;
            targeted.push((id, entry));
        }

        let mut entities = self.entities.write().await;
        // All or nothing: check every target before touching any.
        if let Some((id, _)) = targeted.iter().find(|(id, _)| !entities.contains_key(id)) {
            return Err(Self::missing(id));
        }

        let mut patched = Vec::with_capacity(targeted.len());
        for (id, changes) in targeted {
            if let Some(slot) = entities.get_mut(&id) {
                slot.extend(changes);
                patched.push(Value::Object(slot.clone()));
            }
        }

        Ok(patched)
    }

    async fn replace_list(&self, data: Value) -> BackendResult<Vec<Value>> {
        let entries = expect_objects(data)?;

        let mut replacement = BTreeMap::new();
        let mut out = Vec::with_capacity(entries.len());
        for mut entry in entries {
            let id = ensure_identifier(&mut entry, &self.identifier_name);
            out.push(Value::Object(entry.clone()));
            replacement.insert(id, entry);
        }

        *self.entities.write().await = replacement;
        Ok(out)
    }
}
