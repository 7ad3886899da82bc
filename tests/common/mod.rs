#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use url::Url;

use resource_dispatch::dispatch::{
    AllowedMethods, ControllerBuilder, PageSizePolicy, ResourceController, ResourceRoute,
};
use resource_dispatch::error::ApiProblem;
use resource_dispatch::repos::{BackendError, BackendResult, ResourceBackend};
use resource_dispatch::services::events::EventBus;
use resource_dispatch::services::hal::HalBuilder;

pub const BASE: &str = "http://api.test/api/v1";

/// Shared ordered log of backend calls and events ("backend.fetch", "fetch.pre", ...).
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// What every backend call answers with.
#[derive(Debug, Clone)]
pub enum Script {
    Succeed,
    /// `fetch` → `None`, `delete`/`delete_list` → `false`.
    Empty,
    Fault(Option<i64>),
    Reject(ApiProblem),
    /// Succeeds, but the entity carries no identifier.
    Anonymous,
}

pub struct ScriptedBackend {
    script: Script,
    items: usize,
    journal: Journal,
}

impl ScriptedBackend {
    pub fn new(script: Script, journal: Journal) -> Self {
        Self {
            script,
            items: 3,
            journal,
        }
    }

    pub fn with_items(mut self, items: usize) -> Self {
        self.items = items;
        self
    }

    fn record(&self, call: &str) {
        self.journal.lock().unwrap().push(format!("backend.{call}"));
    }

    fn entity(&self, id: &str, extra: Option<&Value>) -> Value {
        let mut entity = match self.script {
            Script::Anonymous => json!({ "name": "anonymous" }),
            _ => json!({ "id": id, "name": format!("widget {id}") }),
        };
        if let (Some(Value::Object(extra)), Some(obj)) = (extra, entity.as_object_mut()) {
            for (k, v) in extra {
                if k != "id" {
                    obj.insert(k.clone(), v.clone());
                }
            }
        }
        entity
    }

    fn list(&self) -> Vec<Value> {
        (1..=self.items)
            .map(|i| self.entity(&i.to_string(), None))
            .collect()
    }

    fn fail<T>(&self) -> Option<BackendResult<T>> {
        match &self.script {
            Script::Fault(code) => Some(Err(BackendError::Fault {
                code: *code,
                message: "backend exploded".into(),
            })),
            Script::Reject(problem) => Some(Err(BackendError::Rejected(problem.clone()))),
            _ => None,
        }
    }

    fn empty(&self) -> bool {
        matches!(self.script, Script::Empty)
    }
}

#[async_trait]
impl ResourceBackend for ScriptedBackend {
    fn backend_name(&self) -> &'static str {
        "scripted"
    }

    async fn create(&self, data: Value) -> BackendResult<Value> {
        self.record("create");
        if let Some(failure) = self.fail() {
            return failure;
        }
        Ok(self.entity("new", Some(&data)))
    }

    async fn fetch(&self, id: &str) -> BackendResult<Option<Value>> {
        self.record("fetch");
        if let Some(failure) = self.fail() {
            return failure;
        }
        if self.empty() {
            return Ok(None);
        }
        Ok(Some(self.entity(id, None)))
    }

    async fn fetch_all(&self) -> BackendResult<Vec<Value>> {
        self.record("fetch_all");
        if let Some(failure) = self.fail() {
            return failure;
        }
        Ok(self.list())
    }

    async fn update(&self, id: &str, data: Value) -> BackendResult<Value> {
        self.record("update");
        if let Some(failure) = self.fail() {
            return failure;
        }
        Ok(self.entity(id, Some(&data)))
    }

    async fn patch(&self, id: &str, data: Value) -> BackendResult<Value> {
        self.record("patch");
        if let Some(failure) = self.fail() {
            return failure;
        }
        Ok(self.entity(id, Some(&data)))
    }

    async fn delete(&self, _id: &str) -> BackendResult<bool> {
        self.record("delete");
        if let Some(failure) = self.fail() {
            return failure;
        }
        Ok(!self.empty())
    }

    async fn delete_list(&self) -> BackendResult<bool> {
        self.record("delete_list");
        if let Some(failure) = self.fail() {
            return failure;
        }
        Ok(!self.empty())
    }

    async fn patch_list(&self, _data: Value) -> BackendResult<Vec<Value>> {
        self.record("patch_list");
        if let Some(failure) = self.fail() {
            return failure;
        }
        Ok(self.list())
    }

    async fn replace_list(&self, _data: Value) -> BackendResult<Vec<Value>> {
        self.record("replace_list");
        if let Some(failure) = self.fail() {
            return failure;
        }
        Ok(self.list())
    }
}

/// Event bus writing every event name into the journal.
pub fn recording_bus(journal: &Journal) -> EventBus {
    let sink = journal.clone();
    EventBus::builder()
        .on_every(move |event| sink.lock().unwrap().push(event.name()))
        .build()
}

pub fn controller_builder(backend: Arc<dyn ResourceBackend>, journal: &Journal) -> ControllerBuilder {
    ResourceController::builder()
        .backend(backend)
        .hypermedia(Arc::new(HalBuilder::new(Url::parse(BASE).unwrap())))
        .events(recording_bus(journal))
        .route(ResourceRoute::new("widgets", "id"))
        .collection_methods(AllowedMethods::parse_list("GET,POST,PUT,PATCH,DELETE").unwrap())
        .entity_methods(AllowedMethods::parse_list("GET,PUT,PATCH,DELETE").unwrap())
        .page_size(PageSizePolicy::default())
}

pub fn scripted(script: Script) -> (ResourceController, Journal) {
    let journal = journal();
    let backend = Arc::new(ScriptedBackend::new(script, journal.clone()));
    let controller = controller_builder(backend, &journal).build().unwrap();
    (controller, journal)
}
