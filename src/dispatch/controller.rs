/*
 * Responsibility
 * - 1 つの resource route に対する HTTP verb → backend 操作の振り分け
 * - method gate (item / collection) → pre event → backend → 装飾 → post event
 * - 失敗はすべて ApiProblem (値) に畳んで Outcome として返す
 *
 * 置かないもの
 * - 永続化の意味 (backend の責務)
 * - link 生成 / pagination の表現 (HypermediaBuilder の責務)
 * - content negotiation / 描画 (services::negotiation の責務)
 */
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use thiserror::Error;

use crate::dispatch::methods::AllowedMethods;
use crate::dispatch::outcome::Outcome;
use crate::dispatch::paging::{PageSizePolicy, Paging};
use crate::dispatch::route::ResourceRoute;
use crate::error::ApiProblem;
use crate::repos::ResourceBackend;
use crate::services::events::{EventBus, EventKind, EventPayload, Phase};
use crate::services::hal::{HalCollection, HalEntity, HypermediaBuilder};

/// Wiring problems; these abort startup instead of failing a request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WiringError {
    #[error("resource controller has no backend")]
    MissingBackend,
    #[error("resource controller has no hypermedia builder")]
    MissingHypermedia,
    #[error("resource controller has no route identity")]
    MissingRoute,
    #[error("invalid route identity: {0:?}")]
    InvalidRoute(ResourceRoute),
}

/// One incoming request, already split into the parts the controller needs.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: Method,
    pub id: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

impl DispatchRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            id: None,
            query: HashMap::new(),
            body: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

pub struct ResourceController {
    backend: Arc<dyn ResourceBackend>,
    hal: Arc<dyn HypermediaBuilder>,
    events: EventBus,
    route: ResourceRoute,
    collection_methods: AllowedMethods,
    entity_methods: AllowedMethods,
    page_size: PageSizePolicy,
    collection_name: String,
}

impl fmt::Debug for ResourceController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceController")
            .field("backend", &self.backend.backend_name())
            .field("route", &self.route)
            .field("collection_methods", &self.collection_methods)
            .field("entity_methods", &self.entity_methods)
            .field("page_size", &self.page_size)
            .field("collection_name", &self.collection_name)
            .finish()
    }
}

impl ResourceController {
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::default()
    }

    pub fn route(&self) -> &ResourceRoute {
        &self.route
    }

    pub fn collection_methods(&self) -> &AllowedMethods {
        &self.collection_methods
    }

    pub fn entity_methods(&self) -> &AllowedMethods {
        &self.entity_methods
    }

    fn allowed_methods(&self, has_id: bool) -> &AllowedMethods {
        if has_id {
            &self.entity_methods
        } else {
            &self.collection_methods
        }
    }

    /// Method gate for the item (`has_id`) or collection set. Returns the 405
    /// with `Allow` when the method is not admitted; callers may run it
    /// before reading the body.
    pub fn gate(&self, method: &Method, has_id: bool) -> Option<Response> {
        let allowed = self.allowed_methods(has_id);
        if allowed.admits(method) {
            return None;
        }
        tracing::debug!(
            route = self.route.name(),
            %method,
            item = has_id,
            "method not allowed"
        );
        Some(allowed.method_not_allowed())
    }

    /// Gate the method, then run the matching handler.
    pub async fn dispatch(&self, request: DispatchRequest) -> Outcome {
        let DispatchRequest {
            method,
            id,
            query,
            body,
        } = request;

        if method == Method::OPTIONS {
            return self.options(id.as_deref(), &query);
        }

        if let Some(rejection) = self.gate(&method, id.is_some()) {
            return Outcome::Response(rejection);
        }
        let allowed = self.allowed_methods(id.is_some());

        let data = body.unwrap_or(Value::Null);
        let verb = method.as_str().to_ascii_uppercase();
        let outcome = match (verb.as_str(), id) {
            ("GET", Some(id)) => self.fetch(&id).await,
            ("GET", None) => self.fetch_all(&query).await,
            ("HEAD", id) => self.head(id.as_deref(), &query).await,
            // POST never addresses an item, but an item route that admits it creates.
            ("POST", _) => self.create(data).await,
            ("PUT", Some(id)) => self.update(&id, data).await,
            ("PUT", None) => self.replace_list(data, &query).await,
            ("PATCH", Some(id)) => self.patch(&id, data).await,
            ("PATCH", None) => self.patch_list(data, &query).await,
            ("DELETE", Some(id)) => self.delete(&id).await,
            ("DELETE", None) => self.delete_list().await,
            _ => Outcome::Response(allowed.method_not_allowed()),
        };

        if let Some(problem) = outcome.problem() {
            tracing::debug!(
                route = self.route.name(),
                %method,
                status = %problem.status(),
                detail = problem.detail(),
                "dispatch produced a problem"
            );
        }
        outcome
    }

    pub async fn create(&self, data: Value) -> Outcome {
        self.try_create(data).await.into()
    }

    pub async fn fetch(&self, id: &str) -> Outcome {
        self.try_fetch(id).await.into()
    }

    pub async fn fetch_all(&self, query: &HashMap<String, String>) -> Outcome {
        self.try_fetch_all(query).await.into()
    }

    pub async fn update(&self, id: &str, data: Value) -> Outcome {
        self.try_update(EventKind::Update, id, data).await.into()
    }

    pub async fn patch(&self, id: &str, data: Value) -> Outcome {
        self.try_update(EventKind::Patch, id, data).await.into()
    }

    pub async fn patch_list(&self, data: Value, query: &HashMap<String, String>) -> Outcome {
        self.try_bulk(EventKind::PatchList, data, query).await.into()
    }

    pub async fn replace_list(&self, data: Value, query: &HashMap<String, String>) -> Outcome {
        self.try_bulk(EventKind::ReplaceList, data, query).await.into()
    }

    pub async fn delete(&self, id: &str) -> Outcome {
        self.try_delete(Some(id)).await.into()
    }

    pub async fn delete_list(&self) -> Outcome {
        self.try_delete(None).await.into()
    }

    /// HEAD is GET without a body; hyper drops the body on the way out.
    pub async fn head(&self, id: Option<&str>, query: &HashMap<String, String>) -> Outcome {
        match id {
            Some(id) => self.fetch(id).await,
            None => self.fetch_all(query).await,
        }
    }

    /// 204 with `Allow` for the item or the collection; the backend is not
    /// consulted. The identifier may also come from the query string.
    pub fn options(&self, id: Option<&str>, query: &HashMap<String, String>) -> Outcome {
        let id = id
            .or_else(|| query.get(self.route.identifier_name()).map(String::as_str))
            .filter(|id| !id.is_empty());

        let payload = match id {
            Some(id) => EventPayload::new().with_id(id),
            None => EventPayload::new(),
        };
        self.emit(EventKind::Options, Phase::Pre, &payload);
        let response = self.allowed_methods(id.is_some()).options_response();
        self.emit(EventKind::Options, Phase::Post, &payload);

        Outcome::Response(response)
    }

    async fn try_create(&self, data: Value) -> Result<Outcome, ApiProblem> {
        self.emit(
            EventKind::Create,
            Phase::Pre,
            &EventPayload::new().with_data(data.clone()),
        );

        let created = self.backend.create(data.clone()).await?;
        let entity = self.decorate(created)?;

        self.emit(
            EventKind::Create,
            Phase::Post,
            &EventPayload::new()
                .with_data(data)
                .with_resource(entity.entity().clone()),
        );
        Ok(Outcome::Created(entity))
    }

    async fn try_fetch(&self, id: &str) -> Result<Outcome, ApiProblem> {
        self.emit(EventKind::Fetch, Phase::Pre, &EventPayload::new().with_id(id));

        let found = self
            .backend
            .fetch(id)
            .await?
            .filter(|v| !v.is_null())
            .ok_or_else(|| ApiProblem::not_found("Resource not found."))?;
        let entity = self.decorate(found)?;

        self.emit(
            EventKind::Fetch,
            Phase::Post,
            &EventPayload::new()
                .with_id(id)
                .with_resource(entity.entity().clone()),
        );
        Ok(Outcome::Entity(entity))
    }

    async fn try_fetch_all(&self, query: &HashMap<String, String>) -> Result<Outcome, ApiProblem> {
        self.emit(EventKind::FetchAll, Phase::Pre, &EventPayload::new());

        let items = self.backend.fetch_all().await?;
        let collection = self.decorate_collection(items, self.page_size.resolve(query))?;

        self.emit(
            EventKind::FetchAll,
            Phase::Post,
            &EventPayload::new().with_collection(Value::Array(collection.items().to_vec())),
        );
        Ok(Outcome::Collection(collection))
    }

    // update and patch share everything except the backend call.
    async fn try_update(&self, kind: EventKind, id: &str, data: Value) -> Result<Outcome, ApiProblem> {
        self.emit(
            kind,
            Phase::Pre,
            &EventPayload::new().with_id(id).with_data(data.clone()),
        );

        let updated = match kind {
            EventKind::Patch => self.backend.patch(id, data.clone()).await?,
            _ => self.backend.update(id, data.clone()).await?,
        };
        let entity = self.decorate(updated)?;

        self.emit(
            kind,
            Phase::Post,
            &EventPayload::new()
                .with_id(id)
                .with_data(data)
                .with_resource(entity.entity().clone()),
        );
        Ok(Outcome::Entity(entity))
    }

    async fn try_bulk(
        &self,
        kind: EventKind,
        data: Value,
        query: &HashMap<String, String>,
    ) -> Result<Outcome, ApiProblem> {
        self.emit(kind, Phase::Pre, &EventPayload::new().with_data(data.clone()));

        let items = match kind {
            EventKind::PatchList => self.backend.patch_list(data.clone()).await?,
            _ => self.backend.replace_list(data.clone()).await?,
        };
        let collection = self.decorate_collection(items, self.page_size.resolve(query))?;

        self.emit(
            kind,
            Phase::Post,
            &EventPayload::new()
                .with_data(data)
                .with_collection(Value::Array(collection.items().to_vec())),
        );
        Ok(Outcome::Collection(collection))
    }

    // A false delete result is a domain failure (422), for items and lists alike.
    async fn try_delete(&self, id: Option<&str>) -> Result<Outcome, ApiProblem> {
        let (kind, payload) = match id {
            Some(id) => (EventKind::Delete, EventPayload::new().with_id(id)),
            None => (EventKind::DeleteList, EventPayload::new()),
        };
        self.emit(kind, Phase::Pre, &payload);

        let deleted = match id {
            Some(id) => self.backend.delete(id).await?,
            None => self.backend.delete_list().await?,
        };
        if !deleted {
            return Err(ApiProblem::unprocessable(match id {
                Some(_) => "Unable to delete entity.",
                None => "Unable to delete collection.",
            }));
        }

        self.emit(kind, Phase::Post, &payload);
        Ok(Outcome::Response(StatusCode::NO_CONTENT.into_response()))
    }

    fn decorate(&self, entity: Value) -> Result<HalEntity, ApiProblem> {
        self.hal
            .create_resource(entity, self.route.name(), self.route.identifier_name())
    }

    fn decorate_collection(&self, items: Vec<Value>, paging: Paging) -> Result<HalCollection, ApiProblem> {
        let mut collection = self.hal.create_collection(items, self.route.name())?;
        collection
            .set_collection_route(self.route.name())
            .set_item_route(self.route.name())
            .set_route_identifier_name(self.route.identifier_name())
            .set_page(paging.page)
            .set_page_size(paging.page_size)
            .set_page_size_param(self.page_size.param().map(str::to_string))
            .set_collection_name(self.collection_name.as_str());
        Ok(collection)
    }

    fn emit(&self, kind: EventKind, phase: Phase, payload: &EventPayload) {
        self.events.trigger(kind, phase, self.route.name(), payload);
    }
}

#[derive(Default)]
pub struct ControllerBuilder {
    backend: Option<Arc<dyn ResourceBackend>>,
    hal: Option<Arc<dyn HypermediaBuilder>>,
    events: EventBus,
    route: Option<ResourceRoute>,
    collection_methods: Option<AllowedMethods>,
    entity_methods: Option<AllowedMethods>,
    page_size: PageSizePolicy,
    collection_name: Option<String>,
}

impl ControllerBuilder {
    pub fn backend(mut self, backend: Arc<dyn ResourceBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn hypermedia(mut self, hal: Arc<dyn HypermediaBuilder>) -> Self {
        self.hal = Some(hal);
        self
    }

    pub fn events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn route(mut self, route: ResourceRoute) -> Self {
        self.route = Some(route);
        self
    }

    pub fn collection_methods(mut self, methods: AllowedMethods) -> Self {
        self.collection_methods = Some(methods);
        self
    }

    pub fn entity_methods(mut self, methods: AllowedMethods) -> Self {
        self.entity_methods = Some(methods);
        self
    }

    pub fn page_size(mut self, policy: PageSizePolicy) -> Self {
        self.page_size = policy;
        self
    }

    pub fn collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = Some(name.into()).filter(|n| !n.is_empty());
        self
    }

    pub fn build(self) -> Result<ResourceController, WiringError> {
        let backend = self.backend.ok_or(WiringError::MissingBackend)?;
        let route = self.route.ok_or(WiringError::MissingRoute)?;
        if !route.is_valid() {
            return Err(WiringError::InvalidRoute(route));
        }
        let hal = self.hal.ok_or(WiringError::MissingHypermedia)?;
        let collection_name = self
            .collection_name
            .unwrap_or_else(|| route.name().to_string());

        Ok(ResourceController {
            backend,
            hal,
            events: self.events,
            route,
            collection_methods: self
                .collection_methods
                .unwrap_or_else(AllowedMethods::collection_default),
            entity_methods: self
                .entity_methods
                .unwrap_or_else(AllowedMethods::entity_default),
            page_size: self.page_size,
            collection_name,
        })
    }
}
