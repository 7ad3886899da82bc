//! HAL hypermedia decoration: self links on entities, pagination links and
//! `_embedded` entries on collections.
//!
//! Absolute hrefs are built from a base URL (e.g. `http://host/api/v1`) with
//! the `url` crate so route names and identifiers are percent-encoded.

use serde_json::{Map, Value, json};
use url::Url;

use axum::http::StatusCode;

use crate::error::ApiProblem;
use crate::repos::identifier_of;

pub const HAL_JSON: &str = "application/hal+json";

const DEFAULT_PAGE_SIZE: u64 = 25;

/// Decorates backend results with hypermedia links.
pub trait HypermediaBuilder: Send + Sync + 'static {
    fn create_resource(
        &self,
        entity: Value,
        route: &str,
        identifier_name: &str,
    ) -> Result<HalEntity, ApiProblem>;

    fn create_collection(&self, items: Vec<Value>, route: &str) -> Result<HalCollection, ApiProblem>;
}

#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base: Url,
}

impl LinkBuilder {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn collection(&self, route: &str) -> Url {
        self.with_segments(&[route])
    }

    pub fn item(&self, route: &str, id: &str) -> Url {
        self.with_segments(&[route, id])
    }

    pub fn page(&self, route: &str, page: u64, size_param: Option<(&str, u64)>) -> Url {
        let mut url = self.collection(route);
        {
            let mut query = url.query_pairs_mut();
            query.clear().append_pair("page", &page.to_string());
            if let Some((name, size)) = size_param {
                query.append_pair(name, &size.to_string());
            }
        }
        url
    }

    fn with_segments(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        // A cannot-be-a-base URL is rejected by config; leave such a base as is.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Default builder producing HAL JSON.
#[derive(Debug, Clone)]
pub struct HalBuilder {
    links: LinkBuilder,
}

impl HalBuilder {
    pub fn new(base: Url) -> Self {
        Self {
            links: LinkBuilder::new(base),
        }
    }
}

impl HypermediaBuilder for HalBuilder {
    fn create_resource(
        &self,
        entity: Value,
        route: &str,
        identifier_name: &str,
    ) -> Result<HalEntity, ApiProblem> {
        let id = identifier_of(&entity, identifier_name).ok_or_else(|| {
            ApiProblem::unprocessable("Unable to determine identifier for resource")
        })?;
        let self_href = self.links.item(route, &id);
        Ok(HalEntity {
            id,
            entity,
            self_href,
        })
    }

    fn create_collection(&self, items: Vec<Value>, route: &str) -> Result<HalCollection, ApiProblem> {
        Ok(HalCollection::new(items, route, self.links.clone()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HalEntity {
    id: String,
    entity: Value,
    self_href: Url,
}

impl HalEntity {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entity(&self) -> &Value {
        &self.entity
    }

    pub fn self_href(&self) -> &Url {
        &self.self_href
    }

    pub fn to_json(&self) -> Value {
        with_self_link(self.entity.clone(), &self.self_href)
    }
}

fn with_self_link(entity: Value, href: &Url) -> Value {
    match entity {
        Value::Object(mut obj) => {
            obj.insert("_links".into(), json!({ "self": { "href": href.as_str() } }));
            Value::Object(obj)
        }
        other => other,
    }
}

/// A collection awaiting annotation by the controller, rendered on demand.
#[derive(Debug, Clone)]
pub struct HalCollection {
    items: Vec<Value>,
    links: LinkBuilder,
    collection_route: String,
    item_route: String,
    identifier_name: String,
    page: u64,
    page_size: u64,
    page_size_param: Option<String>,
    collection_name: String,
}

impl HalCollection {
    pub fn new(items: Vec<Value>, route: &str, links: LinkBuilder) -> Self {
        Self {
            items,
            links,
            collection_route: route.to_string(),
            item_route: route.to_string(),
            identifier_name: "id".to_string(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            page_size_param: None,
            collection_name: route.to_string(),
        }
    }

    pub fn set_collection_route(&mut self, route: impl Into<String>) -> &mut Self {
        self.collection_route = route.into();
        self
    }

    pub fn set_item_route(&mut self, route: impl Into<String>) -> &mut Self {
        self.item_route = route.into();
        self
    }

    pub fn set_route_identifier_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.identifier_name = name.into();
        self
    }

    pub fn set_page(&mut self, page: u64) -> &mut Self {
        self.page = page.max(1);
        self
    }

    pub fn set_page_size(&mut self, page_size: u64) -> &mut Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn set_page_size_param(&mut self, param: Option<String>) -> &mut Self {
        self.page_size_param = param;
        self
    }

    pub fn set_collection_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.collection_name = name.into();
        self
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn collection_route(&self) -> &str {
        &self.collection_route
    }

    pub fn item_route(&self) -> &str {
        &self.item_route
    }

    pub fn identifier_name(&self) -> &str {
        &self.identifier_name
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn total_items(&self) -> u64 {
        self.items.len() as u64
    }

    pub fn page_count(&self) -> u64 {
        self.total_items().div_ceil(self.page_size)
    }

    /// Render the current page as HAL JSON.
    ///
    /// Asking for a page past the last one of a non-empty collection is a 409.
    pub fn render(&self) -> Result<Value, ApiProblem> {
        let total = self.total_items();
        let page_count = self.page_count();
        if total > 0 && self.page > page_count {
            return Err(ApiProblem::new(StatusCode::CONFLICT, "Invalid page provided"));
        }

        let start = usize::try_from((self.page - 1).saturating_mul(self.page_size))
            .unwrap_or(usize::MAX);
        let embedded: Vec<Value> = self
            .items
            .iter()
            .skip(start)
            .take(usize::try_from(self.page_size).unwrap_or(usize::MAX))
            .map(|item| self.embed(item))
            .collect();

        let mut links = Map::new();
        links.insert("self".into(), self.page_link(self.page));
        links.insert("first".into(), self.page_link(1));
        links.insert("last".into(), self.page_link(page_count.max(1)));
        if self.page > 1 {
            links.insert("prev".into(), self.page_link(self.page - 1));
        }
        if self.page < page_count {
            links.insert("next".into(), self.page_link(self.page + 1));
        }

        let mut embedded_map = Map::new();
        embedded_map.insert(self.collection_name.clone(), Value::Array(embedded));

        Ok(json!({
            "_links": links,
            "_embedded": embedded_map,
            "page": self.page,
            "page_count": page_count,
            "page_size": self.page_size,
            "total_items": total,
        }))
    }

    fn embed(&self, item: &Value) -> Value {
        match identifier_of(item, &self.identifier_name) {
            Some(id) => with_self_link(item.clone(), &self.links.item(&self.item_route, &id)),
            None => item.clone(),
        }
    }

    fn page_link(&self, page: u64) -> Value {
        let size = self
            .page_size_param
            .as_deref()
            .map(|name| (name, self.page_size));
        let href = self.links.page(&self.collection_route, page, size);
        json!({ "href": href.as_str() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> HalBuilder {
        HalBuilder::new(Url::parse("http://example.test/api/v1").unwrap())
    }

    fn items(n: usize) -> Vec<Value> {
        (1..=n).map(|i| json!({ "id": i.to_string(), "n": i })).collect()
    }

    #[test]
    fn resource_gets_absolute_self_link() {
        let entity = builder()
            .create_resource(json!({"id": "a b", "name": "x"}), "widgets", "id")
            .unwrap();
        assert_eq!(entity.id(), "a b");
        assert_eq!(entity.self_href().as_str(), "http://example.test/api/v1/widgets/a%20b");
        assert_eq!(
            entity.to_json()["_links"]["self"]["href"],
            "http://example.test/api/v1/widgets/a%20b"
        );
        assert_eq!(entity.to_json()["name"], "x");
    }

    #[test]
    fn resource_without_identifier_is_rejected() {
        let err = builder()
            .create_resource(json!({"name": "x"}), "widgets", "id")
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = builder()
            .create_resource(json!("scalar"), "widgets", "id")
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn collection_renders_requested_page() {
        let mut c = builder().create_collection(items(7), "widgets").unwrap();
        c.set_page(2).set_page_size(3).set_collection_name("widget");

        let out = c.render().unwrap();
        assert_eq!(out["page"], 2);
        assert_eq!(out["page_count"], 3);
        assert_eq!(out["page_size"], 3);
        assert_eq!(out["total_items"], 7);

        let embedded = out["_embedded"]["widget"].as_array().unwrap();
        assert_eq!(embedded.len(), 3);
        assert_eq!(embedded[0]["id"], "4");
        assert_eq!(
            embedded[0]["_links"]["self"]["href"],
            "http://example.test/api/v1/widgets/4"
        );

        assert_eq!(out["_links"]["prev"]["href"], "http://example.test/api/v1/widgets?page=1");
        assert_eq!(out["_links"]["next"]["href"], "http://example.test/api/v1/widgets?page=3");
        assert_eq!(out["_links"]["last"]["href"], "http://example.test/api/v1/widgets?page=3");
    }

    #[test]
    fn page_size_param_is_carried_in_links() {
        let mut c = builder().create_collection(items(2), "widgets").unwrap();
        c.set_page_size(1).set_page_size_param(Some("per_page".into()));

        let out = c.render().unwrap();
        assert_eq!(
            out["_links"]["next"]["href"],
            "http://example.test/api/v1/widgets?page=2&per_page=1"
        );
        assert!(out["_links"].get("prev").is_none());
    }

    #[test]
    fn page_past_the_end_is_a_conflict() {
        let mut c = builder().create_collection(items(2), "widgets").unwrap();
        c.set_page(5).set_page_size(1);
        assert_eq!(c.render().unwrap_err().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn empty_collection_renders_without_error() {
        let mut c = builder().create_collection(Vec::new(), "widgets").unwrap();
        c.set_page(3);
        let out = c.render().unwrap();
        assert_eq!(out["total_items"], 0);
        assert_eq!(out["_embedded"]["widgets"], json!([]));
    }
}
