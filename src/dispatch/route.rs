/// Route identity of the resource: the URL segment it lives under and the
/// name of the identifier (route parameter / entity field).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRoute {
    name: String,
    identifier_name: String,
}

impl ResourceRoute {
    pub fn new(name: impl Into<String>, identifier_name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim_matches('/').to_string(),
            identifier_name: identifier_name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identifier_name(&self) -> &str {
        &self.identifier_name
    }

    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && !self.name.contains('/') && !self.identifier_name.is_empty()
    }

    /// Path of the collection, e.g. `/widgets`.
    pub fn collection_path(&self) -> String {
        format!("/{}", self.name)
    }

    /// Path template of a single item, e.g. `/widgets/{id}`.
    pub fn item_path(&self) -> String {
        format!("/{}/{{{}}}", self.name, self.identifier_name)
    }
}
