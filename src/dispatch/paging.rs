//! Page number / page size resolution from the query string.
//!
//! Both values are resolved per call and handed to the collection
//! decoration; nothing is stored on the controller.
use std::collections::HashMap;
use std::num::NonZeroU64;

pub const PAGE_PARAM: &str = "page";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSizePolicy {
    default_size: NonZeroU64,
    param: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: u64,
    pub page_size: u64,
}

impl PageSizePolicy {
    pub fn new(default_size: NonZeroU64, param: Option<String>) -> Self {
        Self {
            default_size,
            param: param.filter(|p| !p.trim().is_empty()),
        }
    }

    pub fn with_param(self, param: Option<String>) -> Self {
        Self::new(self.default_size, param)
    }

    pub fn default_size(&self) -> u64 {
        self.default_size.get()
    }

    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    pub fn page_size(&self, query: &HashMap<String, String>) -> u64 {
        self.param
            .as_ref()
            .and_then(|name| positive(query.get(name)))
            .unwrap_or(self.default_size.get())
    }

    pub fn resolve(&self, query: &HashMap<String, String>) -> Paging {
        Paging {
            page: positive(query.get(PAGE_PARAM)).unwrap_or(1),
            page_size: self.page_size(query),
        }
    }
}

impl Default for PageSizePolicy {
    fn default() -> Self {
        Self::new(NonZeroU64::MIN.saturating_add(24), None)
    }
}

fn positive(raw: Option<&String>) -> Option<u64> {
    raw?.trim().parse::<u64>().ok().filter(|n| *n > 0)
}
