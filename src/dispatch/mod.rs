/*
 * Responsibility
 * - resource dispatch adapter の公開インターフェース (re-export)
 */
pub mod controller;
pub mod methods;
pub mod outcome;
pub mod paging;
pub mod route;

pub use controller::{ControllerBuilder, DispatchRequest, ResourceController, WiringError};
pub use methods::{AllowedMethods, KNOWN_METHODS, UnknownMethod};
pub use outcome::Outcome;
pub use paging::{PageSizePolicy, Paging};
pub use route::ResourceRoute;
