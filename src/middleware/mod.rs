/*
 * Responsibility
 * - middleware の公開インターフェース
 * - pub fn cors::apply(...), http::apply(...) など
 */
pub mod cors;
pub mod http;
