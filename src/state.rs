/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - resource route ごとの ResourceController
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::dispatch::ResourceController;

#[derive(Clone, Debug)]
pub struct AppState {
    pub controller: Arc<ResourceController>,
}

impl AppState {
    pub fn new(controller: Arc<ResourceController>) -> Self {
        Self { controller }
    }
}
