pub mod health;
pub mod resource;
