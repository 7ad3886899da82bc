pub mod events;
pub mod hal;
pub mod negotiation;
