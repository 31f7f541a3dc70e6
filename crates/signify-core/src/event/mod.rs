//! Key events and exchange messages: typed bodies, canonical
//! serialization, version framing and self-addressing identifiers.

pub mod builder;
pub mod serder;
pub mod types;
pub mod version;

pub use builder::{incept, interact, rotate, RotationArgs};
pub use serder::Serder;
pub use types::{
    Event, ExchangeEvent, Ilk, InceptionEvent, InteractionEvent, RotationEvent, Seal, Threshold,
};
pub use version::{deversify, versify, Version};
