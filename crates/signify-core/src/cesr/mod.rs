//! CESR primitives: self-framing text encoding of keys, digests,
//! signatures and the count codes that group them.
//!
//! - [`codes`]: derivation codes and the [`Codec`] size table.
//! - [`matter`]: raw material tagged with its code.
//! - [`indexer`]: signatures bound to a key index.
//! - [`counter`]: group counters and path framing for attachments.

pub mod b64;
pub mod codes;
pub mod counter;
pub mod indexer;
pub mod matter;

pub use codes::{mtr, Codec, Sizage};
pub use counter::{pather, Counter, CounterCode};
pub use indexer::IndexedSignature;
pub use matter::Matter;
