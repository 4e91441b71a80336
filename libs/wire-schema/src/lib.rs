//! Wire contract shared by the relay and the client library.
//!
//! Everything that crosses the network lives here: REST request/response
//! bodies, the WebSocket event enums, the unified error-response shape, and
//! the validated newtypes for key and nonce material. The relay never
//! inspects ciphertext; these types keep it opaque end to end.

pub mod dto;
pub mod error;
pub mod events;
pub mod validate;

pub use dto::*;
pub use error::ErrorResponse;
pub use events::{ClientEvent, ServerEvent};
pub use validate::{MessageNonce, PublicKey, SchemaError};
