// Remote service seam: the async trait the app talks to, its HTTP
// implementation, and player tag handling.

pub mod client;
pub mod error;
pub mod tag;

pub use client::{HttpRemote, RemoteService};
pub use error::RemoteError;
pub use tag::PlayerTag;
