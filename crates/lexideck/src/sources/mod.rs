//! Source adapters: one per external dictionary or media site.

pub mod adapter;
pub mod dicio;
pub mod images;
pub mod linguee;
pub mod registry;
pub mod reverso;
pub mod transport;

pub use adapter::{FetchError, FetchRequest, SourceAdapter, SourceId};
pub use registry::{SourceRegistry, SourceSettings};
pub use transport::{
    FixtureTransport, HttpRequest, HttpTransport, RawResponse, Transport, TransportError,
};
