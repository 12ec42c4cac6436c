// mistly-api: Async Rust client for the Mist cloud management API
//
// One hand-written client covering the org, site, inventory and token
// endpoints the provisioning workflow drives. Endpoint groups live in their
// own modules as inherent `impl MistClient` blocks; `client` only deals with
// transport mechanics.

pub mod auth;
pub mod client;
pub mod devices;
pub mod error;
pub mod inventory;
pub mod models;
pub mod pagination;
pub mod sites;
pub mod transport;
pub mod wlans;

pub use auth::ApiToken;
pub use client::{DEFAULT_BASE_URL, MistClient};
pub use error::Error;
pub use pagination::{PAGE_LIMIT, Page};
pub use transport::{TlsMode, TransportConfig};
