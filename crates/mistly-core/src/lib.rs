//! Idempotent, dependency-ordered provisioning for the Mist cloud.
//!
//! Given a [`DesiredState`] for one site, the workflow looks up what
//! already exists and creates only what is missing, in the order the
//! cloud's dependencies require:
//!
//! - **[`resolver`]**: existence checks by natural key (site name, SSID,
//!   MAC) over lazily paginated collections. Not found is `Ok(None)`.
//! - **[`creator`]**: typed write calls, including the three-way claim
//!   classification ([`ClaimOutcome`]).
//! - **[`orchestrator`]**: the step sequence with failure containment,
//!   plus a read-only [`plan`](orchestrator::plan) mode.
//! - **[`WorkflowContext`]**: the client, scope ids, cancellation token,
//!   progress sink and accumulated results for one run.

pub mod config;
pub mod context;
pub mod convert;
pub mod creator;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod resolver;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ClientConfig, DEFAULT_API_URL, TlsVerification};
pub use context::{RetryPolicy, WorkflowContext};
pub use creator::ClaimOutcome;
pub use error::CoreError;
pub use orchestrator::{plan, provision};

pub use model::{
    BandRadio, DesiredState, DesiredStateDocument, DeviceSpec, EntityId, Halt, HaltCause, Lookup,
    MacAddress, Outcome, OutcomeCounts, ProvisioningResult, RadioBand, RadioSpec, RemoteResource,
    ResourceKind, RunMode, RunSummary, SiteSpec, WlanBand, WlanSecurity, WlanSpec,
};
