// ── Domain model ──

pub mod desired;
pub mod entity_id;
pub mod radio;
pub mod result;

pub use desired::{
    DesiredState, DesiredStateDocument, DeviceDocument, DeviceSpec, SiteSpec, WlanBand,
    WlanSecurity, WlanSpec,
};
pub use entity_id::{EntityId, InvalidMac, MacAddress};
pub use radio::{BandRadio, RadioBand, RadioSpec};
pub use result::{
    Halt, HaltCause, Lookup, Outcome, OutcomeCounts, ProvisioningResult, RemoteResource,
    ResourceKind, RunMode, RunSummary,
};
