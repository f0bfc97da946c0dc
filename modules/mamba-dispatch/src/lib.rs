pub mod directory;
pub mod geo;
pub mod orchestrator;
pub mod store;

pub use directory::{HospitalDirectory, MemoryDirectory};
pub use geo::{nearby, resolve_nearest, HospitalDistance};
pub use orchestrator::DispatchService;
pub use store::{IncidentChange, IncidentStore, MemoryIncidentStore};
