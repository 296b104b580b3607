//! Data models
//!
//! The replicated record type plus the request/response DTOs of the
//! inspection API.

pub mod requests;
pub mod responses;
pub mod stored;

// Re-export commonly used types
pub use requests::SetRequest;
pub use responses::{
    ClearResponse, GetResponse, HealthResponse, InvalidateResponse, MaintenanceResponse,
    SetResponse, StatsResponse,
};
pub use stored::StoredValue;
