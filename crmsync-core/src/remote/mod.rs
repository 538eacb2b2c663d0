//! Remote service types
//!
//! Descriptions of the operations sent to the CRM query service and the
//! decoded data that comes back.

mod operation;
mod response;

pub use operation::{OperationKind, RemoteOperation};
pub use response::{RemoteResponse, ShapeError};
