//! Mesh coordinator: turns presence changes and local call actions into
//! peer session operations.

mod coordinator;
mod types;


pub use coordinator::MeshCoordinator;
pub use types::{MeshCommand, MeshEvent};
