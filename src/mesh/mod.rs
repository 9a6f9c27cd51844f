//! Unstructured-mesh connectivity framework.
//!
//! Storage sites, face groups, and compressed-row connectivities are the
//! contracts a finite-volume transport solver assembles its equations over.
//! The solver itself (discretization schemes, linear solvers, partitioning)
//! lives outside this crate.

pub mod connectivity;
pub mod site;
pub mod topology;

pub use connectivity::{Connectivity, ConnectivityBuilder};
pub use site::{SiteId, StorageSite};
pub use topology::{FaceGroup, FaceGroupKind, Mesh};
