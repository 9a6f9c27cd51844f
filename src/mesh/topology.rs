use std::collections::HashMap;

use crate::geom::vector::Vector;

use super::connectivity::Connectivity;
use super::site::{SiteId, StorageSite};

/// Role of a face group within the mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceGroupKind {
    /// Faces between two interior cells.
    Interior,
    /// Faces on a domain boundary, tagged with the boundary-condition name
    /// (e.g. "isothermal", "diffuse").
    Boundary(String),
    /// Faces shared with another mesh.
    Interface,
}

/// A contiguous subrange of the face site with a common role.
#[derive(Debug, Clone)]
pub struct FaceGroup {
    site: StorageSite,
    id: usize,
    kind: FaceGroupKind,
}

impl FaceGroup {
    pub fn site(&self) -> &StorageSite {
        &self.site
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn kind(&self) -> &FaceGroupKind {
        &self.kind
    }
}

/// Unstructured-mesh topology: cell/face/node entity sets, face groups, node
/// coordinates, and a registry of sparse connectivities between sites.
///
/// Carries no discretization state of its own; a transport solver defines its
/// fields over these sites and walks the registered connectivities.
#[derive(Debug)]
pub struct Mesh {
    dimension: usize,
    cells: StorageSite,
    faces: StorageSite,
    nodes: StorageSite,
    face_groups: Vec<FaceGroup>,
    coordinates: Vec<Vector<f64, 3>>,
    connectivities: HashMap<(SiteId, SiteId), Connectivity>,
    next_site: usize,
}

impl Mesh {
    pub fn new(dimension: usize, cell_count: usize, face_count: usize, node_count: usize) -> Self {
        Self {
            dimension,
            cells: StorageSite::new(SiteId(0), cell_count, 0),
            faces: StorageSite::new(SiteId(1), face_count, 0),
            nodes: StorageSite::new(SiteId(2), node_count, 0),
            face_groups: Vec::new(),
            coordinates: Vec::new(),
            connectivities: HashMap::new(),
            next_site: 3,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn cells(&self) -> &StorageSite {
        &self.cells
    }

    pub fn faces(&self) -> &StorageSite {
        &self.faces
    }

    pub fn nodes(&self) -> &StorageSite {
        &self.nodes
    }

    fn new_site(&mut self, count: usize, offset: usize) -> StorageSite {
        let site = StorageSite::new(SiteId(self.next_site), count, offset);
        self.next_site += 1;
        site
    }

    /// Registers the group of faces between interior cells. At most one per
    /// mesh, occupying the front of the face numbering.
    pub fn create_interior_face_group(&mut self, size: usize) -> &FaceGroup {
        debug_assert!(
            !self
                .face_groups
                .iter()
                .any(|g| g.kind == FaceGroupKind::Interior),
            "interior face group already created"
        );
        let site = self.new_site(size, 0);
        self.face_groups.push(FaceGroup {
            site,
            id: 0,
            kind: FaceGroupKind::Interior,
        });
        &self.face_groups[self.face_groups.len() - 1]
    }

    /// Registers a boundary face group covering
    /// `offset..offset + size` of the face numbering.
    pub fn create_boundary_face_group(
        &mut self,
        size: usize,
        offset: usize,
        id: usize,
        boundary_type: impl Into<String>,
    ) -> &FaceGroup {
        let site = self.new_site(size, offset);
        self.face_groups.push(FaceGroup {
            site,
            id,
            kind: FaceGroupKind::Boundary(boundary_type.into()),
        });
        &self.face_groups[self.face_groups.len() - 1]
    }

    /// Registers a face group shared with a neighboring mesh.
    pub fn create_interface_group(&mut self, size: usize, offset: usize, id: usize) -> &FaceGroup {
        let site = self.new_site(size, offset);
        self.face_groups.push(FaceGroup {
            site,
            id,
            kind: FaceGroupKind::Interface,
        });
        &self.face_groups[self.face_groups.len() - 1]
    }

    pub fn face_group_count(&self) -> usize {
        self.face_groups.len()
    }

    pub fn face_group(&self, i: usize) -> &FaceGroup {
        &self.face_groups[i]
    }

    pub fn boundary_groups(&self) -> impl Iterator<Item = &FaceGroup> {
        self.face_groups
            .iter()
            .filter(|g| matches!(g.kind, FaceGroupKind::Boundary(_)))
    }

    pub fn interface_groups(&self) -> impl Iterator<Item = &FaceGroup> {
        self.face_groups
            .iter()
            .filter(|g| g.kind == FaceGroupKind::Interface)
    }

    /// Node coordinates, indexed by the node site.
    pub fn set_coordinates(&mut self, coordinates: Vec<Vector<f64, 3>>) {
        debug_assert_eq!(coordinates.len(), self.nodes.count());
        self.coordinates = coordinates;
    }

    pub fn node_coordinates(&self) -> &[Vector<f64, 3>] {
        &self.coordinates
    }

    /// Registers a connectivity under its (from, to) site pair.
    pub fn add_connectivity(&mut self, connectivity: Connectivity) {
        self.connectivities.insert(
            (connectivity.from_site(), connectivity.to_site()),
            connectivity,
        );
    }

    pub fn connectivity(&self, from: SiteId, to: SiteId) -> Option<&Connectivity> {
        self.connectivities.get(&(from, to))
    }

    /// Face -> cell connectivity over all faces.
    pub fn all_face_cells(&self) -> Option<&Connectivity> {
        self.connectivity(self.faces.id(), self.cells.id())
    }

    /// Face -> node connectivity over all faces.
    pub fn all_face_nodes(&self) -> Option<&Connectivity> {
        self.connectivity(self.faces.id(), self.nodes.id())
    }

    /// Cell -> node connectivity.
    pub fn cell_nodes(&self) -> Option<&Connectivity> {
        self.connectivity(self.cells.id(), self.nodes.id())
    }
}
