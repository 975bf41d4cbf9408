use crate::connectivity::Tri3d2Connectivity;
use crate::mesh::TriangleMesh2d;
use crate::Real;
use nalgebra::Scalar;
use std::convert::TryInto;
use std::error::Error;
use std::path::Path;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, DataArray, DataSet, ElementType, Piece, UnstructuredGridPiece,
    Version, VertexNumbers, Vtk,
};

/// Represents connectivity that is supported by VTK.
pub trait VtkCellConnectivity {
    fn cell_type(&self) -> CellType;

    fn vtk_vertex_indices(&self) -> &[usize];
}

impl VtkCellConnectivity for Tri3d2Connectivity {
    fn cell_type(&self) -> CellType {
        CellType::Triangle
    }

    fn vtk_vertex_indices(&self) -> &[usize] {
        self.vertex_indices()
    }
}

/// Builds a VTK data set from a triangle mesh with optional scalar attributes.
///
/// ```ignore
/// FiniteElementMeshDataSetBuilder::from_mesh(&mesh)
///     .with_title("Poisson 2D")
///     .with_point_scalar_attributes("solution", u.as_slice())
///     .with_cell_scalar_attributes("error_indicator", &indicators)
///     .try_export("poisson2d.vtu")?;
/// ```
pub struct FiniteElementMeshDataSetBuilder<'a, T: Scalar> {
    mesh: &'a TriangleMesh2d<T>,
    // Only used for exporting directly to file
    title: Option<String>,
    point_attributes: Vec<(String, Vec<T>)>,
    cell_attributes: Vec<(String, Vec<T>)>,
}

impl<'a, T: Scalar> FiniteElementMeshDataSetBuilder<'a, T> {
    pub fn from_mesh(mesh: &'a TriangleMesh2d<T>) -> Self {
        Self {
            mesh,
            title: None,
            point_attributes: Vec::new(),
            cell_attributes: Vec::new(),
        }
    }
}

impl<'a, T: Real> FiniteElementMeshDataSetBuilder<'a, T> {
    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    /// Adds a scalar field with one value per vertex.
    ///
    /// # Panics
    ///
    /// Panics if the number of values does not match the number of vertices.
    pub fn with_point_scalar_attributes(mut self, name: impl Into<String>, values: &[T]) -> Self {
        assert_eq!(
            values.len(),
            self.mesh.num_vertices(),
            "Point attributes must have one value per vertex."
        );
        self.point_attributes
            .push((name.into(), values.to_vec()));
        self
    }

    /// Adds a scalar field with one value per triangle.
    ///
    /// # Panics
    ///
    /// Panics if the number of values does not match the number of triangles.
    pub fn with_cell_scalar_attributes(mut self, name: impl Into<String>, values: &[T]) -> Self {
        assert_eq!(
            values.len(),
            self.mesh.num_cells(),
            "Cell attributes must have one value per triangle."
        );
        self.cell_attributes
            .push((name.into(), values.to_vec()));
        self
    }

    pub fn try_build(&self) -> Result<DataSet, Box<dyn Error>> {
        let mut points = Vec::with_capacity(3 * self.mesh.num_vertices());
        for v in self.mesh.vertices() {
            points.extend([to_f64(v.x)?, to_f64(v.y)?, 0.0]);
        }

        // Vertices is laid out as follows: N, i_1, i_2, ... i_N,
        // so for triangles this becomes 3 followed by the three vertex indices
        let mut vertices = Vec::with_capacity(4 * self.mesh.num_cells());
        let mut cell_types = Vec::with_capacity(self.mesh.num_cells());
        for cell in self.mesh.connectivity() {
            let indices = cell.vtk_vertex_indices();
            vertices.push(indices.len().try_into()?);
            for &idx in indices {
                vertices.push(idx.try_into()?);
            }
            cell_types.push(cell.cell_type());
        }

        let data = Attributes {
            point: to_vtk_attributes(&self.point_attributes)?,
            cell: to_vtk_attributes(&self.cell_attributes)?,
        };

        let piece = UnstructuredGridPiece {
            points: points.into(),
            cells: Cells {
                cell_verts: VertexNumbers::Legacy {
                    num_cells: self.mesh.num_cells().try_into()?,
                    vertices,
                },
                types: cell_types,
            },
            data,
        };

        Ok(DataSet::UnstructuredGrid {
            meta: None,
            pieces: vec![Piece::Inline(Box::new(piece))],
        })
    }

    /// Convenience function for directly exporting the dataset to a file.
    ///
    /// The format is chosen from the file extension, e.g. `.vtk` for legacy VTK and `.vtu`
    /// for XML. Parent directories must exist.
    pub fn try_export(&self, filename: impl AsRef<Path>) -> Result<(), Box<dyn Error>> {
        let filepath = filename.as_ref();
        let fallback_title = filepath
            .file_stem()
            .map(|os_str| os_str.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled".to_string());
        let dataset = self.try_build()?;
        Vtk {
            version: Version { major: 4, minor: 1 },
            // If we don't have a title then just make the filepath the title
            title: self.title.clone().unwrap_or(fallback_title),
            byte_order: ByteOrder::BigEndian,
            data: dataset,
            file_path: None,
        }
        .export(filepath)?;
        Ok(())
    }
}

fn to_f64<T: Real>(value: T) -> Result<f64, Box<dyn Error>> {
    value
        .to_subset()
        .ok_or_else(|| "value not representable as f64".into())
}

fn to_vtk_attributes<T: Real>(attributes: &[(String, Vec<T>)]) -> Result<Vec<Attribute>, Box<dyn Error>> {
    attributes
        .iter()
        .map(|(name, values)| {
            let data = values
                .iter()
                .map(|&v| to_f64(v))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Attribute::DataArray(DataArray {
                name: name.clone(),
                elem: ElementType::Scalars {
                    num_comp: 1,
                    lookup_table: None,
                },
                data: data.into(),
            }))
        })
        .collect()
}
