use poisson_amr::io::vtk::FiniteElementMeshDataSetBuilder;
use poisson_amr::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use std::path::Path;
use util::assert_panics;
use vtkio::model::{Attribute, CellType, DataSet, Piece, VertexNumbers};

#[test]
fn dataset_contains_points_cells_and_attributes() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(2, 1);
    let solution: Vec<_> = (0..mesh.num_vertices()).map(|i| i as f64).collect();
    let indicators = vec![0.5; mesh.num_cells()];

    let dataset = FiniteElementMeshDataSetBuilder::from_mesh(&mesh)
        .with_point_scalar_attributes("solution", &solution)
        .with_cell_scalar_attributes("error_indicator", &indicators)
        .try_build()
        .unwrap();

    let piece = match dataset {
        DataSet::UnstructuredGrid { pieces, .. } => match pieces.into_iter().next() {
            Some(Piece::Inline(piece)) => piece,
            _ => panic!("Expected a single inline piece"),
        },
        _ => panic!("Expected an unstructured grid"),
    };

    assert_eq!(piece.points.len(), 3 * mesh.num_vertices());
    assert_eq!(piece.cells.types, vec![CellType::Triangle; mesh.num_cells()]);
    match &piece.cells.cell_verts {
        VertexNumbers::Legacy { num_cells, vertices } => {
            assert_eq!(*num_cells as usize, mesh.num_cells());
            assert_eq!(&vertices[..4], &[3, 0, 2, 1]);
            assert_eq!(vertices.len(), 4 * mesh.num_cells());
        }
        _ => panic!("Expected legacy vertex numbers"),
    }

    let names = |attributes: &[Attribute]| -> Vec<String> {
        attributes
            .iter()
            .map(|attribute| match attribute {
                Attribute::DataArray(array) => array.name.clone(),
                _ => panic!("Expected data array attribute"),
            })
            .collect()
    };
    assert_eq!(names(&piece.data.point), vec!["solution"]);
    assert_eq!(names(&piece.data.cell), vec!["error_indicator"]);
}

#[test]
fn attributes_with_wrong_length_panic() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1, 1);
    assert_panics!(FiniteElementMeshDataSetBuilder::from_mesh(&mesh).with_point_scalar_attributes("u", &[1.0, 2.0]));
    assert_panics!(FiniteElementMeshDataSetBuilder::from_mesh(&mesh).with_cell_scalar_attributes("eta", &[1.0; 3]));
}

#[test]
fn export_writes_file() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(3, 3);
    crate::export_mesh_vtk("io", "unit_square", &mesh);
    assert!(Path::new("data/unit_tests/io/unit_square.vtu").exists());
}
