//! Triangle-mesh scene model loaded from Wavefront OBJ.
//!
//! Every OBJ object becomes a [`Shape`] holding a flat triangle list (three
//! vertices per triangle, no index buffer). The rasterizer draws the
//! concatenation of all shapes; the ray tracer builds its acceleration
//! structure from the shapes individually.

use std::path::Path;

use thiserror::Error;

use duo_math::{Mat4, Vec2, Vec3};

use crate::{Color, Vertex};

/// Errors that can occur while loading a model.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("OBJ error: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("Shape '{shape}': {attribute} array length is not a multiple of {arity}")]
    MalformedAttribute {
        shape: String,
        attribute: &'static str,
        arity: usize,
    },

    #[error("No shapes found in model file")]
    NoShapes,
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// A named triangle list.
#[derive(Clone, Debug)]
pub struct Shape {
    pub name: String,
    pub vertices: Vec<Vertex>,
}

impl Shape {
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>) -> Self {
        Self {
            name: name.into(),
            vertices,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }
}

/// Material colors read from an MTL entry.
#[derive(Clone, Copy, Debug)]
struct SurfaceColors {
    ambient: Color,
    diffuse: Color,
    emissive: Color,
}

impl Default for SurfaceColors {
    fn default() -> Self {
        let fallback = Vertex::default();
        Self {
            ambient: fallback.ambient,
            diffuse: fallback.diffuse,
            emissive: fallback.emissive,
        }
    }
}

impl SurfaceColors {
    fn from_mtl(material: &tobj::Material) -> Self {
        let fallback = Self::default();
        Self {
            ambient: material.ambient.map(Color::from).unwrap_or(fallback.ambient),
            diffuse: material.diffuse.map(Color::from).unwrap_or(fallback.diffuse),
            emissive: material.emissive.map(Color::from).unwrap_or(fallback.emissive),
        }
    }
}

/// Scene geometry plus its world transform.
#[derive(Clone, Debug)]
pub struct Model {
    shapes: Vec<Shape>,
    world: Mat4,
}

impl Model {
    /// Build a model from shapes constructed in code.
    pub fn from_shapes(shapes: Vec<Shape>) -> Self {
        Self {
            shapes,
            world: Mat4::IDENTITY,
        }
    }

    /// Load an OBJ file (and the MTL library it references).
    ///
    /// Faces are triangulated. Missing normals are replaced by smooth
    /// normals averaged from the adjacent faces. A missing or broken MTL file
    /// is not fatal; affected shapes get the default grey material.
    pub fn load_obj<P: AsRef<Path>>(path: P) -> LoadResult<Self> {
        let path = path.as_ref();
        log::info!("Loading model from: {:?}", path);

        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                single_index: true,
                triangulate: true,
                ..Default::default()
            },
        )?;

        let materials = materials.unwrap_or_else(|err| {
            log::warn!("Could not load materials for {:?}: {}", path, err);
            Vec::new()
        });

        if models.is_empty() {
            return Err(LoadError::NoShapes);
        }

        let shapes = models
            .iter()
            .map(|model| {
                let colors = model
                    .mesh
                    .material_id
                    .and_then(|id| materials.get(id))
                    .map(SurfaceColors::from_mtl)
                    .unwrap_or_default();
                build_shape(model, colors)
            })
            .collect::<LoadResult<Vec<_>>>()?;

        let result = Self::from_shapes(shapes);
        log::info!(
            "Loaded {} shapes, {} triangles",
            result.shapes.len(),
            result.triangle_count()
        );
        Ok(result)
    }

    /// All shapes concatenated into one triangle list.
    pub fn vertex_buffer(&self) -> Vec<Vertex> {
        self.shapes
            .iter()
            .flat_map(|shape| shape.vertices.iter().copied())
            .collect()
    }

    pub fn per_shape_vertex_buffers(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn world_transform(&self) -> Mat4 {
        self.world
    }

    pub fn set_world_transform(&mut self, world: Mat4) {
        self.world = world;
    }

    pub fn triangle_count(&self) -> usize {
        self.shapes.iter().map(Shape::triangle_count).sum()
    }
}

/// Reinterpret a flat float array as fixed-size tuples.
fn tuples<'a, const N: usize>(
    shape: &str,
    attribute: &'static str,
    flat: &'a [f32],
) -> LoadResult<&'a [[f32; N]]> {
    bytemuck::try_cast_slice(flat).map_err(|_| LoadError::MalformedAttribute {
        shape: shape.to_string(),
        attribute,
        arity: N,
    })
}

fn build_shape(model: &tobj::Model, colors: SurfaceColors) -> LoadResult<Shape> {
    let mesh = &model.mesh;
    let positions: Vec<Vec3> = tuples::<3>(&model.name, "position", &mesh.positions)?
        .iter()
        .map(|p| Vec3::from(*p))
        .collect();
    let texcoords: &[[f32; 2]] = tuples::<2>(&model.name, "texcoord", &mesh.texcoords)?;
    let normals: Vec<Vec3> = if mesh.normals.is_empty() {
        log::debug!("Shape '{}' has no normals, computing smooth normals", model.name);
        smooth_normals(&positions, &mesh.indices)
    } else {
        tuples::<3>(&model.name, "normal", &mesh.normals)?
            .iter()
            .map(|n| Vec3::from(*n))
            .collect()
    };

    let mut vertices = Vec::with_capacity(mesh.indices.len());
    for face in mesh.indices.chunks_exact(3) {
        let in_bounds = face
            .iter()
            .all(|&i| (i as usize) < positions.len() && (i as usize) < normals.len());
        if !in_bounds {
            log::warn!(
                "Invalid triangle indices in '{}': {:?}, vertex count: {}",
                model.name,
                face,
                positions.len()
            );
            continue;
        }

        for &index in face {
            let i = index as usize;
            vertices.push(Vertex {
                position: positions[i],
                normal: normals[i],
                uv: texcoords.get(i).map(|&uv| Vec2::from(uv)).unwrap_or(Vec2::ZERO),
                ambient: colors.ambient,
                diffuse: colors.diffuse,
                emissive: colors.emissive,
            });
        }
    }

    Ok(Shape::new(model.name.clone(), vertices))
}

/// Per-vertex normals averaged from the faces sharing each vertex.
///
/// OBJ faces wind counter-clockwise, so the face normal is `(b - a) x (c - a)`.
fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for face in indices.chunks_exact(3) {
        let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let face_normal = (positions[i1] - positions[i0]).cross(positions[i2] - positions[i0]);
        normals[i0] += face_normal;
        normals[i1] += face_normal;
        normals[i2] += face_normal;
    }

    for normal in &mut normals {
        *normal = normal.try_normalize().unwrap_or(Vec3::Y);
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    /// Write `files` into a fresh directory under the system temp dir.
    fn scratch_dir(name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("duo_model_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        for (file, contents) in files {
            fs::write(dir.join(file), contents).unwrap();
        }
        dir
    }

    const QUAD_OBJ: &str = "\
mtllib quad.mtl
o quad
v -1 -1 0
v 1 -1 0
v 1 1 0
v -1 1 0
usemtl glow
f 1 2 3 4
";

    const QUAD_MTL: &str = "\
newmtl glow
Ka 0.1 0.2 0.3
Kd 0.8 0.4 0.2
Ke 1.0 0.5 0.0
";

    #[test]
    fn test_load_obj_triangulates_and_reads_materials() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = scratch_dir("quad", &[("quad.obj", QUAD_OBJ), ("quad.mtl", QUAD_MTL)]);

        let model = Model::load_obj(dir.join("quad.obj")).unwrap();

        assert_eq!(model.per_shape_vertex_buffers().len(), 1);
        assert_eq!(model.triangle_count(), 2);

        let vertex = model.vertex_buffer()[0];
        assert!((vertex.ambient - Color::new(0.1, 0.2, 0.3)).length() < 1e-6);
        assert!((vertex.diffuse - Color::new(0.8, 0.4, 0.2)).length() < 1e-6);
        assert!((vertex.emissive - Color::new(1.0, 0.5, 0.0)).length() < 1e-6);

        // No normals in the file: computed, facing +Z for CCW winding
        for v in model.vertex_buffer() {
            assert!((v.normal - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn test_load_obj_without_mtl_uses_default_material() {
        let obj = "o tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n";
        let dir = scratch_dir("tri", &[("tri.obj", obj)]);

        let model = Model::load_obj(dir.join("tri.obj")).unwrap();
        let vertices = model.vertex_buffer();

        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[0].diffuse, Vertex::default().diffuse);
        assert_eq!(vertices[2].normal, Vec3::Z);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = Model::load_obj("/definitely/not/here.obj");
        assert!(matches!(result, Err(LoadError::Obj(_))));
    }

    #[test]
    fn test_vertex_buffer_concatenates_shapes() {
        let tri = |z: f32| {
            vec![
                Vertex::new(Vec3::new(0.0, 0.0, z), Vec3::Z),
                Vertex::new(Vec3::new(1.0, 0.0, z), Vec3::Z),
                Vertex::new(Vec3::new(0.0, 1.0, z), Vec3::Z),
            ]
        };
        let model = Model::from_shapes(vec![Shape::new("a", tri(0.0)), Shape::new("b", tri(1.0))]);

        let flat = model.vertex_buffer();
        assert_eq!(flat.len(), 6);
        assert_eq!(flat[3].position.z, 1.0);
        assert_eq!(model.world_transform(), Mat4::IDENTITY);
    }

    #[test]
    fn test_material_without_ke_has_no_emission() {
        let mtl = "newmtl matte\nKd 0.5 0.5 0.5\n";
        let obj = "mtllib matte.mtl\no tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl matte\nf 1 2 3\n";
        let dir = scratch_dir("matte", &[("matte.obj", obj), ("matte.mtl", mtl)]);

        let model = Model::load_obj(dir.join("matte.obj")).unwrap();
        let vertex = model.vertex_buffer()[0];
        assert_eq!(vertex.emissive, Vertex::default().emissive);
        assert!((vertex.diffuse - Color::splat(0.5)).length() < 1e-6);
    }

    #[test]
    fn test_tuples_reinterpret_flat_arrays() {
        let flat = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];

        let pairs = tuples::<2>("s", "texcoord", &flat).unwrap();
        assert_eq!(pairs, &[[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]]);
        let triples = tuples::<3>("s", "position", &flat).unwrap();
        assert_eq!(triples[1], [3.0, 4.0, 5.0]);

        assert!(matches!(
            tuples::<3>("s", "normal", &flat[..4]),
            Err(LoadError::MalformedAttribute { arity: 3, .. })
        ));
    }
}
