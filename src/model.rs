use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;
use nalgebra as na;
use na::{vector, Matrix4, Vector2, Vector3};
use obj::{load_obj, Obj};
use thiserror::Error;

use crate::rasterizer::VertexData;
use crate::resource::Resource;

/// A single mesh vertex as the pipeline consumes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub texcoord: Vector2<f32>,
}

impl Default for Vertex {
    fn default() -> Self {
        return Self {
            position: vector![0.0, 0.0, 0.0],
            normal: vector![0.0, 0.0, 0.0],
            texcoord: vector![0.0, 0.0],
        };
    }
}

impl VertexData for Vertex {
    fn position(&self) -> Vector3<f32> {
        return self.position;
    }

    fn barycentric_interpolate(w0: f32, w1: f32, w2: f32, a: &Self, b: &Self, c: &Self) -> Self {
        return Self {
            position: a.position * w0 + b.position * w1 + c.position * w2,
            normal: a.normal * w0 + b.normal * w1 + c.normal * w2,
            texcoord: a.texcoord * w0 + b.texcoord * w1 + c.texcoord * w2,
        };
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model file: {0}")]
    Parse(#[from] obj::ObjError),
}

/// Triangle mesh split into per-sub-mesh vertex/index buffer pairs, the shape
/// the pipeline binds one pair at a time.
pub struct Model {
    vertex_buffers: Vec<Resource<Vertex>>,
    index_buffers: Vec<Resource<u32>>,
}

impl Model {
    /// Loads a Wavefront OBJ file.
    pub fn load_obj(path: &Path) -> Result<Model, ModelError> {
        let file = File::open(path)?;
        return Self::from_reader(BufReader::new(file));
    }

    /// Parses OBJ data from any buffered reader. The parser yields one
    /// object, which becomes a single sub-mesh pair here.
    // @TODO texture coordinates are zeroed out; wire up obj::TexturedVertex
    // for files that carry vt lines.
    pub fn from_reader<R: BufRead>(input: R) -> Result<Model, ModelError> {
        let parsed: Obj<obj::Vertex, u32> = load_obj(input)?;
        debug!(
            "parsed {} vertices and {} indices",
            parsed.vertices.len(),
            parsed.indices.len()
        );

        let mut vertex_buffer = Resource::new(parsed.vertices.len());
        for (i, vertex) in parsed.vertices.iter().enumerate() {
            *vertex_buffer.item_mut(i) = Vertex {
                position: vector![vertex.position[0], vertex.position[1], vertex.position[2]],
                normal: vector![vertex.normal[0], vertex.normal[1], vertex.normal[2]],
                texcoord: vector![0.0, 0.0],
            };
        }
        let mut index_buffer = Resource::new(parsed.indices.len());
        for (i, index) in parsed.indices.iter().enumerate() {
            *index_buffer.item_mut(i) = *index;
        }

        return Ok(Model {
            vertex_buffers: vec![vertex_buffer],
            index_buffers: vec![index_buffer],
        });
    }

    pub fn get_vertex_buffers(&self) -> &Vec<Resource<Vertex>> {
        return &self.vertex_buffers;
    }

    pub fn get_index_buffers(&self) -> &Vec<Resource<u32>> {
        return &self.index_buffers;
    }

    /// Meshes are not moved around; the model-to-world transform is identity.
    pub fn get_world_matrix(&self) -> Matrix4<f32> {
        return Matrix4::identity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_OBJ: &[u8] = b"v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n";

    #[test]
    fn loads_a_triangle_into_paired_buffers() {
        let model = Model::from_reader(TRIANGLE_OBJ).unwrap();
        assert_eq!(model.get_vertex_buffers().len(), 1);
        assert_eq!(model.get_index_buffers().len(), 1);
        assert_eq!(model.get_vertex_buffers()[0].count(), 3);
        assert_eq!(model.get_index_buffers()[0].count(), 3);

        let vertex = model.get_vertex_buffers()[0].item(1);
        assert_eq!(vertex.position, vector![1.0, 0.0, 0.0]);
        assert_eq!(vertex.normal, vector![0.0, 0.0, 1.0]);
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        let result = Model::from_reader(&b"v 0 0\nf 1 2 3\n"[..]);
        assert!(matches!(result, Err(ModelError::Parse(_))));
    }

    #[test]
    fn interpolation_mixes_all_attributes() {
        let a = Vertex {
            position: vector![1.0, 0.0, 0.0],
            normal: vector![1.0, 0.0, 0.0],
            texcoord: vector![1.0, 0.0],
        };
        let b = Vertex {
            position: vector![0.0, 1.0, 0.0],
            normal: vector![0.0, 1.0, 0.0],
            texcoord: vector![0.0, 1.0],
        };
        let c = Vertex {
            position: vector![0.0, 0.0, 1.0],
            normal: vector![0.0, 0.0, 1.0],
            texcoord: vector![0.0, 0.0],
        };
        let mixed = Vertex::barycentric_interpolate(0.5, 0.25, 0.25, &a, &b, &c);
        assert_eq!(mixed.position, vector![0.5, 0.25, 0.25]);
        assert_eq!(mixed.texcoord, vector![0.5, 0.25]);
    }
}
