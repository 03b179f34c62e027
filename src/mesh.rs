// Procedural meshes for the renderer
//
// Every mesh is unit sized and centred on the origin; the scene graph scales
// and places it.

use std::f32::consts::PI;

use robot_room::assembly::Shape;

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

pub fn build(shape: Shape) -> MeshData {
    match shape {
        Shape::Cube => cube(),
        Shape::Sphere => sphere(24, 16),
        Shape::Plane => plane(),
        Shape::Triangle => triangle(),
    }
}

fn vertex(position: [f32; 3], normal: [f32; 3]) -> Vertex {
    Vertex { position, normal }
}

fn cube() -> MeshData {
    // (normal, tangent u, tangent v) per face, u x v = normal
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (n, u, v) in faces {
        let base = vertices.len() as u16;
        for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            let position = [0, 1, 2].map(|i| n[i] * 0.5 + u[i] * su + v[i] * sv);
            vertices.push(vertex(position, n));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    MeshData { vertices, indices }
}

/// UV sphere of radius 0.5.
fn sphere(sectors: u16, stacks: u16) -> MeshData {
    let mut vertices = Vec::new();
    for stack in 0..=stacks {
        let phi = PI * stack as f32 / stacks as f32;
        let (ring, y) = (phi.sin(), phi.cos());
        for sector in 0..=sectors {
            let theta = 2.0 * PI * sector as f32 / sectors as f32;
            let normal = [ring * theta.cos(), y, -ring * theta.sin()];
            vertices.push(vertex(normal.map(|c| c * 0.5), normal));
        }
    }

    let mut indices = Vec::new();
    let row = sectors + 1;
    for stack in 0..stacks {
        for sector in 0..sectors {
            let a = stack * row + sector;
            let b = a + row;
            if stack != 0 {
                indices.extend_from_slice(&[a, b, a + 1]);
            }
            if stack != stacks - 1 {
                indices.extend_from_slice(&[a + 1, b, b + 1]);
            }
        }
    }
    MeshData { vertices, indices }
}

/// Unit square in the XZ plane, facing +Y.
fn plane() -> MeshData {
    let up = [0.0, 1.0, 0.0];
    MeshData {
        vertices: vec![
            vertex([-0.5, 0.0, 0.5], up),
            vertex([0.5, 0.0, 0.5], up),
            vertex([0.5, 0.0, -0.5], up),
            vertex([-0.5, 0.0, -0.5], up),
        ],
        indices: vec![0, 1, 2, 2, 3, 0],
    }
}

/// Right triangle in the XZ plane, facing +Y.
fn triangle() -> MeshData {
    let up = [0.0, 1.0, 0.0];
    MeshData {
        vertices: vec![
            vertex([-0.5, 0.0, 0.5], up),
            vertex([0.5, 0.0, 0.5], up),
            vertex([-0.5, 0.0, -0.5], up),
        ],
        indices: vec![0, 1, 2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_stay_in_bounds() {
        for shape in [Shape::Cube, Shape::Sphere, Shape::Plane, Shape::Triangle] {
            let mesh = build(shape);
            assert_eq!(mesh.indices.len() % 3, 0);
            assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        }
    }

    #[test]
    fn cube_faces_wind_outwards() {
        let mesh = cube();
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| glam::Vec3::from(mesh.vertices[tri[i] as usize].position));
            let normal = glam::Vec3::from(mesh.vertices[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(normal) > 0.0);
        }
    }
}
