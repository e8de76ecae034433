use std::cmp::{max, min};

use nalgebra as na;
use na::{vector, Vector2, Vector3, Vector4};
use thiserror::Error;

use crate::color::{Color, TargetPixel};
use crate::resource::Resource;

/// Far sentinel for clearing a depth buffer; any in-range depth beats it.
pub const DEFAULT_DEPTH: f32 = f32::MAX;

/// Per-corner transform: a clip-candidate position with w = 1 plus the vertex
/// attributes in, a clip-space position plus possibly modified attributes out.
pub type VertexFunction<VB> = Box<dyn Fn(Vector4<f32>, VB) -> (Vector4<f32>, VB)>;

/// Per-pixel shading: interpolated attributes and interpolated depth in,
/// normalized color out.
pub type PixelFunction<VB> = Box<dyn Fn(&VB, f32) -> Color>;

/// What the pipeline needs from a vertex type: the object-space position fed
/// into the vertex stage, and barycentric mixing of the whole attribute set
/// for the pixel stage.
pub trait VertexData: Clone {
    fn position(&self) -> Vector3<f32>;

    fn barycentric_interpolate(w0: f32, w1: f32, w2: f32, a: &Self, b: &Self, c: &Self) -> Self;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RasterizerError {
    /// There is no implicit default resolution; set_viewport must run before
    /// the first draw.
    #[error("viewport is not configured; call set_viewport before drawing")]
    ViewportNotSet,
    /// The requested index range leaves the index buffer, or a fetched index
    /// leaves the vertex buffer.
    #[error("index {index} is out of bounds for a buffer of {count} elements")]
    IndexOutOfBounds { index: usize, count: usize },
}

/// Point after the viewport transform - x, y are pixel coordinates, z keeps
/// the NDC depth for interpolation.
#[derive(Debug, Clone, Copy)]
struct ScreenPoint {
    x: i32,
    y: i32,
    z: f32,
}

/// Twice the signed area of triangle (a, b, c) in screen space; the sole
/// primitive behind both the area computation and the per-pixel coverage test.
fn edge_function(a: Vector2<i32>, b: Vector2<i32>, c: Vector2<i32>) -> i32 {
    return (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
}

/// The triangle-fill engine. Holds non-owning bindings to the buffers it
/// reads and writes plus the two pluggable shading stages; `draw` runs the
/// whole pipeline over a range of the bound index buffer.
///
/// The bindings borrow from whoever owns the buffers, so a rasterizer lives
/// at most as long as one frame's worth of buffer lends.
pub struct Rasterizer<'a, VB, RT> {
    vertex_buffer: Option<&'a Resource<VB>>,
    index_buffer: Option<&'a Resource<u32>>,
    render_target: Option<&'a mut Resource<RT>>,
    depth_buffer: Option<&'a mut Resource<f32>>,
    viewport: Option<(usize, usize)>,
    vertex_function: Option<VertexFunction<VB>>,
    pixel_function: Option<PixelFunction<VB>>,
}

impl<'a, VB: VertexData, RT: TargetPixel> Rasterizer<'a, VB, RT> {
    pub fn new() -> Self {
        return Self {
            vertex_buffer: None,
            index_buffer: None,
            render_target: None,
            depth_buffer: None,
            viewport: None,
            vertex_function: None,
            pixel_function: None,
        };
    }

    /// Rebinds the color target and the optional depth buffer. Binding no
    /// depth buffer disables depth testing.
    pub fn set_render_target(
        &mut self,
        render_target: &'a mut Resource<RT>,
        depth_buffer: Option<&'a mut Resource<f32>>,
    ) {
        self.render_target = Some(render_target);
        self.depth_buffer = depth_buffer;
    }

    /// Fills the bound color target with `clear_color` and, when one is
    /// bound, the depth buffer with `clear_depth`. Clearing with no depth
    /// buffer bound touches the color target only.
    pub fn clear_render_target(&mut self, clear_color: RT, clear_depth: f32) {
        if let Some(render_target) = self.render_target.as_deref_mut() {
            for i in 0..render_target.count() {
                *render_target.item_mut(i) = clear_color;
            }
        }
        if let Some(depth_buffer) = self.depth_buffer.as_deref_mut() {
            for i in 0..depth_buffer.count() {
                *depth_buffer.item_mut(i) = clear_depth;
            }
        }
    }

    pub fn set_vertex_buffer(&mut self, vertex_buffer: &'a Resource<VB>) {
        self.vertex_buffer = Some(vertex_buffer);
    }

    pub fn set_index_buffer(&mut self, index_buffer: &'a Resource<u32>) {
        self.index_buffer = Some(index_buffer);
    }

    /// Sets the screen-space resolution used for coordinate mapping. The
    /// caller keeps this consistent with the bound render target; both
    /// dimensions must be nonzero.
    pub fn set_viewport(&mut self, width: usize, height: usize) {
        debug_assert!(width > 0 && height > 0);
        self.viewport = Some((width, height));
    }

    /// Installs the per-vertex stage. Unset, vertices pass through untransformed.
    pub fn set_vertex_function(&mut self, vertex_function: VertexFunction<VB>) {
        self.vertex_function = Some(vertex_function);
    }

    /// Installs the per-pixel stage. Unset, covered pixels get a barycentric
    /// weight visualization color.
    pub fn set_pixel_function(&mut self, pixel_function: PixelFunction<VB>) {
        self.pixel_function = Some(pixel_function);
    }

    /// Rasterizes every full triangle in
    /// [index_offset, index_offset + index_count); trailing indices that do
    /// not form a whole triangle are ignored.
    ///
    /// Drawing without a render target, vertex buffer or index buffer is a
    /// no-op, since partially bound pipelines are a valid transient state.
    /// An unset viewport and out-of-range indices are reported as errors;
    /// index validation runs up front so nothing is written on failure.
    ///
    /// There is no near-plane clipping: positions whose w ends up near or
    /// below zero divide into garbage screen coordinates. Such triangles
    /// render incorrectly but never crash, and their pixels stay inside the
    /// clamped bounding box.
    pub fn draw(&mut self, index_count: usize, index_offset: usize) -> Result<(), RasterizerError> {
        let (width, height) = match self.viewport {
            Some(viewport) => viewport,
            None => return Err(RasterizerError::ViewportNotSet),
        };
        let (vertex_buffer, index_buffer, render_target) = match (
            self.vertex_buffer,
            self.index_buffer,
            self.render_target.as_deref_mut(),
        ) {
            (Some(vertex_buffer), Some(index_buffer), Some(render_target)) => {
                (vertex_buffer, index_buffer, render_target)
            }
            _ => return Ok(()),
        };
        let mut depth_buffer = self.depth_buffer.as_deref_mut();
        let vertex_function = self.vertex_function.as_deref();
        let pixel_function = self.pixel_function.as_deref();

        let triangle_count = index_count / 3;
        let index_end = index_offset + 3 * triangle_count;
        if index_end > index_buffer.count() {
            return Err(RasterizerError::IndexOutOfBounds {
                index: index_end - 1,
                count: index_buffer.count(),
            });
        }
        for i in index_offset..index_end {
            let index = *index_buffer.item(i) as usize;
            if index >= vertex_buffer.count() {
                return Err(RasterizerError::IndexOutOfBounds {
                    index,
                    count: vertex_buffer.count(),
                });
            }
        }

        // Vertex stage wrapper; the position is expanded to w = 1 here.
        let run_vertex_stage = |vertex: &VB| -> (Vector4<f32>, VB) {
            let p = vertex.position();
            let position = vector![p.x, p.y, p.z, 1.0];
            return match vertex_function {
                Some(function) => function(position, vertex.clone()),
                None => (position, vertex.clone()),
            };
        };

        // Unconditional clip-space divide; no near-plane handling.
        let to_ndc = |clip: Vector4<f32>| -> Vector3<f32> {
            let inverse_w = 1.0 / clip.w;
            return vector![clip.x * inverse_w, clip.y * inverse_w, clip.z * inverse_w];
        };

        // NDC y points up while raster row 0 is the top, hence the flip.
        let to_screen = |ndc: Vector3<f32>| -> ScreenPoint {
            return ScreenPoint {
                x: ((ndc.x + 1.0) * 0.5 * (width - 1) as f32).round() as i32,
                y: ((1.0 - (ndc.y + 1.0) * 0.5) * (height - 1) as f32).round() as i32,
                z: ndc.z,
            };
        };

        for triangle in 0..triangle_count {
            let base = index_offset + 3 * triangle;
            let index_a = *index_buffer.item(base) as usize;
            let index_b = *index_buffer.item(base + 1) as usize;
            let index_c = *index_buffer.item(base + 2) as usize;

            // One vertex stage invocation per corner, even for indices shared
            // with other triangles.
            let (clip_a, data_a) = run_vertex_stage(vertex_buffer.item(index_a));
            let (clip_b, data_b) = run_vertex_stage(vertex_buffer.item(index_b));
            let (clip_c, data_c) = run_vertex_stage(vertex_buffer.item(index_c));

            let screen_a = to_screen(to_ndc(clip_a));
            let screen_b = to_screen(to_ndc(clip_b));
            let screen_c = to_screen(to_ndc(clip_c));

            let min_x = max(0, min(screen_a.x, min(screen_b.x, screen_c.x)));
            let max_x = min(width as i32 - 1, max(screen_a.x, max(screen_b.x, screen_c.x)));
            let min_y = max(0, min(screen_a.y, min(screen_b.y, screen_c.y)));
            let max_y = min(height as i32 - 1, max(screen_a.y, max(screen_b.y, screen_c.y)));
            if min_x > max_x || min_y > max_y {
                continue;
            }

            let corner_a = vector![screen_a.x, screen_a.y];
            let corner_b = vector![screen_b.x, screen_b.y];
            let corner_c = vector![screen_c.x, screen_c.y];

            // Collinear or sub-pixel after rounding.
            let area = edge_function(corner_a, corner_b, corner_c);
            if area == 0 {
                continue;
            }

            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    let point = vector![x, y];
                    let w0 = edge_function(corner_b, corner_c, point);
                    let w1 = edge_function(corner_c, corner_a, point);
                    let w2 = edge_function(corner_a, corner_b, point);

                    // Both windings rasterize; the edge signs only have to
                    // agree with each other.
                    let covered = (w0 >= 0 && w1 >= 0 && w2 >= 0)
                        || (w0 <= 0 && w1 <= 0 && w2 <= 0);
                    if !covered {
                        continue;
                    }

                    let f0 = w0 as f32 / area as f32;
                    let f1 = w1 as f32 / area as f32;
                    let f2 = w2 as f32 / area as f32;

                    // Depth interpolates linearly in screen space, not
                    // perspective-correct.
                    let z = f0 * screen_a.z + f1 * screen_b.z + f2 * screen_c.z;
                    if !z.is_finite() {
                        continue;
                    }
                    let z = z.clamp(-1.0, 1.0);

                    let (x, y) = (x as usize, y as usize);
                    let passes = match depth_buffer.as_deref() {
                        Some(depth_buffer) => *depth_buffer.item_at(x, y) > z,
                        None => true,
                    };
                    if !passes {
                        continue;
                    }

                    let color = match pixel_function {
                        Some(function) => {
                            let interpolated =
                                VB::barycentric_interpolate(f0, f1, f2, &data_a, &data_b, &data_c);
                            function(&interpolated, z)
                        }
                        None => Color::new(f0, f1, f2),
                    };
                    *render_target.item_at_mut(x, y) = RT::from_color(color);
                    if let Some(depth_buffer) = depth_buffer.as_deref_mut() {
                        *depth_buffer.item_at_mut(x, y) = z;
                    }
                }
            }
        }

        return Ok(());
    }
}

impl<'a, VB: VertexData, RT: TargetPixel> Default for Rasterizer<'a, VB, RT> {
    fn default() -> Self {
        return Self::new();
    }
}
