//! Rasterization pipeline.
//!
//! Vertex stage over a range of the vertex buffer, then per triangle:
//! clip-space rejection, perspective divide, viewport mapping, edge-function
//! coverage at pixel centres, depth test, pixel stage.
//!
//! Vertex shading runs in parallel. Scan conversion is sequential so every
//! depth cell has a single writer.

use std::time::Instant;

use rayon::prelude::*;

use duo_core::{Resource, UnsignedColor, Vertex};
use duo_math::{Vec3, Vec4};

use crate::{ConfigurationError, PixelShader, RasterShaders};

/// Counters of one `draw` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterStats {
    /// Triangles that reached scan conversion
    pub triangles_drawn: usize,
    /// Triangles dropped for a vertex at or behind the eye, or zero area
    pub triangles_culled: usize,
    pub fragments_shaded: usize,
    /// Covered pixels that failed the depth test or fell outside [0, 1] depth
    pub fragments_rejected: usize,
}

pub struct Rasterizer {
    render_target: Option<Resource<UnsignedColor>>,
    depth_buffer: Option<Resource<f32>>,
    width: u32,
    height: u32,
    vertex_buffer: Option<Vec<Vertex>>,
    shaders: RasterShaders,
    smooth_shading: bool,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self {
            render_target: None,
            depth_buffer: None,
            width: 0,
            height: 0,
            vertex_buffer: None,
            shaders: RasterShaders::default(),
            smooth_shading: true,
        }
    }

    pub fn set_render_target(&mut self, color: Resource<UnsignedColor>, depth: Resource<f32>) {
        self.render_target = Some(color);
        self.depth_buffer = Some(depth);
    }

    pub fn render_target(&self) -> Option<&Resource<UnsignedColor>> {
        self.render_target.as_ref()
    }

    pub fn take_render_target(&mut self) -> Option<Resource<UnsignedColor>> {
        self.render_target.take()
    }

    pub fn depth_buffer(&self) -> Option<&Resource<f32>> {
        self.depth_buffer.as_ref()
    }

    /// Fill the color target with `color` and the depth buffer with +inf.
    pub fn clear_render_target(&mut self, color: UnsignedColor) {
        if let Some(target) = self.render_target.as_mut() {
            target.fill(color);
        }
        if let Some(depth) = self.depth_buffer.as_mut() {
            depth.fill(f32::INFINITY);
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Flat triangle list: every three consecutive vertices form a triangle.
    pub fn set_vertex_buffer(&mut self, vertices: Vec<Vertex>) {
        self.vertex_buffer = Some(vertices);
    }

    pub fn set_shaders(&mut self, shaders: RasterShaders) {
        self.shaders = shaders;
    }

    /// Flat shading uses the attributes of each triangle's first vertex.
    pub fn set_smooth_shading(&mut self, smooth: bool) {
        self.smooth_shading = smooth;
    }

    /// Check that `draw(num_vertexes, vertex_offset)` can run.
    pub fn validate(
        &self,
        num_vertexes: usize,
        vertex_offset: usize,
    ) -> Result<(), ConfigurationError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigurationError::ZeroViewport {
                width: self.width,
                height: self.height,
            });
        }

        let target = self
            .render_target
            .as_ref()
            .ok_or(ConfigurationError::MissingRenderTarget)?;
        let depth = self
            .depth_buffer
            .as_ref()
            .ok_or(ConfigurationError::MissingRenderTarget)?;
        for (target_width, target_height) in [
            (target.width(), target.height()),
            (depth.width(), depth.height()),
        ] {
            if target_width != self.width || target_height != self.height {
                return Err(ConfigurationError::TargetSizeMismatch {
                    target_width,
                    target_height,
                    width: self.width,
                    height: self.height,
                });
            }
        }

        self.shaders.stages()?;

        let len = self
            .vertex_buffer
            .as_ref()
            .ok_or(ConfigurationError::MissingVertexBuffer)?
            .len();
        match vertex_offset.checked_add(num_vertexes) {
            Some(end) if end <= len => Ok(()),
            _ => Err(ConfigurationError::VertexRangeOutOfBounds {
                offset: vertex_offset,
                end: vertex_offset.saturating_add(num_vertexes),
                len,
            }),
        }
    }

    /// Draw `num_vertexes` vertices starting at `vertex_offset` as a
    /// triangle list. Trailing vertices that do not form a triangle are
    /// ignored.
    pub fn draw(
        &mut self,
        num_vertexes: usize,
        vertex_offset: usize,
    ) -> Result<RasterStats, ConfigurationError> {
        self.validate(num_vertexes, vertex_offset)?;

        let start = Instant::now();
        let (vertex_shader, pixel_shader) = self.shaders.stages()?;
        let vertices = self
            .vertex_buffer
            .as_deref()
            .ok_or(ConfigurationError::MissingVertexBuffer)?;
        let range = &vertices[vertex_offset..vertex_offset + num_vertexes];

        let shaded: Vec<(Vec4, Vertex)> = range
            .par_iter()
            .map(|vertex| vertex_shader.run(vertex.position.extend(1.0), vertex))
            .collect();

        let (Some(target), Some(depth)) =
            (self.render_target.as_mut(), self.depth_buffer.as_mut())
        else {
            return Err(ConfigurationError::MissingRenderTarget);
        };
        let mut scan = ScanConverter {
            target,
            depth,
            pixel_shader,
            smooth_shading: self.smooth_shading,
            stats: RasterStats::default(),
        };
        for triangle in shaded.chunks_exact(3) {
            scan.triangle(&triangle[0], &triangle[1], &triangle[2]);
        }

        let stats = scan.stats;
        log::debug!(
            "Drew {} triangles ({} culled), {} fragments shaded, {} rejected in {:?}",
            stats.triangles_drawn,
            stats.triangles_culled,
            stats.fragments_shaded,
            stats.fragments_rejected,
            start.elapsed()
        );
        Ok(stats)
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Signed doubled area of (a, b, p) in screen space.
#[inline]
fn edge(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (p.x - a.x) * (b.y - a.y) - (p.y - a.y) * (b.x - a.x)
}

struct ScanConverter<'a> {
    target: &'a mut Resource<UnsignedColor>,
    depth: &'a mut Resource<f32>,
    pixel_shader: &'a PixelShader,
    smooth_shading: bool,
    stats: RasterStats,
}

impl ScanConverter<'_> {
    fn triangle(&mut self, a: &(Vec4, Vertex), b: &(Vec4, Vertex), c: &(Vec4, Vertex)) {
        let clip = [a.0, b.0, c.0];
        if clip.iter().any(|p| p.w <= 0.0) {
            self.stats.triangles_culled += 1;
            return;
        }

        let (width, height) = (self.target.width() as f32, self.target.height() as f32);
        let screen = clip.map(|p| {
            let ndc = p.truncate() / p.w;
            Vec3::new(
                (ndc.x + 1.0) * 0.5 * width,
                (1.0 - ndc.y) * 0.5 * height,
                ndc.z,
            )
        });
        let inv_w = clip.map(|p| 1.0 / p.w);

        let area = edge(screen[0], screen[1], screen[2]);
        if area.abs() <= f32::EPSILON || !area.is_finite() {
            self.stats.triangles_culled += 1;
            return;
        }
        self.stats.triangles_drawn += 1;

        let min = screen[0].min(screen[1]).min(screen[2]);
        let max = screen[0].max(screen[1]).max(screen[2]);
        let x0 = min.x.floor().max(0.0) as u32;
        let y0 = min.y.floor().max(0.0) as u32;
        let x1 = max.x.ceil().min(width) as u32;
        let y1 = max.y.ceil().min(height) as u32;

        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, 0.0);
                // Dividing by the signed area makes both windings positive
                let weights = Vec3::new(
                    edge(screen[1], screen[2], p),
                    edge(screen[2], screen[0], p),
                    edge(screen[0], screen[1], p),
                ) / area;
                if weights.min_element() < 0.0 {
                    continue;
                }

                let z = weights.dot(Vec3::new(screen[0].z, screen[1].z, screen[2].z));
                if !(0.0..=1.0).contains(&z) || z >= self.depth.item(x, y) {
                    self.stats.fragments_rejected += 1;
                    continue;
                }

                let fragment = if self.smooth_shading {
                    let perspective = weights * Vec3::from(inv_w);
                    Vertex::blend(&a.1, &b.1, &c.1, perspective / perspective.element_sum())
                } else {
                    a.1
                };

                let color = self.pixel_shader.run(&fragment, z);
                self.target.set(x, y, UnsignedColor::from(color));
                self.depth.set(x, y, z);
                self.stats.fragments_shaded += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VertexShader;
    use duo_core::Color;
    use duo_math::Mat4;

    const SIZE: u32 = 4;
    const BACKGROUND: UnsignedColor = UnsignedColor::new(255, 0, 255);

    /// Triangle covering the whole NDC square at depth `z`.
    fn covering(z: f32, color: Color) -> Vec<Vertex> {
        [(-1.0, -1.0), (3.0, -1.0), (-1.0, 3.0)]
            .into_iter()
            .map(|(x, y)| {
                Vertex::new(Vec3::new(x, y, z), Vec3::Z).with_material(
                    Color::ZERO,
                    color,
                    Color::ZERO,
                )
            })
            .collect()
    }

    fn ndc_shaders(pixel: PixelShader) -> RasterShaders {
        RasterShaders::new(
            VertexShader::Transform {
                world: Mat4::IDENTITY,
                view_projection: Mat4::IDENTITY,
            },
            pixel,
        )
    }

    fn rasterizer(vertices: Vec<Vertex>) -> Rasterizer {
        let mut raster = Rasterizer::new();
        raster.set_viewport(SIZE, SIZE);
        raster.set_render_target(Resource::new(SIZE, SIZE), Resource::new(SIZE, SIZE));
        raster.clear_render_target(BACKGROUND);
        raster.set_vertex_buffer(vertices);
        raster.set_shaders(ndc_shaders(PixelShader::Unlit));
        raster
    }

    #[test]
    fn test_clear_resets_depth_to_infinity() {
        let raster = rasterizer(Vec::new());
        let depth = raster.depth_buffer().unwrap();
        assert!(depth.as_slice().iter().all(|d| *d == f32::INFINITY));
        assert_eq!(raster.render_target().unwrap().item(0, 0), BACKGROUND);
    }

    #[test]
    fn test_covering_triangle_fills_viewport() {
        let mut raster = rasterizer(covering(0.5, Color::X));
        let stats = raster.draw(3, 0).unwrap();

        assert_eq!(stats.triangles_drawn, 1);
        assert_eq!(stats.fragments_shaded, (SIZE * SIZE) as usize);
        let target = raster.render_target().unwrap();
        assert!(target
            .as_slice()
            .iter()
            .all(|&c| c == UnsignedColor::new(255, 0, 0)));
    }

    #[test]
    fn test_nearer_triangle_wins_in_either_order() {
        let near = covering(0.3, Color::Y);
        let far = covering(0.7, Color::X);
        let pixels = (SIZE * SIZE) as usize;

        for (first, second, near_first) in [(&near, &far, true), (&far, &near, false)] {
            let mut raster = rasterizer([first.clone(), second.clone()].concat());
            let stats = raster.draw(6, 0).unwrap();

            let target = raster.render_target().unwrap();
            assert!(target
                .as_slice()
                .iter()
                .all(|&c| c == UnsignedColor::new(0, 255, 0)));
            let depth = raster.depth_buffer().unwrap();
            assert!(depth.as_slice().iter().all(|d| (*d - 0.3).abs() < 1e-6));

            if near_first {
                // The far triangle never reaches the pixel stage
                assert_eq!(stats.fragments_shaded, pixels);
                assert_eq!(stats.fragments_rejected, pixels);
            } else {
                assert_eq!(stats.fragments_shaded, 2 * pixels);
                assert_eq!(stats.fragments_rejected, 0);
            }
        }
    }

    #[test]
    fn test_equal_depth_keeps_existing_fragment() {
        let mut raster =
            rasterizer([covering(0.5, Color::X), covering(0.5, Color::Y)].concat());
        let stats = raster.draw(6, 0).unwrap();

        assert_eq!(stats.fragments_rejected, (SIZE * SIZE) as usize);
        assert_eq!(
            raster.render_target().unwrap().item(1, 1),
            UnsignedColor::new(255, 0, 0)
        );
    }

    #[test]
    fn test_both_windings_are_drawn() {
        let mut reversed = covering(0.5, Color::X);
        reversed.swap(1, 2);

        let mut raster = rasterizer(reversed);
        let stats = raster.draw(3, 0).unwrap();
        assert_eq!(stats.fragments_shaded, (SIZE * SIZE) as usize);
    }

    #[test]
    fn test_vertex_behind_eye_culls_triangle() {
        let mut raster = rasterizer(covering(0.5, Color::X));
        raster.set_shaders(RasterShaders::new(
            VertexShader::Transform {
                world: Mat4::IDENTITY,
                view_projection: Mat4::from_diagonal(Vec4::new(1.0, 1.0, 1.0, -1.0)),
            },
            PixelShader::Unlit,
        ));

        let stats = raster.draw(3, 0).unwrap();
        assert_eq!(stats.triangles_culled, 1);
        assert_eq!(stats.fragments_shaded, 0);
        assert!(raster
            .render_target()
            .unwrap()
            .as_slice()
            .iter()
            .all(|&c| c == BACKGROUND));
    }

    #[test]
    fn test_degenerate_triangle_draws_nothing() {
        let line = [(-1.0, -1.0), (0.0, 0.0), (1.0, 1.0)]
            .into_iter()
            .map(|(x, y)| Vertex::new(Vec3::new(x, y, 0.5), Vec3::Z))
            .collect();

        let mut raster = rasterizer(line);
        let stats = raster.draw(3, 0).unwrap();
        assert_eq!(stats.triangles_culled, 1);
        assert_eq!(stats.fragments_shaded, 0);
    }

    #[test]
    fn test_depth_outside_unit_range_is_rejected() {
        let mut raster = rasterizer(covering(1.5, Color::X));
        let stats = raster.draw(3, 0).unwrap();

        assert_eq!(stats.fragments_shaded, 0);
        assert_eq!(stats.fragments_rejected, (SIZE * SIZE) as usize);
    }

    #[test]
    fn test_smooth_shading_interpolates_attributes() {
        let mut vertices = covering(0.5, Color::ZERO);
        vertices[0].diffuse = Color::X;
        vertices[1].diffuse = Color::Y;
        vertices[2].diffuse = Color::Z;

        let mut raster = rasterizer(vertices);
        raster.draw(3, 0).unwrap();

        // Pixel (0, 3) sits at NDC (-0.75, -0.75): weights 0.875, 0.0625, 0.0625
        assert_eq!(
            raster.render_target().unwrap().item(0, 3),
            UnsignedColor::new(223, 15, 15)
        );
    }

    #[test]
    fn test_flat_shading_uses_first_vertex() {
        let mut vertices = covering(0.5, Color::ZERO);
        vertices[0].diffuse = Color::X;
        vertices[1].diffuse = Color::Y;
        vertices[2].diffuse = Color::Z;

        let mut raster = rasterizer(vertices);
        raster.set_smooth_shading(false);
        raster.draw(3, 0).unwrap();

        assert!(raster
            .render_target()
            .unwrap()
            .as_slice()
            .iter()
            .all(|&c| c == UnsignedColor::new(255, 0, 0)));
    }

    #[test]
    fn test_vertex_range_selects_triangles() {
        let mut raster = rasterizer([covering(0.7, Color::X), covering(0.3, Color::Y)].concat());
        let stats = raster.draw(3, 3).unwrap();

        assert_eq!(stats.triangles_drawn, 1);
        assert_eq!(
            raster.render_target().unwrap().item(2, 2),
            UnsignedColor::new(0, 255, 0)
        );
    }

    #[test]
    fn test_configuration_errors_leave_target_untouched() {
        let untouched = Resource::filled(SIZE, SIZE, BACKGROUND);

        let mut raster = rasterizer(covering(0.5, Color::X));
        raster.set_shaders(RasterShaders {
            pixel: None,
            ..ndc_shaders(PixelShader::Unlit)
        });
        assert_eq!(
            raster.draw(3, 0),
            Err(ConfigurationError::MissingStage("pixel"))
        );
        assert_eq!(raster.render_target(), Some(&untouched));

        let mut raster = rasterizer(covering(0.5, Color::X));
        raster.set_viewport(SIZE, 0);
        assert_eq!(
            raster.draw(3, 0),
            Err(ConfigurationError::ZeroViewport {
                width: SIZE,
                height: 0
            })
        );
        assert_eq!(raster.render_target(), Some(&untouched));

        let mut raster = rasterizer(covering(0.5, Color::X));
        assert_eq!(
            raster.draw(6, 0),
            Err(ConfigurationError::VertexRangeOutOfBounds {
                offset: 0,
                end: 6,
                len: 3
            })
        );
        assert_eq!(raster.render_target(), Some(&untouched));

        let mut raster = rasterizer(covering(0.5, Color::X));
        raster.set_render_target(Resource::new(SIZE, SIZE), Resource::new(SIZE, SIZE + 1));
        assert!(matches!(
            raster.draw(3, 0),
            Err(ConfigurationError::TargetSizeMismatch { .. })
        ));

        let mut raster = Rasterizer::new();
        raster.set_viewport(SIZE, SIZE);
        raster.set_render_target(Resource::new(SIZE, SIZE), Resource::new(SIZE, SIZE));
        raster.set_shaders(ndc_shaders(PixelShader::Unlit));
        assert_eq!(
            raster.draw(0, 0),
            Err(ConfigurationError::MissingVertexBuffer)
        );
    }
}
