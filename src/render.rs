//! The Renderer interface: a minimal rasterization sink, not a GUI framework.
//!
//! A [`Renderer`] only ever receives `clear`/`draw_point` calls from rank 0, after the
//! visualization phase's all-gather, once per rendered step. It owns no event loop and no
//! window.

use crate::body::Color;
use crate::error::{Error, Result};

/// The two operations a visualization sink must support, addressed in simulation
/// coordinates; rescaling to pixel space is the renderer's concern.
pub trait Renderer {
    fn clear(&mut self, background: Color);
    fn draw_point(&mut self, x: f64, y: f64, color: Color);
    /// Flushes the current frame. Called once per rendered step, after every `draw_point`.
    fn finish(&mut self, step: usize) -> Result<()>;
}

/// Discards every call. Used when `render` is configured off, and by every automated test.
#[derive(Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn clear(&mut self, _background: Color) {}
    fn draw_point(&mut self, _x: f64, _y: f64, _color: Color) {}
    fn finish(&mut self, _step: usize) -> Result<()> {
        Ok(())
    }
}

/// Accumulates points into an in-memory bitmap and flushes one PNG per rendered step to
/// `output_dir`. This is the "minimal rasterization sink" called for by the spec: no
/// windowing, no input handling, no camera, just simulation coordinates mapped onto a
/// fixed-size canvas and written to disk.
pub struct RasterRenderer {
    output_dir: std::path::PathBuf,
    canvas_px: u32,
    world_radius: f64,
    background: Color,
    points: Vec<(f64, f64, Color)>,
}

impl RasterRenderer {
    pub fn new(output_dir: impl Into<std::path::PathBuf>, canvas_px: u32, world_radius: f64) -> Self {
        Self {
            output_dir: output_dir.into(),
            canvas_px,
            world_radius,
            background: Color(0, 0, 0),
            points: Vec::new(),
        }
    }

    fn to_pixel(&self, x: f64, y: f64) -> (i32, i32) {
        let half = self.canvas_px as f64 / 2.0;
        let scale = half / self.world_radius;
        let px = half + x * scale;
        // Flip y: simulation y grows upward, pixel rows grow downward.
        let py = half - y * scale;
        (px as i32, py as i32)
    }
}

impl Renderer for RasterRenderer {
    fn clear(&mut self, background: Color) {
        self.background = background;
        self.points.clear();
    }

    fn draw_point(&mut self, x: f64, y: f64, color: Color) {
        self.points.push((x, y, color));
    }

    fn finish(&mut self, step: usize) -> Result<()> {
        use plotters::prelude::*;

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| Error::Messaging(format!("creating render output dir failed: {e}")))?;
        let path = self.output_dir.join(format!("frame_{step:06}.png"));
        let size = self.canvas_px;

        let root = BitMapBackend::new(&path, (size, size)).into_drawing_area();
        let Color(br, bg, bb) = self.background;
        root.fill(&RGBColor(br, bg, bb))
            .map_err(|e| Error::Messaging(format!("clearing render surface failed: {e}")))?;

        for &(x, y, Color(r, g, b)) in &self.points {
            let (px, py) = self.to_pixel(x, y);
            if px >= 0 && py >= 0 && (px as u32) < size && (py as u32) < size {
                root.draw_pixel((px, py), &RGBColor(r, g, b))
                    .map_err(|e| Error::Messaging(format!("drawing point failed: {e}")))?;
            }
        }

        root.present()
            .map_err(|e| Error::Messaging(format!("flushing render frame failed: {e}")))?;
        Ok(())
    }
}
