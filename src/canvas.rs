use crate::theme::Rgb;
use std::io::Write;

/// What the simulator draws onto. Coordinates are world units with y pointing down.
pub trait Surface {
    fn size(&self) -> (f32, f32);
    /// Erase `amount` of whatever light is already on the surface.
    fn fade(&mut self, amount: f32);
    /// Additive line, used for rocket trails.
    fn stroke(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb);
    /// Additive filled disc.
    fn fill_disc(&mut self, center: (f32, f32), radius: f32, color: Rgb, alpha: f32);
}

const TRAIL_INTENSITY: f32 = 0.8;

/// Light accumulation buffer presented as half-block terminal cells.
///
/// Each terminal cell holds two vertically stacked pixels. One pixel spans `scale`
/// world units in both directions.
pub struct Canvas {
    width: usize,
    height: usize,
    scale: f32,
    light: Vec<[f32; 3]>,
    output_buf: Vec<u8>,
}

impl Canvas {
    pub fn new(cols: usize, rows: usize, scale: f32) -> Self {
        let width = cols;
        let height = rows * 2;
        Self {
            width,
            height,
            scale: scale.max(1.0),
            light: vec![[0.0; 3]; width * height],
            output_buf: Vec::with_capacity(width * height * 25),
        }
    }

    /// Reallocate for a new terminal size. Anything already drawn is lost.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.width = cols;
        self.height = rows * 2;
        self.light = vec![[0.0; 3]; self.width * self.height];
        self.output_buf = Vec::with_capacity(self.width * self.height * 25);
    }

    /// Terminal columns and rows covered by the canvas.
    pub fn cells(&self) -> (usize, usize) {
        (self.width, self.height / 2)
    }

    /// World position at the center of the upper or lower pixel of a terminal cell.
    pub fn cell_to_world(&self, column: u16, row: u16) -> (f32, f32) {
        let px = column as f32 + 0.5;
        let py = row as f32 * 2.0 + 0.5;
        (px * self.scale, py * self.scale)
    }

    #[cfg(test)]
    pub fn pixel(&self, x: usize, y: usize) -> Option<[f32; 3]> {
        if x < self.width && y < self.height {
            Some(self.light[y * self.width + x])
        } else {
            None
        }
    }

    fn add(&mut self, x: isize, y: isize, color: Rgb, weight: f32) {
        if x < 0 || y < 0 || x >= self.width as isize || y >= self.height as isize {
            return;
        }
        let px = &mut self.light[y as usize * self.width + x as usize];
        px[0] += color.0 as f32 * weight;
        px[1] += color.1 as f32 * weight;
        px[2] += color.2 as f32 * weight;
    }

    /// Write the buffer as half-block rows blended over `bg_color`.
    pub fn present<W: Write>(&mut self, out: &mut W, bg_color: Rgb) -> std::io::Result<()> {
        self.output_buf.clear();
        self.output_buf.extend_from_slice(b"\x1b[H");

        let mut prev_top: Rgb = (255, 255, 255);
        let mut prev_bot: Rgb = (255, 255, 255);

        for y in (0..self.height).step_by(2) {
            for x in 0..self.width {
                let top_idx = y * self.width + x;
                let bot_idx = if y + 1 < self.height {
                    (y + 1) * self.width + x
                } else {
                    top_idx
                };

                let top_color = over_background(self.light[top_idx], bg_color);
                let bot_color = over_background(self.light[bot_idx], bg_color);

                if top_color != prev_top {
                    write!(
                        self.output_buf,
                        "\x1b[48;2;{};{};{}m",
                        top_color.0, top_color.1, top_color.2
                    )?;
                    prev_top = top_color;
                }
                if bot_color != prev_bot {
                    write!(
                        self.output_buf,
                        "\x1b[38;2;{};{};{}m",
                        bot_color.0, bot_color.1, bot_color.2
                    )?;
                    prev_bot = bot_color;
                }

                self.output_buf.extend_from_slice("▄".as_bytes());
            }
            self.output_buf.extend_from_slice(b"\x1b[0m");
            prev_top = (255, 255, 255);
            prev_bot = (255, 255, 255);
            if y + 2 < self.height {
                self.output_buf.extend_from_slice(b"\r\n");
            }
        }

        out.write_all(&self.output_buf)
    }
}

fn over_background(light: [f32; 3], bg: Rgb) -> Rgb {
    (
        (bg.0 as f32 + light[0]).min(255.0) as u8,
        (bg.1 as f32 + light[1]).min(255.0) as u8,
        (bg.2 as f32 + light[2]).min(255.0) as u8,
    )
}

impl Surface for Canvas {
    fn size(&self) -> (f32, f32) {
        (self.width as f32 * self.scale, self.height as f32 * self.scale)
    }

    fn fade(&mut self, amount: f32) {
        let keep = (1.0 - amount).clamp(0.0, 1.0);
        for px in &mut self.light {
            px[0] *= keep;
            px[1] *= keep;
            px[2] *= keep;
            // Flush residue that would never reach a visible level again
            if px[0] + px[1] + px[2] < 1.0 {
                *px = [0.0; 3];
            }
        }
    }

    fn stroke(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb) {
        let (x0, y0) = (from.0 / self.scale, from.1 / self.scale);
        let (x1, y1) = (to.0 / self.scale, to.1 / self.scale);
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as usize;

        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = x0 + (x1 - x0) * t;
            let y = y0 + (y1 - y0) * t;
            // Brighter toward the rocket head
            let weight = TRAIL_INTENSITY * (0.3 + 0.7 * t);
            self.add(x.floor() as isize, y.floor() as isize, color, weight);
        }
    }

    fn fill_disc(&mut self, center: (f32, f32), radius: f32, color: Rgb, alpha: f32) {
        if alpha <= 0.0 {
            return;
        }
        let cx = center.0 / self.scale;
        let cy = center.1 / self.scale;
        let r = radius.max(0.0) / self.scale;

        if r < 0.5 {
            // Sub-pixel disc: one pixel, dimmed by how much of it the disc covers
            let coverage = (std::f32::consts::PI * r * r).clamp(0.5, 1.0);
            self.add(cx.floor() as isize, cy.floor() as isize, color, alpha * coverage);
            return;
        }

        // Only walk the part of the bounding box that lies on the canvas
        let min_x = ((cx - r).floor() as isize).max(0);
        let max_x = ((cx + r).ceil() as isize).min(self.width as isize - 1);
        let min_y = ((cy - r).floor() as isize).max(0);
        let max_y = ((cy + r).ceil() as isize).min(self.height as isize - 1);
        if min_x > max_x || min_y > max_y {
            return;
        }
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r * r {
                    self.add(x, y, color, alpha);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_in_world_units() {
        let canvas = Canvas::new(80, 24, 6.0);
        assert_eq!(canvas.size(), (480.0, 288.0));
    }

    #[test]
    fn drawing_adds_light_and_fade_removes_thirty_percent() {
        let mut canvas = Canvas::new(10, 5, 1.0);
        canvas.fill_disc((2.5, 2.5), 0.1, (200, 100, 0), 1.0);
        let single = canvas.pixel(2, 2).unwrap()[0];
        canvas.fill_disc((2.5, 2.5), 0.1, (200, 100, 0), 1.0);
        let px = canvas.pixel(2, 2).unwrap();
        assert!(single > 0.0);
        assert!((px[0] - single * 2.0).abs() < 1e-3, "overlapping draws should brighten: {:?}", px);

        let before = px[0];
        canvas.fade(0.3);
        let after = canvas.pixel(2, 2).unwrap()[0];
        assert!((after - before * 0.7).abs() < 1e-3);
    }

    #[test]
    fn repeated_fades_clear_the_surface() {
        let mut canvas = Canvas::new(4, 2, 1.0);
        canvas.fill_disc((1.0, 1.0), 0.1, (255, 255, 255), 1.0);
        for _ in 0..40 {
            canvas.fade(0.3);
        }
        assert_eq!(canvas.pixel(1, 1), Some([0.0; 3]));
    }

    #[test]
    fn out_of_bounds_draws_are_ignored() {
        let mut canvas = Canvas::new(4, 2, 1.0);
        canvas.fill_disc((-50.0, -50.0), 3.0, (255, 0, 0), 1.0);
        canvas.stroke((100.0, 100.0), (120.0, 90.0), (255, 0, 0));
        assert!(canvas.light.iter().all(|px| *px == [0.0; 3]));
    }

    #[test]
    fn huge_disc_only_visits_the_canvas() {
        let mut canvas = Canvas::new(80, 24, 6.0);
        canvas.fill_disc((240.0, 144.0), 1e9, (0, 0, 255), 0.5);
        assert!(canvas.light.iter().all(|px| px[2] > 0.0));

        // Large disc centered far off screen still lights the near corner
        let mut canvas = Canvas::new(10, 5, 1.0);
        canvas.fill_disc((-3e6, -3e6), 5e6, (255, 0, 0), 1.0);
        assert!(canvas.pixel(0, 0).unwrap()[0] > 0.0);
    }

    #[test]
    fn stroke_lights_both_ends() {
        let mut canvas = Canvas::new(20, 5, 1.0);
        canvas.stroke((1.5, 1.5), (10.5, 1.5), (0, 255, 0));
        assert!(canvas.pixel(1, 1).unwrap()[1] > 0.0);
        assert!(canvas.pixel(10, 1).unwrap()[1] > 0.0);
    }

    #[test]
    fn present_writes_one_half_block_per_cell() {
        let mut canvas = Canvas::new(3, 2, 1.0);
        let mut out = Vec::new();
        canvas.present(&mut out, (0, 0, 0)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("\x1b[H"));
        assert_eq!(text.matches('▄').count(), 6);
    }

    #[test]
    fn light_is_blended_over_background_and_saturates() {
        assert_eq!(over_background([0.0; 3], (26, 27, 38)), (26, 27, 38));
        assert_eq!(over_background([500.0, 10.0, 0.0], (26, 27, 38)), (255, 37, 38));
    }

    #[test]
    fn cell_centers_map_to_world() {
        let canvas = Canvas::new(10, 10, 4.0);
        assert_eq!(canvas.cell_to_world(0, 0), (2.0, 2.0));
        assert_eq!(canvas.cell_to_world(2, 3), (10.0, 26.0));
    }
}
