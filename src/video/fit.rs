//! Output frame sizing: fit a source frame inside a bounding box.

pub const DEFAULT_BOX_WIDTH: u32 = 1920;
pub const DEFAULT_BOX_HEIGHT: u32 = 1080;

/// Source and output frame dimensions for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitBox {
    pub input_w: u32,
    pub input_h: u32,
    pub output_w: u32,
    pub output_h: u32,
}

impl FitBox {
    /// Fit `source` inside `bounds`, never upscaling and always returning even dimensions.
    ///
    /// A missing or zero-sized source is treated as a 1920x1080 frame.
    pub fn fit(source: Option<(u32, u32)>, bounds: (u32, u32)) -> Self {
        let (input_w, input_h) = match source {
            Some((w, h)) if w > 0 && h > 0 => (w, h),
            _ => (DEFAULT_BOX_WIDTH, DEFAULT_BOX_HEIGHT),
        };
        let (box_w, box_h) = match bounds {
            (w, h) if w > 0 && h > 0 => (w, h),
            _ => (DEFAULT_BOX_WIDTH, DEFAULT_BOX_HEIGHT),
        };

        let (width, height) = if input_w <= box_w && input_h <= box_h {
            (input_w, input_h)
        } else {
            let scale = f64::min(
                f64::from(box_w) / f64::from(input_w),
                f64::from(box_h) / f64::from(input_h),
            );
            (
                (f64::from(input_w) * scale).round() as u32,
                (f64::from(input_h) * scale).round() as u32,
            )
        };

        Self {
            input_w,
            input_h,
            output_w: force_even(width),
            output_h: force_even(height),
        }
    }

    pub fn output(&self) -> (u32, u32) {
        (self.output_w, self.output_h)
    }

    pub fn is_downscaled(&self) -> bool {
        self.output_w != self.input_w || self.output_h != self.input_h
    }
}

fn force_even(value: u32) -> u32 {
    let even = if value % 2 == 1 { value - 1 } else { value };
    even.max(2)
}
