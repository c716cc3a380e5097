use crate::video::Frame;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AberrationConfig {
    pub shift: i32,
}

/// Split channels: red rolls right by `shift`, green rolls up by `shift`,
/// blue stays put. Rolls wrap around the frame edges.
pub fn chromatic_aberration(frame: &Frame, cfg: &AberrationConfig) -> Frame {
    let (width, height) = frame.dimensions();
    let mut out = frame.clone();
    if width == 0 || height == 0 {
        return out;
    }
    let shift = i64::from(cfg.shift);
    for y in 0..height {
        let green_src_y = (y as i64 + shift).rem_euclid(height as i64) as usize;
        for x in 0..width {
            let red_src_x = (x as i64 - shift).rem_euclid(width as i64) as usize;
            let red = frame.pixel(red_src_x, y)[0];
            let green = frame.pixel(x, green_src_y)[1];
            let blue = frame.pixel(x, y)[2];
            out.set_pixel(x, y, [red, green, blue]);
        }
    }
    out
}
