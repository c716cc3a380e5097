/// Bytes per pixel of a decoded frame (packed RGB).
pub const CHANNELS: usize = 3;

/// A packed RGB24 image, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Frame {
    pub fn black(width: usize, height: usize) -> Self {
        Self::filled(width, height, [0, 0, 0])
    }

    pub fn filled(width: usize, height: usize, rgb: [u8; CHANNELS]) -> Self {
        let mut data = Vec::with_capacity(width * height * CHANNELS);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap raw RGB24 bytes; `None` when the length does not match the size.
    pub fn from_rgb(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        (data.len() == width * height * CHANNELS).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; CHANNELS] {
        let at = (y * self.width + x) * CHANNELS;
        [self.data[at], self.data[at + 1], self.data[at + 2]]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; CHANNELS]) {
        let at = (y * self.width + x) * CHANNELS;
        self.data[at..at + CHANNELS].copy_from_slice(&rgb);
    }

    pub fn row(&self, y: usize) -> &[u8] {
        let stride = self.width * CHANNELS;
        &self.data[y * stride..(y + 1) * stride]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let stride = self.width * CHANNELS;
        &mut self.data[y * stride..(y + 1) * stride]
    }

    /// Nearest-neighbour resize; returns a clone when the size already matches.
    pub fn resized(&self, width: usize, height: usize) -> Frame {
        if (width, height) == (self.width, self.height) {
            return self.clone();
        }
        if self.width == 0 || self.height == 0 {
            return Frame::black(width, height);
        }
        let mut data = Vec::with_capacity(width * height * CHANNELS);
        for y in 0..height {
            let src_y = y * self.height / height;
            let src_row = self.row(src_y);
            for x in 0..width {
                let src_x = x * self.width / width;
                let at = src_x * CHANNELS;
                data.extend_from_slice(&src_row[at..at + CHANNELS]);
            }
        }
        Frame {
            width,
            height,
            data,
        }
    }

    /// Pack into `0RGB` words for window surfaces.
    pub fn to_0rgb(&self) -> Vec<u32> {
        self.data
            .chunks_exact(CHANNELS)
            .map(|px| (u32::from(px[0]) << 16) | (u32::from(px[1]) << 8) | u32::from(px[2]))
            .collect()
    }
}
