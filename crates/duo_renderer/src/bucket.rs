//! Bucket-based tile rendering for the ray tracer.
//!
//! Divides the image into tiles (buckets) that are traced independently
//! and in parallel using rayon, then copied into the render target.

use duo_core::{Resource, UnsignedColor};

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// X coordinate of bucket's top-left corner
    pub x: u32,
    /// Y coordinate of bucket's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Index of this bucket in the render order
    pub index: usize,
}

impl Bucket {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Render every pixel of the bucket with `shade(x, y)`, where x and y are
    /// image coordinates. Pixels come back in row-major order.
    pub fn render<F>(&self, mut shade: F) -> BucketResult
    where
        F: FnMut(u32, u32) -> UnsignedColor,
    {
        let mut pixels = Vec::with_capacity(self.pixel_count() as usize);
        for y in self.y..self.y + self.height {
            for x in self.x..self.x + self.width {
                pixels.push(shade(x, y));
            }
        }
        BucketResult::new(*self, pixels)
    }
}

/// Default bucket edge length in pixels.
pub const DEFAULT_BUCKET_SIZE: u32 = 64;

/// Generate buckets for an image, sorted in spiral order from center.
///
/// A `bucket_size` of zero falls back to [`DEFAULT_BUCKET_SIZE`].
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let bucket_size = if bucket_size == 0 {
        DEFAULT_BUCKET_SIZE
    } else {
        bucket_size
    };

    let mut buckets = Vec::new();
    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let bw = bucket_size.min(width - x);
            let bh = bucket_size.min(height - y);
            buckets.push(Bucket::new(x, y, bw, bh, buckets.len()));
            x += bucket_size;
        }
        y += bucket_size;
    }

    sort_spiral(&mut buckets, width, height);

    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }

    buckets
}

/// Sort buckets by distance from the image center, nearest first.
fn sort_spiral(buckets: &mut [Bucket], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let distance = |b: &Bucket| {
        let bx = b.x as f32 + b.width as f32 / 2.0;
        let by = b.y as f32 + b.height as f32 / 2.0;
        (bx - center_x).powi(2) + (by - center_y).powi(2)
    };

    buckets.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
}

/// Result of rendering a bucket.
#[derive(Debug, Clone)]
pub struct BucketResult {
    pub bucket: Bucket,
    /// Pixel colors in row-major order
    pub pixels: Vec<UnsignedColor>,
}

impl BucketResult {
    pub fn new(bucket: Bucket, pixels: Vec<UnsignedColor>) -> Self {
        Self { bucket, pixels }
    }

    /// Copy the pixels into their place in `target`.
    pub fn write_into(&self, target: &mut Resource<UnsignedColor>) {
        let width = self.bucket.width.max(1) as usize;
        for (row, line) in self.pixels.chunks(width).enumerate() {
            for (col, &pixel) in line.iter().enumerate() {
                target.set(self.bucket.x + col as u32, self.bucket.y + row as u32, pixel);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_buckets_exact_fit() {
        let buckets = generate_buckets(128, 128, 64);
        assert_eq!(buckets.len(), 4); // 2x2 grid

        let total_pixels: u32 = buckets.iter().map(|b| b.pixel_count()).sum();
        assert_eq!(total_pixels, 128 * 128);
    }

    #[test]
    fn test_generate_buckets_partial_fit() {
        let buckets = generate_buckets(100, 33, 64);
        assert_eq!(buckets.len(), 2);

        let total_pixels: u32 = buckets.iter().map(|b| b.pixel_count()).sum();
        assert_eq!(total_pixels, 100 * 33);
    }

    #[test]
    fn test_spiral_order() {
        let buckets = generate_buckets(192, 192, 64);
        assert_eq!(buckets.len(), 9); // 3x3 grid

        let first = &buckets[0];
        assert_eq!((first.x, first.y), (64, 64));
        assert!(buckets.iter().enumerate().all(|(i, b)| b.index == i));
    }

    #[test]
    fn test_zero_bucket_size_uses_default() {
        assert_eq!(generate_buckets(128, 64, 0).len(), 2);
    }

    #[test]
    fn test_render_and_write_cover_the_image() {
        let mut target = Resource::filled(5, 3, UnsignedColor::BLACK);
        for bucket in generate_buckets(5, 3, 2) {
            bucket
                .render(|x, y| UnsignedColor::new(x as u8, y as u8, 1))
                .write_into(&mut target);
        }

        for y in 0..3 {
            for x in 0..5 {
                assert_eq!(target.item(x, y), UnsignedColor::new(x as u8, y as u8, 1));
            }
        }
    }
}
