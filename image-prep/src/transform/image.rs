use crate::error::DecodeError;
use image::{imageops, imageops::FilterType, Rgb, RgbImage};

/// Background color of the padded area.
pub const PAD_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Decode an image, shrink it to fit in a square of `image_size` pixels and
/// center it on a white canvas.
///
/// The output is the raw RGB bytes of the canvas in row-major order, always
/// `image_size * image_size * 3` bytes long. Images that already fit are
/// never magnified.
pub fn normalize_image(bytes: &[u8], image_size: u32) -> Result<Vec<u8>, DecodeError> {
    let image = image::load_from_memory(bytes)?.to_rgb8();
    let (orig_w, orig_h) = image.dimensions();

    // scale down
    let [thumb_w, thumb_h] = thumbnail_size(orig_w, orig_h, image_size);
    let thumbnail = if [thumb_w, thumb_h] == [orig_w, orig_h] {
        image
    } else {
        imageops::resize(&image, thumb_w, thumb_h, FilterType::Lanczos3)
    };

    // add border to make it square
    let [left, top] = paste_offset(thumb_w, thumb_h, image_size);
    let mut canvas = RgbImage::from_pixel(image_size, image_size, PAD_COLOR);
    imageops::replace(&mut canvas, &thumbnail, left as i64, top as i64);

    let bytes = canvas.into_raw();
    debug_assert_eq!(bytes.len(), image_size as usize * image_size as usize * 3);
    Ok(bytes)
}

/// Compute the `[width, height]` of an image shrunk to fit in a square of
/// `image_size` pixels.
///
/// The limiting side becomes `image_size`. The other side is rounded down
/// or up, whichever keeps the aspect ratio closer, and is at least 1.
pub fn thumbnail_size(width: u32, height: u32, image_size: u32) -> [u32; 2] {
    if width <= image_size && height <= image_size {
        return [width, height];
    }

    let aspect = width as f64 / height as f64;
    let size = image_size as f64;

    if aspect <= 1.0 {
        let width = round_aspect(size * aspect, |n| (aspect - n / size).abs());
        [width, image_size]
    } else {
        let height = round_aspect(size / aspect, |n| {
            if n == 0.0 {
                0.0
            } else {
                (aspect - size / n).abs()
            }
        });
        [image_size, height]
    }
}

/// The `[left, top]` position of a `width x height` image centered in a
/// square canvas.
pub fn paste_offset(width: u32, height: u32, image_size: u32) -> [u32; 2] {
    [(image_size - width) / 2, (image_size - height) / 2]
}

/// Pick floor or ceil of `value` by the smaller error. Ties go to floor.
fn round_aspect<F>(value: f64, error: F) -> u32
where
    F: Fn(f64) -> f64,
{
    let floor = value.floor();
    let ceil = value.ceil();
    let rounded = if error(ceil) < error(floor) { ceil } else { floor };
    (rounded as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    const SIZE: u32 = 299;

    fn encode(image: DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
        let mut cursor = Cursor::new(vec![]);
        image.write_to(&mut cursor, format).unwrap();
        cursor.into_inner()
    }

    fn pixel(bytes: &[u8], x: u32, y: u32) -> [u8; 3] {
        let index = ((y * SIZE + x) * 3) as usize;
        [bytes[index], bytes[index + 1], bytes[index + 2]]
    }

    #[test]
    fn thumbnail_size_test() {
        // already fits
        assert_eq!(thumbnail_size(100, 50, SIZE), [100, 50]);
        assert_eq!(thumbnail_size(299, 299, SIZE), [299, 299]);

        // landscape and portrait
        assert_eq!(thumbnail_size(900, 600, SIZE), [299, 199]);
        assert_eq!(thumbnail_size(600, 900, SIZE), [199, 299]);

        // square
        assert_eq!(thumbnail_size(400, 400, SIZE), [299, 299]);

        // degenerate aspect ratios keep at least one pixel
        assert_eq!(thumbnail_size(10000, 10, SIZE), [299, 1]);
        assert_eq!(thumbnail_size(10, 10000, SIZE), [1, 299]);
    }

    #[test]
    fn paste_offset_test() {
        assert_eq!(paste_offset(299, 299, SIZE), [0, 0]);
        assert_eq!(paste_offset(299, 199, SIZE), [0, 50]);
        assert_eq!(paste_offset(100, 50, SIZE), [99, 124]);
    }

    #[test]
    fn small_image_is_padded_not_magnified() {
        let red = RgbImage::from_pixel(100, 50, Rgb([200, 10, 10]));
        let bytes = encode(DynamicImage::ImageRgb8(red), ImageOutputFormat::Png);

        let output = normalize_image(&bytes, SIZE).unwrap();
        assert_eq!(output.len(), 299 * 299 * 3);

        assert_eq!(pixel(&output, 0, 0), [255, 255, 255]);
        assert_eq!(pixel(&output, 98, 149), [255, 255, 255]);
        assert_eq!(pixel(&output, 99, 124), [200, 10, 10]);
        assert_eq!(pixel(&output, 198, 173), [200, 10, 10]);
        assert_eq!(pixel(&output, 199, 173), [255, 255, 255]);
        assert_eq!(pixel(&output, 149, 174), [255, 255, 255]);

        let num_colored = output
            .chunks_exact(3)
            .filter(|rgb| *rgb != [255, 255, 255])
            .count();
        assert_eq!(num_colored, 100 * 50);
    }

    #[test]
    fn large_image_is_scaled_down() {
        let blue = RgbImage::from_pixel(900, 600, Rgb([20, 40, 180]));
        let bytes = encode(DynamicImage::ImageRgb8(blue), ImageOutputFormat::Png);

        let output = normalize_image(&bytes, SIZE).unwrap();
        assert_eq!(output.len(), 299 * 299 * 3);

        // 299x199 content starting at row 50
        assert_eq!(pixel(&output, 149, 49), [255, 255, 255]);
        assert_eq!(pixel(&output, 149, 249), [255, 255, 255]);
        let center = pixel(&output, 149, 149);
        assert_close(center, [20, 40, 180]);
    }

    #[test]
    fn square_image_fills_canvas() {
        let green = RgbImage::from_pixel(512, 512, Rgb([0, 128, 0]));
        let bytes = encode(DynamicImage::ImageRgb8(green), ImageOutputFormat::Jpeg(95));

        let output = normalize_image(&bytes, SIZE).unwrap();
        assert_eq!(output.len(), 299 * 299 * 3);

        // no padding on any side
        for [x, y] in [[0, 0], [298, 0], [0, 298], [298, 298], [149, 149]] {
            assert_close(pixel(&output, x, y), [0, 128, 0]);
        }
    }

    #[test]
    fn alpha_channel_is_dropped() {
        let rgba = RgbaImage::from_pixel(10, 10, Rgba([10, 20, 30, 0]));
        let bytes = encode(DynamicImage::ImageRgba8(rgba), ImageOutputFormat::Png);

        let output = normalize_image(&bytes, SIZE).unwrap();
        assert_eq!(output.len(), 299 * 299 * 3);
        assert_eq!(pixel(&output, 149, 149), [10, 20, 30]);
    }

    #[test]
    fn corrupted_image_test() {
        assert!(normalize_image(b"definitely not a jpeg", SIZE).is_err());
        assert!(normalize_image(&[], SIZE).is_err());
    }

    fn assert_close(lhs: [u8; 3], rhs: [u8; 3]) {
        lhs.iter().zip(rhs.iter()).for_each(|(&l, &r)| {
            assert!(
                (l as i32 - r as i32).abs() <= 3,
                "expect {:?} close to {:?}",
                lhs,
                rhs
            );
        });
    }
}
