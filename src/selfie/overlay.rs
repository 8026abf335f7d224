//! Burns the caption into the stored selfie: a translucent black band along
//! the bottom edge, location on the first line, capture time on the second.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageFormat, Rgb, RgbImage, codecs::jpeg::JpegEncoder};

use super::caption::OverlayCaption;
use crate::error::AppError;

const BAND_MIN_PX: u32 = 80;
const TEXT_LEFT_PX: u32 = 20;
const BOTTOM_GAP_PX: u32 = 5;
const JPEG_QUALITY: u8 = 90;

/// Glyph scale for 8px cells, text about 3% of the image height.
fn glyph_scale(height: u32) -> u32 {
    (height * 3 / 100 / 8).max(1)
}

fn darken(img: &mut RgbImage, from_y: u32) {
    for y in from_y..img.height() {
        for x in 0..img.width() {
            let Rgb(p) = img.get_pixel_mut(x, y);
            // 60% black over the photo
            for c in p.iter_mut() {
                *c = (u16::from(*c) * 2 / 5) as u8;
            }
        }
    }
}

fn draw_text(img: &mut RgbImage, text: &str, left: u32, top: u32, scale: u32) {
    let white = Rgb([255, 255, 255]);
    let mut x0 = left;

    for ch in text.chars() {
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or_default();

        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..8u32 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let x = x0 + col * scale + dx;
                        let y = top + row as u32 * scale + dy;
                        if x < img.width() && y < img.height() {
                            img.put_pixel(x, y, white);
                        }
                    }
                }
            }
        }

        x0 += 8 * scale;
        if x0 >= img.width() {
            break;
        }
    }
}

/// Returns a new JPEG with the caption drawn over the bottom band.
pub fn burn_caption(jpeg: &[u8], caption: &OverlayCaption) -> Result<Vec<u8>, AppError> {
    let mut img = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)
        .map_err(|_| AppError::BadRequest("Selfie could not be decoded".into()))?
        .to_rgb8();

    let height = img.height();
    let scale = glyph_scale(height);
    let glyph_px = 8 * scale;
    let line_px = glyph_px + 3 * scale + 3;

    let date_top = height.saturating_sub(BOTTOM_GAP_PX + glyph_px);
    let location_top = date_top.saturating_sub(line_px);
    let band_px = BAND_MIN_PX.max(height - location_top + 10).min(height);

    darken(&mut img, height - band_px);
    draw_text(&mut img, &caption.location, TEXT_LEFT_PX, location_top, scale);
    draw_text(&mut img, &caption.captured_at, TEXT_LEFT_PX, date_top, scale);

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&img)
        .map_err(|e| AppError::Internal(format!("selfie encode: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn grey_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 200, 200]));
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, 95)
            .encode_image(&img)
            .unwrap();
        out
    }

    fn caption() -> OverlayCaption {
        let at = NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(9, 4, 12)
            .unwrap();
        OverlayCaption::new(Some("Pimpri, Pune, Maharashtra"), at)
    }

    #[test]
    fn band_darkens_bottom_and_carries_white_text() {
        let stamped = burn_caption(&grey_jpeg(320, 200), &caption()).unwrap();
        let img = image::load_from_memory_with_format(&stamped, ImageFormat::Jpeg)
            .unwrap()
            .to_rgb8();

        assert_eq!(img.dimensions(), (320, 200));
        // above the band stays as it was
        assert!(img.get_pixel(5, 10)[0] > 180);
        // left of the text inside the band
        assert!(img.get_pixel(5, 190)[0] < 110);

        let white = (120..200)
            .flat_map(|y| (TEXT_LEFT_PX..320).map(move |x| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y)[0] > 180)
            .count();
        assert!(white > 50, "only {white} text pixels");
    }

    #[test]
    fn tiny_image_is_fully_banded() {
        let stamped = burn_caption(&grey_jpeg(40, 30), &caption()).unwrap();
        let img = image::load_from_memory(&stamped).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (40, 30));
        assert!(img.get_pixel(2, 2)[0] < 110);
    }

    #[test]
    fn rejects_bytes_that_only_look_like_jpeg() {
        let fake = [0xFF, 0xD8, 0xFF, 0x00, 0x01];
        assert!(matches!(burn_caption(&fake, &caption()), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn text_scales_with_height() {
        assert_eq!(glyph_scale(200), 1);
        assert_eq!(glyph_scale(1080), 4);
    }
}
