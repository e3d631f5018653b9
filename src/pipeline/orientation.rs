//! EXIF orientation correction.
//!
//! Phone cameras store rotation in EXIF tag 0x0112 instead of rotating
//! pixels; without this fix a portrait capture reaches the try-on model
//! sideways. Runs before any geometry so crops see upright images.
//!
//! EXIF orientation values:
//! 1 = Normal, 2 = Mirrored, 3 = 180deg, 4 = Flipped V,
//! 5 = Mirrored + 90deg CW, 6 = 90deg CW, 7 = Mirrored + 270deg CW, 8 = 270deg CW

use std::io::Cursor;

use image::DynamicImage;

/// Read the EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or the tag is not present.
pub fn exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Rotate/flip a decoded image so it matches the orientation the camera saw.
///
/// `raw_bytes` are the original file bytes (EXIF lives there, not in the
/// decoded pixels). Unknown orientation values pass the image through.
pub fn correct_orientation(image: DynamicImage, raw_bytes: &[u8]) -> DynamicImage {
    match exif_orientation(raw_bytes) {
        1 => image,
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}
