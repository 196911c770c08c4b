//! Draw detection boxes onto a frame.

use image::{Rgb, RgbImage};

use crate::detector::Detection;

/// Outline thickness in pixels.
pub const LINE_WIDTH: u32 = 3;

const PALETTE: [Rgb<u8>; 8] = [
    Rgb([230, 25, 75]),
    Rgb([60, 180, 75]),
    Rgb([255, 225, 25]),
    Rgb([0, 130, 200]),
    Rgb([245, 130, 48]),
    Rgb([145, 30, 180]),
    Rgb([70, 240, 240]),
    Rgb([240, 50, 230]),
];

/// Colour used for `label`; the same label always gets the same colour.
pub fn label_color(label: &str) -> Rgb<u8> {
    // FNV-1a
    let hash = label.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    });
    #[allow(clippy::cast_possible_truncation)]
    let index = (hash % PALETTE.len() as u64) as usize;
    PALETTE[index]
}

/// Outline every detection on `frame`. Boxes are clipped to the frame;
/// boxes entirely outside it are skipped.
pub fn annotate(frame: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
        if let Some(rect) = clip(frame.width(), frame.height(), detection.bbox) {
            draw_outline(frame, rect, label_color(&detection.label));
        }
    }
}

/// Inclusive pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Rect {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn clip(width: u32, height: u32, bbox: [f32; 4]) -> Option<Rect> {
    if width == 0 || height == 0 || bbox.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let [x1, y1, x2, y2] = bbox;
    let (x1, x2) = (x1.min(x2), x1.max(x2));
    let (y1, y2) = (y1.min(y2), y1.max(y2));

    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    if x2 < 0.0 || y2 < 0.0 || x1 > max_x || y1 > max_y {
        return None;
    }

    Some(Rect {
        x1: x1.clamp(0.0, max_x).round() as u32,
        y1: y1.clamp(0.0, max_y).round() as u32,
        x2: x2.clamp(0.0, max_x).round() as u32,
        y2: y2.clamp(0.0, max_y).round() as u32,
    })
}

fn draw_outline(frame: &mut RgbImage, rect: Rect, color: Rgb<u8>) {
    for y in rect.y1..=rect.y2 {
        for x in rect.x1..=rect.x2 {
            let near_edge = x - rect.x1 < LINE_WIDTH
                || rect.x2 - x < LINE_WIDTH
                || y - rect.y1 < LINE_WIDTH
                || rect.y2 - y < LINE_WIDTH;
            if near_edge {
                frame.put_pixel(x, y, color);
            }
        }
    }
}
