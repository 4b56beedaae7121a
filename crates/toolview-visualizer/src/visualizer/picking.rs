//! Color picking
//!
//! Movement `i` is rendered with the flat color whose 24-bit value is
//! `i + 1`; black stays reserved for the background. Reading one pixel back
//! from that frame identifies the movement under the cursor.

use toolview_core::{PickError, Rgba, MAX_PICKABLE_MOVEMENTS};

/// Sampled background color: nothing under the cursor.
pub const BACKGROUND: [u8; 3] = [0, 0, 0];

/// RGB bytes identifying movement `index`.
///
/// Indices at or beyond [`MAX_PICKABLE_MOVEMENTS`] wrap; use
/// [`encode_colors`] to get a checked table.
pub fn encode_index(index: usize) -> [u8; 3] {
    let id = index as u32 + 1;
    [(id >> 16) as u8, (id >> 8) as u8, id as u8]
}

fn check_count(movement_count: usize) -> Result<(), PickError> {
    if movement_count > MAX_PICKABLE_MOVEMENTS {
        return Err(PickError::TooManyMovements {
            count: movement_count,
            max: MAX_PICKABLE_MOVEMENTS,
        });
    }
    Ok(())
}

/// Normalized color for an encoded id, fully opaque.
pub fn rgb_to_color(rgb: [u8; 3]) -> Rgba {
    [
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
        1.0,
    ]
}

/// Quantize a normalized color the way an 8-bit framebuffer stores it.
pub fn color_to_rgb(color: Rgba) -> [u8; 3] {
    let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [quantize(color[0]), quantize(color[1]), quantize(color[2])]
}

/// One picking color per movement.
pub fn encode_colors(movement_count: usize) -> Result<Vec<Rgba>, PickError> {
    check_count(movement_count)?;
    Ok((0..movement_count)
        .map(|index| rgb_to_color(encode_index(index)))
        .collect())
}

/// Picking colors expanded to every vertex of every movement run.
pub fn vertex_pick_colors(
    movement_count: usize,
    vertices_per_movement: usize,
) -> Result<Vec<Rgba>, PickError> {
    check_count(movement_count)?;

    let mut colors = Vec::with_capacity(movement_count * vertices_per_movement);
    for index in 0..movement_count {
        let color = rgb_to_color(encode_index(index));
        colors.extend(std::iter::repeat(color).take(vertices_per_movement));
    }
    Ok(colors)
}

/// Movement index for a sampled pixel, or `None` for background and ids
/// outside `0..movement_count`.
pub fn decode_index(rgb: [u8; 3], movement_count: usize) -> Option<usize> {
    if rgb == BACKGROUND {
        return None;
    }

    let id = ((rgb[0] as usize) << 16) | ((rgb[1] as usize) << 8) | rgb[2] as usize;
    let index = id - 1;
    (index < movement_count).then_some(index)
}

/// Source line of the movement under a sampled pixel.
pub fn decode(rgb: [u8; 3], movement_line_numbers: &[u32]) -> Option<u32> {
    decode_index(rgb, movement_line_numbers.len()).map(|index| movement_line_numbers[index])
}
