//! Small viridis ramp for the 2D heatmap.

use egui::Color32;

const ANCHORS: [[u8; 3]; 10] = [
    [68, 1, 84],
    [72, 40, 120],
    [62, 74, 137],
    [49, 104, 142],
    [38, 130, 142],
    [31, 158, 137],
    [53, 183, 121],
    [110, 206, 88],
    [181, 222, 43],
    [253, 231, 37],
];

/// Map t in [0, 1] onto the viridis ramp.
pub fn viridis(t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let scaled = t * (ANCHORS.len() - 1) as f32;
    let i = (scaled.floor() as usize).min(ANCHORS.len() - 2);
    let frac = scaled - i as f32;
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * frac).round() as u8;
    let (a, b) = (ANCHORS[i], ANCHORS[i + 1]);
    Color32::from_rgb(lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_match_anchors() {
        assert_eq!(viridis(0.0), Color32::from_rgb(68, 1, 84));
        assert_eq!(viridis(1.0), Color32::from_rgb(253, 231, 37));
        // out-of-range inputs clamp
        assert_eq!(viridis(-1.0), viridis(0.0));
        assert_eq!(viridis(2.0), viridis(1.0));
    }
}
