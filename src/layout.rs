//! Letterbox geometry.
//!
//! Frames are scaled uniformly to the largest size that fits the window and
//! centered, leaving black bars on the two sides that do not touch.

/// Largest `(width, height)` with the video's aspect ratio that fits `window`.
///
/// Returns `(0, 0)` when either input has a zero dimension.
pub fn display_size(video: (u32, u32), window: (u32, u32)) -> (u32, u32) {
    let (video_width, video_height) = video;
    let (window_width, window_height) = window;
    if video_width == 0 || video_height == 0 || window_width == 0 || window_height == 0 {
        return (0, 0);
    }

    let width_scale = window_width as f64 / video_width as f64;
    let height_scale = window_height as f64 / video_height as f64;
    let scale = width_scale.min(height_scale);

    (
        (video_width as f64 * scale) as u32,
        (video_height as f64 * scale) as u32,
    )
}

/// Top-left corner that centers `display` inside `window`.
///
/// Negative when the display is larger than the window.
pub fn centered_position(display: (u32, u32), window: (u32, u32)) -> (i32, i32) {
    let x = (i64::from(window.0) - i64::from(display.0)).div_euclid(2);
    let y = (i64::from(window.1) - i64::from(display.1)).div_euclid(2);
    (x as i32, y as i32)
}
