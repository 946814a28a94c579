// Display selection, window position and scaled window size

use crate::config::{VideoEnv, WindowPosEnv};
use crate::error::{Error, Result};
use crate::platform::{Rect, VideoBackend, WindowId, WindowPos};

/// Space kept free around a scaled window for decorations
pub(crate) const DECORATION_MARGIN: (i32, i32) = (20, 20);

/// Pick the display for a mode request.
///
/// Order: explicit index, environment override, the display holding the
/// current window, the display under the global mouse cursor, display 0.
pub(crate) fn resolve_display<V: VideoBackend>(
    video: &V,
    explicit: Option<i32>,
    env: &VideoEnv,
    window: Option<WindowId>,
) -> Result<i32> {
    let count = video.num_displays()?;
    if let Some(display) = explicit {
        if display < 0 || display >= count {
            return Err(Error::config(format!(
                "display index {} out of range, {} display(s) attached",
                display, count
            )));
        }
        return Ok(display);
    }
    if let Some(display) = env.display.filter(|d| (0..count).contains(d)) {
        return Ok(display);
    }
    if let Some(window) = window {
        return Ok(video.window_display_index(window)?);
    }
    let (mx, my) = video.global_mouse_position();
    for display in 0..count {
        if video.display_bounds(display)?.contains(mx, my) {
            return Ok(display);
        }
    }
    Ok(0)
}

/// Position for a window that does not inherit one from an existing window
pub(crate) fn initial_position(env: &VideoEnv, display: i32) -> (WindowPos, WindowPos) {
    match env.window_pos {
        Some(WindowPosEnv::At(x, y)) => (WindowPos::At(x), WindowPos::At(y)),
        Some(WindowPosEnv::Centered) => (WindowPos::Centered(display), WindowPos::Centered(display)),
        None => (WindowPos::Undefined(display), WindowPos::Undefined(display)),
    }
}

/// Position to restore when leaving fullscreen. A backup that was never
/// given a concrete position centers the window instead.
pub(crate) fn restore_position(
    backup: Option<(WindowPos, WindowPos)>,
    display: i32,
) -> (WindowPos, WindowPos) {
    let center = |pos: WindowPos| match pos {
        WindowPos::Undefined(d) => WindowPos::Centered(d),
        other => other,
    };
    match backup {
        Some((x, y)) => (center(x), center(y)),
        None => (WindowPos::Centered(display), WindowPos::Centered(display)),
    }
}

/// Window size for a scaled, windowed mode.
///
/// Fractional scaling fills the usable area (less the margin) while keeping
/// the aspect ratio. Integer scaling picks the largest whole factor that
/// fits, never below 1.
pub(crate) fn scaled_window_size(usable: Rect, logical: (i32, i32), fractional: bool) -> (i32, i32) {
    let (w, h) = logical;
    let avail_w = (usable.w - DECORATION_MARGIN.0).max(1);
    let avail_h = (usable.h - DECORATION_MARGIN.1).max(1);

    if fractional {
        let aspect = w as f64 / h as f64;
        if avail_w as f64 / avail_h as f64 > aspect {
            (((avail_h as f64) * aspect).round() as i32, avail_h)
        } else {
            (avail_w, ((avail_w as f64) / aspect).round() as i32)
        }
    } else {
        let scale = (avail_w / w).min(avail_h / h).max(1);
        (w * scale, h * scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::headless::{DisplaySpec, HeadlessVideo};

    #[test]
    fn test_integer_scale_fits_usable_area() {
        let usable = Rect::new(0, 0, 1920, 1040);
        assert_eq!(scaled_window_size(usable, (320, 240), false), (1280, 960));
        assert_eq!(scaled_window_size(usable, (640, 480), false), (1280, 960));
        // larger than the desktop still gets a 1x window
        assert_eq!(scaled_window_size(usable, (4000, 3000), false), (4000, 3000));
    }

    #[test]
    fn test_fractional_scale_keeps_aspect() {
        let usable = Rect::new(0, 0, 1920, 1040);
        let (w, h) = scaled_window_size(usable, (320, 240), true);
        assert_eq!(h, 1020);
        assert_eq!(w, 1360);

        let tall = Rect::new(0, 0, 800, 1200);
        assert_eq!(scaled_window_size(tall, (400, 200), true), (780, 390));
    }

    #[test]
    fn test_restore_position_centers_undefined() {
        assert_eq!(
            restore_position(Some((WindowPos::Undefined(1), WindowPos::At(5))), 0),
            (WindowPos::Centered(1), WindowPos::At(5))
        );
        assert_eq!(
            restore_position(None, 2),
            (WindowPos::Centered(2), WindowPos::Centered(2))
        );
    }

    #[test]
    fn test_initial_position_from_env() {
        let mut env = VideoEnv::default();
        assert_eq!(
            initial_position(&env, 1),
            (WindowPos::Undefined(1), WindowPos::Undefined(1))
        );
        env.window_pos = Some(WindowPosEnv::At(100, 50));
        assert_eq!(initial_position(&env, 1), (WindowPos::At(100), WindowPos::At(50)));
    }

    #[test]
    fn test_display_resolution_order() {
        let mut video = HeadlessVideo::with_displays(vec![
            DisplaySpec::new(1920, 1080),
            DisplaySpec::new(1280, 1024).at(1920, 0),
        ]);
        let mut env = VideoEnv::default();

        assert_eq!(resolve_display(&video, None, &env, None).unwrap(), 0);

        video.set_global_mouse(2000, 10);
        assert_eq!(resolve_display(&video, None, &env, None).unwrap(), 1);

        env.display = Some(0);
        assert_eq!(resolve_display(&video, None, &env, None).unwrap(), 0);

        assert_eq!(resolve_display(&video, Some(1), &env, None).unwrap(), 1);
        assert!(matches!(
            resolve_display(&video, Some(2), &env, None),
            Err(Error::Configuration(_))
        ));
    }
}
