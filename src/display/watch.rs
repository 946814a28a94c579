// Resize watch: keeps the active render path in step with window resizes
//
// Runs for every raw window event while a resizable mode is set with
// auto-resize enabled. Events for windows other than the tracked one are
// ignored.

use tracing::{trace, warn};

use super::DisplayState;
use crate::config::quality_scaling_requested;
use crate::event::WindowEventKind;
use crate::platform::{VideoBackend, WindowId};

pub(crate) fn on_window_event<V: VideoBackend>(
    video: &mut V,
    state: &mut DisplayState,
    window: WindowId,
    kind: WindowEventKind,
    data1: i32,
    data2: i32,
) {
    if !state.resize_watch || state.window != Some(window) {
        return;
    }

    if let Some(renderer) = state.renderer {
        let integer_scale = match kind {
            WindowEventKind::Maximized => false,
            WindowEventKind::Restored => !quality_scaling_requested(video),
            _ => return,
        };
        trace!(window = window.0, integer_scale, "renderer scale updated");
        if let Err(e) = video.renderer_set_integer_scale(renderer, integer_scale) {
            warn!("Failed to update integer scaling: {}", e);
        }
        return;
    }

    if kind != WindowEventKind::SizeChanged {
        return;
    }

    if state.using_gl {
        let Some(context) = state.gl_context else {
            return;
        };
        if let Err(e) = video.gl_make_current(window, context) {
            warn!("Failed to make GL context current: {}", e);
            return;
        }
        let (x, y, w, h) = gl_viewport(state, data1, data2);
        video.gl_viewport(x, y, w, h);
        return;
    }

    match video.window_surface(window) {
        Ok(surface) => {
            if let Some(handle) = &state.surface {
                handle.rebind(video, surface, false, (data1, data2));
            }
        }
        Err(e) => warn!("Failed to fetch resized window surface: {}", e),
    }
}

/// Viewport for a resized GL window. Scaled GL keeps the logical aspect
/// ratio: pillarboxed and centered when the window is wider, anchored at
/// the origin when taller.
fn gl_viewport(state: &DisplayState, w: i32, h: i32) -> (i32, i32, i32, i32) {
    if !state.scaled_gl {
        return (0, 0, w, h);
    }
    let (logical_w, logical_h) = state.scaled_gl_size;
    let saved = logical_w as f64 / logical_h as f64;
    let window = w as f64 / h as f64;
    if window > saved {
        let width = (h as f64 * saved) as i32;
        ((w - width) / 2, 0, width, h)
    } else {
        (0, 0, w, (w as f64 / saved) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gl_viewport_letterbox() {
        let mut state = DisplayState::default();
        assert_eq!(gl_viewport(&state, 800, 600), (0, 0, 800, 600));

        state.scaled_gl = true;
        state.scaled_gl_size = (400, 300);
        assert_eq!(gl_viewport(&state, 1000, 600), (100, 0, 800, 600));
        assert_eq!(gl_viewport(&state, 800, 900), (0, 0, 800, 600));
    }
}
