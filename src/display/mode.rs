// set_mode: reconcile a mode request with the tracked window
//
// The request is validated first, then applied against the backend while
// recording every object created along the way. Only a fully configured
// result is committed into DisplayState; any failure destroys what the
// attempt created and leaves the previously tracked state in place.

use tracing::{debug, warn};

use super::placement::{initial_position, resolve_display, restore_position, scaled_window_size};
use super::{DisplayState, ModeFlags, ModeRequest, Surface};
use crate::config::{quality_scaling_requested, ForceScale, VideoEnv, HINT_RENDER_SCALE_QUALITY};
use crate::error::{Error, Result};
use crate::platform::{
    DisplayMode, FullscreenMode, GlAttr, GlContextId, HintPriority, PixelFormat, RendererId,
    SurfaceId, TextureId, VideoBackend, WindowFlags, WindowId, WindowPos, WindowSpec,
};

/// Objects created during one set_mode call
#[derive(Debug, Default)]
struct Attempt {
    window: Option<WindowId>,
    gl_context: Option<GlContextId>,
    renderer: Option<RendererId>,
    texture: Option<TextureId>,
    surface: Option<SurfaceId>,
    /// The tracked window, once it has been changed in place
    mutated: Option<WindowId>,
}

impl Attempt {
    fn rollback<V: VideoBackend>(self, video: &mut V) {
        if let Some(texture) = self.texture {
            video.destroy_texture(texture);
        }
        if let Some(renderer) = self.renderer {
            video.destroy_renderer(renderer);
        }
        if let Some(context) = self.gl_context {
            video.gl_delete_context(context);
        }
        if let Some(surface) = self.surface {
            video.free_surface(surface);
        }
        // never the tracked window: only freshly created ones are recorded
        if let Some(window) = self.window {
            video.destroy_window(window);
        }
    }
}

/// A fully built configuration waiting to be committed
#[derive(Debug)]
struct Configured {
    window: WindowId,
    abandoned: Option<WindowId>,
    surface: SurfaceId,
    surface_owned: bool,
    surface_size: (i32, i32),
    renderer: Option<RendererId>,
    texture: Option<TextureId>,
    gl_context: Option<GlContextId>,
    scaled_gl: bool,
    logical_size: (i32, i32),
    fullscreen_backup: Option<(WindowPos, WindowPos)>,
    resize_watch: bool,
}

pub(crate) fn set_mode<V: VideoBackend>(
    video: &mut V,
    state: &mut DisplayState,
    request: &ModeRequest,
) -> Result<Surface> {
    let (w, h) = request.size;
    if w < 0 || h < 0 {
        return Err(Error::config("Cannot set negative sized display mode"));
    }

    if !video.was_init() {
        video.init()?;
    }

    let env = VideoEnv::read(video);
    let mut flags = request.flags;
    if let Some(force) = env.force_scale {
        flags |= ModeFlags::SCALED;
        if force == ForceScale::Photo {
            video.set_hint(HINT_RENDER_SCALE_QUALITY, "best", HintPriority::Normal);
        }
    }

    if flags.contains(ModeFlags::SCALED) && (w == 0 || h == 0) {
        return Err(Error::config("Cannot set 0 sized SCALED display mode"));
    }

    let display = resolve_display(video, request.display, &env, state.window)?;
    let desktop = video.desktop_mode(display)?;
    let size = if w == 0 || h == 0 {
        (desktop.w, desktop.h)
    } else {
        (w, h)
    };

    if let Some(texture) = state.texture.take() {
        video.destroy_texture(texture);
    }
    if let Some(renderer) = state.renderer.take() {
        video.destroy_renderer(renderer);
    }
    state.resize_watch = false;

    let mut attempt = Attempt::default();
    match configure(video, state, flags, size, display, desktop, &env, &mut attempt) {
        Ok(configured) => Ok(commit(video, state, configured)),
        Err(e) => {
            warn!("set_mode({}x{}) failed, rolling back: {}", size.0, size.1, e);
            let mutated = attempt.mutated;
            attempt.rollback(video);
            if let Some(window) = mutated {
                resync_window(video, state, window);
            }
            Err(e)
        }
    }
}

/// Bring the tracked state back in line with a window that was changed in
/// place before the attempt failed.
///
/// A resize invalidates the window's native surface and the renderer is
/// already gone, so a software display falls back to the plain path on the
/// window's current surface. GL state survives as is. If the window has no
/// surface left the display is torn down to no window.
fn resync_window<V: VideoBackend>(video: &mut V, state: &mut DisplayState, window: WindowId) {
    if state.using_gl {
        return;
    }
    match video.window_surface(window) {
        Ok(surface) => {
            let size = video.window_size(window);
            match state.surface.clone() {
                Some(handle) => handle.rebind(video, surface, false, size),
                None => state.surface = Some(Surface::new(surface, false, size)),
            }
            state.scaled_gl = false;
            state.scaled_gl_size = (0, 0);
            state.resize_watch =
                state.auto_resize && video.window_flags(window).contains(WindowFlags::RESIZABLE);
            debug!(window = window.0, w = size.0, h = size.1, "window kept on plain surface");
        }
        Err(e) => {
            warn!("Window surface lost after failed mode change: {}", e);
            state.teardown(video);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn configure<V: VideoBackend>(
    video: &mut V,
    state: &DisplayState,
    flags: ModeFlags,
    size: (i32, i32),
    display: i32,
    desktop: DisplayMode,
    env: &VideoEnv,
    attempt: &mut Attempt,
) -> Result<Configured> {
    let (w, h) = size;
    let fullscreen = flags.contains(ModeFlags::FULLSCREEN);
    let scaled = flags.contains(ModeFlags::SCALED);
    let opengl = flags.contains(ModeFlags::OPENGL);
    let resizable = flags.contains(ModeFlags::RESIZABLE);
    let bordered = !flags.contains(ModeFlags::NOFRAME);
    let visible = !(flags.contains(ModeFlags::HIDDEN) && !flags.contains(ModeFlags::SHOWN));

    // ------------------------------------------------------------------
    // Native window flags
    // ------------------------------------------------------------------
    let fullscreen_mode = if !fullscreen {
        FullscreenMode::Off
    } else if scaled || (w, h) == (desktop.w, desktop.h) {
        FullscreenMode::Desktop
    } else {
        FullscreenMode::Exclusive
    };

    let mut window_flags = if visible {
        WindowFlags::SHOWN
    } else {
        WindowFlags::HIDDEN
    };
    window_flags.set(WindowFlags::OPENGL, opengl);
    window_flags.set(WindowFlags::BORDERLESS, !bordered);
    window_flags.set(WindowFlags::RESIZABLE, resizable);
    match fullscreen_mode {
        FullscreenMode::Desktop => window_flags.insert(WindowFlags::FULLSCREEN_DESKTOP),
        FullscreenMode::Exclusive => window_flags.insert(WindowFlags::FULLSCREEN),
        FullscreenMode::Off => {}
    }

    if opengl {
        // the attribute decides double buffering; DOUBLEBUF only feeds it
        let double_buffer = i32::from(flags.contains(ModeFlags::DOUBLEBUF));
        video.gl_set_attribute(GlAttr::DoubleBuffer, double_buffer)?;
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------
    let (mut x, mut y) = initial_position(env, display);
    let mut reuse = state.window;
    let mut abandoned = None;
    if let Some(window) = state.window {
        let current = video.window_flags(window);
        if video.window_display_index(window)? == display {
            (x, y) = if current.is_fullscreen() {
                restore_position(state.fullscreen_backup, display)
            } else {
                let (px, py) = video.window_position(window);
                (WindowPos::At(px), WindowPos::At(py))
            };
        }
        if current.contains(WindowFlags::OPENGL) != opengl {
            debug!(window = window.0, "OpenGL capability changed, replacing window");
            abandoned = Some(window);
            reuse = None;
        }
    }

    let scaled_gl = opengl && scaled;
    let (mut win_w, mut win_h) = (w, h);
    if scaled && !fullscreen {
        let usable = video.display_usable_bounds(display)?;
        let fractional = scaled_gl || quality_scaling_requested(video);
        (win_w, win_h) = scaled_window_size(usable, (w, h), fractional);
    }

    // ------------------------------------------------------------------
    // Create or mutate the window
    // ------------------------------------------------------------------
    let window = match reuse {
        None => {
            let window = video.create_window(&WindowSpec {
                title: state.title.clone(),
                x,
                y,
                w: win_w,
                h: win_h,
                flags: window_flags,
            })?;
            attempt.window = Some(window);
            window
        }
        Some(window) => {
            attempt.mutated = Some(window);
            video.set_window_minimum_size(window, 1, 1);
            video.set_window_title(window, &state.title);
            video.set_window_size(window, win_w, win_h);
            video.set_window_resizable(window, resizable);
            video.set_window_bordered(window, bordered);
            if visible {
                video.show_window(window);
            } else {
                video.hide_window(window);
            }
            video.set_window_fullscreen(window, fullscreen_mode)?;
            video.set_window_position(window, x, y)?;
            window
        }
    };
    let window_is_new = attempt.window.is_some();

    let fullscreen_backup = (fullscreen_mode != FullscreenMode::Off).then_some((x, y));

    // ------------------------------------------------------------------
    // Render path
    // ------------------------------------------------------------------
    let mut renderer = None;
    let mut texture = None;
    let mut gl_context = None;
    let surface;
    let surface_owned;
    let surface_size;

    if opengl {
        let context = match state.gl_context {
            Some(context) if !window_is_new => {
                video.gl_make_current(window, context)?;
                context
            }
            _ => {
                let context = video.gl_create_context(window)?;
                attempt.gl_context = Some(context);
                context
            }
        };
        gl_context = Some(context);

        // GL windows have no native surface; hand out a shadow buffer
        let reusable = state
            .surface
            .as_ref()
            .filter(|s| attempt.gl_context.is_none() && s.is_owned() && s.size() == (w, h))
            .and_then(Surface::id);
        surface = match reusable {
            Some(id) => id,
            None => {
                let id = video.create_surface(w, h, PixelFormat::Xrgb8888)?;
                attempt.surface = Some(id);
                id
            }
        };
        surface_owned = true;
        surface_size = (w, h);

        if let Err(e) = video.gl_set_swap_interval(0) {
            warn!("Unable to set swap interval: {}", e);
        }
    } else if scaled {
        video.set_hint(HINT_RENDER_SCALE_QUALITY, "nearest", HintPriority::Default);
        let created = video.create_renderer(window)?;
        attempt.renderer = Some(created);
        renderer = Some(created);

        let integer_scale = !(fullscreen || quality_scaling_requested(video));
        video.renderer_set_integer_scale(created, integer_scale)?;
        video.renderer_set_logical_size(created, w, h)?;

        let streaming = video.create_texture(created, w, h, PixelFormat::Argb8888)?;
        attempt.texture = Some(streaming);
        texture = Some(streaming);

        let shadow = video.create_surface(w, h, PixelFormat::Xrgb8888)?;
        attempt.surface = Some(shadow);
        surface = shadow;
        surface_owned = true;
        surface_size = (w, h);
    } else {
        surface = video.window_surface(window)?;
        surface_owned = false;
        surface_size = video.window_size(window);
    }

    if let Some(ramp) = state.gamma_ramp.as_deref() {
        video.set_window_gamma_ramp(window, ramp)?;
    }

    if gl_context.is_some() && renderer.is_some() {
        return Err(Error::config(
            "GL context and renderer created at the same time",
        ));
    }

    video.fill_surface(surface, 0)?;

    Ok(Configured {
        window,
        abandoned,
        surface,
        surface_owned,
        surface_size,
        renderer,
        texture,
        gl_context,
        scaled_gl,
        logical_size: (w, h),
        fullscreen_backup,
        resize_watch: resizable && state.auto_resize,
    })
}

fn commit<V: VideoBackend>(video: &mut V, state: &mut DisplayState, c: Configured) -> Surface {
    if let Some(old) = state.gl_context.take() {
        if Some(old) != c.gl_context {
            video.gl_delete_context(old);
        }
    }

    let surface = match state.surface.clone() {
        Some(surface) => {
            surface.rebind(video, c.surface, c.surface_owned, c.surface_size);
            surface
        }
        None => {
            let surface = Surface::new(c.surface, c.surface_owned, c.surface_size);
            state.surface = Some(surface.clone());
            surface
        }
    };

    if let Some(old) = c.abandoned {
        video.destroy_window(old);
    }

    state.window = Some(c.window);
    state.renderer = c.renderer;
    state.texture = c.texture;
    state.gl_context = c.gl_context;
    state.using_gl = c.gl_context.is_some();
    state.scaled_gl = c.scaled_gl;
    state.scaled_gl_size = if c.scaled_gl { c.logical_size } else { (0, 0) };
    state.resize_watch = c.resize_watch;
    if let Some(backup) = c.fullscreen_backup {
        state.fullscreen_backup = Some(backup);
    }

    if let Some(icon) = &state.icon {
        video.set_window_icon(c.window, icon);
    }

    debug!(
        window = c.window.0,
        w = c.logical_size.0,
        h = c.logical_size.1,
        gl = state.using_gl,
        scaled = state.renderer.is_some() || state.scaled_gl,
        "display mode set"
    );
    surface
}
