// Platform abstraction layer for the native video and input library
//
// This module provides traits that abstract over the native multimedia
// library. The display controller and the event pipeline only ever talk
// to these traits, so the same state machines run against a real backend
// or the in-memory headless one used by tests.

use bitflags::bitflags;

use crate::error::NativeResult;
use crate::event::RawEvent;

// ============================================================================
// Handles
// ============================================================================

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);
    };
}

native_handle!(
    /// Native window handle
    WindowId
);
native_handle!(
    /// Native pixel surface handle
    SurfaceId
);
native_handle!(
    /// Native 2D renderer handle
    RendererId
);
native_handle!(
    /// Native streaming texture handle
    TextureId
);
native_handle!(
    /// Native OpenGL context handle
    GlContextId
);

// ============================================================================
// Geometry and window description
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && py >= self.y && px < self.x + self.w && py < self.y + self.h
    }
}

/// A display's current video mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    pub w: i32,
    pub h: i32,
    pub refresh_rate: i32,
}

/// One axis of a window position.
///
/// `Undefined` and `Centered` are relative to the given display index and
/// let the backend choose the concrete coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPos {
    Undefined(i32),
    Centered(i32),
    At(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenMode {
    Off,
    /// Borderless window covering the display, no video mode change
    Desktop,
    /// Exclusive fullscreen with a physical video mode change
    Exclusive,
}

bitflags! {
    /// Native window state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WindowFlags: u32 {
        const FULLSCREEN = 1 << 0;
        const OPENGL = 1 << 1;
        const SHOWN = 1 << 2;
        const HIDDEN = 1 << 3;
        const BORDERLESS = 1 << 4;
        const RESIZABLE = 1 << 5;
        const MINIMIZED = 1 << 6;
        const MAXIMIZED = 1 << 7;
        const INPUT_FOCUS = 1 << 9;
        const MOUSE_FOCUS = 1 << 10;
        const FULLSCREEN_DESKTOP = 1 << 12;
    }
}

impl WindowFlags {
    pub fn is_fullscreen(self) -> bool {
        self.intersects(Self::FULLSCREEN | Self::FULLSCREEN_DESKTOP)
    }

    pub fn fullscreen_mode(self) -> FullscreenMode {
        if self.contains(Self::FULLSCREEN_DESKTOP) {
            FullscreenMode::Desktop
        } else if self.contains(Self::FULLSCREEN) {
            FullscreenMode::Exclusive
        } else {
            FullscreenMode::Off
        }
    }
}

/// Everything needed to create a window in one native call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    pub title: String,
    pub x: WindowPos,
    pub y: WindowPos,
    pub w: i32,
    pub h: i32,
    pub flags: WindowFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Xrgb8888,
    Argb8888,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HintPriority {
    Default,
    Normal,
    Override,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlAttr {
    DoubleBuffer,
}

/// Window icon pixels, row-major ARGB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub w: u32,
    pub h: u32,
    pub pixels: Vec<u32>,
}

/// Red, green and blue translation tables.
pub type GammaRamp = [[u16; 256]; 3];

// ============================================================================
// Backend traits
// ============================================================================

/// Native video backend
///
/// Implementations handle:
/// - Subsystem init/quit, environment and hint lookup
/// - Display geometry queries
/// - Window creation, queries and in-place mutation
/// - Surfaces, the 2D renderer with its streaming texture, and GL contexts
///
/// Creation calls and the few mutations that can be refused by the window
/// system return `NativeResult`. Destroy calls are infallible.
pub trait VideoBackend {
    fn init(&mut self) -> NativeResult<()>;
    fn was_init(&self) -> bool;
    fn quit(&mut self);

    /// Read an environment variable as seen by the native library
    fn getenv(&self, name: &str) -> Option<String>;
    fn hint(&self, name: &str) -> Option<String>;
    /// Returns false if a hint with higher priority is already set
    fn set_hint(&mut self, name: &str, value: &str, priority: HintPriority) -> bool;

    fn num_displays(&self) -> NativeResult<i32>;
    fn display_bounds(&self, display: i32) -> NativeResult<Rect>;
    /// Display bounds minus space reserved by the system (docks, taskbars)
    fn display_usable_bounds(&self, display: i32) -> NativeResult<Rect>;
    fn desktop_mode(&self, display: i32) -> NativeResult<DisplayMode>;
    /// Mouse position in global desktop coordinates
    fn global_mouse_position(&self) -> (i32, i32);

    fn create_window(&mut self, spec: &WindowSpec) -> NativeResult<WindowId>;
    fn destroy_window(&mut self, window: WindowId);
    fn window_flags(&self, window: WindowId) -> WindowFlags;
    fn window_display_index(&self, window: WindowId) -> NativeResult<i32>;
    fn window_position(&self, window: WindowId) -> (i32, i32);
    fn window_size(&self, window: WindowId) -> (i32, i32);
    fn set_window_minimum_size(&mut self, window: WindowId, w: i32, h: i32);
    fn set_window_title(&mut self, window: WindowId, title: &str);
    fn set_window_size(&mut self, window: WindowId, w: i32, h: i32);
    fn set_window_resizable(&mut self, window: WindowId, resizable: bool);
    fn set_window_bordered(&mut self, window: WindowId, bordered: bool);
    fn show_window(&mut self, window: WindowId);
    fn hide_window(&mut self, window: WindowId);
    fn minimize_window(&mut self, window: WindowId);
    fn set_window_fullscreen(&mut self, window: WindowId, mode: FullscreenMode) -> NativeResult<()>;
    fn set_window_position(&mut self, window: WindowId, x: WindowPos, y: WindowPos) -> NativeResult<()>;
    fn set_window_icon(&mut self, window: WindowId, icon: &Icon);
    fn set_window_gamma_ramp(&mut self, window: WindowId, ramp: &GammaRamp) -> NativeResult<()>;

    /// The window-owned pixel surface; invalidated by size changes
    fn window_surface(&mut self, window: WindowId) -> NativeResult<SurfaceId>;
    fn update_window_surface(&mut self, window: WindowId) -> NativeResult<()>;

    fn create_surface(&mut self, w: i32, h: i32, format: PixelFormat) -> NativeResult<SurfaceId>;
    fn free_surface(&mut self, surface: SurfaceId);
    fn fill_surface(&mut self, surface: SurfaceId, color: u32) -> NativeResult<()>;

    fn create_renderer(&mut self, window: WindowId) -> NativeResult<RendererId>;
    fn destroy_renderer(&mut self, renderer: RendererId);
    fn renderer_set_integer_scale(&mut self, renderer: RendererId, enabled: bool) -> NativeResult<()>;
    fn renderer_set_logical_size(&mut self, renderer: RendererId, w: i32, h: i32) -> NativeResult<()>;
    fn create_texture(
        &mut self,
        renderer: RendererId,
        w: i32,
        h: i32,
        format: PixelFormat,
    ) -> NativeResult<TextureId>;
    fn destroy_texture(&mut self, texture: TextureId);
    /// Upload `surface` into `texture`, copy it to the render target and present
    fn present_surface(
        &mut self,
        renderer: RendererId,
        texture: TextureId,
        surface: SurfaceId,
    ) -> NativeResult<()>;

    fn gl_set_attribute(&mut self, attr: GlAttr, value: i32) -> NativeResult<()>;
    fn gl_create_context(&mut self, window: WindowId) -> NativeResult<GlContextId>;
    fn gl_delete_context(&mut self, context: GlContextId);
    fn gl_make_current(&mut self, window: WindowId, context: GlContextId) -> NativeResult<()>;
    fn gl_set_swap_interval(&mut self, interval: i32) -> NativeResult<()>;
    fn gl_viewport(&mut self, x: i32, y: i32, w: i32, h: i32);
    fn gl_swap_window(&mut self, window: WindowId);
}

/// Native input backend
///
/// Implementations handle:
/// - Collecting raw window, keyboard, mouse and joystick events
/// - Reporting the pointer position relative to the focused window
pub trait InputBackend {
    /// Poll for the next raw event
    ///
    /// Returns Some(RawEvent) if an event is available, None otherwise.
    /// This function should not block - it returns immediately
    fn poll_event(&mut self) -> Option<RawEvent>;

    /// Current pointer position in window coordinates
    fn pointer_position(&self) -> (i32, i32);
}

// Platform-specific implementations
pub mod headless;

#[cfg(target_os = "linux")]
pub mod linux;
