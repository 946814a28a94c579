// In-memory video and input backend
//
// Simulates displays, windows, surfaces, renderers and GL contexts without
// touching any hardware. Every call is logged, any call can be made to fail
// once, and window-system events land in an inbox shared with
// `HeadlessInput`.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use tracing::trace;

use crate::error::{NativeError, NativeResult};
use crate::event::{RawEvent, WindowEventKind};
use crate::platform::{
    DisplayMode, FullscreenMode, GammaRamp, GlAttr, GlContextId, HintPriority, Icon,
    InputBackend, PixelFormat, Rect, RendererId, SurfaceId, TextureId, VideoBackend, WindowFlags,
    WindowId, WindowPos, WindowSpec,
};

// ============================================================================
// Simulated objects
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySpec {
    pub name: String,
    pub bounds: Rect,
    pub usable: Rect,
    pub refresh_rate: i32,
}

impl DisplaySpec {
    /// A display at the desktop origin with a 40 pixel taskbar at the bottom
    pub fn new(w: i32, h: i32) -> Self {
        Self {
            name: format!("headless {}x{}", w, h),
            bounds: Rect::new(0, 0, w, h),
            usable: Rect::new(0, 0, w, (h - 40).max(0)),
            refresh_rate: 60,
        }
    }

    /// Move the display to `(x, y)` in desktop coordinates
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.usable.x += x - self.bounds.x;
        self.usable.y += y - self.bounds.y;
        self.bounds.x = x;
        self.bounds.y = y;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    pub title: String,
    pub flags: WindowFlags,
    /// Windowed position, kept while fullscreen
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub min_size: (i32, i32),
    pub display: i32,
    pub icon: Option<Icon>,
    pub gamma: Option<Box<GammaRamp>>,
    surface: Option<SurfaceId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessSurface {
    pub w: i32,
    pub h: i32,
    pub format: PixelFormat,
    pub fill: Option<u32>,
    pub window: Option<WindowId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessRenderer {
    pub window: WindowId,
    pub integer_scale: bool,
    pub logical_size: (i32, i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessTexture {
    pub renderer: RendererId,
    pub w: i32,
    pub h: i32,
    pub format: PixelFormat,
}

// ============================================================================
// Video backend
// ============================================================================

pub struct HeadlessVideo {
    initialized: bool,
    displays: Vec<DisplaySpec>,
    env: HashMap<String, String>,
    hints: HashMap<String, (String, HintPriority)>,
    mouse: (i32, i32),
    next_id: u32,
    windows: BTreeMap<WindowId, HeadlessWindow>,
    surfaces: BTreeMap<SurfaceId, HeadlessSurface>,
    renderers: BTreeMap<RendererId, HeadlessRenderer>,
    textures: BTreeMap<TextureId, HeadlessTexture>,
    gl_contexts: BTreeMap<GlContextId, WindowId>,
    gl_attrs: HashMap<GlAttr, i32>,
    current_gl: Option<(WindowId, GlContextId)>,
    swap_interval: i32,
    viewport: Option<Rect>,
    presents: usize,
    swaps: usize,
    surface_updates: usize,
    calls: RefCell<Vec<&'static str>>,
    fail_next: RefCell<HashSet<&'static str>>,
    inbox: Rc<RefCell<VecDeque<RawEvent>>>,
    pointer: Rc<Cell<(i32, i32)>>,
}

impl Default for HeadlessVideo {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessVideo {
    /// One 1920x1080 display
    pub fn new() -> Self {
        Self::with_displays(vec![DisplaySpec::new(1920, 1080)])
    }

    pub fn with_displays(displays: Vec<DisplaySpec>) -> Self {
        let displays = if displays.is_empty() {
            vec![DisplaySpec::new(1920, 1080)]
        } else {
            displays
        };
        Self {
            initialized: false,
            displays,
            env: HashMap::new(),
            hints: HashMap::new(),
            mouse: (0, 0),
            next_id: 1,
            windows: BTreeMap::new(),
            surfaces: BTreeMap::new(),
            renderers: BTreeMap::new(),
            textures: BTreeMap::new(),
            gl_contexts: BTreeMap::new(),
            gl_attrs: HashMap::new(),
            current_gl: None,
            swap_interval: 1,
            viewport: None,
            presents: 0,
            swaps: 0,
            surface_updates: 0,
            calls: RefCell::new(Vec::new()),
            fail_next: RefCell::new(HashSet::new()),
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            pointer: Rc::new(Cell::new((0, 0))),
        }
    }

    /// Input backend reading this backend's event inbox
    pub fn input(&self) -> HeadlessInput {
        HeadlessInput {
            inbox: Rc::clone(&self.inbox),
            pointer: Rc::clone(&self.pointer),
        }
    }

    // ========================================================================
    // Test controls
    // ========================================================================

    pub fn set_env(&mut self, name: &str, value: &str) {
        self.env.insert(name.to_owned(), value.to_owned());
    }

    pub fn remove_env(&mut self, name: &str) {
        self.env.remove(name);
    }

    pub fn set_global_mouse(&mut self, x: i32, y: i32) {
        self.mouse = (x, y);
    }

    /// Make the next call to `op` fail with a native error
    pub fn fail_on(&mut self, op: &'static str) {
        self.fail_next.borrow_mut().insert(op);
    }

    pub fn push_event(&mut self, event: RawEvent) {
        self.inbox.borrow_mut().push_back(event);
    }

    /// Resize as if the user dragged the window border
    pub fn resize_by_user(&mut self, window: WindowId, w: i32, h: i32) {
        if self.apply_size(window, w, h) {
            self.emit(window, WindowEventKind::Resized, w, h);
            self.emit(window, WindowEventKind::SizeChanged, w, h);
        }
    }

    /// Move as if the user dragged the title bar
    pub fn move_by_user(&mut self, window: WindowId, x: i32, y: i32) {
        if let Some(win) = self.windows.get_mut(&window) {
            win.x = x;
            win.y = y;
        }
        self.update_display(window);
        self.emit(window, WindowEventKind::Moved, x, y);
    }

    pub fn maximize_by_user(&mut self, window: WindowId) {
        if let Some(win) = self.windows.get_mut(&window) {
            win.flags.insert(WindowFlags::MAXIMIZED);
            win.flags.remove(WindowFlags::MINIMIZED);
        }
        self.emit(window, WindowEventKind::Maximized, 0, 0);
    }

    pub fn restore_by_user(&mut self, window: WindowId) {
        if let Some(win) = self.windows.get_mut(&window) {
            win.flags.remove(WindowFlags::MAXIMIZED | WindowFlags::MINIMIZED);
        }
        self.emit(window, WindowEventKind::Restored, 0, 0);
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls.borrow().iter().filter(|c| **c == op).count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.borrow_mut().clear();
    }

    /// Windows, surfaces, renderers, textures and GL contexts still alive
    pub fn live_objects(&self) -> usize {
        self.windows.len()
            + self.surfaces.len()
            + self.renderers.len()
            + self.textures.len()
            + self.gl_contexts.len()
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn window(&self, window: WindowId) -> Option<&HeadlessWindow> {
        self.windows.get(&window)
    }

    pub fn surface(&self, surface: SurfaceId) -> Option<&HeadlessSurface> {
        self.surfaces.get(&surface)
    }

    pub fn renderer(&self, renderer: RendererId) -> Option<&HeadlessRenderer> {
        self.renderers.get(&renderer)
    }

    pub fn texture(&self, texture: TextureId) -> Option<&HeadlessTexture> {
        self.textures.get(&texture)
    }

    pub fn gl_context_count(&self) -> usize {
        self.gl_contexts.len()
    }

    pub fn gl_attribute(&self, attr: GlAttr) -> Option<i32> {
        self.gl_attrs.get(&attr).copied()
    }

    pub fn current_gl(&self) -> Option<(WindowId, GlContextId)> {
        self.current_gl
    }

    pub fn swap_interval(&self) -> i32 {
        self.swap_interval
    }

    pub fn viewport(&self) -> Option<Rect> {
        self.viewport
    }

    pub fn presents(&self) -> usize {
        self.presents
    }

    pub fn swaps(&self) -> usize {
        self.swaps
    }

    pub fn surface_updates(&self) -> usize {
        self.surface_updates
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn check(&self, op: &'static str) -> NativeResult<()> {
        self.calls.borrow_mut().push(op);
        if self.fail_next.borrow_mut().remove(op) {
            trace!(op, "injected native failure");
            return Err(NativeError::new(format!("{} failed", op)));
        }
        Ok(())
    }

    fn log(&self, op: &'static str) {
        self.calls.borrow_mut().push(op);
    }

    fn alloc(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn emit(&self, window: WindowId, event: WindowEventKind, data1: i32, data2: i32) {
        self.inbox.borrow_mut().push_back(RawEvent::Window {
            window,
            event,
            data1,
            data2,
        });
    }

    fn bounds(&self, display: i32) -> NativeResult<&DisplaySpec> {
        usize::try_from(display)
            .ok()
            .and_then(|index| self.displays.get(index))
            .ok_or_else(|| {
                NativeError::new(format!(
                    "displayIndex must be in the range 0 - {}",
                    self.displays.len() as i32 - 1
                ))
            })
    }

    fn resolve_axis(&self, pos: WindowPos, size: i32, vertical: bool) -> i32 {
        let origin_and_extent = |display: i32| {
            let bounds = self
                .bounds(display)
                .map(|d| d.bounds)
                .unwrap_or_else(|_| self.displays[0].bounds);
            if vertical {
                (bounds.y, bounds.h)
            } else {
                (bounds.x, bounds.w)
            }
        };
        match pos {
            WindowPos::At(v) => v,
            WindowPos::Undefined(display) => origin_and_extent(display).0,
            WindowPos::Centered(display) => {
                let (origin, extent) = origin_and_extent(display);
                origin + (extent - size) / 2
            }
        }
    }

    fn display_at(&self, x: i32, y: i32) -> Option<i32> {
        self.displays
            .iter()
            .position(|d| d.bounds.contains(x, y))
            .map(|index| index as i32)
    }

    fn update_display(&mut self, window: WindowId) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        if win.flags.is_fullscreen() {
            return;
        }
        if let Some(display) = self.display_at(win.x + win.w / 2, win.y + win.h / 2) {
            if let Some(win) = self.windows.get_mut(&window) {
                win.display = display;
            }
        }
    }

    /// Returns true if the size actually changed
    fn apply_size(&mut self, window: WindowId, w: i32, h: i32) -> bool {
        let stale = match self.windows.get_mut(&window) {
            Some(win) if (win.w, win.h) != (w, h) => {
                win.w = w.max(win.min_size.0);
                win.h = h.max(win.min_size.1);
                win.surface.take()
            }
            _ => return false,
        };
        if let Some(surface) = stale {
            self.surfaces.remove(&surface);
        }
        true
    }

    fn effective_size(&self, win: &HeadlessWindow) -> (i32, i32) {
        match win.flags.fullscreen_mode() {
            FullscreenMode::Desktop => self
                .bounds(win.display)
                .map(|d| (d.bounds.w, d.bounds.h))
                .unwrap_or((win.w, win.h)),
            _ => (win.w, win.h),
        }
    }
}

impl VideoBackend for HeadlessVideo {
    fn init(&mut self) -> NativeResult<()> {
        self.check("init")?;
        self.initialized = true;
        Ok(())
    }

    fn was_init(&self) -> bool {
        self.initialized
    }

    fn quit(&mut self) {
        self.log("quit");
        self.initialized = false;
    }

    fn getenv(&self, name: &str) -> Option<String> {
        self.log("getenv");
        self.env.get(name).cloned()
    }

    fn hint(&self, name: &str) -> Option<String> {
        self.log("hint");
        self.hints.get(name).map(|(value, _)| value.clone())
    }

    fn set_hint(&mut self, name: &str, value: &str, priority: HintPriority) -> bool {
        self.log("set_hint");
        match self.hints.get(name) {
            Some((_, existing)) if *existing > priority => false,
            _ => {
                self.hints
                    .insert(name.to_owned(), (value.to_owned(), priority));
                true
            }
        }
    }

    fn num_displays(&self) -> NativeResult<i32> {
        self.check("num_displays")?;
        Ok(self.displays.len() as i32)
    }

    fn display_bounds(&self, display: i32) -> NativeResult<Rect> {
        self.check("display_bounds")?;
        Ok(self.bounds(display)?.bounds)
    }

    fn display_usable_bounds(&self, display: i32) -> NativeResult<Rect> {
        self.check("display_usable_bounds")?;
        Ok(self.bounds(display)?.usable)
    }

    fn desktop_mode(&self, display: i32) -> NativeResult<DisplayMode> {
        self.check("desktop_mode")?;
        let spec = self.bounds(display)?;
        Ok(DisplayMode {
            w: spec.bounds.w,
            h: spec.bounds.h,
            refresh_rate: spec.refresh_rate,
        })
    }

    fn global_mouse_position(&self) -> (i32, i32) {
        self.log("global_mouse_position");
        self.mouse
    }

    fn create_window(&mut self, spec: &WindowSpec) -> NativeResult<WindowId> {
        self.check("create_window")?;
        if !self.initialized {
            return Err(NativeError::new("Video subsystem has not been initialized"));
        }
        let x = self.resolve_axis(spec.x, spec.w, false);
        let y = self.resolve_axis(spec.y, spec.h, true);
        let display = match spec.x {
            WindowPos::Undefined(d) | WindowPos::Centered(d) => d,
            WindowPos::At(_) => self.display_at(x + spec.w / 2, y + spec.h / 2).unwrap_or(0),
        };
        let id = WindowId(self.alloc());
        self.windows.insert(
            id,
            HeadlessWindow {
                title: spec.title.clone(),
                flags: spec.flags,
                x,
                y,
                w: spec.w.max(1),
                h: spec.h.max(1),
                min_size: (0, 0),
                display,
                icon: None,
                gamma: None,
                surface: None,
            },
        );
        if spec.flags.contains(WindowFlags::SHOWN) {
            self.emit(id, WindowEventKind::Shown, 0, 0);
        }
        trace!(window = id.0, x, y, w = spec.w, h = spec.h, "headless window created");
        Ok(id)
    }

    fn destroy_window(&mut self, window: WindowId) {
        self.log("destroy_window");
        if let Some(win) = self.windows.remove(&window) {
            if let Some(surface) = win.surface {
                self.surfaces.remove(&surface);
            }
        }
        if matches!(self.current_gl, Some((w, _)) if w == window) {
            self.current_gl = None;
        }
    }

    fn window_flags(&self, window: WindowId) -> WindowFlags {
        self.log("window_flags");
        self.windows
            .get(&window)
            .map(|win| win.flags)
            .unwrap_or(WindowFlags::empty())
    }

    fn window_display_index(&self, window: WindowId) -> NativeResult<i32> {
        self.check("window_display_index")?;
        self.windows
            .get(&window)
            .map(|win| win.display)
            .ok_or_else(|| NativeError::new("Invalid window"))
    }

    fn window_position(&self, window: WindowId) -> (i32, i32) {
        self.log("window_position");
        match self.windows.get(&window) {
            Some(win) if win.flags.is_fullscreen() => self
                .bounds(win.display)
                .map(|d| (d.bounds.x, d.bounds.y))
                .unwrap_or((0, 0)),
            Some(win) => (win.x, win.y),
            None => (0, 0),
        }
    }

    fn window_size(&self, window: WindowId) -> (i32, i32) {
        self.log("window_size");
        self.windows
            .get(&window)
            .map(|win| self.effective_size(win))
            .unwrap_or((0, 0))
    }

    fn set_window_minimum_size(&mut self, window: WindowId, w: i32, h: i32) {
        self.log("set_window_minimum_size");
        if let Some(win) = self.windows.get_mut(&window) {
            win.min_size = (w, h);
        }
    }

    fn set_window_title(&mut self, window: WindowId, title: &str) {
        self.log("set_window_title");
        if let Some(win) = self.windows.get_mut(&window) {
            win.title = title.to_owned();
        }
    }

    fn set_window_size(&mut self, window: WindowId, w: i32, h: i32) {
        self.log("set_window_size");
        if self.apply_size(window, w, h) {
            self.emit(window, WindowEventKind::SizeChanged, w, h);
        }
    }

    fn set_window_resizable(&mut self, window: WindowId, resizable: bool) {
        self.log("set_window_resizable");
        if let Some(win) = self.windows.get_mut(&window) {
            win.flags.set(WindowFlags::RESIZABLE, resizable);
        }
    }

    fn set_window_bordered(&mut self, window: WindowId, bordered: bool) {
        self.log("set_window_bordered");
        if let Some(win) = self.windows.get_mut(&window) {
            win.flags.set(WindowFlags::BORDERLESS, !bordered);
        }
    }

    fn show_window(&mut self, window: WindowId) {
        self.log("show_window");
        let changed = match self.windows.get_mut(&window) {
            Some(win) if !win.flags.contains(WindowFlags::SHOWN) => {
                win.flags.insert(WindowFlags::SHOWN);
                win.flags.remove(WindowFlags::HIDDEN);
                true
            }
            _ => false,
        };
        if changed {
            self.emit(window, WindowEventKind::Shown, 0, 0);
        }
    }

    fn hide_window(&mut self, window: WindowId) {
        self.log("hide_window");
        let changed = match self.windows.get_mut(&window) {
            Some(win) if !win.flags.contains(WindowFlags::HIDDEN) => {
                win.flags.insert(WindowFlags::HIDDEN);
                win.flags.remove(WindowFlags::SHOWN);
                true
            }
            _ => false,
        };
        if changed {
            self.emit(window, WindowEventKind::Hidden, 0, 0);
        }
    }

    fn minimize_window(&mut self, window: WindowId) {
        self.log("minimize_window");
        if let Some(win) = self.windows.get_mut(&window) {
            win.flags.insert(WindowFlags::MINIMIZED);
            self.emit(window, WindowEventKind::Minimized, 0, 0);
        }
    }

    fn set_window_fullscreen(&mut self, window: WindowId, mode: FullscreenMode) -> NativeResult<()> {
        self.check("set_window_fullscreen")?;
        let win = self
            .windows
            .get_mut(&window)
            .ok_or_else(|| NativeError::new("Invalid window"))?;
        win.flags
            .remove(WindowFlags::FULLSCREEN | WindowFlags::FULLSCREEN_DESKTOP);
        match mode {
            FullscreenMode::Off => {}
            FullscreenMode::Desktop => win.flags.insert(WindowFlags::FULLSCREEN_DESKTOP),
            FullscreenMode::Exclusive => win.flags.insert(WindowFlags::FULLSCREEN),
        }
        Ok(())
    }

    fn set_window_position(&mut self, window: WindowId, x: WindowPos, y: WindowPos) -> NativeResult<()> {
        self.check("set_window_position")?;
        let (w, h) = self
            .windows
            .get(&window)
            .map(|win| (win.w, win.h))
            .ok_or_else(|| NativeError::new("Invalid window"))?;
        let px = self.resolve_axis(x, w, false);
        let py = self.resolve_axis(y, h, true);
        if let Some(win) = self.windows.get_mut(&window) {
            win.x = px;
            win.y = py;
            if let WindowPos::Undefined(d) | WindowPos::Centered(d) = x {
                win.display = d;
            }
        }
        if matches!(x, WindowPos::At(_)) {
            self.update_display(window);
        }
        Ok(())
    }

    fn set_window_icon(&mut self, window: WindowId, icon: &Icon) {
        self.log("set_window_icon");
        if let Some(win) = self.windows.get_mut(&window) {
            win.icon = Some(icon.clone());
        }
    }

    fn set_window_gamma_ramp(&mut self, window: WindowId, ramp: &GammaRamp) -> NativeResult<()> {
        self.check("set_window_gamma_ramp")?;
        let win = self
            .windows
            .get_mut(&window)
            .ok_or_else(|| NativeError::new("Invalid window"))?;
        win.gamma = Some(Box::new(*ramp));
        Ok(())
    }

    fn window_surface(&mut self, window: WindowId) -> NativeResult<SurfaceId> {
        self.check("window_surface")?;
        let win = self
            .windows
            .get(&window)
            .ok_or_else(|| NativeError::new("Invalid window"))?;
        if let Some(surface) = win.surface {
            return Ok(surface);
        }
        let (w, h) = self.effective_size(win);
        let id = SurfaceId(self.alloc());
        self.surfaces.insert(
            id,
            HeadlessSurface {
                w,
                h,
                format: PixelFormat::Xrgb8888,
                fill: None,
                window: Some(window),
            },
        );
        if let Some(win) = self.windows.get_mut(&window) {
            win.surface = Some(id);
        }
        Ok(id)
    }

    fn update_window_surface(&mut self, window: WindowId) -> NativeResult<()> {
        self.check("update_window_surface")?;
        if !self.windows.contains_key(&window) {
            return Err(NativeError::new("Invalid window"));
        }
        self.surface_updates += 1;
        Ok(())
    }

    fn create_surface(&mut self, w: i32, h: i32, format: PixelFormat) -> NativeResult<SurfaceId> {
        self.check("create_surface")?;
        let id = SurfaceId(self.alloc());
        self.surfaces.insert(
            id,
            HeadlessSurface {
                w,
                h,
                format,
                fill: None,
                window: None,
            },
        );
        Ok(id)
    }

    fn free_surface(&mut self, surface: SurfaceId) {
        self.log("free_surface");
        self.surfaces.remove(&surface);
    }

    fn fill_surface(&mut self, surface: SurfaceId, color: u32) -> NativeResult<()> {
        self.check("fill_surface")?;
        let surf = self
            .surfaces
            .get_mut(&surface)
            .ok_or_else(|| NativeError::new("Invalid surface"))?;
        surf.fill = Some(color);
        Ok(())
    }

    fn create_renderer(&mut self, window: WindowId) -> NativeResult<RendererId> {
        self.check("create_renderer")?;
        if !self.windows.contains_key(&window) {
            return Err(NativeError::new("Invalid window"));
        }
        if self.renderers.values().any(|r| r.window == window) {
            return Err(NativeError::new("Renderer already associated with window"));
        }
        let id = RendererId(self.alloc());
        self.renderers.insert(
            id,
            HeadlessRenderer {
                window,
                integer_scale: false,
                logical_size: (0, 0),
            },
        );
        Ok(id)
    }

    fn destroy_renderer(&mut self, renderer: RendererId) {
        self.log("destroy_renderer");
        self.renderers.remove(&renderer);
        self.textures.retain(|_, t| t.renderer != renderer);
    }

    fn renderer_set_integer_scale(&mut self, renderer: RendererId, enabled: bool) -> NativeResult<()> {
        self.check("renderer_set_integer_scale")?;
        let r = self
            .renderers
            .get_mut(&renderer)
            .ok_or_else(|| NativeError::new("Invalid renderer"))?;
        r.integer_scale = enabled;
        Ok(())
    }

    fn renderer_set_logical_size(&mut self, renderer: RendererId, w: i32, h: i32) -> NativeResult<()> {
        self.check("renderer_set_logical_size")?;
        let r = self
            .renderers
            .get_mut(&renderer)
            .ok_or_else(|| NativeError::new("Invalid renderer"))?;
        r.logical_size = (w, h);
        Ok(())
    }

    fn create_texture(
        &mut self,
        renderer: RendererId,
        w: i32,
        h: i32,
        format: PixelFormat,
    ) -> NativeResult<TextureId> {
        self.check("create_texture")?;
        if !self.renderers.contains_key(&renderer) {
            return Err(NativeError::new("Invalid renderer"));
        }
        let id = TextureId(self.alloc());
        self.textures.insert(
            id,
            HeadlessTexture {
                renderer,
                w,
                h,
                format,
            },
        );
        Ok(id)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.log("destroy_texture");
        self.textures.remove(&texture);
    }

    fn present_surface(
        &mut self,
        renderer: RendererId,
        texture: TextureId,
        surface: SurfaceId,
    ) -> NativeResult<()> {
        self.check("present_surface")?;
        if !self.renderers.contains_key(&renderer)
            || !self.textures.contains_key(&texture)
            || !self.surfaces.contains_key(&surface)
        {
            return Err(NativeError::new("Invalid render target"));
        }
        self.presents += 1;
        Ok(())
    }

    fn gl_set_attribute(&mut self, attr: GlAttr, value: i32) -> NativeResult<()> {
        self.check("gl_set_attribute")?;
        self.gl_attrs.insert(attr, value);
        Ok(())
    }

    fn gl_create_context(&mut self, window: WindowId) -> NativeResult<GlContextId> {
        self.check("gl_create_context")?;
        let win = self
            .windows
            .get(&window)
            .ok_or_else(|| NativeError::new("Invalid window"))?;
        if !win.flags.contains(WindowFlags::OPENGL) {
            return Err(NativeError::new(
                "The specified window isn't an OpenGL window",
            ));
        }
        let id = GlContextId(self.alloc());
        self.gl_contexts.insert(id, window);
        self.current_gl = Some((window, id));
        Ok(id)
    }

    fn gl_delete_context(&mut self, context: GlContextId) {
        self.log("gl_delete_context");
        self.gl_contexts.remove(&context);
        if matches!(self.current_gl, Some((_, c)) if c == context) {
            self.current_gl = None;
        }
    }

    fn gl_make_current(&mut self, window: WindowId, context: GlContextId) -> NativeResult<()> {
        self.check("gl_make_current")?;
        if !self.gl_contexts.contains_key(&context) || !self.windows.contains_key(&window) {
            return Err(NativeError::new("Invalid GL context or window"));
        }
        self.current_gl = Some((window, context));
        Ok(())
    }

    fn gl_set_swap_interval(&mut self, interval: i32) -> NativeResult<()> {
        self.check("gl_set_swap_interval")?;
        if self.current_gl.is_none() {
            return Err(NativeError::new("No OpenGL context has been made current"));
        }
        self.swap_interval = interval;
        Ok(())
    }

    fn gl_viewport(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.log("gl_viewport");
        self.viewport = Some(Rect::new(x, y, w, h));
    }

    fn gl_swap_window(&mut self, window: WindowId) {
        self.log("gl_swap_window");
        if self.windows.contains_key(&window) {
            self.swaps += 1;
        }
    }
}

// ============================================================================
// Input backend
// ============================================================================

/// Reads events queued by `HeadlessVideo` or injected by tests
pub struct HeadlessInput {
    inbox: Rc<RefCell<VecDeque<RawEvent>>>,
    pointer: Rc<Cell<(i32, i32)>>,
}

impl HeadlessInput {
    pub fn inject(&mut self, event: RawEvent) {
        self.inbox.borrow_mut().push_back(event);
    }

    pub fn set_pointer(&mut self, x: i32, y: i32) {
        self.pointer.set((x, y));
    }

    pub fn pending(&self) -> usize {
        self.inbox.borrow().len()
    }
}

impl InputBackend for HeadlessInput {
    fn poll_event(&mut self) -> Option<RawEvent> {
        let event = self.inbox.borrow_mut().pop_front()?;
        if let RawEvent::MouseMotion(motion) = &event {
            self.pointer.set((motion.x, motion.y));
        }
        Some(event)
    }

    fn pointer_position(&self) -> (i32, i32) {
        self.pointer.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(flags: WindowFlags) -> WindowSpec {
        WindowSpec {
            title: "t".to_string(),
            x: WindowPos::Centered(0),
            y: WindowPos::Centered(0),
            w: 640,
            h: 480,
            flags,
        }
    }

    #[test]
    fn test_create_requires_init() {
        let mut video = HeadlessVideo::new();
        assert!(video.create_window(&spec(WindowFlags::SHOWN)).is_err());
        video.init().unwrap();
        let window = video.create_window(&spec(WindowFlags::SHOWN)).unwrap();
        assert_eq!(video.window_position(window), (640, 300));
        assert_eq!(video.live_objects(), 1);
    }

    #[test]
    fn test_fail_on_is_one_shot() {
        let mut video = HeadlessVideo::new();
        video.fail_on("init");
        assert!(video.init().is_err());
        assert!(video.init().is_ok());
        assert_eq!(video.call_count("init"), 2);
    }

    #[test]
    fn test_size_change_invalidates_window_surface() {
        let mut video = HeadlessVideo::new();
        video.init().unwrap();
        let mut input = video.input();
        let window = video.create_window(&spec(WindowFlags::SHOWN)).unwrap();
        let first = video.window_surface(window).unwrap();
        assert_eq!(video.window_surface(window).unwrap(), first);

        video.set_window_size(window, 800, 600);
        let second = video.window_surface(window).unwrap();
        assert_ne!(first, second);
        assert!(video.surface(first).is_none());
        assert_eq!(video.surface(second).map(|s| (s.w, s.h)), Some((800, 600)));

        assert!(matches!(
            input.poll_event(),
            Some(RawEvent::Window { event: WindowEventKind::Shown, .. })
        ));
        assert!(matches!(
            input.poll_event(),
            Some(RawEvent::Window { event: WindowEventKind::SizeChanged, data1: 800, .. })
        ));
        assert!(input.poll_event().is_none());
    }

    #[test]
    fn test_fullscreen_reports_display_origin() {
        let mut video =
            HeadlessVideo::with_displays(vec![DisplaySpec::new(1920, 1080), DisplaySpec::new(1280, 720).at(1920, 0)]);
        video.init().unwrap();
        let window = video.create_window(&spec(WindowFlags::SHOWN)).unwrap();
        video
            .set_window_position(window, WindowPos::At(2000), WindowPos::At(100))
            .unwrap();
        assert_eq!(video.window_display_index(window).unwrap(), 1);

        video
            .set_window_fullscreen(window, FullscreenMode::Desktop)
            .unwrap();
        assert_eq!(video.window_position(window), (1920, 0));
        assert_eq!(video.window_size(window), (1280, 720));

        video.set_window_fullscreen(window, FullscreenMode::Off).unwrap();
        assert_eq!(video.window_position(window), (2000, 100));
    }

    #[test]
    fn test_hint_priority() {
        let mut video = HeadlessVideo::new();
        assert!(video.set_hint("h", "best", HintPriority::Normal));
        assert!(!video.set_hint("h", "nearest", HintPriority::Default));
        assert_eq!(video.hint("h").as_deref(), Some("best"));
    }

    #[test]
    fn test_gl_context_needs_gl_window() {
        let mut video = HeadlessVideo::new();
        video.init().unwrap();
        let plain = video.create_window(&spec(WindowFlags::SHOWN)).unwrap();
        assert!(video.gl_create_context(plain).is_err());
        let gl = video
            .create_window(&spec(WindowFlags::SHOWN | WindowFlags::OPENGL))
            .unwrap();
        let context = video.gl_create_context(gl).unwrap();
        assert_eq!(video.current_gl(), Some((gl, context)));
        video.gl_delete_context(context);
        assert_eq!(video.gl_context_count(), 0);
    }
}
