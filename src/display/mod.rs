// Display mode controller
//
// Owns the single tracked window and the surface handed to the
// application, and reconciles mode requests against them.

mod mode;
mod placement;
mod watch;

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::platform::{
    GammaRamp, GlContextId, Icon, RendererId, SurfaceId, TextureId, VideoBackend, WindowFlags,
    WindowId, WindowPos,
};

pub(crate) use mode::set_mode;
pub(crate) use watch::on_window_event;

pub const DEFAULT_TITLE: &str = "pgcompat window";

bitflags! {
    /// Flags accepted by `set_mode`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModeFlags: u32 {
        const FULLSCREEN = 1 << 0;
        const OPENGL = 1 << 1;
        const SCALED = 1 << 2;
        const NOFRAME = 1 << 3;
        const RESIZABLE = 1 << 4;
        const SHOWN = 1 << 5;
        const HIDDEN = 1 << 6;
        const DOUBLEBUF = 1 << 7;
    }
}

/// A requested display configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeRequest {
    pub size: (i32, i32),
    pub flags: ModeFlags,
    /// None picks the display automatically
    pub display: Option<i32>,
    /// Informational only
    pub depth: i32,
}

impl ModeRequest {
    pub fn new(w: i32, h: i32) -> Self {
        Self {
            size: (w, h),
            flags: ModeFlags::empty(),
            display: None,
            depth: 0,
        }
    }

    /// Zero size, meaning the desktop size of the chosen display
    pub fn desktop() -> Self {
        Self::new(0, 0)
    }

    pub fn flags(mut self, flags: ModeFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn display(mut self, display: i32) -> Self {
        self.display = Some(display);
        self
    }

    pub fn depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }
}

// ============================================================================
// Surface handle
// ============================================================================

#[derive(Debug)]
struct SurfaceSlot {
    id: Option<SurfaceId>,
    /// True when the surface is a shadow buffer we allocated and must free
    owned: bool,
    size: (i32, i32),
}

/// The application's drawable surface.
///
/// Clones share one slot. `set_mode` rebinds the slot in place, so a handle
/// taken before a mode change still refers to the current surface after it.
#[derive(Debug, Clone)]
pub struct Surface {
    slot: Rc<RefCell<SurfaceSlot>>,
}

impl Surface {
    fn new(id: SurfaceId, owned: bool, size: (i32, i32)) -> Self {
        Self {
            slot: Rc::new(RefCell::new(SurfaceSlot {
                id: Some(id),
                owned,
                size,
            })),
        }
    }

    /// None once the surface has been released
    pub fn id(&self) -> Option<SurfaceId> {
        self.slot.borrow().id
    }

    pub fn size(&self) -> (i32, i32) {
        self.slot.borrow().size
    }

    pub fn is_owned(&self) -> bool {
        self.slot.borrow().owned
    }

    pub fn ptr_eq(&self, other: &Surface) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }

    /// Point the handle at another native surface, freeing the old one if owned
    fn rebind<V: VideoBackend + ?Sized>(
        &self,
        video: &mut V,
        id: SurfaceId,
        owned: bool,
        size: (i32, i32),
    ) {
        let mut slot = self.slot.borrow_mut();
        if let Some(old) = slot.id {
            if old != id && slot.owned {
                video.free_surface(old);
            }
        }
        slot.id = Some(id);
        slot.owned = owned;
        slot.size = size;
    }

    /// Free the native surface if owned and detach the handle from it
    pub(crate) fn release<V: VideoBackend + ?Sized>(&self, video: &mut V) {
        let mut slot = self.slot.borrow_mut();
        if let Some(id) = slot.id.take() {
            if slot.owned {
                video.free_surface(id);
            }
        }
        slot.owned = false;
        slot.size = (0, 0);
    }
}

// ============================================================================
// Display state
// ============================================================================

/// Everything the controller tracks between mode changes
#[derive(Debug)]
pub struct DisplayState {
    pub(crate) window: Option<WindowId>,
    pub(crate) surface: Option<Surface>,
    pub(crate) renderer: Option<RendererId>,
    pub(crate) texture: Option<TextureId>,
    pub(crate) gl_context: Option<GlContextId>,
    pub(crate) title: String,
    pub(crate) icon: Option<Icon>,
    pub(crate) gamma_ramp: Option<Box<GammaRamp>>,
    pub(crate) using_gl: bool,
    pub(crate) scaled_gl: bool,
    pub(crate) scaled_gl_size: (i32, i32),
    pub(crate) fullscreen_backup: Option<(WindowPos, WindowPos)>,
    pub(crate) auto_resize: bool,
    pub(crate) resize_watch: bool,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            window: None,
            surface: None,
            renderer: None,
            texture: None,
            gl_context: None,
            title: DEFAULT_TITLE.to_string(),
            icon: None,
            gamma_ramp: None,
            using_gl: false,
            scaled_gl: false,
            scaled_gl_size: (0, 0),
            fullscreen_backup: None,
            auto_resize: true,
            resize_watch: false,
        }
    }
}

impl DisplayState {
    pub fn window(&self) -> Option<WindowId> {
        self.window
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn renderer(&self) -> Option<RendererId> {
        self.renderer
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn gl_context(&self) -> Option<GlContextId> {
        self.gl_context
    }

    pub fn using_gl(&self) -> bool {
        self.using_gl
    }

    pub fn resize_watch_installed(&self) -> bool {
        self.resize_watch
    }

    pub fn caption(&self) -> &str {
        &self.title
    }

    pub fn auto_resize(&self) -> bool {
        self.auto_resize
    }

    fn require_window(&self) -> Result<WindowId> {
        self.window.ok_or(Error::NoWindow)
    }

    pub(crate) fn set_caption<V: VideoBackend>(&mut self, video: &mut V, title: &str) {
        self.title = title.to_owned();
        if let Some(window) = self.window {
            video.set_window_title(window, title);
        }
    }

    pub(crate) fn set_icon<V: VideoBackend>(&mut self, video: &mut V, icon: Icon) {
        if let Some(window) = self.window {
            video.set_window_icon(window, &icon);
        }
        self.icon = Some(icon);
    }

    /// Apply and remember a gamma ramp. Returns false if the window system
    /// refused it, in which case the ramp is discarded.
    pub(crate) fn set_gamma_ramp<V: VideoBackend>(
        &mut self,
        video: &mut V,
        red: &[u16],
        green: &[u16],
        blue: &[u16],
    ) -> Result<bool> {
        let mut ramp: GammaRamp = [[0; 256]; 3];
        for (channel, values) in ramp.iter_mut().zip([red, green, blue]) {
            if values.len() != 256 {
                return Err(Error::config(format!(
                    "gamma ramp channels must have 256 entries, got {}",
                    values.len()
                )));
            }
            channel.copy_from_slice(values);
        }

        if let Some(window) = self.window {
            if let Err(e) = video.set_window_gamma_ramp(window, &ramp) {
                warn!("Gamma ramp rejected: {}", e);
                return Ok(false);
            }
        }
        self.gamma_ramp = Some(Box::new(ramp));
        Ok(true)
    }

    pub(crate) fn set_auto_resize(&mut self, enabled: bool) {
        self.auto_resize = enabled;
    }

    pub(crate) fn window_size<V: VideoBackend>(&self, video: &V) -> Result<(i32, i32)> {
        Ok(video.window_size(self.require_window()?))
    }

    /// Push the current frame to the screen through whichever path is active
    pub(crate) fn flip<V: VideoBackend>(&mut self, video: &mut V) -> Result<()> {
        let window = self.require_window()?;
        if self.using_gl {
            video.gl_swap_window(window);
            return Ok(());
        }
        if let (Some(renderer), Some(texture), Some(surface)) = (
            self.renderer,
            self.texture,
            self.surface.as_ref().and_then(Surface::id),
        ) {
            video.present_surface(renderer, texture, surface)?;
            return Ok(());
        }
        video.update_window_surface(window)?;
        Ok(())
    }

    pub(crate) fn iconify<V: VideoBackend>(&mut self, video: &mut V) -> Result<()> {
        let window = self.require_window()?;
        video.minimize_window(window);
        Ok(())
    }

    /// True while the window is visible and not minimized
    pub(crate) fn is_active<V: VideoBackend>(&self, video: &V) -> bool {
        match self.window {
            Some(window) => {
                let flags = video.window_flags(window);
                !flags.intersects(WindowFlags::HIDDEN | WindowFlags::MINIMIZED)
            }
            None => false,
        }
    }

    /// Destroy everything: texture, renderer, GL context, owned surface, window.
    ///
    /// Caption, icon, gamma ramp and the auto-resize setting outlive the
    /// window and are applied again by the next `set_mode`.
    pub(crate) fn teardown<V: VideoBackend>(&mut self, video: &mut V) {
        if let Some(texture) = self.texture.take() {
            video.destroy_texture(texture);
        }
        if let Some(renderer) = self.renderer.take() {
            video.destroy_renderer(renderer);
        }
        if let Some(context) = self.gl_context.take() {
            video.gl_delete_context(context);
        }
        if let Some(surface) = self.surface.take() {
            surface.release(video);
        }
        if let Some(window) = self.window.take() {
            video.destroy_window(window);
            debug!(window = window.0, "display torn down");
        }
        *self = Self {
            title: std::mem::take(&mut self.title),
            icon: self.icon.take(),
            gamma_ramp: self.gamma_ramp.take(),
            auto_resize: self.auto_resize,
            ..Self::default()
        };
    }
}

/// Desktop size of every attached display
pub(crate) fn desktop_sizes<V: VideoBackend>(video: &V) -> Result<Vec<(i32, i32)>> {
    let count = video.num_displays()?;
    (0..count)
        .map(|display| {
            let mode = video.desktop_mode(display)?;
            Ok((mode.w, mode.h))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::headless::HeadlessVideo;
    use crate::platform::PixelFormat;

    #[test]
    fn test_rebind_frees_owned_surface() {
        let mut video = HeadlessVideo::new();
        let first = video.create_surface(10, 10, PixelFormat::Xrgb8888).unwrap();
        let surface = Surface::new(first, true, (10, 10));
        let alias = surface.clone();

        let second = video.create_surface(20, 20, PixelFormat::Xrgb8888).unwrap();
        surface.rebind(&mut video, second, true, (20, 20));
        assert!(video.surface(first).is_none());
        assert_eq!(alias.id(), Some(second));
        assert_eq!(alias.size(), (20, 20));
        assert!(alias.ptr_eq(&surface));

        surface.release(&mut video);
        assert!(video.surface(second).is_none());
        assert_eq!(alias.id(), None);
    }

    #[test]
    fn test_rebind_same_id_keeps_surface() {
        let mut video = HeadlessVideo::new();
        let id = video.create_surface(10, 10, PixelFormat::Xrgb8888).unwrap();
        let surface = Surface::new(id, true, (10, 10));
        surface.rebind(&mut video, id, true, (10, 10));
        assert!(video.surface(id).is_some());
    }

    #[test]
    fn test_gamma_ramp_validation() {
        let mut video = HeadlessVideo::new();
        let mut state = DisplayState::default();
        let short = [0u16; 10];
        let full = [0u16; 256];
        assert!(matches!(
            state.set_gamma_ramp(&mut video, &full, &short, &full),
            Err(Error::Configuration(_))
        ));
        assert!(state.gamma_ramp.is_none());

        // without a window the ramp is stored for the next mode
        assert!(state.set_gamma_ramp(&mut video, &full, &full, &full).unwrap());
        assert!(state.gamma_ramp.is_some());
    }

    #[test]
    fn test_window_ops_need_window() {
        let mut video = HeadlessVideo::new();
        let mut state = DisplayState::default();
        assert!(matches!(state.flip(&mut video), Err(Error::NoWindow)));
        assert!(matches!(state.iconify(&mut video), Err(Error::NoWindow)));
        assert!(matches!(state.window_size(&video), Err(Error::NoWindow)));
        assert!(!state.is_active(&video));
    }

    #[test]
    fn test_mode_request_builder() {
        let request = ModeRequest::new(320, 200)
            .flags(ModeFlags::SCALED | ModeFlags::RESIZABLE)
            .display(1)
            .depth(32);
        assert_eq!(request.size, (320, 200));
        assert!(request.flags.contains(ModeFlags::SCALED));
        assert_eq!(request.display, Some(1));
        assert_eq!(ModeRequest::desktop().size, (0, 0));
    }
}
