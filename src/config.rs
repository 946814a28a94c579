// Environment overrides consulted by set_mode
//
// All lookups go through the video backend so tests can supply their own
// environment.

use crate::platform::VideoBackend;

/// Forces SCALED on every mode request. The value `photo` also asks for
/// smooth scaling.
pub const ENV_FORCE_SCALE: &str = "PGCOMPAT_FORCE_SCALE";
/// Display index used when set_mode is not given one
pub const ENV_DISPLAY: &str = "PGCOMPAT_DISPLAY";
/// `x,y` or `center`
pub const ENV_WINDOW_POS: &str = "SDL_VIDEO_WINDOW_POS";
pub const ENV_CENTERED: &str = "SDL_VIDEO_CENTERED";

pub const HINT_RENDER_SCALE_QUALITY: &str = "SDL_RENDER_SCALE_QUALITY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceScale {
    Default,
    Photo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPosEnv {
    At(i32, i32),
    Centered,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoEnv {
    pub force_scale: Option<ForceScale>,
    pub display: Option<i32>,
    pub window_pos: Option<WindowPosEnv>,
}

impl VideoEnv {
    pub fn read<V: VideoBackend + ?Sized>(video: &V) -> Self {
        let force_scale = video.getenv(ENV_FORCE_SCALE).map(|value| {
            if value == "photo" {
                ForceScale::Photo
            } else {
                ForceScale::Default
            }
        });

        let display = video
            .getenv(ENV_DISPLAY)
            .and_then(|value| value.trim().parse::<i32>().ok());

        let window_pos = video
            .getenv(ENV_WINDOW_POS)
            .and_then(|value| parse_window_pos(&value))
            .or_else(|| video.getenv(ENV_CENTERED).map(|_| WindowPosEnv::Centered));

        Self {
            force_scale,
            display,
            window_pos,
        }
    }
}

fn parse_window_pos(value: &str) -> Option<WindowPosEnv> {
    if value == "center" {
        return Some(WindowPosEnv::Centered);
    }
    let (x, y) = value.split_once(',')?;
    Some(WindowPosEnv::At(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

/// True when the render-quality hint asks for anything but nearest-pixel scaling
pub fn quality_scaling_requested<V: VideoBackend + ?Sized>(video: &V) -> bool {
    match video.hint(HINT_RENDER_SCALE_QUALITY) {
        Some(value) => !matches!(value.trim(), "" | "0" | "nearest"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::headless::HeadlessVideo;
    use crate::platform::HintPriority;

    #[test]
    fn test_window_pos_parsing() {
        assert_eq!(parse_window_pos("100,50"), Some(WindowPosEnv::At(100, 50)));
        assert_eq!(parse_window_pos(" -5 , 7"), Some(WindowPosEnv::At(-5, 7)));
        assert_eq!(parse_window_pos("center"), Some(WindowPosEnv::Centered));
        assert_eq!(parse_window_pos("left"), None);
    }

    #[test]
    fn test_read_env() {
        let mut video = HeadlessVideo::new();
        assert_eq!(VideoEnv::read(&video), VideoEnv::default());

        video.set_env(ENV_FORCE_SCALE, "photo");
        video.set_env(ENV_DISPLAY, "1");
        video.set_env(ENV_WINDOW_POS, "garbage");
        video.set_env(ENV_CENTERED, "1");
        let env = VideoEnv::read(&video);
        assert_eq!(env.force_scale, Some(ForceScale::Photo));
        assert_eq!(env.display, Some(1));
        assert_eq!(env.window_pos, Some(WindowPosEnv::Centered));
    }

    #[test]
    fn test_quality_hint() {
        let mut video = HeadlessVideo::new();
        assert!(!quality_scaling_requested(&video));
        video.set_hint(HINT_RENDER_SCALE_QUALITY, "nearest", HintPriority::Default);
        assert!(!quality_scaling_requested(&video));
        video.set_hint(HINT_RENDER_SCALE_QUALITY, "best", HintPriority::Normal);
        assert!(quality_scaling_requested(&video));
    }
}
