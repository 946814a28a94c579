// pgcompat demo - opens a display mode and logs normalized events
// Usage:
//   pgcompat [WIDTHxHEIGHT] [--fullscreen] [--scaled] [--opengl] [--resizable] [--seconds N]
//
// The video side is simulated; on Linux it mirrors the connected DRM
// outputs and keyboard/mouse input comes from evdev.

use std::error::Error;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pgcompat::event::RawEvent;
use pgcompat::platform::headless::{HeadlessInput, HeadlessVideo};
use pgcompat::platform::InputBackend;
use pgcompat::{Context, EventKind, ModeFlags, ModeRequest};

#[cfg(target_os = "linux")]
use pgcompat::platform::linux::{probe_displays, EvdevInput};

const FRAME: Duration = Duration::from_millis(16);

struct Options {
    request: ModeRequest,
    seconds: u64,
}

fn parse_args() -> Result<Options, Box<dyn Error>> {
    let mut request = ModeRequest::new(640, 480);
    let mut flags = ModeFlags::empty();
    let mut seconds = 5;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--fullscreen" => flags |= ModeFlags::FULLSCREEN,
            "--scaled" => flags |= ModeFlags::SCALED,
            "--opengl" => flags |= ModeFlags::OPENGL | ModeFlags::DOUBLEBUF,
            "--resizable" => flags |= ModeFlags::RESIZABLE,
            "--seconds" => {
                let value = args.next().ok_or("--seconds needs a value")?;
                seconds = value.parse()?;
            }
            size => {
                let (w, h) = size
                    .split_once('x')
                    .ok_or_else(|| format!("Unrecognized argument: {}", size))?;
                request = ModeRequest::new(w.parse()?, h.parse()?);
            }
        }
    }

    Ok(Options {
        request: request.flags(flags),
        seconds,
    })
}

/// Window-system events from the video backend, then device input
struct DemoInput {
    window_events: HeadlessInput,
    #[cfg(target_os = "linux")]
    devices: Option<EvdevInput>,
}

impl InputBackend for DemoInput {
    fn poll_event(&mut self) -> Option<RawEvent> {
        if let Some(event) = self.window_events.poll_event() {
            return Some(event);
        }
        #[cfg(target_os = "linux")]
        {
            if let Some(devices) = self.devices.as_mut() {
                return devices.poll_event();
            }
        }
        None
    }

    fn pointer_position(&self) -> (i32, i32) {
        #[cfg(target_os = "linux")]
        {
            if let Some(devices) = &self.devices {
                return devices.pointer_position();
            }
        }
        self.window_events.pointer_position()
    }
}

#[cfg(target_os = "linux")]
fn open_backends() -> (HeadlessVideo, DemoInput) {
    let video = match probe_displays() {
        Ok(displays) => HeadlessVideo::with_displays(displays),
        Err(e) => {
            warn!("Display probe failed, using a default display: {}", e);
            HeadlessVideo::new()
        }
    };
    let devices = match EvdevInput::open() {
        Ok(devices) => Some(devices),
        Err(e) => {
            warn!("No device input: {}", e);
            None
        }
    };
    let input = DemoInput {
        window_events: video.input(),
        devices,
    };
    (video, input)
}

#[cfg(not(target_os = "linux"))]
fn open_backends() -> (HeadlessVideo, DemoInput) {
    let video = HeadlessVideo::new();
    let input = DemoInput {
        window_events: video.input(),
    };
    (video, input)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = parse_args()?;
    let (video, input) = open_backends();
    let mut ctx = Context::new(video, input);
    ctx.init()?;

    for (index, (w, h)) in ctx.get_desktop_sizes()?.into_iter().enumerate() {
        info!("Display {}: {}x{}", index, w, h);
    }

    ctx.set_caption("pgcompat demo");
    ctx.set_repeat(400, 40)?;
    let surface = ctx.set_mode(&options.request)?;
    let (w, h) = ctx.get_window_size()?;
    info!(
        "Mode set: surface {:?} window {}x{} gl={}",
        surface.size(),
        w,
        h,
        ctx.display().using_gl()
    );

    #[cfg(target_os = "linux")]
    {
        if let Some(window) = ctx.window() {
            if let Some(devices) = ctx.input_mut().devices.as_mut() {
                devices.attach(window, w, h);
            }
        }
    }

    let deadline = Instant::now() + Duration::from_secs(options.seconds);
    'frames: while Instant::now() < deadline {
        for record in ctx.get()? {
            info!("{}", record);
            if record.kind() == EventKind::Quit {
                break 'frames;
            }
            if record.kind() == EventKind::KeyDown
                && record.int("key") == Some(i64::from(pgcompat::event::keys::ESCAPE))
            {
                break 'frames;
            }
        }
        ctx.flip()?;
        thread::sleep(FRAME);
    }

    ctx.quit();
    info!("Done");
    Ok(())
}
