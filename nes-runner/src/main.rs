//! Windowed NES front-end.
//!
//! Presents the framebuffer through winit + pixels, feeds PCM to cpal, and
//! forwards keyboard state to controller 1. When audio is available the
//! sample ring paces emulation; without it the runner clocks the core from
//! wall time, capped at three frames of catch-up. With no window at all
//! (`--capture N`, or window creation failure) it still runs the core and
//! dumps frames as PNGs.

mod audio;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use emu_core::Machine;
use nes_core::{capture, Nes, CPU_FREQ};
use pixels::{Pixels, SurfaceTexture};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::audio::AudioOutput;

const SCALE: u32 = 3;
/// NTSC CPU cycles per frame, for wall-clock pacing.
const CYCLES_PER_FRAME: u64 = 29781;

/// Actions queued by the window layer for the driver loop.
enum UiAction {
    LoadRom(PathBuf),
    CloseRom,
    Exit,
}

fn main() {
    let mut rom_path: Option<String> = None;
    let mut capture_frames: Option<u32> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--capture" => {
                let n = args
                    .next()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(|| usage());
                capture_frames = Some(n);
            }
            "-h" | "--help" => usage(),
            _ => rom_path = Some(arg),
        }
    }

    let mut nes = Nes::new();
    if let Some(path) = &rom_path {
        load_rom(&mut nes, Path::new(path));
    } else {
        eprintln!("no ROM given; drop a .nes file onto the window to load one");
    }

    if let Some(frames) = capture_frames {
        run_capture(&mut nes, frames);
        return;
    }

    match EventLoop::new() {
        Ok(event_loop) => {
            event_loop.set_control_flow(ControlFlow::Poll);
            let mut runner = Runner::new(nes);
            if let Err(err) = event_loop.run_app(&mut runner) {
                eprintln!("event loop error: {err}");
            }
        }
        Err(err) => {
            // No display: fall back to the non-interactive path.
            eprintln!("window creation failed ({err}); capturing 60 frames instead");
            run_capture(&mut nes, 60);
        }
    }
}

fn usage() -> ! {
    eprintln!("usage: nes-runner [--capture N] <rom.nes>");
    std::process::exit(1);
}

fn load_rom(nes: &mut Nes, path: &Path) {
    match std::fs::read(path) {
        Ok(data) => match nes.insert_cartridge(&data) {
            Ok(()) => println!("loaded {}", path.display()),
            Err(err) => eprintln!("failed to load {}: {err}", path.display()),
        },
        Err(err) => eprintln!("failed to read {}: {err}", path.display()),
    }
}

fn run_capture(nes: &mut Nes, frames: u32) {
    if !nes.cartridge_inserted() {
        eprintln!("capture mode needs a ROM");
        std::process::exit(1);
    }
    match capture::record(nes, Path::new("."), frames) {
        Ok(()) => println!("captured {frames} frames"),
        Err(err) => {
            eprintln!("capture failed: {err}");
            std::process::exit(1);
        }
    }
}

struct Runner {
    nes: Nes,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    audio: Option<AudioOutput>,
    audio_buf: Vec<f32>,
    actions: VecDeque<UiAction>,
    buttons: u8,
    ctrl_held: bool,
    last_tick: Instant,
}

impl Runner {
    fn new(nes: Nes) -> Self {
        Self {
            nes,
            window: None,
            pixels: None,
            audio: None,
            audio_buf: vec![0.0; 4096],
            actions: VecDeque::new(),
            buttons: 0,
            ctrl_held: false,
            last_tick: Instant::now(),
        }
    }

    fn apply_actions(&mut self, event_loop: &ActiveEventLoop) {
        while let Some(action) = self.actions.pop_front() {
            match action {
                UiAction::LoadRom(path) => load_rom(&mut self.nes, &path),
                UiAction::CloseRom => self.nes.remove_cartridge(),
                UiAction::Exit => event_loop.exit(),
            }
        }
    }

    fn set_button(&mut self, key: KeyCode, pressed: bool) {
        let bit = match key {
            KeyCode::KeyX => 0,          // A
            KeyCode::KeyZ => 1,          // B
            KeyCode::ShiftRight => 2,    // Select
            KeyCode::Enter => 3,         // Start
            KeyCode::ArrowUp => 4,
            KeyCode::ArrowDown => 5,
            KeyCode::ArrowLeft => 6,
            KeyCode::ArrowRight => 7,
            _ => return,
        };
        if pressed {
            self.buttons |= 1 << bit;
        } else {
            self.buttons &= !(1 << bit);
        }
        self.nes.set_controller(0, self.buttons);
    }
}

impl ApplicationHandler for Runner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let video = self.nes.video_config();
        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title("NES")
                        .with_inner_size(LogicalSize::new(
                            video.width * SCALE,
                            video.height * SCALE,
                        )),
                )
                .expect("failed to create window"),
        );

        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, Arc::clone(&window));
        let pixels =
            Pixels::new(video.width, video.height, surface).expect("failed to create pixels");

        self.audio = AudioOutput::open();
        if self.audio.is_none() {
            eprintln!("no audio device; running from wall clock");
        }

        self.window = Some(window);
        // SAFETY: the surface borrows the window, which lives for the rest
        // of the process.
        self.pixels = Some(unsafe {
            std::mem::transmute::<Pixels<'_>, Pixels<'static>>(pixels)
        });
        self.last_tick = Instant::now();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    if let Some(pixels) = &mut self.pixels {
                        pixels.resize_surface(size.width, size.height).ok();
                    }
                }
            }

            WindowEvent::DroppedFile(path) => {
                self.actions.push_back(UiAction::LoadRom(path));
            }

            WindowEvent::ModifiersChanged(modifiers) => {
                self.ctrl_held = modifiers.state().control_key();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    let pressed = event.state == ElementState::Pressed;
                    if pressed && !event.repeat {
                        match key {
                            KeyCode::Escape => self.actions.push_back(UiAction::Exit),
                            KeyCode::KeyW if self.ctrl_held => {
                                self.actions.push_back(UiAction::CloseRom);
                            }
                            KeyCode::KeyR if self.ctrl_held => self.nes.reset(),
                            _ => {}
                        }
                    }
                    self.set_button(key, pressed);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(pixels) = &mut self.pixels {
                    if pixels.render().is_err() {
                        event_loop.exit();
                    }
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            return;
        }
        self.apply_actions(event_loop);

        if self.nes.cartridge_inserted() {
            if self.audio.is_some() {
                // The audio ring back-pressure paces the emulation.
                self.nes.run_frame();
                let n = self.nes.drain_audio(&mut self.audio_buf);
                if let Some(audio) = &mut self.audio {
                    audio.push(&self.audio_buf[..n]);
                }
            } else {
                // Wall-clock pacing, capped so a long stall cannot demand
                // unbounded catch-up.
                let elapsed = self.last_tick.elapsed();
                let owed = (elapsed.as_secs_f64() * f64::from(CPU_FREQ)) as u64;
                for _ in 0..owed.min(3 * CYCLES_PER_FRAME) {
                    self.nes.clock();
                }
                // No sink; drain anyway so the queue stays bounded.
                let _ = self.nes.drain_audio(&mut self.audio_buf);
            }
        }
        self.last_tick = Instant::now();

        if let Some(pixels) = &mut self.pixels {
            self.nes.render(pixels.frame_mut());
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
