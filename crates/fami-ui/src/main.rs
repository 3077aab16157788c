mod audio;
mod keybinds;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use fami_core::cartridge::Cartridge;
use fami_core::controller::buttons;
use fami_core::diagnostics::{self, Level, LogSink};
use fami_core::nes::Nes;
use log::{error, info, warn};
use pixels::{Pixels, SurfaceTexture};
use rfd::FileDialog;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::Window;

const SCREEN_WIDTH: u32 = 256;
const SCREEN_HEIGHT: u32 = 240;
const FF_MULT: f64 = 4.0;
const STATUS_LOG_FRAMES: u64 = 600;

#[derive(Parser)]
#[command(name = "famicore", about = "NES emulator", version)]
struct Args {
    /// Path to an iNES ROM file (a picker opens when omitted)
    rom: Option<PathBuf>,

    /// Integer window scale factor
    #[arg(long, default_value_t = 3)]
    scale: u32,

    /// Run without opening a window
    #[arg(long)]
    headless: bool,

    /// Number of frames to run in headless mode
    #[arg(long)]
    frames: Option<u64>,

    /// Number of seconds to run in headless mode
    #[arg(long)]
    seconds: Option<f64>,
}

/// Forwards the core's diagnostics into the `log` facade.
struct CoreLogBridge;

impl LogSink for CoreLogBridge {
    fn log(&self, level: Level, target: &'static str, args: fmt::Arguments) {
        match level {
            Level::Info => log::info!(target: target, "{args}"),
            Level::Warn => log::warn!(target: target, "{args}"),
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let _ = diagnostics::try_set_log_sink(Box::new(CoreLogBridge));

    let args = Args::parse();

    let rom_path = match args.rom.or_else(pick_rom) {
        Some(path) => path,
        None => {
            error!("no ROM selected");
            return ExitCode::FAILURE;
        }
    };

    let cart = match Cartridge::from_file(&rom_path) {
        Ok(cart) => cart,
        Err(e) => {
            error!("failed to load {}: {e}", rom_path.display());
            return ExitCode::FAILURE;
        }
    };

    let (nes, audio_queue) = match Nes::new(cart) {
        Ok(v) => v,
        Err(e) => {
            error!("failed to start emulation: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.headless {
        return run_headless(nes, args.frames, args.seconds);
    }

    let _stream = match audio::start_stream(audio_queue) {
        Some(stream) => stream,
        None => {
            error!("failed to initialize audio output");
            return ExitCode::FAILURE;
        }
    };

    run_windowed(nes, args.scale.max(1))
}

fn pick_rom() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("NES ROM", &["nes"])
        .pick_file()
}

fn run_headless(mut nes: Nes, frames: Option<u64>, seconds: Option<f64>) -> ExitCode {
    let frame_limit = frames.unwrap_or(u64::MAX);
    let time_limit = seconds.map(Duration::from_secs_f64);

    let start = Instant::now();
    let first = nes.frame_count();
    while nes.frame_count() - first < frame_limit {
        nes.step_frame();
        if let Some(limit) = time_limit
            && start.elapsed() >= limit
        {
            break;
        }
    }

    let rendered = nes.frame_count() - first;
    let elapsed = start.elapsed();
    info!(
        "rendered {rendered} frames in {:.2}s ({:.1} fps)",
        elapsed.as_secs_f64(),
        rendered as f64 / elapsed.as_secs_f64().max(1e-9)
    );

    save_sram(&nes);
    ExitCode::SUCCESS
}

fn run_windowed(mut nes: Nes, scale: u32) -> ExitCode {
    let event_loop = match EventLoop::builder().build() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("failed to create event loop: {e}");
            return ExitCode::FAILURE;
        }
    };

    let attrs = Window::default_attributes()
        .with_title("famicore")
        .with_inner_size(winit::dpi::LogicalSize::new(
            (SCREEN_WIDTH * scale) as f64,
            (SCREEN_HEIGHT * scale) as f64,
        ));
    #[allow(deprecated)]
    let window = match event_loop.create_window(attrs) {
        Ok(window) => window,
        Err(e) => {
            error!("failed to create window: {e}");
            return ExitCode::FAILURE;
        }
    };

    let size = window.inner_size();
    let surface = SurfaceTexture::new(size.width, size.height, &window);
    let mut pixels = match Pixels::new(SCREEN_WIDTH, SCREEN_HEIGHT, surface) {
        Ok(pixels) => pixels,
        Err(e) => {
            error!("failed to create framebuffer surface: {e}");
            return ExitCode::FAILURE;
        }
    };

    let binds = keybinds::KeyBindings::defaults();
    let mut held = 0u8;
    let mut turbo_a = false;
    let mut turbo_b = false;
    let mut fast_forward = false;
    let mut prev = Instant::now();
    let mut last_status = 0u64;

    #[allow(deprecated)]
    let result = event_loop.run(move |event, target| {
        target.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    save_sram(&nes);
                    target.exit();
                }
                WindowEvent::Resized(size) => {
                    if let Err(e) = pixels.resize_surface(size.width, size.height) {
                        error!("failed to resize surface: {e}");
                        target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        let pressed = event.state == ElementState::Pressed;
                        if let Some(mask) = binds.joypad_mask(code) {
                            if pressed {
                                held |= mask;
                            } else {
                                held &= !mask;
                            }
                        } else if code == binds.turbo_a {
                            turbo_a = pressed;
                        } else if code == binds.turbo_b {
                            turbo_b = pressed;
                        } else if code == binds.fast_forward {
                            fast_forward = pressed;
                        } else if code == binds.quit && pressed {
                            save_sram(&nes);
                            target.exit();
                        }
                    }
                }
                WindowEvent::RedrawRequested => {
                    draw_frame(&mut pixels, nes.frame_buffer());
                    if let Err(e) = pixels.render() {
                        error!("render failed: {e}");
                        target.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                let now = Instant::now();
                // Clamp a late host frame to at most one emulated second.
                let dt = (now - prev).as_secs_f64().min(1.0);
                prev = now;

                // Rapid-fire keys pulse in alternating three-frame groups.
                let mut pad = held;
                if nes.frame_count() % 6 < 3 {
                    if turbo_a {
                        pad |= buttons::A;
                    }
                    if turbo_b {
                        pad |= buttons::B;
                    }
                }
                nes.set_buttons1(pad);
                nes.set_buttons2(0);

                nes.emulate(if fast_forward { FF_MULT * dt } else { dt });

                if nes.frame_count() >= last_status + STATUS_LOG_FRAMES {
                    last_status = nes.frame_count();
                    info!(
                        "frame {} pc={:04X} apu_status={:02X}",
                        nes.frame_count(),
                        nes.cpu.pc,
                        nes.bus.apu.read_status()
                    );
                }

                window.request_redraw();
            }
            _ => {}
        }
    });

    if let Err(e) = result {
        error!("event loop error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Copy the 0xAARRGGBB frame into the RGBA surface.
fn draw_frame(pixels: &mut Pixels, frame: &[u32]) {
    for (dst, &src) in pixels.frame_mut().chunks_exact_mut(4).zip(frame.iter()) {
        dst[0] = (src >> 16) as u8;
        dst[1] = (src >> 8) as u8;
        dst[2] = src as u8;
        dst[3] = 0xFF;
    }
}

fn save_sram(nes: &Nes) {
    if let Err(e) = nes.save_sram() {
        warn!("failed to write SRAM: {e}");
    }
}
