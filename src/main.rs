use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use log::{debug, error, info, warn};
use mandelbrot::{
    command_buffer,
    config::{Backend, Config},
    gpu::Context,
    present::Presenter,
    screen, CpuEvaluator, Error, GpuEvaluator, PixelEvaluator, Session,
};
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{
        ElementState, Event, KeyboardInput, MouseButton, MouseScrollDelta, VirtualKeyCode,
        WindowEvent,
    },
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

/// Zoom factor for one key press or one wheel notch.
const ZOOM_STEP: f32 = 0.8;

/// Fraction of the viewport panned by one arrow key press.
const PAN_STEP: f32 = 0.1;

/// Interactive Mandelbrot set viewer
#[derive(Parser)]
#[command(name = "mandelbrot", version, about)]
struct Args {
    /// Configuration file
    #[arg(long, env = "MANDELBROT_CONFIG", default_value = "mandelbrot.toml")]
    config: PathBuf,

    /// Where frames are evaluated
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Iteration budget per pixel (at least 2)
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Gradient to build the palette from
    #[arg(long)]
    palette: Option<String>,

    /// CPU evaluator threads (0 = one per logical CPU)
    #[arg(long)]
    threads: Option<usize>,
}

fn load_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::load_from(&args.config)?;
    if let Some(backend) = args.backend {
        config.evaluator.backend = backend;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.kernel.max_iterations = max_iterations;
    }
    if let Some(palette) = &args.palette {
        config.palette.name = palette.clone();
    }
    if let Some(threads) = args.threads {
        config.evaluator.threads = threads;
    }
    config.validate()?;
    Ok(config)
}

/// Input-driven mutations that fail leave the session as it was.
fn apply(result: Result<(), Error>) {
    if let Err(error) = result {
        warn!("ignoring input: {}", error);
    }
}

fn main() {
    env_logger::init();

    if let Err(error) = run(Args::parse()) {
        error!("{}", error);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args)?;

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("Mandelbrot")
        .with_inner_size(PhysicalSize::new(config.window.width, config.window.height))
        .build(&event_loop)?;

    let instance = wgpu::Instance::new(wgpu::Backends::all());

    let size = window.inner_size();
    let surface = unsafe { instance.create_surface(&window) };
    let context = Arc::new(Context::new(&instance, Some(&surface))?);

    let mut surface_configuration = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface
            .get_supported_formats(&context.adapter)
            .first()
            .copied()
            .ok_or("surface is incompatible with the adapter")?,
        width: size.width,
        height: size.height,
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: wgpu::CompositeAlphaMode::Auto,
    };
    if !screen::Size::from(size).is_empty() {
        surface.configure(&context.device, &surface_configuration);
    }

    let mut evaluator: Box<dyn PixelEvaluator> = match config.evaluator.backend {
        Backend::Gpu => Box::new(GpuEvaluator::new(Arc::clone(&context))),
        Backend::Cpu => Box::new(CpuEvaluator::new(config.evaluator.threads)?),
    };
    info!("evaluating frames on the {:?}", config.evaluator.backend);

    let mut presenter = Presenter::new(&context.device, surface_configuration.format);

    let mut session = Session::new(
        size.into(),
        config.view_state()?,
        config.kernel_parameters()?,
        config.palette()?,
    );

    let mut cursor: Option<PhysicalPosition<f64>> = None;
    let mut dragging = false;

    event_loop.run(move |event, _, control_flow| {
        control_flow.set_wait();

        match event {
            Event::MainEventsCleared => {
                if session.take_dirty() {
                    window.request_redraw();
                }
            }
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    *control_flow = ControlFlow::Exit;
                }
                WindowEvent::Resized(size) => {
                    surface_configuration.width = size.width;
                    surface_configuration.height = size.height;

                    // Minimised windows report a zero size, which a surface can't take.
                    if !screen::Size::from(size).is_empty() {
                        surface.configure(&context.device, &surface_configuration);
                    }

                    session.resize(size.into());
                }
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(key),
                            ..
                        },
                    ..
                } => {
                    let viewport = session.viewport();
                    let pan_x = viewport.width as f32 * PAN_STEP;
                    let pan_y = viewport.height as f32 * PAN_STEP;

                    match key {
                        VirtualKeyCode::Escape => *control_flow = ControlFlow::Exit,
                        VirtualKeyCode::Left => apply(session.pan_pixels(-pan_x, 0.0)),
                        VirtualKeyCode::Right => apply(session.pan_pixels(pan_x, 0.0)),
                        VirtualKeyCode::Up => apply(session.pan_pixels(0.0, pan_y)),
                        VirtualKeyCode::Down => apply(session.pan_pixels(0.0, -pan_y)),
                        VirtualKeyCode::Plus | VirtualKeyCode::Equals | VirtualKeyCode::NumpadAdd => {
                            apply(session.zoom_by(ZOOM_STEP))
                        }
                        VirtualKeyCode::Minus | VirtualKeyCode::NumpadSubtract => {
                            apply(session.zoom_by(1.0 / ZOOM_STEP))
                        }
                        VirtualKeyCode::R => session.reset_view(),
                        VirtualKeyCode::LBracket | VirtualKeyCode::RBracket => {
                            let parameters = *session.parameters();
                            let max_iterations = if key == VirtualKeyCode::LBracket {
                                (parameters.max_iterations() / 2).max(2)
                            } else {
                                parameters.max_iterations().saturating_mul(2)
                            };
                            match parameters.with_max_iterations(max_iterations) {
                                Ok(parameters) => {
                                    debug!("max_iterations = {}", max_iterations);
                                    session.set_parameters(parameters);
                                }
                                Err(error) => warn!("ignoring input: {}", error),
                            }
                        }
                        _ => {}
                    }
                }
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => {
                    dragging = state == ElementState::Pressed;
                }
                WindowEvent::CursorMoved { position, .. } => {
                    if let (true, Some(previous)) = (dragging, cursor) {
                        // Screen y runs down, the imaginary axis runs up.
                        apply(session.pan_pixels(
                            (previous.x - position.x) as f32,
                            (position.y - previous.y) as f32,
                        ));
                    }
                    cursor = Some(position);
                }
                WindowEvent::CursorLeft { .. } => {
                    cursor = None;
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let notches = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(position) => position.y as f32 / 50.0,
                    };
                    let factor = ZOOM_STEP.powf(notches);
                    let viewport = session.viewport();
                    match cursor {
                        Some(position) if !viewport.is_empty() => {
                            let normalized = (
                                position.x as f32 / viewport.width as f32,
                                1.0 - position.y as f32 / viewport.height as f32,
                            );
                            apply(session.zoom_about(normalized, factor));
                        }
                        _ => apply(session.zoom_by(factor)),
                    }
                }
                _ => {}
            },
            Event::RedrawRequested(window_id) if window_id == window.id() => {
                let frame = match evaluator.render(&session.snapshot()) {
                    Ok(frame) => frame,
                    Err(error) => {
                        error!("failed to evaluate frame: {}", error);
                        return;
                    }
                };
                if frame.is_empty() {
                    return;
                }
                presenter.upload(&context, &frame);

                let surface_texture = match surface.get_current_texture() {
                    Ok(surface_texture) => surface_texture,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        debug!("reconfiguring surface");
                        surface.configure(&context.device, &surface_configuration);
                        window.request_redraw();
                        return;
                    }
                    Err(error) => {
                        warn!("skipping frame: {}", error);
                        return;
                    }
                };

                let surface_texture_view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());

                let command_buffer =
                    command_buffer::create(&context.device, "present-encoder", |encoder| {
                        presenter.draw(encoder, &surface_texture_view);
                    });

                context.queue.submit([command_buffer]);
                surface_texture.present();
            }
            _ => {}
        }
    });
}
