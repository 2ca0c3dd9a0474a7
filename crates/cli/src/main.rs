#![deny(unsafe_code)]
//! Demo binary: a rotating triangle rendered through the WebGL-style
//! context.
//!
//! Opens a window with the compiled-in backend (`backend-glutin` by
//! default, `backend-x11` for the direct Xlib + EGL path), compiles a
//! small GLSL ES 1.00 program, and draws until the window is closed or
//! `--frames` runs out.

mod error;

use clap::Parser;
use error::CliError;
use glam::{Mat4, Vec3};
use log::info;
use std::f32::consts::PI;
use std::path::PathBuf;
use std::process;
use webgl_native_core::{glow, Session, SurfaceConfig, SurfaceProvider};

#[cfg(not(any(feature = "backend-glutin", feature = "backend-x11")))]
compile_error!("enable at least one backend feature: backend-glutin or backend-x11");

const VERTEX_SHADER: &str = "\
attribute vec3 aVertexPosition;
attribute vec4 aVertexColor;

uniform mat4 uMVMatrix;
uniform mat4 uPMatrix;

varying vec4 vColor;

void main(void) {
    gl_Position = uPMatrix * uMVMatrix * vec4(aVertexPosition, 1.0);
    vColor = aVertexColor;
}
";

const FRAGMENT_SHADER: &str = "\
precision mediump float;

varying vec4 vColor;

void main(void) {
    gl_FragColor = vColor;
}
";

#[derive(Parser)]
#[command(name = "webgl-native", about = "Rotating-triangle demo")]
struct Cli {
    /// Path to a JSON surface configuration; flags override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Window width in pixels.
    #[arg(short = 'W', long)]
    width: Option<u32>,

    /// Window height in pixels.
    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Open a borderless fullscreen window.
    #[arg(long)]
    fullscreen: bool,

    /// Window title.
    #[arg(long)]
    title: Option<String>,

    /// Render this many frames, then shut down (default: run until the
    /// window is closed).
    #[arg(short, long)]
    frames: Option<u64>,

    /// Rotation speed in degrees per frame.
    #[arg(long, default_value_t = 1.5)]
    spin: f32,

    /// Poll window events from a background thread (X11 backend only).
    #[arg(long)]
    background: bool,
}

/// Merges the optional config file with the command-line flags.
fn build_config(cli: &Cli) -> Result<SurfaceConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| CliError::Io(format!("cannot read {}: {e}", path.display())))?;
            serde_json::from_str::<SurfaceConfig>(&text)
                .map_err(|e| CliError::Input(format!("invalid config {}: {e}", path.display())))?
        }
        None => SurfaceConfig::default(),
    };

    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(height) = cli.height {
        config.height = height;
    }
    if cli.fullscreen {
        config.fullscreen = true;
    }
    if let Some(title) = &cli.title {
        config.title = title.clone();
    } else if config.title.is_empty() {
        config.title = "Single Triangle".to_string();
    }
    if cli.background {
        config.pump = webgl_native_core::PumpMode::Background;
    }
    Ok(config)
}

/// The triangle's GL objects, looked up once after linking.
struct Scene {
    program: glow::Program,
    position_buffer: glow::Buffer,
    color_buffer: glow::Buffer,
    position_attrib: u32,
    color_attrib: u32,
    mv_matrix: Option<glow::UniformLocation>,
    p_matrix: Option<glow::UniformLocation>,
}

fn init_scene<S: SurfaceProvider>(session: &mut Session<S>) -> Result<Scene, CliError> {
    let ctx = session.context_mut();

    let program = ctx.compile_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
    ctx.use_program(Some(program));

    let position_attrib = ctx
        .get_attrib_location(program, "aVertexPosition")
        .ok_or_else(|| CliError::Input("program has no attribute aVertexPosition".into()))?;
    let color_attrib = ctx
        .get_attrib_location(program, "aVertexColor")
        .ok_or_else(|| CliError::Input("program has no attribute aVertexColor".into()))?;
    ctx.enable_vertex_attrib_array(position_attrib);
    ctx.enable_vertex_attrib_array(color_attrib);

    let mv_matrix = ctx.get_uniform_location(program, "uMVMatrix");
    let p_matrix = ctx.get_uniform_location(program, "uPMatrix");

    let position_buffer = ctx.create_buffer().map_err(CliError::Input)?;
    ctx.bind_buffer(glow::ARRAY_BUFFER, Some(position_buffer));
    let vertices: [f32; 9] = [
        0.0, 1.0, 0.0, //
        -1.0, -1.0, 1.0, //
        1.0, -1.0, 1.0,
    ];
    ctx.buffer_data_f32(glow::ARRAY_BUFFER, &vertices, glow::STATIC_DRAW);

    let color_buffer = ctx.create_buffer().map_err(CliError::Input)?;
    ctx.bind_buffer(glow::ARRAY_BUFFER, Some(color_buffer));
    let colors: [f32; 12] = [
        1.0, 0.0, 0.0, 1.0, //
        0.0, 1.0, 0.0, 1.0, //
        0.0, 0.0, 1.0, 1.0,
    ];
    ctx.buffer_data_f32(glow::ARRAY_BUFFER, &colors, glow::STATIC_DRAW);

    ctx.clear_color(0.0, 0.0, 0.0, 1.0);
    ctx.enable(glow::DEPTH_TEST);

    Ok(Scene {
        program,
        position_buffer,
        color_buffer,
        position_attrib,
        color_attrib,
        mv_matrix,
        p_matrix,
    })
}

fn draw_scene<S: SurfaceProvider>(
    session: &mut Session<S>,
    scene: &Scene,
    config: &SurfaceConfig,
    rotation_deg: f32,
) {
    let ctx = session.context();

    ctx.viewport(0, 0, config.width as i32, config.height as i32);
    ctx.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);

    let aspect = config.width as f32 / config.height as f32;
    let projection = Mat4::perspective_rh_gl(45.0 * PI / 180.0, aspect, 0.1, 100.0);
    let model_view = Mat4::from_translation(Vec3::new(0.0, 0.0, -8.0))
        * Mat4::from_rotation_y(rotation_deg * PI / 180.0);

    ctx.bind_buffer(glow::ARRAY_BUFFER, Some(scene.position_buffer));
    ctx.vertex_attrib_pointer(scene.position_attrib, 3, glow::FLOAT, false, 0, 0);

    ctx.bind_buffer(glow::ARRAY_BUFFER, Some(scene.color_buffer));
    ctx.vertex_attrib_pointer(scene.color_attrib, 4, glow::FLOAT, false, 0, 0);

    ctx.uniform_matrix4fv(scene.p_matrix.as_ref(), false, &projection.to_cols_array());
    ctx.uniform_matrix4fv(scene.mv_matrix.as_ref(), false, &model_view.to_cols_array());

    ctx.draw_arrays(glow::TRIANGLES, 0, 3);

    ctx.bind_buffer(glow::ARRAY_BUFFER, None);
}

fn render<S: SurfaceProvider>(
    mut session: Session<S>,
    config: &SurfaceConfig,
    frames: Option<u64>,
    spin: f32,
) -> Result<(), CliError> {
    let scene = init_scene(&mut session)?;

    let mut rotation_deg = 0.0f32;
    let mut rendered: u64 = 0;
    loop {
        if let Some(limit) = frames {
            if rendered >= limit {
                break;
            }
        }
        draw_scene(&mut session, &scene, config, rotation_deg);
        // Exits the process if the window manager asked to close.
        session.present_frame(true);
        rendered += 1;
        rotation_deg = (rotation_deg + spin) % 360.0;
    }

    info!("rendered {rendered} frames, shutting down");

    let ctx = session.context_mut();
    ctx.delete_buffer(scene.position_buffer);
    ctx.delete_buffer(scene.color_buffer);
    ctx.delete_program(scene.program);
    session.shutdown();
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = build_config(&cli)?;

    #[cfg(feature = "backend-x11")]
    let session = webgl_native_core::surface::x11::init(&config)?;
    #[cfg(all(feature = "backend-glutin", not(feature = "backend-x11")))]
    let session = webgl_native_core::surface::glutin::init(&config)?;

    render(session, &config, cli.frames, cli.spin)
}

fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("webgl-native").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_match_the_stock_surface_config() {
        let cli = parse(&[]);
        let config = build_config(&cli).expect("default config builds");
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 720);
        assert!(!config.fullscreen);
        assert_eq!(config.title, "Single Triangle");
        assert_eq!(config.pump, webgl_native_core::PumpMode::Synchronous);
    }

    #[test]
    fn flags_override_config_file_fields() {
        let dir = std::env::temp_dir().join("webgl-native-cli-test");
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("surface.json");
        std::fs::write(&path, r#"{"width": 640, "height": 480, "title": "from file"}"#)
            .expect("write config");

        let path_str = path.to_str().expect("utf-8 path");
        let cli = parse(&["--config", path_str, "-W", "800", "--background"]);
        let config = build_config(&cli).expect("merged config builds");
        assert_eq!(config.width, 800, "flag wins over file");
        assert_eq!(config.height, 480, "file value survives");
        assert_eq!(config.title, "from file");
        assert_eq!(config.pump, webgl_native_core::PumpMode::Background);
    }

    #[test]
    fn malformed_config_json_maps_to_input_error() {
        let dir = std::env::temp_dir().join("webgl-native-cli-test");
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("broken.json");
        std::fs::write(&path, "{not json").expect("write config");

        let path_str = path.to_str().expect("utf-8 path");
        let cli = parse(&["--config", path_str]);
        let err = build_config(&cli).expect_err("malformed JSON rejected");
        assert_eq!(err.exit_code(), 13);
    }

    #[test]
    fn missing_config_file_maps_to_io_error() {
        let cli = parse(&["--config", "/nonexistent/surface.json"]);
        let err = build_config(&cli).expect_err("missing file rejected");
        assert_eq!(err.exit_code(), 12);
    }
}
