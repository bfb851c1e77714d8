use anyhow::{bail, Context};
use snapcrab::config::SnapCrabConfig;
use snapcrab::platform::desktop::list_cameras;
use snapcrab::platform::{DesktopBackend, InlineDispatcher, PreviewLayer, PreviewSurface};
use snapcrab::session::{CameraSessionController, SessionOptions};
use snapcrab::types::{DevicePosition, SurfaceBounds, VideoOrientation};
use std::env;
use std::sync::Arc;

const USAGE: &str =
    "Usage: snapcrab-cli <list-devices [--json] | capture <back|front> <out.jpg> [--torch]>";

/// No window to draw into; the preview only reports its size
struct HeadlessSurface {
    bounds: SurfaceBounds,
}

impl PreviewSurface for HeadlessSurface {
    fn bounds(&self) -> SurfaceBounds {
        self.bounds
    }

    fn attach_preview(&self, layer: &PreviewLayer) {
        log::debug!("Preview attached ({:?})", layer.gravity);
    }

    fn set_video_orientation(&self, orientation: VideoOrientation) {
        log::debug!("Preview orientation {:?}", orientation);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    snapcrab::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "list-devices" => cmd_list_devices(&args),
        "capture" => cmd_capture(&args).await,
        other => {
            eprintln!("Unknown command: {}\n{}", other, USAGE);
            std::process::exit(1);
        }
    }
}

fn cmd_list_devices(args: &[String]) -> anyhow::Result<()> {
    let devices = list_cameras()?;
    if args.iter().any(|a| a == "--json") {
        println!("{}", serde_json::to_string(&devices)?);
    } else {
        for d in devices {
            println!("{}: {} ({})", d.id, d.name, d.position);
        }
    }
    Ok(())
}

async fn cmd_capture(args: &[String]) -> anyhow::Result<()> {
    if args.len() < 4 {
        bail!("{}", USAGE);
    }
    let position: DevicePosition = args[2].parse().map_err(anyhow::Error::msg)?;
    let output = &args[3];
    let torch = args.iter().any(|a| a == "--torch");

    let config = SnapCrabConfig::load_or_default();
    let [width, height] = config.capture.resolution;
    let surface = Arc::new(HeadlessSurface {
        bounds: SurfaceBounds::new(width as f64, height as f64),
    });
    let backend = Box::new(DesktopBackend::new(config.capture.clone()));
    // No UI thread here; callbacks run on the session queue
    let options = SessionOptions::from(&config)
        .with_position(position)
        .with_dispatcher(Arc::new(InlineDispatcher));

    let camera = CameraSessionController::initialize_with(backend, surface, options)
        .await
        .context("Failed to initialize camera session")?;
    camera.start().await?;

    if torch && camera.has_torch().await? {
        camera.toggle_torch().await?;
    }

    let photo = camera.capture().await.context("Capture failed")?;
    std::fs::write(output, photo.encoded())
        .with_context(|| format!("Failed to write {}", output))?;
    camera.stop().await?;

    println!("{}x{} -> {}", photo.width(), photo.height(), output);
    Ok(())
}
