use anyhow::Result;
use clap::{Parser, Subcommand};
use rollcall_client::Config;
use std::path::{Path, PathBuf};

mod controller;
mod shell;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face-recognition attendance client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive attendance kiosk (default)
    Shell,
    /// List available camera devices
    Devices,
    /// Camera diagnostic: capture one still and write it to disk
    Snap {
        /// Output path for the captured JPEG
        #[arg(short, long, default_value = "capture.jpg")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            let controller = shell::camera_controller(&config);
            shell::run(&config, controller).await
        }
        Commands::Devices => {
            let devices = rollcall_hw::list_devices();
            if devices.is_empty() {
                println!("no capture devices found");
            }
            for device in devices {
                println!("{}\t{} ({})", device.path, device.name, device.driver);
            }
            Ok(())
        }
        Commands::Snap { output } => snap(&config, &output).await,
    }
}

/// Start, capture one frame, write it out, stop. Exercises the whole
/// camera path without touching the network.
async fn snap(config: &Config, output: &Path) -> Result<()> {
    let mut controller = shell::camera_controller(config);
    controller.start().await?;
    let image = controller.capture().await?;
    controller.stop().await?;

    std::fs::write(output, &image.jpeg)?;
    println!(
        "wrote {}x{} JPEG ({} bytes) to {}",
        image.width,
        image.height,
        image.jpeg.len(),
        output.display()
    );
    Ok(())
}
