use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use base64::prelude::*;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser)]
#[command(name = "facefit", about = "Facefit remote-control client")]
struct Cli {
    /// Daemon address (also FACEFIT_ADDR).
    #[arg(long)]
    addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a photo as the fitting target
    SetTarget {
        /// Path to a PNG or JPEG photo
        image: PathBuf,
    },
    /// Print the current live landmarks
    Landmarks,
    /// Run one fitting sweep toward the target
    Approach {
        /// Step size for each control probe
        #[arg(short, long, default_value_t = 1.0)]
        step: f64,
        /// Modifier names to fit; repeat for several, omit for all
        #[arg(short, long = "modifier")]
        modifiers: Vec<String>,
    },
    /// Search for the target rotation that best matches the live face
    Align,
    /// Read a modifier value ("all" for every modifier)
    Get { name: String },
    /// Set a modifier value and apply it
    Set { name: String, power: f64 },
    /// Set several modifiers from a JSON name-to-power map, then apply once
    SetAll { powers: String },
    /// List the host's available modifier names
    Names,
    /// List the host's applied targets
    Targets,
    /// Capture the rendered frame
    Snapshot {
        /// Write the frame as PNG instead of printing its shape
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Reset the host camera and character pose
    ResetCamera,
    /// Maximize the host window
    MaximizeWindow,
}

async fn call(addr: &str, function: &str, params: Value) -> Result<Value> {
    let mut request = json!({"function": function});
    if let (Some(obj), Some(extra)) = (request.as_object_mut(), params.as_object()) {
        for (k, v) in extra {
            obj.insert(k.clone(), v.clone());
        }
    }

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;
    let (reader, mut writer) = stream.into_split();

    let mut line = serde_json::to_string(&request)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;

    let mut lines = BufReader::new(reader).lines();
    let reply = lines
        .next_line()
        .await?
        .context("daemon closed the connection")?;
    let reply: Value = serde_json::from_str(&reply)?;

    if let Some(error) = reply.get("error").and_then(Value::as_str) {
        bail!("{error}");
    }
    reply
        .get("data")
        .cloned()
        .context("daemon reply carried no data")
}

fn save_wire_image(data: &Value, out: &PathBuf) -> Result<()> {
    let shape = data
        .get("shape")
        .and_then(Value::as_array)
        .context("missing image shape")?;
    let dim = |i: usize| -> Result<u32> {
        Ok(shape.get(i).and_then(Value::as_u64).context("bad shape")? as u32)
    };
    let (height, width, channels) = (dim(0)?, dim(1)?, dim(2)?);
    if channels != 3 {
        bail!("expected a 3-channel frame, got {channels}");
    }
    let pixels = BASE64_STANDARD.decode(
        data.get("data")
            .and_then(Value::as_str)
            .context("missing image data")?,
    )?;
    let img = image::RgbImage::from_raw(width, height, pixels)
        .context("frame size does not match its shape")?;
    img.save(out)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let addr = cli
        .addr
        .or_else(|| std::env::var("FACEFIT_ADDR").ok())
        .unwrap_or_else(|| "127.0.0.1:12345".to_string());

    match cli.command {
        Commands::SetTarget { image } => {
            let bytes = std::fs::read(&image)
                .with_context(|| format!("failed to read {}", image.display()))?;
            let data = call(
                &addr,
                "setTarget",
                json!({"data": BASE64_STANDARD.encode(bytes)}),
            )
            .await?;
            println!("target set, canvas shape {}", data["shape"]);
        }
        Commands::Landmarks => {
            let data = call(&addr, "landmarks", json!({})).await?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Commands::Approach { step, modifiers } => {
            let modifiers: Value = if modifiers.is_empty() {
                json!("all")
            } else {
                json!(modifiers)
            };
            let data = call(
                &addr,
                "approachTarget",
                json!({"step": step, "modifiers": modifiers}),
            )
            .await?;
            println!("changed {} loss {}", data["count"], data["loss"]);
        }
        Commands::Align => {
            let data = call(&addr, "optimizeTargetRotation", json!({})).await?;
            println!("angle {} loss {}", data["angle"], data["loss"]);
        }
        Commands::Get { name } => {
            let data = call(&addr, "getModifierValue", json!({"modifier": name})).await?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Commands::Set { name, power } => {
            call(
                &addr,
                "applyModifier",
                json!({"modifier": name, "power": power}),
            )
            .await?;
            println!("OK");
        }
        Commands::SetAll { powers } => {
            let powers: Value =
                serde_json::from_str(&powers).context("powers must be a JSON object")?;
            if !powers.is_object() {
                bail!("powers must be a JSON object");
            }
            call(
                &addr,
                "applyModifier",
                json!({"modifier": "all", "power": powers}),
            )
            .await?;
            println!("OK");
        }
        Commands::Names => {
            let data = call(&addr, "getAvailableModifierNames", json!({})).await?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Commands::Targets => {
            let data = call(&addr, "getAppliedTargets", json!({})).await?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Commands::Snapshot { out } => {
            let data = call(&addr, "snapshot", json!({})).await?;
            match out {
                Some(path) => {
                    save_wire_image(&data, &path)?;
                    println!("saved {}", path.display());
                }
                None => println!("frame shape {}", data["shape"]),
            }
        }
        Commands::ResetCamera => {
            call(&addr, "resetCamera", json!({})).await?;
            println!("OK");
        }
        Commands::MaximizeWindow => {
            call(&addr, "maximizeWindow", json!({})).await?;
            println!("OK");
        }
    }

    Ok(())
}
