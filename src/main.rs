//! Image Mapper - slice an image along its HTML image map into a responsive
//! email template.
//!
//! This binary starts the HTTP server and provides offline tooling.

use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use imagemapper::{
    config::{CheckConfig, Cli, Command, ServeConfig, SliceConfig},
    map::parse_map_report,
    pipeline::{slice_regions, DataLayout, ProcessService},
    server::{create_router, RouterConfig},
    slice::slice_file_name,
    store::{Destination, ImageStore, StoreStatus, Uploader},
    template::{render_email, EmailSlice},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Slice(config) => run_slice(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    let storage = &config.storage;
    info!("Configuration:");
    info!("  Data directory: {}", config.data_dir.display());
    info!(
        "  Max upload: {:.1} MB",
        config.max_upload_bytes as f64 / (1024.0 * 1024.0)
    );
    info!("  Upload destination: {}", storage.upload_dest);
    info!(
        "  Local slices: {} -> {}",
        storage.local_static_dir.display(),
        storage.local_url_prefix
    );
    match storage.bucket() {
        Some(bucket) => {
            info!("  S3 bucket: {}", bucket);
            if let Some(ref endpoint) = storage.s3_endpoint {
                info!("  S3 endpoint: {}", endpoint);
            }
            info!("  S3 region: {}", storage.s3_region);
            info!("  S3 folder: {}", storage.s3_folder);
        }
        None => info!("  S3: not configured"),
    }

    let layout = DataLayout::new(&config.data_dir);
    if let Err(e) = layout.ensure().await {
        error!(
            "Failed to create data directory {}: {}",
            config.data_dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let uploader = Uploader::from_config(&storage.to_store_config()).await;

    info!("");
    info!("Checking storage...");
    log_storage_status(&uploader.status().await);

    let router_config = build_router_config(&config);
    let router = create_router(ProcessService::new(uploader, layout), router_config);

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Open the upload form:");
    info!("    open http://{}/", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/debug/storage", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("██╗███╗   ███╗ █████╗  ██████╗ ███████╗");
    info!("██║████╗ ████║██╔══██╗██╔════╝ ██╔════╝");
    info!("██║██╔████╔██║███████║██║  ███╗█████╗  ");
    info!("██║██║╚██╔╝██║██╔══██║██║   ██║██╔══╝  ");
    info!("██║██║ ╚═╝ ██║██║  ██║╚██████╔╝███████╗");
    info!("╚═╝╚═╝     ╚═╝╚═╝  ╚═╝ ╚═════╝ ╚══════╝");
    info!("                 MAPPER            v{}", version);
    info!("");
}

fn log_storage_status(status: &StoreStatus) {
    if status.remote_reachable || !status.remote_configured {
        info!("  {}", status.message);
    } else {
        warn!("  {}", status.message);
        if status.destination == Destination::Remote {
            warn!("  Uploads will fail until the bucket is reachable.");
            warn!("  Please check:");
            warn!("    - Your AWS credentials are configured correctly");
            warn!("    - The bucket exists and is accessible");
            warn!("    - The S3 endpoint is correct (if using MinIO/custom S3)");
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "imagemapper=debug,tower_http=debug"
    } else {
        "imagemapper=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_max_upload_bytes(config.max_upload_bytes)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    // Slices stored locally are referenced by relative URL and must be
    // served by this process
    if config.storage.serves_local_files() {
        router_config = router_config.with_static_files(
            config.storage.local_url_prefix.clone(),
            config.storage.local_static_dir.clone(),
        );
    }

    router_config
}

// =============================================================================
// Slice Command
// =============================================================================

async fn run_slice(config: SliceConfig) -> ExitCode {
    init_logging(config.verbose);

    let map_html = match tokio::fs::read_to_string(&config.map).await {
        Ok(html) => html,
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", config.map.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let report = parse_map_report(&map_html);
    for skipped in &report.skipped {
        println!("- area #{} skipped: {}", skipped.position + 1, skipped.reason);
    }
    if report.is_empty() {
        eprintln!("Error: no valid area tags found in {}", config.map.display());
        return ExitCode::FAILURE;
    }

    if let Err(e) = tokio::fs::create_dir_all(&config.output).await {
        eprintln!("Error: cannot create {}: {}", config.output.display(), e);
        return ExitCode::FAILURE;
    }

    let paths = match slice_regions(&config.image, &report.regions, &config.output).await {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut slices = Vec::with_capacity(paths.len());
    for (index, (region, path)) in report.regions.iter().zip(&paths).enumerate() {
        println!("✓ {} {}", region.coords, path.display());
        slices.push(EmailSlice::from_region(region, slice_file_name(index)));
    }

    if config.html {
        let path = config.output.join("email_template.html");
        if let Err(e) = tokio::fs::write(&path, render_email(&slices)).await {
            eprintln!("Error: cannot write {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
        println!("✓ {}", path.display());
    }

    println!();
    println!(
        "{} slice(s) written to {}",
        slices.len(),
        config.output.display()
    );

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    // Initialize minimal logging for check command
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.storage.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let uploader = Uploader::from_config(&config.storage.to_store_config()).await;
    let status = uploader.status().await;

    let probe = if config.probe {
        Some(run_probe(&uploader).await)
    } else {
        None
    };

    let healthy = match status.destination {
        Destination::Remote => status.remote_reachable,
        _ => true,
    } && probe.as_ref().map_or(true, |p| p.is_ok());

    if config.json {
        let json = serde_json::json!({
            "status": status,
            "probe": probe.as_ref().map(|p| match p {
                Ok(url) => serde_json::json!({ "ok": true, "url": url }),
                Err(e) => serde_json::json!({ "ok": false, "error": e }),
            }),
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_check_report(&config, &status, probe.as_ref());
    }

    if healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_check_report(
    config: &CheckConfig,
    status: &StoreStatus,
    probe: Option<&Result<String, String>>,
) {
    let storage = &config.storage;

    println!("Image Mapper Storage Check");
    println!("═════════════════════════════════");
    println!();
    println!("✓ Destination: {}", status.destination);
    println!(
        "✓ Local: {} -> {}",
        storage.local_static_dir.display(),
        storage.local_url_prefix
    );

    match storage.bucket() {
        Some(bucket) => {
            println!("✓ Bucket: {}", bucket);
            if let Some(ref endpoint) = storage.s3_endpoint {
                println!("✓ Endpoint: {}", endpoint);
            }
            println!("✓ Region: {}", storage.s3_region);
            let mark = if status.remote_reachable { "✓" } else { "✗" };
            println!("{} Reachable: {}", mark, status.remote_reachable);
        }
        None => println!("- Bucket: not configured"),
    }

    println!();
    println!("{}", status.message);

    if let Some(probe) = probe {
        println!();
        match probe {
            Ok(url) => println!("✓ Probe upload: {}", url),
            Err(e) => println!("✗ Probe upload failed: {}", e),
        }
    }
}

/// Publish a generated 16x16 PNG through the uploader, then remove it again.
async fn run_probe(uploader: &Uploader) -> Result<String, String> {
    let public_id = format!("probe_{}", Uuid::new_v4());
    let path = std::env::temp_dir().join(format!("{}.png", public_id));

    let probe_path = path.clone();
    tokio::task::spawn_blocking(move || {
        image::RgbImage::from_pixel(16, 16, image::Rgb([37, 99, 235])).save(&probe_path)
    })
    .await
    .map_err(|e| e.to_string())?
    .map_err(|e| format!("cannot create probe image: {}", e))?;

    let result = uploader
        .store(&path, &public_id)
        .await
        .map_err(|e| e.to_string());
    remove_quietly(&path).await;

    let url = result?;

    // Clean up wherever the probe landed
    if url.starts_with(uploader.local().url_prefix()) {
        remove_quietly(&uploader.local().dir().join(format!("{}.png", public_id))).await;
    } else if let Some(remote) = uploader.remote() {
        if let Err(e) = remote.delete(&public_id).await {
            warn!("Failed to delete probe object: {}", e);
        }
    }

    Ok(url)
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}
