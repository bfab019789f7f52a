mod app;
mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use mv_av::{FfprobeProber, ToolRegistry};
use mv_core::config::Config;
use mv_core::OrderId;
use mv_db::pool::get_conn;
use mv_db::queries::{files, orders};
use mv_ingest::stage_upload;

use app::App;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mediavault=debug,mv_ingest=debug,mv_av=debug,mv_db=debug,mv_core=debug".to_string()
        } else {
            "mediavault=info,mv_ingest=info,mv_av=info,mv_db=info,mv_core=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Import { path, name } => {
            let app = App::open(config_path)?;
            block_on(import(&app, &path, name))
        }
        Commands::Attach { order, path, name } => {
            let app = App::open(config_path)?;
            block_on(attach(&app, &order, &path, name))
        }
        Commands::NewOrder { title } => new_order(config_path, &title),
        Commands::Convert { file } => {
            let app = App::open(config_path)?;
            block_on(convert(&app, &file))
        }
        Commands::Refresh { file } => {
            let app = App::open(config_path)?;
            block_on(refresh(&app, &file))
        }
        Commands::Resume => {
            let app = App::open(config_path)?;
            block_on(resume(&app))
        }
        Commands::List { json } => list_files(config_path, json),
        Commands::Probe { file, json } => block_on(probe_file(config_path, &file, json)),
        Commands::CheckTools => check_tools(config_path),
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or_else(|| config_path.map(Path::to_path_buf));
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("mediavault {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn block_on<F: std::future::Future<Output = Result<()>>>(fut: F) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(fut)
}

fn original_name(path: &Path, name: Option<String>) -> String {
    name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    })
}

async fn import(app: &App, path: &Path, name: Option<String>) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("File does not exist: {:?}", path);
    }
    let service = app.service()?;
    let original = original_name(path, name);
    let media_dir = &app.config.storage.media_dir;

    let staged = stage_upload(path, &original, media_dir)
        .await
        .context("staging upload")?;

    let record = {
        let conn = get_conn(&app.db)?;
        files::create_file(
            &conn,
            &media_dir.to_string_lossy(),
            &staged.stored_name,
            &original,
        )?
    };
    println!("Registered {} as {} ({})", original, record.id, staged.kind);

    service.accept(&record.to_entity()).await?;
    service.stop().await;

    print_file(&app.file(&record.id.to_string())?);
    app.print_converted_events();
    Ok(())
}

async fn attach(app: &App, order: &str, path: &Path, name: Option<String>) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("File does not exist: {:?}", path);
    }
    let order_id: OrderId = order
        .parse()
        .with_context(|| format!("invalid order id: {order}"))?;
    {
        let conn = get_conn(&app.db)?;
        if orders::get_order(&conn, order_id)?.is_none() {
            anyhow::bail!("order not found: {order_id}");
        }
    }

    let service = app.service()?;
    let original = original_name(path, name);
    let staged = stage_upload(path, &original, &app.config.storage.media_dir)
        .await
        .context("staging upload")?;

    service.accept_attachment(order_id, &staged)?;
    service.stop().await;

    let conn = get_conn(&app.db)?;
    let attachments = orders::get_attachments(&conn, order_id)?;
    println!("Order {order_id} attachments:");
    for name in &attachments {
        println!("  {name}");
    }
    app.print_converted_events();
    Ok(())
}

fn new_order(config_path: Option<&Path>, title: &str) -> Result<()> {
    let app = App::open(config_path)?;
    let conn = get_conn(&app.db)?;
    let order = orders::create_order(&conn, title)?;
    println!("{}", order.id);
    Ok(())
}

async fn convert(app: &App, file: &str) -> Result<()> {
    let record = app.file(file)?;
    let service = app.service()?;

    service.convert_file(&record.to_entity())?;
    service.stop().await;

    print_file(&app.file(file)?);
    app.print_converted_events();
    Ok(())
}

async fn refresh(app: &App, file: &str) -> Result<()> {
    let record = app.file(file)?;
    let service = app.service()?;

    let meta = service.refresh_metadata(&record.to_entity()).await?;
    println!(
        "{}: {}s, {:.1} MB",
        record.id, meta.duration_secs, meta.size_mb
    );
    Ok(())
}

async fn resume(app: &App) -> Result<()> {
    let pending = {
        let conn = get_conn(&app.db)?;
        files::list_processing_files(&conn)?
    };
    if pending.is_empty() {
        println!("Nothing to resume.");
        return Ok(());
    }

    let service = app.service()?;
    let queued = service.resume(pending.iter().map(|f| f.to_entity()))?;
    println!(
        "Resuming {queued} conversions ({} at a time)...",
        service.pool().capacity()
    );
    service.stop().await;

    app.print_converted_events();
    Ok(())
}

fn print_file(record: &mv_db::models::FileRecord) {
    let entity = record.to_entity();
    let state = if record.ready { "ready" } else { "processing" };
    println!(
        "{}  {:<10}  {:>6}s  {:>7.1} MB  {}  ({})",
        record.id,
        state,
        record.duration_secs,
        record.size_mb,
        record.stored_name,
        if entity.exists() { "on disk" } else { "missing" }
    );
}

fn list_files(config_path: Option<&Path>, json: bool) -> Result<()> {
    let app = App::open(config_path)?;
    let conn = get_conn(&app.db)?;
    let records = files::list_files(&conn)?;

    if json {
        let rows: Vec<serde_json::Value> = records
            .iter()
            .map(|r| {
                let entity = r.to_entity();
                serde_json::json!({
                    "id": r.id,
                    "original_name": r.original_name,
                    "stored_name": r.stored_name,
                    "ready": r.ready,
                    "duration_seconds": r.duration_secs,
                    "size_mb": r.size_mb,
                    "playback_path": entity.resolve_playback_path(),
                    "exists": entity.exists(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No files.");
    }
    for record in &records {
        print_file(record);
    }
    Ok(())
}

async fn probe_file(config_path: Option<&Path>, file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }
    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools);
    let prober = FfprobeProber::from_registry(&tools)?
        .with_timeout(config.conversion.probe_timeout());

    let meta = mv_av::probe_metadata(&prober, file).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
    } else {
        println!("File: {}", file.display());
        let secs = meta.duration_secs;
        println!(
            "Duration: {:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
        println!("Size: {:.1} MB", meta.size_mb);
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Conversions will not run without them.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("reading {}", p.display()))?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Database: {}", config.storage.db_path.display());
    println!("  Media dir: {}", config.storage.media_dir.display());
    println!("  Workers: {}", config.workers.max_concurrency);
    println!(
        "  Video: crf {} preset {} maxrate {} box {}x{}",
        config.conversion.video_crf,
        config.conversion.video_preset,
        config.conversion.video_max_bitrate,
        config.conversion.max_width,
        config.conversion.max_height
    );
    println!("  Audio: {}", config.conversion.audio_bitrate);

    let warnings = config.validate();
    for warning in &warnings {
        println!("  ⚠ {warning}");
    }
    Ok(())
}
