use crate::{
    client::{ReportClient, ReportOptions, ReportOutcome, SaintOutcome},
    config::{Config, OutputFormat},
    flatten,
    model::{DateGranularity, RawReportResult, ReportDescription},
    saint,
    table::Table,
    transport::HttpTransport,
    util::{ensure_dir, now_rfc3339, sha256_hex},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sitecat")]
#[command(about = "SiteCatalyst reporting API client (queue, poll, flatten)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./sitecat.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Queue a report, wait for it and write it as a table.
    Report {
        #[arg(long)]
        suite: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long = "metric", required = true)]
        metrics: Vec<String>,
        #[arg(long = "element")]
        elements: Vec<String>,
        #[arg(long, value_enum, default_value_t = DateGranularity::Day)]
        granularity: DateGranularity,
        #[arg(long)]
        segment: Option<String>,
        #[arg(long)]
        queue_only: bool,
        #[arg(long)]
        max_checks: Option<u32>,
        #[arg(long)]
        interval: Option<u64>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run a SAINT classification export from a JSON request file.
    Saint {
        #[arg(long)]
        request: PathBuf,
        #[arg(long)]
        only_unclassified: bool,
        #[arg(long)]
        queue_only: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Probe a previously queued job once.
    Status {
        #[arg(long)]
        id: String,
        #[arg(long)]
        saint: bool,
    },
    /// Flatten a raw report JSON file without touching the network.
    Flatten {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print a freshly signed X-WSSE header.
    Sign {},
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(p) => Config::load(&p)?,
        None => Config::default(),
    };
    let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg).as_deref())?;

    match args.cmd {
        Command::Report {
            suite,
            from,
            to,
            metrics,
            elements,
            granularity,
            segment,
            queue_only,
            max_checks,
            interval,
            out,
        } => {
            let mut description = ReportDescription::new(&suite, &from, &to, &metrics)?
                .with_granularity(granularity)
                .with_elements(&elements);
            if let Some(seg) = segment {
                description = description.with_segment(seg);
            }
            let mut options = cfg.report_options();
            options.queue_only = queue_only;
            if let Some(n) = max_checks {
                options.max_queue_checks = n;
            }
            if let Some(secs) = interval {
                options.queue_check_interval = Duration::from_secs(secs);
            }
            report(&cfg, &description, &options, out.as_deref())
        }
        Command::Saint {
            request,
            only_unclassified,
            queue_only,
            out,
        } => saint_export(&cfg, &request, only_unclassified, queue_only, out.as_deref()),
        Command::Status { id, saint } => status(&cfg, &id, saint),
        Command::Flatten { input, out } => flatten_file(&cfg, &input, out.as_deref()),
        Command::Sign {} => {
            let client = build_client(&cfg)?;
            for (k, v) in client.sign_request("Company.GetTokenCount", "") {
                println!("{k}: {v}");
            }
            Ok(())
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("sitecat.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.output.dir).join("sitecat.log"))
}

fn build_client(cfg: &Config) -> Result<ReportClient<HttpTransport>> {
    let creds = cfg.credentials()?;
    let transport = HttpTransport::new(Duration::from_secs(cfg.api.request_timeout_seconds))
        .with_context(|| "building HTTP client")?;
    let client = ReportClient::new(creds, transport, cfg.api.version)
        .with_endpoint(cfg.endpoint())
        .with_transport_attempts(cfg.api.max_transport_attempts)
        .with_submit_attempts(cfg.api.submit_attempts);
    debug!(endpoint = client.endpoint(), version = ?cfg.api.version, "client ready");
    Ok(client)
}

fn report(
    cfg: &Config,
    description: &ReportDescription,
    options: &ReportOptions,
    out: Option<&Path>,
) -> Result<()> {
    let client = build_client(cfg)?;
    let stem = request_stem("report", &serde_json::to_vec(description)?);
    info!("report {} {}..{}", description.report_suite_id, description.date_from, description.date_to);

    let started = now_rfc3339();
    let raw = match client.get_report(description, options)? {
        ReportOutcome::Queued(id) => return print_queued(cfg, "report", &id),
        ReportOutcome::Finished(raw) => raw,
    };
    if cfg.output.write_raw_json {
        write_raw(cfg, &stem, &raw)?;
    }
    let table = flatten::flatten(&raw).with_context(|| "flattening report")?;
    let path = write_table(cfg, &table, out, &stem)?;
    print_summary(cfg, &started, &path, &table)
}

fn saint_export(
    cfg: &Config,
    request: &Path,
    only_unclassified: bool,
    queue_only: bool,
    out: Option<&Path>,
) -> Result<()> {
    let raw = std::fs::read_to_string(request)
        .with_context(|| format!("reading SAINT request: {}", request.display()))?;
    let request_data: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| "parsing SAINT request JSON")?;
    let client = build_client(cfg)?;
    let stem = request_stem("saint", raw.as_bytes());

    let mut options = cfg.report_options();
    options.queue_only = queue_only;

    let started = now_rfc3339();
    let segments = match client.get_saint_export(&request_data, &options)? {
        SaintOutcome::Queued(id) => return print_queued(cfg, "saint_export", &id),
        SaintOutcome::Finished(segments) => segments,
    };
    if cfg.output.write_raw_json {
        write_raw(cfg, &stem, &segments)?;
    }
    let table = saint::table_from_segments(&segments, only_unclassified)?;
    let path = write_table(cfg, &table, out, &stem)?;
    print_summary(cfg, &started, &path, &table)
}

fn status(cfg: &Config, id: &str, saint: bool) -> Result<()> {
    let client = build_client(cfg)?;
    let label = if saint {
        client.poll_saint_status(id)?.label()
    } else {
        client.poll_report_status(id)?.label()
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({ "id": id, "status": label }))?
    );
    Ok(())
}

fn flatten_file(cfg: &Config, input: &Path, out: Option<&Path>) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("reading raw report: {}", input.display()))?;
    let body: serde_json::Value = serde_json::from_str(&raw).with_context(|| "parsing raw report JSON")?;
    let report = RawReportResult::from_response(body)?;
    let started = now_rfc3339();
    let table = flatten::flatten(&report)?;
    let stem = request_stem("flatten", raw.as_bytes());
    let path = write_table(cfg, &table, out, &stem)?;
    print_summary(cfg, &started, &path, &table)
}

fn request_stem(kind: &str, bytes: &[u8]) -> String {
    let digest = sha256_hex(bytes);
    format!("{kind}-{}", &digest[..16])
}

fn write_raw<S: serde::Serialize>(cfg: &Config, stem: &str, value: &S) -> Result<()> {
    let dir = PathBuf::from(&cfg.output.dir);
    ensure_dir(&dir)?;
    let path = dir.join(format!("{stem}.raw.json"));
    std::fs::write(&path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn write_table(cfg: &Config, table: &Table, out: Option<&Path>, stem: &str) -> Result<PathBuf> {
    let path = out.map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(&cfg.output.dir).join(format!("{stem}.{}", cfg.output.format.extension()))
    });
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    let file = std::fs::File::create(&path)
        .with_context(|| format!("create output: {}", path.display()))?;
    let mut w = BufWriter::new(file);
    match cfg.output.format {
        OutputFormat::Csv => table.write_csv(&mut w)?,
        OutputFormat::Json => serde_json::to_writer_pretty(&mut w, &table.to_records())?,
    }
    w.flush()?;
    Ok(path)
}

fn print_queued(cfg: &Config, kind: &str, id: &str) -> Result<()> {
    if cfg.output.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "kind": kind,
                "job_id": id,
                "status": "queued"
            }))?
        );
    }
    Ok(())
}

fn print_summary(cfg: &Config, started: &str, path: &Path, table: &Table) -> Result<()> {
    if cfg.output.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "started": started,
                "finished": now_rfc3339(),
                "output": path,
                "rows": table.len(),
                "columns": table.columns(),
                "status": "ok"
            }))?
        );
    }
    Ok(())
}
