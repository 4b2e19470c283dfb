use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use batchdl::cli::{parse_header, Args, NotifierKind};
use batchdl::downloader::build_client;
use batchdl::input::{parse_tasks, request_for};
use batchdl::notify::{JsonNotifier, LogNotifier, Notifier, TerminalNotifier};
use batchdl::permission::{
    JsonFlagStore, NotificationPermission, PermissionStatus, PlatformInfo, StaticPrompt,
};
use batchdl::share::{CommandShareSink, PrintShareSink, ShareSink};
use batchdl::{control, logging, Collaborators, DownloadConfig, DownloadRequest, Downloader};

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    // One thread: transfers interleave at I/O points, never run in parallel.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    rt.block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    let requests = load_requests(&args).await?;
    if requests.is_empty() {
        bail!("No downloads found in {:?}", args.tasks_file);
    }

    let mut config = DownloadConfig::default()
        .with_destination(args.download_dir.clone())
        .with_disposition(args.disposition);
    if let Some(dir) = &args.temp_dir {
        config = config.with_temp_dir(dir);
    }

    let prompt = StaticPrompt(if args.deny_notifications {
        PermissionStatus::Denied
    } else {
        PermissionStatus::Granted
    });
    let permission = NotificationPermission::new(
        JsonFlagStore::new(&args.state_file),
        prompt,
        PlatformInfo::Desktop,
    )
    .ensure()
    .await;

    let notifier: Arc<dyn Notifier> = match (permission, args.notifier) {
        (PermissionStatus::Denied, _) | (_, NotifierKind::Log) => Arc::new(LogNotifier),
        (_, NotifierKind::Terminal) => Arc::new(TerminalNotifier::new()),
        (_, NotifierKind::Json) => Arc::new(JsonNotifier::new()),
    };
    let share: Arc<dyn ShareSink> = match &args.share_with {
        Some(program) => Arc::new(
            CommandShareSink::new(program, args.share_args.clone())
                .with_dismiss_code(args.share_dismiss_code),
        ),
        None => Arc::new(PrintShareSink),
    };

    let client = build_client(&config);
    let collaborators = Collaborators::local(&client, &config, notifier, share);
    let downloader = Arc::new(Downloader::with_client(client, config, collaborators));

    let commands = control::spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
    let router = {
        let downloader = downloader.clone();
        tokio::spawn(async move { control::route_commands(commands, &downloader).await })
    };
    downloader.download_batch(requests).await;
    router.abort();

    Ok(())
}

async fn load_requests(args: &Args) -> Result<Vec<DownloadRequest>> {
    if let Some(url) = &args.url {
        let mut request = request_for(url, args.output_name.clone())?;
        request.size = args.size;
        for raw in &args.headers {
            match parse_header(raw) {
                Some((name, value)) => request = request.with_header(name, value),
                None => bail!("Invalid header {:?}, expected `Name: value`", raw),
            }
        }
        return Ok(vec![request]);
    }

    let content = tokio::fs::read_to_string(&args.tasks_file)
        .await
        .context(format!("Failed to open tasks file: {:?}", args.tasks_file))?;
    let requests = parse_tasks(&args.tasks_file, &content)
        .context(format!("Failed to parse tasks file: {:?}", args.tasks_file))?;
    info!(count = requests.len(), "loaded download list");
    Ok(requests)
}
