//! Command implementations.

use std::path::Path;
use std::sync::Arc;

use chrono::SecondsFormat;
use playur_config_and_utils::{Config, Paths};
use rest_queue::{
    decode_snapshot, BackoffPolicy, HttpTransport, Method, PersistedRequest, QueueConfig,
    RequestQueue, RequestRecord, SessionInfo,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Parsed `send` arguments.
pub struct SendArgs {
    pub method: Method,
    pub endpoints: Vec<String>,
    pub urls: Vec<String>,
    pub body: Option<Vec<u8>>,
    pub clear_body: bool,
    pub session: Option<SessionInfo>,
}

/// Session metadata from CLI flags, if any flag was given.
pub fn session_from_flags(
    session_id: Option<i64>,
    game_id: Option<i64>,
    user: Option<String>,
) -> Option<SessionInfo> {
    if session_id.is_none() && game_id.is_none() && user.is_none() {
        return None;
    }
    Some(SessionInfo {
        session_id: session_id.unwrap_or_default(),
        game_id: game_id.unwrap_or_default(),
        user,
    })
}

/// Queue settings derived from the service configuration.
pub fn queue_config(config: &Config, paths: &Paths) -> AppResult<QueueConfig> {
    Ok(QueueConfig {
        server_url: config.server_url()?.to_string(),
        backoff: BackoffPolicy::new(config.initial_backoff(), config.max_backoff()),
        history_capacity: config.history_capacity,
        idle_poll_interval: config.idle_poll_interval(),
        snapshot_path: Some(paths.snapshot_file(&config.snapshot_file_name)),
        ..QueueConfig::default()
    })
}

/// Enqueue the requested calls, drain them on a tokio runtime and flush
/// whatever is left synchronously once the runtime is gone.
pub fn send(config: &Config, paths: &Paths, args: SendArgs) -> AppResult<()> {
    let records = build_records(&args);
    if records.is_empty() {
        return Err("nothing to send: pass --endpoint or --url".into());
    }

    let transport = HttpTransport::new(config.request_timeout())?;
    let queue = Arc::new(RequestQueue::new(
        queue_config(config, paths)?,
        Arc::new(transport),
    ));
    if let Some(session) = args.session {
        queue.set_session(session);
    }

    let expected = records.len();
    for record in records {
        queue.enqueue(record);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let delivered = runtime.block_on(drain(Arc::clone(&queue), expected))?;
    // The blocking flush must not run inside the runtime.
    drop(runtime);

    if queue.pending_len() > 0 {
        let flushed = queue.process_immediate()?;
        for record in queue.history().iter().rev().take(flushed).rev() {
            print_record(record);
        }
    }

    info!(
        delivered,
        history = queue.history_len(),
        snapshot = %paths.snapshot_file(&config.snapshot_file_name).display(),
        "Send finished"
    );
    Ok(())
}

fn build_records(args: &SendArgs) -> Vec<RequestRecord> {
    let endpoints = args
        .endpoints
        .iter()
        .map(|endpoint| RequestRecord::for_endpoint(args.method, endpoint.as_str()));
    let urls = args
        .urls
        .iter()
        .map(|url| RequestRecord::new(args.method, url.as_str()));

    endpoints
        .chain(urls)
        .map(|record| {
            let record = match &args.body {
                Some(body) => record.with_body(body.clone()),
                None => record,
            };
            record.clear_after_completion(args.clear_body)
        })
        .collect()
}

/// Run the drain loop until `expected` requests finished or Ctrl-C.
async fn drain(queue: Arc<RequestQueue>, expected: usize) -> AppResult<usize> {
    let mut rx = queue.subscribe();
    let handle = queue.start_processing();
    let mut finished = 0;

    while finished < expected {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(record) => {
                    print_record(&record);
                    finished += 1;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed finished-request events");
                    finished += skipped as usize;
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                warn!(
                    pending = queue.pending_len(),
                    "Interrupted; remaining requests will be flushed synchronously"
                );
                handle.abort();
                return Ok(finished);
            }
        }
    }

    queue.stop_processing();
    handle.await??;
    Ok(finished)
}

fn print_record(record: &RequestRecord) {
    let response = record.response();
    let line = serde_json::json!({
        "order": record.order(),
        "method": record.method(),
        "url": record.url(),
        "attempts": record.attempts(),
        "status": response.and_then(|r| r.status),
        "network_error": response.map(|r| r.network_error).unwrap_or(false),
        "error": response.and_then(|r| r.error.clone()),
        "body": response.map(|r| r.text().into_owned()),
    });
    println!("{}", line);
}

/// Print a snapshot file.
pub fn inspect(path: &Path, json: bool) -> AppResult<()> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("cannot read snapshot {}: {}", path.display(), e))?;
    let snapshot = decode_snapshot(&bytes)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("Snapshot:   {}", path.display());
    println!(
        "Created:    {}",
        snapshot.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    println!(
        "Session:    {} (game {}, user {})",
        snapshot.session_id,
        snapshot.game_id,
        snapshot.user.as_deref().unwrap_or("-")
    );
    println!();
    println!("Past requests ({}):", snapshot.past_requests.len());
    for request in &snapshot.past_requests {
        println!("  {}", describe(request)?);
    }
    println!("Pending requests ({}):", snapshot.pending_requests.len());
    for request in &snapshot.pending_requests {
        println!("  {}", describe(request)?);
    }
    Ok(())
}

fn describe(request: &PersistedRequest) -> AppResult<String> {
    let outcome = match (request.status, request.network_error) {
        (Some(status), _) => status.to_string(),
        (None, true) => "network error".to_string(),
        (None, false) => "pending".to_string(),
    };
    let body = match request.decode_body()? {
        Some(body) => format!("{} bytes", body.len()),
        None if request.cleared => "cleared".to_string(),
        None => "no body".to_string(),
    };
    Ok(format!(
        "#{:<5} {:<4} {}  [{}; {} attempt(s); {}]",
        request.id,
        request.method,
        request.url.as_deref().unwrap_or("-"),
        outcome,
        request.attempts,
        body
    ))
}

/// Print the effective configuration and resolved paths.
pub fn show_config(config: &Config, paths: &Paths) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    println!();
    println!("Config file: {}", paths.config_file().display());
    println!(
        "Snapshot:    {}",
        paths.snapshot_file(&config.snapshot_file_name).display()
    );
    println!("Logs:        {}", paths.logs_dir().display());
    Ok(())
}
