//! ws-verify: authenticate the exchange's signed WebSocket streams.
//!
//! ## Usage
//!
//! ```bash
//! # Subscribe to order events (default) with the key from HMAC_SECRET
//! ws-verify
//!
//! # Order book of one market, stop at the first bad message
//! ws-verify --strict listen book/epex_at
//!
//! # Check a captured session offline
//! ws-verify verify capture.ndjson
//!
//! # Produce a signed frame
//! ws-verify sign '{"type":"order_ack"}'
//!
//! # Compare local key fingerprints with the exchange's
//! ws-verify keys --remote
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ws_auth::{load_key_ring_from_env, CanonicalForm, KeyRing, MessageAuthenticator, Timestamp};
use ws_verify::{
    compare, sign_frame, ClientConfig, DiscoveryClient, FailurePolicy, FrameHandler, FrameSource,
    LineSource, Stream, WsClient,
};

/// Verify HMAC-signed exchange stream messages
#[derive(Parser, Debug)]
#[command(name = "ws-verify")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket base URL [env: EXCHANGE_WS_URL]
    #[arg(long, global = true)]
    ws_url: Option<String>,

    /// HTTP base URL for key discovery [env: EXCHANGE_URL]
    #[arg(long, global = true)]
    http_url: Option<String>,

    /// API key for the subscription [env: API_KEY]
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Canonical form of the signed payload: compact or verbatim
    #[arg(long, global = true)]
    form: Option<CanonicalForm>,

    /// Stop at the first malformed or unauthenticated message
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Subscribe to a stream and authenticate every message (default)
    Listen {
        /// orders, trades or book/<market>
        #[arg(default_value = "orders")]
        stream: Stream,
    },
    /// Authenticate newline-delimited frames from a file or stdin
    Verify {
        /// Input file; stdin when omitted
        file: Option<PathBuf>,
    },
    /// Sign a JSON payload and print the resulting frame
    Sign {
        /// JSON payload; read from stdin when omitted
        data: Option<String>,

        /// Timestamp; current time in milliseconds when omitted
        #[arg(long)]
        ts: Option<String>,

        /// Key to sign with; the active key when omitted
        #[arg(long)]
        key_id: Option<String>,
    },
    /// List local key fingerprints
    Keys {
        /// Compare with the exchange's /.well-known/ws-keys
        #[arg(long)]
        remote: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args);
    let ring = load_key_ring_from_env().context("Failed to load HMAC keys")?;
    config.validate(&ring).context("Invalid configuration")?;

    match args.command {
        None => listen(config, ring, Stream::Orders).await,
        Some(Command::Listen { stream }) => listen(config, ring, stream).await,
        Some(Command::Verify { file }) => verify(config, ring, file).await,
        Some(Command::Sign { data, ts, key_id }) => sign_payload(&ring, data, ts, key_id).await,
        Some(Command::Keys { remote }) => keys(&config, &ring, remote).await,
    }
}

/// Defaults, then environment, then flags.
fn build_config(args: &Args) -> ClientConfig {
    let mut config = ClientConfig::from_env();
    if let Some(url) = &args.ws_url {
        config.ws_url = url.clone();
    }
    if let Some(url) = &args.http_url {
        config.http_url = url.clone();
    }
    if let Some(key) = &args.api_key {
        config.api_key = key.clone();
    }
    if let Some(form) = args.form {
        config.form = form;
    }
    if args.strict {
        config.policy = FailurePolicy::Strict;
    }
    config
}

fn handler(
    config: &ClientConfig,
    ring: KeyRing,
) -> FrameHandler<MessageAuthenticator<Arc<KeyRing>>, std::io::Stdout> {
    let authenticator = MessageAuthenticator::with_form(Arc::new(ring), config.form);
    FrameHandler::new(authenticator, std::io::stdout(), config.policy)
}

/// Runs `source` through the handler until it ends, fails, or Ctrl+C.
async fn drive(config: &ClientConfig, ring: KeyRing, source: &mut dyn FrameSource) -> Result<()> {
    let mut handler = handler(config, ring);

    let outcome = tokio::select! {
        result = handler.run(source) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match outcome {
        Some(result) => {
            result?;
        }
        None => {
            info!("Interrupted");
            handler.log_summary();
        }
    }
    Ok(())
}

async fn listen(mut config: ClientConfig, ring: KeyRing, stream: Stream) -> Result<()> {
    config.stream = stream;
    let endpoint = config.endpoint()?;
    let shown = config.redacted_endpoint()?;
    info!(
        endpoint = %shown,
        form = ?config.form,
        policy = ?config.policy,
        active_key = ring.active_kid(),
        "Subscribing"
    );

    let mut client = WsClient::connect(&endpoint)
        .await
        .with_context(|| format!("Failed to connect to {shown}"))?;

    let result = drive(&config, ring, &mut client).await;
    client.close().await;
    result
}

async fn verify(config: ClientConfig, ring: KeyRing, file: Option<PathBuf>) -> Result<()> {
    let mut source: Box<dyn FrameSource> = match &file {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(LineSource::new(BufReader::new(file)))
        }
        None => Box::new(LineSource::new(BufReader::new(tokio::io::stdin()))),
    };
    drive(&config, ring, source.as_mut()).await
}

async fn sign_payload(
    ring: &KeyRing,
    data: Option<String>,
    ts: Option<String>,
    key_id: Option<String>,
) -> Result<()> {
    let raw = match data {
        Some(raw) => raw,
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("Failed to read payload from stdin")?;
            raw
        }
    };
    let data: Value = serde_json::from_str(&raw).context("Payload is not valid JSON")?;

    let ts = ts.map(Timestamp::Text).unwrap_or_else(Timestamp::now_millis);

    let frame = sign_frame(ring, key_id.as_deref(), ts, &data)?;
    println!("{frame}");
    Ok(())
}

async fn keys(config: &ClientConfig, ring: &KeyRing, remote: bool) -> Result<()> {
    if !remote {
        for (kid, fingerprint) in ring.fingerprints() {
            let marker = if kid == ring.active_kid() { " (active)" } else { "" };
            println!("{kid} {fingerprint}{marker}");
        }
        return Ok(());
    }

    let client = DiscoveryClient::new(&config.http_url)?;
    let document = client
        .fetch()
        .await
        .with_context(|| format!("Failed to fetch {}", config.http_url))?;
    let report = compare(ring, &document);

    for key in &report.keys {
        println!("{} {}", key.kid, key.status);
    }
    println!(
        "active: local {} remote {}",
        report.local_active,
        report.remote_active.as_deref().unwrap_or("-")
    );

    if report.has_mismatch() {
        bail!("Key fingerprints differ from the exchange");
    }
    if !report.active_verifiable() {
        warn!("The exchange's active key is not in the local key ring");
    }
    Ok(())
}
