//! Vehreg CLI - registry session against a JSON-RPC node
//!
//! Every command connects first (authorize, reconcile the network, load the
//! registry) and prints JSON:
//!   vehreg status                    → session snapshot
//!   vehreg list                      → [{index, ownerName, carModel}, ...]
//!   vehreg register <owner> <model>  → receipt of the confirmed registration
//!   vehreg watch                     → one snapshot line per wallet event
//!   vehreg serve                     → HTTP API (see `vehreg::server`)
//!
//! Configuration:
//!   VEHREG_RPC_URL, VEHREG_CONTRACT, VEHREG_CHAIN_ID, VEHREG_CHAIN_NAME,
//!   VEHREG_POLL_MS (also read from `.env`), overridden by flags.
//!
//! Output format:
//!   --json     Output raw JSON (default for non-tty)
//!   --pretty   Pretty-print JSON (default for tty)

use serde_json::{json, Value};
use std::env;
use std::io::IsTerminal;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use vehreg::logging::init_logging;
use vehreg::{
    install_signal_handlers, Address, ChainId, ContractConnector, EventPoller, HttpSession, HttpTransport,
    ProviderWallet, SessionConfig, SessionManager,
};

const DEFAULT_PORT: u16 = 8080;

fn main() {
    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);
    init_logging();

    if opts.help {
        print_usage();
        return;
    }

    if opts.version {
        println!("vehreg {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        Some("status") => run(&opts, cmd_status),
        Some("list") | Some("ls") => run(&opts, cmd_list),
        Some("register") => run(&opts, cmd_register),
        Some("watch") => run(&opts, cmd_watch),
        Some("serve") => run(&opts, cmd_serve),
        Some(cmd) => Err(format!("Unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    match result {
        Ok(Value::Null) => {}
        Ok(output) => println!("{}", format_json(&opts, &output)),
        Err(e) => {
            eprintln!("{}", format_json(&opts, &json!({"error": e})));
            std::process::exit(1);
        }
    }
}

fn format_json(opts: &ParsedArgs, value: &Value) -> String {
    let pretty = !opts.json && (opts.pretty || std::io::stdout().is_terminal());
    let formatted = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    formatted.unwrap_or_else(|_| value.to_string())
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    args: Vec<String>,
    // Connection options
    rpc_url: Option<String>,
    contract: Option<String>,
    chain_id: Option<String>,
    // Server options
    port: Option<u16>,
    // Output options
    json: bool,
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        load_dotenv();

        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut i = 0;

        while i < args.len() {
            let arg = &args[i];
            let value = args.get(i + 1).cloned();
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--json" => opts.json = true,
                "--pretty" => opts.pretty = true,
                "--rpc" | "-r" => {
                    opts.rpc_url = value;
                    i += 1;
                }
                "--contract" | "-c" => {
                    opts.contract = value;
                    i += 1;
                }
                "--chain-id" => {
                    opts.chain_id = value;
                    i += 1;
                }
                "--port" | "-p" => {
                    opts.port = value.and_then(|v| v.parse().ok());
                    i += 1;
                }
                _ if !arg.starts_with('-') => positional.push(arg.clone()),
                _ => {} // Ignore unknown flags
            }
            i += 1;
        }

        // First positional is command, the rest are its arguments
        if !positional.is_empty() {
            opts.command = Some(positional.remove(0));
        }
        opts.args = positional;

        if opts.port.is_none() {
            opts.port = env::var("VEHREG_PORT").ok().and_then(|p| p.parse().ok());
        }

        opts
    }

    /// Environment first, flags on top.
    fn config(&self) -> Result<SessionConfig, String> {
        let mut config = SessionConfig::from_env().map_err(|e| e.to_string())?;
        if let Some(url) = &self.rpc_url {
            config = config.with_rpc_url(url.clone());
        }
        if let Some(raw) = &self.contract {
            config = config.with_contract(Address::parse(raw).map_err(|e| format!("--contract: {}", e))?);
        }
        if let Some(raw) = &self.chain_id {
            config = config.with_chain_id(ChainId::parse(raw).map_err(|e| format!("--chain-id: {}", e))?);
        }
        Ok(config)
    }
}

/// Fill unset variables from `./.env`.
fn load_dotenv() {
    let Ok(contents) = std::fs::read_to_string(".env") else { return };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"');
            if !value.is_empty() && env::var(key.trim()).is_err() {
                env::set_var(key.trim(), value);
            }
        }
    }
}

fn print_usage() {
    println!(
        r#"vehreg - Car registry session over a wallet

USAGE:
    vehreg <command> [args] [options]

COMMANDS:
    status                      Connect and print the session snapshot
    list                        Connect and print all registry entries
    register <owner> <model>    Register a car and wait for confirmation
    watch                       Follow account and network changes
    serve                       Start HTTP server

CONNECTION OPTIONS:
    --rpc, -r <url>             Node URL (env: VEHREG_RPC_URL, default: http://127.0.0.1:8545)
    --contract, -c <address>    Registry contract (env: VEHREG_CONTRACT)
    --chain-id <id>             Required chain, hex or decimal (env: VEHREG_CHAIN_ID, default: 31337)

SERVER OPTIONS:
    --port, -p <port>           Server port (default: 8080, env: VEHREG_PORT)

OUTPUT OPTIONS:
    --json                      Raw JSON output
    --pretty                    Pretty-print JSON
    --version, -V               Print version

LOGGING:
    RUST_LOG=vehreg=debug       Filter log output (stderr)
    VEHREG_LOG_JSON=1           JSON log lines
"#
    );
}

// =============================================================================
// Commands
// =============================================================================

struct Context {
    session: Arc<HttpSession>,
    transport: Arc<HttpTransport>,
}

fn build_context(opts: &ParsedArgs) -> Result<Context, String> {
    let config = opts.config()?;
    let transport = Arc::new(HttpTransport::new(config.rpc_url()));
    let connector = ContractConnector::new(transport.clone(), config.poll_interval);
    let wallet = ProviderWallet::new(transport.clone());
    let session = Arc::new(SessionManager::new(Some(wallet), connector, config));
    Ok(Context { session, transport })
}

/// Build the session, then drive `command` on a fresh runtime.
fn run<F, Fut>(opts: &ParsedArgs, command: F) -> Result<Value, String>
where
    F: FnOnce(Context, Vec<String>, Option<u16>) -> Fut,
    Fut: std::future::Future<Output = Result<Value, String>>,
{
    let ctx = build_context(opts)?;
    let rt = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create runtime: {}", e))?;
    rt.block_on(command(ctx, opts.args.clone(), opts.port))
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

async fn cmd_status(ctx: Context, _: Vec<String>, _: Option<u16>) -> Result<Value, String> {
    ctx.session.establish_binding().await.map_err(|e| e.to_string())?;
    to_value(&ctx.session.snapshot())
}

async fn cmd_list(ctx: Context, _: Vec<String>, _: Option<u16>) -> Result<Value, String> {
    ctx.session.establish_binding().await.map_err(|e| e.to_string())?;
    to_value(&ctx.session.snapshot().entries)
}

async fn cmd_register(ctx: Context, args: Vec<String>, _: Option<u16>) -> Result<Value, String> {
    let (owner, model) = match args.as_slice() {
        [owner, model, ..] => (owner, model),
        _ => return Err("Usage: vehreg register <owner> <model>".into()),
    };
    ctx.session.establish_binding().await.map_err(|e| e.to_string())?;
    let receipt = ctx.session.submit_entry(owner, model).await.map_err(|e| e.to_string())?;
    Ok(json!({
        "transactionHash": receipt.transaction_hash,
        "blockNumber": receipt.block_number,
        "entry": receipt.registered,
        "count": ctx.session.snapshot().entries.len(),
    }))
}

/// Print a snapshot after each wallet event. Ends on a network change, since
/// the session refuses further use until it is rebuilt.
async fn cmd_watch(ctx: Context, _: Vec<String>, _: Option<u16>) -> Result<Value, String> {
    let shutdown = install_signal_handlers();
    ctx.session.establish_binding().await.map_err(|e| e.to_string())?;
    println!("{}", serde_json::to_string(&ctx.session.snapshot()).map_err(|e| e.to_string())?);

    let mut poller = EventPoller::new(ctx.transport.clone(), ctx.session.config().poll_interval);
    poller.poll().await.map_err(|e| e.to_string())?;

    loop {
        let events = tokio::select! {
            _ = shutdown.wait() => {
                info!("Shutdown signal received, stopping watch...");
                break;
            }
            events = poller.next() => events.map_err(|e| e.to_string())?,
        };
        for event in events {
            if let Err(e) = ctx.session.dispatch(event).await {
                warn!(error = %e, "wallet event handling failed");
            }
        }
        let snapshot = ctx.session.snapshot();
        println!("{}", serde_json::to_string(&snapshot).map_err(|e| e.to_string())?);
        if snapshot.reload_required {
            return Err("wallet network changed; restart to continue".into());
        }
    }
    Ok(Value::Null)
}

async fn cmd_serve(ctx: Context, _: Vec<String>, port: Option<u16>) -> Result<Value, String> {
    let shutdown = install_signal_handlers();
    let addr = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(DEFAULT_PORT)));

    // Start unbound if the node is down; POST /connect retries.
    if let Err(e) = ctx.session.establish_binding().await {
        warn!(error = %e, "initial connection failed");
    }

    vehreg::server::serve(ctx.session, addr, shutdown).await.map_err(|e| format!("Server error: {}", e))?;
    info!("Server stopped");
    Ok(Value::Null)
}
