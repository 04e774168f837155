use std::io::{Read, Write};
use std::sync::Arc;

mod api;
mod config;
mod event;
mod logger;
mod server;
mod store;

use crate::api::Dispatcher;
use crate::config::{AppState, Config, DEFAULT_CONFIG_PATH};
use crate::event::InboundEvent;

const USAGE: &str = "Usage: product-inventory [serve|invoke] [--config <path>]";

/// What the process was asked to do
enum Command {
    /// Run the HTTP front-end
    Serve,
    /// Handle one event read from stdin
    Invoke,
}

struct Args {
    command: Command,
    config_path: String,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args {
        command: Command::Serve,
        config_path: DEFAULT_CONFIG_PATH.to_string(),
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "serve" => parsed.command = Command::Serve,
            "invoke" => parsed.command = Command::Invoke,
            "--config" | "-c" => {
                parsed.config_path = args
                    .next()
                    .ok_or_else(|| format!("--config requires a path\n{USAGE}"))?;
            }
            other => return Err(format!("Unknown argument: {other}\n{USAGE}")),
        }
    }

    Ok(parsed)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args(std::env::args().skip(1))?;
    let cfg = Config::load_from(&args.config_path)?;
    logger::init(&cfg, matches!(args.command, Command::Invoke))?;

    // Storage handle lives for the whole process and is shared by every dispatch.
    let store = store::open(&cfg.storage)?;
    let dispatcher = Dispatcher::new(store, cfg.storage.page_size);

    match args.command {
        Command::Invoke => invoke(&dispatcher, std::io::stdin().lock(), std::io::stdout().lock()),
        Command::Serve => serve(cfg, dispatcher),
    }
}

/// Read one inbound event from `input` and write its envelope as a JSON line
fn invoke(
    dispatcher: &Dispatcher,
    mut input: impl Read,
    mut output: impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut raw = String::new();
    input.read_to_string(&mut raw)?;
    let event: InboundEvent = serde_json::from_str(&raw)?;

    let envelope = dispatcher.dispatch(&event);
    writeln!(output, "{}", serde_json::to_string(&envelope)?)?;
    output.flush()?;
    Ok(())
}

fn serve(cfg: Config, dispatcher: Dispatcher) -> Result<(), Box<dyn std::error::Error>> {
    // Build the Tokio runtime, sizing worker threads from configuration
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg, dispatcher))
}

async fn async_main(cfg: Config, dispatcher: Dispatcher) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::bind_listener(addr)?;
    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(AppState::new(cfg, dispatcher));
    server::run_server_loop(listener, state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::{json, Value};

    fn args(list: &[&str]) -> Result<Args, String> {
        parse_args(list.iter().map(ToString::to_string))
    }

    #[test]
    fn test_default_command_is_serve() {
        let parsed = args(&[]).unwrap();
        assert!(matches!(parsed.command, Command::Serve));
        assert_eq!(parsed.config_path, DEFAULT_CONFIG_PATH);
    }

    #[test]
    fn test_invoke_with_config() {
        let parsed = args(&["invoke", "--config", "/etc/inventory.toml"]).unwrap();
        assert!(matches!(parsed.command, Command::Invoke));
        assert_eq!(parsed.config_path, "/etc/inventory.toml");
    }

    #[test]
    fn test_bad_arguments() {
        assert!(args(&["--config"]).is_err());
        assert!(args(&["deploy"]).is_err());
    }

    fn invoke_json(dispatcher: &Dispatcher, event: &Value) -> Value {
        let mut output = Vec::new();
        invoke(dispatcher, event.to_string().as_bytes(), &mut output).unwrap();
        assert_eq!(output.last(), Some(&b'\n'));
        serde_json::from_slice(&output).unwrap()
    }

    #[test]
    fn test_invoke_dispatches_event_from_input() {
        let dispatcher = Dispatcher::new(Arc::new(MemoryStore::new()), 100);

        let saved = invoke_json(
            &dispatcher,
            &json!({
                "httpMethod": "POST",
                "path": "/product",
                "body": r#"{"productId": "p1", "name": "Widget"}"#
            }),
        );
        assert_eq!(saved["statusCode"], 200);

        let fetched = invoke_json(
            &dispatcher,
            &json!({
                "httpMethod": "GET",
                "path": "/product",
                "queryStringParameters": {"productId": "p1"},
                "body": null
            }),
        );
        assert_eq!(fetched["statusCode"], 200);
        assert_eq!(fetched["headers"]["Access-Control-Allow-Origin"], "*");
        assert_eq!(fetched["body"], r#"{"productId":"p1","name":"Widget"}"#);
    }

    #[test]
    fn test_invoke_health_omits_body() {
        let dispatcher = Dispatcher::new(Arc::new(MemoryStore::new()), 100);
        let envelope = invoke_json(&dispatcher, &json!({"httpMethod": "GET", "path": "/health"}));
        assert_eq!(envelope["statusCode"], 200);
        assert!(envelope.get("body").is_none());
    }

    #[test]
    fn test_invoke_rejects_malformed_event() {
        let dispatcher = Dispatcher::new(Arc::new(MemoryStore::new()), 100);
        let mut output = Vec::new();
        assert!(invoke(&dispatcher, "not json".as_bytes(), &mut output).is_err());
        assert!(output.is_empty());
    }
}
