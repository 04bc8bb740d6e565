use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use sqlgate::config::resolve_config;
use sqlgate::core::GatewayError;
use sqlgate::{Gateway, OperationTable, ResultCodec};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: sqlgate [--config <path>] [--list]";

/// One line of input: `{"id": .., "method": .., "params": {..}}`
#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: JsonValue,
    method: String,
    #[serde(default)]
    params: JsonValue,
}

enum Mode {
    Serve { config: Option<PathBuf> },
    List,
}

fn parse_args(args: &[String]) -> Result<Mode, String> {
    let mut config = None;
    let mut list = false;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--list" => list = true,
            "--config" => match iter.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => return Err("--config requires a path".to_string()),
            },
            other => return Err(format!("unexpected argument '{}'", other)),
        }
    }
    Ok(if list { Mode::List } else { Mode::Serve { config } })
}

fn handle_line(table: &OperationTable, gateway: &Gateway, line: &str) -> JsonValue {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!("Malformed request: {}", e);
            let envelope = ResultCodec::encode_error(&GatewayError::Arguments(e));
            return json!({ "id": null, "result": envelope.to_json() });
        }
    };

    match table.dispatch(gateway, &request.method, &request.params) {
        Ok(response) => json!({ "id": request.id, "result": response.into_string() }),
        Err(e) => json!({ "id": request.id, "error": e.to_string() }),
    }
}

fn serve(table: &OperationTable, gateway: &Gateway) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle_line(table, gateway, &line);
        writeln!(stdout, "{}", reply)?;
        stdout.flush()?;
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    info!("Starting sqlgate...");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match parse_args(&args) {
        Ok(mode) => mode,
        Err(msg) => {
            eprintln!("{}\n{}", msg, USAGE);
            return ExitCode::FAILURE;
        }
    };

    let table = OperationTable::new();
    let config_path = match mode {
        Mode::List => {
            for operation in table.iter() {
                println!("{}\t{}", operation.name, operation.description);
            }
            return ExitCode::SUCCESS;
        }
        Mode::Serve { config } => config,
    };

    let gateway = match resolve_config(config_path.as_deref()).and_then(|config| Gateway::from_config(&config)) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match serve(&table, &gateway) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("I/O error: {}", e);
            ExitCode::FAILURE
        }
    }
}
