use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use fluentdb::config::{load_config, Config};
use fluentdb::{Connection, FluentError, Result};

const USAGE: &str = "usage: fluentdb [CONFIG] SQL";

fn main() -> ExitCode {
    // Initialize the logging system; stdout carries only results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    info!("Starting fluentdb {}", fluentdb::version());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, sql) = match args.as_slice() {
        [sql] => (Config::default_path(), sql.as_str()),
        [config, sql] => (PathBuf::from(config), sql.as_str()),
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match run(&config_path, sql) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Runs one statement against the configured database and renders its
/// outcome as JSON.
fn run(config_path: &Path, sql: &str) -> Result<String> {
    let config = load_config(config_path).map_err(|e| match e {
        FluentError::Io(io) => FluentError::Config(format!(
            "cannot read {}: {}",
            config_path.display(),
            io
        )),
        other => other,
    })?;

    let mut conn = config.build()?;
    if !conn.connect() {
        return Err(FluentError::Connection(
            conn.error_message().unwrap_or("unknown error").to_string(),
        ));
    }

    execute(&conn, sql)
}

fn execute(conn: &Connection, sql: &str) -> Result<String> {
    let query = conn.query(sql)?;

    if query.kind().returns_rows() {
        let response = query.get();
        if !response.succeeded() {
            return Err(FluentError::Execution(
                response.error_message().unwrap_or("statement failed").to_string(),
            ));
        }
        let json = response.read()?.to_json()?;
        Ok(json)
    } else {
        let response = query.exec();
        if !response.succeeded() {
            return Err(FluentError::Execution(
                response.error_message().unwrap_or("statement failed").to_string(),
            ));
        }
        let affected = response.write()?.affected_rows();
        Ok(serde_json::json!({ "affected_rows": affected }).to_string())
    }
}
