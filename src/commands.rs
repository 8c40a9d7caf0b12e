//! Command execution.

use crate::Commands;
use colored::Colorize;
use irods_client::{Account, ClientError, PipelineConfiguration, Protocol, Session};
use irods_protocol::scanner;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

/// Executes a command and returns the formatted output.
pub async fn execute(
    config: PipelineConfiguration,
    account: &Account,
    cmd: Commands,
) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Config => Ok(serde_json::to_string_pretty(&config)?),
        Commands::Info { json } => {
            with_session(config, account, |protocol| async move {
                let info = server_info(&protocol).await;
                let output = if json {
                    serde_json::to_string_pretty(&info)?
                } else {
                    format_info(&info)
                };
                Ok::<_, Box<dyn std::error::Error>>(output)
            })
            .await
        }
        Commands::AuthCheck => {
            with_session(config, account, |_| async move {
                Ok::<_, Box<dyn std::error::Error>>(format!(
                    "{} as {}#{} ({})",
                    "Authenticated".green(),
                    account.user.cyan(),
                    account.zone,
                    account.scheme
                ))
            })
            .await
        }
    }
}

/// Authenticates, runs `f` on the connection, then closes the session.
async fn with_session<F, Fut>(
    config: PipelineConfiguration,
    account: &Account,
    f: F,
) -> Result<String, Box<dyn std::error::Error>>
where
    F: FnOnce(Arc<Protocol>) -> Fut,
    Fut: Future<Output = Result<String, Box<dyn std::error::Error>>>,
{
    let session = Session::new(config);
    let protocol = session
        .current_connection(account)
        .await
        .map_err(describe_error)?;
    let output = f(protocol).await;
    session.close_session().await?;
    output
}

async fn server_info(protocol: &Protocol) -> Value {
    let account = protocol.account();
    let mut info = json!({
        "host": account.host,
        "port": account.port,
        "user": account.user,
        "zone": account.zone,
        "tls": protocol.is_tls().await,
    });

    if let Some(startup) = protocol.startup_response() {
        info["release_version"] = json!(startup.release_version);
        info["api_version"] = json!(startup.api_version);
        info["reconnect_port"] = json!(startup.reconn_port);
        info["eirods"] = json!(startup.is_eirods());
    }

    if let Some(props) = protocol.server_properties() {
        info["icat_enabled"] = json!(props.icat_enabled);
        info["server_zone"] = json!(props.zone);
        info["boot_time"] = json!(props.boot_time.map(|t| t.to_rfc3339()));
    }

    info
}

fn format_info(info: &Value) -> String {
    let field = |name: &str| match &info[name] {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    };

    format!(
        "{}\n  Release: {}\n  API: {}\n  Zone: {}\n  iCAT: {}\n  Boot time: {}\n  TLS: {}",
        format!("Server {}:{}", field("host"), field("port")).bold(),
        field("release_version").yellow(),
        field("api_version"),
        field("server_zone").cyan(),
        field("icat_enabled"),
        field("boot_time"),
        field("tls"),
    )
}

fn describe_error(e: ClientError) -> Box<dyn std::error::Error> {
    match e.code() {
        Some(code) => format!("{} [{}]", e, scanner::describe(code)).into(),
        None => e.into(),
    }
}
