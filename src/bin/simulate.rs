//! Scripted permission session against a simulated host.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin simulate -- [config.yaml] [name=yes|no ...]
//! ```
//!
//! Without answers the host grants `camera` and denies `microphone`.
//!
//! # Environment Variables
//!
//! - `PERMISSIONS_*` — see `permission_streams::config`
//! - `RUST_LOG` — tracing filter (default: the configured log level)

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context};
use tokio::sync::mpsc;

use permission_streams::{
    CapabilityName, HostStatusTable, Permissions, PermissionsConfig, RequestToken, ScreenHost,
};

const ANSWER_TIMEOUT: Duration = Duration::from_secs(5);

/// Forwards prompts to the host task.
struct SimulatedScreen {
    prompts: mpsc::UnboundedSender<(Vec<CapabilityName>, RequestToken)>,
}

impl ScreenHost for SimulatedScreen {
    fn request_permissions(&self, names: &[CapabilityName], token: RequestToken) {
        tracing::info!("Prompt shown for {:?}", names);
        if self.prompts.send((names.to_vec(), token)).is_err() {
            tracing::warn!("Host task is gone; prompt dropped");
        }
    }
}

fn parse_answer(arg: &str) -> anyhow::Result<(CapabilityName, bool)> {
    let Some((name, answer)) = arg.split_once('=') else {
        bail!("expected name=yes|no, got {arg:?}");
    };
    let granted = match answer {
        "yes" | "y" | "true" => true,
        "no" | "n" | "false" => false,
        other => bail!("unknown answer {other:?} for {name}"),
    };
    Ok((CapabilityName::from(name), granted))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1).peekable();

    let mut config = match args.peek() {
        Some(path) if path.ends_with(".yaml") || path.ends_with(".yml") => {
            let path = args.next().unwrap_or_default();
            PermissionsConfig::from_file(&path).with_context(|| format!("loading {path}"))?
        }
        _ => PermissionsConfig::default(),
    };
    config.apply_env_overrides();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .init();

    let mut script: Vec<(CapabilityName, bool)> = args
        .map(|arg| parse_answer(&arg))
        .collect::<anyhow::Result<_>>()?;
    if script.is_empty() {
        script = vec![("camera".into(), true), ("microphone".into(), false)];
    }
    let answers: HashMap<CapabilityName, bool> = script.iter().cloned().collect();

    let table = HostStatusTable::new();
    let permissions = Permissions::from_config(&config, table.clone());
    tracing::info!(
        "Token {}, runtime permission model: {}",
        permissions.token(),
        config.uses_runtime_model()
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<(Vec<CapabilityName>, RequestToken)>();
    let host_side = permissions.clone();
    let host = tokio::spawn(async move {
        while let Some((names, token)) = rx.recv().await {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let results: Vec<bool> = names
                .iter()
                .map(|name| answers.get(name).copied().unwrap_or(false))
                .collect();
            for (name, granted) in names.iter().zip(&results) {
                table.set(name.clone(), *granted);
            }
            host_side.deliver_result(token, &names, &results);
        }
    });

    let screen = SimulatedScreen { prompts: tx };
    let names: Vec<CapabilityName> = script.into_iter().map(|(name, _)| name).collect();
    let request = permissions.request_with_screen(names, &screen)?;

    match tokio::time::timeout(ANSWER_TIMEOUT, request).await {
        Ok(granted) => tracing::info!("Request resolved: granted = {}", granted),
        Err(_) => tracing::warn!("No answer within {:?}", ANSWER_TIMEOUT),
    }

    drop(screen);
    host.await.context("host task failed")?;

    println!("{}", serde_json::to_string_pretty(&permissions.snapshots())?);
    Ok(())
}
