//! Application orchestrator: starts one session and renders its events.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use lanxfer_discovery::{get_hostname, get_local_ips, outbound_ip};
use lanxfer_transfer::{Phase, TransferEvent, TransferManager, TransferOutcome};
use tracing::info;

use crate::config::Config;

/// What the user asked this process to do.
#[derive(Debug, Clone)]
pub enum Action {
    Receive,
    Send { address: String, file: PathBuf },
}

/// Runs one session until its terminal outcome. Returns `true` on success.
///
/// Ctrl-C cancels the session; its sockets and files are closed before
/// this returns.
pub async fn run(config: Config, action: Action) -> anyhow::Result<bool> {
    let mut manager = TransferManager::new(config.transfer_config());
    let mut events = manager
        .take_events()
        .context("transfer event channel already taken")?;

    match action {
        Action::Receive => {
            if !config.json {
                print_addresses(&config);
            }
            manager.start_receiving()?;
        }
        Action::Send { address, file } => {
            manager.start_sending(address, file)?;
        }
    }

    let mut view = View::new(config.json);
    let outcome = loop {
        tokio::select! {
            evt = events.recv() => {
                let Some(evt) = evt else {
                    anyhow::bail!("transfer event channel closed unexpectedly");
                };
                view.render(&evt)?;
                if let TransferEvent::Terminal { outcome, .. } = evt {
                    break outcome;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, cancelling transfer");
                manager.shutdown().await;
            }
        }
    };

    manager.shutdown().await;
    Ok(outcome.is_success())
}

/// Prints where a sender should connect to reach this machine.
pub fn print_addresses(config: &Config) {
    let primary = outbound_ip();
    let others: Vec<IpAddr> = get_local_ips()
        .into_iter()
        .filter(|ip| *ip != primary)
        .collect();
    let hostname = get_hostname();

    if config.json {
        let info = serde_json::json!({
            "address": primary,
            "port": config.port,
            "otherAddresses": others,
            "hostname": hostname,
        });
        println!("{info}");
        return;
    }

    println!("Give this address to the sender: {primary} (port {})", config.port);
    if !others.is_empty() {
        let list: Vec<String> = others.iter().map(ToString::to_string).collect();
        println!("Other local addresses: {}", list.join(", "));
    }
    println!("Hostname: {hostname}");
}

/// Terminal rendering of session events.
struct View {
    json: bool,
    bar: Option<ProgressBar>,
}

impl View {
    fn new(json: bool) -> Self {
        Self { json, bar: None }
    }

    fn render(&mut self, evt: &TransferEvent) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(evt)?);
            return Ok(());
        }

        match evt {
            TransferEvent::Progress { event, .. } => match event.phase {
                Phase::Connecting => self.line(&event.message),
                Phase::Transferring => {
                    let bar = self.bar()?;
                    bar.set_message(event.message.clone());
                    if let Some(pct) = event.percent {
                        bar.set_position(pct.floor() as u64);
                    }
                }
                Phase::Done => match self.bar.take() {
                    Some(bar) => {
                        bar.set_position(100);
                        bar.finish_with_message(event.message.clone());
                    }
                    None => println!("{}", event.message),
                },
                Phase::Failed => {
                    if let Some(bar) = self.bar.take() {
                        bar.abandon_with_message(event.message.clone());
                    }
                }
            },
            TransferEvent::Terminal { role, outcome } => match outcome {
                TransferOutcome::Success { filename, bytes } => {
                    println!("{role}: '{filename}' transferred ({bytes} bytes)");
                }
                TransferOutcome::Failure { kind, message } => {
                    eprintln!("{role}: failed ({kind:?}): {message}");
                }
            },
        }
        Ok(())
    }

    fn line(&self, message: &str) {
        match &self.bar {
            Some(bar) => bar.println(message),
            None => println!("{message}"),
        }
    }

    fn bar(&mut self) -> anyhow::Result<&ProgressBar> {
        if self.bar.is_none() {
            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::with_template("{msg}\n[{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}%")?
                    .progress_chars("=> "),
            );
            self.bar = Some(bar);
        }
        self.bar.as_ref().context("progress bar missing")
    }
}
