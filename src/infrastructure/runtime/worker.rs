//! Async worker - runs in Tokio runtime and listens for greeting logs

use std::future::Future;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::time::Duration;

use alloy::rpc::types::Log;
use anyhow::{Context, Result};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::domain::{Greeting, GreetingFilter};
use crate::infrastructure::ethereum::{
    create_provider, detect_node_kind, EthereumProvider, ProviderConfig,
};
use crate::infrastructure::runtime::bridge::{RuntimeCommand, RuntimeEvent};

/// Granularity at which waits check for a shutdown request
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Everything the listener needs to know before it starts
#[derive(Debug, Clone)]
pub struct ListenerSettings {
    pub endpoint: ProviderConfig,
    pub filter: GreetingFilter,
    /// Delay between `eth_getLogs` polls on HTTP endpoints
    pub poll_interval: Duration,
    /// Upper bound for connecting and for every RPC request
    pub request_timeout: Duration,
    pub retry_initial: Duration,
    pub retry_max: Duration,
}

impl ListenerSettings {
    pub fn new(endpoint: ProviderConfig, filter: GreetingFilter) -> Self {
        Self {
            endpoint,
            filter,
            poll_interval: Duration::from_millis(1_000),
            request_timeout: Duration::from_millis(5_000),
            retry_initial: Duration::from_millis(500),
            retry_max: Duration::from_millis(30_000),
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.retry_initial,
            initial_interval: self.retry_initial,
            max_interval: self.retry_max,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Run the listener until a shutdown is requested
///
/// Connection and RPC failures are reported as events and retried with
/// exponential backoff; they never end the loop.
pub async fn run_async_worker(
    settings: ListenerSettings,
    cmd_rx: Receiver<RuntimeCommand>,
    evt_tx: Sender<RuntimeEvent>,
) -> Result<()> {
    info!(
        endpoint = %settings.endpoint.display(),
        filter = %settings.filter.describe(),
        "starting greeting listener"
    );

    let mut backoff = settings.backoff();
    let mut attempt = 0u32;
    // first block not yet queried; survives reconnects so outages leave no gap
    let mut cursor: Option<u64> = None;

    loop {
        if shutdown_requested(&cmd_rx) {
            break;
        }

        let result = match connect(&settings, &evt_tx).await {
            Ok((provider, head)) => {
                backoff.reset();
                attempt = 0;
                listen(provider.as_ref(), head, &mut cursor, &settings, &cmd_rx, &evt_tx).await
            }
            Err(err) => Err(err),
        };

        let err = match result {
            Ok(()) => break,
            Err(err) => err,
        };

        attempt += 1;
        let delay = backoff.next_backoff().unwrap_or(settings.retry_max);
        warn!(attempt, delay_ms = delay.as_millis() as u64, "listener failed: {:#}", err);
        let _ = evt_tx.send(RuntimeEvent::Error {
            message: format!("Listener error ({}): {:#}", settings.endpoint.display(), err),
        });
        let _ = evt_tx.send(RuntimeEvent::Reconnecting { attempt, delay });

        if wait_or_shutdown(delay, &cmd_rx).await {
            break;
        }
    }

    info!("greeting listener stopped");
    Ok(())
}

/// Open the transport and register with the node
async fn connect(
    settings: &ListenerSettings,
    evt_tx: &Sender<RuntimeEvent>,
) -> Result<(Box<dyn EthereumProvider>, u64)> {
    let provider = bounded(
        settings.request_timeout,
        create_provider(settings.endpoint.clone()),
    )
    .await?;
    let head = handshake(provider.as_ref(), settings, evt_tx).await?;
    Ok((provider, head))
}

/// Probe the node and announce the connection; returns the chain head
async fn handshake(
    provider: &dyn EthereumProvider,
    settings: &ListenerSettings,
    evt_tx: &Sender<RuntimeEvent>,
) -> Result<u64> {
    let head = bounded(settings.request_timeout, provider.block_number())
        .await
        .context("Failed to get block number")?;
    // Not every node answers web3_clientVersion
    let node_kind = match bounded(settings.request_timeout, provider.client_version()).await {
        Ok(version) => detect_node_kind(&version),
        Err(_) => "unknown".to_string(),
    };

    info!(endpoint = %provider.endpoint_name(), %node_kind, head, "connected");
    let _ = evt_tx.send(RuntimeEvent::Connected {
        endpoint: provider.endpoint_name(),
        node_kind,
        head,
    });
    Ok(head)
}

/// Deliver matching logs until shutdown (`Ok`) or a transport failure (`Err`)
///
/// HTTP polling resumes from `cursor` when set, so a reconnect queries the
/// blocks missed while the node was unreachable.
async fn listen(
    provider: &dyn EthereumProvider,
    head: u64,
    cursor: &mut Option<u64>,
    settings: &ListenerSettings,
    cmd_rx: &Receiver<RuntimeCommand>,
    evt_tx: &Sender<RuntimeEvent>,
) -> Result<()> {
    if provider.supports_subscriptions() {
        let mut logs = bounded(
            settings.request_timeout,
            provider.subscribe_logs(&settings.filter.to_filter()),
        )
        .await?;
        debug!("subscribed to {}", settings.filter.describe());

        loop {
            if shutdown_requested(cmd_rx) {
                return Ok(());
            }
            match timeout(SHUTDOWN_POLL, logs.recv()).await {
                Ok(Some(log)) => deliver(&log, evt_tx),
                Ok(None) => anyhow::bail!("log subscription closed"),
                Err(_) => {}
            }
        }
    }

    // HTTP: poll eth_getLogs over every block range past the head we started at
    let mut next_block = cursor.map_or(head + 1, |resume| resume.min(head + 1));
    *cursor = Some(next_block);
    loop {
        if wait_or_shutdown(settings.poll_interval, cmd_rx).await {
            return Ok(());
        }

        let latest = bounded(settings.request_timeout, provider.block_number())
            .await
            .context("eth_blockNumber failed")?;
        if latest + 1 < next_block {
            // the node was restarted with a fresh chain
            debug!(latest, next_block, "chain head moved backwards");
            next_block = latest + 1;
            *cursor = Some(next_block);
            continue;
        }
        if latest < next_block {
            continue;
        }

        let filter = settings.filter.range(next_block, latest);
        let logs = bounded(settings.request_timeout, provider.get_logs(&filter))
            .await
            .with_context(|| format!("eth_getLogs failed for blocks {next_block}..={latest}"))?;
        for log in &logs {
            deliver(log, evt_tx);
        }
        next_block = latest + 1;
        *cursor = Some(next_block);
    }
}

fn deliver(log: &Log, evt_tx: &Sender<RuntimeEvent>) {
    debug!(?log, "greeting log");
    if log.removed {
        debug!(tx = ?log.transaction_hash, "ignoring removed log");
        return;
    }
    match Greeting::from_log(log) {
        Ok(greeting) => {
            info!(block = greeting.block_number, text = %greeting.text, "greeting received");
            let _ = evt_tx.send(RuntimeEvent::Greeting(greeting));
        }
        Err(err) => {
            warn!(tx = ?log.transaction_hash, "failed to decode greeting: {err}");
            let _ = evt_tx.send(RuntimeEvent::DecodeFailed {
                message: err.to_string(),
            });
        }
    }
}

async fn bounded<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    timeout(limit, fut)
        .await
        .map_err(|_| anyhow::anyhow!("timed out after {}ms", limit.as_millis()))?
}

/// True once a shutdown was requested or the UI side went away
fn shutdown_requested(cmd_rx: &Receiver<RuntimeCommand>) -> bool {
    match cmd_rx.try_recv() {
        Ok(RuntimeCommand::Shutdown) => true,
        Err(TryRecvError::Disconnected) => true,
        Err(TryRecvError::Empty) => false,
    }
}

/// Sleep for `delay`, returning early (with `true`) on shutdown
async fn wait_or_shutdown(delay: Duration, cmd_rx: &Receiver<RuntimeCommand>) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if shutdown_requested(cmd_rx) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep(SHUTDOWN_POLL.min(deadline - now)).await;
    }
}
