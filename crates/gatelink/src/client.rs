//! [`GatewayClient`] builder and runner loop.
//!
//! This is the entry point for running a bot. It ties the layers
//! together: transport → protocol → session → [`Gateway`] → handler.
//! One task owns the connection and multiplexes inbound frames, idle
//! ticks and [`GatewayHandle`] commands with `tokio::select!`.

use std::time::Duration;

use gatelink_protocol::{CloseDisposition, describe_close_code};
use gatelink_session::{BudgetSource, ConnectionState, SessionStore};
use gatelink_tick::IdleTicker;
use gatelink_transport::{
    Connection, Connector, Frame, TransportError, WebSocketConnector,
};
use tokio::sync::mpsc;
use tokio::time::Instant as TokioInstant;
use tracing::{debug, info, warn};

use crate::gateway::{Gateway, Outbound};
use crate::reconnect::ReconnectPolicy;
use crate::{
    CommandTable, EventHandler, GatewayConfig, GatewayError, HttpBudgetSource,
};

/// Requests sent from a [`GatewayHandle`] to the runner.
#[derive(Debug)]
enum Command {
    Shutdown,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring a [`GatewayClient`].
///
/// # Example
///
/// ```rust,no_run
/// use gatelink::prelude::*;
///
/// # async fn run() -> Result<(), GatewayError> {
/// let config = GatewayConfig::from_file("gatelink.json")?;
/// let mut commands = CommandTable::with_prefix("!");
/// commands.register("ping", |ctx, _msg, _args| {
///     tracing::info!(ping = ?ctx.ping(), "pong");
/// });
///
/// let client = GatewayClient::builder(config).commands(commands).build();
/// client.run().await
/// # }
/// ```
pub struct GatewayClientBuilder<H, C = WebSocketConnector, B = HttpBudgetSource> {
    config: GatewayConfig,
    handler: H,
    commands: CommandTable,
    connector: C,
    budget: B,
}

impl GatewayClientBuilder<(), WebSocketConnector, HttpBudgetSource> {
    /// Creates a builder with no handler, the WebSocket connector and
    /// the HTTP budget source.
    pub fn new(config: GatewayConfig) -> Self {
        let budget = HttpBudgetSource::from_config(&config);
        Self {
            config,
            handler: (),
            commands: CommandTable::new(),
            connector: WebSocketConnector::new(),
            budget,
        }
    }
}

impl<H, C, B> GatewayClientBuilder<H, C, B> {
    /// Sets the event handler.
    pub fn handler<H2: EventHandler>(self, handler: H2) -> GatewayClientBuilder<H2, C, B> {
        GatewayClientBuilder {
            config: self.config,
            handler,
            commands: self.commands,
            connector: self.connector,
            budget: self.budget,
        }
    }

    /// Sets the prefix command table.
    pub fn commands(mut self, commands: CommandTable) -> Self {
        self.commands = commands;
        self
    }

    /// Replaces the transport connector.
    pub fn connector<C2>(self, connector: C2) -> GatewayClientBuilder<H, C2, B> {
        GatewayClientBuilder {
            config: self.config,
            handler: self.handler,
            commands: self.commands,
            connector,
            budget: self.budget,
        }
    }

    /// Replaces the session-start budget source.
    pub fn budget<B2>(self, budget: B2) -> GatewayClientBuilder<H, C, B2> {
        GatewayClientBuilder {
            config: self.config,
            handler: self.handler,
            commands: self.commands,
            connector: self.connector,
            budget,
        }
    }
}

impl<H, C, B> GatewayClientBuilder<H, C, B>
where
    H: EventHandler,
    C: Connector<Error = TransportError>,
    C::Connection: Connection<Error = TransportError>,
    B: BudgetSource,
{
    pub fn build(self) -> GatewayClient<H, C, B> {
        let config = self.config.validated();
        let gateway = Gateway::new(&config, self.handler, self.commands);
        let mut ticker = IdleTicker::new(config.tick_config());
        ticker.pause();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        GatewayClient {
            url: config.gateway_url.clone(),
            policy: config.reconnect_policy(),
            gateway,
            ticker,
            connector: self.connector,
            budget: self.budget,
            commands_tx,
            commands_rx,
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// A cheap, cloneable view of a running client.
///
/// Reads go straight to the shared session; [`shutdown`](Self::shutdown)
/// is queued for the runner task.
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    store: SessionStore,
    commands: mpsc::UnboundedSender<Command>,
}

impl GatewayHandle {
    /// Last measured heartbeat round trip.
    pub fn ping(&self) -> Option<Duration> {
        self.store.ping()
    }

    pub fn state(&self) -> ConnectionState {
        self.store.state()
    }

    pub fn session_id(&self) -> Option<String> {
        self.store.session_id()
    }

    /// Asks the runner to close the connection normally and return.
    /// Does nothing once the runner has exited.
    pub fn shutdown(&self) {
        if self.commands.send(Command::Shutdown).is_err() {
            debug!("shutdown requested after the client stopped");
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// How one connection ended.
enum Exit {
    /// Closed without a terminal code; connect again.
    Reconnect,
    /// The application asked to stop.
    Shutdown,
}

/// A configured gateway client.
///
/// Call [`run()`](Self::run) to connect. It returns `Ok(())` after a
/// [`GatewayHandle::shutdown`], or an error when the gateway closes with
/// a terminal code or reconnecting keeps failing.
pub struct GatewayClient<H, C = WebSocketConnector, B = HttpBudgetSource> {
    url: String,
    policy: ReconnectPolicy,
    gateway: Gateway<H>,
    ticker: IdleTicker,
    connector: C,
    budget: B,
    commands_tx: mpsc::UnboundedSender<Command>,
    commands_rx: mpsc::UnboundedReceiver<Command>,
}

impl GatewayClient<(), WebSocketConnector, HttpBudgetSource> {
    pub fn builder(config: GatewayConfig) -> GatewayClientBuilder<()> {
        GatewayClientBuilder::new(config)
    }
}

impl<H, C, B> GatewayClient<H, C, B>
where
    H: EventHandler,
    C: Connector<Error = TransportError>,
    C::Connection: Connection<Error = TransportError>,
    B: BudgetSource,
{
    pub fn handle(&self) -> GatewayHandle {
        GatewayHandle {
            store: self.gateway.store().clone(),
            commands: self.commands_tx.clone(),
        }
    }

    pub fn handler(&self) -> &H {
        self.gateway.handler()
    }

    /// Connects and processes events until shutdown or a fatal close.
    ///
    /// A connection without a session to resume first checks the
    /// session-start budget and waits for its reset when it is used up.
    /// Every reconnect waits at least the base delay; the delay doubles
    /// with each failed connection in a row and the count restarts
    /// whenever a connection reaches [`ConnectionState::Connected`].
    ///
    /// # Errors
    /// - [`GatewayError::Terminated`] when the gateway closes with a
    ///   code that forbids reconnecting.
    /// - [`GatewayError::ReconnectsExhausted`] after
    ///   `max_reconnect_attempts` failures in a row.
    pub async fn run(mut self) -> Result<(), GatewayError> {
        info!(url = %self.url, "gateway client starting");
        // Connections in a row that never reached Connected.
        let mut failures: u32 = 0;
        let mut first = true;

        loop {
            if !first {
                if !self.policy.allows(failures) {
                    return Err(GatewayError::ReconnectsExhausted {
                        attempts: self.policy.max_attempts,
                    });
                }
                let delay = self.policy.backoff_delay(failures.max(1));
                info!(failures, delay_ms = delay.as_millis() as u64, "reconnecting");
                if !self.sleep_unless_shutdown(delay).await {
                    return Ok(());
                }
            }
            first = false;

            if self.gateway.store().session_id().is_none() {
                match self.wait_for_budget().await {
                    Ok(true) => {}
                    Ok(false) => return Ok(()),
                    Err(e) => {
                        warn!(error = %e, failures, "session-start budget unavailable");
                        failures += 1;
                        continue;
                    }
                }
            }

            let conn = match self.connector.connect(&self.url).await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, failures, "connect failed");
                    failures += 1;
                    continue;
                }
            };
            info!(id = %conn.id(), state = %self.gateway.store().state(), "connected to gateway");

            self.ticker.resume();
            let mut reached_connected = false;
            let exit = self.drive(&conn, &mut reached_connected).await;
            self.ticker.pause();
            if reached_connected {
                failures = 0;
            } else {
                failures += 1;
            }

            match exit? {
                Exit::Shutdown => {
                    info!("gateway client stopped");
                    return Ok(());
                }
                Exit::Reconnect => {}
            }
        }
    }

    /// Runs one connection until it closes.
    async fn drive(
        &mut self,
        conn: &C::Connection,
        reached_connected: &mut bool,
    ) -> Result<Exit, GatewayError> {
        loop {
            let result = tokio::select! {
                frame = conn.recv() => match frame {
                    Ok(Frame::Text(text)) => {
                        self.gateway.handle_frame(&text, TokioInstant::now().into_std())
                    }
                    Ok(Frame::Close(frame)) => {
                        return match self.gateway.on_close(frame.as_ref()) {
                            CloseDisposition::Terminal => {
                                let code = frame.map_or(0, |f| f.code);
                                Err(GatewayError::Terminated {
                                    code,
                                    name: describe_close_code(code),
                                })
                            }
                            CloseDisposition::Resume | CloseDisposition::Fresh => Ok(Exit::Reconnect),
                        };
                    }
                    Err(e) => {
                        warn!(id = %conn.id(), error = %e, "receive failed");
                        self.gateway.on_close(None);
                        return Ok(Exit::Reconnect);
                    }
                },
                tick = self.ticker.wait_for_tick() => {
                    let result = self.gateway.on_idle(tick.at);
                    self.ticker.finish_tick();
                    result
                }
                Some(command) = self.commands_rx.recv() => match command {
                    Command::Shutdown => {
                        let frame = self.gateway.shutdown();
                        if let Err(e) = conn.close(frame).await {
                            debug!(error = %e, "close during shutdown failed");
                        }
                        return Ok(Exit::Shutdown);
                    }
                },
            };

            let actions = match result {
                Ok(actions) => actions,
                Err(e) => {
                    let frame = self.gateway.abandon(&e);
                    if let Err(close_err) = conn.close(frame).await {
                        debug!(error = %close_err, "close after fatal error failed");
                    }
                    return Ok(Exit::Reconnect);
                }
            };

            if self.gateway.store().state() == ConnectionState::Connected {
                *reached_connected = true;
            }

            for action in actions {
                match action {
                    Outbound::Send(text) => {
                        if let Err(e) = conn.send_text(&text).await {
                            warn!(id = %conn.id(), error = %e, "send failed");
                            self.gateway.on_close(None);
                            return Ok(Exit::Reconnect);
                        }
                    }
                    Outbound::Close(frame) => {
                        if let Err(e) = conn.close(frame).await {
                            debug!(error = %e, "close failed");
                        }
                        return Ok(match self.gateway.store().state() {
                            ConnectionState::Disconnected => Exit::Shutdown,
                            _ => Exit::Reconnect,
                        });
                    }
                }
            }
        }
    }

    /// Fetches the budget and sizes the Identify limiter. Waits for the
    /// reset when no session starts are left. Returns `false` if a
    /// shutdown arrived while waiting.
    async fn wait_for_budget(&mut self) -> Result<bool, GatewayError> {
        let limit = self.budget.fetch().await?;
        self.gateway.set_identify_concurrency(limit.max_concurrency);

        if limit.is_exhausted() {
            warn!(
                total = limit.total,
                reset_after_ms = limit.reset_after.as_millis() as u64,
                "session-start budget used up, waiting for reset"
            );
            return Ok(self.sleep_unless_shutdown(limit.reset_after).await);
        }
        debug!(remaining = limit.remaining, "session-start budget ok");
        Ok(true)
    }

    /// Sleeps for `delay`. Returns `false` if a shutdown arrived first.
    async fn sleep_unless_shutdown(&mut self, delay: Duration) -> bool {
        tokio::select! {
            () = tokio::time::sleep(delay) => true,
            Some(Command::Shutdown) = self.commands_rx.recv() => {
                self.gateway.shutdown();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use gatelink_session::SessionStartLimit;
    use gatelink_transport::WebSocketConnection;

    use super::*;
    use crate::FixedBudget;

    /// Counts dial attempts and refuses every one of them.
    #[derive(Clone, Default)]
    struct CountingConnector {
        connects: Arc<AtomicUsize>,
    }

    impl Connector for CountingConnector {
        type Connection = WebSocketConnection;
        type Error = TransportError;

        async fn connect(&self, url: &str) -> Result<WebSocketConnection, TransportError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::InvalidUrl(url.to_string()))
        }
    }

    fn exhausted_budget(reset_after: Duration) -> FixedBudget {
        FixedBudget(SessionStartLimit {
            total: 1000,
            remaining: 0,
            reset_after,
            max_concurrency: 1,
        })
    }

    fn counting_client(
        reset_after: Duration,
    ) -> (GatewayClient<(), CountingConnector, FixedBudget>, Arc<AtomicUsize>) {
        let connector = CountingConnector::default();
        let connects = Arc::clone(&connector.connects);
        let client = GatewayClient::builder(GatewayConfig::new("tok"))
            .connector(connector)
            .budget(exhausted_budget(reset_after))
            .build();
        (client, connects)
    }

    fn client() -> GatewayClient<(), WebSocketConnector, FixedBudget> {
        let mut config = GatewayConfig::new("tok");
        config.gateway_url = "ws://127.0.0.1:9".into();
        GatewayClient::builder(config)
            .budget(FixedBudget(SessionStartLimit {
                total: 1000,
                remaining: 0,
                reset_after: Duration::from_secs(3600),
                max_concurrency: 1,
            }))
            .build()
    }

    #[test]
    fn test_build_starts_with_paused_ticker_and_fresh_session() {
        let client = client();
        assert!(client.ticker.is_paused());
        assert_eq!(client.handle().state(), ConnectionState::Fresh);
        assert_eq!(client.handle().ping(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waiting_for_budget_reset_stops_on_shutdown() {
        let client = client();
        client.handle().shutdown();

        client.run().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exhausted_budget_delays_connect_until_reset() {
        let (client, connects) = counting_client(Duration::from_secs(60));
        let handle = client.handle();
        let run = client.run();
        tokio::pin!(run);

        tokio::select! {
            _ = &mut run => panic!("run ended while waiting for the budget"),
            () = tokio::time::sleep(Duration::from_secs(59)) => {}
        }
        assert_eq!(connects.load(Ordering::SeqCst), 0);

        // The reset passes at 60 s; the failed dial then backs off for 1 s
        // and finds the budget still used up.
        tokio::select! {
            _ = &mut run => panic!("run ended after the first connect"),
            () = tokio::time::sleep(Duration::from_millis(1500)) => {}
        }
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        handle.shutdown();
        run.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_resume_without_session_id_checks_budget() {
        let (client, connects) = counting_client(Duration::from_secs(60));
        client
            .gateway
            .store()
            .with(|s| s.transition(ConnectionState::Resume));
        let handle = client.handle();
        let run = client.run();
        tokio::pin!(run);

        tokio::select! {
            _ = &mut run => panic!("run ended while waiting for the budget"),
            () = tokio::time::sleep(Duration::from_secs(30)) => {}
        }
        assert_eq!(connects.load(Ordering::SeqCst), 0);

        handle.shutdown();
        run.await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_shutdown_after_client_dropped_is_harmless() {
        let client = client();
        let handle = client.handle();
        drop(client);

        handle.shutdown();
        assert_eq!(handle.state(), ConnectionState::Fresh);
    }
}
