use gatelink::prelude::*;
use tracing_subscriber::EnvFilter;

/// Default config path when none is given on the command line.
const DEFAULT_CONFIG: &str = "gatelink.json";

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Logs lifecycle events and counts the messages it sees.
#[derive(Default)]
struct PingBot {
    messages_seen: u64,
    sessions: u64,
}

impl EventHandler for PingBot {
    fn on_ready(&mut self, _ctx: &Context, ready: &Ready) {
        self.sessions += 1;
        tracing::info!(
            user = %ready.user.username,
            sessions = self.sessions,
            "ready"
        );
    }

    fn on_resumed(&mut self, ctx: &Context) {
        tracing::info!(session_id = ctx.session_id(), "resumed");
    }

    fn on_message_create(&mut self, ctx: &Context, msg: &Message) {
        if ctx.is_own_message(msg) {
            return;
        }
        self.messages_seen += 1;
        tracing::debug!(
            channel = %msg.channel_id,
            total = self.messages_seen,
            "message"
        );
    }
}

fn commands() -> CommandTable {
    let mut commands = CommandTable::with_prefix("!");
    commands
        .register("ping", |ctx, msg, _args| {
            let ping_ms = ctx.ping().map(|p| p.as_millis() as u64);
            tracing::info!(channel = %msg.channel_id, ping_ms, "pong");
        })
        .register("echo", |_ctx, msg, args| {
            tracing::info!(channel = %msg.channel_id, text = args, "echo");
        });
    commands
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,gatelink=debug")),
        )
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = GatewayConfig::from_file(&path)?;
    tracing::info!(config = %path, "starting ping-bot");

    let client = GatewayClient::builder(config)
        .handler(PingBot::default())
        .commands(commands())
        .build();

    let handle = client.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(state = %handle.state(), "ctrl-c received");
            handle.shutdown();
        }
    });

    client.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(content: &str, author: u64) -> Message {
        Message {
            id: Snowflake(1),
            channel_id: Snowflake(2),
            content: content.to_string(),
            author: Some(User {
                id: Snowflake(author),
                ..User::default()
            }),
            ..Message::default()
        }
    }

    #[test]
    fn test_commands_registers_ping_and_echo() {
        let mut table = commands();
        assert_eq!(table.len(), 2);
        assert!(table.dispatch(&Context::default(), &message("!ping", 5)));
        assert!(table.dispatch(&Context::default(), &message("!echo hi", 5)));
        assert!(!table.dispatch(&Context::default(), &message("ping", 5)));
    }

    #[test]
    fn test_on_message_create_counts_messages() {
        let mut bot = PingBot::default();
        bot.on_message_create(&Context::default(), &message("hello", 5));
        bot.on_message_create(&Context::default(), &message("again", 6));
        assert_eq!(bot.messages_seen, 2);
    }
}
