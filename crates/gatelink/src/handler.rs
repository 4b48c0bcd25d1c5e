//! The application side of the client: [`EventHandler`], the
//! [`Context`] passed to it, and the [`CommandTable`].

use std::fmt;
use std::time::Duration;

use gatelink_protocol::{
    GuildMemberEvent, GuildMemberRemove, Message, MessageDelete, MessageDeleteBulk, ReactionAdd,
    ReactionRemove, ReactionRemoveAll, ReactionRemoveEmoji, Ready, User,
};
use gatelink_session::{ConnectionState, SessionStore};

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// A snapshot of the session taken just before a handler call.
///
/// Handlers never see the live session: the lock is released before
/// any application code runs.
#[derive(Debug, Clone, Default)]
pub struct Context {
    current_user: Option<User>,
    session_id: Option<String>,
    ping: Option<Duration>,
    state: ConnectionState,
}

impl Context {
    pub(crate) fn snapshot(store: &SessionStore) -> Self {
        store.with(|s| Self {
            current_user: s.current_user().cloned(),
            session_id: s.session_id().map(str::to_owned),
            ping: s.ping(),
            state: s.state(),
        })
    }

    /// The account we are connected as, once Ready has arrived.
    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Last measured heartbeat round trip.
    pub fn ping(&self) -> Option<Duration> {
        self.ping
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether `msg` was written by the account this client runs as.
    pub fn is_own_message(&self, msg: &Message) -> bool {
        match (&self.current_user, &msg.author) {
            (Some(me), Some(author)) => me.id == author.id,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// EventHandler
// ---------------------------------------------------------------------------

/// Application callbacks for gateway events.
///
/// Every method has a no-op default: implement only what you need, the
/// rest is silently ignored. Methods are called from the runner task
/// one at a time, so `&mut self` state needs no locking.
///
/// # Example
///
/// ```rust
/// use gatelink::{Context, EventHandler};
/// use gatelink::protocol::{Message, Ready};
///
/// #[derive(Default)]
/// struct Counter {
///     messages: u64,
/// }
///
/// impl EventHandler for Counter {
///     fn on_ready(&mut self, _ctx: &Context, ready: &Ready) {
///         println!("logged in as {}", ready.user.username);
///     }
///
///     fn on_message_create(&mut self, _ctx: &Context, _msg: &Message) {
///         self.messages += 1;
///     }
/// }
/// ```
pub trait EventHandler: Send + 'static {
    /// A new session was established.
    fn on_ready(&mut self, _ctx: &Context, _ready: &Ready) {}

    /// A previous session was resumed.
    fn on_resumed(&mut self, _ctx: &Context) {}

    /// Called on every idle tick, after the heartbeat check.
    fn on_idle(&mut self, _ctx: &Context) {}

    /// A message was posted. Not called when a registered command
    /// handled it. When commands are registered but none matches, the
    /// message still lands here.
    fn on_message_create(&mut self, _ctx: &Context, _msg: &Message) {}

    fn on_message_update(&mut self, _ctx: &Context, _msg: &Message) {}

    fn on_message_delete(&mut self, _ctx: &Context, _event: &MessageDelete) {}

    fn on_message_delete_bulk(&mut self, _ctx: &Context, _event: &MessageDeleteBulk) {}

    fn on_reaction_add(&mut self, _ctx: &Context, _event: &ReactionAdd) {}

    fn on_reaction_remove(&mut self, _ctx: &Context, _event: &ReactionRemove) {}

    fn on_reaction_remove_all(&mut self, _ctx: &Context, _event: &ReactionRemoveAll) {}

    fn on_reaction_remove_emoji(&mut self, _ctx: &Context, _event: &ReactionRemoveEmoji) {}

    fn on_guild_member_add(&mut self, _ctx: &Context, _event: &GuildMemberEvent) {}

    fn on_guild_member_update(&mut self, _ctx: &Context, _event: &GuildMemberEvent) {}

    fn on_guild_member_remove(&mut self, _ctx: &Context, _event: &GuildMemberRemove) {}
}

/// A handler that ignores everything. Useful for command-only bots.
impl EventHandler for () {}

// ---------------------------------------------------------------------------
// CommandTable
// ---------------------------------------------------------------------------

/// A registered command callback: `(context, message, arguments)`.
pub type CommandFn = Box<dyn FnMut(&Context, &Message, &str) + Send>;

/// Prefix commands matched against Message-Create content.
///
/// Matching works in two steps:
/// 1. If a global prefix is set, the content must start with it (else
///    no command runs) and it is stripped.
/// 2. The registered command prefixes are tried in registration order;
///    the first one the remaining content starts with wins.
///
/// The command receives the rest of the content with leading whitespace
/// removed. The message itself is passed through unchanged.
#[derive(Default)]
pub struct CommandTable {
    prefix: Option<String>,
    commands: Vec<(String, CommandFn)>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table whose commands all require `prefix` (e.g. `"!"`).
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            commands: Vec::new(),
        }
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = Some(prefix.into());
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Registers a command. Earlier registrations take priority, so
    /// register `"system"` before `"sys"` if both exist.
    pub fn register<F>(&mut self, command: impl Into<String>, f: F) -> &mut Self
    where
        F: FnMut(&Context, &Message, &str) + Send + 'static,
    {
        self.commands.push((command.into(), Box::new(f)));
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Runs the first command matching `msg`. Returns `true` if one ran.
    pub fn dispatch(&mut self, ctx: &Context, msg: &Message) -> bool {
        let mut content = msg.content.as_str();
        if let Some(prefix) = &self.prefix {
            match content.strip_prefix(prefix.as_str()) {
                Some(rest) => content = rest,
                None => return false,
            }
        }

        for (command, f) in &mut self.commands {
            if let Some(args) = content.strip_prefix(command.as_str()) {
                tracing::debug!(%command, "running command");
                f(ctx, msg, args.trim_start());
                return true;
            }
        }
        false
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTable")
            .field("prefix", &self.prefix)
            .field(
                "commands",
                &self.commands.iter().map(|(c, _)| c.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
