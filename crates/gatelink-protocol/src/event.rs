//! Dispatch event names and the typed records decoded from them.
//!
//! A dispatch frame (opcode 0) names its event in `t`. The name is
//! mapped once to an [`EventKind`]; the kind then decides which record
//! the body `d` is decoded into ([`DispatchEvent::decode`]).

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::{Emoji, GuildMember, Message, Snowflake, User};
use crate::ProtocolError;

/// Gateway events that are known but not decoded. They are accepted
/// (and counted by the dispatch limiter) but never reach a handler.
const UNIMPLEMENTED_EVENTS: &[&str] = &[
    "APPLICATION_COMMAND_PERMISSIONS_UPDATE",
    "CHANNEL_CREATE",
    "CHANNEL_DELETE",
    "CHANNEL_PINS_UPDATE",
    "CHANNEL_UPDATE",
    "GUILD_BAN_ADD",
    "GUILD_BAN_REMOVE",
    "GUILD_CREATE",
    "GUILD_DELETE",
    "GUILD_EMOJIS_UPDATE",
    "GUILD_INTEGRATIONS_UPDATE",
    "GUILD_MEMBERS_CHUNK",
    "GUILD_ROLE_CREATE",
    "GUILD_ROLE_DELETE",
    "GUILD_ROLE_UPDATE",
    "GUILD_UPDATE",
    "INTERACTION_CREATE",
    "INVITE_CREATE",
    "INVITE_DELETE",
    "PRESENCE_UPDATE",
    "THREAD_CREATE",
    "THREAD_DELETE",
    "THREAD_UPDATE",
    "TYPING_START",
    "USER_UPDATE",
    "VOICE_SERVER_UPDATE",
    "VOICE_STATE_UPDATE",
    "WEBHOOKS_UPDATE",
];

/// The closed set of dispatch events the router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    Resumed,
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    MessageDeleteBulk,
    MessageReactionAdd,
    MessageReactionRemove,
    MessageReactionRemoveAll,
    MessageReactionRemoveEmoji,
    GuildMemberAdd,
    GuildMemberUpdate,
    GuildMemberRemove,
    /// A known gateway event with no typed record yet.
    Unimplemented(&'static str),
}

impl EventKind {
    /// Maps an event name to a kind. Returns `None` for names the
    /// gateway is not known to send.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "READY" => Self::Ready,
            "RESUMED" => Self::Resumed,
            "MESSAGE_CREATE" => Self::MessageCreate,
            "MESSAGE_UPDATE" => Self::MessageUpdate,
            "MESSAGE_DELETE" => Self::MessageDelete,
            "MESSAGE_DELETE_BULK" => Self::MessageDeleteBulk,
            "MESSAGE_REACTION_ADD" => Self::MessageReactionAdd,
            "MESSAGE_REACTION_REMOVE" => Self::MessageReactionRemove,
            "MESSAGE_REACTION_REMOVE_ALL" => Self::MessageReactionRemoveAll,
            "MESSAGE_REACTION_REMOVE_EMOJI" => Self::MessageReactionRemoveEmoji,
            "GUILD_MEMBER_ADD" => Self::GuildMemberAdd,
            "GUILD_MEMBER_UPDATE" => Self::GuildMemberUpdate,
            "GUILD_MEMBER_REMOVE" => Self::GuildMemberRemove,
            other => {
                let known = UNIMPLEMENTED_EVENTS.iter().find(|&&n| n == other)?;
                Self::Unimplemented(known)
            }
        })
    }

    /// The wire name of this event.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Resumed => "RESUMED",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::MessageUpdate => "MESSAGE_UPDATE",
            Self::MessageDelete => "MESSAGE_DELETE",
            Self::MessageDeleteBulk => "MESSAGE_DELETE_BULK",
            Self::MessageReactionAdd => "MESSAGE_REACTION_ADD",
            Self::MessageReactionRemove => "MESSAGE_REACTION_REMOVE",
            Self::MessageReactionRemoveAll => "MESSAGE_REACTION_REMOVE_ALL",
            Self::MessageReactionRemoveEmoji => "MESSAGE_REACTION_REMOVE_EMOJI",
            Self::GuildMemberAdd => "GUILD_MEMBER_ADD",
            Self::GuildMemberUpdate => "GUILD_MEMBER_UPDATE",
            Self::GuildMemberRemove => "GUILD_MEMBER_REMOVE",
            Self::Unimplemented(name) => name,
        }
    }
}

// ---------------------------------------------------------------------------
// Event records
// ---------------------------------------------------------------------------

/// READY: the handshake completed and a new session exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ready {
    /// Gateway protocol version.
    pub v: u8,
    /// The account we are connected as.
    pub user: User,
    /// Identifier required to resume this session later.
    pub session_id: String,
    /// Gateway URL to use for resuming, when the server sends one.
    pub resume_gateway_url: Option<String>,
}

impl Ready {
    fn from_data(d: &Value) -> Result<Self, ProtocolError> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            v: u8,
            #[serde(default)]
            user: User,
            session_id: Option<String>,
            #[serde(default)]
            resume_gateway_url: Option<String>,
        }

        let raw: Raw = parse(d)?;
        let session_id = raw
            .session_id
            .filter(|s| !s.is_empty())
            .ok_or(ProtocolError::MissingField("session_id"))?;
        Ok(Self {
            v: raw.v,
            user: raw.user,
            session_id,
            resume_gateway_url: raw.resume_gateway_url,
        })
    }
}

/// MESSAGE_DELETE
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageDelete {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_DELETE_BULK
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageDeleteBulk {
    pub ids: Vec<Snowflake>,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_REACTION_ADD
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReactionAdd {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Only present for reactions in guilds.
    #[serde(default)]
    pub member: Option<GuildMember>,
    pub emoji: Emoji,
}

/// MESSAGE_REACTION_REMOVE
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReactionRemove {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub emoji: Emoji,
}

/// MESSAGE_REACTION_REMOVE_ALL
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReactionRemoveAll {
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_REACTION_REMOVE_EMOJI
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReactionRemoveEmoji {
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub message_id: Snowflake,
    pub emoji: Emoji,
}

/// GUILD_MEMBER_ADD and GUILD_MEMBER_UPDATE: a member record plus the
/// guild it belongs to, all at the top level of `d`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildMemberEvent {
    pub guild_id: Snowflake,
    #[serde(flatten)]
    pub member: GuildMember,
}

/// GUILD_MEMBER_REMOVE
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildMemberRemove {
    pub guild_id: Snowflake,
    pub user: User,
}

/// A decoded dispatch event, owned by the dispatch call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    Ready(Ready),
    Resumed,
    MessageCreate(Message),
    MessageUpdate(Message),
    MessageDelete(MessageDelete),
    MessageDeleteBulk(MessageDeleteBulk),
    MessageReactionAdd(ReactionAdd),
    MessageReactionRemove(ReactionRemove),
    MessageReactionRemoveAll(ReactionRemoveAll),
    MessageReactionRemoveEmoji(ReactionRemoveEmoji),
    GuildMemberAdd(GuildMemberEvent),
    GuildMemberUpdate(GuildMemberEvent),
    GuildMemberRemove(GuildMemberRemove),
    Unimplemented(&'static str),
}

impl DispatchEvent {
    /// Decodes the body of a dispatch frame for the given kind.
    ///
    /// # Errors
    /// [`ProtocolError::Decode`] if the body doesn't match the record,
    /// [`ProtocolError::MissingField`] if READY lacks a session id.
    pub fn decode(kind: EventKind, d: &Value) -> Result<Self, ProtocolError> {
        Ok(match kind {
            EventKind::Ready => Self::Ready(Ready::from_data(d)?),
            EventKind::Resumed => Self::Resumed,
            EventKind::MessageCreate => Self::MessageCreate(parse(d)?),
            EventKind::MessageUpdate => Self::MessageUpdate(parse(d)?),
            EventKind::MessageDelete => Self::MessageDelete(parse(d)?),
            EventKind::MessageDeleteBulk => Self::MessageDeleteBulk(parse(d)?),
            EventKind::MessageReactionAdd => Self::MessageReactionAdd(parse(d)?),
            EventKind::MessageReactionRemove => Self::MessageReactionRemove(parse(d)?),
            EventKind::MessageReactionRemoveAll => {
                Self::MessageReactionRemoveAll(parse(d)?)
            }
            EventKind::MessageReactionRemoveEmoji => {
                Self::MessageReactionRemoveEmoji(parse(d)?)
            }
            EventKind::GuildMemberAdd => Self::GuildMemberAdd(parse(d)?),
            EventKind::GuildMemberUpdate => Self::GuildMemberUpdate(parse(d)?),
            EventKind::GuildMemberRemove => Self::GuildMemberRemove(parse(d)?),
            EventKind::Unimplemented(name) => Self::Unimplemented(name),
        })
    }
}

fn parse<T: DeserializeOwned>(d: &Value) -> Result<T, ProtocolError> {
    T::deserialize(d).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_name_round_trips_implemented_kinds() {
        for kind in [
            EventKind::Ready,
            EventKind::Resumed,
            EventKind::MessageCreate,
            EventKind::MessageDeleteBulk,
            EventKind::MessageReactionRemoveEmoji,
            EventKind::GuildMemberRemove,
        ] {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_from_name_buckets_known_but_unimplemented_events() {
        assert_eq!(
            EventKind::from_name("GUILD_CREATE"),
            Some(EventKind::Unimplemented("GUILD_CREATE"))
        );
        assert_eq!(
            EventKind::from_name("TYPING_START").map(EventKind::name),
            Some("TYPING_START")
        );
    }

    #[test]
    fn test_from_name_unknown_event_is_none() {
        assert_eq!(EventKind::from_name("SOMETHING_NEW"), None);
        assert_eq!(EventKind::from_name(""), None);
        assert_eq!(EventKind::from_name("ready"), None);
    }

    #[test]
    fn test_ready_captures_session_and_user() {
        let d = json!({
            "v": 10,
            "user": {"id": "80351110224678912", "username": "Nelly", "bot": true},
            "session_id": "d1b3a0f6",
            "resume_gateway_url": "wss://gateway-us-east1-b.discord.gg",
            "guilds": [],
        });
        let event = DispatchEvent::decode(EventKind::Ready, &d).unwrap();
        let DispatchEvent::Ready(ready) = event else {
            panic!("expected Ready");
        };
        assert_eq!(ready.session_id, "d1b3a0f6");
        assert_eq!(ready.user.username, "Nelly");
        assert_eq!(ready.v, 10);
    }

    #[test]
    fn test_ready_without_session_id_is_missing_field() {
        let d = json!({ "v": 10, "user": {"id": "1"} });
        assert!(matches!(
            DispatchEvent::decode(EventKind::Ready, &d),
            Err(ProtocolError::MissingField("session_id"))
        ));
    }

    #[test]
    fn test_delete_bulk_reads_id_list() {
        let d = json!({ "ids": ["1", "2", "3"], "channel_id": "9" });
        let event = DispatchEvent::decode(EventKind::MessageDeleteBulk, &d).unwrap();
        let DispatchEvent::MessageDeleteBulk(bulk) = event else {
            panic!("expected MessageDeleteBulk");
        };
        assert_eq!(bulk.ids, vec![Snowflake(1), Snowflake(2), Snowflake(3)]);
        assert_eq!(bulk.guild_id, None);
    }

    #[test]
    fn test_reaction_remove_all_reads_guild_id() {
        let d = json!({ "channel_id": "1", "message_id": "2", "guild_id": "3" });
        let event = DispatchEvent::decode(EventKind::MessageReactionRemoveAll, &d).unwrap();
        assert_eq!(
            event,
            DispatchEvent::MessageReactionRemoveAll(ReactionRemoveAll {
                channel_id: Snowflake(1),
                message_id: Snowflake(2),
                guild_id: Some(Snowflake(3)),
            })
        );
    }

    #[test]
    fn test_guild_member_add_flattens_member_fields() {
        let d = json!({
            "guild_id": "100",
            "user": {"id": "7", "username": "sol"},
            "nick": "Sol",
            "roles": ["5"],
            "joined_at": "2021-01-01T00:00:00+00:00",
            "deaf": false, "mute": false,
        });
        let event = DispatchEvent::decode(EventKind::GuildMemberAdd, &d).unwrap();
        let DispatchEvent::GuildMemberAdd(add) = event else {
            panic!("expected GuildMemberAdd");
        };
        assert_eq!(add.guild_id, Snowflake(100));
        assert_eq!(add.member.nick.as_deref(), Some("Sol"));
        assert_eq!(add.member.roles, vec![Snowflake(5)]);
    }

    #[test]
    fn test_reaction_add_missing_emoji_is_decode_error() {
        let d = json!({ "user_id": "1", "channel_id": "2", "message_id": "3" });
        assert!(matches!(
            DispatchEvent::decode(EventKind::MessageReactionAdd, &d),
            Err(ProtocolError::Decode(_))
        ));
    }
}
