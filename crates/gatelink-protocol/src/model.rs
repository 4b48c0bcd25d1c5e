//! Entity records carried inside dispatch events.
//!
//! Only the fields the dispatch contract needs are modelled; serde
//! ignores the rest of what the gateway sends. Fields that some events
//! omit (partial message updates, members without a user, ...) default
//! instead of failing the whole event.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Snowflake
// ---------------------------------------------------------------------------

/// A 64-bit entity identifier (user, channel, message, guild, ...).
///
/// The gateway sends snowflakes as decimal strings so that JavaScript
/// clients don't lose precision. We accept either a string or a bare
/// integer and always serialize as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Snowflake(pub u64);

impl Snowflake {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnowflakeVisitor;

        impl Visitor<'_> for SnowflakeVisitor {
            type Value = Snowflake;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a snowflake as a decimal string or integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Snowflake, E> {
                Ok(Snowflake(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Snowflake, E> {
                u64::try_from(v)
                    .map(Snowflake)
                    .map_err(|_| E::custom("snowflake must not be negative"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Snowflake, E> {
                v.parse().map(Snowflake).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Snowflake,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GuildMember {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default)]
    pub joined_at: Option<String>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
}

/// A reaction emoji. Unicode emoji have no id, only a name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Emoji {
    #[serde(default)]
    pub id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub member: Option<GuildMember>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub edited_timestamp: Option<String>,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub mention_everyone: bool,
    #[serde(default)]
    pub mentions: Vec<User>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub webhook_id: Option<Snowflake>,
    #[serde(rename = "type", default)]
    pub kind: u8,
}

impl Message {
    /// Whether the author is a bot account.
    pub fn is_from_bot(&self) -> bool {
        self.author.as_ref().is_some_and(|a| a.bot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_accepts_string_and_integer() {
        let a: Snowflake = serde_json::from_str(r#""175928847299117063""#).unwrap();
        let b: Snowflake = serde_json::from_str("175928847299117063").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.get(), 175_928_847_299_117_063);
    }

    #[test]
    fn test_snowflake_serializes_as_string() {
        let json = serde_json::to_string(&Snowflake(42)).unwrap();
        assert_eq!(json, r#""42""#);
    }

    #[test]
    fn test_snowflake_rejects_garbage() {
        assert!(serde_json::from_str::<Snowflake>(r#""not-a-number""#).is_err());
        assert!(serde_json::from_str::<Snowflake>("-5").is_err());
    }

    #[test]
    fn test_message_decodes_with_unknown_fields_ignored() {
        let json = r#"{
            "id": "1", "channel_id": "2", "guild_id": "3",
            "author": {"id": "4", "username": "sol", "bot": true},
            "content": "!system Sol",
            "type": 0,
            "embeds": [], "attachments": [], "nonce": "xyz"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, Snowflake(1));
        assert_eq!(msg.guild_id, Some(Snowflake(3)));
        assert_eq!(msg.content, "!system Sol");
        assert!(msg.is_from_bot());
    }

    #[test]
    fn test_partial_message_update_decodes() {
        // MESSAGE_UPDATE may carry only the ids and the changed fields.
        let msg: Message =
            serde_json::from_str(r#"{"id":"10","channel_id":"20","pinned":true}"#).unwrap();
        assert!(msg.pinned);
        assert!(msg.author.is_none());
        assert!(msg.content.is_empty());
    }

    #[test]
    fn test_unicode_emoji_has_no_id() {
        let emoji: Emoji = serde_json::from_str(r#"{"id":null,"name":"🔥"}"#).unwrap();
        assert_eq!(emoji.id, None);
        assert_eq!(emoji.name.as_deref(), Some("🔥"));
    }
}
