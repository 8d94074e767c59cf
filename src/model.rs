//! Internal state records and the normalizers that build them from wire
//! payloads.
//!
//! Everything in here is value-typed: records published inside a guild
//! snapshot are never mutated in place, so readers can hold on to them after
//! the shard lock is released.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{MemberPayload, MessagePatch, MessagePayload, PresencePayload};

/// Millisecond epoch of the snowflake id scheme.
pub const SNOWFLAKE_EPOCH_MS: i64 = 1_420_070_400_000;

/// Extract the creation time embedded in a snowflake id.
pub fn snowflake_time(id: u64) -> DateTime<Utc> {
    let ms = (id >> 22) as i64 + SNOWFLAKE_EPOCH_MS;
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

// ── Guild ───────────────────────────────────────────────────────────

/// The guild scalar record. Mutated only via copy-on-write of the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildState {
    pub id: u64,
    pub available: bool,
    pub member_count: i64,
    pub owner_id: u64,
    pub region: String,
    pub name: String,
    pub icon: String,
}

// ── Channels ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ChannelType {
    Text,
    Dm,
    Voice,
    GroupDm,
    Category,
    News,
    NewsThread,
    PublicThread,
    PrivateThread,
    StageVoice,
    Unknown(u8),
}

impl Default for ChannelType {
    fn default() -> Self {
        ChannelType::Text
    }
}

impl From<u8> for ChannelType {
    fn from(v: u8) -> Self {
        match v {
            0 => ChannelType::Text,
            1 => ChannelType::Dm,
            2 => ChannelType::Voice,
            3 => ChannelType::GroupDm,
            4 => ChannelType::Category,
            5 => ChannelType::News,
            10 => ChannelType::NewsThread,
            11 => ChannelType::PublicThread,
            12 => ChannelType::PrivateThread,
            13 => ChannelType::StageVoice,
            other => ChannelType::Unknown(other),
        }
    }
}

impl From<ChannelType> for u8 {
    fn from(v: ChannelType) -> u8 {
        match v {
            ChannelType::Text => 0,
            ChannelType::Dm => 1,
            ChannelType::Voice => 2,
            ChannelType::GroupDm => 3,
            ChannelType::Category => 4,
            ChannelType::News => 5,
            ChannelType::NewsThread => 10,
            ChannelType::PublicThread => 11,
            ChannelType::PrivateThread => 12,
            ChannelType::StageVoice => 13,
            ChannelType::Unknown(other) => other,
        }
    }
}

impl ChannelType {
    pub fn is_thread(self) -> bool {
        matches!(
            self,
            ChannelType::NewsThread | ChannelType::PublicThread | ChannelType::PrivateThread
        )
    }

    pub fn is_private(self) -> bool {
        matches!(self, ChannelType::Dm | ChannelType::GroupDm)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwriteKind {
    Role,
    Member,
}

/// A channel-scoped (allow, deny) bitmask targeting a role or a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    pub id: u64,
    pub kind: OverwriteKind,
    pub allow: u64,
    pub deny: u64,
}

/// Thread-only metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadMetadata {
    pub archived: bool,
}

/// The bot's own membership record in a thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadMember {
    /// Thread id. Absent on some payload shapes, in which case the event
    /// envelope carries it.
    pub id: u64,
    pub user_id: u64,
    pub join_timestamp: Option<DateTime<Utc>>,
    pub flags: u64,
}

/// A channel record inside a guild snapshot. Doubles as the wire shape for
/// channel/thread events; incoming payloads are deep-copied into the
/// snapshot so the overwrite list is always a value-typed slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelState {
    pub id: u64,
    pub guild_id: u64,
    pub parent_id: u64,
    pub name: String,
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    pub nsfw: bool,
    pub position: i32,
    pub bitrate: i32,
    pub permission_overwrites: Vec<PermissionOverwrite>,

    /// Present for thread channels only.
    pub thread_metadata: Option<ThreadMetadata>,
    /// The bot's thread-member record, set while the bot is in the thread.
    pub member: Option<ThreadMember>,
    /// Approximate member count for threads.
    pub member_count: i32,
}

impl ChannelState {
    pub fn is_thread(&self) -> bool {
        self.kind.is_thread()
    }
}

/// Platform sort order for channel lists: position, ties broken by id.
pub fn sort_channels(channels: &mut [ChannelState]) {
    channels.sort_by(|a, b| a.position.cmp(&b.position).then(a.id.cmp(&b.id)));
}

// ── Roles / emojis / voice ──────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Role {
    pub id: u64,
    pub name: String,
    pub position: i32,
    pub permissions: u64,
    pub color: u32,
    pub hoist: bool,
    pub managed: bool,
    pub mentionable: bool,
}

/// Platform sort order for role lists: position, ties broken by id.
pub fn sort_roles(roles: &mut [Role]) {
    roles.sort_by(|a, b| a.position.cmp(&b.position).then(a.id.cmp(&b.id)));
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Emoji {
    pub id: u64,
    pub name: String,
    pub animated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceState {
    pub guild_id: u64,
    /// Zero when the user disconnected from voice.
    pub channel_id: u64,
    pub user_id: u64,
    pub session_id: String,
    pub deaf: bool,
    pub mute: bool,
    pub self_deaf: bool,
    pub self_mute: bool,
}

// ── Members ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub discriminator: String,
    pub avatar: String,
    pub bot: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    #[default]
    #[serde(rename = "")]
    NotSet,
    Online,
    Idle,
    Dnd,
    Invisible,
    Offline,
}

/// A trimmed-down activity record, enough to answer "what are they doing".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Activity {
    pub name: String,
    pub url: String,
    pub details: String,
    pub state: String,
    #[serde(rename = "type")]
    pub kind: i32,
}

/// Streaming activities take precedence as the displayed activity.
pub const ACTIVITY_STREAMING: i32 = 1;

/// Fields only known once the platform confirmed membership.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberFields {
    pub joined_at: Option<DateTime<Utc>>,
}

/// Fields only known from presence updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceFields {
    pub status: PresenceStatus,
    pub activity: Option<Activity>,
}

/// The fused member view, identified by `(guild_id, user.id)`.
///
/// Either sub-record may be absent: a member discovered through a presence
/// update has no `member` fields yet, and one discovered through a member
/// event has no `presence` fields yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberState {
    pub user: User,
    pub guild_id: u64,
    pub roles: Vec<u64>,
    pub nick: String,

    pub member: Option<MemberFields>,
    pub presence: Option<PresenceFields>,
}

impl MemberState {
    /// Build a member record from a guild-member payload. The presence
    /// sub-record stays unset; admission carries over any existing one.
    pub fn from_member(m: &MemberPayload) -> Self {
        Self {
            user: m.user.clone(),
            guild_id: m.guild_id,
            roles: m.roles.clone(),
            nick: m.nick.clone(),
            member: Some(MemberFields {
                joined_at: m.joined_at,
            }),
            presence: None,
        }
    }

    /// Build a member record from a presence payload. The primary activity
    /// is the first one, overridden by the first streaming-type activity.
    pub fn from_presence(p: &PresencePayload) -> Self {
        let mut activity = None;
        for (i, a) in p.activities.iter().enumerate() {
            if i == 0 || a.kind == ACTIVITY_STREAMING {
                activity = Some(a.clone());
            }
        }

        Self {
            user: p.user.clone(),
            guild_id: p.guild_id,
            roles: Vec::new(),
            nick: String::new(),
            member: None,
            presence: Some(PresenceFields {
                status: p.status,
                activity,
            }),
        }
    }
}

// ── Messages ────────────────────────────────────────────────────────

/// Metadata for a file attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    pub id: u64,
    pub filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub url: String,
}

/// Link/rich embed attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Embed {
    pub url: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
}

/// A message in the per-channel tail buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageState {
    pub id: u64,
    pub guild_id: u64,
    pub channel_id: u64,

    pub author: User,
    /// The author's guild-member record when the gateway attached one.
    pub member: Option<MemberState>,
    pub content: String,
    /// One step of edit history: the content before the latest edit.
    pub old_content: String,

    pub mentions: Vec<User>,
    pub mention_roles: Vec<u64>,
    pub attachments: Vec<Attachment>,
    pub embeds: Vec<Embed>,

    #[serde(rename = "type")]
    pub kind: i32,
    pub webhook_id: Option<u64>,

    /// Creation time, parsed eagerly on insert. `None` only when neither a
    /// timestamp nor a snowflake-derivable time was available; such messages
    /// are exempt from the age cap.
    pub created_at: Option<DateTime<Utc>>,
    pub edited_at: Option<DateTime<Utc>>,

    /// Set instead of removal when deleted messages are retained.
    pub deleted: bool,
}

impl MessageState {
    /// Normalize a message-create payload, parsing timestamps eagerly so
    /// the age sweep never parses in a loop. Falls back to the snowflake
    /// timestamp when the payload carries none.
    pub fn from_payload(m: &MessagePayload) -> Self {
        let created_at = m.timestamp.or_else(|| {
            if m.id != 0 {
                Some(snowflake_time(m.id))
            } else {
                None
            }
        });

        let member = m.member.as_ref().map(|mp| {
            let mut ms = MemberState::from_member(mp);
            ms.guild_id = m.guild_id;
            if ms.user.id == 0 {
                ms.user = m.author.clone();
            }
            ms
        });

        Self {
            id: m.id,
            guild_id: m.guild_id,
            channel_id: m.channel_id,
            author: m.author.clone(),
            member,
            content: m.content.clone(),
            old_content: String::new(),
            mentions: m.mentions.clone(),
            mention_roles: m.mention_roles.clone(),
            attachments: m.attachments.clone(),
            embeds: m.embeds.clone(),
            kind: m.kind,
            webhook_id: m.webhook_id,
            created_at,
            edited_at: m.edited_timestamp,
            deleted: false,
        }
    }

    /// Patch the fields present in an update payload. Non-empty content
    /// shifts the current content into `old_content`; `Some` slices replace
    /// wholesale.
    pub fn apply_patch(&mut self, patch: &MessagePatch) {
        if !patch.content.is_empty() {
            self.old_content = std::mem::replace(&mut self.content, patch.content.clone());
        }
        if let Some(author) = &patch.author {
            self.author = author.clone();
        }
        if let Some(mentions) = &patch.mentions {
            self.mentions = mentions.clone();
        }
        if let Some(mention_roles) = &patch.mention_roles {
            self.mention_roles = mention_roles.clone();
        }
        if let Some(embeds) = &patch.embeds {
            self.embeds = embeds.clone();
        }
        if let Some(attachments) = &patch.attachments {
            self.attachments = attachments.clone();
        }
        if patch.edited_timestamp.is_some() {
            self.edited_at = patch.edited_timestamp;
        }
    }

    /// Render the content with `<@id>` / `<@!id>` mention tokens replaced by
    /// `@username` from the mention list.
    pub fn content_with_mentions_replaced(&self) -> String {
        let mut content = self.content.clone();
        for user in &self.mentions {
            let plain = format!("<@{}>", user.id);
            let nick = format!("<@!{}>", user.id);
            let replacement = format!("@{}", user.username);
            content = content.replace(&plain, &replacement);
            content = content.replace(&nick, &replacement);
        }
        content
    }
}
