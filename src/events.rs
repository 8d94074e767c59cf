//! The closed set of gateway events the tracker consumes, plus the
//! wire-shaped payload structs they carry.
//!
//! The upstream dispatcher owns decoding; these types only describe the
//! already-decoded values handed to [`handle_event`]. Every payload is
//! tolerant of absent fields (`serde(default)`) because gateway events are
//! routinely partial.
//!
//! [`handle_event`]: crate::InMemoryTracker::handle_event

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    Activity, Attachment, ChannelState, Embed, Emoji, PresenceStatus, Role, ThreadMember, User,
    VoiceState,
};

/// A guild as delivered by guild-create: the scalar fields plus the nested
/// topology and membership batches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildPayload {
    pub id: u64,
    pub name: String,
    pub icon: String,
    pub owner_id: u64,
    pub region: String,
    pub member_count: i64,
    pub unavailable: bool,

    pub channels: Vec<ChannelState>,
    pub threads: Vec<ChannelState>,
    pub roles: Vec<Role>,
    pub emojis: Vec<Emoji>,
    pub voice_states: Vec<VoiceState>,
    pub members: Vec<MemberPayload>,
    pub presences: Vec<PresencePayload>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildDeletePayload {
    pub id: u64,
    pub unavailable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberPayload {
    pub guild_id: u64,
    pub user: User,
    pub roles: Vec<u64>,
    pub nick: String,
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberRemovePayload {
    pub guild_id: u64,
    pub user: User,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresencePayload {
    pub guild_id: u64,
    pub user: User,
    pub status: PresenceStatus,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolePayload {
    pub guild_id: u64,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleDeletePayload {
    pub guild_id: u64,
    pub role_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagePayload {
    pub id: u64,
    pub channel_id: u64,
    pub guild_id: u64,
    pub author: User,
    pub member: Option<MemberPayload>,
    pub content: String,
    pub mentions: Vec<User>,
    pub mention_roles: Vec<u64>,
    pub attachments: Vec<Attachment>,
    pub embeds: Vec<Embed>,
    #[serde(rename = "type")]
    pub kind: i32,
    pub webhook_id: Option<u64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub edited_timestamp: Option<DateTime<Utc>>,
}

/// A message-update payload. Fields the update does not touch are empty /
/// `None`; `Some` slices replace the stored ones wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagePatch {
    pub id: u64,
    pub channel_id: u64,
    pub guild_id: u64,
    pub content: String,
    pub author: Option<User>,
    pub mentions: Option<Vec<User>>,
    pub mention_roles: Option<Vec<u64>>,
    pub attachments: Option<Vec<Attachment>>,
    pub embeds: Option<Vec<Embed>>,
    pub edited_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageDeletePayload {
    pub id: u64,
    pub channel_id: u64,
    pub guild_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageDeleteBulkPayload {
    pub ids: Vec<u64>,
    pub channel_id: u64,
    pub guild_id: u64,
}

/// Sent when the bot gains access to one or more channels; carries the full
/// set of active threads for those channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadListSyncPayload {
    pub guild_id: u64,
    /// Parent channel ids whose threads are being synced. May include
    /// channels with no active threads; their stale threads are dropped.
    pub channel_ids: Vec<u64>,
    pub threads: Vec<ChannelState>,
    /// Thread-member records for the current user in the synced threads.
    pub members: Vec<ThreadMember>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadMembersUpdatePayload {
    /// Thread id.
    pub id: u64,
    pub guild_id: u64,
    pub member_count: i32,
    pub added_members: Vec<ThreadMember>,
    pub removed_member_ids: Vec<u64>,
}

/// Sent when the bot's own thread-member record changes. Carries no guild
/// id; the tracker resolves it through the thread→guild index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadMemberUpdatePayload {
    pub member: ThreadMember,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmojisUpdatePayload {
    pub guild_id: u64,
    pub emojis: Vec<Emoji>,
}

/// A stub guild entry from the ready payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildStub {
    pub id: u64,
    pub unavailable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadyPayload {
    pub guilds: Vec<GuildStub>,
}

/// The closed event set. Unknown gateway events are dropped by the upstream
/// dispatcher before they reach the tracker; the dispatcher inside the shard
/// switches on this tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    GuildCreate(Box<GuildPayload>),
    GuildUpdate(Box<GuildPayload>),
    GuildDelete(GuildDeletePayload),

    ChannelCreate(ChannelState),
    ChannelUpdate(ChannelState),
    ChannelDelete(ChannelState),

    ThreadCreate(ChannelState),
    ThreadUpdate(ChannelState),
    ThreadDelete(ChannelState),
    ThreadListSync(ThreadListSyncPayload),
    ThreadMembersUpdate(ThreadMembersUpdatePayload),
    ThreadMemberUpdate(ThreadMemberUpdatePayload),

    GuildRoleCreate(RolePayload),
    GuildRoleUpdate(RolePayload),
    GuildRoleDelete(RoleDeletePayload),

    GuildMemberAdd(MemberPayload),
    GuildMemberUpdate(MemberPayload),
    GuildMemberRemove(MemberRemovePayload),

    MessageCreate(Box<MessagePayload>),
    MessageUpdate(Box<MessagePatch>),
    MessageDelete(MessageDeletePayload),
    MessageDeleteBulk(MessageDeleteBulkPayload),

    PresenceUpdate(PresencePayload),
    VoiceStateUpdate(VoiceState),
    GuildEmojisUpdate(EmojisUpdatePayload),

    Ready(ReadyPayload),
}
