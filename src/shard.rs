//! Per-shard state and the event handlers that mutate it.
//!
//! One `ShardTracker` owns every guild routed to its shard. A single
//! read-write lock guards the four tables; mutation handlers take the write
//! lock, accessors the read lock. Guild topology lives in copy-on-write
//! [`GuildSet`] snapshots, so accessors can hand out handles that stay valid
//! after the lock is released.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, trace};

use crate::cache::GuildCache;
use crate::config::TrackerConfig;
use crate::events::{
    EmojisUpdatePayload, Event, GuildDeletePayload, GuildPayload, MemberPayload,
    MemberRemovePayload, MessageDeleteBulkPayload, MessageDeletePayload, MessagePatch,
    MessagePayload, PresencePayload, ReadyPayload, RoleDeletePayload, ThreadListSyncPayload,
    ThreadMemberUpdatePayload, ThreadMembersUpdatePayload,
};
use crate::guild_state::GuildSet;
use crate::message_buffer::MessageBuffer;
use crate::model::{
    sort_channels, sort_roles, ChannelState, GuildState, MemberState, MessageState,
    PresenceStatus, Role, VoiceState,
};

/// A member record plus the bookkeeping stamp the offline sweep keys on.
#[derive(Debug, Clone)]
pub struct WrappedMember {
    pub(crate) last_updated: Instant,
    pub member: MemberState,
}

/// The tables guarded by the shard lock.
#[derive(Debug, Default)]
pub(crate) struct ShardState {
    /// Copy-on-write root: guild id → published snapshot.
    pub(crate) guilds: HashMap<u64, GuildSet>,
    /// guild id → user id → member.
    pub(crate) members: HashMap<u64, HashMap<u64, WrappedMember>>,
    /// channel id → bounded message tail.
    pub(crate) messages: HashMap<u64, MessageBuffer>,
    /// Thread-member-update events omit the guild id; this index recovers it.
    pub(crate) threads_to_guild: HashMap<u64, u64>,
}

pub struct ShardTracker {
    pub(crate) shard_id: u32,
    pub(crate) conf: Arc<TrackerConfig>,
    pub(crate) state: RwLock<ShardState>,
    /// Per-guild request-coalescing caches. Lives outside the shard lock;
    /// the cache has its own synchronization.
    pub(crate) caches: DashMap<u64, Arc<GuildCache>>,
}

impl ShardTracker {
    pub(crate) fn new(conf: Arc<TrackerConfig>, shard_id: u32) -> Self {
        Self {
            shard_id,
            conf,
            state: RwLock::new(ShardState::default()),
            caches: DashMap::new(),
        }
    }

    /// Apply one gateway event. Handlers are total: any well-formed event
    /// produces an updated state, unroutable ones are dropped.
    pub fn handle_event(self: &Arc<Self>, event: Event) {
        trace!(shard_id = self.shard_id, ?event, "applying event");

        match event {
            Event::GuildCreate(gc) => self.handle_guild_create(*gc),
            Event::GuildUpdate(gu) => self.handle_guild_update(*gu),
            Event::GuildDelete(gd) => self.handle_guild_delete(gd),

            Event::ChannelCreate(c)
            | Event::ChannelUpdate(c)
            | Event::ThreadCreate(c)
            | Event::ThreadUpdate(c) => self.handle_channel_create_update(c),
            Event::ChannelDelete(c) => self.handle_channel_delete(&c),
            Event::ThreadDelete(c) => self.handle_thread_delete(&c),
            Event::ThreadListSync(evt) => self.handle_thread_list_sync(evt),
            Event::ThreadMembersUpdate(evt) => self.handle_thread_members_update(evt),
            Event::ThreadMemberUpdate(evt) => self.handle_thread_member_update(evt),

            Event::GuildRoleCreate(evt) | Event::GuildRoleUpdate(evt) => {
                self.handle_role_create_update(evt.guild_id, evt.role)
            }
            Event::GuildRoleDelete(evt) => self.handle_role_delete(evt),

            Event::GuildMemberAdd(m) => self.handle_member_add(m),
            Event::GuildMemberUpdate(m) => self.handle_member_update(m),
            Event::GuildMemberRemove(evt) => self.handle_member_remove(evt),

            Event::MessageCreate(m) => self.handle_message_create(&m),
            Event::MessageUpdate(patch) => self.handle_message_update(&patch),
            Event::MessageDelete(evt) => self.handle_message_delete(evt),
            Event::MessageDeleteBulk(evt) => self.handle_message_delete_bulk(evt),

            Event::PresenceUpdate(p) => self.handle_presence_update(p),
            Event::VoiceStateUpdate(vs) => self.handle_voice_state_update(vs),
            Event::GuildEmojisUpdate(evt) => self.handle_emojis_update(evt),

            Event::Ready(evt) => self.handle_ready(evt),
        }
    }

    // ── Guild events ────────────────────────────────────────────────

    fn handle_guild_create(self: &Arc<Self>, mut gc: GuildPayload) {
        let now = Instant::now();
        let mut state = self.state.write().unwrap();

        let mut channels = Vec::with_capacity(gc.channels.len() + gc.threads.len());
        for mut channel in gc.channels.drain(..) {
            channel.guild_id = gc.id;
            channels.push(channel);
        }
        for mut thread in gc.threads.drain(..) {
            thread.guild_id = gc.id;
            state.threads_to_guild.insert(thread.id, gc.id);
            channels.push(thread);
        }
        sort_channels(&mut channels);

        let mut roles = std::mem::take(&mut gc.roles);
        sort_roles(&mut roles);

        let guild = guild_scalar(&gc);
        let set = GuildSet::new(
            guild,
            channels,
            roles,
            std::mem::take(&mut gc.emojis),
            std::mem::take(&mut gc.voice_states),
        );
        state.guilds.insert(gc.id, set);

        // The presence batch lacks full user objects, so only presences
        // with a matching member entry are admitted; the member admit then
        // carries the presence over.
        for member in &gc.members {
            if let Some(presence) = gc.presences.iter().find(|p| p.user.id == member.user.id) {
                let mut pms = MemberState::from_presence(presence);
                pms.guild_id = gc.id;
                state.admit_presence(pms, true, now);
            }

            let mut ms = MemberState::from_member(member);
            ms.guild_id = gc.id;
            state.admit_member(ms, now);
        }

        debug!(shard_id = self.shard_id, guild_id = gc.id, "guild created");
    }

    fn handle_guild_update(self: &Arc<Self>, gu: GuildPayload) {
        let mut state = self.state.write().unwrap();

        let scalar = guild_scalar(&gu);
        let new_set = match state.guilds.get(&gu.id) {
            // The update payload carries no member count; keep the old one.
            Some(existing) => existing.with_guild(move |g| {
                let member_count = g.member_count;
                *g = scalar;
                g.member_count = member_count;
            }),
            None => GuildSet::stub(scalar),
        };
        state.guilds.insert(gu.id, new_set);
    }

    fn handle_guild_delete(self: &Arc<Self>, gd: GuildDeletePayload) {
        let mut state = self.state.write().unwrap();

        if gd.unavailable {
            // The guild still exists, we just lost it; keep the snapshot
            // and flip the flag.
            let new_set = state
                .guilds
                .get(&gd.id)
                .map(|existing| existing.with_guild(|g| g.available = false));
            if let Some(new_set) = new_set {
                state.guilds.insert(gd.id, new_set);
            }
            return;
        }

        if let Some(existing) = state.guilds.remove(&gd.id) {
            for channel in existing.channels.iter() {
                state.messages.remove(&channel.id);
            }
        }
        state.members.remove(&gd.id);
        state.threads_to_guild.retain(|_, guild_id| *guild_id != gd.id);
        drop(state);

        self.caches.remove(&gd.id);
        debug!(shard_id = self.shard_id, guild_id = gd.id, "guild removed");
    }

    // ── Channel and thread events ───────────────────────────────────

    fn handle_channel_create_update(self: &Arc<Self>, channel: ChannelState) {
        let guild_id = channel.guild_id;
        let channel_id = channel.id;
        let mut state = self.state.write().unwrap();

        if !state.guilds.contains_key(&guild_id) {
            // Happens around guild leaves; nothing to attach to.
            debug!(guild_id, channel_id, "channel event for untracked guild");
            return;
        }

        if channel.is_thread() {
            state.threads_to_guild.insert(channel_id, guild_id);
        }

        let Some(gs) = state.guilds.get(&guild_id) else {
            return;
        };
        let new_set = match gs.channels.iter().position(|c| c.id == channel_id) {
            Some(i) => gs.with_channels(move |channels| {
                channels[i] = channel;
                sort_channels(channels);
            }),
            None => gs.with_channels(move |channels| {
                channels.push(channel);
                sort_channels(channels);
            }),
        };
        state.guilds.insert(guild_id, new_set);
    }

    fn handle_channel_delete(self: &Arc<Self>, channel: &ChannelState) {
        let mut state = self.state.write().unwrap();

        state.messages.remove(&channel.id);

        let Some(gs) = state.guilds.get(&channel.guild_id) else {
            return;
        };
        let Some(i) = gs.channels.iter().position(|c| c.id == channel.id) else {
            return;
        };
        let new_set = gs.with_channels(|channels| {
            channels.remove(i);
        });
        state.guilds.insert(channel.guild_id, new_set);
    }

    // Same shape as channel-delete, plus the thread index entry.
    fn handle_thread_delete(self: &Arc<Self>, thread: &ChannelState) {
        let mut state = self.state.write().unwrap();

        state.messages.remove(&thread.id);
        state.threads_to_guild.remove(&thread.id);

        let Some(gs) = state.guilds.get(&thread.guild_id) else {
            return;
        };
        let Some(i) = gs.channels.iter().position(|c| c.id == thread.id) else {
            return;
        };
        let new_set = gs.with_channels(|channels| {
            channels.remove(i);
        });
        state.guilds.insert(thread.guild_id, new_set);
    }

    /// Sent when the bot gains access to channels. The listed parents may
    /// include channels with no active threads, so their stale unarchived
    /// threads are cleared before the sync set is upserted.
    fn handle_thread_list_sync(self: &Arc<Self>, evt: ThreadListSyncPayload) {
        let mut state = self.state.write().unwrap();

        if !state.guilds.contains_key(&evt.guild_id) {
            return;
        }

        if !evt.channel_ids.is_empty() {
            let removed: Vec<u64> = match state.guilds.get(&evt.guild_id) {
                Some(gs) => gs
                    .channels
                    .iter()
                    .filter(|c| {
                        c.is_thread()
                            && evt.channel_ids.contains(&c.parent_id)
                            && !c.thread_metadata.map(|m| m.archived).unwrap_or(false)
                    })
                    .map(|c| c.id)
                    .collect(),
                None => Vec::new(),
            };

            if !removed.is_empty() {
                if let Some(gs) = state.guilds.get(&evt.guild_id) {
                    let new_set =
                        gs.with_channels(|channels| channels.retain(|c| !removed.contains(&c.id)));
                    state.guilds.insert(evt.guild_id, new_set);
                }
                for thread_id in &removed {
                    state.messages.remove(thread_id);
                    state.threads_to_guild.remove(thread_id);
                }
            }
        }

        for mut thread in evt.threads {
            thread.guild_id = evt.guild_id;
            state.threads_to_guild.insert(thread.id, evt.guild_id);

            // The members list carries our own thread-member records for
            // the synced threads, keyed by thread id.
            if let Some(member) = evt.members.iter().find(|m| m.id == thread.id) {
                thread.member = Some(member.clone());
            }

            let Some(gs) = state.guilds.get(&evt.guild_id) else {
                return;
            };
            let new_set = match gs.channels.iter().position(|c| c.id == thread.id) {
                Some(i) => gs.with_channels(move |channels| {
                    channels[i] = thread;
                    sort_channels(channels);
                }),
                None => gs.with_channels(move |channels| {
                    channels.push(thread);
                    sort_channels(channels);
                }),
            };
            state.guilds.insert(evt.guild_id, new_set);
        }
    }

    /// Sent when anyone joins or leaves a thread; we only track our own
    /// membership flag plus the member count.
    fn handle_thread_members_update(self: &Arc<Self>, evt: ThreadMembersUpdatePayload) {
        let mut state = self.state.write().unwrap();

        if !state.guilds.contains_key(&evt.guild_id) {
            return;
        }
        state.threads_to_guild.insert(evt.id, evt.guild_id);

        let Some(gs) = state.guilds.get(&evt.guild_id) else {
            return;
        };
        let Some(i) = gs.channels.iter().position(|c| c.id == evt.id) else {
            return;
        };

        let bot_id = self.conf.bot_member_id;
        let removed = evt.removed_member_ids.contains(&bot_id);
        let added = evt
            .added_members
            .iter()
            .find(|m| m.user_id == bot_id)
            .cloned();
        let member_count = evt.member_count;

        let new_set = gs.with_channels(move |channels| {
            channels[i].member_count = member_count;
            if removed {
                channels[i].member = None;
            } else if let Some(member) = added {
                channels[i].member = Some(member);
            }
        });
        state.guilds.insert(evt.guild_id, new_set);
    }

    /// The payload carries no guild id; resolve it through the thread index
    /// and drop the event if the thread is unknown.
    fn handle_thread_member_update(self: &Arc<Self>, evt: ThreadMemberUpdatePayload) {
        let thread_id = evt.member.id;
        let mut state = self.state.write().unwrap();

        let Some(&guild_id) = state.threads_to_guild.get(&thread_id) else {
            debug!(thread_id, "thread member update for unknown thread");
            return;
        };
        let Some(gs) = state.guilds.get(&guild_id) else {
            return;
        };
        let Some(i) = gs.channels.iter().position(|c| c.id == thread_id) else {
            return;
        };

        let member = evt.member;
        let new_set = gs.with_channels(move |channels| channels[i].member = Some(member));
        state.guilds.insert(guild_id, new_set);
    }

    // ── Role events ─────────────────────────────────────────────────

    fn handle_role_create_update(self: &Arc<Self>, guild_id: u64, role: Role) {
        let mut state = self.state.write().unwrap();

        let Some(gs) = state.guilds.get(&guild_id) else {
            return;
        };
        let new_set = match gs.roles.iter().position(|r| r.id == role.id) {
            Some(i) => gs.with_roles(move |roles| {
                roles[i] = role;
                sort_roles(roles);
            }),
            None => gs.with_roles(move |roles| {
                roles.push(role);
                sort_roles(roles);
            }),
        };
        state.guilds.insert(guild_id, new_set);
    }

    fn handle_role_delete(self: &Arc<Self>, evt: RoleDeletePayload) {
        let mut state = self.state.write().unwrap();

        let Some(gs) = state.guilds.get(&evt.guild_id) else {
            return;
        };
        let Some(i) = gs.roles.iter().position(|r| r.id == evt.role_id) else {
            return;
        };
        let new_set = gs.with_roles(|roles| {
            roles.remove(i);
        });
        state.guilds.insert(evt.guild_id, new_set);
    }

    // ── Member events ───────────────────────────────────────────────

    fn handle_member_add(self: &Arc<Self>, m: MemberPayload) {
        let now = Instant::now();
        let mut state = self.state.write().unwrap();

        let Some(gs) = state.guilds.get(&m.guild_id) else {
            return;
        };
        let new_set = gs.with_guild(|g| g.member_count += 1);
        state.guilds.insert(m.guild_id, new_set);

        state.admit_member(MemberState::from_member(&m), now);
    }

    fn handle_member_update(self: &Arc<Self>, m: MemberPayload) {
        let now = Instant::now();
        let mut state = self.state.write().unwrap();
        state.admit_member(MemberState::from_member(&m), now);
    }

    fn handle_member_remove(self: &Arc<Self>, evt: MemberRemovePayload) {
        let mut state = self.state.write().unwrap();

        let Some(gs) = state.guilds.get(&evt.guild_id) else {
            return;
        };
        let new_set = gs.with_guild(|g| g.member_count -= 1);
        state.guilds.insert(evt.guild_id, new_set);

        if let Some(members) = state.members.get_mut(&evt.guild_id) {
            members.remove(&evt.user.id);
        }
    }

    // ── Presence events ─────────────────────────────────────────────

    fn handle_presence_update(self: &Arc<Self>, p: PresencePayload) {
        if p.user.id == 0 {
            debug!(guild_id = p.guild_id, "presence update without user");
            return;
        }

        let now = Instant::now();
        let guild_id = p.guild_id;
        let user_id = p.user.id;
        let status = p.status;

        {
            let mut state = self.state.write().unwrap();
            let ms = MemberState::from_presence(&p);
            state.admit_presence(ms, false, now);
        }

        // Offline members are only worth keeping briefly; schedule the
        // removal and re-check at the horizon in case they reconnected.
        if status == PresenceStatus::Offline {
            if let Some(after) = self.conf.remove_offline_members_after {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    let shard = Arc::clone(self);
                    handle.spawn(async move {
                        tokio::time::sleep(after).await;
                        shard.remove_member_if_still_offline(guild_id, user_id);
                    });
                }
            }
        }
    }

    /// Delayed-removal re-check. A vanished guild or member is a no-op.
    pub(crate) fn remove_member_if_still_offline(&self, guild_id: u64, user_id: u64) {
        let mut state = self.state.write().unwrap();
        let Some(members) = state.members.get_mut(&guild_id) else {
            return;
        };
        let Some(wrapped) = members.get(&user_id) else {
            return;
        };

        let still_offline = match &wrapped.member.presence {
            None => true,
            Some(p) => matches!(p.status, PresenceStatus::Offline | PresenceStatus::NotSet),
        };
        if still_offline {
            members.remove(&user_id);
            debug!(guild_id, user_id, "removed offline member");
        }
    }

    // ── Voice events ────────────────────────────────────────────────

    fn handle_voice_state_update(self: &Arc<Self>, vs: VoiceState) {
        let guild_id = vs.guild_id;
        let mut state = self.state.write().unwrap();

        let Some(gs) = state.guilds.get(&guild_id) else {
            return;
        };
        let new_set = match gs.voice_states.iter().position(|v| v.user_id == vs.user_id) {
            // Left voice entirely.
            Some(i) if vs.channel_id == 0 => gs.with_voice_states(move |states| {
                states.remove(i);
            }),
            // Moved or changed mute/deaf state.
            Some(i) => gs.with_voice_states(move |states| states[i] = vs),
            // Joined a voice channel.
            None if vs.channel_id != 0 => gs.with_voice_states(move |states| states.push(vs)),
            None => return,
        };
        state.guilds.insert(guild_id, new_set);
    }

    // ── Message events ──────────────────────────────────────────────

    fn handle_message_create(self: &Arc<Self>, m: &MessagePayload) {
        if m.guild_id == 0 {
            // Direct messages are not tracked.
            return;
        }

        let (max_count, max_age) = self.conf.message_limits(m.guild_id);
        let msg = MessageState::from_payload(m);
        let now = Utc::now();

        let mut state = self.state.write().unwrap();
        let buffer = state.messages.entry(m.channel_id).or_default();
        buffer.insert(msg, now, max_age);
        buffer.enforce(now, max_count, max_age);
    }

    fn handle_message_update(self: &Arc<Self>, patch: &MessagePatch) {
        if patch.guild_id == 0 {
            return;
        }

        let mut state = self.state.write().unwrap();
        let buffer = state.messages.entry(patch.channel_id).or_default();
        buffer.apply_update(patch);
    }

    fn handle_message_delete(self: &Arc<Self>, evt: MessageDeletePayload) {
        if evt.guild_id == 0 {
            return;
        }

        let mark = self.conf.keep_deleted_messages;
        let mut state = self.state.write().unwrap();
        if let Some(buffer) = state.messages.get_mut(&evt.channel_id) {
            buffer.remove(evt.id, mark);
        }
    }

    fn handle_message_delete_bulk(self: &Arc<Self>, evt: MessageDeleteBulkPayload) {
        if evt.guild_id == 0 {
            return;
        }

        let mark = self.conf.keep_deleted_messages;
        let mut state = self.state.write().unwrap();
        if let Some(buffer) = state.messages.get_mut(&evt.channel_id) {
            buffer.remove_bulk(&evt.ids, mark);
        }
    }

    // ── Misc events ─────────────────────────────────────────────────

    fn handle_emojis_update(self: &Arc<Self>, evt: EmojisUpdatePayload) {
        let mut state = self.state.write().unwrap();

        let Some(gs) = state.guilds.get(&evt.guild_id) else {
            return;
        };
        let emojis = evt.emojis;
        let new_set = gs.with_emojis(move |e| *e = emojis);
        state.guilds.insert(evt.guild_id, new_set);
    }

    fn handle_ready(self: &Arc<Self>, evt: ReadyPayload) {
        let mut state = self.state.write().unwrap();
        *state = ShardState::default();

        for stub in &evt.guilds {
            state.guilds.insert(
                stub.id,
                GuildSet::stub(GuildState {
                    id: stub.id,
                    available: !stub.unavailable,
                    ..Default::default()
                }),
            );
        }
        drop(state);

        self.caches.clear();
        debug!(
            shard_id = self.shard_id,
            guilds = evt.guilds.len(),
            "shard reset from ready"
        );
    }

    // ── GC ──────────────────────────────────────────────────────────

    pub(crate) fn guild_ids(&self) -> Vec<u64> {
        let state = self.state.read().unwrap();
        let mut ids: Vec<u64> = state.guilds.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// One guild's GC pass: cache eviction plus, when configured, removal
    /// of members that have sat offline past the horizon. The shard lock is
    /// held only for this guild's member sweep.
    pub(crate) fn run_guild_gc(&self, guild_id: u64) -> usize {
        let mut evicted = 0;

        if let Some(cache) = self.caches.get(&guild_id) {
            if let Some(threshold) = Instant::now().checked_sub(self.conf.cache_expiry) {
                evicted += cache.evict_before(threshold);
            }
        }

        if let Some(after) = self.conf.remove_offline_members_after {
            let bot_id = self.conf.bot_member_id;
            let mut state = self.state.write().unwrap();
            if let Some(members) = state.members.get_mut(&guild_id) {
                let before = members.len();
                members.retain(|_, wrapped| {
                    if wrapped.member.user.id == bot_id {
                        return true;
                    }
                    let offline = match &wrapped.member.presence {
                        None => true,
                        Some(p) => {
                            matches!(p.status, PresenceStatus::Offline | PresenceStatus::NotSet)
                        }
                    };
                    !(offline && wrapped.last_updated.elapsed() > after)
                });
                evicted += before - members.len();
            }
        }

        if evicted > 0 {
            debug!(shard_id = self.shard_id, guild_id, evicted, "guild gc pass");
        }
        evicted
    }
}

impl ShardState {
    /// Admit a member record from a member event. The full user object is
    /// present by contract; any existing presence sub-record carries over.
    pub(crate) fn admit_member(&mut self, ms: MemberState, now: Instant) {
        let members = self.members.entry(ms.guild_id).or_default();
        let user_id = ms.user.id;

        let mut wrapped = WrappedMember {
            last_updated: now,
            member: ms,
        };
        if let Some(existing) = members.get(&user_id) {
            wrapped.member.presence = existing.member.presence.clone();
        }

        members.insert(user_id, wrapped);
    }

    /// Admit a member record from a presence. Presence payloads may lack
    /// the user object, so a record is created only when the username is
    /// known or the caller vouches for it (guild-create batches); otherwise
    /// the update only fuses into an already-admitted member.
    pub(crate) fn admit_presence(&mut self, ms: MemberState, skip_full_user_check: bool, now: Instant) {
        let guild_id = ms.guild_id;
        let user_id = ms.user.id;

        let mut wrapped = WrappedMember {
            last_updated: now,
            member: ms,
        };

        let Some(members) = self.members.get_mut(&guild_id) else {
            if skip_full_user_check || !wrapped.member.user.username.is_empty() {
                self.members
                    .entry(guild_id)
                    .or_default()
                    .insert(user_id, wrapped);
            }
            return;
        };

        if let Some(existing) = members.get(&user_id) {
            // Carry over the guild-member side of the record.
            wrapped.member.member = existing.member.member.clone();
            wrapped.member.roles = existing.member.roles.clone();
            wrapped.member.nick = existing.member.nick.clone();
            if wrapped.member.user.username.is_empty() {
                wrapped.member.user = existing.member.user.clone();
            }
        } else if !skip_full_user_check && wrapped.member.user.username.is_empty() {
            // Not enough information to admit a coherent record.
            return;
        }

        members.insert(user_id, wrapped);
    }
}

fn guild_scalar(g: &GuildPayload) -> GuildState {
    if g.unavailable {
        return GuildState {
            id: g.id,
            available: false,
            ..Default::default()
        };
    }

    GuildState {
        id: g.id,
        available: true,
        member_count: g.member_count,
        owner_id: g.owner_id,
        region: g.region.clone(),
        name: g.name.clone(),
        icon: g.icon.clone(),
    }
}
