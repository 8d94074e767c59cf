//! Effective-permission calculation from the layered role + overwrite model.

use crate::model::{GuildState, OverwriteKind, PermissionOverwrite, Role};

pub const CREATE_INSTANT_INVITE: u64 = 1 << 0;
pub const KICK_MEMBERS: u64 = 1 << 1;
pub const BAN_MEMBERS: u64 = 1 << 2;
pub const ADMINISTRATOR: u64 = 1 << 3;
pub const MANAGE_CHANNELS: u64 = 1 << 4;
pub const MANAGE_GUILD: u64 = 1 << 5;
pub const ADD_REACTIONS: u64 = 1 << 6;
pub const VIEW_AUDIT_LOG: u64 = 1 << 7;
pub const PRIORITY_SPEAKER: u64 = 1 << 8;
pub const STREAM: u64 = 1 << 9;
pub const VIEW_CHANNEL: u64 = 1 << 10;
pub const SEND_MESSAGES: u64 = 1 << 11;
pub const SEND_TTS_MESSAGES: u64 = 1 << 12;
pub const MANAGE_MESSAGES: u64 = 1 << 13;
pub const EMBED_LINKS: u64 = 1 << 14;
pub const ATTACH_FILES: u64 = 1 << 15;
pub const READ_MESSAGE_HISTORY: u64 = 1 << 16;
pub const MENTION_EVERYONE: u64 = 1 << 17;
pub const USE_EXTERNAL_EMOJIS: u64 = 1 << 18;
pub const CONNECT: u64 = 1 << 20;
pub const SPEAK: u64 = 1 << 21;
pub const MUTE_MEMBERS: u64 = 1 << 22;
pub const DEAFEN_MEMBERS: u64 = 1 << 23;
pub const MOVE_MEMBERS: u64 = 1 << 24;
pub const USE_VAD: u64 = 1 << 25;
pub const CHANGE_NICKNAME: u64 = 1 << 26;
pub const MANAGE_NICKNAMES: u64 = 1 << 27;
pub const MANAGE_ROLES: u64 = 1 << 28;
pub const MANAGE_WEBHOOKS: u64 = 1 << 29;
pub const MANAGE_EMOJIS: u64 = 1 << 30;

pub const ALL_PERMISSIONS: u64 = !0;

/// Mask applied to channel overwrites before they touch the working set.
/// The platform performs no server-side validation of overwrite payloads, so
/// guild-global bits must not be grantable or revocable per channel.
pub const CHANNEL_PERMS_MASK: u64 = !(ADMINISTRATOR
    | MANAGE_GUILD
    | CHANGE_NICKNAME
    | MANAGE_ROLES
    | KICK_MEMBERS
    | BAN_MEMBERS);

/// Compute the effective permissions of a member in a channel.
///
/// `guild_roles` is the guild's full role list, `overwrites` the channel's
/// overwrite list (empty when computing guild-scope permissions),
/// `member_roles` the role ids the member holds. The guild owner and the
/// Administrator bit both short-circuit to all permissions.
pub fn calculate_permissions(
    guild: &GuildState,
    guild_roles: &[Role],
    overwrites: &[PermissionOverwrite],
    member_id: u64,
    member_roles: &[u64],
) -> u64 {
    if guild.owner_id == member_id {
        return ALL_PERMISSIONS;
    }

    let mut perms: u64 = 0;

    // Guild scope: the @everyone role shares its id with the guild.
    for role in guild_roles {
        if role.id == guild.id {
            perms |= role.permissions;
            break;
        }
    }

    for role in guild_roles {
        if member_roles.contains(&role.id) {
            perms |= role.permissions;
        }
    }

    // Administrator bypasses channel overwrites entirely.
    if perms & ADMINISTRATOR == ADMINISTRATOR {
        return ALL_PERMISSIONS;
    }

    if overwrites.is_empty() {
        return perms;
    }

    // @everyone overwrite first.
    for overwrite in overwrites {
        if overwrite.id == guild.id {
            perms &= !(overwrite.deny & CHANNEL_PERMS_MASK);
            perms |= overwrite.allow & CHANNEL_PERMS_MASK;
            break;
        }
    }

    // Member overwrites dominate role overwrites, so apply roles in a
    // combined pass first.
    let mut denies: u64 = 0;
    let mut allows: u64 = 0;
    for overwrite in overwrites {
        if overwrite.kind == OverwriteKind::Role && member_roles.contains(&overwrite.id) {
            denies |= overwrite.deny & CHANNEL_PERMS_MASK;
            allows |= overwrite.allow & CHANNEL_PERMS_MASK;
        }
    }

    perms &= !denies;
    perms |= allows;

    for overwrite in overwrites {
        if overwrite.kind == OverwriteKind::Member && overwrite.id == member_id {
            perms &= !(overwrite.deny & CHANNEL_PERMS_MASK);
            perms |= overwrite.allow & CHANNEL_PERMS_MASK;
            break;
        }
    }

    perms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_guild() -> GuildState {
        GuildState {
            id: 1,
            available: true,
            member_count: 3,
            owner_id: 1000,
            region: "eu-central".into(),
            name: "test guild".into(),
            icon: String::new(),
        }
    }

    fn role(id: u64, permissions: u64) -> Role {
        Role {
            id,
            name: format!("role-{id}"),
            position: 0,
            permissions,
            color: 0,
            hoist: false,
            managed: false,
            mentionable: false,
        }
    }

    fn overwrite(kind: OverwriteKind, id: u64, allow: u64, deny: u64) -> PermissionOverwrite {
        PermissionOverwrite {
            kind,
            id,
            allow,
            deny,
        }
    }

    #[test]
    fn test_owner_short_circuits() {
        let guild = test_guild();
        let overwrites = vec![overwrite(OverwriteKind::Member, 1000, 0, SEND_MESSAGES)];

        let perms = calculate_permissions(&guild, &[], &overwrites, 1000, &[]);
        assert_eq!(perms, ALL_PERMISSIONS);
    }

    #[test]
    fn test_administrator_bypasses_overwrites() {
        let guild = test_guild();
        let roles = vec![role(1, VIEW_CHANNEL), role(100, ADMINISTRATOR)];
        let overwrites = vec![overwrite(OverwriteKind::Role, 1, 0, SEND_MESSAGES)];

        let perms = calculate_permissions(&guild, &roles, &overwrites, 500, &[100]);
        assert_eq!(perms, ALL_PERMISSIONS);
    }

    #[test]
    fn test_empty_role_list_yields_nothing() {
        let guild = test_guild();
        let perms = calculate_permissions(&guild, &[], &[], 500, &[]);
        assert_eq!(perms, 0);
    }

    #[test]
    fn test_everyone_role_only() {
        let guild = test_guild();
        let roles = vec![role(1, VIEW_CHANNEL | SEND_MESSAGES)];

        let perms = calculate_permissions(&guild, &roles, &[], 500, &[]);
        assert_eq!(perms, VIEW_CHANNEL | SEND_MESSAGES);
    }

    #[test]
    fn test_member_roles_accumulate() {
        let guild = test_guild();
        let roles = vec![
            role(1, VIEW_CHANNEL),
            role(100, SEND_MESSAGES),
            role(101, ATTACH_FILES),
            role(102, MANAGE_MESSAGES),
        ];

        let perms = calculate_permissions(&guild, &roles, &[], 500, &[100, 101]);
        assert_eq!(perms, VIEW_CHANNEL | SEND_MESSAGES | ATTACH_FILES);
    }

    #[test]
    fn test_empty_overwrites_returns_guild_perms() {
        let guild = test_guild();
        let roles = vec![role(1, VIEW_CHANNEL | SEND_MESSAGES)];

        let perms = calculate_permissions(&guild, &roles, &[], 500, &[]);
        assert_eq!(perms, VIEW_CHANNEL | SEND_MESSAGES);
    }

    #[test]
    fn test_everyone_overwrite_applies() {
        let guild = test_guild();
        let roles = vec![role(1, VIEW_CHANNEL | SEND_MESSAGES)];
        let overwrites = vec![overwrite(OverwriteKind::Role, 1, 0, SEND_MESSAGES)];

        let perms = calculate_permissions(&guild, &roles, &overwrites, 500, &[]);
        assert_eq!(perms, VIEW_CHANNEL);
    }

    #[test]
    fn test_member_overwrite_dominates_role_overwrite() {
        let guild = test_guild();
        let roles = vec![role(1, VIEW_CHANNEL), role(100, 0)];
        let overwrites = vec![
            overwrite(OverwriteKind::Role, 100, 0, VIEW_CHANNEL),
            overwrite(OverwriteKind::Member, 500, VIEW_CHANNEL, 0),
        ];

        let perms = calculate_permissions(&guild, &roles, &overwrites, 500, &[100]);
        assert_eq!(perms, VIEW_CHANNEL);
    }

    #[test]
    fn test_role_overwrite_allow_beats_role_overwrite_deny() {
        // Within the combined role pass, allows are applied after denies.
        let guild = test_guild();
        let roles = vec![role(1, 0), role(100, 0), role(101, 0)];
        let overwrites = vec![
            overwrite(OverwriteKind::Role, 100, 0, SEND_MESSAGES),
            overwrite(OverwriteKind::Role, 101, SEND_MESSAGES, 0),
        ];

        let perms = calculate_permissions(&guild, &roles, &overwrites, 500, &[100, 101]);
        assert_eq!(perms, SEND_MESSAGES);
    }

    #[test]
    fn test_overwrites_cannot_grant_guild_global_bits() {
        let guild = test_guild();
        let roles = vec![role(1, 0)];
        let overwrites = vec![overwrite(
            OverwriteKind::Member,
            500,
            ADMINISTRATOR | KICK_MEMBERS | BAN_MEMBERS | SEND_MESSAGES,
            0,
        )];

        let perms = calculate_permissions(&guild, &roles, &overwrites, 500, &[]);
        assert_eq!(perms, SEND_MESSAGES);
    }

    #[test]
    fn test_overwrites_cannot_revoke_guild_global_bits() {
        let guild = test_guild();
        let roles = vec![role(1, KICK_MEMBERS | SEND_MESSAGES)];
        let overwrites = vec![overwrite(
            OverwriteKind::Member,
            500,
            0,
            KICK_MEMBERS | SEND_MESSAGES,
        )];

        let perms = calculate_permissions(&guild, &roles, &overwrites, 500, &[]);
        assert_eq!(perms, KICK_MEMBERS);
    }
}
