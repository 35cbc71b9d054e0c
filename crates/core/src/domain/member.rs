use std::fmt;

use serde::{Deserialize, Serialize};

/// Platform identity of a user (a Discord snowflake).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserRef(pub String);

impl UserRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Discord user mention markup, e.g. `<@1234>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(pub String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn mention(&self) -> String {
        format!("<@&{}>", self.0)
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuildId(pub String);

impl GuildId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Guild member as reported by the role directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMember {
    pub user: UserRef,
    pub is_bot: bool,
    pub roles: Vec<RoleId>,
}

impl GuildMember {
    pub fn has_role(&self, role: &RoleId) -> bool {
        self.roles.iter().any(|candidate| candidate == role)
    }
}

#[cfg(test)]
mod tests {
    use super::{GuildMember, RoleId, UserRef};

    #[test]
    fn mentions_use_discord_markup() {
        assert_eq!(UserRef::new("42").mention(), "<@42>");
        assert_eq!(RoleId::new("7").mention(), "<@&7>");
    }

    #[test]
    fn member_role_lookup_matches_exact_ids() {
        let member = GuildMember {
            user: UserRef::new("1"),
            is_bot: false,
            roles: vec![RoleId::new("10"), RoleId::new("11")],
        };

        assert!(member.has_role(&RoleId::new("11")));
        assert!(!member.has_role(&RoleId::new("1")));
    }
}
