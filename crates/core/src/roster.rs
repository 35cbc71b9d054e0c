//! Role-toggle standby mode: members opt in by holding the standby role and the
//! channel is pinged once enough of them are waiting.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::member::{GuildId, RoleId, UserRef};
use crate::domain::message::{ChannelId, MessageRef};
use crate::errors::QueueError;
use crate::gateway::{GatewayError, NotificationGateway, OutboundMessage, RoleDirectory};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterSettings {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub standby_role: RoleId,
    pub admin_role: RoleId,
    /// Standby members (bots excluded) needed before the alert is posted.
    pub threshold: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}

impl ToggleOutcome {
    pub fn reply(self, threshold: usize) -> String {
        match self {
            Self::Added => format!(
                "You have been added to standby and will get pinged when {threshold} users are on standby. Type /standby again to remove yourself."
            ),
            Self::Removed => "You have been removed from standby.".to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub removed: usize,
    pub failed: usize,
}

pub fn enough_members_alert(role: &RoleId) -> OutboundMessage {
    OutboundMessage::text(format!("{} there are enough members for a game!", role.mention()))
}

pub struct StandbyRoster {
    directory: Arc<dyn RoleDirectory>,
    gateway: Arc<dyn NotificationGateway>,
    settings: RosterSettings,
    alert: Mutex<Option<MessageRef>>,
}

impl StandbyRoster {
    pub fn new(
        directory: Arc<dyn RoleDirectory>,
        gateway: Arc<dyn NotificationGateway>,
        settings: RosterSettings,
    ) -> Self {
        Self { directory, gateway, settings, alert: Mutex::new(None) }
    }

    pub fn settings(&self) -> &RosterSettings {
        &self.settings
    }

    pub async fn active_alert(&self) -> Option<MessageRef> {
        self.alert.lock().await.clone()
    }

    /// Adds the standby role to `user`, or removes it when already held.
    pub async fn toggle(&self, user: &UserRef) -> Result<ToggleOutcome, QueueError> {
        let mut alert = self.alert.lock().await;
        let settings = &self.settings;

        let roles = self
            .directory
            .member_roles(&settings.guild, user)
            .await
            .map_err(QueueError::MemberResolution)?;

        let outcome = if roles.contains(&settings.standby_role) {
            self.directory.remove_member_role(&settings.guild, user, &settings.standby_role).await?;
            ToggleOutcome::Removed
        } else {
            self.directory.add_member_role(&settings.guild, user, &settings.standby_role).await?;
            ToggleOutcome::Added
        };
        info!(
            event_name = "roster.toggled",
            user_id = %user,
            outcome = ?outcome,
            "standby role toggled"
        );

        self.reconcile_alert(&mut alert).await;
        Ok(outcome)
    }

    /// Removes the standby role from every member holding it. Admins only.
    pub async fn purge(&self, caller: &UserRef) -> Result<PurgeReport, QueueError> {
        let mut alert = self.alert.lock().await;
        let settings = &self.settings;

        let roles = match self.directory.member_roles(&settings.guild, caller).await {
            Ok(roles) => roles,
            Err(error) => {
                warn!(
                    event_name = "roster.purge_role_lookup_failed",
                    user_id = %caller,
                    error = %error,
                    "treating caller as non-admin"
                );
                return Err(QueueError::NotAuthorized);
            }
        };
        if !roles.contains(&settings.admin_role) {
            return Err(QueueError::NotAuthorized);
        }

        let members = self.directory.list_members(&settings.guild).await?;
        let mut report = PurgeReport::default();
        for member in members.iter().filter(|member| member.has_role(&settings.standby_role)) {
            match self
                .directory
                .remove_member_role(&settings.guild, &member.user, &settings.standby_role)
                .await
            {
                Ok(()) => report.removed += 1,
                Err(error) => {
                    report.failed += 1;
                    warn!(
                        event_name = "roster.purge_member_failed",
                        user_id = %member.user,
                        error = %error,
                        "could not remove standby role"
                    );
                }
            }
        }
        info!(
            event_name = "roster.purged",
            user_id = %caller,
            removed = report.removed,
            failed = report.failed,
            "standby roster purged"
        );

        self.reconcile_alert(&mut alert).await;
        Ok(report)
    }

    pub async fn standby_count(&self) -> Result<usize, GatewayError> {
        let members = self.directory.list_members(&self.settings.guild).await?;
        Ok(members
            .iter()
            .filter(|member| !member.is_bot && member.has_role(&self.settings.standby_role))
            .count())
    }

    async fn reconcile_alert(&self, alert: &mut Option<MessageRef>) {
        let count = match self.standby_count().await {
            Ok(count) => count,
            Err(error) => {
                warn!(
                    event_name = "roster.count_failed",
                    error = %error,
                    "could not count standby members"
                );
                return;
            }
        };

        let wanted = count >= self.settings.threshold;
        match (wanted, alert.clone()) {
            (true, None) => {
                let message = enough_members_alert(&self.settings.standby_role);
                match self.gateway.send_message(&self.settings.channel, &message).await {
                    Ok(message_ref) => {
                        info!(
                            event_name = "roster.alert_posted",
                            message_id = %message_ref,
                            standby = count,
                            "enough standby members"
                        );
                        *alert = Some(message_ref);
                    }
                    Err(error) => warn!(
                        event_name = "roster.alert_post_failed",
                        error = %error,
                        "could not post standby alert"
                    ),
                }
            }
            (false, Some(message_ref)) => {
                match self.gateway.delete_message(&self.settings.channel, &message_ref).await {
                    Ok(()) => {}
                    Err(error) if error.is_not_found() => {}
                    Err(error) => {
                        warn!(
                            event_name = "roster.alert_delete_failed",
                            message_id = %message_ref,
                            error = %error,
                            "could not delete standby alert"
                        );
                        return;
                    }
                }
                *alert = None;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{PurgeReport, RosterSettings, StandbyRoster, ToggleOutcome};
    use crate::domain::member::{GuildId, GuildMember, RoleId, UserRef};
    use crate::domain::message::ChannelId;
    use crate::errors::QueueError;
    use crate::gateway::{GatewayOperation, InMemoryGateway};

    const STANDBY: &str = "role-standby";
    const ADMIN: &str = "role-admin";

    fn member(id: &str, is_bot: bool, roles: &[&str]) -> GuildMember {
        GuildMember {
            user: UserRef::new(id),
            is_bot,
            roles: roles.iter().map(|role| RoleId::new(*role)).collect(),
        }
    }

    fn roster(members: Vec<GuildMember>, threshold: usize) -> (Arc<InMemoryGateway>, StandbyRoster) {
        let gateway = Arc::new(InMemoryGateway::with_members(members));
        let settings = RosterSettings {
            guild: GuildId::new("G1"),
            channel: ChannelId::new("C1"),
            standby_role: RoleId::new(STANDBY),
            admin_role: RoleId::new(ADMIN),
            threshold,
        };
        let roster = StandbyRoster::new(gateway.clone(), gateway.clone(), settings);
        (gateway, roster)
    }

    #[tokio::test]
    async fn toggle_flips_role_membership() {
        let (gateway, roster) = roster(vec![member("a", false, &[])], 5);
        let user = UserRef::new("a");

        assert_eq!(roster.toggle(&user).await, Ok(ToggleOutcome::Added));
        assert!(gateway.member(&user).expect("member").has_role(&RoleId::new(STANDBY)));

        assert_eq!(roster.toggle(&user).await, Ok(ToggleOutcome::Removed));
        assert!(!gateway.member(&user).expect("member").has_role(&RoleId::new(STANDBY)));
    }

    #[tokio::test]
    async fn alert_posts_at_threshold_ignoring_bots_and_clears_below_it() {
        let (gateway, roster) = roster(
            vec![
                member("bot", true, &[STANDBY]),
                member("a", false, &[STANDBY]),
                member("b", false, &[]),
            ],
            2,
        );

        assert_eq!(roster.standby_count().await, Ok(1));
        roster.toggle(&UserRef::new("b")).await.expect("toggle");

        let alert = roster.active_alert().await.expect("alert posted");
        assert_eq!(
            gateway.live_texts(),
            vec![format!("<@&{STANDBY}> there are enough members for a game!")]
        );

        roster.toggle(&UserRef::new("a")).await.expect("toggle");
        assert!(roster.active_alert().await.is_none());
        assert!(gateway.live_message(&alert).is_none());
    }

    #[tokio::test]
    async fn alert_is_not_reposted_while_threshold_holds() {
        let (gateway, roster) = roster(
            vec![member("a", false, &[STANDBY]), member("b", false, &[]), member("c", false, &[])],
            2,
        );

        roster.toggle(&UserRef::new("b")).await.expect("toggle");
        roster.toggle(&UserRef::new("c")).await.expect("toggle");

        assert_eq!(gateway.live_count(), 1);
    }

    #[tokio::test]
    async fn purge_requires_admin_role() {
        let (gateway, roster) =
            roster(vec![member("a", false, &[STANDBY]), member("b", false, &[STANDBY])], 5);

        let result = roster.purge(&UserRef::new("a")).await;

        assert_eq!(result, Err(QueueError::NotAuthorized));
        assert!(gateway.member(&UserRef::new("b")).expect("member").has_role(&RoleId::new(STANDBY)));
    }

    #[tokio::test]
    async fn purge_fails_closed_when_role_lookup_fails() {
        let (gateway, roster) = roster(vec![member("admin", false, &[ADMIN])], 5);
        gateway.fail_next(GatewayOperation::MemberRoles);

        assert_eq!(roster.purge(&UserRef::new("admin")).await, Err(QueueError::NotAuthorized));
    }

    #[tokio::test]
    async fn purge_removes_every_standby_member_and_clears_alert() {
        let (gateway, roster) = roster(
            vec![
                member("admin", false, &[ADMIN]),
                member("a", false, &[STANDBY]),
                member("b", false, &[STANDBY]),
            ],
            2,
        );
        roster.toggle(&UserRef::new("admin")).await.expect("toggle");
        assert!(roster.active_alert().await.is_some());

        let report = roster.purge(&UserRef::new("admin")).await.expect("purge");

        assert_eq!(report, PurgeReport { removed: 3, failed: 0 });
        assert_eq!(roster.standby_count().await, Ok(0));
        assert!(roster.active_alert().await.is_none());
        assert_eq!(gateway.live_count(), 0);
    }

    #[tokio::test]
    async fn toggle_reports_member_lookup_failure() {
        let (gateway, roster) = roster(vec![member("a", false, &[])], 5);
        gateway.fail_next(GatewayOperation::MemberRoles);

        let result = roster.toggle(&UserRef::new("a")).await;

        assert!(matches!(result, Err(QueueError::MemberResolution(_))));
    }
}
