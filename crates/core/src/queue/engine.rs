use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::member::UserRef;
use crate::domain::message::{ChannelId, MessageRef};
use crate::errors::QueueError;
use crate::gateway::{NotificationGateway, OutboundMessage, Rendering};
use crate::phrases::random_one_more;
use crate::queue::render::{
    capacity_alert, closed_rendering, one_more_teaser, promotion_notice, render,
};
use crate::queue::session::{
    JoinOutcome, LeaveOutcome, QueuePolicy, QueueSession, Reconcile,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueueCommand {
    /// Open an empty queue.
    Open,
    /// Open a queue with `user` as its first participant.
    Start { user: UserRef },
    Join { user: UserRef },
    Leave { user: UserRef },
    Close,
    /// "Open" clicked on a closed queue post; the stale post is removed afterwards.
    Reopen { user: UserRef, closed_post: MessageRef },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueueOutcome {
    Opened { primary: MessageRef },
    Joined(JoinOutcome),
    Left { outcome: LeaveOutcome, closed: bool },
    Closed,
    /// The command needs an open queue and none exists.
    NotOpen,
    /// The interaction came from a post that is not the live queue post.
    StalePost,
}

/// Owner of the single queue session of a channel.
///
/// Every command runs inside one critical section that also covers the
/// outbound gateway calls it causes, so commands are applied in a strict
/// total order and renderings never interleave.
pub struct QueueEngine {
    gateway: Arc<dyn NotificationGateway>,
    channel: ChannelId,
    policy: QueuePolicy,
    session: Mutex<QueueSession>,
}

impl QueueEngine {
    pub fn new(
        gateway: Arc<dyn NotificationGateway>,
        channel: ChannelId,
        policy: QueuePolicy,
    ) -> Self {
        Self { gateway, channel, policy, session: Mutex::new(QueueSession::default()) }
    }

    pub fn policy(&self) -> &QueuePolicy {
        &self.policy
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub async fn snapshot(&self) -> QueueSession {
        self.session.lock().await.clone()
    }

    pub async fn current_rendering(&self) -> Rendering {
        render(&*self.session.lock().await, &self.policy)
    }

    pub async fn open(&self) -> Result<QueueOutcome, QueueError> {
        self.apply(QueueCommand::Open, None).await
    }

    pub async fn start(&self, user: UserRef) -> Result<QueueOutcome, QueueError> {
        self.apply(QueueCommand::Start { user }, None).await
    }

    pub async fn join(&self, user: UserRef) -> Result<QueueOutcome, QueueError> {
        self.apply(QueueCommand::Join { user }, None).await
    }

    pub async fn leave(&self, user: UserRef) -> Result<QueueOutcome, QueueError> {
        self.apply(QueueCommand::Leave { user }, None).await
    }

    pub async fn close(&self) -> Result<QueueOutcome, QueueError> {
        self.apply(QueueCommand::Close, None).await
    }

    pub async fn open_from_closed_post(
        &self,
        user: UserRef,
        closed_post: MessageRef,
    ) -> Result<QueueOutcome, QueueError> {
        self.apply(QueueCommand::Reopen { user, closed_post }, None).await
    }

    /// Applies `command`. When `origin` is set, membership commands only act if
    /// it is the live queue post.
    pub async fn apply(
        &self,
        command: QueueCommand,
        origin: Option<&MessageRef>,
    ) -> Result<QueueOutcome, QueueError> {
        let mut session = self.session.lock().await;

        let guarded = matches!(
            command,
            QueueCommand::Join { .. } | QueueCommand::Leave { .. } | QueueCommand::Close
        );
        if let (true, Some(origin)) = (guarded, origin) {
            if !session.is_active_post(origin) {
                debug!(
                    event_name = "queue.stale_post_ignored",
                    message_id = %origin,
                    "interaction on a post that is not the live queue"
                );
                return Ok(QueueOutcome::StalePost);
            }
        }

        match command {
            QueueCommand::Open => {
                let primary = self.open_locked(&mut session, None).await?;
                Ok(QueueOutcome::Opened { primary })
            }
            QueueCommand::Start { user } => {
                let primary = self.open_locked(&mut session, Some(user)).await?;
                Ok(QueueOutcome::Opened { primary })
            }
            QueueCommand::Reopen { user, closed_post } => {
                let result = self.open_locked(&mut session, Some(user)).await;
                let posted = !matches!(result, Err(QueueError::Gateway(_)));
                if posted && !session.is_active_post(&closed_post) {
                    self.delete_best_effort(&closed_post, "queue.closed_post_deleted").await;
                }
                result.map(|primary| QueueOutcome::Opened { primary })
            }
            QueueCommand::Join { user } => Ok(self.join_locked(&mut session, user).await),
            QueueCommand::Leave { user } => Ok(self.leave_locked(&mut session, &user).await),
            QueueCommand::Close => {
                if !session.is_open() {
                    return Ok(QueueOutcome::NotOpen);
                }
                self.close_locked(&mut session).await;
                Ok(QueueOutcome::Closed)
            }
        }
    }

    async fn open_locked(
        &self,
        session: &mut QueueSession,
        opener: Option<UserRef>,
    ) -> Result<MessageRef, QueueError> {
        if session.is_open() {
            return Err(QueueError::AlreadyOpen);
        }

        session.open();
        if let Some(user) = opener {
            session.join(user, &self.policy, Utc::now());
        }

        let message = OutboundMessage::from(render(session, &self.policy));
        let primary = match self.gateway.send_message(&self.channel, &message).await {
            Ok(primary) => primary,
            Err(error) => {
                warn!(
                    event_name = "queue.open_failed",
                    channel_id = %self.channel.as_str(),
                    error = %error,
                    "could not post queue message; queue stays closed"
                );
                session.reset();
                return Err(error.into());
            }
        };
        session.attach_primary(primary.clone());
        info!(
            event_name = "queue.opened",
            message_id = %primary,
            participants = session.participants().len(),
            "queue opened"
        );

        self.reconcile_notifications(session).await;
        Ok(primary)
    }

    async fn join_locked(&self, session: &mut QueueSession, user: UserRef) -> QueueOutcome {
        if !session.is_open() {
            return QueueOutcome::NotOpen;
        }

        let outcome = session.join(user.clone(), &self.policy, Utc::now());
        match outcome {
            JoinOutcome::AlreadyPresent | JoinOutcome::Rejected => {
                debug!(
                    event_name = "queue.join_ignored",
                    user_id = %user,
                    outcome = ?outcome,
                    "join left the queue unchanged"
                );
                return QueueOutcome::Joined(outcome);
            }
            JoinOutcome::Joined | JoinOutcome::Waitlisted => {}
        }

        info!(
            event_name = "queue.join_applied",
            user_id = %user,
            outcome = ?outcome,
            participants = session.participants().len(),
            waitlist = session.waitlist().len(),
            "user joined queue"
        );

        if self.refresh_primary(session).await {
            self.reconcile_notifications(session).await;
        }
        QueueOutcome::Joined(outcome)
    }

    async fn leave_locked(&self, session: &mut QueueSession, user: &UserRef) -> QueueOutcome {
        if !session.is_open() {
            return QueueOutcome::NotOpen;
        }

        let outcome = session.leave(user, Utc::now());
        if outcome == LeaveOutcome::NotPresent {
            return QueueOutcome::Left { outcome, closed: false };
        }

        info!(
            event_name = "queue.leave_applied",
            user_id = %user,
            outcome = ?outcome,
            participants = session.participants().len(),
            waitlist = session.waitlist().len(),
            "user left queue"
        );

        if session.participants().is_empty() {
            self.close_locked(session).await;
            return QueueOutcome::Left { outcome, closed: true };
        }

        let refreshed = self.refresh_primary(session).await;

        if let LeaveOutcome::Left { promoted: Some(promoted) } = &outcome {
            if let Err(error) =
                self.gateway.send_message(&self.channel, &promotion_notice(promoted)).await
            {
                warn!(
                    event_name = "queue.promotion_notice_failed",
                    user_id = %promoted,
                    error = %error,
                    "could not announce waitlist promotion"
                );
            }
        }

        if refreshed {
            self.reconcile_notifications(session).await;
        }
        QueueOutcome::Left { outcome, closed: false }
    }

    async fn close_locked(&self, session: &mut QueueSession) {
        if let Some(primary) = session.primary_message().cloned() {
            let closed = OutboundMessage::from(closed_rendering(&self.policy));
            if let Err(error) = self.gateway.edit_message(&self.channel, &primary, &closed).await
            {
                warn!(
                    event_name = "queue.close_render_failed",
                    message_id = %primary,
                    error = %error,
                    "could not mark queue post as closed"
                );
            }
        }

        for notification in session.take_notifications() {
            self.delete_best_effort(&notification, "queue.notification_deleted").await;
        }

        session.reset();
        info!(event_name = "queue.closed", "queue closed");
    }

    /// Edits the live post to match the session. Returns false when the edit failed.
    async fn refresh_primary(&self, session: &QueueSession) -> bool {
        let Some(primary) = session.primary_message() else {
            return false;
        };

        let message = OutboundMessage::from(render(session, &self.policy));
        match self.gateway.edit_message(&self.channel, primary, &message).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    event_name = "queue.render_failed",
                    message_id = %primary,
                    error = %error,
                    "could not update queue post; it will catch up on the next change"
                );
                false
            }
        }
    }

    async fn reconcile_notifications(&self, session: &mut QueueSession) {
        let plan = session.notification_plan(&self.policy);

        match plan.one_more {
            Reconcile::Keep => {}
            Reconcile::Post => {
                let teaser = one_more_teaser(random_one_more());
                match self.gateway.send_message(&self.channel, &teaser).await {
                    Ok(message_ref) => session.set_one_more_notification(Some(message_ref)),
                    Err(error) => {
                        warn!(
                            event_name = "queue.one_more_post_failed",
                            error = %error,
                            "could not post one-more teaser"
                        );
                        return;
                    }
                }
            }
            Reconcile::Delete(message_ref) => {
                if !self.delete_notification(&message_ref).await {
                    return;
                }
                session.set_one_more_notification(None);
            }
        }

        match plan.capacity {
            Reconcile::Keep => {}
            Reconcile::Post => {
                let alert = capacity_alert(session.participants());
                match self.gateway.send_message(&self.channel, &alert).await {
                    Ok(message_ref) => session.set_capacity_notification(Some(message_ref)),
                    Err(error) => {
                        warn!(
                            event_name = "queue.capacity_post_failed",
                            error = %error,
                            "could not post capacity alert"
                        );
                    }
                }
            }
            Reconcile::Delete(message_ref) => {
                if self.delete_notification(&message_ref).await {
                    session.set_capacity_notification(None);
                }
            }
        }
    }

    /// Deletes a notification; a message that is already gone counts as deleted.
    async fn delete_notification(&self, message_ref: &MessageRef) -> bool {
        match self.gateway.delete_message(&self.channel, message_ref).await {
            Ok(()) => true,
            Err(error) if error.is_not_found() => true,
            Err(error) => {
                warn!(
                    event_name = "queue.notification_delete_failed",
                    message_id = %message_ref,
                    error = %error,
                    "could not delete notification"
                );
                false
            }
        }
    }

    async fn delete_best_effort(&self, message_ref: &MessageRef, event_name: &'static str) {
        match self.gateway.delete_message(&self.channel, message_ref).await {
            Ok(()) => debug!(event_name, message_id = %message_ref, "message deleted"),
            Err(error) => warn!(
                event_name,
                message_id = %message_ref,
                error = %error,
                "could not delete message"
            ),
        }
    }
}
