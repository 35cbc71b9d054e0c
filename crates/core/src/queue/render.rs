use crate::domain::member::UserRef;
use crate::gateway::{ButtonSpec, ButtonTone, OutboundMessage, QueueAction, RenderTone, Rendering};
use crate::phrases::Phrase;
use crate::queue::session::{LastEvent, LastEventKind, QueuePolicy, QueueSession};

/// Separator between mentions in the capacity alert.
pub const MENTION_SEPARATOR: &str = " ";

pub fn queue_title(policy: &QueuePolicy) -> String {
    format!("{}-stack queue", policy.capacity)
}

/// Renders the queue post for `session`. Pure: equal sessions render equally.
pub fn render(session: &QueueSession, policy: &QueuePolicy) -> Rendering {
    if !session.is_open() {
        return closed_rendering(policy);
    }

    let mut body = String::new();
    if let Some(event) = session.last_event() {
        body.push_str(&status_line(event));
        body.push('\n');
    }

    if session.participants().is_empty() {
        body.push_str("No users in queue");
    } else {
        body.push_str(&format!(
            "### Queued users ({})\n{}",
            session.participants().len(),
            mention_lines(session.participants())
        ));
    }

    if !session.waitlist().is_empty() {
        body.push_str(&format!(
            "\n\n### Waitlist ({})\n{}",
            session.waitlist().len(),
            mention_lines(session.waitlist())
        ));
    }

    Rendering {
        title: queue_title(policy),
        body,
        tone: RenderTone::Active,
        buttons: vec![
            ButtonSpec::new(QueueAction::Join, "Join", ButtonTone::Primary),
            ButtonSpec::new(QueueAction::Leave, "Leave", ButtonTone::Danger),
            ButtonSpec::new(QueueAction::Close, "Close", ButtonTone::Secondary),
        ],
    }
}

pub fn closed_rendering(policy: &QueuePolicy) -> Rendering {
    Rendering {
        title: queue_title(policy),
        body: "Queue is closed".to_owned(),
        tone: RenderTone::Closed,
        buttons: vec![
            ButtonSpec::new(QueueAction::Join, "Join", ButtonTone::Primary).disabled(),
            ButtonSpec::new(QueueAction::Leave, "Leave", ButtonTone::Danger).disabled(),
            ButtonSpec::new(QueueAction::Open, "Open", ButtonTone::Success),
        ],
    }
}

pub fn capacity_alert(participants: &[UserRef]) -> OutboundMessage {
    let mentions =
        participants.iter().map(UserRef::mention).collect::<Vec<_>>().join(MENTION_SEPARATOR);
    OutboundMessage::text(format!("There are enough users for a game!\n{mentions}"))
}

pub fn one_more_teaser(phrase: Phrase) -> OutboundMessage {
    OutboundMessage::text(format!("**{}** ({})", phrase.text, phrase.language))
}

pub fn promotion_notice(user: &UserRef) -> OutboundMessage {
    OutboundMessage::text(format!("{} you're up!", user.mention()))
}

fn status_line(event: &LastEvent) -> String {
    let verb = match event.kind {
        LastEventKind::Join => "joined",
        LastEventKind::Leave => "left",
        LastEventKind::JoinWaitlist => "joined the waitlist",
        LastEventKind::LeaveWaitlist => "left the waitlist",
    };
    format!("{} {verb} <t:{}:R>", event.actor.mention(), event.at.timestamp())
}

fn mention_lines(users: &[UserRef]) -> String {
    users.iter().map(UserRef::mention).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{capacity_alert, render};
    use crate::domain::member::UserRef;
    use crate::domain::message::MessageRef;
    use crate::gateway::{QueueAction, RenderTone};
    use crate::queue::session::{QueuePolicy, QueueSession};

    fn populated_session(policy: &QueuePolicy) -> QueueSession {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid timestamp");
        let mut session = QueueSession::default();
        session.open();
        session.attach_primary(MessageRef::new("primary"));
        for id in ["1", "2", "3", "4", "5", "6"] {
            session.join(UserRef::new(id), policy, at);
        }
        session
    }

    #[test]
    fn rendering_is_a_pure_function_of_state() {
        let policy = QueuePolicy::default();
        let session = populated_session(&policy);

        assert_eq!(render(&session, &policy), render(&session, &policy));
    }

    #[test]
    fn open_rendering_offers_join_leave_close() {
        let policy = QueuePolicy::default();
        let rendering = render(&populated_session(&policy), &policy);

        let actions: Vec<_> = rendering.buttons.iter().map(|button| button.action).collect();
        assert_eq!(actions, vec![QueueAction::Join, QueueAction::Leave, QueueAction::Close]);
        assert!(rendering.buttons.iter().all(|button| !button.disabled));
        assert_eq!(rendering.tone, RenderTone::Active);
    }

    #[test]
    fn closed_rendering_disables_membership_buttons_and_offers_open() {
        let policy = QueuePolicy::default();
        let rendering = render(&QueueSession::default(), &policy);

        assert_eq!(rendering.tone, RenderTone::Closed);
        assert!(rendering.buttons[0].disabled && rendering.buttons[1].disabled);
        assert_eq!(rendering.buttons[2].action, QueueAction::Open);
        assert!(!rendering.buttons[2].disabled);
    }

    #[test]
    fn capacity_alert_mentions_every_participant() {
        let users: Vec<_> = ["a", "b", "c"].into_iter().map(UserRef::new).collect();
        let alert = capacity_alert(&users);
        let text = alert.as_text().expect("alert is plain text");

        for user in &users {
            assert!(text.contains(&user.mention()));
        }
    }
}
