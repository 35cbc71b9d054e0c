use serde::Serialize;
use standby_core::gateway::{
    ButtonSpec, ButtonTone, OutboundMessage, QueueAction, RenderTone, Rendering,
};

pub const JOIN_QUEUE: &str = "join_queue";
pub const LEAVE_QUEUE: &str = "leave_queue";
pub const CLOSE_QUEUE: &str = "close_queue";
pub const OPEN_QUEUE: &str = "open_queue";

const ACTION_ROW: u8 = 1;
const BUTTON: u8 = 2;

const ACTIVE_COLOR: u32 = 0x5865F2;
const CLOSED_COLOR: u32 = 0x99AAB5;

/// Message flag that hides a reply from everyone but the invoking user.
pub const EPHEMERAL_FLAG: u64 = 1 << 6;

pub fn custom_id(action: QueueAction) -> &'static str {
    match action {
        QueueAction::Join => JOIN_QUEUE,
        QueueAction::Leave => LEAVE_QUEUE,
        QueueAction::Close => CLOSE_QUEUE,
        QueueAction::Open => OPEN_QUEUE,
    }
}

pub fn action_for_custom_id(custom_id: &str) -> Option<QueueAction> {
    match custom_id {
        JOIN_QUEUE => Some(QueueAction::Join),
        LEAVE_QUEUE => Some(QueueAction::Leave),
        CLOSE_QUEUE => Some(QueueAction::Close),
        OPEN_QUEUE => Some(QueueAction::Open),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary = 1,
    Secondary = 2,
    Success = 3,
    Danger = 4,
}

impl From<ButtonTone> for ButtonStyle {
    fn from(value: ButtonTone) -> Self {
        match value {
            ButtonTone::Primary => Self::Primary,
            ButtonTone::Secondary => Self::Secondary,
            ButtonTone::Success => Self::Success,
            ButtonTone::Danger => Self::Danger,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: u8,
    pub style: u8,
    pub label: String,
    pub custom_id: String,
    pub disabled: bool,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: BUTTON,
            style: ButtonStyle::Secondary as u8,
            label: label.into(),
            custom_id: custom_id.into(),
            disabled: false,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = style as u8;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

impl From<&ButtonSpec> for Button {
    fn from(spec: &ButtonSpec) -> Self {
        Button::new(custom_id(spec.action), spec.label.clone())
            .style(spec.tone.into())
            .disabled(spec.disabled)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<Button>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
}

/// Body of a create/edit channel message request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessagePayload {
    pub content: String,
    pub embeds: Vec<Embed>,
    pub components: Vec<ActionRow>,
}

#[derive(Default)]
pub struct MessageBuilder {
    payload: MessagePayload,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.payload.content = content.into();
        self
    }

    pub fn embed(
        mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        color: u32,
    ) -> Self {
        self.payload.embeds.push(Embed {
            title: title.into(),
            description: description.into(),
            color,
        });
        self
    }

    pub fn action_row<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut ActionRowBuilder),
    {
        let mut builder = ActionRowBuilder::default();
        build(&mut builder);
        self.payload.components.push(ActionRow { kind: ACTION_ROW, components: builder.buttons });
        self
    }

    pub fn build(self) -> MessagePayload {
        self.payload
    }
}

#[derive(Default)]
pub struct ActionRowBuilder {
    buttons: Vec<Button>,
}

impl ActionRowBuilder {
    pub fn button(&mut self, button: Button) -> &mut Self {
        self.buttons.push(button);
        self
    }
}

pub fn queue_message(rendering: &Rendering) -> MessagePayload {
    let color = match rendering.tone {
        RenderTone::Active => ACTIVE_COLOR,
        RenderTone::Closed => CLOSED_COLOR,
    };

    MessageBuilder::new()
        .embed(rendering.title.clone(), rendering.body.clone(), color)
        .action_row(|row| {
            for spec in &rendering.buttons {
                row.button(Button::from(spec));
            }
        })
        .build()
}

pub fn message_payload(message: &OutboundMessage) -> MessagePayload {
    match message {
        OutboundMessage::Text { content } => MessageBuilder::new().content(content.clone()).build(),
        OutboundMessage::Rendering(rendering) => queue_message(rendering),
    }
}

/// Text reply to an interaction, shown either to everyone or only to the invoker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractionReply {
    pub content: String,
    pub ephemeral: bool,
}

impl InteractionReply {
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self { content: content.into(), ephemeral: true }
    }

    pub fn public(content: impl Into<String>) -> Self {
        Self { content: content.into(), ephemeral: false }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyPayload {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl From<&InteractionReply> for ReplyPayload {
    fn from(reply: &InteractionReply) -> Self {
        Self { content: reply.content.clone(), flags: reply.ephemeral.then_some(EPHEMERAL_FLAG) }
    }
}

const PONG: u8 = 1;
const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
const DEFERRED_UPDATE_MESSAGE: u8 = 6;

/// Body of an interaction callback request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InteractionCallback {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ReplyPayload>,
}

impl InteractionCallback {
    pub fn pong() -> Self {
        Self { kind: PONG, data: None }
    }

    pub fn deferred_update() -> Self {
        Self { kind: DEFERRED_UPDATE_MESSAGE, data: None }
    }

    pub fn reply(reply: &InteractionReply) -> Self {
        Self { kind: CHANNEL_MESSAGE_WITH_SOURCE, data: Some(reply.into()) }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use standby_core::gateway::{OutboundMessage, QueueAction};
    use standby_core::queue::render::{closed_rendering, render};
    use standby_core::queue::{QueuePolicy, QueueSession};

    use super::{
        action_for_custom_id, custom_id, message_payload, InteractionCallback, InteractionReply,
    };

    #[test]
    fn custom_ids_round_trip_for_every_action() {
        for action in [QueueAction::Join, QueueAction::Leave, QueueAction::Close, QueueAction::Open]
        {
            assert_eq!(action_for_custom_id(custom_id(action)), Some(action));
        }
        assert_eq!(action_for_custom_id("unknown_button"), None);
    }

    #[test]
    fn closed_queue_serializes_disabled_buttons_and_open() {
        let payload = message_payload(&closed_rendering(&QueuePolicy::default()).into());
        let value = serde_json::to_value(&payload).expect("serialize");

        let buttons = &value["components"][0]["components"];
        assert_eq!(value["components"][0]["type"], json!(1));
        assert_eq!(buttons[0]["custom_id"], json!("join_queue"));
        assert_eq!(buttons[0]["disabled"], json!(true));
        assert_eq!(buttons[1]["disabled"], json!(true));
        assert_eq!(buttons[2]["custom_id"], json!("open_queue"));
        assert_eq!(buttons[2]["style"], json!(3));
    }

    #[test]
    fn queue_rendering_becomes_titled_embed() {
        let rendering = render(&QueueSession::default(), &QueuePolicy::default());
        let payload = message_payload(&rendering.into());

        assert_eq!(payload.embeds.len(), 1);
        assert_eq!(payload.embeds[0].title, "5-stack queue");
        assert!(payload.content.is_empty());
    }

    #[test]
    fn text_messages_carry_content_only() {
        let payload = message_payload(&OutboundMessage::text("hello"));

        assert_eq!(payload.content, "hello");
        assert!(payload.embeds.is_empty() && payload.components.is_empty());
    }

    #[test]
    fn ephemeral_reply_sets_flag() {
        let value = serde_json::to_value(InteractionCallback::reply(&InteractionReply::ephemeral(
            "Only admins can use this command.",
        )))
        .expect("serialize");

        assert_eq!(value["type"], json!(4));
        assert_eq!(value["data"]["flags"], json!(64));

        let deferred =
            serde_json::to_value(InteractionCallback::deferred_update()).expect("serialize");
        assert_eq!(deferred, json!({ "type": 6 }));

        let pong = serde_json::to_value(InteractionCallback::pong()).expect("serialize");
        assert_eq!(pong, json!({ "type": 1 }));
    }
}
