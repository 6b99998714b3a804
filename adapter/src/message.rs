//! Outbound Message Model
//!
//! Segment-based builder for the DingTalk robot send body. A message is an
//! ordered list of segments; producing the wire body merges them into one
//! JSON object: a single content-bearing `msgtype` plus an optional merged
//! `at` block.

use serde_json::{json, Map, Value};

/// A button on an action card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardButton {
    /// Button label.
    pub title: String,
    /// URL opened when the button is tapped.
    pub action_url: String,
}

/// Action card button layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionCardButtons {
    /// One whole-card jump button.
    Single {
        /// Button label.
        title: String,
        /// Jump URL.
        url: String,
    },
    /// Independently tappable buttons.
    Independent(Vec<CardButton>),
}

/// One entry of a feed card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLink {
    /// Entry title.
    pub title: String,
    /// URL opened when the entry is tapped.
    pub message_url: String,
    /// Thumbnail URL.
    pub pic_url: String,
}

/// A single piece of an outbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageSegment {
    /// Plain text.
    Text {
        /// Text content.
        content: String,
    },
    /// Markdown body with a notification title.
    Markdown {
        /// Title shown in the conversation list and notification.
        title: String,
        /// Markdown source.
        text: String,
    },
    /// @-mention block, merged across segments at produce time.
    At {
        /// Phone numbers to mention.
        at_mobiles: Vec<String>,
        /// DingTalk user IDs to mention.
        at_dingtalk_ids: Vec<String>,
        /// Mention everyone.
        is_at_all: bool,
    },
    /// Link card.
    Link {
        /// Card title.
        title: String,
        /// Card body text.
        text: String,
        /// URL opened on tap.
        message_url: String,
        /// Thumbnail URL.
        pic_url: String,
    },
    /// Action card with markdown body and buttons.
    ActionCard {
        /// Card title.
        title: String,
        /// Markdown body.
        text: String,
        /// `"0"` = vertical buttons, `"1"` = horizontal.
        btn_orientation: String,
        /// `"0"` = show the robot avatar, `"1"` = hide it.
        hide_avatar: String,
        /// Button layout.
        buttons: ActionCardButtons,
    },
    /// Feed card of multiple linked entries.
    FeedCard {
        /// Card entries.
        links: Vec<FeedLink>,
    },
    /// Raw JSON merged verbatim into the send body. Escape hatch for
    /// message types the typed segments do not cover.
    Extension(Value),
}

impl MessageSegment {
    /// Plain text segment.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Markdown segment.
    pub fn markdown(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Markdown {
            title: title.into(),
            text: text.into(),
        }
    }

    /// Mention users by DingTalk ID.
    pub fn at_dingtalk_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::At {
            at_mobiles: Vec::new(),
            at_dingtalk_ids: ids.into_iter().map(Into::into).collect(),
            is_at_all: false,
        }
    }

    /// Mention users by phone number.
    pub fn at_mobiles<I, S>(mobiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::At {
            at_mobiles: mobiles.into_iter().map(Into::into).collect(),
            at_dingtalk_ids: Vec::new(),
            is_at_all: false,
        }
    }

    /// Mention everyone in the conversation.
    pub const fn at_all() -> Self {
        Self::At {
            at_mobiles: Vec::new(),
            at_dingtalk_ids: Vec::new(),
            is_at_all: true,
        }
    }

    /// Link card segment.
    pub fn link(
        title: impl Into<String>,
        text: impl Into<String>,
        message_url: impl Into<String>,
        pic_url: impl Into<String>,
    ) -> Self {
        Self::Link {
            title: title.into(),
            text: text.into(),
            message_url: message_url.into(),
            pic_url: pic_url.into(),
        }
    }

    /// Action card with a single whole-card button.
    pub fn action_card_single(
        title: impl Into<String>,
        text: impl Into<String>,
        single_title: impl Into<String>,
        single_url: impl Into<String>,
    ) -> Self {
        Self::ActionCard {
            title: title.into(),
            text: text.into(),
            btn_orientation: "0".into(),
            hide_avatar: "0".into(),
            buttons: ActionCardButtons::Single {
                title: single_title.into(),
                url: single_url.into(),
            },
        }
    }

    /// Action card with independently tappable buttons.
    pub fn action_card_multi(
        title: impl Into<String>,
        text: impl Into<String>,
        btn_orientation: impl Into<String>,
        buttons: Vec<CardButton>,
    ) -> Self {
        Self::ActionCard {
            title: title.into(),
            text: text.into(),
            btn_orientation: btn_orientation.into(),
            hide_avatar: "0".into(),
            buttons: ActionCardButtons::Independent(buttons),
        }
    }

    /// Hide the robot avatar on an action card. No-op for other segments.
    pub fn hide_avatar(mut self) -> Self {
        if let Self::ActionCard { hide_avatar, .. } = &mut self {
            *hide_avatar = "1".into();
        }
        self
    }

    /// Feed card segment.
    pub const fn feed_card(links: Vec<FeedLink>) -> Self {
        Self::FeedCard { links }
    }

    /// Raw extension segment.
    pub const fn extension(value: Value) -> Self {
        Self::Extension(value)
    }
}

/// An ordered collection of segments forming one outbound message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message(Vec<MessageSegment>);

impl Message {
    /// Empty message.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a segment.
    pub fn push(&mut self, segment: MessageSegment) {
        self.0.push(segment);
    }

    /// Segment count.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the message has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the segments in order.
    pub fn segments(&self) -> &[MessageSegment] {
        &self.0
    }

    /// Merge the segments into the robot send body.
    ///
    /// Text segments concatenate and claim `msgtype` only when no other
    /// content segment has; other content segments overwrite it (last
    /// wins). `at` segments merge into one `at` block regardless of the
    /// content type.
    pub fn produce(&self) -> Value {
        let mut body = Map::new();
        let mut text_content = String::new();
        let mut at_mobiles: Vec<String> = Vec::new();
        let mut at_dingtalk_ids: Vec<String> = Vec::new();
        let mut is_at_all = false;

        for segment in &self.0 {
            match segment {
                MessageSegment::Text { content } => text_content.push_str(content),
                MessageSegment::At {
                    at_mobiles: mobiles,
                    at_dingtalk_ids: ids,
                    is_at_all: all,
                } => {
                    at_mobiles.extend(mobiles.iter().cloned());
                    at_dingtalk_ids.extend(ids.iter().cloned());
                    is_at_all |= all;
                }
                MessageSegment::Markdown { title, text } => {
                    body.insert("msgtype".into(), "markdown".into());
                    body.insert("markdown".into(), json!({"title": title, "text": text}));
                }
                MessageSegment::Link {
                    title,
                    text,
                    message_url,
                    pic_url,
                } => {
                    body.insert("msgtype".into(), "link".into());
                    body.insert(
                        "link".into(),
                        json!({
                            "title": title,
                            "text": text,
                            "messageUrl": message_url,
                            "picUrl": pic_url,
                        }),
                    );
                }
                MessageSegment::ActionCard {
                    title,
                    text,
                    btn_orientation,
                    hide_avatar,
                    buttons,
                } => {
                    let mut card = Map::new();
                    card.insert("title".into(), json!(title));
                    card.insert("text".into(), json!(text));
                    card.insert("btnOrientation".into(), json!(btn_orientation));
                    card.insert("hideAvatar".into(), json!(hide_avatar));
                    match buttons {
                        ActionCardButtons::Single { title, url } => {
                            card.insert("singleTitle".into(), json!(title));
                            card.insert("singleURL".into(), json!(url));
                        }
                        ActionCardButtons::Independent(btns) => {
                            let btns: Vec<Value> = btns
                                .iter()
                                .map(|b| json!({"title": b.title, "actionURL": b.action_url}))
                                .collect();
                            card.insert("btns".into(), Value::Array(btns));
                        }
                    }
                    body.insert("msgtype".into(), "actionCard".into());
                    body.insert("actionCard".into(), Value::Object(card));
                }
                MessageSegment::FeedCard { links } => {
                    let links: Vec<Value> = links
                        .iter()
                        .map(|l| {
                            json!({
                                "title": l.title,
                                "messageURL": l.message_url,
                                "picURL": l.pic_url,
                            })
                        })
                        .collect();
                    body.insert("msgtype".into(), "feedCard".into());
                    body.insert("feedCard".into(), json!({"links": links}));
                }
                MessageSegment::Extension(value) => {
                    if let Value::Object(extra) = value {
                        for (k, v) in extra {
                            body.insert(k.clone(), v.clone());
                        }
                    }
                }
            }
        }

        if !text_content.is_empty() && !body.contains_key("msgtype") {
            body.insert("msgtype".into(), "text".into());
            body.insert("text".into(), json!({"content": text_content}));
        }

        if !at_mobiles.is_empty() || !at_dingtalk_ids.is_empty() || is_at_all {
            body.insert(
                "at".into(),
                json!({
                    "atMobiles": at_mobiles,
                    "atDingtalkIds": at_dingtalk_ids,
                    "isAtAll": is_at_all,
                }),
            );
        }

        Value::Object(body)
    }
}

impl From<MessageSegment> for Message {
    fn from(segment: MessageSegment) -> Self {
        Self(vec![segment])
    }
}

impl From<&str> for Message {
    fn from(content: &str) -> Self {
        MessageSegment::text(content).into()
    }
}

impl From<String> for Message {
    fn from(content: String) -> Self {
        MessageSegment::text(content).into()
    }
}

impl FromIterator<MessageSegment> for Message {
    fn from_iter<I: IntoIterator<Item = MessageSegment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<MessageSegment> for Message {
    fn extend<I: IntoIterator<Item = MessageSegment>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Message {
    type Item = MessageSegment;
    type IntoIter = std::vec::IntoIter<MessageSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl std::ops::Add for Message {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self.0.extend(rhs.0);
        self
    }
}

impl std::ops::Add<MessageSegment> for Message {
    type Output = Self;

    fn add(mut self, rhs: MessageSegment) -> Self {
        self.0.push(rhs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_with_mentions() {
        let message = Message::from("release is out ")
            + MessageSegment::at_dingtalk_ids(["$:LWCP_v1:$usr111"]);
        let body = message.produce();
        assert_eq!(body["msgtype"], "text");
        assert_eq!(body["text"]["content"], "release is out ");
        assert_eq!(body["at"]["atDingtalkIds"][0], "$:LWCP_v1:$usr111");
        assert_eq!(body["at"]["isAtAll"], false);
    }

    #[test]
    fn text_segments_concatenate() {
        let message = Message::from("hello ") + MessageSegment::text("world");
        assert_eq!(message.produce()["text"]["content"], "hello world");
    }

    #[test]
    fn at_blocks_merge() {
        let message: Message = [
            MessageSegment::text("ping"),
            MessageSegment::at_mobiles(["13800000000"]),
            MessageSegment::at_dingtalk_ids(["$:LWCP_v1:$usr111"]),
            MessageSegment::at_all(),
        ]
        .into_iter()
        .collect();
        let at = &message.produce()["at"];
        assert_eq!(at["atMobiles"][0], "13800000000");
        assert_eq!(at["atDingtalkIds"][0], "$:LWCP_v1:$usr111");
        assert_eq!(at["isAtAll"], true);
    }

    #[test]
    fn markdown_wins_over_text() {
        let message =
            Message::from("fallback") + MessageSegment::markdown("Build", "**passed**");
        let body = message.produce();
        assert_eq!(body["msgtype"], "markdown");
        assert_eq!(body["markdown"]["title"], "Build");
        assert!(body.get("text").is_none());
    }

    #[test]
    fn action_card_single_button() {
        let body = Message::from(MessageSegment::action_card_single(
            "Deploy",
            "### ready to go",
            "Open dashboard",
            "https://ci.example.com/42",
        ))
        .produce();
        assert_eq!(body["msgtype"], "actionCard");
        assert_eq!(body["actionCard"]["singleTitle"], "Open dashboard");
        assert_eq!(body["actionCard"]["singleURL"], "https://ci.example.com/42");
        assert_eq!(body["actionCard"]["btnOrientation"], "0");
        assert_eq!(body["actionCard"]["hideAvatar"], "0");
    }

    #[test]
    fn action_card_can_hide_the_avatar() {
        let body = Message::from(
            MessageSegment::action_card_single(
                "Deploy",
                "### ready to go",
                "Open dashboard",
                "https://ci.example.com/42",
            )
            .hide_avatar(),
        )
        .produce();
        assert_eq!(body["actionCard"]["hideAvatar"], "1");
    }

    #[test]
    fn hide_avatar_is_a_noop_on_other_segments() {
        let body = Message::from(MessageSegment::text("hi").hide_avatar()).produce();
        assert_eq!(body["msgtype"], "text");
        assert_eq!(body["text"]["content"], "hi");
    }

    #[test]
    fn action_card_independent_buttons() {
        let body = Message::from(MessageSegment::action_card_multi(
            "Approve?",
            "deploy 1.2.3 to prod",
            "1",
            vec![
                CardButton {
                    title: "Approve".into(),
                    action_url: "https://ci.example.com/42/approve".into(),
                },
                CardButton {
                    title: "Reject".into(),
                    action_url: "https://ci.example.com/42/reject".into(),
                },
            ],
        ))
        .produce();
        assert_eq!(body["actionCard"]["btns"][1]["title"], "Reject");
        assert_eq!(
            body["actionCard"]["btns"][0]["actionURL"],
            "https://ci.example.com/42/approve"
        );
        assert!(body["actionCard"].get("singleURL").is_none());
    }

    #[test]
    fn feed_card_links() {
        let body = Message::from(MessageSegment::feed_card(vec![FeedLink {
            title: "changelog".into(),
            message_url: "https://example.com/log".into(),
            pic_url: "https://example.com/pic.png".into(),
        }]))
        .produce();
        assert_eq!(body["msgtype"], "feedCard");
        assert_eq!(body["feedCard"]["links"][0]["messageURL"], "https://example.com/log");
    }

    #[test]
    fn extension_merges_raw_keys() {
        let body = Message::from(MessageSegment::extension(serde_json::json!({
            "msgtype": "empty",
            "empty": {}
        })))
        .produce();
        assert_eq!(body["msgtype"], "empty");
    }

    #[test]
    fn empty_message_produces_empty_body() {
        assert_eq!(Message::new().produce(), serde_json::json!({}));
    }
}
