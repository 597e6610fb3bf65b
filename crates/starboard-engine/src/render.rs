use starboard_types::models::{
    BoardEmbed, BoardPayload, ChannelAccess, EmbedField, JumpLink, Message, is_image_url,
};

const MAX_DESCRIPTION: usize = 4096;
const MAX_REPLY_PREVIEW: usize = 200;

/// What the renderer needs to know about where the payload goes.
#[derive(Debug, Clone, Copy)]
pub struct RenderPolicy<'a> {
    pub emoji: &'a str,
    /// Access of the board channel the payload will live in.
    pub board_access: ChannelAccess,
}

/// Build the board entry for `message` with `votes` votes.
///
/// Pure: identical inputs give identical payloads, so the same function serves
/// the first publish and every later update. Content from a channel the board
/// may not expose is reduced to the count line.
pub fn render(message: &Message, votes: u32, policy: &RenderPolicy<'_>) -> BoardPayload {
    let content = format!("{} **{}** | <#{}>", policy.emoji, votes, message.channel_id);
    let jump = JumpLink {
        community_id: message.community_id,
        channel_id: message.channel_id,
        message_id: message.id,
    };

    let embed = message
        .channel_access
        .may_expose_to(&policy.board_access)
        .then(|| render_embed(message));

    BoardPayload { content, jump, embed }
}

fn render_embed(message: &Message) -> BoardEmbed {
    let mut fields = Vec::new();

    if let Some(reply) = &message.reply_to {
        fields.push(EmbedField {
            name: format!("Replying to {}", reply.author_name),
            value: truncate(&reply.content, MAX_REPLY_PREVIEW),
        });
    }

    // First image becomes the preview, everything else is linked
    let mut image_url = None;
    for attachment in &message.attachments {
        if image_url.is_none() && attachment.is_image() {
            image_url = Some(attachment.url.clone());
        } else {
            fields.push(EmbedField {
                name: "Attachment".into(),
                value: format!("[{}]({})", attachment.filename, attachment.url),
            });
        }
    }
    if image_url.is_none() {
        image_url = message
            .content
            .split_whitespace()
            .find(|word| word.starts_with("https://") && is_image_url(word))
            .map(str::to_string);
    }

    BoardEmbed {
        author_name: message.author.name.clone(),
        author_icon_url: message.author.avatar_url.clone(),
        description: truncate(&message.content, MAX_DESCRIPTION),
        image_url,
        fields,
        timestamp: message.id.created_at().to_rfc3339(),
        footer: message.id.to_string(),
    }
}

/// Cut to at most `max` characters, marking the cut with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use starboard_types::Snowflake;
    use starboard_types::models::{Attachment, Author, ReplyContext};

    fn message(access: ChannelAccess) -> Message {
        Message {
            id: Snowflake(175928847299117063),
            channel_id: Snowflake(10),
            community_id: Snowflake(1),
            author: Author {
                id: Snowflake(5),
                name: "ada".into(),
                avatar_url: Some("https://cdn.example/ada.png".into()),
            },
            content: "look at this https://cdn.example/sunset.jpg".into(),
            attachments: vec![
                Attachment {
                    url: "https://cdn.example/notes.pdf".into(),
                    filename: "notes.pdf".into(),
                    content_type: Some("application/pdf".into()),
                },
                Attachment {
                    url: "https://cdn.example/cat.png".into(),
                    filename: "cat.png".into(),
                    content_type: Some("image/png".into()),
                },
            ],
            reply_to: Some(ReplyContext {
                author_name: "grace".into(),
                content: "what are you up to?".into(),
            }),
            channel_access: access,
        }
    }

    fn public_policy() -> RenderPolicy<'static> {
        RenderPolicy { emoji: "⭐", board_access: ChannelAccess::default() }
    }

    #[test]
    fn public_message_is_rendered_in_full() {
        let payload = render(&message(ChannelAccess::default()), 5, &public_policy());
        assert_eq!(payload.content, "⭐ **5** | <#10>");
        assert_eq!(payload.jump.message_id, Snowflake(175928847299117063));

        let embed = payload.embed.unwrap();
        assert_eq!(embed.author_name, "ada");
        assert_eq!(embed.image_url.as_deref(), Some("https://cdn.example/cat.png"));
        assert_eq!(embed.fields.len(), 2);
        assert_eq!(embed.fields[0].name, "Replying to grace");
        assert_eq!(embed.fields[1].value, "[notes.pdf](https://cdn.example/notes.pdf)");
        assert_eq!(embed.footer, "175928847299117063");
        assert!(embed.timestamp.starts_with("2016-04-30T11:18:25.796"));
    }

    #[test]
    fn linked_image_is_used_without_attachments() {
        let mut msg = message(ChannelAccess::default());
        msg.attachments.clear();
        let embed = render(&msg, 1, &public_policy()).embed.unwrap();
        assert_eq!(embed.image_url.as_deref(), Some("https://cdn.example/sunset.jpg"));
    }

    #[test]
    fn restricted_source_degrades_to_count_line() {
        let restricted = ChannelAccess { restricted: true, sensitive: false };
        let payload = render(&message(restricted), 7, &public_policy());
        assert_eq!(payload.content, "⭐ **7** | <#10>");
        assert!(payload.embed.is_none());

        let same_board = RenderPolicy { emoji: "⭐", board_access: restricted };
        assert!(render(&message(restricted), 7, &same_board).embed.is_some());
    }

    #[test]
    fn sensitive_source_needs_sensitive_board() {
        let sensitive = ChannelAccess { restricted: false, sensitive: true };
        assert!(render(&message(sensitive), 3, &public_policy()).embed.is_none());
    }

    #[test]
    fn identical_inputs_give_identical_bytes() {
        let msg = message(ChannelAccess::default());
        let a = serde_json::to_vec(&render(&msg, 9, &public_policy())).unwrap();
        let b = serde_json::to_vec(&render(&msg, 9, &public_policy())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn long_content_is_truncated() {
        let mut msg = message(ChannelAccess::default());
        msg.content = "x".repeat(5000);
        let embed = render(&msg, 1, &public_policy()).embed.unwrap();
        assert_eq!(embed.description.chars().count(), MAX_DESCRIPTION);
        assert!(embed.description.ends_with('…'));
    }
}
