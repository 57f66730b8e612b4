//! Message formatting utilities for client display.

use chrono::{DateTime, Utc};
use huddle_server::domain::{
    ChannelEvent, EventEnvelope, GroupedReaction, PresenceMessage, RealtimeMessage, ThreadEvent,
    User, UserId,
};

const SEPARATOR: &str = "============================================================";
const RULE: &str = "------------------------------------------------------------";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format any frame received from the relay
    ///
    /// Returns `None` for frames that have nothing to show.
    pub fn format_event(event: &EventEnvelope, me: &UserId) -> Option<String> {
        match event {
            EventEnvelope::Presence(PresenceMessage::Presence { users }) => {
                Some(Self::format_presence(users, me))
            }
            EventEnvelope::Presence(_) => None,
            EventEnvelope::Channel(ChannelEvent::MessageCreated { message }) => {
                Some(Self::format_message(message))
            }
            EventEnvelope::Channel(ChannelEvent::MessageUpdated { message }) => Some(format!(
                "\n~ {} edited {}: {}\n",
                author(message),
                message.id,
                message.content.as_deref().unwrap_or("")
            )),
            EventEnvelope::Channel(ChannelEvent::ReactionUpdated {
                message_id,
                reactions,
            }) => Some(Self::format_reactions(message_id, reactions)),
            EventEnvelope::Channel(ChannelEvent::RepliesIncremented { message_id, delta }) => {
                Some(format!("\n↳ {:+} repl(ies) on {}\n", delta, message_id))
            }
            EventEnvelope::Thread(ThreadEvent::ReplyCreated { reply }) => Some(format!(
                "\n↳ @{} replied: {}\n",
                author(reply),
                reply.content.as_deref().unwrap_or("")
            )),
            EventEnvelope::Thread(ThreadEvent::ReactionUpdated {
                message_id,
                reactions,
                ..
            }) => Some(Self::format_reactions(message_id, reactions)),
        }
    }

    /// Format the presence snapshot showing every online user
    ///
    /// # Arguments
    ///
    /// * `users` - Online users of the room
    /// * `me` - The current user's ID (to mark as "me")
    pub fn format_presence(users: &[User], me: &UserId) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", SEPARATOR));
        output.push_str("Online:\n");

        if users.is_empty() {
            output.push_str("(Nobody online)\n");
        } else {
            for user in users {
                let me_suffix = if &user.id == me { " (me)" } else { "" };
                match &user.full_name {
                    Some(name) => {
                        output.push_str(&format!("{}{} - {}\n", user.id, me_suffix, name))
                    }
                    None => output.push_str(&format!("{}{}\n", user.id, me_suffix)),
                }
            }
        }

        output.push_str(SEPARATOR);
        output.push('\n');
        output
    }

    /// Format a newly created message
    pub fn format_message(message: &RealtimeMessage) -> String {
        format!(
            "\n\n{}\n@{}: {}\nsent at {}\n{}\n",
            RULE,
            author(message),
            message.content.as_deref().unwrap_or("(no text)"),
            display_time(&message.created_at),
            RULE
        )
    }

    /// Format the reactions of one message
    pub fn format_reactions(message_id: &str, reactions: &[GroupedReaction]) -> String {
        if reactions.is_empty() {
            return format!("\n* {} has no reactions\n", message_id);
        }
        let summary: Vec<String> = reactions
            .iter()
            .map(|r| format!("{} {}", r.emoji, r.count))
            .collect();
        format!("\n* {} reactions: {}\n", message_id, summary.join("  "))
    }

    /// Format a confirmation message after sending
    pub fn format_sent_confirmation(created_at: &str) -> String {
        format!("sent at {}\n", display_time(created_at))
    }
}

fn author(message: &RealtimeMessage) -> &str {
    message.author_name.as_deref().unwrap_or(&message.author_id)
}

/// RFC 3339 timestamp shown as `YYYY-MM-DD HH:MM:SS UTC`; unparsable input is
/// shown as is.
fn display_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| {
            t.with_timezone(&Utc)
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string()
        })
        .unwrap_or_else(|_| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_id(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn message(content: Option<&str>) -> RealtimeMessage {
        RealtimeMessage {
            id: "m1".to_string(),
            content: content.map(str::to_string),
            image_url: None,
            created_at: "2023-01-01T09:00:00.000+09:00".to_string(),
            updated_at: "2023-01-01T09:00:00.000+09:00".to_string(),
            author_id: "alice".to_string(),
            author_email: None,
            author_name: None,
            author_avatar: None,
            channel_id: "c1".to_string(),
            thread_id: None,
            reactions: None,
            reply_count: None,
        }
    }

    #[test]
    fn test_format_presence_with_nobody_online() {
        // テスト項目: オンラインのユーザーがいない場合、適切なメッセージが表示される
        // given (前提条件):
        let users = vec![];

        // when (操作):
        let result = MessageFormatter::format_presence(&users, &user_id("alice"));

        // then (期待する結果):
        assert!(result.contains("Online:"));
        assert!(result.contains("(Nobody online)"));
        assert!(result.contains(SEPARATOR));
    }

    #[test]
    fn test_format_presence_marks_me() {
        // テスト項目: 複数ユーザーの場合、全員が表示され自分にはマークが付く
        // given (前提条件):
        let users = vec![
            User::new(user_id("alice")).with_full_name("Alice"),
            User::new(user_id("bob")),
        ];

        // when (操作):
        let result = MessageFormatter::format_presence(&users, &user_id("alice"));

        // then (期待する結果):
        assert!(result.contains("alice (me) - Alice"));
        assert!(result.contains("bob\n"));
        assert!(!result.contains("bob (me)"));
    }

    #[test]
    fn test_format_message_uses_author_id_without_name() {
        // テスト項目: 表示名がない場合は author_id で表示され、時刻は UTC に変換される
        // given (前提条件):
        let message = message(Some("Hello, world!"));

        // when (操作):
        let result = MessageFormatter::format_message(&message);

        // then (期待する結果):
        assert!(result.contains("@alice: Hello, world!"));
        assert!(result.contains("sent at 2023-01-01 00:00:00 UTC"));
        assert!(result.contains(RULE));
    }

    #[test]
    fn test_format_reactions() {
        // テスト項目: リアクションが絵文字と件数で表示される
        // given (前提条件):
        let reactions = vec![GroupedReaction {
            emoji: "🎉".to_string(),
            count: 3,
            reacted_by_user: true,
        }];

        // when (操作):
        let with_reactions = MessageFormatter::format_reactions("m1", &reactions);
        let without = MessageFormatter::format_reactions("m1", &[]);

        // then (期待する結果):
        assert!(with_reactions.contains("m1 reactions: 🎉 3"));
        assert!(without.contains("no reactions"));
    }

    #[test]
    fn test_format_event_skips_client_only_presence() {
        // テスト項目: add-user はクライアントに表示するものがない
        // given (前提条件):
        let event = EventEnvelope::Presence(PresenceMessage::AddUser(User::new(user_id("bob"))));

        // when (操作):
        let result = MessageFormatter::format_event(&event, &user_id("alice"));

        // then (期待する結果):
        assert!(result.is_none());
    }

    #[test]
    fn test_format_sent_confirmation_keeps_unparsable_time() {
        // テスト項目: 解釈できない時刻文字列はそのまま表示される
        // given (前提条件):
        let created_at = "yesterday";

        // when (操作):
        let result = MessageFormatter::format_sent_confirmation(created_at);

        // then (期待する結果):
        assert_eq!(result, "sent at yesterday\n");
    }
}
