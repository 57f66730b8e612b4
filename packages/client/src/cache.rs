//! Local views folded from relayed events.
//!
//! Every reducer is a pure `apply` over the current state. Applying the same
//! `message:created`, `message:updated`, `reaction:updated` or
//! `thread:reply:created` event twice leaves the view as if it was applied
//! once. `message:replies:incremented` is a delta and is not idempotent.

use huddle_server::domain::{
    ChannelEvent, GroupedReaction, PresenceMessage, RealtimeMessage, ThreadEvent, User, UserId,
};

/// Online users of one room
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceView {
    users: Vec<User>,
}

impl PresenceView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole online set with a `presence` snapshot
    ///
    /// `add-user` / `remove-user` are client → server only and leave the view
    /// untouched.
    pub fn apply(&mut self, message: &PresenceMessage) {
        if let PresenceMessage::Presence { users } = message {
            self.users = users.clone();
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn is_online(&self, id: &UserId) -> bool {
        self.users.iter().any(|user| &user.id == id)
    }
}

/// Paged message list of one channel, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCache {
    pages: Vec<Vec<RealtimeMessage>>,
}

impl Default for ChannelCache {
    fn default() -> Self {
        Self {
            pages: vec![Vec::new()],
        }
    }
}

impl ChannelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from already fetched pages
    pub fn with_pages(pages: Vec<Vec<RealtimeMessage>>) -> Self {
        if pages.is_empty() {
            return Self::default();
        }
        Self { pages }
    }

    pub fn apply(&mut self, event: &ChannelEvent) {
        match event {
            ChannelEvent::MessageCreated { message } => match self.find_mut(&message.id) {
                Some(existing) => *existing = message.clone(),
                None => self.pages[0].insert(0, message.clone()),
            },
            ChannelEvent::MessageUpdated { message } => {
                if let Some(existing) = self.find_mut(&message.id) {
                    merge_message(existing, message);
                }
            }
            ChannelEvent::ReactionUpdated {
                message_id,
                reactions,
            } => {
                if let Some(existing) = self.find_mut(message_id) {
                    existing.reactions = Some(reactions.clone());
                }
            }
            ChannelEvent::RepliesIncremented { message_id, delta } => {
                if let Some(existing) = self.find_mut(message_id) {
                    let current = i64::from(existing.reply_count.unwrap_or(0));
                    let count = current.saturating_add(*delta);
                    existing.reply_count = Some(count.clamp(0, i64::from(u32::MAX)) as u32);
                }
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&RealtimeMessage> {
        self.messages().find(|message| message.id == id)
    }

    /// All cached messages, newest first
    pub fn messages(&self) -> impl Iterator<Item = &RealtimeMessage> {
        self.pages.iter().flatten()
    }

    pub fn pages(&self) -> &[Vec<RealtimeMessage>] {
        &self.pages
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut RealtimeMessage> {
        self.pages
            .iter_mut()
            .flatten()
            .find(|message| message.id == id)
    }
}

/// Root message and replies of one thread, oldest reply first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadCache {
    root: Option<RealtimeMessage>,
    replies: Vec<RealtimeMessage>,
}

impl ThreadCache {
    pub fn new(root: Option<RealtimeMessage>) -> Self {
        Self {
            root,
            replies: Vec::new(),
        }
    }

    pub fn apply(&mut self, event: &ThreadEvent) {
        match event {
            ThreadEvent::ReplyCreated { reply } => {
                let mut reply = reply.clone();
                reply.reactions.get_or_insert_with(Vec::new);
                match self.replies.iter_mut().find(|r| r.id == reply.id) {
                    Some(existing) => *existing = reply,
                    None => self.replies.push(reply),
                }
            }
            ThreadEvent::ReactionUpdated {
                message_id,
                reactions,
                ..
            } => {
                if let Some(target) = self.find_mut(message_id) {
                    target.reactions = Some(reactions.clone());
                }
            }
        }
    }

    pub fn root(&self) -> Option<&RealtimeMessage> {
        self.root.as_ref()
    }

    pub fn replies(&self) -> &[RealtimeMessage] {
        &self.replies
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut RealtimeMessage> {
        self.root
            .iter_mut()
            .chain(self.replies.iter_mut())
            .find(|message| message.id == id)
    }
}

/// Shallow merge: fields present in `update` win, absent optional fields keep
/// the cached value.
fn merge_message(target: &mut RealtimeMessage, update: &RealtimeMessage) {
    fn merge<T: Clone>(target: &mut Option<T>, update: &Option<T>) {
        if update.is_some() {
            target.clone_from(update);
        }
    }

    target.created_at.clone_from(&update.created_at);
    target.updated_at.clone_from(&update.updated_at);
    target.author_id.clone_from(&update.author_id);
    target.channel_id.clone_from(&update.channel_id);
    merge(&mut target.content, &update.content);
    merge(&mut target.image_url, &update.image_url);
    merge(&mut target.author_email, &update.author_email);
    merge(&mut target.author_name, &update.author_name);
    merge(&mut target.author_avatar, &update.author_avatar);
    merge(&mut target.thread_id, &update.thread_id);
    merge(&mut target.reactions, &update.reactions);
    merge(&mut target.reply_count, &update.reply_count);
}

/// Reactions with the given emoji, if any
pub fn reaction<'a>(message: &'a RealtimeMessage, emoji: &str) -> Option<&'a GroupedReaction> {
    message
        .reactions
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|reaction| reaction.emoji == emoji)
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_server::domain::{EventEnvelope, parse_frame};

    fn message(id: &str, content: &str) -> RealtimeMessage {
        RealtimeMessage {
            id: id.to_string(),
            content: Some(content.to_string()),
            image_url: None,
            created_at: "2025-01-01T10:00:00.000Z".to_string(),
            updated_at: "2025-01-01T10:00:00.000Z".to_string(),
            author_id: "alice".to_string(),
            author_email: None,
            author_name: Some("Alice".to_string()),
            author_avatar: None,
            channel_id: "c1".to_string(),
            thread_id: None,
            reactions: None,
            reply_count: None,
        }
    }

    fn thumbs_up(count: u32) -> Vec<GroupedReaction> {
        vec![GroupedReaction {
            emoji: "👍".to_string(),
            count,
            reacted_by_user: false,
        }]
    }

    fn user(id: &str) -> User {
        User::new(UserId::new(id.to_string()).unwrap())
    }

    #[test]
    fn test_presence_view_replaces_whole_set() {
        // テスト項目: presence スナップショットごとにオンライン集合が置き換えられる
        // given (前提条件):
        let mut view = PresenceView::new();
        view.apply(&PresenceMessage::Presence {
            users: vec![user("alice"), user("bob")],
        });

        // when (操作):
        view.apply(&PresenceMessage::Presence {
            users: vec![user("bob")],
        });

        // then (期待する結果):
        assert_eq!(view.users(), &[user("bob")]);
        assert!(!view.is_online(&UserId::new("alice".to_string()).unwrap()));
    }

    #[test]
    fn test_presence_view_ignores_client_messages() {
        // テスト項目: add-user / remove-user ではビューは変化しない
        // given (前提条件):
        let mut view = PresenceView::new();

        // when (操作):
        view.apply(&PresenceMessage::AddUser(user("alice")));
        view.apply(&PresenceMessage::RemoveUser {
            id: "alice".to_string(),
        });

        // then (期待する結果):
        assert!(view.users().is_empty());
    }

    #[test]
    fn test_message_created_prepends_to_first_page() {
        // テスト項目: message:created は最初のページの先頭に追加される
        // given (前提条件):
        let mut cache = ChannelCache::with_pages(vec![
            vec![message("m2", "second")],
            vec![message("m1", "first")],
        ]);

        // when (操作):
        cache.apply(&ChannelEvent::MessageCreated {
            message: message("m3", "third"),
        });

        // then (期待する結果):
        let ids: Vec<&str> = cache.messages().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m3", "m2", "m1"]);
        assert_eq!(cache.pages()[0].len(), 2);
    }

    #[test]
    fn test_message_created_twice_is_idempotent() {
        // テスト項目: 同じ message:created を 2 回適用しても 1 件のまま
        // given (前提条件):
        let mut cache = ChannelCache::new();
        let event = ChannelEvent::MessageCreated {
            message: message("m1", "hello"),
        };

        // when (操作):
        cache.apply(&event);
        let once = cache.clone();
        cache.apply(&event);

        // then (期待する結果):
        assert_eq!(cache, once);
        assert_eq!(cache.messages().count(), 1);
    }

    #[test]
    fn test_message_updated_merges_by_id() {
        // テスト項目: message:updated は ID で一致するメッセージにマージされ、省略されたフィールドは保持される
        // given (前提条件):
        let mut original = message("m1", "hello");
        original.reply_count = Some(3);
        let mut cache = ChannelCache::with_pages(vec![vec![original]]);
        let mut update = message("m1", "hello (edited)");
        update.author_name = None;
        update.updated_at = "2025-01-01T10:05:00.000Z".to_string();
        let event = ChannelEvent::MessageUpdated { message: update };

        // when (操作):
        cache.apply(&event);
        let once = cache.clone();
        cache.apply(&event);

        // then (期待する結果):
        let merged = cache.get("m1").unwrap();
        assert_eq!(merged.content.as_deref(), Some("hello (edited)"));
        assert_eq!(merged.author_name.as_deref(), Some("Alice"));
        assert_eq!(merged.reply_count, Some(3));
        assert_eq!(merged.updated_at, "2025-01-01T10:05:00.000Z");
        assert_eq!(cache, once);
    }

    #[test]
    fn test_message_updated_for_unknown_id_is_ignored() {
        // テスト項目: キャッシュにないメッセージの message:updated は無視される
        // given (前提条件):
        let mut cache = ChannelCache::with_pages(vec![vec![message("m1", "hello")]]);
        let before = cache.clone();

        // when (操作):
        cache.apply(&ChannelEvent::MessageUpdated {
            message: message("m404", "ghost"),
        });

        // then (期待する結果):
        assert_eq!(cache, before);
    }

    #[test]
    fn test_duplicate_reaction_updated_is_idempotent() {
        // テスト項目: 同じ reaction:updated を 2 回適用しても 1 回適用した状態と同じ
        // given (前提条件):
        let mut cache = ChannelCache::with_pages(vec![vec![message("m1", "hello")]]);
        let event = ChannelEvent::ReactionUpdated {
            message_id: "m1".to_string(),
            reactions: thumbs_up(2),
        };

        // when (操作):
        cache.apply(&event);
        let once = cache.clone();
        cache.apply(&event);

        // then (期待する結果):
        assert_eq!(cache, once);
        assert_eq!(
            reaction(cache.get("m1").unwrap(), "👍").map(|r| r.count),
            Some(2)
        );
    }

    #[test]
    fn test_replies_incremented_adds_delta_and_floors_at_zero() {
        // テスト項目: message:replies:incremented は返信数に delta を加算し、0 未満にはならない
        // given (前提条件):
        let mut cache = ChannelCache::with_pages(vec![vec![message("m1", "hello")]]);

        // when (操作):
        cache.apply(&ChannelEvent::RepliesIncremented {
            message_id: "m1".to_string(),
            delta: 2,
        });
        let after_increment = cache.get("m1").unwrap().reply_count;
        cache.apply(&ChannelEvent::RepliesIncremented {
            message_id: "m1".to_string(),
            delta: -5,
        });

        // then (期待する結果):
        assert_eq!(after_increment, Some(2));
        assert_eq!(cache.get("m1").unwrap().reply_count, Some(0));
    }

    #[test]
    fn test_replies_incremented_with_extreme_delta_saturates() {
        // テスト項目: i64 の上限・下限の delta を受け取っても panic せず、返信数は u32 の範囲に収まる
        // given (前提条件):
        let mut created = message("m1", "hello");
        created.reply_count = Some(1);
        let mut cache = ChannelCache::new();
        cache.apply(&ChannelEvent::MessageCreated { message: created });
        let frame = |delta: i64| {
            format!(
                r#"{{"type":"message:replies:incremented","payload":{{"messageId":"m1","delta":{}}}}}"#,
                delta
            )
        };

        // when (操作):
        let Ok(EventEnvelope::Channel(max)) = parse_frame(&frame(i64::MAX)) else {
            panic!("frame with i64::MAX delta should parse");
        };
        cache.apply(&max);
        let after_max = cache.get("m1").unwrap().reply_count;
        let Ok(EventEnvelope::Channel(min)) = parse_frame(&frame(i64::MIN)) else {
            panic!("frame with i64::MIN delta should parse");
        };
        cache.apply(&min);

        // then (期待する結果):
        assert_eq!(after_max, Some(u32::MAX));
        assert_eq!(cache.get("m1").unwrap().reply_count, Some(0));
    }

    #[test]
    fn test_thread_reply_created_appends_with_default_reactions() {
        // テスト項目: thread:reply:created は末尾に追加され、reactions は空配列で補完される
        // given (前提条件):
        let mut cache = ThreadCache::new(Some(message("root", "question")));
        let event = ThreadEvent::ReplyCreated {
            reply: message("r1", "answer"),
        };

        // when (操作):
        cache.apply(&event);
        cache.apply(&event);
        cache.apply(&ThreadEvent::ReplyCreated {
            reply: message("r2", "follow-up"),
        });

        // then (期待する結果):
        let ids: Vec<&str> = cache.replies().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
        assert_eq!(cache.replies()[0].reactions, Some(Vec::new()));
    }

    #[test]
    fn test_thread_reaction_updated_targets_root_or_reply() {
        // テスト項目: thread:reaction:updated はルートメッセージと返信の両方に適用できる
        // given (前提条件):
        let mut cache = ThreadCache::new(Some(message("root", "question")));
        cache.apply(&ThreadEvent::ReplyCreated {
            reply: message("r1", "answer"),
        });

        // when (操作):
        cache.apply(&ThreadEvent::ReactionUpdated {
            message_id: "root".to_string(),
            reactions: thumbs_up(1),
            thread_id: "root".to_string(),
        });
        cache.apply(&ThreadEvent::ReactionUpdated {
            message_id: "r1".to_string(),
            reactions: thumbs_up(4),
            thread_id: "root".to_string(),
        });

        // then (期待する結果):
        assert_eq!(cache.root().unwrap().reactions, Some(thumbs_up(1)));
        assert_eq!(cache.replies()[0].reactions, Some(thumbs_up(4)));
    }
}
