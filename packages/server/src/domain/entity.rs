//! Domain entities: the presence identity, per-connection state and the
//! read model of a room.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::value_object::{RoomName, Timestamp, UserId};

/// Presence identity of an authenticated person.
///
/// A display projection only; carries no session or token material. On the
/// wire every key is required, the nullable ones may be `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(deserialize_with = "required_nullable")]
    pub full_name: Option<String>,
    #[serde(deserialize_with = "required_nullable")]
    pub email: Option<String>,
    #[serde(deserialize_with = "required_nullable")]
    pub picture: Option<String>,
}

impl User {
    /// Create a user with only an id
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            full_name: None,
            email: None,
            picture: None,
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }
}

// `Option<T>` fields normally default to `None` when the key is missing.
// Going through a custom deserializer makes the key mandatory while still
// accepting `null`.
fn required_nullable<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

/// Ephemeral state attached to one open connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub user: Option<User>,
}

impl ConnectionState {
    pub fn with_user(user: User) -> Self {
        Self { user: Some(user) }
    }
}

/// Deduplicate users by id.
///
/// The last user seen for an id wins, the output keeps the order in which
/// each id was first seen.
pub fn dedup_users<I>(users: I) -> Vec<User>
where
    I: IntoIterator<Item = User>,
{
    let mut positions: HashMap<UserId, usize> = HashMap::new();
    let mut deduped: Vec<User> = Vec::new();

    for user in users {
        match positions.get(&user.id) {
            Some(&index) => deduped[index] = user,
            None => {
                positions.insert(user.id.clone(), deduped.len());
                deduped.push(user);
            }
        }
    }

    deduped
}

/// Point-in-time view of a room, used by the introspection API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomOverview {
    pub name: RoomName,
    pub connection_count: usize,
    pub online_users: Vec<User>,
    pub created_at: Timestamp,
    pub last_active: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User::new(UserId::new(id.to_string()).unwrap())
    }

    #[test]
    fn test_dedup_users_keeps_first_seen_order() {
        // テスト項目: 重複のないユーザーは出現順のまま返される
        // given (前提条件):
        let users = vec![user("carol"), user("alice"), user("bob")];

        // when (操作):
        let result = dedup_users(users);

        // then (期待する結果):
        let ids: Vec<&str> = result.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["carol", "alice", "bob"]);
    }

    #[test]
    fn test_dedup_users_last_write_wins() {
        // テスト項目: 同じ ID のユーザーは最後のものが採用され、位置は最初の出現位置
        // given (前提条件): alice が 2 つのタブから接続している
        let users = vec![
            user("alice").with_full_name("Alice (old tab)"),
            user("bob"),
            user("alice").with_full_name("Alice"),
        ];

        // when (操作):
        let result = dedup_users(users);

        // then (期待する結果):
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id.as_str(), "alice");
        assert_eq!(result[0].full_name.as_deref(), Some("Alice"));
        assert_eq!(result[1].id.as_str(), "bob");
    }

    #[test]
    fn test_dedup_users_empty() {
        // テスト項目: 空の入力に対して空のリストが返される
        // given (前提条件):
        let users: Vec<User> = Vec::new();

        // when (操作):
        let result = dedup_users(users);

        // then (期待する結果):
        assert!(result.is_empty());
    }

    #[test]
    fn test_user_requires_nullable_keys() {
        // テスト項目: nullable なキーは null を許容するが省略は許容しない
        // given (前提条件):
        let with_nulls = r#"{"id":"alice","full_name":null,"email":null,"picture":null}"#;
        let missing_keys = r#"{"id":"alice"}"#;

        // when (操作):
        let ok = serde_json::from_str::<User>(with_nulls);
        let err = serde_json::from_str::<User>(missing_keys);

        // then (期待する結果):
        assert_eq!(ok.unwrap(), user("alice"));
        assert!(err.is_err());
    }

    #[test]
    fn test_user_serializes_nulls() {
        // テスト項目: 値のないフィールドは null としてシリアライズされる
        // given (前提条件):
        let alice = user("alice").with_email("alice@example.com");

        // when (操作):
        let json = serde_json::to_value(&alice).unwrap();

        // then (期待する結果):
        assert_eq!(
            json,
            serde_json::json!({
                "id": "alice",
                "full_name": null,
                "email": "alice@example.com",
                "picture": null
            })
        );
    }
}
