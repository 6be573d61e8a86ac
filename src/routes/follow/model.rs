use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::store::attribute::item_string;
use crate::store::{AttributeEquals, AttributeValue, DocumentStore, Item, PutCondition};

const USER_ID: &str = "userId";
const FOLLOWER_ID: &str = "followerId";

/// 关注关系：`follower_id` 关注了 `user_id`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Following {
    pub user_id: String,
    pub follower_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FollowersQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FollowingQuery {
    pub follower_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateFollowRequest {
    pub user_id: String,
    pub follower_id: String,
}

impl Following {
    fn from_item(item: &Item) -> Self {
        Self {
            user_id: item_string(item, USER_ID),
            follower_id: item_string(item, FOLLOWER_ID),
        }
    }

    /// 关注 `user_id` 的所有人，走分区键查询
    pub async fn find_followers(
        store: &dyn DocumentStore,
        table: &str,
        user_id: &str,
    ) -> AppResult<Vec<Self>> {
        let items = store
            .query(
                table,
                AttributeEquals::new(USER_ID, AttributeValue::string(user_id)),
                true,
            )
            .await?;
        Ok(items.iter().map(Self::from_item).collect())
    }

    /// `follower_id` 关注的所有人。
    ///
    /// 没有以 followerId 为键的反向索引，只能全表扫描加过滤，代价随关系表大小增长。
    /// 建立反向索引后应替换为查询。
    pub async fn find_following(
        store: &dyn DocumentStore,
        table: &str,
        follower_id: &str,
    ) -> AppResult<Vec<Self>> {
        let items = store
            .scan(
                table,
                Some(AttributeEquals::new(
                    FOLLOWER_ID,
                    AttributeValue::string(follower_id),
                )),
            )
            .await?;
        Ok(items.iter().map(Self::from_item).collect())
    }

    /// 条件写入；关系已存在时返回 `AppError::AlreadyExists`，不会产生重复记录
    pub async fn create(
        store: &dyn DocumentStore,
        table: &str,
        user_id: &str,
        follower_id: &str,
    ) -> AppResult<Self> {
        if user_id.trim().is_empty() || follower_id.trim().is_empty() {
            return Err(AppError::Validation(
                "user_id and follower_id must not be empty".to_string(),
            ));
        }

        let mut item = Item::new();
        item.insert(USER_ID.into(), AttributeValue::string(user_id));
        item.insert(FOLLOWER_ID.into(), AttributeValue::string(follower_id));

        store
            .put_item(
                table,
                item,
                PutCondition::KeyAbsent(vec![USER_ID.to_string(), FOLLOWER_ID.to_string()]),
            )
            .await?;

        tracing::info!("{} now follows {}", follower_id, user_id);
        Ok(Self {
            user_id: user_id.to_string(),
            follower_id: follower_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tables;
    use crate::store::MemoryStore;

    fn setup() -> (MemoryStore, String) {
        let tables = Tables::default();
        (MemoryStore::with_tables(&tables), tables.following)
    }

    #[tokio::test]
    async fn followers_and_following_are_two_directions() {
        let (store, table) = setup();
        Following::create(&store, &table, "alice", "bob").await.unwrap();
        Following::create(&store, &table, "alice", "carol").await.unwrap();
        Following::create(&store, &table, "dave", "bob").await.unwrap();

        let mut followers: Vec<_> = Following::find_followers(&store, &table, "alice")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.follower_id)
            .collect();
        followers.sort();
        assert_eq!(followers, vec!["bob", "carol"]);

        let mut bob_follows: Vec<_> = Following::find_following(&store, &table, "bob")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.user_id)
            .collect();
        bob_follows.sort();
        assert_eq!(bob_follows, vec!["alice", "dave"]);
    }

    #[tokio::test]
    async fn duplicate_follow_is_already_exists_and_not_duplicated() {
        let (store, table) = setup();
        Following::create(&store, &table, "alice", "bob").await.unwrap();

        let err = Following::create(&store, &table, "alice", "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists));
        assert_eq!(store.row_count(&table), 1);
    }

    #[tokio::test]
    async fn empty_ids_are_rejected_before_the_store() {
        let (store, table) = setup();
        let err = Following::create(&store, &table, "", "bob").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.call_count(), 0);
    }
}
