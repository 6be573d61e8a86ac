use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::store::attribute::{item_i64, item_opt_i64, item_opt_string, item_string, item_string_list};
use crate::store::{AttributeEquals, AttributeValue, DocumentStore, Item, PutCondition};

/// 排队时间档位（分钟），60 表示一小时及以上
pub const LINE_MINUTE_BUCKETS: [u32; 5] = [0, 5, 15, 30, 60];

/// 签到记录，以 (user_id, time) 为复合键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub user_id: String,
    pub location: String,
    /// 签到时间（秒）
    pub time: i64,
    /// 同行的其他用户
    pub users: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckInsQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub user_id: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCheckInRequest {
    pub user_id: String,
    pub location: String,
    /// 缺省时取当前时间
    pub time: Option<i64>,
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCheckInRequest {
    pub user_id: String,
    pub time: i64,
    pub users: Option<Vec<String>>,
    pub line_minutes: Option<u32>,
    pub notes: Option<String>,
}

impl UpdateCheckInRequest {
    pub fn is_empty(&self) -> bool {
        self.users.is_none() && self.line_minutes.is_none() && self.notes.is_none()
    }
}

fn check_in_key(user_id: &str, time: i64) -> Item {
    let mut key = Item::new();
    key.insert("userId".into(), AttributeValue::string(user_id));
    key.insert("time".into(), AttributeValue::number(time));
    key
}

impl CheckIn {
    fn from_item(item: &Item) -> Self {
        Self {
            user_id: item_string(item, "userId"),
            location: item_string(item, "location"),
            time: item_i64(item, "time"),
            users: item_string_list(item, "users"),
            line_minutes: item_opt_i64(item, "lineMinutes").and_then(|m| u32::try_from(m).ok()),
            notes: item_opt_string(item, "notes"),
        }
    }

    /// 某用户的全部签到，按时间从新到旧
    pub async fn find_by_user(
        store: &dyn DocumentStore,
        table: &str,
        user_id: &str,
    ) -> AppResult<Vec<Self>> {
        let items = store
            .query(
                table,
                AttributeEquals::new("userId", AttributeValue::string(user_id)),
                false,
            )
            .await?;
        Ok(items.iter().map(Self::from_item).collect())
    }

    /// 无条件写入。同一用户同一秒内的两次签到键相同，后写覆盖先写。
    pub async fn create(
        store: &dyn DocumentStore,
        table: &str,
        req: CreateCheckInRequest,
    ) -> AppResult<Self> {
        if req.user_id.trim().is_empty() {
            return Err(AppError::Validation("user_id must not be empty".to_string()));
        }

        let check_in = CheckIn {
            user_id: req.user_id,
            location: req.location,
            time: req.time.unwrap_or_else(|| chrono::Utc::now().timestamp()),
            users: req.users,
            line_minutes: None,
            notes: None,
        };

        let mut item = check_in_key(&check_in.user_id, check_in.time);
        item.insert("location".into(), AttributeValue::string(&check_in.location));
        item.insert("users".into(), AttributeValue::string_list(check_in.users.iter().cloned()));

        store.put_item(table, item, PutCondition::Always).await?;
        tracing::info!(
            "Check-in created for {} at '{}' ({})",
            check_in.user_id,
            check_in.location,
            check_in.time
        );
        Ok(check_in)
    }

    /// 只更新请求中给出的字段；没有字段时不访问存储并返回 `false`。
    /// 记录不存在时返回 `AppError::NotFound`。
    pub async fn update(
        store: &dyn DocumentStore,
        table: &str,
        req: UpdateCheckInRequest,
    ) -> AppResult<bool> {
        if req.is_empty() {
            tracing::debug!("Nothing to update for check-in {}@{}", req.user_id, req.time);
            return Ok(false);
        }
        if let Some(minutes) = req.line_minutes {
            if !LINE_MINUTE_BUCKETS.contains(&minutes) {
                return Err(AppError::Validation(format!(
                    "line_minutes must be one of {:?}, got {}",
                    LINE_MINUTE_BUCKETS, minutes
                )));
            }
        }

        let mut updates = Vec::new();
        if let Some(users) = req.users {
            updates.push(("users".to_string(), AttributeValue::string_list(users)));
        }
        if let Some(minutes) = req.line_minutes {
            updates.push((
                "lineMinutes".to_string(),
                AttributeValue::number(i64::from(minutes)),
            ));
        }
        if let Some(notes) = req.notes {
            updates.push(("notes".to_string(), AttributeValue::string(notes)));
        }

        store
            .update_item(table, check_in_key(&req.user_id, req.time), updates)
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::config::Tables;
    use crate::store::MemoryStore;

    fn setup() -> (MemoryStore, String) {
        let tables = Tables::default();
        (MemoryStore::with_tables(&tables), tables.check_ins)
    }

    fn create_req(user_id: &str, location: &str, time: i64) -> CreateCheckInRequest {
        CreateCheckInRequest {
            user_id: user_id.to_string(),
            location: location.to_string(),
            time: Some(time),
            users: Vec::new(),
        }
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let (store, table) = setup();
        for (location, time) in [("Cafe", 100), ("Bar", 300), ("Diner", 200)] {
            CheckIn::create(&store, &table, create_req("u1", location, time))
                .await
                .unwrap();
        }
        CheckIn::create(&store, &table, create_req("u2", "Elsewhere", 400))
            .await
            .unwrap();

        let check_ins = CheckIn::find_by_user(&store, &table, "u1").await.unwrap();
        let locations: Vec<_> = check_ins.iter().map(|c| c.location.as_str()).collect();
        assert_eq!(locations, vec!["Bar", "Diner", "Cafe"]);
        assert!(check_ins.iter().all(|c| c.users.is_empty()));
    }

    #[tokio::test]
    async fn same_second_check_in_overwrites() {
        let (store, table) = setup();
        CheckIn::create(&store, &table, create_req("u1", "First", 500))
            .await
            .unwrap();
        CheckIn::create(&store, &table, create_req("u1", "Second", 500))
            .await
            .unwrap();

        let check_ins = CheckIn::find_by_user(&store, &table, "u1").await.unwrap();
        assert_eq!(check_ins.len(), 1);
        assert_eq!(check_ins[0].location, "Second");
    }

    #[tokio::test]
    async fn missing_time_uses_now() {
        let (store, table) = setup();
        let before = chrono::Utc::now().timestamp();
        let mut req = create_req("u1", "Now", 0);
        req.time = None;
        let created = CheckIn::create(&store, &table, req).await.unwrap();
        assert!(created.time >= before);
    }

    #[tokio::test]
    async fn partial_update_touches_only_given_fields() {
        let (store, table) = setup();
        let mut req = create_req("u1", "Cafe", 100);
        req.users = vec!["u9".to_string()];
        CheckIn::create(&store, &table, req).await.unwrap();

        let updated = CheckIn::update(
            &store,
            &table,
            UpdateCheckInRequest {
                user_id: "u1".into(),
                time: 100,
                line_minutes: Some(15),
                notes: Some("long wait".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(updated);

        let check_in = &CheckIn::find_by_user(&store, &table, "u1").await.unwrap()[0];
        assert_eq!(check_in.location, "Cafe");
        assert_eq!(check_in.users, vec!["u9"]);
        assert_eq!(check_in.line_minutes, Some(15));
        assert_eq!(check_in.notes.as_deref(), Some("long wait"));
    }

    #[tokio::test]
    async fn empty_update_makes_no_store_call() {
        let (store, table) = setup();
        CheckIn::create(&store, &table, create_req("u1", "Cafe", 100))
            .await
            .unwrap();
        let calls = store.call_count();

        let updated = CheckIn::update(
            &store,
            &table,
            UpdateCheckInRequest {
                user_id: "u1".into(),
                time: 100,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(!updated);
        assert_eq!(store.call_count(), calls);
    }

    #[tokio::test]
    async fn update_of_missing_check_in_is_not_found() {
        let (store, table) = setup();
        let err = CheckIn::update(
            &store,
            &table,
            UpdateCheckInRequest {
                user_id: "u1".into(),
                time: 1,
                notes: Some("hello".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
        assert_eq!(store.row_count(&table), 0);
    }

    #[rstest]
    #[case(0, true)]
    #[case(5, true)]
    #[case(15, true)]
    #[case(30, true)]
    #[case(60, true)]
    #[case(10, false)]
    #[case(90, false)]
    #[tokio::test]
    async fn line_minutes_must_be_a_bucket(#[case] minutes: u32, #[case] accepted: bool) {
        let (store, table) = setup();
        CheckIn::create(&store, &table, create_req("u1", "Cafe", 100))
            .await
            .unwrap();

        let result = CheckIn::update(
            &store,
            &table,
            UpdateCheckInRequest {
                user_id: "u1".into(),
                time: 100,
                line_minutes: Some(minutes),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(result.is_ok(), accepted);
        if !accepted {
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }
}
