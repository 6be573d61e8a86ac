use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::store::attribute::{item_i64, item_opt_string, item_string};
use crate::store::{AttributeValue, DocumentStore, Item};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// 创建时间（秒），创建后不变
    pub create_time: i64,
    pub email: String,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    /// 只在此用户关注的人中搜索
    pub follower_id: Option<String>,
}

impl User {
    pub(crate) fn from_item(item: &Item) -> Self {
        Self {
            id: item_string(item, "id"),
            create_time: item_i64(item, "createTime"),
            email: item_string(item, "email"),
            name: item_string(item, "name"),
            phone: item_string(item, "phone"),
            username: item_opt_string(item, "username"),
        }
    }

    #[cfg(test)]
    pub(crate) fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert("id".into(), AttributeValue::string(&self.id));
        item.insert("createTime".into(), AttributeValue::number(self.create_time));
        item.insert("email".into(), AttributeValue::string(&self.email));
        item.insert("name".into(), AttributeValue::string(&self.name));
        item.insert("phone".into(), AttributeValue::string(&self.phone));
        if let Some(username) = &self.username {
            item.insert("username".into(), AttributeValue::string(username));
        }
        item
    }

    /// 名称、用户名或邮箱包含（已小写的）查询串
    pub fn matches(&self, needle: &str) -> bool {
        [Some(&self.name), self.username.as_ref(), Some(&self.email)]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle))
    }

    pub async fn find_by_id(
        store: &dyn DocumentStore,
        table: &str,
        id: &str,
    ) -> AppResult<Option<Self>> {
        let mut key = Item::new();
        key.insert("id".into(), AttributeValue::string(id));

        let item = store.get_item(table, key).await?;
        Ok(item.as_ref().map(Self::from_item))
    }

    /// 全表扫描后按子串过滤。用户表变大后应改为索引查询。
    pub async fn search_by_text(
        store: &dyn DocumentStore,
        table: &str,
        query: &str,
    ) -> AppResult<Vec<Self>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let items = store.scan(table, None).await?;
        tracing::debug!("Scanned {} users for '{}'", items.len(), needle);

        Ok(items
            .iter()
            .map(Self::from_item)
            .filter(|user| user.matches(&needle))
            .collect())
    }
}
