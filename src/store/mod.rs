// 文档存储模块
// 定义存储操作接口、DynamoDB 实现、内存实现以及进程内唯一的客户端句柄

pub mod attribute;
pub mod dynamo;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::config::{Config, StoreBackend};
use crate::error::{AppError, AppResult};

pub use attribute::{AttributeValue, Item};
pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

/// 属性等值条件，用于分区键查询和扫描过滤
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeEquals {
    pub name: String,
    pub value: AttributeValue,
}

impl AttributeEquals {
    pub fn new(name: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// 写入条件
#[derive(Debug, Clone, PartialEq)]
pub enum PutCondition {
    /// 无条件覆盖写入
    Always,
    /// 仅当给定键属性都不存在时写入，否则返回 `AppError::AlreadyExists`
    KeyAbsent(Vec<String>),
}

/// 文档存储的最小操作集，每个方法对应一次往返（分页除外）
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 主键点查，不存在时返回 `None`
    async fn get_item(&self, table: &str, key: Item) -> AppResult<Option<Item>>;

    /// 按分区键查询，`scan_forward = false` 时按排序键降序返回
    async fn query(
        &self,
        table: &str,
        partition: AttributeEquals,
        scan_forward: bool,
    ) -> AppResult<Vec<Item>>;

    /// 全表扫描，可选等值过滤。代价随表大小线性增长，只用于没有索引可用的查找
    async fn scan(&self, table: &str, filter: Option<AttributeEquals>) -> AppResult<Vec<Item>>;

    async fn put_item(&self, table: &str, item: Item, condition: PutCondition) -> AppResult<()>;

    /// 只修改给定属性；记录不存在时返回 `AppError::NotFound`
    async fn update_item(
        &self,
        table: &str,
        key: Item,
        updates: Vec<(String, AttributeValue)>,
    ) -> AppResult<()>;
}

/// 进程内唯一的存储客户端句柄。
///
/// 客户端在第一次使用时构建，之后复用。构建由 `OnceCell` 保护，多线程并发首次访问也只会构建一次；
/// 构建失败不会被记住，下一次调用会重试。
#[derive(Clone)]
pub struct StoreHandle {
    config: Option<Arc<Config>>,
    cell: Arc<OnceCell<Arc<dyn DocumentStore>>>,
}

impl StoreHandle {
    pub fn lazy(config: Config) -> Self {
        Self {
            config: Some(Arc::new(config)),
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// 使用已经构建好的存储
    pub fn from_store(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config: None,
            cell: Arc::new(OnceCell::new_with(Some(store))),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get(&self) -> AppResult<Arc<dyn DocumentStore>> {
        self.cell
            .get_or_try_init(|| async {
                let config = self
                    .config
                    .as_deref()
                    .ok_or_else(|| AppError::Config("Store is not configured".to_string()))?;
                build_store(config).await
            })
            .await
            .cloned()
    }
}

async fn build_store(config: &Config) -> AppResult<Arc<dyn DocumentStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory document store");
            Ok(Arc::new(MemoryStore::with_tables(&config.tables)))
        }
        StoreBackend::DynamoDb => {
            let store = DynamoStore::from_config(config).await;
            tracing::info!("Document store client created for {}", config.store_endpoint());
            Ok(Arc::new(store))
        }
    }
}
