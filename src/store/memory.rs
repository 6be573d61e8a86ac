use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::attribute::{AttributeValue, Item};
use super::{AttributeEquals, DocumentStore, PutCondition};
use crate::config::Tables;
use crate::error::{AppError, AppResult};

/// 表的主键结构：分区键加可选排序键
#[derive(Debug, Clone)]
pub struct KeySchema {
    pub partition: String,
    pub sort: Option<String>,
}

impl KeySchema {
    pub fn new(partition: &str, sort: Option<&str>) -> Self {
        Self {
            partition: partition.to_string(),
            sort: sort.map(str::to_string),
        }
    }

    fn key_of(&self, item: &Item) -> AppResult<(AttributeValue, Option<AttributeValue>)> {
        let missing = |name: &str| AppError::Store {
            kind: "ValidationException".to_string(),
            message: format!("Missing key attribute '{}'", name),
        };
        let partition = item
            .get(&self.partition)
            .cloned()
            .ok_or_else(|| missing(&self.partition))?;
        let sort = match &self.sort {
            Some(name) => Some(item.get(name).cloned().ok_or_else(|| missing(name))?),
            None => None,
        };
        Ok((partition, sort))
    }
}

#[derive(Debug)]
struct MemoryTable {
    schema: KeySchema,
    rows: Vec<Item>,
}

impl MemoryTable {
    fn position(&self, key: &(AttributeValue, Option<AttributeValue>)) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| self.schema.key_of(row).ok().as_ref() == Some(key))
    }
}

/// 进程内文档存储，语义与远端存储一致（条件写入、分区查询、排序方向）。
/// 用于本地开发和测试，并统计收到的操作次数。
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
    calls: AtomicUsize,
}

fn poisoned() -> AppError {
    AppError::Store {
        kind: "InternalServerError".to_string(),
        message: "memory store lock poisoned".to_string(),
    }
}

fn no_table(table: &str) -> AppError {
    AppError::Store {
        kind: "ResourceNotFoundException".to_string(),
        message: format!("Requested resource not found: Table: {} not found", table),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按应用的三张表建表
    pub fn with_tables(tables: &Tables) -> Self {
        let store = Self::new();
        store.create_table(&tables.users, KeySchema::new("id", None));
        store.create_table(&tables.following, KeySchema::new("userId", Some("followerId")));
        store.create_table(&tables.check_ins, KeySchema::new("userId", Some("time")));
        store
    }

    pub fn create_table(&self, name: &str, schema: KeySchema) {
        if let Ok(mut tables) = self.tables.write() {
            tables.insert(
                name.to_string(),
                MemoryTable {
                    schema,
                    rows: Vec::new(),
                },
            );
        }
    }

    /// 已处理的操作次数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 表中的记录数，不计入操作次数
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .ok()
            .and_then(|tables| tables.get(table).map(|t| t.rows.len()))
            .unwrap_or(0)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_item(&self, table: &str, key: Item) -> AppResult<Option<Item>> {
        self.record_call();
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let table = tables.get(table).ok_or_else(|| no_table(table))?;
        let key = table.schema.key_of(&key)?;
        Ok(table.position(&key).map(|i| table.rows[i].clone()))
    }

    async fn query(
        &self,
        table: &str,
        partition: AttributeEquals,
        scan_forward: bool,
    ) -> AppResult<Vec<Item>> {
        self.record_call();
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let table = tables.get(table).ok_or_else(|| no_table(table))?;
        if partition.name != table.schema.partition {
            return Err(AppError::Store {
                kind: "ValidationException".to_string(),
                message: format!("Query key condition not supported on '{}'", partition.name),
            });
        }

        let mut items: Vec<Item> = table
            .rows
            .iter()
            .filter(|row| row.get(&partition.name) == Some(&partition.value))
            .cloned()
            .collect();

        if let Some(sort) = &table.schema.sort {
            items.sort_by(|a, b| match (a.get(sort), b.get(sort)) {
                (Some(a), Some(b)) => a.compare(b),
                _ => std::cmp::Ordering::Equal,
            });
            if !scan_forward {
                items.reverse();
            }
        }
        Ok(items)
    }

    async fn scan(&self, table: &str, filter: Option<AttributeEquals>) -> AppResult<Vec<Item>> {
        self.record_call();
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let table = tables.get(table).ok_or_else(|| no_table(table))?;
        Ok(table
            .rows
            .iter()
            .filter(|row| match &filter {
                Some(f) => row.get(&f.name) == Some(&f.value),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn put_item(&self, table: &str, item: Item, condition: PutCondition) -> AppResult<()> {
        self.record_call();
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let table = tables.get_mut(table).ok_or_else(|| no_table(table))?;
        let key = table.schema.key_of(&item)?;

        match table.position(&key) {
            Some(_) if matches!(condition, PutCondition::KeyAbsent(_)) => Err(AppError::AlreadyExists),
            Some(i) => {
                table.rows[i] = item;
                Ok(())
            }
            None => {
                table.rows.push(item);
                Ok(())
            }
        }
    }

    async fn update_item(
        &self,
        table: &str,
        key: Item,
        updates: Vec<(String, AttributeValue)>,
    ) -> AppResult<()> {
        self.record_call();
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let table = tables.get_mut(table).ok_or_else(|| no_table(table))?;
        let key = table.schema.key_of(&key)?;

        let i = table.position(&key).ok_or(AppError::NotFound)?;
        let row = &mut table.rows[i];
        for (name, value) in updates {
            row.insert(name, value);
        }
        Ok(())
    }
}
