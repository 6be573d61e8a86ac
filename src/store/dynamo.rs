// DynamoDB 存储实现
// 基于 aws-sdk-dynamodb：配置了静态密钥时直接使用，否则走 SDK 默认凭证链（环境变量、profile、SSO、容器、实例元数据）。
// 查询和扫描沿 LastEvaluatedKey 翻页直到取完；不做自动重试。

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::retry::RetryConfig;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::config::{Credentials, Region};
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::AttributeValue as SdkValue;
use serde_json::json;

use super::attribute::{AttributeValue, Item};
use super::{AttributeEquals, DocumentStore, PutCondition};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::utils::with_api_logging;

type SdkItem = HashMap<String, SdkValue>;

pub struct DynamoStore {
    client: Client,
}

/// 同时配置了 key id 和 secret 时返回静态凭证
pub(crate) fn static_credentials(config: &Config) -> Option<Credentials> {
    match (&config.access_key_id, &config.secret_access_key) {
        (Some(id), Some(secret)) => Some(Credentials::new(
            id.clone(),
            secret.clone(),
            config.session_token.clone(),
            None,
            "environment",
        )),
        _ => None,
    }
}

impl DynamoStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn from_config(config: &Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::disabled());

        match static_credentials(config) {
            Some(credentials) => loader = loader.credentials_provider(credentials),
            None => tracing::info!("No static store keys configured, using default credential chain"),
        }
        if let Some(endpoint) = &config.store_endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        Self::new(Client::new(&loader.load().await))
    }

    async fn paginate_query(
        &self,
        table: &str,
        partition: &AttributeEquals,
        scan_forward: bool,
    ) -> AppResult<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key: Option<SdkItem> = None;
        loop {
            let output = self
                .client
                .query()
                .table_name(table)
                .key_condition_expression("#pk = :pk")
                .expression_attribute_names("#pk", partition.name.as_str())
                .expression_attribute_values(":pk", to_sdk(partition.value.clone()))
                .scan_index_forward(scan_forward)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(map_sdk_error)?;

            items.extend(output.items().iter().map(from_sdk_item));
            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }
        Ok(items)
    }

    async fn paginate_scan(
        &self,
        table: &str,
        filter: Option<&AttributeEquals>,
    ) -> AppResult<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key: Option<SdkItem> = None;
        loop {
            let mut request = self
                .client
                .scan()
                .table_name(table)
                .set_exclusive_start_key(start_key.take());
            if let Some(filter) = filter {
                request = request
                    .filter_expression("#f = :f")
                    .expression_attribute_names("#f", filter.name.as_str())
                    .expression_attribute_values(":f", to_sdk(filter.value.clone()));
            }

            let output = request.send().await.map_err(map_sdk_error)?;
            items.extend(output.items().iter().map(from_sdk_item));
            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }
        Ok(items)
    }
}

fn to_sdk(value: AttributeValue) -> SdkValue {
    match value {
        AttributeValue::S(s) => SdkValue::S(s),
        AttributeValue::N(n) => SdkValue::N(n),
        AttributeValue::Bool(b) => SdkValue::Bool(b),
        AttributeValue::Null(b) => SdkValue::Null(b),
        AttributeValue::L(values) => SdkValue::L(values.into_iter().map(to_sdk).collect()),
        AttributeValue::M(map) => SdkValue::M(to_sdk_item(map)),
        AttributeValue::Ss(values) => SdkValue::Ss(values),
        AttributeValue::Ns(values) => SdkValue::Ns(values),
    }
}

fn to_sdk_item(item: Item) -> SdkItem {
    item.into_iter().map(|(k, v)| (k, to_sdk(v))).collect()
}

/// 二进制类型不在本应用的数据里，读到时丢弃
fn from_sdk(value: &SdkValue) -> Option<AttributeValue> {
    Some(match value {
        SdkValue::S(s) => AttributeValue::S(s.clone()),
        SdkValue::N(n) => AttributeValue::N(n.clone()),
        SdkValue::Bool(b) => AttributeValue::Bool(*b),
        SdkValue::Null(b) => AttributeValue::Null(*b),
        SdkValue::L(values) => AttributeValue::L(values.iter().filter_map(from_sdk).collect()),
        SdkValue::M(map) => AttributeValue::M(from_sdk_item(map)),
        SdkValue::Ss(values) => AttributeValue::Ss(values.clone()),
        SdkValue::Ns(values) => AttributeValue::Ns(values.clone()),
        _ => return None,
    })
}

fn from_sdk_item(item: &SdkItem) -> Item {
    item.iter()
        .filter_map(|(k, v)| from_sdk(v).map(|v| (k.clone(), v)))
        .collect()
}

/// 服务端拒绝保留错误类型名，其余（连接、超时、响应解析）归为传输错误
fn map_sdk_error<E, R>(err: SdkError<E, R>) -> AppError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    if let Some(service) = err.as_service_error() {
        return AppError::Store {
            kind: service.code().unwrap_or("Unknown").to_string(),
            message: service.message().unwrap_or_default().to_string(),
        };
    }
    AppError::Transport(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl DocumentStore for DynamoStore {
    async fn get_item(&self, table: &str, key: Item) -> AppResult<Option<Item>> {
        with_api_logging("store.getItem", json!({ "table": table }), async {
            let output = self
                .client
                .get_item()
                .table_name(table)
                .set_key(Some(to_sdk_item(key)))
                .send()
                .await
                .map_err(map_sdk_error)?;
            Ok(output
                .item()
                .filter(|item| !item.is_empty())
                .map(from_sdk_item))
        })
        .await
    }

    async fn query(
        &self,
        table: &str,
        partition: AttributeEquals,
        scan_forward: bool,
    ) -> AppResult<Vec<Item>> {
        with_api_logging(
            "store.query",
            json!({ "table": table, "key": partition.name }),
            self.paginate_query(table, &partition, scan_forward),
        )
        .await
    }

    async fn scan(&self, table: &str, filter: Option<AttributeEquals>) -> AppResult<Vec<Item>> {
        with_api_logging(
            "store.scan",
            json!({ "table": table, "filter": filter.as_ref().map(|f| f.name.clone()) }),
            self.paginate_scan(table, filter.as_ref()),
        )
        .await
    }

    async fn put_item(&self, table: &str, item: Item, condition: PutCondition) -> AppResult<()> {
        let mut request = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(to_sdk_item(item)));
        if let PutCondition::KeyAbsent(attributes) = &condition {
            let mut clauses = Vec::with_capacity(attributes.len());
            for (i, name) in attributes.iter().enumerate() {
                request = request.expression_attribute_names(format!("#k{}", i), name.as_str());
                clauses.push(format!("attribute_not_exists(#k{})", i));
            }
            request = request.condition_expression(clauses.join(" AND "));
        }

        with_api_logging("store.putItem", json!({ "table": table }), async {
            match request.send().await {
                Ok(_) => Ok(()),
                Err(e)
                    if e.as_service_error()
                        .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
                {
                    Err(AppError::AlreadyExists)
                }
                Err(e) => Err(map_sdk_error(e)),
            }
        })
        .await
    }

    async fn update_item(
        &self,
        table: &str,
        key: Item,
        updates: Vec<(String, AttributeValue)>,
    ) -> AppResult<()> {
        let mut names = HashMap::new();
        let mut values = HashMap::new();
        let mut assignments = Vec::with_capacity(updates.len());
        for (i, (name, value)) in updates.into_iter().enumerate() {
            names.insert(format!("#u{}", i), name);
            values.insert(format!(":u{}", i), to_sdk(value));
            assignments.push(format!("#u{0} = :u{0}", i));
        }

        let mut key_names: Vec<&String> = key.keys().collect();
        key_names.sort();
        let existence: Vec<String> = key_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                names.insert(format!("#k{}", i), name.clone());
                format!("attribute_exists(#k{})", i)
            })
            .collect();

        let request = self
            .client
            .update_item()
            .table_name(table)
            .set_key(Some(to_sdk_item(key)))
            .update_expression(format!("SET {}", assignments.join(", ")))
            .condition_expression(existence.join(" AND "))
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(values));

        with_api_logging("store.updateItem", json!({ "table": table }), async {
            match request.send().await {
                Ok(_) => Ok(()),
                Err(e)
                    if e.as_service_error()
                        .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
                {
                    Err(AppError::NotFound)
                }
                Err(e) => Err(map_sdk_error(e)),
            }
        })
        .await
    }
}
