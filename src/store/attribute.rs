use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 一条记录：属性名到属性值
pub type Item = HashMap<String, AttributeValue>;

/// 文档存储的属性值，序列化形式与 DynamoDB JSON 协议一致，例如 `{"S": "abc"}`、`{"N": "42"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "S")]
    S(String),
    #[serde(rename = "N")]
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    #[serde(rename = "L")]
    L(Vec<AttributeValue>),
    #[serde(rename = "M")]
    M(HashMap<String, AttributeValue>),
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    #[serde(rename = "NS")]
    Ns(Vec<String>),
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        AttributeValue::S(value.into())
    }

    pub fn number(value: i64) -> Self {
        AttributeValue::N(value.to_string())
    }

    pub fn string_list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttributeValue::L(values.into_iter().map(|v| AttributeValue::S(v.into())).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    /// 数字属性转为整数；带小数的数字向零取整
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::N(n) => n
                .parse::<i64>()
                .ok()
                .or_else(|| n.parse::<f64>().ok().map(|f| f.trunc() as i64)),
            _ => None,
        }
    }

    /// 渲染成字符串：字符串取原值，数字取其文本
    fn scalar_text(&self) -> Option<String> {
        match self {
            AttributeValue::S(s) | AttributeValue::N(s) => Some(s.clone()),
            AttributeValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// 排序键比较：数字按数值，其它按文本
    pub fn compare(&self, other: &AttributeValue) -> Ordering {
        match (self, other) {
            (AttributeValue::N(a), AttributeValue::N(b)) => {
                let a = a.parse::<f64>().unwrap_or(f64::NAN);
                let b = b.parse::<f64>().unwrap_or(f64::NAN);
                a.total_cmp(&b)
            }
            _ => self.scalar_text().cmp(&other.scalar_text()),
        }
    }
}

/// 读取字符串属性，缺失或类型不符时返回空串；数字按文本返回
pub fn item_string(item: &Item, name: &str) -> String {
    item.get(name)
        .and_then(AttributeValue::scalar_text)
        .unwrap_or_default()
}

pub fn item_opt_string(item: &Item, name: &str) -> Option<String> {
    item.get(name).and_then(AttributeValue::scalar_text)
}

/// 读取数字属性，缺失时返回 0；字符串形式的数字也接受
pub fn item_i64(item: &Item, name: &str) -> i64 {
    item_opt_i64(item, name).unwrap_or(0)
}

pub fn item_opt_i64(item: &Item, name: &str) -> Option<i64> {
    match item.get(name)? {
        AttributeValue::S(s) => s.trim().parse().ok(),
        other => other.as_i64(),
    }
}

/// 读取字符串列表，非列表时返回空列表
pub fn item_string_list(item: &Item, name: &str) -> Vec<String> {
    match item.get(name) {
        Some(AttributeValue::L(values)) => {
            values.iter().filter_map(AttributeValue::scalar_text).collect()
        }
        Some(AttributeValue::Ss(values)) => values.clone(),
        _ => Vec::new(),
    }
}
