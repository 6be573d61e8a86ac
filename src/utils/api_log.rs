use std::collections::HashMap;
use std::future::Future;
use std::sync::{LazyLock, Mutex};
use std::time::Instant;

use serde_json::Value;

use crate::error::AppResult;

static CALL_COUNTERS: LazyLock<Mutex<HashMap<&'static str, u64>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// 为每个外部调用分配 `name#n` 形式的编号
pub fn next_call_id(name: &'static str) -> String {
    let count = match CALL_COUNTERS.lock() {
        Ok(mut counters) => {
            let count = counters.entry(name).or_insert(0);
            *count += 1;
            *count
        }
        Err(_) => 0,
    };
    format!("{}#{}", name, count)
}

/// 包裹一次外部调用：记录开始、结果和耗时，错误原样返回
pub async fn with_api_logging<T, F>(name: &'static str, details: Value, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    let id = next_call_id(name);
    let start = Instant::now();
    tracing::info!(call = %id, details = %details, "[API] start");

    let result = fut.await;
    let duration_ms = start.elapsed().as_millis();

    match &result {
        Ok(_) => tracing::info!(call = %id, duration_ms, "[API] ok"),
        Err(e) => tracing::warn!(call = %id, duration_ms, error = %e, "[API] error"),
    }

    result
}
