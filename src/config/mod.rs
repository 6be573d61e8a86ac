use std::env;

use crate::error::AppError;

const DEFAULT_REGION: &str = "us-east-2";
const DEFAULT_USERS_TABLE: &str = "ProjectCaesar_Users";
const DEFAULT_FOLLOWING_TABLE: &str = "ProjectCaesar_Following";
const DEFAULT_CHECKINS_TABLE: &str = "ProjectCaesar_Check-Ins";
const DEFAULT_PLACES_ENDPOINT: &str = "https://places.googleapis.com/v1/places:searchNearby";

/// 存储后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub enum StoreBackend {
    DynamoDb,
    Memory,
}

/// 三张表的名称
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Tables {
    pub users: String,
    pub following: String,
    pub check_ins: String,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            users: DEFAULT_USERS_TABLE.to_string(),
            following: DEFAULT_FOLLOWING_TABLE.to_string(),
            check_ins: DEFAULT_CHECKINS_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub store_endpoint: Option<String>,
    pub store_backend: StoreBackend,
    pub tables: Tables,
    pub places_api_key: Option<String>,
    pub places_endpoint: String,
    pub redis_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub max_search_radius: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源构建配置，空字符串视为未设置
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store_backend = match get("STORE_BACKEND").as_deref() {
            None | Some("dynamodb") => StoreBackend::DynamoDb,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "Unknown STORE_BACKEND '{}', expected 'dynamodb' or 'memory'",
                    other
                )));
            }
        };

        let defaults = Tables::default();
        Ok(Config {
            region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            access_key_id: get("AWS_ACCESS_KEY_ID"),
            secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
            session_token: get("AWS_SESSION_TOKEN"),
            store_endpoint: get("DDB_ENDPOINT"),
            store_backend,
            tables: Tables {
                users: get("DDB_USERS_TABLE").unwrap_or(defaults.users),
                following: get("DDB_FOLLOWING_TABLE").unwrap_or(defaults.following),
                check_ins: get("DDB_CHECKINS_TABLE").unwrap_or(defaults.check_ins),
            },
            places_api_key: get("GOOGLE_PLACES_API_KEY"),
            places_endpoint: get("PLACES_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_PLACES_ENDPOINT.to_string()),
            redis_url: get("REDIS_URL"),
            server_host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: get("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            max_search_radius: get("MAX_SEARCH_RADIUS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000.0),
        })
    }

    /// 存储服务地址，未配置时按区域拼接
    pub fn store_endpoint(&self) -> String {
        self.store_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://dynamodb.{}.amazonaws.com", self.region))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.region, "us-east-2");
        assert_eq!(config.tables.users, "ProjectCaesar_Users");
        assert_eq!(config.tables.following, "ProjectCaesar_Following");
        assert_eq!(config.tables.check_ins, "ProjectCaesar_Check-Ins");
        assert_eq!(config.store_backend, StoreBackend::DynamoDb);
        assert!(config.places_api_key.is_none());
        assert_eq!(config.server_port, 3000);
        assert_eq!(
            config.store_endpoint(),
            "https://dynamodb.us-east-2.amazonaws.com"
        );
    }

    #[test]
    fn overrides_and_blank_values() {
        let config = config_from(&[
            ("AWS_REGION", "eu-west-1"),
            ("DDB_CHECKINS_TABLE", "CheckIns"),
            ("GOOGLE_PLACES_API_KEY", "   "),
            ("STORE_BACKEND", "memory"),
            ("SERVER_PORT", "not-a-port"),
            ("DDB_ENDPOINT", "http://localhost:8000"),
        ])
        .unwrap();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.tables.check_ins, "CheckIns");
        assert!(config.places_api_key.is_none());
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.store_endpoint(), "http://localhost:8000");
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let err = config_from(&[("STORE_BACKEND", "postgres")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
