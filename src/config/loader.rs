use crate::config::config::{AppConfig, BackendKind};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "KINDRED_CONFIG";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 合并顺序（后者覆盖前者）：
    /// 1. 开发环境默认值
    /// 2. `KINDRED_CONFIG` 指定的文件，否则 ./config.toml
    /// 3. `KINDRED_` 前缀的环境变量，层级用 `__` 分隔
    pub fn load() -> Result<AppConfig, figment::Error> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path());
        Self::load_from(path)
    }

    /// 从指定路径加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::development()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("KINDRED_").split("__"))
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        if config.backend.kind == BackendKind::Hosted && config.backend.url.is_empty() {
            return Err(ConfigValidationError::MissingBackendUrl);
        }

        if config.backend.kind == BackendKind::Hosted && config.backend.service_key.is_empty() {
            return Err(ConfigValidationError::MissingServiceKey);
        }

        if config.backend.jwt_secret.is_empty() {
            return Err(ConfigValidationError::MissingJwtSecret);
        }

        if config.llm.model.is_empty() {
            return Err(ConfigValidationError::MissingModel);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("服务端口无效，必须大于 0")]
    InvalidPort,

    #[error("托管后端地址未配置")]
    MissingBackendUrl,

    #[error("托管后端服务端密钥未配置")]
    MissingServiceKey,

    #[error("访问令牌签名密钥未配置")]
    MissingJwtSecret,

    #[error("LLM 模型未配置")]
    MissingModel,
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ConfigLoader::load_from("/nonexistent/kindred.toml").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.model, "llama3-8b-8192");
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_toml_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "kindred.toml",
                r#"
                [server]
                port = 9090

                [backend]
                kind = "hosted"
                url = "https://example.supabase.co"
                "#,
            )?;
            jail.set_env("KINDRED_LLM__MODEL", "llama3-70b");

            let config = ConfigLoader::load_from("kindred.toml")?;
            assert_eq!(config.server.port, 9090);
            assert_eq!(config.backend.kind, BackendKind::Hosted);
            assert_eq!(config.backend.url, "https://example.supabase.co");
            assert_eq!(config.llm.model, "llama3-70b");
            // untouched sections keep their defaults
            assert_eq!(config.storage.avatar_bucket, "avatars");
            Ok(())
        });
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let mut config = AppConfig::development();
        config.server.port = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidPort)
        ));

        let mut config = AppConfig::production();
        config.backend.url.clear();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::MissingBackendUrl)
        ));

        let mut config = AppConfig::production();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::MissingServiceKey)
        ));
        config.backend.service_key = "service-role".into();
        assert!(ConfigLoader::validate(&config).is_ok());

        let mut config = AppConfig::development();
        config.llm.model.clear();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::MissingModel)
        ));
    }
}
