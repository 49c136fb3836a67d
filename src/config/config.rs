use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
    /// 请求超时（秒）
    pub request_timeout: u64,
    /// 最大请求体大小（字节）
    pub max_request_size: usize,
    /// 允许的跨域来源，`*` 表示任意
    pub allowed_origins: Vec<String>,
}

/// 存储后端类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// 托管后端（REST 记录存储 + 对象存储）
    #[default]
    Hosted,
    /// 进程内存储，仅用于开发和测试
    Memory,
}

/// 托管后端配置（认证、记录存储、对象存储）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BackendConfig {
    /// 后端类型
    pub kind: BackendKind,
    /// 项目地址，例如 https://xyz.supabase.co
    pub url: String,
    /// 匿名访问密钥（apikey 头）
    pub anon_key: String,
    /// 服务端密钥，记录存储和对象存储使用
    ///
    /// 服务层自行校验参与者，行级安全策略不适用于服务端访问。
    pub service_key: String,
    /// 访问令牌签名密钥（HS256）
    pub jwt_secret: String,
    /// 访问令牌受众
    pub jwt_audience: String,
    /// 请求超时（秒）
    pub request_timeout: u64,
}

impl BackendConfig {
    /// 数据访问使用的密钥：优先服务端密钥
    pub fn data_key(&self) -> &str {
        if self.service_key.is_empty() {
            &self.anon_key
        } else {
            &self.service_key
        }
    }
}

/// 对象存储桶配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// 头像存储桶
    pub avatar_bucket: String,
    /// 回忆图片存储桶
    pub memory_image_bucket: String,
}

/// LLM 配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI 兼容的 chat completions 地址
    pub api_url: String,
    /// API 密钥
    pub api_key: String,
    /// 模型名称
    pub model: String,
    /// 请求超时（秒）
    pub timeout: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化（JSON）日志格式
    pub structured: bool,
    /// 日志文件目录，未设置时只输出到标准输出
    pub log_dir: Option<PathBuf>,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 托管后端配置
    pub backend: BackendConfig,
    /// 对象存储配置
    pub storage: StorageConfig,
    /// LLM 配置
    pub llm: LlmConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8080,
                request_timeout: 30,
                max_request_size: 10 * 1024 * 1024,
                allowed_origins: vec!["*".into()],
            },
            backend: BackendConfig {
                kind: BackendKind::Memory,
                url: "http://localhost:54321".into(),
                anon_key: String::new(),
                service_key: String::new(),
                jwt_secret: "dev-secret-change-in-production-min-32-chars".into(),
                jwt_audience: "authenticated".into(),
                request_timeout: 15,
            },
            storage: StorageConfig {
                avatar_bucket: "avatars".into(),
                memory_image_bucket: "memory_images".into(),
            },
            llm: LlmConfig {
                api_url: "https://api.groq.com/openai/v1/chat/completions".into(),
                api_key: String::new(),
                model: "llama3-8b-8192".into(),
                timeout: 60,
            },
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            app_name: "kindred".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.backend.kind = BackendKind::Hosted;
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.server.allowed_origins = Vec::new();
        config
    }
}
