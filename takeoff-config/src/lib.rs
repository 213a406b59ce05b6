use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "TAKEOFF_CONFIG";

/// 未配置时的日志过滤串。
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// `takeoff` 的全部可调项：`[logging]` 与 `[calculator]` 两节，缺省的节或字段取内建值。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub calculator: CalculatorConfig,
}

impl AppConfig {
    /// 读取一份工程量计算配置（TOML）。文件不存在也视为错误，由调用方决定是否退回默认值。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 查找顺序：`TAKEOFF_CONFIG` 指向的文件，其次工作目录下的 `config/default.toml`，都没有时用内建值。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(PathBuf::from(path));
        }

        let current_dir = env::current_dir().map_err(|source| ConfigError::WorkingDir { source })?;
        Self::discover_in(&current_dir)
    }

    pub fn discover_in(root: &Path) -> Result<Self, ConfigError> {
        let default_path = root.join("config").join("default.toml");
        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 控制台日志过滤，写法同 `RUST_LOG`，例如 `warn,takeoff_engine=debug`。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// 计算参数。长度为图纸单位，高度与厚度为米。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub match_radius: f64,
    pub min_rectangle_side: f64,
    pub min_circle_radius: f64,
    pub slab_thickness: f64,
    pub default_column_height: f64,
    pub default_member_height: f64,
    pub void_warning_ratio: f64,
    pub position_bucket: f64,
    pub unmatched_sample_limit: usize,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            match_radius: 1000.0,
            min_rectangle_side: 10.0,
            min_circle_radius: 5.0,
            slab_thickness: 0.12,
            default_column_height: 4.0,
            default_member_height: 0.3,
            void_warning_ratio: 0.30,
            position_bucket: 100.0,
            unmatched_sample_limit: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("无法读取计算配置 {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("计算配置 {} 格式有误: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("无法确定工作目录，未能查找 config/default.toml: {source}")]
    WorkingDir {
        #[source]
        source: std::io::Error,
    },
}
