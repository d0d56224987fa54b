//! 可观测性配置（日志）

use serde::{Deserialize, Serialize};

/// 可观测性配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ObservabilityConfig {
    /// 过滤级别
    ///
    /// 支持 EnvFilter 语法（如 "info,sqlx=warn"）。默认值 "info"。
    /// 设置了 RUST_LOG 时以 RUST_LOG 为准。
    #[serde(default = "default_filter_level")]
    pub filter_level: String,

    #[serde(default)]
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// 日志输出目标
    ///
    /// - "console": 仅输出到控制台（默认）
    /// - "file": 输出到文件
    #[serde(default = "default_log_output")]
    pub output: String,

    /// 日志轮转开关
    ///
    /// 当 output = "file" 时有效：
    /// - true: 按天轮转日志文件
    /// - false: 追加到单个文件
    #[serde(default)]
    pub rotate: bool,

    /// 日志文件目录，当 output = "file" 时有效
    #[serde(default = "default_log_path")]
    pub path: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter_level: default_filter_level(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: default_log_output(),
            rotate: false,
            path: default_log_path(),
        }
    }
}

impl ObservabilityConfig {
    /// 获取过滤级别，优先使用 RUST_LOG
    pub fn effective_filter_level(&self) -> String {
        std::env::var("RUST_LOG")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.filter_level.clone())
    }

    /// 检查是否使用控制台日志输出
    pub fn is_console_logging(&self) -> bool {
        self.log.output == "console"
    }

    /// 检查是否应该轮转日志
    pub fn should_rotate_logs(&self) -> bool {
        self.log.output == "file" && self.log.rotate
    }
}

fn default_filter_level() -> String {
    "info".to_string()
}

fn default_log_output() -> String {
    "console".to_string()
}

fn default_log_path() -> String {
    "logs/".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_observability_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.filter_level, "info");
        assert!(config.is_console_logging());
        assert!(!config.should_rotate_logs());
        assert_eq!(config.log.path, "logs/");
    }

    #[test]
    fn test_rotation_requires_file_output() {
        let mut config = ObservabilityConfig::default();
        config.log.rotate = true;
        assert!(!config.should_rotate_logs());

        config.log.output = "file".to_string();
        assert!(config.should_rotate_logs());
    }

    #[test]
    #[serial]
    fn test_rust_log_overrides_filter_level() {
        let config = ObservabilityConfig {
            filter_level: "warn".to_string(),
            log: LogConfig::default(),
        };

        // SAFETY: 串行执行，无其他线程读写环境变量
        unsafe { std::env::set_var("RUST_LOG", "debug,sqlx=warn") };
        assert_eq!(config.effective_filter_level(), "debug,sqlx=warn");

        unsafe { std::env::set_var("RUST_LOG", "  ") };
        assert_eq!(config.effective_filter_level(), "warn");

        unsafe { std::env::remove_var("RUST_LOG") };
        assert_eq!(config.effective_filter_level(), "warn");
    }
}
