//! 配置管理
//!
//! 默认值 → 配置文件（可选） → `ZENTRI__*` 环境变量，依次覆盖

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};
use zentri_core::ReferenceCatalog;

/// 系统完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ZentriConfig {
    /// 扫码配置
    pub scanner: ScannerConfig,
    /// 诊室控制台配置
    pub console: ConsoleConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 扫码配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScannerConfig {
    /// 模拟扫码等待时间（毫秒）
    pub delay_ms: u64,
}

impl ScannerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self { delay_ms: 2000 }
    }
}

/// 诊室控制台默认选择
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsoleConfig {
    pub department: String,
    pub doctor: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            department: "Cardiology".to_string(),
            doctor: "Dr. Rajesh Sharma".to_string(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// 日志级别过滤
    pub level: String,
    /// 输出JSON格式
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// 加载配置
pub fn load_config(path: Option<&str>) -> Result<ZentriConfig> {
    let mut builder = Config::builder()
        .add_source(Config::try_from(&ZentriConfig::default()).context("Failed to build default configuration")?);

    if let Some(path) = path {
        builder = builder.add_source(File::with_name(path));
    }

    let settings = builder
        .add_source(Environment::with_prefix("ZENTRI").separator("__"))
        .build()
        .context("Failed to load configuration")?;

    let config: ZentriConfig = settings
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// 输出当前生效的配置
pub fn render_config(config: &ZentriConfig) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize configuration")
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&ZentriConfig) -> Result<()>,
}

impl ConfigValidator {
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "scanner.delay_ms",
                validator: |config| {
                    if config.scanner.delay_ms > 60_000 {
                        Err(anyhow::anyhow!("Scanner delay cannot exceed 60000 ms"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "logging.level",
                validator: |config| {
                    if config.logging.level.trim().is_empty() {
                        Err(anyhow::anyhow!("Log level cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "console",
                validator: |config| {
                    let catalog = ReferenceCatalog::seeded();
                    let listed = catalog
                        .doctors_for(&config.console.department)
                        .iter()
                        .any(|d| *d == config.console.doctor);
                    if listed {
                        Ok(())
                    } else {
                        Err(anyhow::anyhow!(
                            "{} is not listed in {}",
                            config.console.doctor,
                            config.console.department
                        ))
                    }
                },
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &ZentriConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("Invalid {}: {}", rule.field_path, e));
            }
        }

        info!("Configuration validation passed");
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = ZentriConfig::default();
        assert!(ConfigValidator::new().validate(&config).is_ok());
        assert_eq!(config.scanner.delay(), Duration::from_millis(2000));
    }

    #[test]
    fn test_zero_delay_accepted() {
        let mut config = ZentriConfig::default();
        config.scanner.delay_ms = 0;
        assert!(ConfigValidator::new().validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ZentriConfig::default();
        config.logging.level = "  ".to_string();
        assert!(ConfigValidator::new().validate(&config).is_err());

        let mut config = ZentriConfig::default();
        config.console.doctor = "Dr. Neha Singh".to_string();
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("zentri-config-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[scanner]\ndelay_ms = 250\n\n[console]\ndepartment = \"Neurology\"\ndoctor = \"Dr. Rekha Joshi\"").unwrap();

        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.scanner.delay_ms, 250);
        assert_eq!(config.console.doctor, "Dr. Rekha Joshi");
        assert_eq!(config.logging, LoggingConfig::default());

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_render_round_trips() {
        let rendered = render_config(&ZentriConfig::default()).unwrap();
        assert!(rendered.contains("delay_ms = 2000"));
        let parsed: ZentriConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, ZentriConfig::default());
    }
}
