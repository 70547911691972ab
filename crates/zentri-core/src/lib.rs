//! # Zentri Core
//!
//! 门诊排队系统的核心模块，提供基础数据结构、错误定义、参考目录和通用工具。

pub mod error;
pub mod models;
pub mod reference;
pub mod utils;

pub use error::{Result, ZentriError};
pub use models::*;
pub use reference::{Department, Hospital, ReferenceCatalog};
