//! 通用工具函数

use uuid::Uuid;

use crate::error::{Result, ZentriError};

/// 候诊号前缀
pub const TOKEN_PREFIX: char = 'Q';

/// 生成候诊号，序号补零至三位（`Q001`）
pub fn format_token(sequence: u32) -> String {
    format!("{}{:03}", TOKEN_PREFIX, sequence)
}

/// 解析候诊号中的序号
pub fn token_sequence(token: &str) -> Option<u32> {
    let digits = token.strip_prefix(TOKEN_PREFIX)?;
    if digits.len() < 3 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// 生成新的患者标识
pub fn generate_patient_id() -> Uuid {
    Uuid::new_v4()
}

/// 解析路由参数中的患者标识
///
/// 格式错误的标识按“未找到”处理。
pub fn parse_patient_id(param: &str) -> Result<Uuid> {
    Uuid::parse_str(param.trim())
        .map_err(|_| ZentriError::NotFound(format!("Patient {} not found", param)))
}
