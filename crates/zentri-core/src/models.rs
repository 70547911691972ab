//! 核心数据模型定义

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ZentriError;

/// 患者就诊状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PatientStatus {
    Waiting,    // 候诊中
    InProgress, // 就诊中
    Completed,  // 已完成
}

impl PatientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Waiting => "waiting",
            PatientStatus::InProgress => "in-progress",
            PatientStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatientStatus {
    type Err = ZentriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "waiting" => Ok(PatientStatus::Waiting),
            "in-progress" | "in_progress" => Ok(PatientStatus::InProgress),
            "completed" => Ok(PatientStatus::Completed),
            other => Err(ZentriError::Validation(format!("unknown status '{}'", other))),
        }
    }
}

/// 性别枚举
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("male"),
            Gender::Female => f.write_str("female"),
            Gender::Other => f.write_str("other"),
        }
    }
}

impl FromStr for Gender {
    type Err = ZentriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" | "o" => Ok(Gender::Other),
            other => Err(ZentriError::Validation(format!("unknown gender '{}'", other))),
        }
    }
}

/// 医院、科室、医生三元组，确定一条独立的候诊队列
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ProviderTriple {
    pub hospital: String,
    pub department: String,
    pub doctor: String,
}

impl ProviderTriple {
    pub fn new(
        hospital: impl Into<String>,
        department: impl Into<String>,
        doctor: impl Into<String>,
    ) -> Self {
        Self {
            hospital: hospital.into(),
            department: department.into(),
            doctor: doctor.into(),
        }
    }
}

impl fmt::Display for ProviderTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.hospital, self.department, self.doctor)
    }
}

/// 挂号提交的患者信息（尚未分配号码）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientIntake {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub contact: String,
    pub id_number: String,
    pub provider: ProviderTriple,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
}

/// 患者挂号记录
///
/// 除 `status` 外所有字段在创建后不再变化。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRecord {
    pub id: Uuid,
    pub token_number: String,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub contact: String,
    pub id_number: String,
    pub hospital: String,
    pub department: String,
    pub doctor: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: PatientStatus,
    pub registration_time: DateTime<Utc>,
}

impl PatientRecord {
    /// 根据挂号信息创建候诊记录
    pub fn from_intake(
        id: Uuid,
        intake: PatientIntake,
        token_number: String,
        registration_time: DateTime<Utc>,
    ) -> Self {
        let PatientIntake {
            name,
            age,
            gender,
            contact,
            id_number,
            provider,
            appointment_date,
            appointment_time,
        } = intake;

        Self {
            id,
            token_number,
            name,
            age,
            gender,
            contact,
            id_number,
            hospital: provider.hospital,
            department: provider.department,
            doctor: provider.doctor,
            appointment_date,
            appointment_time,
            status: PatientStatus::Waiting,
            registration_time,
        }
    }

    /// 获取所属队列三元组
    pub fn provider(&self) -> ProviderTriple {
        ProviderTriple::new(&self.hospital, &self.department, &self.doctor)
    }

    /// 是否属于指定队列
    pub fn is_in_queue(&self, provider: &ProviderTriple) -> bool {
        self.hospital == provider.hospital
            && self.department == provider.department
            && self.doctor == provider.doctor
    }

    /// 是否由指定科室的指定医生接诊（不区分医院）
    pub fn is_seen_by(&self, department: &str, doctor: &str) -> bool {
        self.department == department && self.doctor == doctor
    }
}

/// 诊疗记录，完成就诊时由医生填写
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsultationRecord {
    pub patient_id: Uuid,
    pub diagnosis: String,
    pub notes: String,
    pub prescription: String,
    pub rating: Option<u8>,
    pub recorded_at: DateTime<Utc>,
}
