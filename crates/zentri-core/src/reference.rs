//! 参考目录
//!
//! 启动时写入的医院、科室和医生信息，会话期间只读

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZentriError};
use crate::models::ProviderTriple;

/// 医院信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hospital {
    pub id: u32,
    pub name: String,
    pub location: String,
    pub departments: Vec<String>,
}

/// 科室信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Department {
    pub id: u32,
    pub name: String,
    pub doctors: Vec<String>,
}

/// 参考目录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceCatalog {
    hospitals: Vec<Hospital>,
    departments: Vec<Department>,
}

impl ReferenceCatalog {
    pub fn new(hospitals: Vec<Hospital>, departments: Vec<Department>) -> Self {
        Self {
            hospitals,
            departments,
        }
    }

    /// 演示用的默认目录
    pub fn seeded() -> Self {
        let hospitals = vec![
            hospital(1, "SMS Hospital", "JLN Marg, Jaipur",
                &["Cardiology", "Orthopedics", "Pediatrics", "General Medicine"]),
            hospital(2, "Fortis Hospital", "Malviya Nagar, Jaipur",
                &["Neurology", "Oncology", "Cardiology", "Gastroenterology"]),
            hospital(3, "Manipal Hospital", "Sector 5, Vidhyadhar Nagar, Jaipur",
                &["Orthopedics", "Pediatrics", "ENT", "Dermatology"]),
            hospital(4, "Narayana Hospital", "Sector 28, Pratap Nagar, Jaipur",
                &["Cardiology", "Nephrology", "General Surgery", "Gynecology"]),
            hospital(5, "Apollo Hospital", "Tonk Road, Jaipur",
                &["Neurology", "Oncology", "Cardiology", "Pulmonology"]),
        ];

        let departments = vec![
            department(1, "Cardiology",
                &["Dr. Rajesh Sharma", "Dr. Priya Agarwal", "Dr. Amit Kumar"]),
            department(2, "Orthopedics",
                &["Dr. Suresh Gupta", "Dr. Neha Singh", "Dr. Ravi Verma"]),
            department(3, "Pediatrics",
                &["Dr. Sunita Jain", "Dr. Mahesh Chand", "Dr. Kavita Sharma"]),
            department(4, "General Medicine",
                &["Dr. Vikash Agarwal", "Dr. Pooja Mathur", "Dr. Sanjay Goyal"]),
            department(5, "Neurology",
                &["Dr. Ashok Meena", "Dr. Rekha Joshi", "Dr. Deepak Yadav"]),
        ];

        Self::new(hospitals, departments)
    }

    pub fn hospitals(&self) -> &[Hospital] {
        &self.hospitals
    }

    pub fn departments(&self) -> &[Department] {
        &self.departments
    }

    /// 按名称查找医院
    pub fn hospital(&self, name: &str) -> Option<&Hospital> {
        self.hospitals.iter().find(|h| h.name == name)
    }

    /// 按名称查找科室
    pub fn department(&self, name: &str) -> Option<&Department> {
        self.departments.iter().find(|d| d.name == name)
    }

    /// 科室下的医生列表，未知科室返回空
    pub fn doctors_for(&self, department: &str) -> &[String] {
        self.department(department)
            .map(|d| d.doctors.as_slice())
            .unwrap_or(&[])
    }

    /// 所有医生
    pub fn all_doctors(&self) -> Vec<&str> {
        self.departments
            .iter()
            .flat_map(|d| d.doctors.iter().map(String::as_str))
            .collect()
    }

    /// 校验三元组是否存在于目录中
    pub fn validate_triple(&self, provider: &ProviderTriple) -> Result<()> {
        let hospital = self.hospital(&provider.hospital).ok_or_else(|| {
            ZentriError::Validation(format!("unknown hospital '{}'", provider.hospital))
        })?;

        if !hospital.departments.iter().any(|d| *d == provider.department) {
            return Err(ZentriError::Validation(format!(
                "{} has no {} department",
                hospital.name, provider.department
            )));
        }

        if !self
            .doctors_for(&provider.department)
            .iter()
            .any(|d| *d == provider.doctor)
        {
            return Err(ZentriError::Validation(format!(
                "{} is not listed in {}",
                provider.doctor, provider.department
            )));
        }

        Ok(())
    }
}

impl Default for ReferenceCatalog {
    fn default() -> Self {
        Self::seeded()
    }
}

fn hospital(id: u32, name: &str, location: &str, departments: &[&str]) -> Hospital {
    Hospital {
        id,
        name: name.to_string(),
        location: location.to_string(),
        departments: departments.iter().map(|d| d.to_string()).collect(),
    }
}

fn department(id: u32, name: &str, doctors: &[&str]) -> Department {
    Department {
        id,
        name: name.to_string(),
        doctors: doctors.iter().map(|d| d.to_string()).collect(),
    }
}
