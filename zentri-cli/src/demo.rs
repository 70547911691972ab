//! 排队流程演示
//!
//! 扫码挂号 → 查看候诊位置 → 医生叫号 → 结束就诊

use anyhow::{anyhow, Result};
use chrono::{Duration, Local, NaiveTime};
use std::sync::Arc;
use uuid::Uuid;
use zentri_core::Gender;
use zentri_queue::{
    queue_status, ConsultationConsole, ConsultationNote, DispatchOutcome, QrScanner, QueueStore,
    RegistrationWizard, ScanSession,
};

use crate::shell::describe_status;

/// 运行演示
pub async fn run(
    store: QueueStore,
    console: ConsultationConsole,
    scanner: Arc<dyn QrScanner>,
) -> Result<()> {
    walkthrough(store, console, scanner).await.map(|_| ())
}

/// 演示主体，返回最终的仓库和挂号的患者
async fn walkthrough(
    mut store: QueueStore,
    mut console: ConsultationConsole,
    scanner: Arc<dyn QrScanner>,
) -> Result<(QueueStore, Vec<Uuid>)> {
    println!("🏥 Zentri 门诊排队演示\n");

    // 1. 扫描医院二维码
    println!("📷 正在扫描医院二维码...");
    let payload = ScanSession::start(scanner).finish().await?;
    println!("✅ 识别成功: {} / {} ({})", payload.hospital, payload.department, payload.location);

    // 挂号科室以扫码结果为准，诊室不在该科室时切换到科室的第一位医生
    let doctors = store.catalog().doctors_for(&payload.department);
    if console.department() != payload.department || !doctors.iter().any(|d| d == console.doctor()) {
        let doctor = doctors
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("{} 没有可预约的医生", payload.department))?;
        println!("🔀 诊室切换到 {} / {}", payload.department, doctor);
        console.select(payload.department.clone(), doctor);
    }

    // 2. 两位患者挂号同一位医生
    let tomorrow = Local::now().date_naive() + Duration::days(1);
    let mut ids = Vec::new();
    for (name, age, gender) in [("Asha Verma", 34, Gender::Female), ("Rohit Jain", 58, Gender::Male)] {
        let mut wizard = RegistrationWizard::from_scan(&payload);
        let draft = wizard.draft_mut();
        draft.name = name.to_string();
        draft.age = Some(age);
        draft.gender = Some(gender);
        draft.contact = "9829000000".to_string();
        draft.id_number = format!("DEMO-{}", ids.len() + 1);
        draft.doctor = console.doctor().to_string();
        draft.appointment_date = Some(tomorrow);
        draft.appointment_time = NaiveTime::from_hms_opt(10, 0, 0);

        let id = wizard.submit(&mut store)?;
        let token = token_of(&store, id)?;
        println!("📋 {} 挂号成功，候诊号 {}", name, token);
        ids.push(id);
    }

    print_queue(&store, &ids)?;

    // 3. 医生叫号
    let (first, second) = (ids[0], ids[1]);
    println!("\n👨‍⚕️ {} 叫号 {}", console.doctor(), token_of(&store, first)?);
    ensure_applied(console.grant_access(&mut store, first), "叫号")?;
    print_queue(&store, &ids)?;

    // 4. 下一位，自动结束上一位
    println!("\n👨‍⚕️ {} 叫号 {}", console.doctor(), token_of(&store, second)?);
    ensure_applied(console.grant_access(&mut store, second), "叫号")?;
    print_queue(&store, &ids)?;

    // 5. 结束就诊并保存病历
    let note = ConsultationNote {
        diagnosis: "Mild hypertension".to_string(),
        notes: "Review after two weeks".to_string(),
        prescription: "Amlodipine 5mg".to_string(),
        rating: Some(5),
    };
    ensure_applied(console.complete_with_record(&mut store, second, note)?, "结束就诊")?;
    println!("\n✅ 就诊结束");
    print_queue(&store, &ids)?;

    let stats = console.view(&store).stats();
    println!("\n📊 诊室概览:");
    println!("   候诊: {}", stats.waiting);
    println!("   就诊中: {}", stats.in_progress);
    println!("   已完成: {}", stats.completed);
    println!("   预计总等待: {} 分钟", stats.estimated_total_wait_minutes);

    Ok((store, ids))
}

fn ensure_applied(outcome: DispatchOutcome, step: &str) -> Result<()> {
    match outcome {
        DispatchOutcome::Applied => Ok(()),
        DispatchOutcome::Ignored(reason) => Err(anyhow!("{}未生效: {}", step, reason)),
    }
}

fn token_of(store: &QueueStore, id: Uuid) -> Result<String> {
    store
        .patient(id)
        .map(|p| p.token_number.clone())
        .ok_or_else(|| anyhow!("patient {} not found", id))
}

fn print_queue(store: &QueueStore, ids: &[Uuid]) -> Result<()> {
    for id in ids {
        println!("   {}", describe_status(&queue_status(store, *id)?));
    }
    Ok(())
}
