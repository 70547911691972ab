//! 交互式终端
//!
//! 每行一条命令，所有命令作用于同一个内存会话

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use zentri_core::utils::parse_patient_id;
use zentri_core::{Gender, PatientRecord};
use zentri_queue::{
    queue_status_by_param, ConsultationConsole, DispatchOutcome, QrScanner, QueueStanding,
    QueueStatus, QueueStore, RegistrationWizard, ScanPayload, ScanSession,
};

pub const HELP: &str = "\
commands:
  catalog                                   list hospitals, departments and doctors
  scan                                      scan the hospital QR code
  register name|age|gender|contact|id|hospital|department|doctor|YYYY-MM-DD|HH:MM
                                            hospital/department may be left empty after a scan
  queue <patient-id>                        show queue position and estimated wait
  console <department>|<doctor>             switch the doctor console
  grant <patient-id>                        call a patient into consultation
  complete <patient-id>                     finish a consultation
  list                                      show the current console
  help                                      show this help
  quit                                      leave the shell";

/// 命令执行结果
#[derive(Debug, PartialEq)]
pub enum Reply {
    Output(String),
    Quit,
}

/// 终端会话
pub struct Session {
    store: QueueStore,
    console: ConsultationConsole,
    scanner: Arc<dyn QrScanner>,
    last_scan: Option<ScanPayload>,
}

impl Session {
    pub fn new(store: QueueStore, console: ConsultationConsole, scanner: Arc<dyn QrScanner>) -> Self {
        Self {
            store,
            console,
            scanner,
            last_scan: None,
        }
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    /// 执行一行命令
    pub async fn execute(&mut self, line: &str) -> Result<Reply> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        let output = match command {
            "" => String::new(),
            "help" => HELP.to_string(),
            "quit" | "exit" => return Ok(Reply::Quit),
            "catalog" => self.catalog(),
            "scan" => self.scan().await?,
            "register" => self.register(rest)?,
            "queue" => self.queue(rest)?,
            "console" => self.switch_console(rest)?,
            "grant" => {
                let id = parse_patient_id(rest)?;
                describe_outcome(self.console.grant_access(&mut self.store, id), "consultation started")
            }
            "complete" => {
                let id = parse_patient_id(rest)?;
                describe_outcome(
                    self.console.complete_consultation(&mut self.store, id),
                    "consultation completed",
                )
            }
            "list" => self.list(),
            other => return Err(anyhow!("unknown command '{}', try 'help'", other)),
        };

        Ok(Reply::Output(output))
    }

    fn catalog(&self) -> String {
        let catalog = self.store.catalog();
        let mut out = String::new();
        for hospital in catalog.hospitals() {
            let _ = writeln!(out, "{} ({})", hospital.name, hospital.location);
            for department in &hospital.departments {
                let doctors = catalog.doctors_for(department);
                if doctors.is_empty() {
                    let _ = writeln!(out, "  {}", department);
                } else {
                    let _ = writeln!(out, "  {}: {}", department, doctors.join(", "));
                }
            }
        }
        out
    }

    async fn scan(&mut self) -> Result<String> {
        let payload = ScanSession::start(self.scanner.clone()).finish().await?;
        let out = format!(
            "QR code detected: {} / {} ({})",
            payload.hospital, payload.department, payload.location
        );
        self.last_scan = Some(payload);
        Ok(out)
    }

    fn register(&mut self, args: &str) -> Result<String> {
        let fields: Vec<&str> = args.split('|').map(str::trim).collect();
        if fields.len() != 10 {
            return Err(anyhow!(
                "register expects 10 fields separated by '|', got {}",
                fields.len()
            ));
        }

        let mut wizard = match &self.last_scan {
            Some(payload) => RegistrationWizard::from_scan(payload),
            None => RegistrationWizard::new(),
        };

        {
            let draft = wizard.draft_mut();
            draft.name = fields[0].to_string();
            draft.age = parse_optional(fields[1], |s| s.parse::<u32>().context("age must be a whole number"))?;
            draft.gender = parse_optional(fields[2], |s| Ok(s.parse::<Gender>()?))?;
            draft.contact = fields[3].to_string();
            draft.id_number = fields[4].to_string();
        }
        wizard.next()?;

        {
            let draft = wizard.draft_mut();
            if !fields[5].is_empty() {
                draft.hospital = fields[5].to_string();
            }
            if !fields[6].is_empty() {
                draft.department = fields[6].to_string();
            }
            draft.doctor = fields[7].to_string();
        }
        wizard.next()?;

        {
            let draft = wizard.draft_mut();
            draft.appointment_date = parse_optional(fields[8], |s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").context("date must be YYYY-MM-DD")
            })?;
            draft.appointment_time = parse_optional(fields[9], |s| {
                NaiveTime::parse_from_str(s, "%H:%M").context("time must be HH:MM")
            })?;
        }
        wizard.next()?;

        let id = wizard.submit(&mut self.store)?;
        self.last_scan = None;

        let patient = self
            .store
            .patient(id)
            .ok_or_else(|| anyhow!("patient {} missing after registration", id))?;
        Ok(format!("registered {} with token {}", patient.id, patient.token_number))
    }

    fn queue(&self, param: &str) -> Result<String> {
        let status = queue_status_by_param(&self.store, param)?;
        Ok(describe_status(&status))
    }

    fn switch_console(&mut self, args: &str) -> Result<String> {
        let (department, doctor) = args
            .split_once('|')
            .map(|(d, doc)| (d.trim(), doc.trim()))
            .ok_or_else(|| anyhow!("usage: console <department>|<doctor>"))?;

        if !self
            .store
            .catalog()
            .doctors_for(department)
            .iter()
            .any(|d| d == doctor)
        {
            return Err(anyhow!("{} is not listed in {}", doctor, department));
        }

        self.console.select(department, doctor);
        Ok(self.list())
    }

    fn list(&self) -> String {
        let view = self.console.view(&self.store);
        let stats = view.stats();
        let mut out = String::new();

        let _ = writeln!(out, "{} / {}", view.department, view.doctor);
        let _ = writeln!(
            out,
            "waiting {} | in consultation {} | completed {} | est. wait {} min",
            stats.waiting, stats.in_progress, stats.completed, stats.estimated_total_wait_minutes
        );
        for patient in &view.in_progress {
            let _ = writeln!(out, "now: {}", describe_patient(patient));
        }
        for (index, patient) in view.waiting.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", index + 1, describe_patient(patient));
        }
        for patient in &view.completed {
            let _ = writeln!(out, "  done: {}", describe_patient(patient));
        }
        out
    }
}

fn parse_optional<T>(raw: &str, parse: impl FnOnce(&str) -> Result<T>) -> Result<Option<T>> {
    if raw.is_empty() {
        Ok(None)
    } else {
        parse(raw).map(Some)
    }
}

fn describe_patient(patient: &PatientRecord) -> String {
    format!(
        "{} {} ({}, {}) {}",
        patient.token_number, patient.name, patient.age, patient.gender, patient.id
    )
}

pub fn describe_status(status: &QueueStatus) -> String {
    match status.standing {
        QueueStanding::Waiting {
            position,
            waiting_total,
            estimated_wait_minutes,
        } => {
            let mut out = format!(
                "{}: waiting, position {} of {}, estimated wait {} min",
                status.token_number, position, waiting_total, estimated_wait_minutes
            );
            if status.is_near_front() {
                out.push_str(" (you're up soon)");
            }
            out
        }
        QueueStanding::InConsultation => format!("{}: in consultation", status.token_number),
        QueueStanding::Completed => format!("{}: consultation completed", status.token_number),
    }
}

fn describe_outcome(outcome: DispatchOutcome, applied: &str) -> String {
    match outcome {
        DispatchOutcome::Applied => applied.to_string(),
        DispatchOutcome::Ignored(reason) => format!("no change: {}", reason),
    }
}

/// 从标准输入读取命令直到结束
pub async fn run(mut session: Session) -> Result<()> {
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        match session.execute(&line).await {
            Ok(Reply::Quit) => break,
            Ok(Reply::Output(output)) if output.is_empty() => {}
            Ok(Reply::Output(output)) => println!("{}", output.trim_end()),
            Err(e) => println!("error: {}", e),
        }
    }

    Ok(())
}
