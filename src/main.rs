use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::error;

use badge_intake::capture::{
    CaptureController, CaptureEnvironment, CaptureError, CaptureHandle, CaptureOptions,
    DecodeEvent, DecodeFailure, DeviceInfo, FrameDecoder,
};
use badge_intake::config;
use badge_intake::model::{InterestLevel, StatusKind};
use badge_intake::session::{ManualEntry, SessionState};
use badge_intake::sheets::SheetsClient;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

type SharedInput = Arc<Mutex<Lines<BufReader<Stdin>>>>;

/// Console stand-in for the camera pipeline: each capture session reads one
/// pasted payload line as the decoded text.
struct ConsoleDecoder {
    input: SharedInput,
}

#[async_trait]
impl FrameDecoder for ConsoleDecoder {
    async fn start(
        &self,
        _opts: &CaptureOptions,
        events: mpsc::Sender<DecodeEvent>,
    ) -> Result<Box<dyn CaptureHandle>, CaptureError> {
        let input = self.input.clone();
        let task = tokio::spawn(async move {
            let line = input.lock().await.next_line().await;
            let event = match line {
                Ok(Some(text)) if !text.trim().is_empty() => DecodeEvent::Decoded(text),
                Ok(Some(_)) => DecodeEvent::Failed(DecodeFailure::NoCodeInFrame),
                Ok(None) => return,
                Err(err) => DecodeEvent::Failed(DecodeFailure::Other(err.to_string())),
            };
            let _ = events.send(event).await;
        });
        Ok(Box::new(ConsoleCapture { task: Some(task) }))
    }
}

struct ConsoleCapture {
    task: Option<JoinHandle<()>>,
}

#[async_trait]
impl CaptureHandle for ConsoleCapture {
    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }
}

/// The local console is its own single "device" and counts as a trusted
/// local origin.
struct ConsoleEnvironment;

impl CaptureEnvironment for ConsoleEnvironment {
    fn video_devices(&self) -> Vec<DeviceInfo> {
        vec![DeviceInfo {
            id: "console".into(),
            label: "operator console".into(),
        }]
    }

    fn secure_context(&self) -> bool {
        true
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let sheets = SheetsClient::from_config(&cfg)?;
    let input: SharedInput = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let decoder = ConsoleDecoder {
        input: input.clone(),
    };
    let mut controller = CaptureController::new(&ConsoleEnvironment, cfg.capture_options());
    let mut session = SessionState::new();

    println!("badge-intake console; type 'help' for commands");
    print_status(&session);

    loop {
        let line = { input.lock().await.next_line().await? };
        let Some(line) = line else { break };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let (cmd, rest) = match line.split_once(' ') {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line.as_str(), ""),
        };
        match cmd {
            "help" => print_help(),
            "scan" => match controller.start(&mut session, &decoder).await {
                Ok(mut events) => {
                    println!("paste the decoded badge payload:");
                    if let Some(event) = events.recv().await {
                        controller.on_event(&mut session, event).await;
                    }
                }
                Err(err) => error!(%err, "failed to start capture"),
            },
            "stop" => controller.stop(&mut session).await,
            "manual" => {
                let mut parts = rest.splitn(4, '|').map(str::trim);
                let entry = ManualEntry {
                    name: parts.next().unwrap_or_default().to_string(),
                    email: parts.next().unwrap_or_default().to_string(),
                    phone: parts.next().unwrap_or_default().to_string(),
                    company: parts.next().unwrap_or_default().to_string(),
                };
                let _ = session.manual_entry(entry);
            }
            "interest" => match InterestLevel::parse(rest) {
                Some(level) => session.set_interest(level),
                None => println!("unknown interest level: {rest}"),
            },
            "note" => session.append_note(rest),
            "suggest" => {
                if rest.is_empty() {
                    for (i, suggestion) in cfg.notes.suggestions.iter().enumerate() {
                        println!("{}. {}", i + 1, suggestion);
                    }
                } else {
                    let picked = rest
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| cfg.notes.suggestions.get(n.wrapping_sub(1)));
                    match picked {
                        Some(suggestion) => session.append_note(suggestion),
                        None => println!("no such suggestion: {rest}"),
                    }
                }
            }
            "show" => print_session(&session),
            "last" => match session.last_submission() {
                Some(submission) => println!("{}", serde_json::to_string_pretty(submission)?),
                None => println!("no submission yet"),
            },
            "submit" => {
                let _ = session.submit(&sheets).await;
            }
            "reset" => session.reset(),
            "quit" | "exit" => break,
            _ => println!("unknown command: {cmd}"),
        }
        print_status(&session);
    }

    controller.stop(&mut session).await;
    Ok(())
}

fn print_status(session: &SessionState) {
    let status = session.status();
    let tag = match status.kind {
        StatusKind::Info => "info",
        StatusKind::Success => "ok",
        StatusKind::Error => "error",
    };
    println!("[{tag}] {}", status.message);
}

fn print_session(session: &SessionState) {
    match session.current_record() {
        Some(record) => {
            let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "N/A".into());
            println!("  name:    {}", field(&record.name));
            println!("  email:   {}", field(&record.email));
            println!("  phone:   {}", field(&record.phone));
            println!("  company: {}", field(&record.company));
        }
        None => println!("  no record collected yet"),
    }
    let annotation = session.annotation();
    println!("  interest: {}", annotation.interest_level.as_str());
    if !annotation.notes.is_empty() {
        println!("  notes:\n{}", annotation.notes);
    }
}

fn print_help() {
    println!(
        "commands:\n\
         \x20 scan               start a capture session; the next line is the decoded payload\n\
         \x20 stop               stop the capture session\n\
         \x20 manual N|E|P|C     enter a contact manually (name|email|phone|company)\n\
         \x20 interest LEVEL     low, medium, high or very-high\n\
         \x20 note TEXT          append a free-text note\n\
         \x20 suggest [N]        list quick notes, or append the Nth one\n\
         \x20 show               print the collected record and annotation\n\
         \x20 submit             send the record to the spreadsheet\n\
         \x20 last               print the last successful submission\n\
         \x20 reset              discard the record and annotation\n\
         \x20 quit               exit"
    );
}
