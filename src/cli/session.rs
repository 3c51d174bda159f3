//! Interactive session over stdin.
//!
//! Each line is one command. Generate, regenerate and download run in the
//! background so they can overlap; a second request for an action that is
//! still running is rejected by the workflow.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;

use crate::application::{format_estimate, format_status, OutputFormat, SavedExport, Workflow};
use crate::domain::{AppError, EstimateText, OutputKind, Phase, Result};
use crate::infrastructure::load_document;

/// One line of session input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Open(PathBuf),
    Generate,
    Feedback(String),
    Regenerate,
    Refine(String),
    Export(OutputKind),
    Show,
    Raw,
    Status,
    Help,
    Quit,
}

impl std::str::FromStr for SessionCommand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let line = s.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        let command = match word.to_lowercase().as_str() {
            "open" => Self::Open(PathBuf::from(required(rest, "open <path>")?)),
            "feedback" | "fb" => Self::Feedback(required(rest, "feedback <text>")?.to_string()),
            "refine" => Self::Refine(required(rest, "refine <text>")?.to_string()),
            "export" | "download" | "dl" => {
                Self::Export(required(rest, "export <pdf|docx>")?.parse()?)
            }
            // Bare command words; with trailing text the line is feedback.
            "generate" | "gen" if rest.is_empty() => Self::Generate,
            "regen" | "regenerate" if rest.is_empty() => Self::Regenerate,
            "show" if rest.is_empty() => Self::Show,
            "raw" if rest.is_empty() => Self::Raw,
            "status" if rest.is_empty() => Self::Status,
            "help" | "?" if rest.is_empty() => Self::Help,
            "quit" | "exit" | "q" if rest.is_empty() => Self::Quit,
            _ if line.is_empty() => return Err("Empty command".to_string()),
            _ => Self::Feedback(line.to_string()),
        };

        Ok(command)
    }
}

fn required<'a>(arg: &'a str, usage: &str) -> std::result::Result<&'a str, String> {
    if arg.is_empty() {
        Err(format!("Usage: {usage}"))
    } else {
        Ok(arg)
    }
}

/// Run the session until `quit` or end of input, then wait for pending actions.
///
/// # Errors
/// Returns error if reading input fails.
pub async fn run_session<R>(workflow: Arc<Workflow>, input: R, format: OutputFormat) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    print_help();

    let mut lines = input.lines();
    let mut pending = JoinSet::new();

    loop {
        while pending.try_join_next().is_some() {}
        prompt();

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| AppError::io("Failed to read input", e))?
        else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<SessionCommand>() {
            Ok(command) => command,
            Err(message) => {
                println!("{} {message}", "!".yellow().bold());
                continue;
            }
        };
        tracing::debug!(?command, "Session command");

        match command {
            SessionCommand::Quit => break,
            SessionCommand::Help => print_help(),
            SessionCommand::Status => println!("{}", format_status(&workflow.snapshot())),
            SessionCommand::Show => show_estimate(&workflow.estimate(), format),
            SessionCommand::Raw => show_estimate(&workflow.estimate(), OutputFormat::Markdown),
            SessionCommand::Open(path) => match load_document(&path) {
                Ok(document) => {
                    println!(
                        "{} Selected {} ({} bytes)",
                        "✓".green().bold(),
                        document.file_name.cyan(),
                        document.size_bytes()
                    );
                    workflow.select_document(document);
                }
                Err(e) => report_error(&e),
            },
            SessionCommand::Feedback(text) => {
                workflow.set_feedback(text);
                println!("Feedback set. Type {} to apply it.", "regen".cyan());
            }
            SessionCommand::Generate => {
                println!("{}", Phase::Ingesting.to_string().yellow());
                let workflow = Arc::clone(&workflow);
                pending.spawn(async move {
                    report_estimate(workflow.submit_document().await, format);
                });
            }
            SessionCommand::Regenerate => {
                println!("{}", Phase::Regenerating.to_string().yellow());
                let workflow = Arc::clone(&workflow);
                pending.spawn(async move {
                    report_estimate(workflow.submit_feedback().await, format);
                });
            }
            SessionCommand::Refine(text) => {
                println!("{}", Phase::Regenerating.to_string().yellow());
                let workflow = Arc::clone(&workflow);
                pending.spawn(async move {
                    report_estimate(workflow.refine(text).await, format);
                });
            }
            SessionCommand::Export(kind) => {
                println!("{}", "Downloading...".yellow());
                let workflow = Arc::clone(&workflow);
                pending.spawn(async move {
                    report_export(workflow.request_export(kind).await);
                });
            }
        }
    }

    if !pending.is_empty() {
        println!("Waiting for {} pending action(s)...", pending.len());
        while pending.join_next().await.is_some() {}
    }

    Ok(())
}

fn prompt() {
    print!("{} ", ">".cyan().bold());
    let _ = std::io::stdout().flush();
}

fn print_help() {
    println!("{}", "📝 Scope estimate session".bold());
    println!("  open <path>         Select a scope document (PDF)");
    println!("  generate            Upload the document and generate an estimate");
    println!("  feedback <text>     Set feedback (plain text works too)");
    println!("  regen               Regenerate the estimate with the feedback");
    println!("  refine <text>       Set feedback and regenerate");
    println!("  export <pdf|docx>   Download the estimate");
    println!("  show | raw          Print the estimate rendered or as markup");
    println!("  status              Show the workflow status");
    println!("  quit                Leave (waits for running actions)");
}

fn show_estimate(estimate: &EstimateText, format: OutputFormat) {
    if estimate.is_empty() {
        println!("{}", "No estimate yet. Type `generate` first.".dimmed());
        return;
    }
    match format_estimate(estimate.as_str(), format) {
        Ok(output) => println!("{output}"),
        Err(e) => report_error(&AppError::json_parse(e)),
    }
}

fn report_estimate(result: Result<EstimateText>, format: OutputFormat) {
    match result {
        Ok(estimate) => {
            println!();
            show_estimate(&estimate, format);
        }
        Err(e) => report_error(&e),
    }
}

fn report_export(result: Result<SavedExport>) {
    match result {
        Ok(saved) => println!(
            "{} Saved {} to {} ({} bytes)",
            "✓".green().bold(),
            saved.kind,
            saved.path.display(),
            saved.size_bytes
        ),
        Err(e) => report_error(&e),
    }
}

fn report_error(err: &AppError) {
    if err.is_validation() {
        println!("{} {err}", "!".yellow().bold());
    } else {
        eprintln!("{} {}", "Error:".red().bold(), err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock_service::{MemorySink, MockEstimationService, Outcome, Recorded};

    fn parse(line: &str) -> std::result::Result<SessionCommand, String> {
        line.parse()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("open ./scope.pdf"), Ok(SessionCommand::Open("./scope.pdf".into())));
        assert_eq!(parse("GEN"), Ok(SessionCommand::Generate));
        assert_eq!(parse("regen"), Ok(SessionCommand::Regenerate));
        assert_eq!(parse("export docx"), Ok(SessionCommand::Export(OutputKind::Docx)));
        assert_eq!(parse("dl pdf"), Ok(SessionCommand::Export(OutputKind::Pdf)));
        assert_eq!(
            parse("refine  add a QA phase "),
            Ok(SessionCommand::Refine("add a QA phase".into()))
        );
        assert_eq!(parse("q"), Ok(SessionCommand::Quit));
    }

    #[test]
    fn test_plain_text_is_feedback() {
        assert_eq!(
            parse("Add two weeks of QA"),
            Ok(SessionCommand::Feedback("Add two weeks of QA".into()))
        );
        // A command word followed by prose is feedback too.
        assert_eq!(
            parse("show the hosting costs separately"),
            Ok(SessionCommand::Feedback("show the hosting costs separately".into()))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("open"), Err("Usage: open <path>".into()));
        assert_eq!(parse("feedback   "), Err("Usage: feedback <text>".into()));
        assert!(parse("export xlsx").is_err());
        assert!(parse("").is_err());
    }

    fn session_workflow(outcomes: Vec<Outcome>) -> (Arc<Workflow>, Arc<MockEstimationService>) {
        let service = MockEstimationService::with_outcomes(outcomes);
        let sink = Arc::new(MemorySink::default());
        (Arc::new(Workflow::new(service.clone(), sink)), service)
    }

    #[tokio::test]
    async fn test_session_open_and_feedback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scope.pdf");
        std::fs::write(&path, b"%PDF-1.7 scope").unwrap();
        let (workflow, service) = session_workflow(vec![]);

        let input = format!("open {}\nAdd a QA phase\nstatus\nquit\n", path.display());
        run_session(Arc::clone(&workflow), input.as_bytes(), OutputFormat::Markdown)
            .await
            .unwrap();

        let snapshot = workflow.snapshot();
        assert_eq!(snapshot.document.as_deref(), Some("scope.pdf"));
        assert_eq!(snapshot.feedback, "Add a QA phase");
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_session_waits_for_pending_generate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scope.pdf");
        std::fs::write(&path, b"%PDF-1.7 scope").unwrap();
        let (workflow, service) = session_workflow(vec![Outcome::Text("# Estimate".into())]);

        let input = format!("open {}\ngenerate\nquit\n", path.display());
        run_session(Arc::clone(&workflow), input.as_bytes(), OutputFormat::Markdown)
            .await
            .unwrap();

        assert_eq!(workflow.estimate().as_str(), "# Estimate");
        assert_eq!(
            service.requests(),
            vec![Recorded::Ingest {
                file_name: "scope.pdf".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_session_survives_errors_and_end_of_input() {
        let (workflow, service) = session_workflow(vec![]);

        run_session(
            Arc::clone(&workflow),
            &b"open /no/such/file.pdf\nexport pdf\nbogus export xlsx\n"[..],
            OutputFormat::Terminal,
        )
        .await
        .unwrap();

        // No estimate, so the export is rejected before any call.
        assert_eq!(service.call_count(), 0);
        assert_eq!(workflow.snapshot().feedback, "bogus export xlsx");
    }
}
