//! CLI binary for smartlearn.
//!
//! A thin shim over the library crate that maps CLI flags to `StudyConfig`,
//! prints the generated material and, with `--interactive`, runs a terminal
//! study session on top of `SessionController`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use smartlearn::content::option_label;
use smartlearn::generate::write_atomic;
use smartlearn::pipeline::input::is_url;
use smartlearn::{
    export_pdf, generate_from_inputs, normalize_inputs, render_study_sheet, render_summary,
    resolve_model, Backend, ContentModel, ContentPolicy, GenerationProgressCallback,
    GenerationStats, InputKind, ProgressCallback, SessionController, SessionState, StudyConfig,
    StudySession, Submission, View,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner while files are read and the model works,
/// one log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    rejected: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            rejected: AtomicUsize::new(0),
        })
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_normalize_start(&self, total_inputs: usize) {
        self.bar.set_prefix("Reading");
        self.bar.set_message(format!("{total_inputs} inputs…"));
    }

    fn on_file_ready(&self, name: &str, kind: InputKind) {
        let kind = match kind {
            InputKind::Pdf => "pdf",
            InputKind::Text => "text",
        };
        self.bar
            .println(format!("  {} {}  {}", green("✓"), name, dim(kind)));
    }

    fn on_file_rejected(&self, name: &str, error: &str) {
        self.rejected.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), name, red(&msg)));
    }

    fn on_generation_start(&self, parts: usize) {
        self.bar.set_prefix("Generating");
        self.bar
            .set_message(format!("summary, flashcards and quiz from {parts} parts…"));
    }

    fn on_generation_complete(&self, stats: &GenerationStats) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Learning material ready  {}",
            green("✔"),
            dim(&format!(
                "{} tokens in / {} tokens out, {:.1}s",
                stats.input_tokens,
                stats.output_tokens,
                stats.duration_ms as f64 / 1000.0
            ))
        );
        if !stats.findings.is_empty() {
            eprintln!(
                "{} {} deviations from the requested format (see --verbose)",
                cyan("⚠"),
                stats.findings.len()
            );
        }
    }

    fn on_generation_failed(&self, _error: &str) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summary as Markdown on stdout
  smartlearn vorlesung.pdf

  # Several files plus own notes, focus on one topic
  smartlearn skript.pdf notizen.docx --text "Klausur am Freitag" --focus "Marketing-Mix"

  # Leave something out, write everything as JSON
  smartlearn skript.pdf --exclude "Geschichte des Marketings" --json -o lernset.json

  # Export the summary as PDF (Lernzusammenfassung.pdf)
  smartlearn skript.pdf --export-pdf

  # Study in the terminal: summary, flashcards, quiz
  smartlearn skript.pdf --interactive

  # Any edgequake-llm provider instead of native Gemini
  smartlearn --backend provider --provider openai --model gpt-4.1 skript.pdf

INPUTS:
  .pdf            sent to the model as a PDF
  .docx           text extracted locally; a damaged file is rejected
  anything else   read as UTF-8 text
  http(s)://…     downloaded first

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (native backend)
  GOOGLE_API_KEY          Alternative name for the Gemini key
  OPENAI_API_KEY          OpenAI API key (provider backend)
  ANTHROPIC_API_KEY       Anthropic API key (provider backend)
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium for --export-pdf
"#;

/// Turn study documents into a summary, flashcards and a quiz.
#[derive(Parser, Debug)]
#[command(
    name = "smartlearn",
    version,
    about = "Turn study documents into a summary, flashcards and a quiz",
    long_about = "Send PDFs, Word documents, text files or free text to a generative model \
and get back a structured German summary with study questions, 10–20 flashcards and a \
multiple-choice quiz with four questions per chapter.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local files (PDF, DOCX, text) or HTTP/HTTPS URLs.
    inputs: Vec<String>,

    /// Free text submitted alongside the files.
    #[arg(short, long, env = "SMARTLEARN_TEXT")]
    text: Option<String>,

    /// Read additional free text from this file.
    #[arg(long, env = "SMARTLEARN_TEXT_FILE")]
    text_file: Option<PathBuf>,

    /// Topics to put the focus on.
    #[arg(long, env = "SMARTLEARN_FOCUS")]
    focus: Option<String>,

    /// Topics to leave out.
    #[arg(long, env = "SMARTLEARN_EXCLUDE")]
    exclude: Option<String>,

    /// Backend: auto, gemini, provider.
    #[arg(long, env = "SMARTLEARN_BACKEND", value_enum, default_value = "auto")]
    backend: BackendArg,

    /// Model ID (e.g. gemini-2.5-flash, gemini-2.5-pro, gpt-4.1).
    #[arg(long, env = "SMARTLEARN_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "SMARTLEARN_PROVIDER")]
    provider: Option<String>,

    /// Gemini API key for the native backend.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the Gemini REST API.
    #[arg(long, env = "SMARTLEARN_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Reject replies that break the requested counts instead of warning.
    #[arg(long, env = "SMARTLEARN_STRICT")]
    strict: bool,

    /// Path to a text file containing a custom system instruction.
    #[arg(long, env = "SMARTLEARN_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max output tokens of the model call.
    #[arg(long, env = "SMARTLEARN_MAX_TOKENS", default_value_t = 16384)]
    max_tokens: usize,

    /// Model temperature (0.0–2.0).
    #[arg(long, env = "SMARTLEARN_TEMPERATURE", default_value_t = 0.4)]
    temperature: f32,

    /// Model call timeout in seconds.
    #[arg(long, env = "SMARTLEARN_API_TIMEOUT", default_value_t = 180)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SMARTLEARN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Number of inputs read concurrently.
    #[arg(short, long, env = "SMARTLEARN_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Output the full material as JSON instead of Markdown.
    #[arg(long, env = "SMARTLEARN_JSON")]
    json: bool,

    /// Print summary, flashcards and quiz instead of the summary only.
    #[arg(long, env = "SMARTLEARN_ALL")]
    all: bool,

    /// Write output to this file instead of stdout.
    #[arg(short, long, env = "SMARTLEARN_OUTPUT")]
    output: Option<PathBuf>,

    /// Export the summary as PDF (default file: Lernzusammenfassung.pdf).
    #[arg(long, num_args = 0..=1, default_missing_value = smartlearn::DEFAULT_EXPORT_FILE_NAME)]
    export_pdf: Option<PathBuf>,

    /// Study the result in the terminal.
    #[arg(short, long)]
    interactive: bool,

    /// Disable progress spinner.
    #[arg(long, env = "SMARTLEARN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SMARTLEARN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SMARTLEARN_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Auto,
    Gemini,
    Provider,
}

impl From<BackendArg> for Backend {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Auto => Backend::Auto,
            BackendArg::Gemini => Backend::Gemini,
            BackendArg::Provider => Backend::Provider,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;
    let submission = build_submission(&cli).await?;

    if cli.interactive {
        return run_interactive(&cli, submission, &config).await;
    }

    if cli.inputs.is_empty() && submission.text.trim().is_empty() {
        bail!("{}", smartlearn::error::EMPTY_SUBMISSION_MESSAGE);
    }

    // ── One-shot generation ──────────────────────────────────────────────
    let output = generate_from_inputs(cli.inputs.as_slice(), submission, &config)
        .await
        .context("Generation failed")?;

    if !cli.quiet && !show_progress {
        for rejected in &output.rejected {
            eprintln!("{} skipped {}", cyan("⚠"), rejected);
        }
    }

    let rendered = if cli.json {
        serde_json::to_string_pretty(&output).context("Failed to serialise output")?
    } else if cli.all {
        render_study_sheet(&output.content)
    } else {
        render_summary(&output.content.summary)
    };

    if let Some(ref path) = cli.output {
        write_atomic(path, rendered.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !cli.quiet {
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        if !rendered.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if let Some(ref path) = cli.export_pdf {
        let written = export_pdf(&output.content.summary, Some(path))
            .await
            .context("PDF export failed")?;
        if !cli.quiet {
            eprintln!("{}  PDF  →  {}", green("✔"), bold(&written.display().to_string()));
        }
    }

    if !cli.quiet && !show_progress {
        eprintln!(
            "{} tokens in  /  {} tokens out  /  {}ms",
            output.stats.input_tokens, output.stats.output_tokens, output.stats.duration_ms
        );
    }

    Ok(())
}

/// Map CLI args to `StudyConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<StudyConfig> {
    let mut builder = StudyConfig::builder()
        .backend(cli.backend.into())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .read_concurrency(cli.concurrency)
        .content_policy(if cli.strict {
            ContentPolicy::Strict
        } else {
            ContentPolicy::Permissive
        });

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref url) = cli.api_base_url {
        builder = builder.api_base_url(url.clone());
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_instruction(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Free text and hints from the CLI; files are added after normalisation.
async fn build_submission(cli: &Cli) -> Result<Submission> {
    let mut text = cli.text.clone().unwrap_or_default();
    if let Some(ref path) = cli.text_file {
        let extra = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read text from {:?}", path))?;
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(&extra);
    }

    let mut submission = Submission::default().with_text(text);
    submission.focus = cli.focus.clone();
    submission.exclude = cli.exclude.clone();
    Ok(submission)
}

// ── Interactive study mode ───────────────────────────────────────────────────

const INTERACTIVE_HELP: &str = "\
  views      s = Zusammenfassung   f = Karteikarten   q = Quiz
  cards      n = next   p = previous   t = flip
  quiz       a-d / 1-4 = answer   h = hint   n = next   x = stop   r = restart
  other      e [file] = export PDF   reset = new material   help   quit";

type InputLines = Lines<BufReader<Stdin>>;

async fn prompt(lines: &mut InputLines, label: &str) -> Result<Option<String>> {
    eprint!("{} ", cyan(label));
    io::stderr().flush().ok();
    Ok(lines.next_line().await.context("Failed to read stdin")?)
}

async fn run_interactive(cli: &Cli, submission: Submission, config: &StudyConfig) -> Result<()> {
    let model = resolve_model(config).context("No model backend available")?;
    let mut controller = SessionController::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut inputs = cli.inputs.clone();
    let mut submission = submission;

    loop {
        // ── Idle: submit ─────────────────────────────────────────────────
        if inputs.is_empty() && submission.text.trim().is_empty() {
            eprintln!("Enter file paths / URLs, or text to learn from (empty line quits):");
            match prompt(&mut lines, "»").await? {
                Some(line) if !line.trim().is_empty() => {
                    (inputs, submission) = parse_submission_line(&line, &submission);
                }
                _ => return Ok(()),
            }
        }

        submit(&mut controller, model.as_ref(), &inputs, &submission, config).await?;
        inputs.clear();
        submission.text.clear();

        // ── Ready / Error ────────────────────────────────────────────────
        match controller.state() {
            SessionState::Error(message) => {
                eprintln!("{} {}", red("✘"), message);
                eprintln!("{}", dim("Type `reset` to try again or `quit`."));
            }
            SessionState::Ready(_) => {
                eprintln!("{}", dim(INTERACTIVE_HELP));
                if let Some(session) = controller.session() {
                    show_view(session);
                }
            }
            _ => {}
        }

        if !study_loop(&mut controller, &mut lines).await? {
            return Ok(());
        }
    }
}

/// Treat a line as inputs when every token is an existing file or a URL,
/// otherwise as free text.
fn parse_submission_line(line: &str, previous: &Submission) -> (Vec<String>, Submission) {
    let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    let all_inputs = tokens
        .iter()
        .all(|t| is_url(t) || Path::new(t).is_file());

    let mut submission = Submission::default();
    submission.focus = previous.focus.clone();
    submission.exclude = previous.exclude.clone();

    if all_inputs {
        (tokens, submission)
    } else {
        (Vec::new(), submission.with_text(line.trim()))
    }
}

async fn submit(
    controller: &mut SessionController,
    model: &dyn ContentModel,
    inputs: &[String],
    submission: &Submission,
    config: &StudyConfig,
) -> Result<()> {
    let normalized = normalize_inputs(inputs, config).await;
    let mut submission = submission.clone();
    submission.files.extend(normalized.files);

    if let Err(e) = controller.submit(model, &submission, config).await {
        eprintln!("{} {}", cyan("⚠"), e);
    }
    Ok(())
}

/// Handle commands until the user resets (returns `true`) or quits (`false`).
async fn study_loop(controller: &mut SessionController, lines: &mut InputLines) -> Result<bool> {
    loop {
        let label = match controller.session() {
            Some(session) => format!("[{}] ›", session.view().label()),
            None => "›".to_string(),
        };
        let Some(line) = prompt(lines, &label).await? else {
            return Ok(false);
        };
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or("").to_lowercase();
        let argument = words.next();

        match command.as_str() {
            "" => continue,
            "quit" | "exit" => return Ok(false),
            "help" | "?" => eprintln!("{}", dim(INTERACTIVE_HELP)),
            "reset" => match controller.reset() {
                Ok(()) => return Ok(true),
                Err(e) => eprintln!("{} {}", red("✘"), e),
            },
            "e" | "export" => {
                let Some(session) = controller.session() else {
                    eprintln!("{}", dim("Nothing to export."));
                    continue;
                };
                match export_pdf(session.summary(), argument.map(Path::new)).await {
                    Ok(path) => eprintln!("{}  PDF  →  {}", green("✔"), bold(&path.display().to_string())),
                    Err(e) => eprintln!("{} {}", red("✘"), e),
                }
            }
            _ => {
                let Some(session) = controller.session_mut() else {
                    eprintln!("{}", dim("No material loaded. Type `reset` or `quit`."));
                    continue;
                };
                handle_view_command(session, &command);
            }
        }
    }
}

fn handle_view_command(session: &mut StudySession, command: &str) {
    match command {
        "s" | "summary" => {
            session.select_view(View::Summary);
            show_view(session);
        }
        "f" | "cards" | "flashcards" => {
            session.select_view(View::Flashcards);
            show_view(session);
        }
        "q" | "quiz" => {
            session.select_view(View::Quiz);
            show_view(session);
        }
        _ => match session.view() {
            View::Flashcards => flashcard_command(session, command),
            View::Quiz => quiz_command(session, command),
            View::Summary => eprintln!("{}", dim("Unknown command. Type `help`.")),
        },
    }
}

fn flashcard_command(session: &mut StudySession, command: &str) {
    let cards = session.flashcards_mut();
    let result = match command {
        "n" | "next" => cards.next().map(|_| ()),
        "p" | "prev" => cards.prev().map(|_| ()),
        "t" | "flip" => cards.flip().map(|_| ()),
        _ => {
            eprintln!("{}", dim("Unknown command. Type `help`."));
            return;
        }
    };
    match result {
        Ok(()) => show_view(session),
        Err(e) => eprintln!("{} {}", cyan("⚠"), e),
    }
}

fn quiz_command(session: &mut StudySession, command: &str) {
    let quiz = session.quiz_mut();
    match command {
        "h" | "hint" => {
            if quiz.reveal_hint() {
                if let Some(q) = quiz.current_question() {
                    println!("  {} {}", yellow("Tipp:"), q.hint);
                }
            }
        }
        "n" | "next" => {
            if quiz.advance() {
                show_view(session);
            } else {
                eprintln!("{}", dim("Answer the question first."));
            }
        }
        "x" | "stop" => {
            quiz.stop_early();
            show_view(session);
        }
        "r" | "restart" => {
            quiz.restart();
            show_view(session);
        }
        other => match parse_option(other) {
            Some(option) => match quiz.select_option(option) {
                Some(correct) => {
                    if let Some(q) = quiz.current_question() {
                        if correct {
                            println!("  {}", green("Richtig!"));
                        } else {
                            println!(
                                "  {} Richtig ist {}) {}",
                                red("Leider falsch."),
                                option_label(q.correct_answer_index),
                                q.correct_option().unwrap_or("")
                            );
                        }
                        if !q.explanation.is_empty() {
                            println!("  {}", dim(&q.explanation));
                        }
                    }
                    let next = if quiz.is_last_question() {
                        "Ergebnis anzeigen"
                    } else {
                        "Nächste Frage"
                    };
                    println!("  {}", dim(&format!("n = {next}")));
                }
                None => eprintln!("{}", dim("Already answered, or no such option.")),
            },
            None => eprintln!("{}", dim("Unknown command. Type `help`.")),
        },
    }
}

/// `a`–`z` or `1`–`n` to an option index.
fn parse_option(input: &str) -> Option<usize> {
    if let Ok(n) = input.parse::<usize>() {
        return n.checked_sub(1);
    }
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_lowercase() => Some(c as usize - 'a' as usize),
        _ => None,
    }
}

fn show_view(session: &StudySession) {
    match session.view() {
        View::Summary => println!("\n{}", render_summary(session.summary())),
        View::Flashcards => {
            let cards = session.flashcards();
            match cards.visible_text() {
                Some(text) => {
                    let side = if cards.is_flipped() { "Definition" } else { "Begriff" };
                    println!("\n  {}  {}", dim(&cards.progress_label()), dim(side));
                    println!("  {}\n", bold(text));
                }
                None => println!("\n{}", dim("Keine Karteikarten vorhanden.")),
            }
        }
        View::Quiz => show_quiz(session),
    }
}

fn show_quiz(session: &StudySession) {
    let quiz = session.quiz();
    if quiz.is_finished() {
        let report = quiz.report();
        println!(
            "\n  {}  {}/{}  ({}%)",
            bold("Ergebnis"),
            report.score,
            report.total,
            report.percentage
        );
        println!("  {}\n", report.message());
        println!("{}", dim("r = Quiz wiederholen"));
        return;
    }

    let (Some(chapter), Some(question)) = (quiz.current_chapter(), quiz.current_question()) else {
        println!("\n{}", dim("Keine Quizfragen vorhanden."));
        return;
    };

    println!(
        "\n  {}  {}  {}",
        dim(&quiz.chapter_label()),
        bold(&chapter.title),
        dim(&quiz.question_label())
    );
    println!("  {}", question.text);
    for (i, option) in question.options.iter().enumerate() {
        println!("    {}) {}", option_label(i), option);
    }
    println!();
}

