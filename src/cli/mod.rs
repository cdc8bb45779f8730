// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap, builds the dataset and engines, and hands the work to
// Layer 2. The terminal is the "view": TerminalPresenter
// receives the controller's callbacks and prints them.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;
pub mod terminal;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    time::Duration,
};

use commands::{AskArgs, Commands, ImportArgs, ScaffoldArgs, SessionArgs, VerifyArgs};
use terminal::{SessionInput, TerminalPresenter};

use crate::application::controller::{ControllerConfig, Presenter, QaController, Submission};
use crate::application::equivalence::EquivalenceCheck;
use crate::application::import_use_case::ImportUseCase;
use crate::application::scaffold_use_case::ScaffoldUseCase;
use crate::data::loader::JsonDataset;
use crate::data::preprocessor::Preprocessor;
use crate::domain::traits::{AnswerEngine, DatasetProvider};
use crate::infra::report::CsvReport;
use crate::ml::EngineKind;

#[derive(Parser, Debug)]
#[command(
    name = "bertqa",
    version,
    about = "Answer questions over fixed passages with an on-device extractive Q&A model."
)]
pub struct Cli {
    /// Model artifact directory (model_config.json, model.mpk, tokenizer.json)
    #[arg(long, global = true, env = "BERTQA_MODEL_DIR", default_value = "model")]
    pub model_dir: PathBuf,

    /// Dataset JSON to use instead of the bundled passages
    #[arg(long, global = true)]
    pub dataset: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the subcommand. Routing only, no computation.
    pub fn run(self) -> Result<()> {
        let dataset = JsonDataset::from_optional_path(self.dataset.as_deref())?;
        match self.command {
            Commands::List           => run_list(&dataset),
            Commands::Ask(args)      => run_ask(&self.model_dir, &dataset, args),
            Commands::Session(args)  => run_session(&self.model_dir, &dataset, args),
            Commands::Verify(args)   => run_verify(&self.model_dir, &dataset, args),
            Commands::Scaffold(args) => run_scaffold(&dataset, args),
            Commands::Import(args)   => run_import(args),
        }
    }
}

fn run_list(dataset: &JsonDataset) -> Result<()> {
    for index in 0..dataset.len() {
        let passage = dataset.passage(index)?;
        println!("{index:>3}  {}  ({} questions)", passage.title, passage.questions.len());
    }
    Ok(())
}

fn run_ask(model_dir: &std::path::Path, dataset: &JsonDataset, args: AskArgs) -> Result<()> {
    let content = match &args.passage_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read passage '{}'", path.display()))?;
            Preprocessor::new().clean(&raw)
        }
        None => dataset.content(args.index.unwrap_or(0))?.to_string(),
    };

    let engine = EngineKind::from(args.backend).build(model_dir);
    let mut presenter  = TerminalPresenter::new(content.as_str());
    let mut controller = QaController::new(engine, content, ControllerConfig::default())?;

    if let Submission::Rejected(e) = controller.submit_question(&args.question, &mut presenter) {
        bail!("{e}");
    }
    if !controller.await_answer(&mut presenter, Duration::from_secs(args.timeout)) {
        bail!("No answer within {} s", args.timeout);
    }
    Ok(())
}

fn run_session(model_dir: &std::path::Path, dataset: &JsonDataset, args: SessionArgs) -> Result<()> {
    let passage = dataset.passage(args.index)?;
    println!("{}\n\n{}\n", passage.title, passage.content);
    for (i, q) in passage.questions.iter().enumerate() {
        println!("  :{}  {q}", i + 1);
    }
    println!("Type a question, :N for a suggestion, :q to quit.\n");

    let engine = EngineKind::from(args.backend).build(model_dir);
    let config = ControllerConfig { policy: args.in_flight.into() };
    let mut presenter  = TerminalPresenter::new(passage.content.as_str());
    let mut controller = QaController::new(engine, passage.content.as_str(), config)?;
    let timeout = Duration::from_secs(args.timeout);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if controller.should_clear_input() && !presenter.input().is_empty() {
            presenter.set_question_text("");
        }
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        // Show an answer that came in while the line was typed,
        // before the next submission makes it stale.
        controller.pump(&mut presenter, Duration::ZERO);
        let question = match SessionInput::parse(&line?, passage.questions.len()) {
            SessionInput::Quit => break,
            SessionInput::Invalid(hint) => {
                println!("{hint}");
                continue;
            }
            SessionInput::Suggestion(i) => passage.questions[i].clone(),
            SessionInput::Question(q) => q,
        };
        if let Submission::Dispatched { .. } = controller.submit_question(&question, &mut presenter) {
            if !controller.await_answer(&mut presenter, timeout) {
                println!("Still looking; the answer shows after your next line if it is ready by then.");
            }
        }
    }

    controller.shutdown();
    Ok(())
}

fn run_verify(model_dir: &std::path::Path, dataset: &JsonDataset, args: VerifyArgs) -> Result<()> {
    let mut interpreter = EngineKind::Interpreter.build(model_dir);
    let mut task        = EngineKind::Task.build(model_dir);
    load(interpreter.as_mut())?;
    load(task.as_mut())?;

    let report = EquivalenceCheck::new(args.entries).run(interpreter.as_ref(), task.as_ref(), dataset)?;
    for o in &report.outcomes {
        println!(
            "{:>3}  {:<6} {}\n     {}: {}\n     {}: {}",
            o.index,
            if o.matched { "ok" } else { "DIFFER" },
            o.question,
            report.left,
            o.left_answer.as_deref().unwrap_or("<none>"),
            report.right,
            o.right_answer.as_deref().unwrap_or("<none>"),
        );
    }
    for index in &report.skipped {
        println!("{index:>3}  skipped (no questions)");
    }

    let mut rows = report.outcomes.clone();
    let mut failed = !report.all_match();

    if args.canonical {
        let outcome = EquivalenceCheck::canonical(interpreter.as_ref(), task.as_ref(), dataset)?;
        println!(
            "canonical {}: {} / {}",
            if outcome.matched { "ok" } else { "FAILED" },
            outcome.left_answer.as_deref().unwrap_or("<none>"),
            outcome.right_answer.as_deref().unwrap_or("<none>"),
        );
        failed |= !outcome.matched;
        rows.push(outcome);
    }

    if let Some(path) = args.report {
        let report_file = CsvReport::new(path);
        report_file.write(&rows)?;
        println!("Report written to '{}'", report_file.path().display());
    }

    interpreter.unload();
    task.unload();

    if failed {
        bail!("Engines disagree: dual-path equivalence check failed");
    }
    println!("Both engines agree.");
    Ok(())
}

fn run_scaffold(dataset: &JsonDataset, args: ScaffoldArgs) -> Result<()> {
    let manifest = ScaffoldUseCase::new(args.into()).execute(dataset)?;
    println!(
        "Model artifact written ({} ids, {} layers, max_seq_len {}). \
         Its weights are untrained: answers are arbitrary spans.",
        manifest.model.vocab_size, manifest.model.num_layers, manifest.model.max_seq_len,
    );
    Ok(())
}

fn run_import(args: ImportArgs) -> Result<()> {
    let manifest = ImportUseCase::new(args.into()).execute()?;
    println!(
        "Model artifact written ({} ids, {} layers, d_model {}, max_seq_len {}).",
        manifest.model.vocab_size, manifest.model.num_layers,
        manifest.model.d_model, manifest.model.max_seq_len,
    );
    Ok(())
}

fn load(engine: &mut dyn AnswerEngine) -> Result<()> {
    engine
        .load()
        .with_context(|| format!("Cannot load the {} engine", engine.name()))
}
