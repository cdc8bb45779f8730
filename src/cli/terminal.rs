// ============================================================
// Layer 1 — Terminal Presenter
// ============================================================
// Renders controller callbacks as lines on stdout:
//
//   Question: Where did Super Bowl 50 take place?
//   Looking up answer...
//
//   ... The game was played on February 7, 2016, at [Levi's
//   Stadium in the San Francisco Bay Area at Santa Clara,
//   California.] As this was the 50th Super Bowl, ...
//
//   Answer: Levi's Stadium in ... (score 0.8123, 41 ms)
//
// On a terminal the highlight is reverse video; otherwise it is
// bracketed so piped output still shows it.

use std::io::IsTerminal;

use crate::application::controller::{Presentation, Presenter};
use crate::domain::answer::Highlight;
use crate::domain::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightStyle {
    Ansi,
    Brackets,
}

impl HighlightStyle {
    pub fn for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            HighlightStyle::Ansi
        } else {
            HighlightStyle::Brackets
        }
    }
}

/// `content` with `highlight` marked; unchanged when there is none
/// or the range does not fall on character boundaries.
pub fn render_highlight(content: &str, highlight: Option<Highlight>, style: HighlightStyle) -> String {
    let Some(h) = highlight else {
        return content.to_string();
    };
    let (Some(before), Some(marked), Some(after)) = (
        content.get(..h.start),
        content.get(h.range()),
        content.get(h.end..),
    ) else {
        return content.to_string();
    };
    match style {
        HighlightStyle::Ansi     => format!("{before}\x1b[7m{marked}\x1b[0m{after}"),
        HighlightStyle::Brackets => format!("{before}[{marked}]{after}"),
    }
}

pub struct TerminalPresenter {
    content: String,
    style:   HighlightStyle,
    input:   String,
}

impl TerminalPresenter {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            style:   HighlightStyle::for_stdout(),
            input:   String::new(),
        }
    }

    /// Current contents of the question input.
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl Presenter for TerminalPresenter {
    fn set_question_text(&mut self, text: &str) {
        self.input = text.to_string();
        if !text.is_empty() {
            println!("Question: {text}");
        }
    }

    fn looking_up(&mut self, _question: &str) {
        println!("Looking up answer...");
    }

    fn on_answer_ready(&mut self, presentation: Option<&Presentation>) {
        let Some(p) = presentation else {
            println!("No answer found.");
            return;
        };
        println!("\n{}\n", render_highlight(&self.content, p.highlight, self.style));
        println!(
            "Answer: {}  (score {:.4}, {} ms)",
            p.candidate.text,
            p.candidate.score,
            p.elapsed.as_millis()
        );
    }

    fn on_engine_unavailable(&mut self, error: &EngineError) {
        eprintln!("Model unavailable: {error}");
    }
}

// ─── Session input ────────────────────────────────────────────────────────────
/// One line typed in `session`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    /// Free text to submit as a question (may be blank)
    Question(String),
    /// `:N` picked suggestion N (1-based)
    Suggestion(usize),
    Quit,
    Invalid(String),
}

impl SessionInput {
    pub fn parse(line: &str, suggestions: usize) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix(':') else {
            return SessionInput::Question(line.to_string());
        };
        match command.trim() {
            "q" | "quit" => SessionInput::Quit,
            n => match n.parse::<usize>() {
                Ok(k) if (1..=suggestions).contains(&k) => SessionInput::Suggestion(k - 1),
                _ => SessionInput::Invalid(format!(
                    "Pick a suggestion between :1 and :{suggestions}, or :q to quit"
                )),
            },
        }
    }
}
