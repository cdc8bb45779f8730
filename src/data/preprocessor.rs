// ============================================================
// Layer 4 — Passage Preprocessor
// ============================================================
// Cleans passage text read from a plain text file (`ask
// --passage-file`) before it is shown and queried.
//
// Cleaning steps (applied in order):
//   1. "\r\n" and lone "\r" become "\n"
//   2. Tabs, non-breaking spaces, zero-width spaces and byte
//      order marks become plain spaces; other control
//      characters (except newline) are dropped
//   3. Runs of spaces inside a line collapse to one space,
//      and each line is trimmed
//   4. Runs of blank lines collapse to a single blank line
//
// Answers are located in the cleaned text, so the text the
// user sees is exactly the text the engine was given.

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean a raw passage for display and inference.
    pub fn clean(&self, text: &str) -> String {
        let unified = text.replace("\r\n", "\n").replace('\r', "\n");

        let mapped: String = unified
            .chars()
            .filter_map(|c| match c {
                '\t' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => Some(' '),
                '\n' => Some('\n'),
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect();

        let mut out     = String::with_capacity(mapped.len());
        let mut blank   = false;
        let mut started = false;

        for line in mapped.lines() {
            let line = line.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" ");
            if line.is_empty() {
                blank = started;
                continue;
            }
            if started {
                out.push('\n');
                if blank {
                    out.push('\n');
                }
            }
            out.push_str(&line);
            started = true;
            blank   = false;
        }

        out
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
