// ============================================================
// Layer 2 — Question Normalisation
// ============================================================
//   "  who won  "  → "who won?"
//   "who won?"     → "who won?"   (idempotent)
//   "   "          → EmptyQuestion

use crate::domain::errors::EmptyQuestion;

pub fn normalize_question(raw: &str) -> Result<String, EmptyQuestion> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EmptyQuestion);
    }
    if trimmed.ends_with('?') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}?"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_appends_question_mark() {
        assert_eq!(normalize_question("Who won").unwrap(), "Who won?");
    }

    #[test]
    fn test_trims_before_checking() {
        assert_eq!(normalize_question("  Who won? \n").unwrap(), "Who won?");
        assert_eq!(normalize_question("\tWhere\t").unwrap(), "Where?");
    }

    #[test]
    fn test_is_idempotent() {
        let once  = normalize_question("Where did it happen").unwrap();
        let twice = normalize_question(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.matches('?').count(), 1);
    }

    #[test]
    fn test_blank_is_rejected() {
        assert_eq!(normalize_question(""), Err(EmptyQuestion));
        assert_eq!(normalize_question(" \t\n "), Err(EmptyQuestion));
    }
}
