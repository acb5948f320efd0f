use crate::error::Result;
use crate::util::ask;

/// Yes/no gate in front of oversized reviews.
pub trait Confirm {
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Asks on the terminal; only `y`/`Y` proceeds.
pub struct InteractiveConfirm;

impl Confirm for InteractiveConfirm {
    fn confirm(&self, question: &str) -> Result<bool> {
        let answer = ask(&format!("⚠️  {question} [y/N]: "))?;
        Ok(is_yes(&answer))
    }
}

/// Only `y`/`Y` proceeds; anything else, including an empty line or EOF, declines.
fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// `--yes`: always proceeds without reading stdin.
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&self, _question: &str) -> Result<bool> {
        Ok(true)
    }
}

pub fn for_flag(auto_confirm: bool) -> Box<dyn Confirm> {
    if auto_confirm {
        Box::new(AutoConfirm)
    } else {
        Box::new(InteractiveConfirm)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_y_proceeds() {
        assert!(is_yes("y"));
        assert!(is_yes("Y"));
        assert!(is_yes("  y \r"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yes"));
        assert!(!is_yes("N"));
    }

    #[test]
    fn auto_confirm_always_proceeds() {
        assert!(AutoConfirm.confirm("Large diff").expect("no io"));
        assert!(for_flag(true).confirm("anything").expect("no io"));
    }
}
