//! Player-visible text buffer.

/// Collects text printed during a turn.
///
/// While suppressed (after the game has ended mid-task), printed text is diverted to a side
/// buffer: it is still produced, just not shown.
#[derive(Debug, Clone, Default)]
pub struct Output {
    visible: String,
    suppressed: String,
    suppressing: bool,
}

impl Output {
    pub fn print(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.suppressing {
            self.suppressed.push_str(text);
        } else {
            self.visible.push_str(text);
        }
    }

    /// Print `text` on a line of its own.
    pub fn print_line(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let target = if self.suppressing {
            &mut self.suppressed
        } else {
            &mut self.visible
        };
        if !target.is_empty() && !target.ends_with('\n') {
            target.push('\n');
        }
        target.push_str(text);
        target.push('\n');
    }

    pub fn set_suppressed(&mut self, suppressed: bool) {
        self.suppressing = suppressed;
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressing
    }

    pub fn visible(&self) -> &str {
        &self.visible
    }

    /// Drain the visible text.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.visible)
    }

    /// Drain text produced while suppressed.
    pub fn take_suppressed(&mut self) -> String {
        std::mem::take(&mut self.suppressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppressed_text_is_kept_aside() {
        let mut out = Output::default();
        out.print_line("You win.");
        out.set_suppressed(true);
        out.print_line("The bell rings.");
        out.set_suppressed(false);
        assert_eq!(out.take(), "You win.\n");
        assert_eq!(out.take_suppressed(), "The bell rings.\n");
        assert!(out.visible().is_empty());
    }

    #[test]
    fn lines_do_not_run_together() {
        let mut out = Output::default();
        out.print("a");
        out.print_line("b");
        assert_eq!(out.take(), "a\nb\n");
    }
}
