//! Console output: colored status/warning/error lines plus a
//! spinner-style progress bar for the single long-running phase of
//! generation (parse + emit). No per-target tracking, since there is
//! nothing to execute here.

use colored::Colorize;

const PREFIX: &str = "repomake";

#[derive(Debug, Clone, Default)]
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn status(&self, text: &str) {
        println!("{}", self.prefixed(text).color(colored::Color::White));
        log::info!("{text}");
    }

    pub fn warning(&self, text: &str) {
        println!("{}", self.prefixed(text).color(colored::Color::Yellow));
        log::warn!("{text}");
    }

    pub fn error(&self, text: &str) {
        eprintln!("{}", self.prefixed(text).color(colored::Color::Red));
        log::error!("{text}");
    }

    fn prefixed(&self, text: &str) -> String {
        format!("{PREFIX}: {text}")
    }
}

lazy_static::lazy_static! {
    static ref SPINNER_STYLE: indicatif::ProgressStyle =
        indicatif::ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
}

/// A spinner rather than a bounded bar: generation has no countable unit
/// of work ahead of time (the node count is only known after parsing
/// completes).
pub struct ProgressBar {
    bar: indicatif::ProgressBar,
}

impl ProgressBar {
    pub fn new(message: impl Into<std::borrow::Cow<'static, str>>) -> Self {
        let bar = indicatif::ProgressBar::new_spinner();
        bar.set_style(SPINNER_STYLE.clone());
        bar.set_message(message);
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    pub fn finish_with_message(&self, msg: impl Into<std::borrow::Cow<'static, str>>) {
        self.bar.finish_with_message(msg);
    }

    pub fn abandon_with_message(&self, msg: impl Into<std::borrow::Cow<'static, str>>) {
        self.bar.abandon_with_message(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_not_prefixed_twice() {
        let output = Output::new();
        assert_eq!(output.prefixed("hello"), "repomake: hello");
    }
}
