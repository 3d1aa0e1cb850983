//! Buffered emission of GNU-make rules, commands and variables, with
//! escaping.

pub mod variable;

pub use variable::MakeVariable;

/// A rule's own text buffer. Held separately from the main [`Makefile`]
/// buffer so that commands can be interleaved with other work before the
/// rule is finalized; on [`Makefile::finish_rule`] its text is appended in
/// one piece.
pub struct Rule {
    silent: bool,
    out: String,
}

impl Rule {
    fn new(target: &str, deps: &str, silent: bool) -> Self {
        let mut out = String::new();
        out.push_str(target);
        out.push_str(": ");
        out.push_str(deps);
        out.push('\n');
        Self { silent, out }
    }

    /// Writes `\t<prefix><cmd>\n`, where `<prefix>` is `@` when the
    /// Makefile was constructed silent, else empty.
    pub fn write_command(&mut self, cmd: &str) {
        let prefix = if self.silent { "@" } else { "" };
        self.out.push('\t');
        self.out.push_str(prefix);
        self.out.push_str(cmd);
        self.out.push('\n');
    }

    /// As [`Rule::write_command`] but prefixed with `-` so `make` ignores a
    /// non-zero exit code from this command.
    pub fn write_command_best_effort(&mut self, cmd: &str) {
        let prefix = if self.silent { "@" } else { "" };
        self.out.push_str("\t-");
        self.out.push_str(prefix);
        self.out.push_str(cmd);
        self.out.push('\n');
    }

    /// Standardized "echoing build step" preamble, e.g. `Compiling //dir:lib`.
    pub fn write_user_echo(&mut self, kind: &str, target: &str) {
        self.write_command(&format!("echo \"{kind} {target}\""));
    }

    pub fn out(&self) -> &str {
        &self.out
    }
}

/// An in-memory text buffer plus the current-rule machinery described
/// above. `silent` controls whether commands are prefixed with `@`.
pub struct Makefile {
    silent: bool,
    out: String,
}

impl Makefile {
    pub fn new(silent: bool) -> Self {
        Self {
            silent,
            out: String::new(),
        }
    }

    /// Writes `target: deps\n` to a fresh [`Rule`] buffer.
    pub fn start_rule(&self, target: &str, deps: &str) -> Rule {
        Rule::new(target, deps, self.silent)
    }

    /// Appends `rule`'s buffer to the main buffer.
    pub fn finish_rule(&mut self, rule: Rule) {
        self.out.push_str(rule.out());
    }

    /// Shorthand for an empty-body rule (phony or dependency-only).
    pub fn write_rule(&mut self, target: &str, deps: &str) {
        let rule = self.start_rule(target, deps);
        self.finish_rule(rule);
    }

    /// Raw write to the main buffer.
    pub fn append(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Escapes `$` to `$$` so the string survives a pass through `make`'s
    /// own variable expansion.
    pub fn escape(s: &str) -> String {
        s.replace('$', "$$")
    }

    pub fn out(&self) -> &str {
        &self.out
    }

    pub fn into_out(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rule_writes_silent_commands() {
        let mf = Makefile::new(true);
        let mut rule = mf.start_rule("out.o", "out.c");
        rule.write_command("gcc -c out.c -o out.o");
        assert_eq!(rule.out(), "out.o: out.c\n\t@gcc -c out.c -o out.o\n");
    }

    #[test]
    fn rule_best_effort_prefixes_dash() {
        let mf = Makefile::new(false);
        let mut rule = mf.start_rule("clean", "");
        rule.write_command_best_effort("rm -rf obj");
        assert_eq!(rule.out(), "clean: \n\t-rm -rf obj\n");
    }

    #[test]
    fn finish_rule_appends_in_order() {
        let mut mf = Makefile::new(true);
        let r1 = mf.start_rule("a", "");
        let r2 = mf.start_rule("b", "a");
        mf.finish_rule(r1);
        mf.finish_rule(r2);
        assert_eq!(mf.out(), "a: \nb: a\n");
    }

    #[test]
    fn escape_doubles_dollar_signs() {
        assert_eq!(Makefile::escape("$(FOO)"), "$$(FOO)");
    }
}
