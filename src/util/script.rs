//! Shell script text assembly.

/// Default interpreter for generated scripts.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Header line marking a script as generated.
pub const GENERATED_DISCLAIMER: &str =
    "# This script was generated by rigging. Do not edit it by hand; changes are lost on the next build.";

/// Incrementally builds a fail-fast shell script.
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    lines: Vec<String>,
}

impl ScriptBuilder {
    /// Start a script with a shebang for `shell`, `set -e` and the
    /// generated-file disclaimer.
    pub fn new(shell: &str) -> Self {
        ScriptBuilder {
            lines: vec![
                format!("#!{}", shell),
                "set -e".to_string(),
                String::new(),
                GENERATED_DISCLAIMER.to_string(),
                String::new(),
            ],
        }
    }

    /// Append a single line.
    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    /// Append an empty line.
    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    /// Append an `echo` of `message`.
    pub fn echo(&mut self, message: &str) -> &mut Self {
        if message.is_empty() {
            self.lines.push("echo".to_string());
        } else {
            self.lines.push(format!("echo {}", quote(message)));
        }
        self
    }

    /// Append a banner comment identifying a section.
    pub fn banner(&mut self, title: &str) -> &mut Self {
        self.lines.push(format!("# ----- {} -----", title));
        self
    }

    /// Append a multi-line snippet verbatim.
    pub fn snippet(&mut self, text: &str) -> &mut Self {
        self.lines.extend(text.trim_end_matches('\n').lines().map(|l| l.to_string()));
        self
    }

    /// Finish the script.
    pub fn build(&self) -> String {
        let mut script = self.lines.join("\n");
        script.push('\n');
        script
    }
}

/// Quote `value` for POSIX shells using single quotes.
pub fn quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '+' | ','))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
