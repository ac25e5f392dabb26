// src/exec/invocation.rs

//! Turning a [`CommandSpec`] into an OS process invocation.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::types::CommandSpec;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Program and argument vector for one process launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// With a shell, `executable arguments` becomes a single command line
    /// passed to the shell's run-string flag (`-c`, or `/c` on Windows).
    /// Without one, the executable is launched directly and the argument
    /// string is split shell-style.
    pub fn for_command(command: &CommandSpec) -> Self {
        match command.effective_shell() {
            Some(shell) => {
                let line = command.command_line();
                if cfg!(windows) {
                    Self {
                        program: windows_shell_executable(shell),
                        args: vec!["/c".to_string(), line],
                    }
                } else {
                    Self {
                        program: shell.to_string(),
                        args: vec!["-c".to_string(), line],
                    }
                }
            }
            None => Self {
                program: command.executable.trim().to_string(),
                args: split_arguments(&command.arguments),
            },
        }
    }

    /// Build the Tokio command: working directory, environment overlay, piped
    /// stdout/stderr, no stdin and no console window.
    pub fn to_command(&self, command: &CommandSpec, working_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(working_dir)
            .envs(&command.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        cmd
    }
}

fn windows_shell_executable(shell: &str) -> String {
    match shell.to_lowercase().as_str() {
        "cmd" => "cmd.exe".to_string(),
        "powershell" | "ps" => "powershell.exe".to_string(),
        "bash" => "bash.exe".to_string(),
        _ => shell.to_string(),
    }
}

/// Split an argument string on whitespace, honouring quotes.
///
/// Single quotes are literal. Inside double quotes a backslash escapes only
/// `"` and `\`; everywhere else backslashes are kept, so Windows paths pass
/// through untouched. An unterminated quote runs to the end of the input.
pub fn split_arguments(arguments: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = arguments.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some('\'') => {
                if c == '\'' {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            Some(_) => match c {
                '"' => quote = None,
                '\\' if matches!(chars.peek(), Some('"') | Some('\\')) => {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                }
                _ => current.push(c),
            },
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        args.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    if in_token {
        args.push(current);
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(split_arguments("  -la   /tmp "), vec!["-la", "/tmp"]);
        assert!(split_arguments("   ").is_empty());
    }

    #[test]
    fn quotes_group_words() {
        assert_eq!(
            split_arguments(r#"commit -m "fix the \"thing\"" 'a b'"#),
            vec!["commit", "-m", r#"fix the "thing""#, "a b"]
        );
        assert_eq!(split_arguments(r#"say "" done"#), vec!["say", "", "done"]);
    }

    #[test]
    fn backslashes_outside_quotes_are_literal() {
        assert_eq!(split_arguments(r"C:\work\dir x"), vec![r"C:\work\dir", "x"]);
    }

    #[test]
    fn direct_invocation_uses_executable() {
        let mut cmd = CommandSpec::new("id", "echo", " echo ");
        cmd.arguments = "Hello World".into();

        let inv = Invocation::for_command(&cmd);
        assert_eq!(inv.program, "echo");
        assert_eq!(inv.args, vec!["Hello", "World"]);
    }

    #[cfg(unix)]
    #[test]
    fn shell_invocation_wraps_command_line() {
        let mut cmd = CommandSpec::new("id", "echo", "echo");
        cmd.arguments = "$HOME".into();
        cmd.shell = Some("bash".into());

        let inv = Invocation::for_command(&cmd);
        assert_eq!(inv.program, "bash");
        assert_eq!(inv.args, vec!["-c", "echo $HOME"]);
    }

    #[test]
    fn blank_shell_means_direct() {
        let mut cmd = CommandSpec::new("id", "ls", "ls");
        cmd.shell = Some("  ".into());
        assert_eq!(Invocation::for_command(&cmd).program, "ls");
    }
}
