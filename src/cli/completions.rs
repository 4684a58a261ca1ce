//! Shell completions module for devstation
//!
//! Provides shell completion scripts for bash, zsh, fish, powershell, and elvish.

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use std::io;

use crate::cli::Cli;

/// Arguments for the completions command
#[derive(Parser, Debug, Clone)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Print installation instructions instead of the script
    #[arg(long)]
    pub instructions: bool,
}

impl CompletionsArgs {
    pub fn execute(&self) -> i32 {
        if self.instructions {
            print_installation_instructions(self.shell);
        } else {
            generate_completions(self.shell);
        }
        0
    }
}

/// Generate shell completions and write to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "devstation", &mut io::stdout());
}

/// Get completions as a string
pub fn get_completions(shell: Shell) -> String {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    generate(shell, &mut cmd, "devstation", &mut buf);
    String::from_utf8(buf).unwrap_or_default()
}

/// Print installation instructions for completions
pub fn print_installation_instructions(shell: Shell) {
    match shell {
        Shell::Bash => {
            println!("# Add to ~/.bashrc:");
            println!("eval \"$(devstation completions bash)\"");
            println!();
            println!("# Or save to the completions directory:");
            println!(
                "devstation completions bash > ~/.local/share/bash-completion/completions/devstation"
            );
        }
        Shell::Zsh => {
            println!("# Save into a directory on your fpath:");
            println!("mkdir -p ~/.zsh/completions");
            println!("devstation completions zsh > ~/.zsh/completions/_devstation");
            println!();
            println!("# Then in ~/.zshrc:");
            println!("fpath=(~/.zsh/completions $fpath)");
            println!("autoload -Uz compinit && compinit");
        }
        Shell::Fish => {
            println!("devstation completions fish > ~/.config/fish/completions/devstation.fish");
        }
        Shell::PowerShell => {
            println!("# Add to your PowerShell profile:");
            println!("Invoke-Expression (& devstation completions powershell | Out-String)");
        }
        Shell::Elvish => {
            println!("# Add to ~/.elvish/rc.elv:");
            println!("eval (devstation completions elvish | slurp)");
        }
        _ => {
            println!("# Refer to your shell's documentation for completion installation.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_completions() {
        let completions = get_completions(Shell::Bash);
        assert!(completions.contains("devstation"));
        assert!(completions.contains("synth"));
    }

    #[test]
    fn test_zsh_completions() {
        let completions = get_completions(Shell::Zsh);
        assert!(completions.contains("_devstation"));
    }
}
