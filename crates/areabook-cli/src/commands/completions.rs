use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::{Cli, CompletionShell};
use crate::error::CliError;

const BIN_NAME: &str = "areabook";

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Self::Bash,
            CompletionShell::Zsh => Self::Zsh,
            CompletionShell::Fish => Self::Fish,
            CompletionShell::PowerShell => Self::PowerShell,
        }
    }
}

/// Writes the completion script to `output_path`, or stdout when absent.
pub fn run_completions(shell: CompletionShell, output_path: Option<&Path>) -> Result<(), CliError> {
    match output_path {
        Some(path) => {
            let mut file = BufWriter::new(File::create(path)?);
            write_completions(shell, &mut file);
            file.flush()?;
            println!("{}", path.display());
        }
        None => write_completions(shell, &mut io::stdout().lock()),
    }
    Ok(())
}

pub fn write_completions(shell: CompletionShell, out: &mut dyn Write) {
    let mut command = Cli::command();
    generate(Shell::from(shell), &mut command, BIN_NAME, out);
}
