//! External commands (mount, unmount, eject, open) run as async operations.

use std::collections::BTreeMap;
use std::io;
use std::process::{ExitStatus, Output};

use driveicon_async_op::{AsyncAdapter, Completion, MergeDefaults, OperationFuture};
use tokio::process::Command;
use tracing::debug;

/// Argument vector plus environment for one command invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs {
    pub argv: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl CommandArgs {
    /// `base` followed by `extra`.
    pub fn new(base: &[String], extra: &str) -> Self {
        let mut argv = base.to_vec();
        argv.push(extra.to_string());
        Self {
            argv,
            env: BTreeMap::new(),
        }
    }
}

impl MergeDefaults for CommandArgs {
    fn merge_over(self, defaults: &Self) -> Self {
        let argv = if self.argv.is_empty() {
            defaults.argv.clone()
        } else {
            self.argv
        };
        Self {
            argv,
            env: self.env.merge_over(&defaults.env),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("empty command line")]
    Empty,

    #[error("failed to spawn '{program}': {source}")]
    Spawn { program: String, source: io::Error },

    #[error("'{program}' exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Raw completion handle: the program name and what running it produced.
pub type Finished = (String, io::Result<Output>);

/// Runs [`CommandArgs`] and resolves to the command's trimmed stdout.
#[derive(Clone)]
pub struct CommandRunner {
    adapter: AsyncAdapter<CommandArgs, Finished, String, CommandError>,
}

impl CommandRunner {
    /// Runner spawning commands on the tokio runtime.
    ///
    /// Every command runs with `LC_ALL=C` unless the call overrides it, so
    /// logged error output is not localized.
    pub fn new() -> Self {
        let defaults = CommandArgs {
            argv: Vec::new(),
            env: BTreeMap::from([("LC_ALL".to_string(), "C".to_string())]),
        };
        Self {
            adapter: AsyncAdapter::new(
                |args: CommandArgs, _cancel, done: Completion<Finished>| spawn(args, done),
                finish,
                defaults,
            ),
        }
    }

    pub fn run(&self, args: CommandArgs) -> OperationFuture<String, CommandError> {
        self.adapter.call(args)
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn(args: CommandArgs, done: Completion<Finished>) {
    let Some((program, rest)) = args.argv.split_first() else {
        done.complete((String::new(), Err(io::ErrorKind::InvalidInput.into())));
        return;
    };

    debug!(argv = ?args.argv, "running command");
    let mut command = Command::new(program);
    command.args(rest).envs(&args.env).kill_on_drop(true);
    let program = program.clone();
    tokio::spawn(async move {
        let output = command.output().await;
        done.complete((program, output));
    });
}

fn finish((program, output): Finished) -> Result<String, CommandError> {
    if program.is_empty() {
        return Err(CommandError::Empty);
    }
    let output = output.map_err(|source| CommandError::Spawn {
        program: program.clone(),
        source,
    })?;
    if !output.status.success() {
        return Err(CommandError::Exit {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
