//! Helper binary invoked by `pg_embedded_setup_unpriv` when the suites run as root.
//!
//! The library drops privileges and runs the worker with an operation
//! (`setup`, `start`, `stop`, `cleanup`, or `cleanup-full`) plus the path of
//! a JSON [`WorkerPayload`]. Payload environment variables are applied by
//! re-running the worker as a child process with that environment; the
//! process-wide environment of a running worker is never mutated.

use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use color_eyre::eyre::{Context, Report, Result, eyre};
use pg_embedded_setup_unpriv::worker::{PlainSecret, WorkerPayload};
use postgresql_embedded::{PostgreSQL, Settings, Status};
use tokio::runtime::Builder;

/// Set on the child run, which already carries the payload environment.
const PAYLOAD_ENV_APPLIED: &str = "SOCIAL_PG_WORKER_ENV_APPLIED";

type PayloadEnvironment = [(String, Option<PlainSecret>)];

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    run_worker(env::args_os())
}

fn run_worker(mut args: impl Iterator<Item = OsString>) -> Result<ExitCode> {
    let _program = args.next();
    let op_arg = args
        .next()
        .ok_or_else(|| eyre!("missing operation argument"))?;
    let operation = Operation::parse(&op_arg)?;
    let config_path = PathBuf::from(
        args.next()
            .ok_or_else(|| eyre!("missing config path argument"))?,
    );
    if let Some(extra) = args.next() {
        return Err(eyre!(
            "unexpected extra argument: {}; expected only operation and config path",
            extra.to_string_lossy()
        ));
    }

    let payload = load_payload(&config_path)?;
    if needs_environment(&payload.environment, env::var_os(PAYLOAD_ENV_APPLIED).is_some()) {
        return rerun_with_environment(&op_arg, &config_path, &payload.environment);
    }

    let settings = payload
        .settings
        .into_settings()
        .map_err(|err| Report::new(err).wrap_err("failed to rebuild postgres settings"))?;
    execute(operation, settings)?;
    Ok(ExitCode::SUCCESS)
}

fn load_payload(path: &Path) -> Result<WorkerPayload> {
    let payload =
        fs::read(path).with_context(|| format!("failed to read worker config at {path:?}"))?;
    serde_json::from_slice(&payload)
        .with_context(|| format!("failed to parse worker config at {path:?}"))
}

fn needs_environment(environment: &PayloadEnvironment, already_applied: bool) -> bool {
    !environment.is_empty() && !already_applied
}

fn rerun_with_environment(
    op_arg: &OsStr,
    config_path: &Path,
    environment: &PayloadEnvironment,
) -> Result<ExitCode> {
    let exe = env::current_exe().wrap_err("failed to locate the pg_worker executable")?;
    let mut child = Command::new(exe);
    child
        .arg(op_arg)
        .arg(config_path)
        .env(PAYLOAD_ENV_APPLIED, "1");
    for (key, value) in environment {
        match value {
            Some(value) => child.env(key, value.expose()),
            None => child.env_remove(key),
        };
    }

    let status = child
        .status()
        .wrap_err("failed to run pg_worker with the payload environment")?;
    Ok(status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .map_or(ExitCode::FAILURE, ExitCode::from))
}

fn execute(operation: Operation, settings: Settings) -> Result<()> {
    let lifecycle = match operation {
        Operation::Cleanup { full: false } => return remove_dirs(&[settings.data_dir]),
        Operation::Cleanup { full: true } => {
            return remove_dirs(&[settings.data_dir, settings.installation_dir]);
        }
        Operation::Lifecycle(lifecycle) => lifecycle,
    };

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build pg_worker runtime")?;
    let data_marker = settings.data_dir.join("PG_VERSION");
    let mut postgres = PostgreSQL::new(settings);
    runtime
        .block_on(async {
            match lifecycle {
                Lifecycle::Setup => setup(&mut postgres, &data_marker).await,
                Lifecycle::Start => start(&mut postgres, &data_marker).await,
                Lifecycle::Stop => stop(&mut postgres).await,
            }
        })
        .with_context(|| format!("postgresql_embedded::{operation} failed"))?;

    if lifecycle == Lifecycle::Start {
        // Dropping the handle would stop the server the library just asked for.
        std::mem::forget(postgres);
    }
    Ok(())
}

async fn setup(postgres: &mut PostgreSQL, data_marker: &Path) -> postgresql_embedded::Result<()> {
    if data_marker.is_file() && postgres.status() != Status::NotInstalled {
        return Ok(());
    }
    postgres.setup().await
}

async fn start(postgres: &mut PostgreSQL, data_marker: &Path) -> postgresql_embedded::Result<()> {
    setup(postgres, data_marker).await?;
    if postgres.status() == Status::Started {
        return Ok(());
    }
    postgres.start().await
}

async fn stop(postgres: &mut PostgreSQL) -> postgresql_embedded::Result<()> {
    if postgres.status() != Status::Started {
        return Ok(());
    }
    postgres.stop().await
}

fn remove_dirs(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        match fs::remove_dir_all(path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(Report::new(err).wrap_err(format!("failed to remove {path:?}")));
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Setup,
    Start,
    Stop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operation {
    Lifecycle(Lifecycle),
    Cleanup { full: bool },
}

impl Operation {
    fn parse(raw: &OsStr) -> Result<Self> {
        match raw.to_string_lossy().as_ref() {
            "setup" => Ok(Self::Lifecycle(Lifecycle::Setup)),
            "start" => Ok(Self::Lifecycle(Lifecycle::Start)),
            "stop" => Ok(Self::Lifecycle(Lifecycle::Stop)),
            "cleanup" => Ok(Self::Cleanup { full: false }),
            "cleanup-full" => Ok(Self::Cleanup { full: true }),
            other => Err(eyre!(
                "unknown pg_worker operation '{other}'; valid operations are setup, start, \
                 stop, cleanup, and cleanup-full"
            )),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lifecycle(Lifecycle::Setup) => "setup",
            Self::Lifecycle(Lifecycle::Start) => "start",
            Self::Lifecycle(Lifecycle::Stop) => "stop",
            Self::Cleanup { full: false } => "cleanup",
            Self::Cleanup { full: true } => "cleanup-full",
        })
    }
}
