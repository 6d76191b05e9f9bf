//! Format a volume through the disk daemon.
//!
//! `format-volume --device-file /dev/sdb1`
//!
//! Exits 0 once the volume is formatted and mounted, 1 on any failure,
//! including the user declining.

use clap::error::ErrorKind;
use clap::Parser;
use dmconf::disks::{DiskError, FormatTool, UDisks2Service, VolumeInfo};
use std::env;
use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Format a volume")]
struct Cli {
    /// Device to format.
    #[arg(long = "device-file", value_name = "DEVICE")]
    device_file: PathBuf,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Ask on the terminal. Anything but an explicit yes declines.
fn confirm_on_terminal(volume: &VolumeInfo) -> bool {
    let current = if volume.id_type.is_empty() {
        String::new()
    } else {
        format!(" (currently {})", volume.id_type)
    };
    print!(
        "All data on {}{} will be lost. Format it? [y/N] ",
        volume.device_file, current
    );
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn run(device_file: &str) -> Result<String, DiskError> {
    let service = UDisks2Service::connect()?;
    FormatTool::new(service).run(device_file, confirm_on_terminal)
}

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;

/// Parse the command line, or give the exit status to stop with.
///
/// Usage errors exit 1 rather than clap's usual 2.
fn parse_args<I, T>(args: I) -> Result<Cli, u8>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(cli),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            Err(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Could not parse arguments: {e}");
            Err(EXIT_FAILURE)
        }
    }
}

/// Tell the user how the run ended and pick the exit status.
fn report(device_file: &str, result: Result<String, DiskError>) -> u8 {
    match result {
        Ok(mount_point) => {
            println!("{device_file} formatted and mounted at {mount_point}");
            EXIT_SUCCESS
        }
        Err(DiskError::Cancelled) => {
            tracing::info!(device_file = %device_file, "format cancelled");
            EXIT_FAILURE
        }
        Err(e) => {
            eprintln!("Error formatting {device_file}: {e}");
            EXIT_FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = match parse_args(env::args_os()) {
        Ok(cli) => cli,
        Err(status) => return ExitCode::from(status),
    };

    init_logging();

    let device_file = cli.device_file.to_string_lossy().into_owned();
    let result = run(&device_file);
    ExitCode::from(report(&device_file, result))
}
