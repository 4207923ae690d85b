mod commands;
mod fault;
mod session;
mod sim;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use transcoder_core::fault::{FaultPolicy, halt};

use fault::{HostBoard, HostDelay};
use session::{Session, SessionOptions, SettingsBackend};

/// Blink frames shown before the emulated watchdog resets the board.
const FAULT_FRAMES: usize = 6;

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: transcoder-emulator [--settings <path>] [--keep-running]");
        process::exit(2);
    });

    let mut session = match Session::new(options) {
        Ok(session) => session,
        Err(fault) => {
            eprintln!("boot failed: {fault}");
            process::exit(1);
        }
    };

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut line = String::new();

    writeln!(
        writer,
        "Transcoder emulator ready. Type `help` for commands or `exit` to quit."
    )?;
    for boot_line in session.take_boot_lines() {
        writeln!(writer, "{boot_line}")?;
    }

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        let response = session.handle_command(trimmed);
        for output in &response.lines {
            writeln!(writer, "{output}")?;
        }
        if let Some(fault) = response.halted {
            let config = session.controller().config().fault;
            let mut board = HostBoard::new(&mut writer, FAULT_FRAMES);
            halt(fault, &mut board, &mut HostDelay, &config);
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options() -> Result<SessionOptions, String> {
    let mut options = SessionOptions::default();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--settings=") {
            options.settings = SettingsBackend::File(PathBuf::from(value));
        } else if arg == "--settings" {
            let value = args
                .next()
                .ok_or_else(|| "Expected path after --settings".to_string())?;
            options.settings = SettingsBackend::File(PathBuf::from(value));
        } else if arg == "--keep-running" {
            options.fault_policy = FaultPolicy::Continue;
        } else {
            return Err(format!("Unknown argument `{arg}`"));
        }
    }
    Ok(options)
}
