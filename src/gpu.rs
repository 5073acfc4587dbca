use crate::{Error, PowerSource, Reading};
use log::trace;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// `sensors` prints the amdgpu Package Power Tracking line as
/// `PPT:           7.00 mW`
pub const PPT_MARKER: &str = "PPT:";

const POWER_DECIMALS: i32 = 3;
const MILLI: f64 = 1000.0;

/// AMD GPU package power, scraped from the output of a hardware sensor
/// command.
#[derive(Debug, Clone)]
pub struct GpuPower {
    command: String,
    timeout: Duration,
}

impl GpuPower {
    #[must_use]
    pub fn new(command: &str, timeout: Duration) -> Self {
        Self {
            command: String::from(command),
            timeout,
        }
    }

    /// Run the sensors command and pick the PPT value out of its output.
    pub fn sample(&self) -> Result<Reading, Error> {
        let output = self.run_command()?;
        let milliwatts = parse_ppt(&output)?;
        trace!("GPU PPT: {milliwatts} mW");
        Ok(Reading::watts(milliwatts / MILLI, POWER_DECIMALS))
    }

    /// Run the command with no arguments and return its stdout. The exit
    /// status is ignored; `sensors` exits non-zero when a single chip fails
    /// yet still prints the others.
    ///
    /// Stdout is drained on its own thread while the caller waits on the
    /// channel, so a command that fills the pipe is never stalled by us.
    fn run_command(&self) -> Result<String, Error> {
        let command_error = |source| Error::Command {
            command: self.command.clone(),
            source,
        };
        let mut child = Command::new(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(command_error)?;

        let (tx, rx) = mpsc::channel();
        if let Some(mut pipe) = child.stdout.take() {
            thread::spawn(move || {
                let mut stdout = Vec::new();
                let result = pipe.read_to_end(&mut stdout).map(|_| stdout);
                // the receiver is gone once the command has timed out
                let _ = tx.send(result);
            });
        }

        let stdout = match rx.recv_timeout(self.timeout) {
            Ok(result) => {
                reap(&mut child);
                result.map_err(command_error)?
            }
            Err(RecvTimeoutError::Timeout) => {
                trace!("GPU: {} timed out, killing it", self.command);
                reap(&mut child);
                return Err(Error::Timeout(self.timeout));
            }
            Err(RecvTimeoutError::Disconnected) => {
                reap(&mut child);
                Vec::new()
            }
        };
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

impl PowerSource for GpuPower {
    fn read(&mut self) -> Reading {
        self.sample().into()
    }
}

/// Make sure the command is gone. Its stdout is already closed or abandoned
/// at this point, so anything still running is killed.
fn reap(child: &mut Child) {
    if let Ok(Some(_status)) = child.try_wait() {
        return;
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Find the first line carrying the PPT marker and parse the number that
/// follows it, in mW.
pub fn parse_ppt(output: &str) -> Result<f64, Error> {
    let after = output
        .lines()
        .find_map(|line| line.split_once(PPT_MARKER).map(|(_, after)| after))
        .ok_or_else(|| Error::MarkerNotFound(String::from(PPT_MARKER)))?;
    let field = after.split_whitespace().next().unwrap_or_default();
    field
        .parse::<f64>()
        .ok()
        .filter(|milliwatts| milliwatts.is_finite())
        .ok_or_else(|| Error::InvalidPower(String::from(field)))
}
