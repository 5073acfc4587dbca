use ::clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const SENSORS_COMMAND: &str = "sensors";
pub const COMMAND_TIMEOUT_SECS: u64 = 2;
pub const PACKAGE_ENERGY_PATH: &str = "/sys/class/powercap/intel-rapl:0/energy_uj";
pub const CORE_ENERGY_PATH: &str = "/sys/class/powercap/intel-rapl:0:0/energy_uj";

/// Runtime settings for the sensor registry. The defaults are what the host
/// expects; the flags only exist to point the readers somewhere else.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub sensors_command: String,
    pub command_timeout: Duration,
    pub package_energy_path: PathBuf,
    pub core_energy_path: PathBuf,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            sensors_command: String::from(SENSORS_COMMAND),
            command_timeout: Duration::from_secs(COMMAND_TIMEOUT_SECS),
            package_energy_path: PathBuf::from(PACKAGE_ENERGY_PATH),
            core_energy_path: PathBuf::from(CORE_ENERGY_PATH),
        }
    }
}

impl Configuration {
    /// Build the configuration from the process command line.
    #[must_use]
    pub fn from_args() -> Self {
        CLI::parse().into()
    }
}

impl From<CLI> for Configuration {
    fn from(args: CLI) -> Self {
        Configuration {
            sensors_command: args.sensors_command,
            command_timeout: Duration::from_secs(args.command_timeout),
            package_energy_path: args.package_energy,
            core_energy_path: args.core_energy,
        }
    }
}

/*
  >>> ATTENTION <<<

    When updating this structure, you probably want to update
    the Configuration structure (and its implementation) too.
*/

#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
pub struct CLI {
    #[arg(
        long,
        default_value = SENSORS_COMMAND,
        value_name = "CMD",
        help = "Hardware sensor command, run without arguments, whose output carries the GPU PPT line"
    )]
    sensors_command: String,
    #[arg(
        long = "command-timeout-secs",
        default_value_t = COMMAND_TIMEOUT_SECS,
        value_name = "SECS",
        help = "Number of seconds to wait for the sensors command before reporting 0"
    )]
    command_timeout: u64,
    #[arg(
        long,
        default_value = PACKAGE_ENERGY_PATH,
        value_name = "PATH",
        help = "RAPL package energy counter, in µJ"
    )]
    package_energy: PathBuf,
    #[arg(
        long,
        default_value = CORE_ENERGY_PATH,
        value_name = "PATH",
        help = "RAPL core energy counter, in µJ"
    )]
    core_energy: PathBuf,
}
