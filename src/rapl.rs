use crate::{Error, PowerSource, Reading};
use chrono::{DateTime, Local};
use log::trace;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

// Power is reported in Watts to 2 decimal places
const POWER_DECIMALS: i32 = 2;
const MICRO: f64 = 1_000_000.0;

/// The two RAPL domains the host knows about.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Domain {
    /// Whole CPU package, `intel-rapl:0`
    Package,
    /// CPU cores only, `intel-rapl:0:0`
    Core,
}

impl Display for Domain {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Domain::Package => write!(f, "package"),
            Domain::Core => write!(f, "core"),
        }
    }
}

/// One sample of a cumulative energy counter.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EnergySample {
    /// Counter value in µJ
    pub energy_uj: u64,
    pub timestamp: DateTime<Local>,
}

impl EnergySample {
    #[must_use]
    pub fn new(energy_uj: u64, timestamp: DateTime<Local>) -> Self {
        Self {
            energy_uj,
            timestamp,
        }
    }
}

/// Energy-to-power state for a single domain.
///
/// Holds the previous sample only. Power is the energy consumed between the
/// previous sample and the current one divided by the time between them, so
/// the first sample after start-up can never produce a measurement.
#[derive(Debug, Default)]
pub struct RaplDomain {
    last: Option<EnergySample>,
}

impl RaplDomain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_sample(&self) -> Option<EnergySample> {
        self.last
    }

    /// `update`
    ///
    /// Feed the next counter sample and get the average power since the
    /// previous one. The sample always replaces the stored one, whichever
    /// branch is taken.
    pub fn update(&mut self, sample: EnergySample) -> Reading {
        let Some(previous) = self.last.replace(sample) else {
            return Reading::Unavailable;
        };

        // to_std() refuses negative intervals; zero is refused below
        let elapsed = match sample.timestamp.signed_duration_since(previous.timestamp).to_std() {
            Ok(elapsed) if !elapsed.is_zero() => elapsed.as_secs_f64(),
            _ => return Reading::Unavailable,
        };

        // A counter that went backwards has wrapped: count it as no energy used
        let energy_delta = sample.energy_uj.saturating_sub(previous.energy_uj);

        Reading::watts(energy_delta as f64 / elapsed / MICRO, POWER_DECIMALS)
    }
}

/// A RAPL domain backed by its sysfs energy file.
#[derive(Debug)]
pub struct RaplPower {
    domain: Domain,
    path: PathBuf,
    state: RaplDomain,
}

impl RaplPower {
    #[must_use]
    pub fn new(domain: Domain, path: impl Into<PathBuf>) -> Self {
        Self {
            domain,
            path: path.into(),
            state: RaplDomain::new(),
        }
    }

    /// Read the counter, then fold it into the domain state. A failed read
    /// leaves the state as it was.
    pub fn sample(&mut self) -> Result<Reading, Error> {
        let energy_uj = read_energy(&self.path)?;
        let sample = EnergySample::new(energy_uj, Local::now());
        trace!("RAPL {}: {} µJ at {}", self.domain, energy_uj, sample.timestamp);
        Ok(self.state.update(sample))
    }
}

impl PowerSource for RaplPower {
    fn read(&mut self) -> Reading {
        self.sample().into()
    }
}

/// Read a RAPL energy file, a single integer in µJ.
pub fn read_energy(path: &Path) -> Result<u64, Error> {
    let text = fs::read_to_string(path).map_err(|source| Error::EnergyRead {
        path: path.to_path_buf(),
        source,
    })?;
    let text = text.trim();
    text.parse()
        .map_err(|_| Error::InvalidEnergy(String::from(text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64, millis: u32) -> DateTime<Local> {
        Local.timestamp_opt(secs, millis * 1_000_000).unwrap()
    }

    fn counter_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("k10power-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_first_sample_is_unavailable() {
        let mut domain = RaplDomain::new();
        assert_eq!(domain.update(EnergySample::new(5_000_000, at(1_700_000_000, 0))), Reading::Unavailable);
        assert_eq!(domain.last_sample().unwrap().energy_uj, 5_000_000);
    }

    #[test]
    fn test_one_joule_per_second() {
        let mut domain = RaplDomain::new();
        domain.update(EnergySample::new(1_000_000, at(0, 0)));
        let reading = domain.update(EnergySample::new(2_000_000, at(1, 0)));
        assert_eq!(reading, Reading::Watts(1.0));
        assert_eq!(reading.to_string(), "1.0");
    }

    #[test]
    fn test_fractional_interval() {
        let mut domain = RaplDomain::new();
        domain.update(EnergySample::new(10_000_000, at(100, 0)));
        // 12.3456 J over 0.5 s
        let reading = domain.update(EnergySample::new(22_345_600, at(100, 500)));
        assert_eq!(reading.to_string(), "24.69");
    }

    #[test]
    fn test_counter_wrap_is_zero_watts() {
        let mut domain = RaplDomain::new();
        domain.update(EnergySample::new(262_143_328_850, at(10, 0)));
        let reading = domain.update(EnergySample::new(1_000, at(11, 0)));
        assert_eq!(reading.to_string(), "0.0");
    }

    #[test]
    fn test_same_timestamp_is_unavailable() {
        let mut domain = RaplDomain::new();
        domain.update(EnergySample::new(1_000_000, at(10, 0)));
        assert_eq!(domain.update(EnergySample::new(2_000_000, at(10, 0))), Reading::Unavailable);
    }

    #[test]
    fn test_clock_going_backwards_is_unavailable() {
        let mut domain = RaplDomain::new();
        domain.update(EnergySample::new(1_000_000, at(10, 0)));
        assert_eq!(domain.update(EnergySample::new(2_000_000, at(9, 0))), Reading::Unavailable);
        // the backwards sample still became the reference point
        let reading = domain.update(EnergySample::new(4_000_000, at(11, 0)));
        assert_eq!(reading.to_string(), "1.0");
    }

    #[test]
    fn test_read_energy_trims_newline() {
        let path = counter_file("trim", "123456789\n");
        assert_eq!(read_energy(&path).unwrap(), 123_456_789);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_read_energy_rejects_garbage() {
        let path = counter_file("garbage", "not a number\n");
        assert!(matches!(read_energy(&path), Err(Error::InvalidEnergy(_))));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file_reads_zero() {
        let mut rapl = RaplPower::new(Domain::Package, "/nonexistent/intel-rapl:0/energy_uj");
        assert!(matches!(rapl.sample(), Err(Error::EnergyRead { .. })));
        assert_eq!(rapl.read().to_string(), "0");
        assert_eq!(rapl.state.last_sample(), None);
    }

    #[test]
    fn test_file_backed_first_read_is_zero() {
        let path = counter_file("first", "1000000\n");
        let mut rapl = RaplPower::new(Domain::Core, &path);
        assert_eq!(rapl.read().to_string(), "0");
        assert_eq!(rapl.state.last_sample().unwrap().energy_uj, 1_000_000);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_domain_names() {
        assert_eq!(Domain::Package.to_string(), "package");
        assert_eq!(Domain::Core.to_string(), "core");
    }
}
