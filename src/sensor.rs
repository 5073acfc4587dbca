use crate::cli::Configuration;
use crate::gpu::GpuPower;
use crate::rapl::{Domain, RaplPower};
use crate::{PowerSource, Reading};
use std::str::FromStr;

const UNIT: &str = "W";
const MIN: &str = "0";
const MAX: &str = "500";
const VARIANT_TYPE: &str = "double";
const INITIAL_VALUE: &str = "0";

/// The sensors offered to the host, in the order they are listed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Sensor {
    AmdGpu,
    RaplPackage,
    RaplCore,
}

impl Sensor {
    pub const ALL: [Sensor; 3] = [Sensor::AmdGpu, Sensor::RaplPackage, Sensor::RaplCore];

    /// Identifier used on the wire.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Sensor::AmdGpu => "amd_gpu",
            Sensor::RaplPackage => "rapl_package_0",
            Sensor::RaplCore => "rapl_core",
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Sensor::AmdGpu => "GPU Power",
            Sensor::RaplPackage => "CPU Package",
            Sensor::RaplCore => "CPU Cores",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Sensor::AmdGpu => "AMD GPU PPT power consumption",
            Sensor::RaplPackage => "Total CPU package power",
            Sensor::RaplCore => "CPU cores power",
        }
    }

    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Sensor::ALL.into_iter().find(|sensor| sensor.id() == id)
    }
}

/// Properties the host may ask for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Property {
    Name,
    Description,
    Unit,
    Min,
    Max,
    VariantType,
    InitialValue,
    Value,
}

impl FromStr for Property {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Property::Name),
            "description" => Ok(Property::Description),
            "unit" => Ok(Property::Unit),
            "min" => Ok(Property::Min),
            "max" => Ok(Property::Max),
            "variant_type" => Ok(Property::VariantType),
            "initial_value" => Ok(Property::InitialValue),
            "value" => Ok(Property::Value),
            _ => Err(()),
        }
    }
}

/// Owns one reader per sensor and answers property lookups.
#[derive(Debug)]
pub struct Registry {
    gpu: GpuPower,
    package: RaplPower,
    core: RaplPower,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}

impl Registry {
    #[must_use]
    pub fn new(config: Configuration) -> Self {
        Self {
            gpu: GpuPower::new(&config.sensors_command, config.command_timeout),
            package: RaplPower::new(Domain::Package, config.package_energy_path),
            core: RaplPower::new(Domain::Core, config.core_energy_path),
        }
    }

    /// Sensor ids joined with tabs, as answered to `?`.
    #[must_use]
    pub fn list(&self) -> String {
        Sensor::ALL.map(Sensor::id).join("\t")
    }

    /// Take a measurement from the given sensor.
    pub fn read(&mut self, sensor: Sensor) -> Reading {
        match sensor {
            Sensor::AmdGpu => self.gpu.read(),
            Sensor::RaplPackage => self.package.read(),
            Sensor::RaplCore => self.core.read(),
        }
    }

    /// `get_property`
    ///
    /// Look up `property` of the sensor called `id`. Unknown ids and unknown
    /// property names give an empty string. Only `value` touches the hardware.
    pub fn get_property(&mut self, id: &str, property: &str) -> String {
        let (Some(sensor), Ok(property)) = (Sensor::from_id(id), property.parse::<Property>())
        else {
            return String::new();
        };
        match property {
            Property::Name => String::from(sensor.name()),
            Property::Description => String::from(sensor.description()),
            Property::Unit => String::from(UNIT),
            Property::Min => String::from(MIN),
            Property::Max => String::from(MAX),
            Property::VariantType => String::from(VARIANT_TYPE),
            Property::InitialValue => String::from(INITIAL_VALUE),
            Property::Value => self.read(sensor).to_string(),
        }
    }
}
