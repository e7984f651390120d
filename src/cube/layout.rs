use serde::{Deserialize, Serialize};

/// A quantity stored in an inversion container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parameter {
    /// Electron number density.
    ElectronDensity,
    Temperature,
    /// Line-of-sight bulk velocity.
    Velocity,
    ElectronDensityError,
    TemperatureError,
    VelocityError,
    /// Height grid of the depth axis.
    Depth,
}

impl Parameter {
    /// The stored quantities, in container order.
    pub const ALL: [Parameter; 7] = [
        Parameter::ElectronDensity,
        Parameter::Temperature,
        Parameter::Velocity,
        Parameter::ElectronDensityError,
        Parameter::TemperatureError,
        Parameter::VelocityError,
        Parameter::Depth,
    ];

    fn name(self) -> &'static str {
        match self {
            Parameter::ElectronDensity => "ne",
            Parameter::Temperature => "temperature",
            Parameter::Velocity => "vel",
            Parameter::ElectronDensityError => "ne_err",
            Parameter::TemperatureError => "temperature_err",
            Parameter::VelocityError => "vel_err",
            Parameter::Depth => "z",
        }
    }
}

/// How a container names its arrays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyLayout {
    /// Bare names at the top level: `ne`, `temperature`, ..., `z`.
    #[default]
    Flat,
    /// Names under an `/atmos` group: `/atmos/ne`, ..., `/atmos/z`.
    Atmos,
}

impl KeyLayout {
    pub fn key(self, parameter: Parameter) -> String {
        match self {
            KeyLayout::Flat => parameter.name().to_string(),
            KeyLayout::Atmos => format!("/atmos/{}", parameter.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_keys() {
        assert_eq!(KeyLayout::Flat.key(Parameter::Temperature), "temperature");
        assert_eq!(KeyLayout::Atmos.key(Parameter::VelocityError), "/atmos/vel_err");
        assert_eq!(KeyLayout::Atmos.key(Parameter::Depth), "/atmos/z");
    }

    #[test]
    fn test_keys_are_distinct() {
        let mut keys: Vec<String> = Parameter::ALL
            .iter()
            .map(|&p| KeyLayout::Flat.key(p))
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), Parameter::ALL.len());
    }
}
