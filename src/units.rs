//! Physical units for quantity declarations.
//!
//! Unit strings follow the `symbol**power` convention joined by `*` and `/`,
//! for example `m**2`, `kg/m**3`, `rad**-1` or `m/s`. An empty string,
//! `unitless` or `-` denotes a dimensionless quantity.
//!
//! Every unit parses to a [`Dimension`] (exponents of length, mass, time,
//! temperature and angle) and a scale to SI. Two units are compatible when
//! their dimensions match; angle is tracked as its own dimension so that a
//! per-radian coefficient never silently feeds a dimensionless input.
//!
//! # Example
//!
//! ```
//! use aerograph::units::{Unit, conversion_factor};
//!
//! let factor = conversion_factor("ft**2", "m**2").unwrap();
//! assert!((factor - 0.09290304).abs() < 1e-12);
//!
//! // A slope per radian is a larger number than the same slope per degree
//! let slope = conversion_factor("rad**-1", "deg**-1").unwrap();
//! assert!((slope - std::f64::consts::PI / 180.0).abs() < 1e-15);
//!
//! assert!(Unit::parse("m").unwrap().is_compatible(&Unit::parse("ft").unwrap()));
//! assert!(conversion_factor("m", "s").is_err());
//! ```

use std::f64::consts::PI;

/// Errors raised while parsing or converting units.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("Unknown unit symbol '{0}'")]
    UnknownSymbol(String),
    #[error("Malformed unit expression '{0}'")]
    Malformed(String),
    #[error("Cannot convert '{from}' to '{to}'")]
    Incompatible { from: String, to: String },
}

/// Exponents of the base dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimension {
    pub length: i8,
    pub mass: i8,
    pub time: i8,
    pub temperature: i8,
    pub angle: i8,
}

impl Dimension {
    pub const NONE: Dimension = Dimension { length: 0, mass: 0, time: 0, temperature: 0, angle: 0 };

    const fn new(length: i8, mass: i8, time: i8, temperature: i8, angle: i8) -> Self {
        Dimension { length, mass, time, temperature, angle }
    }

    /// Exponents raised to `power`; `None` on exponent overflow.
    fn scaled(self, power: i8) -> Option<Self> {
        Some(Dimension {
            length: self.length.checked_mul(power)?,
            mass: self.mass.checked_mul(power)?,
            time: self.time.checked_mul(power)?,
            temperature: self.temperature.checked_mul(power)?,
            angle: self.angle.checked_mul(power)?,
        })
    }

    /// Product of two dimensions; `None` on exponent overflow.
    fn combined(self, other: Dimension) -> Option<Self> {
        Some(Dimension {
            length: self.length.checked_add(other.length)?,
            mass: self.mass.checked_add(other.mass)?,
            time: self.time.checked_add(other.time)?,
            temperature: self.temperature.checked_add(other.temperature)?,
            angle: self.angle.checked_add(other.angle)?,
        })
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Dimension::NONE
    }
}

const LENGTH: Dimension = Dimension::new(1, 0, 0, 0, 0);
const MASS: Dimension = Dimension::new(0, 1, 0, 0, 0);
const TIME: Dimension = Dimension::new(0, 0, 1, 0, 0);
const TEMPERATURE: Dimension = Dimension::new(0, 0, 0, 1, 0);
const ANGLE: Dimension = Dimension::new(0, 0, 0, 0, 1);
const VELOCITY: Dimension = Dimension::new(1, 0, -1, 0, 0);
const FORCE: Dimension = Dimension::new(1, 1, -2, 0, 0);
const PRESSURE: Dimension = Dimension::new(-1, 1, -2, 0, 0);
const ENERGY: Dimension = Dimension::new(2, 1, -2, 0, 0);
const POWER: Dimension = Dimension::new(2, 1, -3, 0, 0);

/// Symbol table: (symbol, scale to SI, dimension).
const SYMBOLS: &[(&str, f64, Dimension)] = &[
    ("m", 1.0, LENGTH),
    ("cm", 0.01, LENGTH),
    ("mm", 0.001, LENGTH),
    ("km", 1000.0, LENGTH),
    ("ft", 0.3048, LENGTH),
    ("inch", 0.0254, LENGTH),
    ("nmi", 1852.0, LENGTH),
    ("kg", 1.0, MASS),
    ("g", 0.001, MASS),
    ("lb", 0.453_592_37, MASS),
    ("s", 1.0, TIME),
    ("min", 60.0, TIME),
    ("h", 3600.0, TIME),
    ("K", 1.0, TEMPERATURE),
    ("degR", 5.0 / 9.0, TEMPERATURE),
    ("rad", 1.0, ANGLE),
    ("deg", PI / 180.0, ANGLE),
    ("kn", 1852.0 / 3600.0, VELOCITY),
    ("N", 1.0, FORCE),
    ("kN", 1000.0, FORCE),
    ("lbf", 4.448_221_615_260_5, FORCE),
    ("Pa", 1.0, PRESSURE),
    ("kPa", 1000.0, PRESSURE),
    ("bar", 1.0e5, PRESSURE),
    ("psi", 6_894.757_293_168, PRESSURE),
    ("J", 1.0, ENERGY),
    ("W", 1.0, POWER),
    ("kW", 1000.0, POWER),
    ("percent", 0.01, Dimension::NONE),
];

/// A parsed unit: scale to SI and dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    pub scale: f64,
    pub dimension: Dimension,
}

impl Unit {
    pub const DIMENSIONLESS: Unit = Unit { scale: 1.0, dimension: Dimension::NONE };

    /// Parses a unit string such as `kg/m**3` or `rad**-1`.
    pub fn parse(text: &str) -> Result<Unit, UnitError> {
        let text = text.trim();
        if text.is_empty() || text == "unitless" || text == "-" {
            return Ok(Unit::DIMENSIONLESS);
        }

        let malformed = || UnitError::Malformed(text.to_string());
        let bytes = text.as_bytes();
        let mut pos = 0;
        let mut unit = Unit::DIMENSIONLESS;
        let mut sign: i8 = 1;

        loop {
            // Symbol
            let start = pos;
            while pos < bytes.len() && (bytes[pos].is_ascii_alphabetic() || bytes[pos] == b'_') {
                pos += 1;
            }
            let symbol = &text[start..pos];
            let (scale, dimension) = if symbol.is_empty() {
                // A bare "1" allows expressions such as "1/s"
                if pos < bytes.len() && bytes[pos] == b'1' {
                    pos += 1;
                    (1.0, Dimension::NONE)
                } else {
                    return Err(malformed());
                }
            } else {
                SYMBOLS
                    .iter()
                    .find(|(s, _, _)| *s == symbol)
                    .map(|(_, scale, dim)| (*scale, *dim))
                    .ok_or_else(|| UnitError::UnknownSymbol(symbol.to_string()))?
            };

            // Optional exponent
            let mut power: i8 = 1;
            if text[pos..].starts_with("**") {
                pos += 2;
                let exp_start = pos;
                if pos < bytes.len() && bytes[pos] == b'-' {
                    pos += 1;
                }
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                power = text[exp_start..pos].parse().map_err(|_| malformed())?;
            }

            let power = power.checked_mul(sign).ok_or_else(malformed)?;
            unit.scale *= scale.powi(power as i32);
            unit.dimension = dimension
                .scaled(power)
                .and_then(|d| unit.dimension.combined(d))
                .ok_or_else(malformed)?;

            // Operator or end
            match bytes.get(pos) {
                None => break,
                Some(b'*') => sign = 1,
                Some(b'/') => sign = -1,
                Some(_) => return Err(malformed()),
            }
            pos += 1;
        }

        Ok(unit)
    }

    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }
}

/// Factor converting a value expressed in `from` into `to`.
pub fn conversion_factor(from: &str, to: &str) -> Result<f64, UnitError> {
    if from == to {
        return Ok(1.0);
    }
    let source = Unit::parse(from)?;
    let target = Unit::parse(to)?;
    if !source.is_compatible(&target) {
        return Err(UnitError::Incompatible { from: from.to_string(), to: to.to_string() });
    }
    Ok(source.scale / target.scale)
}
