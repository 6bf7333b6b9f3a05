use ufmt::{uDisplay, uWrite, uwrite, Formatter};

/// A fixed-point value with one decimal digit, stored in tenths of a unit.
/// 22.5 °C is `Tenths(225)`, -0.5 °C is `Tenths(-5)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tenths(pub i32);

impl Tenths {
    /// Builds a value from a whole part and a single decimal digit.
    /// The digit takes the sign of `whole`: `new(-3, 5)` is -3.5.
    /// param whole: the integer part
    /// param tenth: the decimal digit (0-9)
    pub const fn new(whole: i32, tenth: u8) -> Self {
        if whole < 0 {
            Tenths(whole * 10 - tenth as i32)
        } else {
            Tenths(whole * 10 + tenth as i32)
        }
    }

    /// Parses `[-]<digits>[.<digits>]`
    /// Only the first decimal digit is kept; further digits are truncated
    /// returns None if the text is not a plain decimal number
    pub fn parse(text: &str) -> Option<Self> {
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let whole: i32 = whole.parse().ok()?;
        let tenth = fraction.bytes().next().map_or(0, |b| i32::from(b - b'0'));
        let magnitude = whole.checked_mul(10)?.checked_add(tenth)?;

        Some(Tenths(if negative { -magnitude } else { magnitude }))
    }
}

// Always renders exactly one decimal: 24.0, -3.5, -0.5
impl uDisplay for Tenths {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        if self.0 < 0 {
            f.write_str("-")?;
        }
        let magnitude = self.0.unsigned_abs();
        uwrite!(f, "{}.{}", magnitude / 10, magnitude % 10)
    }
}

#[cfg(target_os = "none")]
impl defmt::Format for Tenths {
    fn format(&self, f: defmt::Formatter) {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        defmt::write!(f, "{=str}{}.{}", sign, magnitude / 10, magnitude % 10)
    }
}

/// A temperature and relative humidity pair
/// temperature: degrees Celsius
/// humidity: relative humidity percentage
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct Climate {
    pub temperature: Tenths,
    pub humidity: Tenths,
}

/// Which branch produced a [`Climate`] value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Source {
    /// Read from the DHT22
    Real,
    /// Synthesized because the DHT22 is disabled
    Simulated,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Real => "REAL",
            Source::Simulated => "SIMULATED",
        }
    }
}

/// Generates plausible climate values from the uptime alone
/// Temperature ramps through 22.0 - 31.9 °C every 100ms of uptime,
/// humidity through 50.0 - 79.9 % every 300ms
/// param uptime_ms: milliseconds since boot
pub fn simulated_climate(uptime_ms: u64) -> Climate {
    Climate {
        temperature: Tenths(220 + (uptime_ms % 100) as i32),
        humidity: Tenths(500 + (uptime_ms % 300) as i32),
    }
}

/// Raw ADC readings of the soil probe at the two ends of its range.
/// The probe reads higher when dry, but either ordering is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct SoilCalibration {
    /// Raw value in completely dry soil; maps to 0 %
    pub dry: u16,
    /// Raw value in saturated soil; maps to 100 %
    pub wet: u16,
}

impl SoilCalibration {
    pub const fn new(dry: u16, wet: u16) -> Self {
        Self { dry, wet }
    }

    /// Converts a raw ADC value into a moisture percentage
    /// Linear between `dry` and `wet`, truncated toward zero and clamped to 0-100.
    /// A calibration with `dry == wet` has no usable range and always yields 0.
    /// param raw: raw ADC reading
    /// returns moisture in whole percent
    pub fn percent(&self, raw: u16) -> u8 {
        let dry = i32::from(self.dry);
        let wet = i32::from(self.wet);
        if dry == wet {
            return 0;
        }

        let mapped = (i32::from(raw) - dry) * 100 / (wet - dry);
        mapped.clamp(0, 100) as u8
    }
}
