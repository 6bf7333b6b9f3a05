//! Bit-banged DHT22 (AM2302) driver
//!
//! The sensor talks over a single open-drain wire. The MCU pulls the line low
//! to request a measurement, the sensor acknowledges with a low/high pulse and
//! then clocks out 40 bits, MSB first. Each bit starts with a ~50 µs low phase;
//! the length of the following high phase encodes the value (~27 µs = 0,
//! ~70 µs = 1).
//!
//! Frame layout: humidity (2 bytes), temperature (2 bytes), checksum.
//! Both values are in tenths; bit 15 of the temperature is a sign flag.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::sensors::{Climate, Tenths};

const START_SIGNAL_LOW_MS: u32 = 18; // >= 1ms for DHT22, 18ms keeps DHT11 clones happy
const START_SIGNAL_HIGH_US: u32 = 40;
const BIT_SAMPLE_DELAY_US: u32 = 35;
const POLL_DELAY_US: u32 = 1;
const MAX_ATTEMPTS: usize = 100;

/// Errors that may occur when reading the DHT22
#[derive(Debug, PartialEq, Eq)]
pub enum Dht22Error<E> {
    /// GPIO pin error
    Pin(E),
    /// The sensor did not produce the expected edge in time
    Timeout,
    /// Frame checksum mismatch
    ChecksumMismatch,
}

impl<E> From<E> for Dht22Error<E> {
    fn from(e: E) -> Self {
        Dht22Error::Pin(e)
    }
}

// HAL pin errors rarely implement `Format`, so only the kind is logged
#[cfg(target_os = "none")]
impl<E> defmt::Format for Dht22Error<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Dht22Error::Pin(_) => defmt::write!(f, "pin error"),
            Dht22Error::Timeout => defmt::write!(f, "timeout"),
            Dht22Error::ChecksumMismatch => defmt::write!(f, "checksum mismatch"),
        }
    }
}

/// The five raw bytes of one transmission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame(pub [u8; 5]);

impl Frame {
    /// The checksum is the low byte of the sum of the four data bytes
    pub fn checksum_ok(&self) -> bool {
        let [hh, hl, th, tl, checksum] = self.0;
        hh.wrapping_add(hl).wrapping_add(th).wrapping_add(tl) == checksum
    }

    pub fn humidity(&self) -> Tenths {
        Tenths(i32::from(u16::from_be_bytes([self.0[0], self.0[1]])))
    }

    pub fn temperature(&self) -> Tenths {
        let magnitude = i32::from(u16::from_be_bytes([self.0[2] & 0x7F, self.0[3]]));
        if self.0[2] & 0x80 != 0 {
            Tenths(-magnitude)
        } else {
            Tenths(magnitude)
        }
    }

    /// Validates the checksum and decodes both measurements
    pub fn decode<E>(&self) -> Result<Climate, Dht22Error<E>> {
        if !self.checksum_ok() {
            return Err(Dht22Error::ChecksumMismatch);
        }

        Ok(Climate {
            temperature: self.temperature(),
            humidity: self.humidity(),
        })
    }
}

/// DHT22 driver
///
/// `pin` must behave as an open-drain line: driving it high releases the bus
/// to the pull-up so the sensor can pull it low.
pub struct Dht22<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> Dht22<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    /// Gives back the pin and the delay provider
    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }

    /// Performs one complete measurement
    ///
    /// The sensor needs about 2s between measurements; reading faster returns
    /// stale values or times out.
    pub fn read(&mut self) -> Result<Climate, Dht22Error<P::Error>> {
        self.send_start_signal()?;
        self.wait_for_sensor_response()?;

        let mut frame = [0; 5];
        for byte in frame.iter_mut() {
            *byte = self.read_byte()?;
        }

        Frame(frame).decode()
    }

    fn send_start_signal(&mut self) -> Result<(), Dht22Error<P::Error>> {
        self.pin.set_low()?;
        self.delay.delay_ms(START_SIGNAL_LOW_MS);

        self.pin.set_high()?;
        self.delay.delay_us(START_SIGNAL_HIGH_US);

        Ok(())
    }

    fn wait_for_sensor_response(&mut self) -> Result<(), Dht22Error<P::Error>> {
        self.wait_until_state(PinState::Low)?;
        self.wait_until_state(PinState::High)?;

        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, Dht22Error<P::Error>> {
        let mut byte = 0;

        for i in 0..8 {
            self.wait_until_state(PinState::Low)?;
            self.wait_until_state(PinState::High)?;

            // still high after the sample delay -> long pulse -> 1
            self.delay.delay_us(BIT_SAMPLE_DELAY_US);
            if self.pin.is_high()? {
                byte |= 1 << (7 - i);
            }
        }

        Ok(byte)
    }

    fn wait_until_state(&mut self, state: PinState) -> Result<(), Dht22Error<P::Error>> {
        for _ in 0..MAX_ATTEMPTS {
            let reached = match state {
                PinState::High => self.pin.is_high()?,
                PinState::Low => self.pin.is_low()?,
            };
            if reached {
                return Ok(());
            }
            self.delay.delay_us(POLL_DELAY_US);
        }

        Err(Dht22Error::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern crate std;
    use std::vec;
    use std::vec::Vec;

    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};

    fn start_and_handshake() -> Vec<PinTransaction> {
        vec![
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
            PinTransaction::get(State::Low),
            PinTransaction::get(State::High),
        ]
    }

    fn byte_transactions(byte: u8) -> Vec<PinTransaction> {
        let mut transactions = Vec::new();
        for i in 0..8 {
            let bit = if byte & (1 << (7 - i)) != 0 {
                State::High
            } else {
                State::Low
            };
            transactions.push(PinTransaction::get(State::Low));
            transactions.push(PinTransaction::get(State::High));
            transactions.push(PinTransaction::get(bit));
        }
        transactions
    }

    fn frame_transactions(frame: [u8; 5]) -> Vec<PinTransaction> {
        let mut transactions = start_and_handshake();
        for byte in frame {
            transactions.extend(byte_transactions(byte));
        }
        transactions
    }

    #[test]
    fn decodes_positive_frame() {
        // 65.2 %, 35.1 °C
        let frame = Frame([0x02, 0x8C, 0x01, 0x5F, 0xEE]);
        assert!(frame.checksum_ok());
        assert_eq!(
            frame.decode::<()>(),
            Ok(Climate {
                temperature: Tenths(351),
                humidity: Tenths(652),
            })
        );
    }

    #[test]
    fn decodes_negative_temperature() {
        // -10.1 °C
        let frame = Frame([0x02, 0x8C, 0x80, 0x65, 0x73]);
        assert_eq!(frame.temperature(), Tenths(-101));
        assert!(frame.decode::<()>().is_ok());
    }

    #[test]
    fn rejects_bad_checksum() {
        let frame = Frame([0x02, 0x8C, 0x01, 0x5F, 0xEF]);
        assert!(!frame.checksum_ok());
        assert_eq!(frame.decode::<()>(), Err(Dht22Error::ChecksumMismatch));
    }

    #[test]
    fn checksum_wraps() {
        let frame = Frame([0xFF, 0xFF, 0x00, 0x02, 0x00]);
        assert!(frame.checksum_ok());
    }

    #[test]
    fn reads_full_measurement() {
        let expectations = frame_transactions([0x02, 0x8C, 0x01, 0x5F, 0xEE]);
        let mut dht22 = Dht22::new(PinMock::new(&expectations), NoopDelay::new());

        let climate = dht22.read().unwrap();
        assert_eq!(climate.temperature, Tenths(351));
        assert_eq!(climate.humidity, Tenths(652));

        let (mut pin, _) = dht22.release();
        pin.done();
    }

    #[test]
    fn read_reports_checksum_mismatch() {
        let expectations = frame_transactions([0x02, 0x8C, 0x01, 0x5F, 0x00]);
        let mut dht22 = Dht22::new(PinMock::new(&expectations), NoopDelay::new());

        assert!(matches!(dht22.read(), Err(Dht22Error::ChecksumMismatch)));

        let (mut pin, _) = dht22.release();
        pin.done();
    }

    #[test]
    fn missing_sensor_times_out() {
        // Nobody pulls the line low after the start signal
        let mut expectations = vec![
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ];
        expectations.extend(vec![PinTransaction::get(State::High); MAX_ATTEMPTS]);

        let mut dht22 = Dht22::new(PinMock::new(&expectations), NoopDelay::new());
        assert!(matches!(dht22.read(), Err(Dht22Error::Timeout)));

        let (mut pin, _) = dht22.release();
        pin.done();
    }
}
