#![no_std]
#![no_main]

use bsp::entry;
use core::convert::Infallible;
use defmt::*;
use defmt_rtt as _;
use embedded_hal::delay::DelayNs;
use embedded_hal_0_2::adc::OneShot;
use panic_probe as _;
use rp_pico::hal::Timer;

// Provide an alias for our BSP so we can switch targets quickly.
use rp_pico as bsp;

use bsp::hal::{
    clocks::{init_clocks_and_plls, Clock},
    pac,
    watchdog::Watchdog,
};
use farm_monitor::config::{MonitorConfig, SERIAL_BAUD, STARTUP_SETTLE_MS};
use farm_monitor::dht22::Dht22;
use farm_monitor::station::{Poll, Station};
use rp_pico::hal;
use rp_pico::hal::adc::{Adc, AdcPin};
use rp_pico::hal::fugit::RateExtU32;
use rp_pico::hal::gpio::bank0::{Gpio0, Gpio1};
use rp_pico::hal::gpio::{FunctionUart, InOutPin, Pin, PullDown};
use rp_pico::hal::uart::{DataBits, Enabled, StopBits, UartConfig, UartPeripheral};
use ufmt::uWrite;

type UartPins = (
    Pin<Gpio0, FunctionUart, PullDown>,
    Pin<Gpio1, FunctionUart, PullDown>,
);

/// UART0 as a `ufmt` sink; writes block until the FIFO accepted every byte
struct SerialLink(UartPeripheral<Enabled, pac::UART0, UartPins>);

impl uWrite for SerialLink {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        self.0.write_full_blocking(s.as_bytes());
        Ok(())
    }
}

#[entry]
fn main() -> ! {
    info!("Farm monitor starting");
    // Grab our singleton objects
    let mut pac = pac::Peripherals::take().unwrap();

    // Set up the watchdog driver - needed by the clock setup code
    let mut watchdog = Watchdog::new(pac.WATCHDOG);

    // Configure the clocks
    //
    // The default is to generate a 125 MHz system clock
    let clocks = init_clocks_and_plls(
        rp_pico::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    // The single-cycle I/O block controls our GPIO pins
    let sio = hal::Sio::new(pac.SIO);

    // Set the pins up according to their function on this particular board
    let pins = rp_pico::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let mut timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

    // Host link: GP0 = TX, GP1 = RX, 9600 8N1
    let uart_pins: UartPins = (pins.gpio0.into_function(), pins.gpio1.into_function());
    let uart = UartPeripheral::new(pac.UART0, uart_pins, &mut pac.RESETS)
        .enable(
            UartConfig::new(SERIAL_BAUD.Hz(), DataBits::Eight, None, StopBits::One),
            clocks.peripheral_clock.freq(),
        )
        .unwrap();
    let mut serial = SerialLink(uart);

    // DHT22 data on GP2, with the 10k pull-up on the sensor board
    let dht_pin = InOutPin::new(pins.gpio2.into_pull_up_input());
    let mut dht = Dht22::new(dht_pin, timer);

    // Soil probe on GP26 (ADC0)
    let mut adc = Adc::new(pac.ADC, &mut pac.RESETS);
    let mut soil_pin = AdcPin::new(pins.gpio26.into_floating_input()).unwrap();

    // Let the DHT22 settle before the probe read
    timer.delay_ms(STARTUP_SETTLE_MS);

    let config = MonitorConfig::default();
    debug!("config: {}", config);

    let mut station = unwrap!(Station::start(&config, &mut serial, || dht.read()));
    if station.session().is_healthy() {
        info!("DHT22 detected");
    } else {
        warn!("DHT22 not detected, simulating climate values");
    }
    debug!("climate source: {}", station.session().source());

    info!("Farm monitor ready");

    loop {
        let now_ms = timer.get_counter().ticks() / 1_000;

        let polled = station.poll(
            now_ms,
            &mut serial,
            || dht.read().inspect_err(|e| warn!("DHT22 read failed: {}", e)),
            || {
                nb::block!(adc.read(&mut soil_pin))
                    .inspect_err(|_| warn!("soil ADC conversion failed"))
                    .ok()
            },
        );

        match polled {
            Ok(Some(Poll::Retry {
                failures,
                threshold,
            })) => {
                warn!("DHT22 retry {}/{}", failures, threshold);
            }
            Ok(Some(Poll::Reading {
                climate,
                source,
                soil_raw,
                soil_percent,
                tripped,
                ..
            })) => {
                if tripped {
                    error!("DHT22 disabled after repeated failures");
                }
                info!(
                    "#{} T: {}C, H: {}%, soil: {}% (raw {}) {}",
                    station.readings(),
                    climate.temperature,
                    climate.humidity,
                    soil_percent,
                    soil_raw,
                    source
                );
            }
            Ok(None) => {}
            Err(e) => {
                error!("serial output failed: {}", e);
            }
        }

        timer.delay_ms(10);
    }
}
