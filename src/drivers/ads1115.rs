//! ADS1115 16-bit ADC over I2C, read as two differential pairs.
//!
//! Each reading is a single-shot conversion: write the config register with
//! the OS bit set, poll the config register until OS reads back 1, then read
//! the big-endian conversion register.
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::source::{AdcSample, DifferentialReader};
use crate::drivers::SensorError;
/// ADDR pin tied to GND.
pub const DEFAULT_ADDRESS: u16 = 0x48;
const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;
const CONFIG_OS: u16 = 0x8000;
const CONFIG_MUX_MASK: u16 = 0x7000;
const CONFIG_PGA_MASK: u16 = 0x0E00;
const CONFIG_MODE_SINGLE: u16 = 0x0100;
const CONFIG_DR_128SPS: u16 = 0x0080;
const CONFIG_COMP_DISABLE: u16 = 0x0003;
const FULL_SCALE_COUNTS: f64 = 32767.0;
const MAX_CONVERSION_POLLS: u32 = 100;
/// Programmable gain amplifier setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gain {
    TwoThirds,
    One,
    Two,
    Four,
    Eight,
    Sixteen,
}
impl Gain {
    pub fn full_scale_volts(self) -> f64 {
        match self {
            Gain::TwoThirds => 6.144,
            Gain::One => 4.096,
            Gain::Two => 2.048,
            Gain::Four => 1.024,
            Gain::Eight => 0.512,
            Gain::Sixteen => 0.256,
        }
    }
    /// Millivolts represented by one count.
    pub fn lsb_millivolts(self) -> f64 {
        self.full_scale_volts() / FULL_SCALE_COUNTS * 1000.0
    }
    fn config_bits(self) -> u16 {
        match self {
            Gain::TwoThirds => 0x0000,
            Gain::One => 0x0200,
            Gain::Two => 0x0400,
            Gain::Four => 0x0600,
            Gain::Eight => 0x0800,
            Gain::Sixteen => 0x0A00,
        }
    }
    fn from_config_bits(config: u16) -> Self {
        match config & CONFIG_PGA_MASK {
            0x0000 => Gain::TwoThirds,
            0x0200 => Gain::One,
            0x0400 => Gain::Two,
            0x0600 => Gain::Four,
            0x0800 => Gain::Eight,
            // 0x0A00..=0x0E00 all select ±0.256 V
            _ => Gain::Sixteen,
        }
    }
}
impl FromStr for Gain {
    type Err = SensorError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2/3" | "0.667" | "0.6667" => Ok(Gain::TwoThirds),
            "1" => Ok(Gain::One),
            "2" => Ok(Gain::Two),
            "4" => Ok(Gain::Four),
            "8" => Ok(Gain::Eight),
            "16" => Ok(Gain::Sixteen),
            other => Err(SensorError::InvalidGain(other.to_string())),
        }
    }
}
impl fmt::Display for Gain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Gain::TwoThirds => "2/3",
            Gain::One => "1",
            Gain::Two => "2",
            Gain::Four => "4",
            Gain::Eight => "8",
            Gain::Sixteen => "16",
        };
        write!(f, "{label} (±{} V)", self.full_scale_volts())
    }
}
/// Input multiplexer setting for differential measurements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DifferentialMux {
    P0P1,
    P0P3,
    P1P3,
    P2P3,
}
impl DifferentialMux {
    fn config_bits(self) -> u16 {
        match self {
            DifferentialMux::P0P1 => 0x0000,
            DifferentialMux::P0P3 => 0x1000,
            DifferentialMux::P1P3 => 0x2000,
            DifferentialMux::P2P3 => 0x3000,
        }
    }
    fn from_config_bits(config: u16) -> Option<Self> {
        match config & CONFIG_MUX_MASK {
            0x0000 => Some(DifferentialMux::P0P1),
            0x1000 => Some(DifferentialMux::P0P3),
            0x2000 => Some(DifferentialMux::P1P3),
            0x3000 => Some(DifferentialMux::P2P3),
            _ => None,
        }
    }
}
/// Minimal register-level access to one I2C target.
pub trait I2cBus {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SensorError>;
    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SensorError>;
}
pub fn counts_to_millivolts(raw: i16, gain: Gain) -> f64 {
    raw as f64 * gain.lsb_millivolts()
}
/// Inverse of [`counts_to_millivolts`], saturating at the converter's range.
pub fn millivolts_to_counts(millivolts: f64, gain: Gain) -> i16 {
    (millivolts / gain.lsb_millivolts())
        .round()
        .clamp(i16::MIN as f64, i16::MAX as f64) as i16
}
pub struct Ads1115<B: I2cBus> {
    bus: B,
    gain: Gain,
    channels: [DifferentialMux; 2],
}
impl<B: I2cBus> Ads1115<B> {
    /// A0-A1 and A2-A3 differential pairs.
    pub fn new(bus: B, gain: Gain) -> Self {
        Self {
            bus,
            gain,
            channels: [DifferentialMux::P0P1, DifferentialMux::P2P3],
        }
    }
    pub fn gain(&self) -> Gain {
        self.gain
    }
    pub fn config_word(&self, mux: DifferentialMux) -> u16 {
        CONFIG_OS
            | mux.config_bits()
            | self.gain.config_bits()
            | CONFIG_MODE_SINGLE
            | CONFIG_DR_128SPS
            | CONFIG_COMP_DISABLE
    }
    pub fn read_raw(&mut self, mux: DifferentialMux) -> Result<i16, SensorError> {
        let [hi, lo] = self.config_word(mux).to_be_bytes();
        self.bus.write(&[REG_CONFIG, hi, lo])?;
        self.wait_for_conversion()?;
        Ok(self.read_register(REG_CONVERSION)? as i16)
    }
    pub fn read_millivolts(&mut self, mux: DifferentialMux) -> Result<f64, SensorError> {
        Ok(counts_to_millivolts(self.read_raw(mux)?, self.gain))
    }
    pub fn bus(&self) -> &B {
        &self.bus
    }
    fn read_register(&mut self, register: u8) -> Result<u16, SensorError> {
        self.bus.write(&[register])?;
        let mut buffer = [0u8; 2];
        self.bus.read(&mut buffer)?;
        Ok(u16::from_be_bytes(buffer))
    }
    fn wait_for_conversion(&mut self) -> Result<(), SensorError> {
        for _ in 0..MAX_CONVERSION_POLLS {
            if self.read_register(REG_CONFIG)? & CONFIG_OS != 0 {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(1));
        }
        Err(SensorError::ConversionTimeout {
            polls: MAX_CONVERSION_POLLS,
        })
    }
}
impl<B: I2cBus> DifferentialReader for Ads1115<B> {
    fn read_pair(&mut self) -> Result<AdcSample, SensorError> {
        let [first_mux, second_mux] = self.channels;
        let raw = [self.read_raw(first_mux)?, self.read_raw(second_mux)?];
        Ok(AdcSample {
            raw,
            millivolts: [
                counts_to_millivolts(raw[0], self.gain),
                counts_to_millivolts(raw[1], self.gain),
            ],
        })
    }
}
/// `/dev/i2c-N` character device.
#[cfg(target_os = "linux")]
pub struct LinuxI2cBus {
    device: i2cdev::linux::LinuxI2CDevice,
}
#[cfg(target_os = "linux")]
impl LinuxI2cBus {
    pub fn open(path: &str, address: u16) -> Result<Self, SensorError> {
        let device = i2cdev::linux::LinuxI2CDevice::new(path, address)
            .map_err(|e| SensorError::Bus(format!("{path} @ {address:#04x}: {e}")))?;
        Ok(Self { device })
    }
}
#[cfg(target_os = "linux")]
impl I2cBus for LinuxI2cBus {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SensorError> {
        use i2cdev::core::I2CDevice;
        self.device
            .write(bytes)
            .map_err(|e| SensorError::Bus(e.to_string()))
    }
    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SensorError> {
        use i2cdev::core::I2CDevice;
        self.device
            .read(buffer)
            .map_err(|e| SensorError::Bus(e.to_string()))
    }
}
/// Shape of the signal a [`SimulatedBus`] produces on each channel.
#[derive(Clone, Copy, Debug)]
pub struct SimulatedSignal {
    pub offset_mv: [f64; 2],
    pub drift_mv_per_read: [f64; 2],
    pub amplitude_mv: [f64; 2],
    pub period_reads: f64,
    pub noise_mv: f64,
}
impl SimulatedSignal {
    pub fn constant(millivolts: [f64; 2]) -> Self {
        Self {
            offset_mv: millivolts,
            drift_mv_per_read: [0.0; 2],
            amplitude_mv: [0.0; 2],
            period_reads: 1.0,
            noise_mv: 0.0,
        }
    }
}
impl Default for SimulatedSignal {
    fn default() -> Self {
        Self {
            offset_mv: [12.0, -4.0],
            drift_mv_per_read: [0.02, -0.015],
            amplitude_mv: [3.0, 1.5],
            period_reads: 30.0,
            noise_mv: 0.05,
        }
    }
}
/// Register-level ADS1115 stand-in: drifting sine plus uniform noise.
pub struct SimulatedBus {
    pointer: u8,
    config: u16,
    conversion: i16,
    reads: [u64; 2],
    signal: SimulatedSignal,
    rng: StdRng,
}
impl SimulatedBus {
    pub fn new(signal: SimulatedSignal, seed: u64) -> Self {
        Self {
            pointer: REG_CONVERSION,
            config: 0x8583, // power-on default
            conversion: 0,
            reads: [0; 2],
            signal,
            rng: StdRng::seed_from_u64(seed),
        }
    }
    pub fn last_config(&self) -> u16 {
        self.config
    }
    fn convert(&mut self) -> Result<(), SensorError> {
        let mux = DifferentialMux::from_config_bits(self.config).ok_or_else(|| {
            SensorError::Bus(format!("simulated ADC only models differential mux, config {:#06x}", self.config))
        })?;
        let channel = match mux {
            DifferentialMux::P2P3 => 1,
            _ => 0,
        };
        let t = self.reads[channel] as f64;
        self.reads[channel] += 1;
        let signal = &self.signal;
        let phase = 2.0 * PI * t / signal.period_reads.max(1.0);
        let mut millivolts = signal.offset_mv[channel]
            + signal.drift_mv_per_read[channel] * t
            + signal.amplitude_mv[channel] * phase.sin();
        if signal.noise_mv > 0.0 {
            millivolts += self.rng.gen_range(-signal.noise_mv..signal.noise_mv);
        }
        self.conversion = millivolts_to_counts(millivolts, Gain::from_config_bits(self.config));
        Ok(())
    }
}
impl I2cBus for SimulatedBus {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SensorError> {
        match *bytes {
            [register] => {
                self.pointer = register;
                Ok(())
            }
            [REG_CONFIG, hi, lo] => {
                self.pointer = REG_CONFIG;
                self.config = u16::from_be_bytes([hi, lo]);
                if self.config & CONFIG_OS != 0 {
                    self.convert()?;
                }
                Ok(())
            }
            _ => Err(SensorError::Bus(format!(
                "unsupported write of {} bytes",
                bytes.len()
            ))),
        }
    }
    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SensorError> {
        let value = match self.pointer {
            REG_CONVERSION => self.conversion as u16,
            // conversions complete instantly
            REG_CONFIG => self.config | CONFIG_OS,
            other => return Err(SensorError::Bus(format!("unknown register {other:#04x}"))),
        };
        if buffer.len() != 2 {
            return Err(SensorError::Bus(format!(
                "registers are 2 bytes, asked for {}",
                buffer.len()
            )));
        }
        buffer.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}
