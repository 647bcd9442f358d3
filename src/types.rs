// src/types.rs
use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use crate::drivers::WindowStats;

// Where the poller gets its readings from
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum ConnectionMode {
    Simulation,
    Hardware,
}

impl FromStr for ConnectionMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sim" | "simulation" => Ok(ConnectionMode::Simulation),
            "hw" | "hardware" => Ok(ConnectionMode::Hardware),
            other => Err(format!("unknown ADC mode '{other}' (expected hardware or simulation)")),
        }
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionMode::Simulation => write!(f, "simulation"),
            ConnectionMode::Hardware => write!(f, "hardware"),
        }
    }
}

// Commands sent to the poll thread
#[derive(Clone, Debug, PartialEq)]
pub enum PollerCommand {
    Pause,
    Resume,
    Stop,
}

// One tick's worth of data
#[derive(Clone, Copy, Debug)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub raw: [i16; 2],
    pub millivolts: [f64; 2],
}

// Messages the poll thread sends back
#[derive(Clone, Debug)]
pub enum PollerMessage {
    Reading(Reading),
    Window(WindowStats),
    Paused(bool),
    Error(String),
    Stopped { ticks: u64 },
}
