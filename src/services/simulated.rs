//! Simulated ViCare boiler for running the entity without the vendor cloud.

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use crate::models::vicare::{
    MODE_DHW_AND_HEATING, MODE_HOLIDAY, MODE_NORMAL, MODE_STANDBY, PROGRAM_COMFORT, PROGRAM_ECO, PROGRAM_HOLIDAY,
    PROGRAM_NORMAL, PROGRAM_REDUCED, PROGRAM_STANDBY, TemperatureReading,
};
use crate::session::{SessionCredentials, SessionError, VendorSession};

const DEFAULT_SEED: u64 = 0x0420_1337_DEAD_BEEFu64;
const PROGRAM_TEMPERATURES: [(&str, f64); 6] = [
    (PROGRAM_COMFORT, 22.0),
    (PROGRAM_ECO, 19.0),
    (PROGRAM_HOLIDAY, 14.0),
    (PROGRAM_NORMAL, 21.0),
    (PROGRAM_REDUCED, 18.0),
    (PROGRAM_STANDBY, 12.0),
];
const ROOM_SENSOR_ERROR_RATE: f64 = 0.05;
const OUTSIDE_TEMP_C: f64 = 6.0;

pub struct SimulatedBoiler {
    rng: SmallRng,
    room_temp_c: f64,
    /// Baseline program plus anything activated on top of it, newest last.
    programs: Vec<String>,
    program_temps: BTreeMap<String, f64>,
    mode: String,
}

impl SimulatedBoiler {
    pub fn new(seed: Option<u64>) -> Self {
        SimulatedBoiler {
            rng: SmallRng::seed_from_u64(seed.unwrap_or(DEFAULT_SEED)),
            room_temp_c: 19.5,
            programs: vec![PROGRAM_NORMAL.to_string()],
            program_temps: PROGRAM_TEMPERATURES
                .iter()
                .map(|(p, t)| (p.to_string(), *t))
                .collect(),
            mode: MODE_DHW_AND_HEATING.to_string(),
        }
    }

    /// Stands in for the vendor login; any non-empty user is accepted.
    pub fn connect(credentials: &SessionCredentials, seed: Option<u64>) -> Result<Self, SessionError> {
        if credentials.user.trim().is_empty() {
            return Err(SessionError::Auth("empty user".to_string()));
        }
        info!(
            "Simulated boiler: session opened for {} (token cache {})",
            credentials.user,
            credentials.token_file.display()
        );
        Ok(SimulatedBoiler::new(seed))
    }

    fn active_program(&self) -> &str {
        self.programs.last().map(String::as_str).unwrap_or(PROGRAM_STANDBY)
    }

    fn heating(&self) -> bool {
        self.mode != MODE_STANDBY && self.active_program() != PROGRAM_STANDBY
    }

    fn setpoint(&self) -> f64 {
        self.program_temps.get(self.active_program()).copied().unwrap_or(20.0)
    }

    /// Moves the room a step toward its setpoint (or toward outside when idle).
    fn advance(&mut self) {
        let goal = if self.heating() { self.setpoint() } else { OUTSIDE_TEMP_C };
        let drift = (goal - self.room_temp_c) * self.rng.random_range(0.08..=0.2);
        let noise = self.rng.random_range(-0.15..=0.15);
        self.room_temp_c = (self.room_temp_c + drift + noise).clamp(-5.0, 35.0);
    }

    fn reject(operation: &str, message: impl Into<String>) -> SessionError {
        SessionError::Rejected {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

impl VendorSession for SimulatedBoiler {
    fn get_room_temperature(&mut self) -> Result<TemperatureReading, SessionError> {
        self.advance();
        if self.rng.random_bool(ROOM_SENSOR_ERROR_RATE) {
            return Ok(TemperatureReading::Error);
        }
        Ok(TemperatureReading::Celsius((self.room_temp_c * 10.0).round() / 10.0))
    }

    fn get_boiler_temperature(&mut self) -> Result<TemperatureReading, SessionError> {
        let base = if self.heating() { 55.0 } else { 30.0 };
        let noise = self.rng.random_range(-2.0..=2.0);
        Ok(TemperatureReading::Celsius(((base + noise) * 10.0_f64).round() / 10.0))
    }

    fn get_active_program(&mut self) -> Result<String, SessionError> {
        Ok(self.active_program().to_string())
    }

    fn get_current_desired_temperature(&mut self) -> Result<TemperatureReading, SessionError> {
        Ok(TemperatureReading::Celsius(self.setpoint()))
    }

    fn get_active_mode(&mut self) -> Result<String, SessionError> {
        Ok(self.mode.clone())
    }

    fn activate_program(&mut self, program: &str) -> Result<(), SessionError> {
        if !self.program_temps.contains_key(program) {
            return Err(Self::reject("activateProgram", format!("unknown program {}", program)));
        }
        debug!("Simulated boiler: activating {}", program);
        self.programs.retain(|p| p != program);
        self.programs.push(program.to_string());
        Ok(())
    }

    fn deactivate_program(&mut self, program: &str) -> Result<(), SessionError> {
        debug!("Simulated boiler: deactivating {}", program);
        if self.programs.len() > 1 {
            self.programs.retain(|p| p != program);
        }
        Ok(())
    }

    fn set_mode(&mut self, mode: &str) -> Result<(), SessionError> {
        debug!("Simulated boiler: mode {}", mode);
        match mode {
            MODE_HOLIDAY => {
                self.programs.retain(|p| p != PROGRAM_HOLIDAY);
                self.programs.push(PROGRAM_HOLIDAY.to_string());
            }
            MODE_NORMAL => {
                self.programs.retain(|p| p != PROGRAM_HOLIDAY);
                if self.programs.is_empty() {
                    self.programs.push(PROGRAM_NORMAL.to_string());
                }
                self.mode = MODE_DHW_AND_HEATING.to_string();
            }
            _ => self.mode = mode.to_string(),
        }
        Ok(())
    }

    fn set_program_temperature(&mut self, program: &str, celsius: f64) -> Result<(), SessionError> {
        match self.program_temps.get_mut(program) {
            Some(t) => {
                *t = celsius;
                Ok(())
            }
            None => Err(Self::reject("setProgramTemperature", format!("unknown program {}", program))),
        }
    }
}
