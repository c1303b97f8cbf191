//! ViCare boiler exposed as a host climate entity.

use chrono::{DateTime, Utc};
use log::{debug, error, warn};

use crate::climate::{ClimateEntity, ClimateError, StateNotifier};
use crate::models::vicare::{
    MODE_DHW_AND_HEATING, MODE_HOLIDAY, MODE_NORMAL, MODE_STANDBY, ON_MODES, OPERATION_LIST, OperationState,
    PROGRAM_HOLIDAY, PROGRAM_UNKNOWN, SupportedFeatures, TemperatureUnit,
};
use crate::session::VendorSession;

pub const SUPPORT_FLAGS: SupportedFeatures = SupportedFeatures(
    SupportedFeatures::TARGET_TEMPERATURE.0
        | SupportedFeatures::AWAY_MODE.0
        | SupportedFeatures::OPERATION_MODE.0
        | SupportedFeatures::ON_OFF.0,
);

pub struct ViCareClimate<S, N> {
    name: String,
    session: S,
    notifier: N,
    on: Option<bool>,
    away: Option<bool>,
    target_temperature: Option<f64>,
    current_temperature: Option<f64>,
    /// Raw vendor program label, as last reported by the device.
    current_program: String,
    last_updated: Option<DateTime<Utc>>,
}

impl<S: VendorSession, N: StateNotifier> ViCareClimate<S, N> {
    pub fn new(name: impl Into<String>, session: S, notifier: N) -> Self {
        ViCareClimate {
            name: name.into(),
            session,
            notifier,
            on: None,
            away: None,
            target_temperature: None,
            current_temperature: None,
            current_program: PROGRAM_UNKNOWN.to_string(),
            last_updated: None,
        }
    }

    /// Raw program label behind `current_operation`.
    pub fn current_program(&self) -> &str {
        &self.current_program
    }

    fn notify(&self) {
        self.notifier.schedule_update_state(&self.name);
    }
}

impl<S: VendorSession, N: StateNotifier> ClimateEntity for ViCareClimate<S, N> {
    fn name(&self) -> &str {
        &self.name
    }

    fn temperature_unit(&self) -> TemperatureUnit {
        TemperatureUnit::Celsius
    }

    fn supported_features(&self) -> SupportedFeatures {
        SUPPORT_FLAGS
    }

    fn current_temperature(&self) -> Option<f64> {
        self.current_temperature
    }

    fn target_temperature(&self) -> Option<f64> {
        self.target_temperature
    }

    fn current_operation(&self) -> OperationState {
        OperationState::from_program_label(&self.current_program)
    }

    fn operation_list(&self) -> &[OperationState] {
        &OPERATION_LIST
    }

    fn is_away_mode_on(&self) -> Option<bool> {
        self.away
    }

    fn is_on(&self) -> Option<bool> {
        self.on
    }

    fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn update(&mut self) -> Result<(), ClimateError> {
        let room = self.session.get_room_temperature()?;
        self.current_temperature = if room.is_usable() {
            room.celsius()
        } else {
            debug!("{}: room temperature unavailable ({:?}), using boiler", self.name, room);
            self.session.get_boiler_temperature()?.celsius()
        };

        let program = self.session.get_active_program()?;
        self.away = Some(program == PROGRAM_HOLIDAY);
        self.current_program = program;
        self.target_temperature = self.session.get_current_desired_temperature()?.celsius();

        let mode = self.session.get_active_mode()?;
        self.on = Some(ON_MODES.contains(&mode.as_str()));

        self.last_updated = Some(Utc::now());
        debug!(
            "{}: polled program={} mode={} current={:?} target={:?}",
            self.name, self.current_program, mode, self.current_temperature, self.target_temperature
        );
        Ok(())
    }

    fn set_temperature(&mut self, temperature: Option<f64>) -> Result<(), ClimateError> {
        if let Some(t) = temperature {
            self.target_temperature = Some(t);
        }
        match self.target_temperature {
            Some(target) => self.session.set_program_temperature(&self.current_program, target)?,
            None => warn!("{}: no target temperature known yet; nothing sent to device", self.name),
        }
        self.notify();
        Ok(())
    }

    fn set_operation_mode(&mut self, operation_mode: &str) -> Result<(), ClimateError> {
        let program = operation_mode
            .parse::<OperationState>()
            .ok()
            .filter(|state| OPERATION_LIST.contains(state))
            .and_then(|state| state.program_label());
        let Some(program) = program else {
            error!(
                "An error occurred while setting operation mode. Invalid operation mode: {}",
                operation_mode
            );
            return Err(ClimateError::InvalidModeRequested(operation_mode.to_string()));
        };

        self.session.deactivate_program(&self.current_program)?;
        self.session.activate_program(program)?;
        Ok(())
    }

    fn turn_away_mode_on(&mut self) -> Result<(), ClimateError> {
        self.away = Some(true);
        self.notify();
        self.session.set_mode(MODE_HOLIDAY)?;
        Ok(())
    }

    fn turn_away_mode_off(&mut self) -> Result<(), ClimateError> {
        self.away = Some(false);
        self.notify();
        self.session.set_mode(MODE_NORMAL)?;
        Ok(())
    }

    fn turn_on(&mut self) -> Result<(), ClimateError> {
        self.on = Some(true);
        self.notify();
        self.session.set_mode(MODE_DHW_AND_HEATING)?;
        Ok(())
    }

    fn turn_off(&mut self) -> Result<(), ClimateError> {
        self.on = Some(false);
        self.notify();
        self.session.set_mode(MODE_STANDBY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::RefreshRequest;
    use crate::models::vicare::TemperatureReading;
    use crate::session::SessionError;
    use std::sync::mpsc::{self, Receiver, Sender};

    #[derive(Default)]
    struct RecordingSession {
        room: TemperatureReading,
        boiler: TemperatureReading,
        program: String,
        desired: TemperatureReading,
        mode: String,
        fail_on: Option<&'static str>,
        calls: Vec<String>,
    }

    impl RecordingSession {
        fn record(&mut self, call: String, op: &'static str) -> Result<(), SessionError> {
            self.calls.push(call);
            if self.fail_on == Some(op) {
                return Err(SessionError::Rejected {
                    operation: op.to_string(),
                    message: "device offline".to_string(),
                });
            }
            Ok(())
        }
    }

    impl VendorSession for RecordingSession {
        fn get_room_temperature(&mut self) -> Result<TemperatureReading, SessionError> {
            self.record("getRoomTemperature".into(), "getRoomTemperature")?;
            Ok(self.room)
        }

        fn get_boiler_temperature(&mut self) -> Result<TemperatureReading, SessionError> {
            self.record("getBoilerTemperature".into(), "getBoilerTemperature")?;
            Ok(self.boiler)
        }

        fn get_active_program(&mut self) -> Result<String, SessionError> {
            self.record("getActiveProgram".into(), "getActiveProgram")?;
            Ok(self.program.clone())
        }

        fn get_current_desired_temperature(&mut self) -> Result<TemperatureReading, SessionError> {
            self.record("getCurrentDesiredTemperature".into(), "getCurrentDesiredTemperature")?;
            Ok(self.desired)
        }

        fn get_active_mode(&mut self) -> Result<String, SessionError> {
            self.record("getActiveMode".into(), "getActiveMode")?;
            Ok(self.mode.clone())
        }

        fn activate_program(&mut self, program: &str) -> Result<(), SessionError> {
            self.record(format!("activateProgram({program})"), "activateProgram")
        }

        fn deactivate_program(&mut self, program: &str) -> Result<(), SessionError> {
            self.record(format!("deactivateProgram({program})"), "deactivateProgram")
        }

        fn set_mode(&mut self, mode: &str) -> Result<(), SessionError> {
            self.record(format!("setMode({mode})"), "setMode")
        }

        fn set_program_temperature(&mut self, program: &str, celsius: f64) -> Result<(), SessionError> {
            self.record(format!("setProgramTemperature({program}, {celsius})"), "setProgramTemperature")
        }
    }

    fn session(room: TemperatureReading, program: &str, mode: &str) -> RecordingSession {
        RecordingSession {
            room,
            boiler: TemperatureReading::Celsius(40.0),
            program: program.to_string(),
            desired: TemperatureReading::Celsius(20.0),
            mode: mode.to_string(),
            ..Default::default()
        }
    }

    fn entity(
        session: RecordingSession,
    ) -> (ViCareClimate<RecordingSession, Sender<RefreshRequest>>, Receiver<RefreshRequest>) {
        let (tx, rx) = mpsc::channel();
        (ViCareClimate::new("vicare", session, tx), rx)
    }

    fn polled(session: RecordingSession) -> (ViCareClimate<RecordingSession, Sender<RefreshRequest>>, Receiver<RefreshRequest>) {
        let (mut e, rx) = entity(session);
        e.update().expect("poll succeeds");
        e.session.calls.clear();
        (e, rx)
    }

    #[test]
    fn fresh_entity_reports_unknown_state() {
        let (e, _rx) = entity(RecordingSession::default());
        assert_eq!(e.name(), "vicare");
        assert_eq!(e.current_operation(), OperationState::Unknown);
        assert_eq!(e.current_program(), "unknown");
        assert_eq!(e.is_on(), None);
        assert_eq!(e.is_away_mode_on(), None);
        assert_eq!(e.current_temperature(), None);
        assert_eq!(e.last_updated(), None);
        assert_eq!(e.temperature_unit(), TemperatureUnit::Celsius);
        assert_eq!(e.supported_features().0, 1 | 128 | 1024 | 4096);
        assert_eq!(e.operation_list(), &OPERATION_LIST);
    }

    #[test]
    fn poll_prefers_room_temperature() {
        let (mut e, _rx) = entity(session(TemperatureReading::Celsius(21.5), "comfort", "dhwAndHeating"));
        e.update().unwrap();
        assert_eq!(e.current_temperature(), Some(21.5));
        assert!(!e.session.calls.contains(&"getBoilerTemperature".to_string()));
        assert_eq!(e.target_temperature(), Some(20.0));
        assert_eq!(e.current_operation(), OperationState::Heat);
        assert_eq!(e.current_program(), "comfort");
        assert!(e.last_updated().is_some());
    }

    #[test]
    fn poll_falls_back_to_boiler_on_error_sentinel() {
        let (mut e, _rx) = entity(session(TemperatureReading::Error, "normal", "dhwAndHeating"));
        e.update().unwrap();
        assert_eq!(e.current_temperature(), Some(40.0));
    }

    #[test]
    fn poll_falls_back_to_boiler_when_room_missing() {
        let (mut e, _rx) = entity(session(TemperatureReading::Missing, "normal", "dhwAndHeating"));
        e.update().unwrap();
        assert_eq!(e.current_temperature(), Some(40.0));

        // fallback is re-evaluated every poll
        e.session.room = TemperatureReading::Celsius(19.0);
        e.update().unwrap();
        assert_eq!(e.current_temperature(), Some(19.0));
    }

    #[test]
    fn poll_derives_away_from_holiday_program() {
        let (mut e, _rx) = entity(session(TemperatureReading::Celsius(18.0), "holiday", "dhwAndHeating"));
        e.update().unwrap();
        assert_eq!(e.is_away_mode_on(), Some(true));
        assert_eq!(e.current_operation(), OperationState::Unknown);
        assert_eq!(e.current_program(), "holiday");

        e.session.program = "Holiday".to_string();
        e.update().unwrap();
        assert_eq!(e.is_away_mode_on(), Some(false));
    }

    #[test]
    fn poll_derives_on_from_active_mode() {
        for (mode, expected) in [
            ("dhwAndHeating", true),
            ("forcedReduced", true),
            ("forcedNormal", true),
            ("standby", false),
            ("dhw", false),
            ("DHWANDHEATING", false),
        ] {
            let (mut e, _rx) = entity(session(TemperatureReading::Celsius(20.0), "normal", mode));
            e.update().unwrap();
            assert_eq!(e.is_on(), Some(expected), "mode {mode}");
        }
    }

    #[test]
    fn poll_failure_propagates() {
        let mut s = session(TemperatureReading::Celsius(20.0), "normal", "standby");
        s.fail_on = Some("getActiveMode");
        let (mut e, _rx) = entity(s);
        let err = e.update().unwrap_err();
        assert!(matches!(err, ClimateError::Vendor(SessionError::Rejected { .. })));
        assert_eq!(e.last_updated(), None);
    }

    #[test]
    fn set_mode_deactivates_then_activates() {
        let (mut e, _rx) = polled(session(TemperatureReading::Celsius(20.0), "standby", "standby"));
        e.set_operation_mode("heat").unwrap();
        assert_eq!(
            e.session.calls,
            vec!["deactivateProgram(standby)".to_string(), "activateProgram(comfort)".to_string()]
        );
        // local state waits for the next poll
        assert_eq!(e.current_program(), "standby");
        assert_eq!(e.current_operation(), OperationState::Off);
    }

    #[test]
    fn set_mode_maps_every_settable_state() {
        for (mode, program) in [("heat", "comfort"), ("eco", "eco"), ("auto", "normal"), ("off", "standby")] {
            let (mut e, _rx) = polled(session(TemperatureReading::Celsius(20.0), "reduced", "standby"));
            e.set_operation_mode(mode).unwrap();
            assert_eq!(e.session.calls[0], "deactivateProgram(reduced)");
            assert_eq!(e.session.calls[1], format!("activateProgram({program})"));
        }
    }

    #[test]
    fn invalid_mode_touches_nothing() {
        let (mut e, rx) = polled(session(TemperatureReading::Celsius(20.0), "comfort", "standby"));
        for mode in ["cool", "unknown", "HEAT", ""] {
            let err = e.set_operation_mode(mode).unwrap_err();
            assert!(matches!(err, ClimateError::InvalidModeRequested(ref m) if m == mode));
        }
        assert!(e.session.calls.is_empty());
        assert_eq!(e.current_program(), "comfort");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn failed_activation_is_not_rolled_back() {
        let mut s = session(TemperatureReading::Celsius(20.0), "comfort", "standby");
        s.fail_on = Some("activateProgram");
        let (mut e, _rx) = polled(s);
        assert!(e.set_operation_mode("eco").is_err());
        assert_eq!(
            e.session.calls,
            vec!["deactivateProgram(comfort)".to_string(), "activateProgram(eco)".to_string()]
        );
        assert_eq!(e.current_program(), "comfort");
    }

    #[test]
    fn set_temperature_is_optimistic_and_notifies() {
        let (mut e, rx) = polled(session(TemperatureReading::Celsius(20.0), "normal", "dhwAndHeating"));
        e.set_temperature(Some(22.0)).unwrap();
        assert_eq!(e.target_temperature(), Some(22.0));
        assert_eq!(e.session.calls, vec!["setProgramTemperature(normal, 22)".to_string()]);
        assert_eq!(rx.try_recv().unwrap().entity, "vicare");
    }

    #[test]
    fn set_temperature_without_value_resends_current_target() {
        let (mut e, rx) = polled(session(TemperatureReading::Celsius(20.0), "eco", "dhwAndHeating"));
        e.set_temperature(None).unwrap();
        assert_eq!(e.target_temperature(), Some(20.0));
        assert_eq!(e.session.calls, vec!["setProgramTemperature(eco, 20)".to_string()]);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn set_temperature_before_first_poll_skips_device() {
        let (mut e, rx) = entity(RecordingSession::default());
        e.set_temperature(None).unwrap();
        assert!(e.session.calls.is_empty());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn away_and_power_commands_update_locally_first() {
        let mut s = session(TemperatureReading::Celsius(20.0), "normal", "dhwAndHeating");
        s.fail_on = Some("setMode");
        let (mut e, rx) = polled(s);

        assert!(e.turn_away_mode_on().is_err());
        assert_eq!(e.is_away_mode_on(), Some(true));
        assert!(e.turn_off().is_err());
        assert_eq!(e.is_on(), Some(false));
        assert_eq!(rx.try_iter().count(), 2);

        e.session.fail_on = None;
        e.turn_away_mode_off().unwrap();
        e.turn_on().unwrap();
        assert_eq!(e.is_away_mode_on(), Some(false));
        assert_eq!(e.is_on(), Some(true));
        assert_eq!(
            e.session.calls,
            vec![
                "setMode(holiday)".to_string(),
                "setMode(standby)".to_string(),
                "setMode(normal)".to_string(),
                "setMode(dhwAndHeating)".to_string(),
            ]
        );
    }

    #[test]
    fn state_snapshot_reflects_properties() {
        let (e, _rx) = polled(session(TemperatureReading::Celsius(21.5), "sparmodus", "forcedNormal"));
        let state = e.state();
        assert_eq!(state.state, OperationState::Eco);
        assert_eq!(state.current_temperature, Some(21.5));
        assert_eq!(state.away_mode, Some(false));
        assert_eq!(state.is_on, Some(true));

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "eco");
        assert_eq!(json["unit_of_measurement"], "°C");
        assert_eq!(json["supported_features"], 5249);
        assert_eq!(json["operation_list"], serde_json::json!(["off", "heat", "eco", "auto"]));
    }
}
