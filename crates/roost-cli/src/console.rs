use std::io::{self, BufRead, Write};
use std::sync::Arc;

use roost_control::config::{FilterKind, Mode, Regulator};
use roost_control::state::SystemState;
use roost_control::values::Axis;

use crate::shared::Shared;

/// Command vocabulary with the help text shown by `help`. Order matters:
/// the help output groups entries by the section breaks in `print_help`.
const COMMANDS: &[(&str, &str)] = &[
    ("start", "Starts the program."),
    ("stop", "Stops the vehicle and halts the program."),
    ("help", "Displays this help ('h' can also be used)."),
    ("pause", "Stops the vehicle and pauses the program ('p' can also be used)."),
    ("resume", "Resumes the program after 'pause' ('r' can also be used)."),
    ("state", "Prints the system state."),
    ("vid", "Toggles the tracker video window (default on)."),
    ("markers", "Toggles the marker overlay (default off)."),
    ("axes", "Toggles the axis overlay (default off)."),
    ("webcam", "Swaps the camera between local and external (default local)."),
    ("pose", "Prints the last position/orientation ('P' can also be used)."),
    ("pc", "Prints a pose/command/error snapshot."),
    ("print sp", "Prints the current setpoint."),
    ("set sp", "Lets you enter a new setpoint."),
    (
        "mode",
        "Switches between manual and automatic ('m' can also be used).\n\
         \t  In manual mode use x/z for throttle, d/a for roll, w/s for pitch,\n\
         \t  e/q for yaw, c to reset throttle, r to reset all values.\n\
         \t  In automatic mode only roll, pitch and yaw keys apply.\n\
         \t  Write e.g. x=1500 to give a step input.",
    ),
    ("reg off", "Disables the regulator selection."),
    ("pid", "Selects PID as regulator."),
    ("mpc", "Selects MPC as regulator."),
    ("filter off", "Disables the filter selection."),
    ("kalman", "Selects Kalman filtering."),
    ("log", "Starts or stops data logging."),
];

fn is_known_command(input: &str) -> bool {
    COMMANDS.iter().any(|(name, _)| *name == input)
}

/// Digits and '.' only; empty counts as valid (keep-old-value sentinel).
/// Matches the original operator-input rule, so signs are rejected.
fn is_numeric_input(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Interactive operator loop: one line per iteration, translated into
/// state/mode/value mutations. Generic over its streams so tests can drive
/// it with cursors instead of stdin/stdout.
pub struct Console<R, W> {
    shared: Arc<Shared>,
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(shared: Arc<Shared>, input: R, out: W) -> Self {
        Self { shared, input, out }
    }

    /// Runs until the state machine reaches Stopping or the input ends.
    /// EOF is treated as operator hang-up and stops the system.
    pub fn run(mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "Type 'start' to launch the program, 'help' for the command list."
        )?;
        let mut line = String::new();
        loop {
            write!(self.out, "$ystem command: ")?;
            self.out.flush()?;
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                self.shared.state.stop();
                break;
            }
            let input = line.trim_end_matches(['\r', '\n']).to_owned();
            self.handle(&input)?;
            if self.shared.state.is_stopping() {
                break;
            }
        }
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }

    /// Applies one input line. The ordering of the branches mirrors the
    /// precedence the operator interface has always had: named commands and
    /// their single-key shortcuts first, then step inputs, then the manual
    /// control keys as the running-state catch-all.
    fn handle(&mut self, input: &str) -> io::Result<()> {
        let state = self.shared.state.get();
        let running = state == SystemState::Running;
        let paused = state == SystemState::Paused;
        let active = running || paused;

        let step_input = input.len() >= 2 && input.as_bytes()[1] == b'=';
        if !(is_known_command(input) || input.len() == 1 || step_input) {
            if !input.is_empty() {
                writeln!(
                    self.out,
                    "\tUnrecognized command. Type 'help' for the list of available commands."
                )?;
            }
            return Ok(());
        }

        if input == "start" {
            match self.shared.state.start() {
                Some(SystemState::Paused) => writeln!(self.out, "Program resumed.")?,
                Some(_) => writeln!(self.out, "Program started.")?,
                None => writeln!(self.out, "The program is already running.")?,
            }
        } else if input == "stop" {
            write!(self.out, "Stop program? (Y/n) ")?;
            self.out.flush()?;
            let answer = self.read_line()?;
            if answer.is_empty() || answer == "y" || answer == "Y" {
                self.shared.state.stop();
            }
        } else if input == "help" || input == "h" {
            self.print_help()?;
        } else if (input == "pause" || input == "p") && running {
            if self.shared.state.pause() {
                writeln!(self.out, "\tSystem paused.")?;
            }
        } else if (input == "resume" || input == "r") && paused {
            if self.shared.state.resume() {
                writeln!(self.out, "\tProgram resumed.")?;
            }
        } else if input == "state" && active {
            self.print_system_state()?;
        } else if input == "vid" && running {
            let mut t = self.shared.toggles.lock().unwrap();
            t.video.flip();
            writeln!(self.out, "\tVideo: {}.", t.video)?;
        } else if input == "markers" && running {
            let mut t = self.shared.toggles.lock().unwrap();
            t.markers.flip();
            writeln!(self.out, "\tMarkers: {}.", t.markers)?;
        } else if input == "axes" && running {
            let mut t = self.shared.toggles.lock().unwrap();
            t.axes.flip();
            writeln!(self.out, "\tAxes: {}.", t.axes)?;
        } else if input == "webcam" && running {
            let mut t = self.shared.toggles.lock().unwrap();
            t.camera.swap();
            writeln!(self.out, "\tNew webcam: {}.", t.camera)?;
        } else if (input == "pose" || input == "P") && active {
            self.print_pose()?;
        } else if input == "pc" && running {
            self.print_pose_snapshot()?;
        } else if input == "print sp" && active {
            let sp = self.shared.config.lock().unwrap().setpoint;
            writeln!(self.out, "\tSetpoint vector: [{}, {}, {}]", sp[0], sp[1], sp[2])?;
        } else if input == "set sp" && active {
            self.set_setpoint()?;
        } else if (input == "mode" || input == "m") && active {
            let mode = {
                let mut cfg = self.shared.config.lock().unwrap();
                cfg.mode = cfg.mode.toggled();
                cfg.mode
            };
            match mode {
                Mode::Manual => writeln!(self.out, "\tOperating mode: manual.")?,
                Mode::Automatic => writeln!(
                    self.out,
                    "\tOperating mode: automatic.\n\
                     \tThe pose file is being updated, you can start the external controller."
                )?,
            }
        } else if input == "reg off" && active {
            self.shared.config.lock().unwrap().regulator = Regulator::Off;
            writeln!(self.out, "\tRegulator off.")?;
        } else if input == "pid" && active {
            self.shared.config.lock().unwrap().regulator = Regulator::Pid;
            writeln!(self.out, "\tRegulator: PID.")?;
        } else if input == "mpc" && active {
            self.shared.config.lock().unwrap().regulator = Regulator::Mpc;
            writeln!(self.out, "\tRegulator: MPC.")?;
        } else if input == "filter off" && active {
            self.shared.config.lock().unwrap().filter = FilterKind::Off;
            writeln!(self.out, "\tFilter off.")?;
        } else if input == "kalman" && active {
            self.shared.config.lock().unwrap().filter = FilterKind::Kalman;
            writeln!(self.out, "\tFilter: Kalman.")?;
        } else if input == "log" && running {
            let logging = self.shared.toggle_logging();
            writeln!(
                self.out,
                "{}",
                if logging { "\tLogging data." } else { "\tNot logging data." }
            )?;
        } else if step_input && running {
            self.apply_step_input(input)?;
        } else if running {
            self.apply_control_key(input)?;
        } else if paused {
            writeln!(
                self.out,
                "System paused, general commands are disabled. Type\n\
                 \t- 'resume' to resume the process,\n\
                 \t- 'help' to get help,\n\
                 \t- 'state' to get the system state,\n\
                 \t- 'stop' to halt the program."
            )?;
        } else if state == SystemState::Idle {
            writeln!(self.out, "\tWaiting for 'start' command.")?;
        } else {
            writeln!(
                self.out,
                "\tUnrecognized command. Type 'help' for the list of available commands."
            )?;
        }
        Ok(())
    }

    fn key_axis(&self, key: u8) -> Option<Axis> {
        let manual = self.shared.config.lock().unwrap().mode == Mode::Manual;
        match key {
            // throttle keys only work under manual control
            b'x' | b'z' if manual => Some(Axis::Throttle),
            b'd' | b'a' => Some(Axis::Roll),
            b'w' | b's' => Some(Axis::Pitch),
            b'e' | b'q' => Some(Axis::Yaw),
            _ => None,
        }
    }

    /// `<key>=<integer>` step input. A bad number is reported and nothing
    /// changes; an inapplicable key still republishes the buffer, exactly
    /// like the bare control keys.
    fn apply_step_input(&mut self, input: &str) -> io::Result<()> {
        let value: i32 = match input[2..].trim().parse() {
            Ok(v) => v,
            Err(_) => {
                writeln!(self.out, "ERROR: step value is not a number, try again.")?;
                return Ok(());
            }
        };
        if let Some(axis) = self.key_axis(input.as_bytes()[0]) {
            self.shared.values.lock().unwrap().set(axis, value);
        }
        let line = self.shared.republish_values();
        writeln!(self.out, "\tData sent: {}", line)
    }

    /// Single-key manual control and the running-state catch-all: every path
    /// through here republishes the command buffer.
    fn apply_control_key(&mut self, input: &str) -> io::Result<()> {
        {
            let mut values = self.shared.values.lock().unwrap();
            match input {
                "x" => {
                    if let Some(axis) = self.key_axis(b'x') {
                        values.adjust(axis, 25);
                    }
                }
                "z" => {
                    if let Some(axis) = self.key_axis(b'z') {
                        values.adjust(axis, -25);
                    }
                }
                "d" => values.adjust(Axis::Roll, 25),
                "a" => values.adjust(Axis::Roll, -25),
                "w" => values.adjust(Axis::Pitch, 25),
                "s" => values.adjust(Axis::Pitch, -25),
                "e" => values.adjust(Axis::Yaw, 25),
                "q" => values.adjust(Axis::Yaw, -25),
                "c" => values.reset_axis(Axis::Throttle),
                "r" => values.reset(),
                _ => {}
            }
        }
        let line = self.shared.republish_values();
        writeln!(self.out, "\tData sent: {}", line)
    }

    /// Prompts for the three setpoint components. An empty answer keeps the
    /// old component; any non-numeric answer aborts the whole edit.
    fn set_setpoint(&mut self) -> io::Result<()> {
        let mut setpoint = self.shared.config.lock().unwrap().setpoint;
        writeln!(
            self.out,
            "Enter new setpoint (empty field and ENTER keeps the old value):"
        )?;
        for (i, label) in ["x", "y", "z"].iter().enumerate() {
            write!(self.out, "\t{}-value: ", label)?;
            self.out.flush()?;
            let answer = self.read_line()?;
            if answer.is_empty() {
                continue;
            }
            match answer.parse::<f64>() {
                Ok(v) if is_numeric_input(&answer) => setpoint[i] = v,
                _ => {
                    writeln!(self.out, "ERROR: wrong input (not a number), try again.")?;
                    return Ok(());
                }
            }
        }
        self.shared.config.lock().unwrap().setpoint = setpoint;
        writeln!(
            self.out,
            "New setpoint: [{}, {}, {}]",
            setpoint[0], setpoint[1], setpoint[2]
        )
    }

    fn print_pose(&mut self) -> io::Result<()> {
        let pose = *self.shared.pose.lock().unwrap();
        writeln!(self.out, "Position\t\tOrientation:")?;
        for (i, label) in ["x", "y", "z"].iter().enumerate() {
            writeln!(
                self.out,
                "{}: {}\t\ttheta {}: {}",
                label, pose.translation[i], label, pose.rotation[i]
            )?;
        }
        Ok(())
    }

    fn print_pose_snapshot(&mut self) -> io::Result<()> {
        let pose = *self.shared.pose.lock().unwrap();
        let setpoint = self.shared.config.lock().unwrap().setpoint;
        let command = self.shared.command.lock().unwrap().current().to_owned();
        let error: Vec<f64> = pose
            .translation
            .iter()
            .zip(&setpoint)
            .map(|(t, s)| t - s)
            .collect();
        writeln!(
            self.out,
            "t,r,p,y: {}\txyz: {:?}\n\terror_xyz: {:?}\n\ttheta_xyz: {:?}",
            command, pose.translation, error, pose.rotation
        )
    }

    fn print_system_state(&mut self) -> io::Result<()> {
        let state = self.shared.state.get();
        writeln!(self.out, "System state:")?;
        match state {
            SystemState::Idle => writeln!(self.out, "\tIdle - waiting for start command.")?,
            SystemState::Stopping => writeln!(self.out, "\tStop sequence initiated...")?,
            SystemState::Running | SystemState::Paused => {
                if state == SystemState::Running {
                    writeln!(self.out, "\tProgram running.")?;
                    writeln!(
                        self.out,
                        "{}",
                        if self.shared.logging_enabled() {
                            "\tLogging data."
                        } else {
                            "\tNot logging data."
                        }
                    )?;
                } else {
                    writeln!(self.out, "\tPaused - type 'resume' to resume the process.")?;
                }
                let cfg = *self.shared.config.lock().unwrap();
                let command = self.shared.command.lock().unwrap().current().to_owned();
                writeln!(self.out, "Control parameters:")?;
                writeln!(self.out, "\t- t,r,p,y: {}", command)?;
                writeln!(self.out, "\t- Operating mode: {}.", cfg.mode)?;
                writeln!(self.out, "\t- Regulator: {}", cfg.regulator)?;
                writeln!(self.out, "\t- Filter: {}", cfg.filter)?;
                let t = self.shared.toggles.lock().unwrap();
                writeln!(
                    self.out,
                    "Video parameters:\n\t- Video: {}\n\t- Markers: {}\n\t- Axes: {}\n\t- Webcam: {}",
                    t.video, t.markers, t.axes, t.camera
                )?;
            }
        }
        Ok(())
    }

    fn print_help(&mut self) -> io::Result<()> {
        let width = COMMANDS.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        writeln!(self.out, "HELP\nList of valid commands:")?;
        for (i, (name, description)) in COMMANDS.iter().enumerate() {
            match i {
                0 => writeln!(self.out, "System commands:")?,
                6 => writeln!(self.out, "Video commands:")?,
                10 => writeln!(self.out, "Pose commands:")?,
                14 => writeln!(self.out, "Control mode and regulator commands:")?,
                _ => {}
            }
            writeln!(self.out, "\t- '{:width$}' {}", name, description)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roost_control::config::OperatingConfig;
    use std::io::Cursor;

    fn drive(shared: &Arc<Shared>, script: &str) -> String {
        let mut out = Vec::new();
        Console::new(shared.clone(), Cursor::new(script.to_owned()), &mut out)
            .run()
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn shared() -> Arc<Shared> {
        Arc::new(Shared::new(OperatingConfig::default()))
    }

    #[test]
    fn start_moves_idle_to_running() {
        let s = shared();
        let out = drive(&s, "start\n");
        assert!(out.contains("Program started."));
        // EOF after the script stops the system
        assert!(s.state.is_stopping());
    }

    #[test]
    fn start_twice_is_reported() {
        let s = shared();
        let out = drive(&s, "start\nstart\n");
        assert!(out.contains("The program is already running."));
    }

    #[test]
    fn stop_requires_confirmation() {
        let s = shared();
        s.state.start();
        let out = drive(&s, "stop\nn\nstate\n");
        assert!(s.state.is_stopping(), "EOF still stops at the end");
        // the declined stop kept the session alive long enough for 'state'
        assert!(out.contains("Program running."));
    }

    #[test]
    fn empty_confirmation_means_yes() {
        let s = shared();
        s.state.start();
        let out = drive(&s, "stop\n\nstate\n");
        assert!(s.state.is_stopping());
        // the loop exited before 'state' was read
        assert!(!out.contains("Program running."));
    }

    #[test]
    fn pause_needs_running_state() {
        let s = shared();
        let out = drive(&s, "pause\n");
        assert!(out.contains("Waiting for 'start' command."));
        assert_eq!(s.state.get(), SystemState::Stopping); // via EOF
    }

    #[test]
    fn pause_and_resume_round_trip() {
        let s = shared();
        let out = drive(&s, "start\npause\nresume\n");
        assert!(out.contains("System paused."));
        assert!(out.contains("Program resumed."));
    }

    #[test]
    fn forty_throttle_steps_saturate() {
        let s = shared();
        let script = format!("start\n{}", "x\n".repeat(40));
        drive(&s, &script);
        assert_eq!(s.values.lock().unwrap().throttle(), 2000);
        assert_eq!(s.command.lock().unwrap().current(), "2000,1500,1500,1500");
    }

    #[test]
    fn throttle_keys_are_manual_only() {
        let s = shared();
        drive(&s, "start\nmode\nx\nd\n");
        let values = s.values.lock().unwrap();
        assert_eq!(values.throttle(), 1000, "x is inert in automatic mode");
        assert_eq!(values.roll(), 1525, "roll keys work regardless of mode");
    }

    #[test]
    fn r_resumes_when_paused_and_resets_when_running() {
        let s = shared();
        drive(&s, "start\nw\npause\nr\nr\n");
        // first r resumed, second r reset the pitch adjustment
        assert_eq!(s.values.lock().unwrap().pitch(), 1500);
        assert_eq!(s.state.get(), SystemState::Stopping); // via EOF
    }

    #[test]
    fn step_input_sets_an_explicit_value() {
        let s = shared();
        let out = drive(&s, "start\nw=1600\n");
        assert_eq!(s.values.lock().unwrap().pitch(), 1600);
        assert!(out.contains("Data sent: 1000,1500,1600,1500"));
    }

    #[test]
    fn garbled_step_input_changes_nothing() {
        let s = shared();
        let out = drive(&s, "start\nw=abc\n");
        assert_eq!(s.values.lock().unwrap().pitch(), 1500);
        assert!(out.contains("ERROR: step value is not a number"));
        assert!(!out.contains("Data sent:"));
    }

    #[test]
    fn step_inputs_are_clamped() {
        let s = shared();
        drive(&s, "start\nd=9000\n");
        assert_eq!(s.values.lock().unwrap().roll(), 2000);
    }

    #[test]
    fn set_sp_keeps_components_on_empty_input() {
        let s = shared();
        let out = drive(&s, "start\nset sp\n1.0\n\n0.5\n");
        assert_eq!(s.config.lock().unwrap().setpoint, [1.0, 0.0, 0.5]);
        assert!(out.contains("New setpoint: [1, 0, 0.5]"));
    }

    #[test]
    fn set_sp_aborts_wholesale_on_bad_input() {
        let s = shared();
        let out = drive(&s, "start\nset sp\n1.0\noops\n0.5\n");
        assert_eq!(s.config.lock().unwrap().setpoint, [0.0, 0.0, 0.8]);
        assert!(out.contains("ERROR: wrong input"));
    }

    #[test]
    fn set_sp_rejects_signed_numbers() {
        let s = shared();
        drive(&s, "start\nset sp\n-1.0\n\n\n");
        assert_eq!(s.config.lock().unwrap().setpoint, [0.0, 0.0, 0.8]);
    }

    #[test]
    fn selector_commands_update_the_config() {
        let s = shared();
        drive(&s, "start\npid\nkalman\n");
        let cfg = *s.config.lock().unwrap();
        assert_eq!(cfg.regulator, Regulator::Pid);
        assert_eq!(cfg.filter, FilterKind::Kalman);
    }

    #[test]
    fn toggles_flip_and_report() {
        let s = shared();
        let out = drive(&s, "start\nvid\nmarkers\nwebcam\n");
        assert!(out.contains("Video: off."));
        assert!(out.contains("Markers: on."));
        assert!(out.contains("New webcam: external."));
        let t = s.toggles.lock().unwrap();
        assert!(!t.video.is_on());
        assert!(t.markers.is_on());
    }

    #[test]
    fn log_toggle_reports_both_ways() {
        let s = shared();
        let out = drive(&s, "start\nlog\nlog\n");
        assert!(out.contains("\tLogging data."));
        assert!(out.contains("\tNot logging data."));
        assert!(!s.logging_enabled());
    }

    #[test]
    fn unrecognized_input_is_reported_and_ignored() {
        let s = shared();
        let out = drive(&s, "start\nfly to the moon\n");
        assert!(out.contains("Unrecognized command."));
        assert_eq!(s.values.lock().unwrap().throttle(), 1000);
    }

    #[test]
    fn empty_lines_are_silently_skipped() {
        let s = shared();
        let out = drive(&s, "\n\nstart\n");
        assert!(!out.contains("Unrecognized"));
        assert!(out.contains("Program started."));
    }

    #[test]
    fn help_lists_the_whole_vocabulary() {
        let s = shared();
        let out = drive(&s, "h\n");
        for (name, _) in COMMANDS {
            assert!(out.contains(name), "help is missing {name}");
        }
    }
}
