/// Gamepad input for the map cursor, using gilrs.
///
/// gilrs events are first translated into `PadInput` and then folded into
/// `GamepadState`, so the state logic is the same with or without the
/// `gamepad` feature.
///
/// Default mapping (overridable in `[gamepad]`):
///   D-pad / Left Stick    →  map cursor
///   A / Start             →  guess the country under the cursor
///   Y                     →  cycle difficulty
///   Select                →  quit

use std::collections::HashSet;

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Face and shoulder buttons that can be bound to an action.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PadButton {
    South,
    East,
    West,
    North,
    LeftShoulder,
    RightShoulder,
    Start,
    Select,
}

impl PadButton {
    /// Config names. Xbox letters are accepted alongside positions.
    fn parse(name: &str) -> Option<PadButton> {
        use PadButton::*;
        Some(match name.trim().to_uppercase().as_str() {
            "A" | "SOUTH" => South,
            "B" | "EAST" => East,
            "X" | "WEST" => West,
            "Y" | "NORTH" => North,
            "LB" | "L1" => LeftShoulder,
            "RB" | "R1" => RightShoulder,
            "START" => Start,
            "SELECT" | "BACK" => Select,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
enum Dir {
    Up,
    Down,
    Left,
    Right,
}

/// One normalized gamepad event.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
enum PadInput {
    Press(PadButton),
    Release(PadButton),
    Dpad(Dir, bool),
    StickX(f32),
    StickY(f32),
    Lost,
}

/// D-pad buttons and the left stick merged into one cursor direction.
#[derive(Clone, Copy, Debug, Default)]
struct CursorDir {
    dpad: [bool; 4],
    stick: (f32, f32),
}

impl CursorDir {
    fn set_dpad(&mut self, dir: Dir, down: bool) {
        self.dpad[dir as usize] = down;
    }

    /// `(dx, dy)` in map cells, y growing downwards. D-pad wins over the stick.
    fn delta(&self) -> (i32, i32) {
        let axis = |neg: Dir, pos: Dir, stick: f32| -> i32 {
            match (self.dpad[neg as usize], self.dpad[pos as usize]) {
                (true, false) => -1,
                (false, true) => 1,
                _ if stick < -STICK_DEADZONE => -1,
                _ if stick > STICK_DEADZONE => 1,
                _ => 0,
            }
        };
        // Stick Y is positive upwards.
        (axis(Dir::Left, Dir::Right, self.stick.0), axis(Dir::Up, Dir::Down, -self.stick.1))
    }
}

/// Which buttons trigger each game action.
#[derive(Clone, Debug, PartialEq)]
struct Bindings {
    confirm: Vec<PadButton>,
    difficulty: Vec<PadButton>,
    quit: Vec<PadButton>,
}

impl Default for Bindings {
    fn default() -> Self {
        Bindings {
            confirm: vec![PadButton::South, PadButton::Start],
            difficulty: vec![PadButton::North],
            quit: vec![PadButton::Select],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,
    held: HashSet<PadButton>,
    /// Buttons that went down since the last `update()`.
    pressed: HashSet<PadButton>,
    cursor: CursorDir,
    bindings: Bindings,
    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs = Gilrs::new().ok();
        #[cfg(feature = "gamepad")]
        let connected = gilrs.as_ref().map_or(false, |g| g.gamepads().next().is_some());
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs,
            held: HashSet::new(),
            pressed: HashSet::new(),
            cursor: CursorDir::default(),
            bindings: Bindings::default(),
            connected,
        }
    }

    /// Replace bindings from config. An empty or unparseable list keeps the default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn rebind(slot: &mut Vec<PadButton>, names: &[String]) {
            let parsed: Vec<_> = names.iter().filter_map(|n| PadButton::parse(n)).collect();
            if !parsed.is_empty() {
                *slot = parsed;
            }
        }
        rebind(&mut self.bindings.confirm, &cfg.confirm);
        rebind(&mut self.bindings.difficulty, &cfg.difficulty);
        rebind(&mut self.bindings.quit, &cfg.quit);
    }

    /// Call once per frame.
    pub fn update(&mut self) {
        self.pressed.clear();

        #[cfg(feature = "gamepad")]
        {
            let mut inputs = Vec::new();
            if let Some(gilrs) = &mut self.gilrs {
                while let Some(ev) = gilrs.next_event() {
                    if matches!(ev.event, EventType::Connected) {
                        self.connected = true;
                    }
                    inputs.extend(translate(ev.event));
                }
            }
            for input in inputs {
                self.apply(input);
            }
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn apply(&mut self, input: PadInput) {
        match input {
            PadInput::Press(b) => {
                self.connected = true;
                if self.held.insert(b) {
                    self.pressed.insert(b);
                }
            }
            PadInput::Release(b) => {
                self.held.remove(&b);
            }
            PadInput::Dpad(dir, down) => self.cursor.set_dpad(dir, down),
            PadInput::StickX(v) => self.cursor.stick.0 = v,
            PadInput::StickY(v) => self.cursor.stick.1 = v,
            PadInput::Lost => {
                self.connected = false;
                self.held.clear();
                self.cursor = CursorDir::default();
            }
        }
    }

    fn fired(&self, buttons: &[PadButton]) -> bool {
        buttons.iter().any(|b| self.pressed.contains(b))
    }

    pub fn confirm_pressed(&self) -> bool {
        self.fired(&self.bindings.confirm)
    }

    pub fn difficulty_pressed(&self) -> bool {
        self.fired(&self.bindings.difficulty)
    }

    pub fn quit_pressed(&self) -> bool {
        self.fired(&self.bindings.quit)
    }

    /// Held cursor direction as `(dx, dy)`, each in -1..=1.
    pub fn cursor_delta(&self) -> (i32, i32) {
        self.cursor.delta()
    }
}

#[cfg(feature = "gamepad")]
fn translate(event: EventType) -> Option<PadInput> {
    let dpad = |b: Button| match b {
        Button::DPadUp => Some(Dir::Up),
        Button::DPadDown => Some(Dir::Down),
        Button::DPadLeft => Some(Dir::Left),
        Button::DPadRight => Some(Dir::Right),
        _ => None,
    };
    let face = |b: Button| match b {
        Button::South => Some(PadButton::South),
        Button::East => Some(PadButton::East),
        Button::West => Some(PadButton::West),
        Button::North => Some(PadButton::North),
        Button::LeftTrigger => Some(PadButton::LeftShoulder),
        Button::RightTrigger => Some(PadButton::RightShoulder),
        Button::Start => Some(PadButton::Start),
        Button::Select => Some(PadButton::Select),
        _ => None,
    };
    match event {
        EventType::ButtonPressed(b, _) => dpad(b)
            .map(|d| PadInput::Dpad(d, true))
            .or_else(|| face(b).map(PadInput::Press)),
        EventType::ButtonReleased(b, _) => dpad(b)
            .map(|d| PadInput::Dpad(d, false))
            .or_else(|| face(b).map(PadInput::Release)),
        EventType::AxisChanged(Axis::LeftStickX, v, _) => Some(PadInput::StickX(v)),
        EventType::AxisChanged(Axis::LeftStickY, v, _) => Some(PadInput::StickY(v)),
        EventType::Disconnected => Some(PadInput::Lost),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad() -> GamepadState {
        GamepadState::new()
    }

    #[test]
    fn button_names_parse() {
        assert_eq!(PadButton::parse("a"), Some(PadButton::South));
        assert_eq!(PadButton::parse(" North "), Some(PadButton::North));
        assert_eq!(PadButton::parse("back"), Some(PadButton::Select));
        assert_eq!(PadButton::parse("turbo"), None);
    }

    #[test]
    fn config_overrides_only_valid_lists() {
        let mut gp = pad();
        gp.load_button_config(&GamepadConfig {
            confirm: vec!["B".into()],
            difficulty: vec!["nonsense".into()],
            quit: vec![],
        });
        assert_eq!(gp.bindings.confirm, vec![PadButton::East]);
        assert_eq!(gp.bindings.difficulty, vec![PadButton::North]);
        assert_eq!(gp.bindings.quit, vec![PadButton::Select]);
    }

    #[test]
    fn press_fires_once_per_push() {
        let mut gp = pad();
        gp.apply(PadInput::Press(PadButton::South));
        assert!(gp.confirm_pressed());
        assert!(!gp.difficulty_pressed());

        gp.update();
        gp.apply(PadInput::Press(PadButton::South));
        assert!(!gp.confirm_pressed(), "still held, not a new press");

        gp.apply(PadInput::Release(PadButton::South));
        gp.apply(PadInput::Press(PadButton::South));
        assert!(gp.confirm_pressed());
    }

    #[test]
    fn dpad_and_stick_share_one_direction() {
        let mut gp = pad();
        assert_eq!(gp.cursor_delta(), (0, 0));

        gp.apply(PadInput::StickX(-0.8));
        gp.apply(PadInput::StickY(0.9));
        assert_eq!(gp.cursor_delta(), (-1, -1));

        gp.apply(PadInput::Dpad(Dir::Right, true));
        assert_eq!(gp.cursor_delta(), (1, -1));

        gp.apply(PadInput::StickY(0.1));
        gp.apply(PadInput::Dpad(Dir::Down, true));
        assert_eq!(gp.cursor_delta(), (1, 1));
    }

    #[test]
    fn small_stick_motion_is_ignored() {
        let mut gp = pad();
        gp.apply(PadInput::StickX(0.2));
        gp.apply(PadInput::StickY(-0.2));
        assert_eq!(gp.cursor_delta(), (0, 0));
    }

    #[test]
    fn disconnect_releases_everything() {
        let mut gp = pad();
        gp.apply(PadInput::Press(PadButton::North));
        gp.apply(PadInput::Dpad(Dir::Left, true));
        gp.apply(PadInput::Lost);
        assert!(!gp.connected);
        assert!(gp.held.is_empty());
        assert_eq!(gp.cursor_delta(), (0, 0));
    }
}
