//! Adjustable viewer parameters and their keyboard bindings

use std::fmt;

/// Deepest level offered by the controls. Deeper levels are valid for the
/// engine but too heavy to explore interactively.
pub const PANEL_MAX_DEPTH: u32 = 6;

/// Closed numeric range with a step size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    /// Clamp into the range and snap to the nearest step
    pub fn clamp(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.min;
        }
        let steps = ((value - self.min) / self.step).round();
        (self.min + steps * self.step).clamp(self.min, self.max)
    }

    pub fn step_up(&self, value: f32) -> f32 {
        self.clamp(value + self.step)
    }

    pub fn step_down(&self, value: f32) -> f32 {
        self.clamp(value - self.step)
    }
}

pub const LIGHT_INTENSITY_RANGE: ParamRange = ParamRange::new(0.0, 3.0, 0.1);
pub const ROTATION_SPEED_RANGE: ParamRange = ParamRange::new(0.0, 0.01, 0.001);
pub const PULSATE_SPEED_RANGE: ParamRange = ParamRange::new(0.1, 2.0, 0.1);
pub const PULSATE_AMOUNT_RANGE: ParamRange = ParamRange::new(0.0, 0.1, 0.005);

/// Values driving generation, lighting and motion
#[derive(Debug, Clone, PartialEq)]
pub struct ControlParams {
    pub depth: u32,
    pub light_intensity: f32,
    /// Radians added to the model's X rotation per frame
    pub rotation_speed_x: f32,
    /// Radians added to the model's Y rotation per frame
    pub rotation_speed_y: f32,
    pub pulsate: bool,
    pub pulsate_speed: f32,
    /// Peak deviation of the scale factor from 1
    pub pulsate_amount: f32,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            depth: 3,
            light_intensity: 1.5,
            rotation_speed_x: 0.002,
            rotation_speed_y: 0.003,
            pulsate: false,
            pulsate_speed: 0.8,
            pulsate_amount: 0.03,
        }
    }
}

/// Something the user asked for from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    SetDepth(u32),
    DepthUp,
    DepthDown,
    Generate,
    LightUp,
    LightDown,
    RotationXUp,
    RotationXDown,
    RotationYUp,
    RotationYDown,
    TogglePulsate,
    PulsateSpeedUp,
    PulsateSpeedDown,
    PulsateAmountUp,
    PulsateAmountDown,
    ResetParams,
    ResetCamera,
    Help,
    Quit,
}

/// Key bindings as `(key, description)` pairs, in help order
pub const KEY_BINDINGS: &[(&str, &str)] = &[
    ("0-6", "set depth"),
    ("[ / ]", "depth down / up"),
    ("g / Enter", "generate at the current depth"),
    ("k / l", "light intensity down / up"),
    ("x / X", "rotation X speed down / up"),
    ("y / Y", "rotation Y speed down / up"),
    ("p", "toggle pulsate"),
    ("s / S", "pulsate speed down / up"),
    ("a / A", "pulsate amount down / up"),
    ("r", "reset parameters"),
    ("c", "reset camera"),
    ("h", "show key bindings"),
    ("Esc", "quit"),
];

impl ControlAction {
    /// Action bound to a typed character, if any. Case is significant.
    pub fn from_key(key: &str) -> Option<Self> {
        let action = match key {
            "[" => Self::DepthDown,
            "]" => Self::DepthUp,
            "g" | "G" => Self::Generate,
            "k" => Self::LightDown,
            "l" => Self::LightUp,
            "x" => Self::RotationXDown,
            "X" => Self::RotationXUp,
            "y" => Self::RotationYDown,
            "Y" => Self::RotationYUp,
            "p" | "P" => Self::TogglePulsate,
            "s" => Self::PulsateSpeedDown,
            "S" => Self::PulsateSpeedUp,
            "a" => Self::PulsateAmountDown,
            "A" => Self::PulsateAmountUp,
            "r" | "R" => Self::ResetParams,
            "c" | "C" => Self::ResetCamera,
            "h" | "H" | "?" => Self::Help,
            digit => match digit.parse::<u32>() {
                Ok(depth) if depth <= PANEL_MAX_DEPTH => Self::SetDepth(depth),
                _ => return None,
            },
        };
        Some(action)
    }
}

impl ControlParams {
    /// Apply a parameter action. Returns whether any value changed.
    ///
    /// Actions that are not about parameters (generate, camera, help, quit)
    /// leave the params untouched and return `false`.
    pub fn apply(&mut self, action: ControlAction) -> bool {
        let before = self.clone();
        match action {
            ControlAction::SetDepth(depth) => self.depth = depth.min(PANEL_MAX_DEPTH),
            ControlAction::DepthUp => self.depth = (self.depth + 1).min(PANEL_MAX_DEPTH),
            ControlAction::DepthDown => self.depth = self.depth.saturating_sub(1),
            ControlAction::LightUp => {
                self.light_intensity = LIGHT_INTENSITY_RANGE.step_up(self.light_intensity)
            }
            ControlAction::LightDown => {
                self.light_intensity = LIGHT_INTENSITY_RANGE.step_down(self.light_intensity)
            }
            ControlAction::RotationXUp => {
                self.rotation_speed_x = ROTATION_SPEED_RANGE.step_up(self.rotation_speed_x)
            }
            ControlAction::RotationXDown => {
                self.rotation_speed_x = ROTATION_SPEED_RANGE.step_down(self.rotation_speed_x)
            }
            ControlAction::RotationYUp => {
                self.rotation_speed_y = ROTATION_SPEED_RANGE.step_up(self.rotation_speed_y)
            }
            ControlAction::RotationYDown => {
                self.rotation_speed_y = ROTATION_SPEED_RANGE.step_down(self.rotation_speed_y)
            }
            ControlAction::TogglePulsate => self.pulsate = !self.pulsate,
            ControlAction::PulsateSpeedUp => {
                self.pulsate_speed = PULSATE_SPEED_RANGE.step_up(self.pulsate_speed)
            }
            ControlAction::PulsateSpeedDown => {
                self.pulsate_speed = PULSATE_SPEED_RANGE.step_down(self.pulsate_speed)
            }
            ControlAction::PulsateAmountUp => {
                self.pulsate_amount = PULSATE_AMOUNT_RANGE.step_up(self.pulsate_amount)
            }
            ControlAction::PulsateAmountDown => {
                self.pulsate_amount = PULSATE_AMOUNT_RANGE.step_down(self.pulsate_amount)
            }
            ControlAction::ResetParams => *self = Self::default(),
            ControlAction::Generate
            | ControlAction::ResetCamera
            | ControlAction::Help
            | ControlAction::Quit => {}
        }
        *self != before
    }

    /// Clamp every value into its range
    pub fn clamped(mut self) -> Self {
        self.depth = self.depth.min(PANEL_MAX_DEPTH);
        self.light_intensity = LIGHT_INTENSITY_RANGE.clamp(self.light_intensity);
        self.rotation_speed_x = ROTATION_SPEED_RANGE.clamp(self.rotation_speed_x);
        self.rotation_speed_y = ROTATION_SPEED_RANGE.clamp(self.rotation_speed_y);
        self.pulsate_speed = PULSATE_SPEED_RANGE.clamp(self.pulsate_speed);
        self.pulsate_amount = PULSATE_AMOUNT_RANGE.clamp(self.pulsate_amount);
        self
    }

    /// One-line summary for the window title
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ControlParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "depth {} | light {:.1} | rotation {:.3}/{:.3}",
            self.depth, self.light_intensity, self.rotation_speed_x, self.rotation_speed_y
        )?;
        if self.pulsate {
            write!(
                f,
                " | pulsate {:.1} x {:.3}",
                self.pulsate_speed, self.pulsate_amount
            )
        } else {
            write!(f, " | pulsate off")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_range_clamps_and_snaps() {
        let range = ParamRange::new(0.0, 0.1, 0.005);
        assert_relative_eq!(range.clamp(-1.0), 0.0);
        assert_relative_eq!(range.clamp(1.0), 0.1);
        assert_relative_eq!(range.clamp(0.031), 0.03, epsilon = 1e-6);
        assert_relative_eq!(range.clamp(f32::NAN), 0.0);
    }

    #[test]
    fn test_stepping_stops_at_bounds() {
        let mut params = ControlParams::default();
        for _ in 0..100 {
            params.apply(ControlAction::LightUp);
        }
        assert_relative_eq!(params.light_intensity, 3.0, epsilon = 1e-5);
        assert!(!params.apply(ControlAction::LightUp));

        for _ in 0..100 {
            params.apply(ControlAction::PulsateSpeedDown);
        }
        assert_relative_eq!(params.pulsate_speed, 0.1, epsilon = 1e-5);
    }

    #[test]
    fn test_depth_stays_in_panel_range() {
        let mut params = ControlParams::default();
        for _ in 0..10 {
            params.apply(ControlAction::DepthUp);
        }
        assert_eq!(params.depth, PANEL_MAX_DEPTH);

        params.apply(ControlAction::SetDepth(0));
        assert!(!params.apply(ControlAction::DepthDown));
        assert_eq!(params.depth, 0);
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(ControlAction::from_key("4"), Some(ControlAction::SetDepth(4)));
        assert_eq!(ControlAction::from_key("7"), None);
        assert_eq!(ControlAction::from_key("X"), Some(ControlAction::RotationXUp));
        assert_eq!(ControlAction::from_key("x"), Some(ControlAction::RotationXDown));
        assert_eq!(ControlAction::from_key("g"), Some(ControlAction::Generate));
        assert_eq!(ControlAction::from_key("q"), None);
    }

    #[test]
    fn test_non_param_actions_change_nothing() {
        let mut params = ControlParams::default();
        assert!(!params.apply(ControlAction::Generate));
        assert!(!params.apply(ControlAction::ResetCamera));
        assert_eq!(params, ControlParams::default());
    }

    #[test]
    fn test_reset_and_summary() {
        let mut params = ControlParams::default();
        params.apply(ControlAction::TogglePulsate);
        params.apply(ControlAction::SetDepth(5));
        assert_eq!(
            params.summary(),
            "depth 5 | light 1.5 | rotation 0.002/0.003 | pulsate 0.8 x 0.030"
        );

        assert!(params.apply(ControlAction::ResetParams));
        assert_eq!(
            params.summary(),
            "depth 3 | light 1.5 | rotation 0.002/0.003 | pulsate off"
        );
    }

    #[test]
    fn test_clamped() {
        let params = ControlParams {
            depth: 9,
            light_intensity: 7.0,
            rotation_speed_x: -1.0,
            ..ControlParams::default()
        }
        .clamped();
        assert_eq!(params.depth, PANEL_MAX_DEPTH);
        assert_relative_eq!(params.light_intensity, 3.0, epsilon = 1e-5);
        assert_relative_eq!(params.rotation_speed_x, 0.0);
    }
}
