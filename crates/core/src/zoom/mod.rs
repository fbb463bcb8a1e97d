use serde::{Deserialize, Serialize};

use crate::{config::ZoomConfig, Result};

/// Multiplicative step applied to the time zoom per scroll event.
pub const TIME_ZOOM_STEP: f64 = 1.1;

/// Current zoom parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    /// Pixels per raw sample.
    pub time_zoom: f64,
    /// Vertical gain applied to loudness values.
    pub amplitude_zoom: f32,
}

/// Normalized scroll input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomEvent {
    pub delta_y: f32,
    /// Routes the event to the amplitude zoom (Ctrl/Cmd held).
    pub modifier_held: bool,
}

impl ZoomEvent {
    pub fn time(delta_y: f32) -> Self {
        Self {
            delta_y,
            modifier_held: false,
        }
    }

    pub fn amplitude(delta_y: f32) -> Self {
        Self {
            delta_y,
            modifier_held: true,
        }
    }
}

impl ZoomState {
    /// Start values from the config, clamped into range. A non-finite default
    /// starts at the bottom of its range.
    pub fn initial(limits: &ZoomConfig) -> Self {
        let time_default = if limits.time_default.is_finite() {
            limits.time_default
        } else {
            limits.time_min
        };
        let amplitude_default = if limits.amplitude_default.is_finite() {
            limits.amplitude_default
        } else {
            limits.amplitude_min
        };
        Self {
            time_zoom: time_default.clamp(limits.time_min, limits.time_max),
            amplitude_zoom: amplitude_default.clamp(limits.amplitude_min, limits.amplitude_max),
        }
    }

    /// Applies one event. Pure: the result depends only on the inputs.
    ///
    /// Time zoom steps multiplicatively so that each notch feels the same
    /// across the whole range; amplitude zoom steps additively.
    /// Non-finite deltas are ignored.
    pub fn apply(self, event: ZoomEvent, limits: &ZoomConfig) -> Self {
        if !event.delta_y.is_finite() {
            return self;
        }
        let mut next = self;
        if event.modifier_held {
            next.amplitude_zoom = (self.amplitude_zoom + event.delta_y)
                .clamp(limits.amplitude_min, limits.amplitude_max);
        } else {
            let factor = if event.delta_y > 0.0 {
                TIME_ZOOM_STEP
            } else if event.delta_y < 0.0 {
                TIME_ZOOM_STEP.recip()
            } else {
                1.0
            };
            next.time_zoom = (self.time_zoom * factor).clamp(limits.time_min, limits.time_max);
        }
        next
    }
}

/// Owns the zoom state and its limits.
#[derive(Debug, Clone)]
pub struct ZoomController {
    limits: ZoomConfig,
    state: ZoomState,
}

impl ZoomController {
    pub fn new(limits: ZoomConfig) -> Result<Self> {
        limits.validate()?;
        let state = ZoomState::initial(&limits);
        Ok(Self { limits, state })
    }

    pub fn state(&self) -> ZoomState {
        self.state
    }

    pub fn limits(&self) -> &ZoomConfig {
        &self.limits
    }

    /// Applies `event` and reports whether a redraw is needed.
    pub fn handle(&mut self, event: ZoomEvent) -> bool {
        let next = self.state.apply(event, &self.limits);
        let changed = next != self.state;
        if changed {
            tracing::trace!(
                time_zoom = next.time_zoom,
                amplitude_zoom = next.amplitude_zoom,
                "zoom changed"
            );
        }
        self.state = next;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ZoomController {
        ZoomController::new(ZoomConfig::default()).unwrap()
    }

    #[test]
    fn starts_from_configured_defaults() {
        let zoom = controller();
        assert_eq!(
            zoom.state(),
            ZoomState {
                time_zoom: 5.0,
                amplitude_zoom: 1.0
            }
        );
    }

    #[test]
    fn zoom_in_steps_multiply_until_clamped() {
        let mut zoom = controller();
        let z0 = zoom.state().time_zoom;
        let max = zoom.limits().time_max;

        for k in 1..=40 {
            zoom.handle(ZoomEvent::time(1.0));
            let expected = (z0 * TIME_ZOOM_STEP.powi(k)).clamp(0.0001, max);
            let actual = zoom.state().time_zoom;
            assert!(
                (actual - expected).abs() <= expected * 1e-9,
                "step {k}: {actual} vs {expected}"
            );
        }

        assert_eq!(zoom.state().time_zoom, max);
        assert!(!zoom.handle(ZoomEvent::time(3.0)));
        assert_eq!(zoom.state().time_zoom, max);
    }

    #[test]
    fn zoom_out_divides_by_the_same_step() {
        let limits = ZoomConfig::default();
        let state = ZoomState::initial(&limits).apply(ZoomEvent::time(-1.0), &limits);
        assert!((state.time_zoom - 5.0 / 1.1).abs() < 1e-12);

        let back = state.apply(ZoomEvent::time(0.5), &limits);
        assert!((back.time_zoom - 5.0).abs() < 1e-12);
    }

    #[test]
    fn zero_delta_leaves_time_zoom_alone() {
        let mut zoom = controller();
        assert!(!zoom.handle(ZoomEvent::time(0.0)));
        assert_eq!(zoom.state().time_zoom, 5.0);
    }

    #[test]
    fn modifier_adjusts_amplitude_additively_and_clamps() {
        let mut zoom = controller();
        assert!(zoom.handle(ZoomEvent::amplitude(2.5)));
        assert_eq!(zoom.state().amplitude_zoom, 3.5);
        assert_eq!(zoom.state().time_zoom, 5.0);

        zoom.handle(ZoomEvent::amplitude(100.0));
        assert_eq!(zoom.state().amplitude_zoom, 10.0);

        zoom.handle(ZoomEvent::amplitude(-100.0));
        assert_eq!(zoom.state().amplitude_zoom, 0.5);
    }

    #[test]
    fn out_of_range_default_is_clamped() {
        let limits = ZoomConfig {
            time_default: 500.0,
            amplitude_default: 0.0,
            ..ZoomConfig::default()
        };
        let state = ZoomState::initial(&limits);
        assert_eq!(state.time_zoom, 50.0);
        assert_eq!(state.amplitude_zoom, 0.5);
    }

    #[test]
    fn non_finite_deltas_leave_state_in_range() {
        let mut zoom = controller();
        assert!(!zoom.handle(ZoomEvent::amplitude(f32::NAN)));
        assert!(!zoom.handle(ZoomEvent::amplitude(f32::INFINITY)));
        assert!(!zoom.handle(ZoomEvent::time(f32::NAN)));
        assert_eq!(zoom.state().amplitude_zoom, 1.0);
        assert_eq!(zoom.state().time_zoom, 5.0);

        assert!(zoom.handle(ZoomEvent::amplitude(1.0)));
        assert_eq!(zoom.state().amplitude_zoom, 2.0);
    }

    #[test]
    fn non_finite_defaults_are_rejected_or_clamped() {
        let limits = ZoomConfig {
            amplitude_default: f32::NAN,
            time_default: f64::INFINITY,
            ..ZoomConfig::default()
        };
        let state = ZoomState::initial(&limits);
        assert_eq!(state.amplitude_zoom, 0.5);
        assert_eq!(state.time_zoom, 0.0001);
        assert!(ZoomController::new(limits).is_err());
    }

    #[test]
    fn rejects_inverted_limits() {
        let limits = ZoomConfig {
            amplitude_min: 4.0,
            amplitude_max: 1.0,
            ..ZoomConfig::default()
        };
        assert!(ZoomController::new(limits).is_err());
    }
}
