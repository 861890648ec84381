/// Change to the preview magnification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomAction {
    In,
    Out,
    Reset,
}

/// Preview magnification in whole percent, between 50% and 500%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Zoom(u16);

impl Zoom {
    pub const STEP_PERCENT: u16 = 20;
    pub const MIN_PERCENT: u16 = 50;
    pub const MAX_PERCENT: u16 = 500;

    pub const fn actual() -> Self {
        Self(100)
    }

    pub const fn percent(self) -> u16 {
        self.0
    }

    /// Multiplier applied to the fitted preview width.
    pub fn factor(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    #[must_use]
    pub const fn apply(self, action: ZoomAction) -> Self {
        match action {
            ZoomAction::In => {
                let next = self.0 + Self::STEP_PERCENT;
                Self(if next > Self::MAX_PERCENT { Self::MAX_PERCENT } else { next })
            }
            ZoomAction::Out => {
                let next = self.0.saturating_sub(Self::STEP_PERCENT);
                Self(if next < Self::MIN_PERCENT { Self::MIN_PERCENT } else { next })
            }
            ZoomAction::Reset => Self::actual(),
        }
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self::actual()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeat(zoom: Zoom, action: ZoomAction, times: usize) -> Zoom {
        (0..times).fold(zoom, |z, _| z.apply(action))
    }

    #[test]
    fn test_steps_of_twenty_percent() {
        let zoom = Zoom::actual().apply(ZoomAction::In);
        assert_eq!(zoom.percent(), 120);
        assert_eq!(zoom.apply(ZoomAction::Out).apply(ZoomAction::Out).percent(), 80);
        assert!((Zoom::actual().apply(ZoomAction::In).factor() - 1.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_zoom_is_clamped() {
        assert_eq!(repeat(Zoom::actual(), ZoomAction::In, 50).percent(), 500);
        assert_eq!(repeat(Zoom::actual(), ZoomAction::Out, 50).percent(), 50);
        // 100 -> 80 -> 60 -> 50, not 40.
        assert_eq!(repeat(Zoom::actual(), ZoomAction::Out, 3).percent(), 50);
    }

    #[test]
    fn test_reset_returns_to_actual_size() {
        let zoom = repeat(Zoom::actual(), ZoomAction::In, 7);
        assert_eq!(zoom.apply(ZoomAction::Reset), Zoom::actual());
        assert_eq!(Zoom::default().percent(), 100);
    }
}
