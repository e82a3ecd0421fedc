use crate::error::{Result, UpscalerError};
use crate::tiling::TilingOptions;

/// The three knobs on the parameter panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    PatchSize,
    Padding,
    Spacing,
}

impl ParamKind {
    pub const ALL: [ParamKind; 3] = [ParamKind::PatchSize, ParamKind::Padding, ParamKind::Spacing];

    pub fn spec(self) -> ParamSpec {
        match self {
            ParamKind::PatchSize => ParamSpec { min: 0.0, max: 128.0, step: 1.0, default: 16.0 },
            ParamKind::Padding => ParamSpec { min: 0.0, max: 20.0, step: 1.0, default: 2.0 },
            ParamKind::Spacing => ParamSpec { min: 0.0, max: 40.0, step: 0.1, default: 2.0 },
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamKind::PatchSize => write!(f, "Patch Size"),
            ParamKind::Padding => write!(f, "Padding"),
            ParamKind::Spacing => write!(f, "Space Between Patches"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
}

impl ParamSpec {
    pub fn contains(&self, value: f32) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    /// Snap onto the step grid anchored at `min`.
    pub fn snap(&self, value: f32) -> f32 {
        let steps = ((value - self.min) / self.step).round();
        let snapped = self.min + steps * self.step;
        // keep 0.1-step values printable without float noise
        let snapped = (snapped * 1000.0).round() / 1000.0;
        snapped.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    kind: ParamKind,
    value: f32,
}

impl Parameter {
    pub fn new(kind: ParamKind) -> Self {
        Self {
            kind,
            value: kind.spec().default,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn spec(&self) -> ParamSpec {
        self.kind.spec()
    }

    /// Slider path: anything the widget hands us is pulled into range.
    pub fn clamp(&mut self, value: f32) {
        let spec = self.spec();
        if !value.is_finite() {
            return;
        }
        self.value = spec.snap(value.clamp(spec.min, spec.max));
    }

    /// Numeric-input path: out-of-range values are rejected and the
    /// current value is kept.
    pub fn try_set(&mut self, value: f32) -> Result<()> {
        let spec = self.spec();
        if !spec.contains(value) {
            return Err(UpscalerError::ParamOutOfRange {
                kind: self.kind,
                value,
                min: spec.min,
                max: spec.max,
            });
        }
        self.value = spec.snap(value);
        Ok(())
    }

    pub fn parse_and_set(&mut self, input: &str) -> Result<()> {
        let value: f32 = input
            .trim()
            .parse()
            .map_err(|_| UpscalerError::InvalidNumber(input.to_string()))?;
        self.try_set(value)
    }

    /// Text shown in the numeric input and the slider label.
    pub fn display_value(&self) -> String {
        if self.spec().step < 1.0 {
            format!("{:.1}", self.value)
        } else {
            format!("{}", self.value as u32)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters {
    pub patch_size: Parameter,
    pub padding: Parameter,
    pub spacing: Parameter,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            patch_size: Parameter::new(ParamKind::PatchSize),
            padding: Parameter::new(ParamKind::Padding),
            spacing: Parameter::new(ParamKind::Spacing),
        }
    }
}

impl Parameters {
    pub fn get(&self, kind: ParamKind) -> &Parameter {
        match kind {
            ParamKind::PatchSize => &self.patch_size,
            ParamKind::Padding => &self.padding,
            ParamKind::Spacing => &self.spacing,
        }
    }

    pub fn get_mut(&mut self, kind: ParamKind) -> &mut Parameter {
        match kind {
            ParamKind::PatchSize => &mut self.patch_size,
            ParamKind::Padding => &mut self.padding,
            ParamKind::Spacing => &mut self.spacing,
        }
    }

    pub fn tiling(&self) -> TilingOptions {
        TilingOptions {
            patch_size: self.patch_size.value() as u32,
            padding: self.padding.value() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_panel() {
        let p = Parameters::default();
        assert_eq!(p.patch_size.value(), 16.0);
        assert_eq!(p.padding.value(), 2.0);
        assert_eq!(p.spacing.value(), 2.0);
        assert_eq!(p.tiling(), TilingOptions { patch_size: 16, padding: 2 });
    }

    #[test]
    fn clamp_pulls_into_range() {
        let mut p = Parameter::new(ParamKind::PatchSize);
        p.clamp(500.0);
        assert_eq!(p.value(), 128.0);
        p.clamp(-3.0);
        assert_eq!(p.value(), 0.0);

        let mut pad = Parameter::new(ParamKind::Padding);
        pad.clamp(21.0);
        assert_eq!(pad.value(), 20.0);
    }

    #[test]
    fn clamp_ignores_nan() {
        let mut p = Parameter::new(ParamKind::Spacing);
        p.clamp(f32::NAN);
        assert_eq!(p.value(), 2.0);
    }

    #[test]
    fn try_set_rejects_out_of_range() {
        let mut p = Parameter::new(ParamKind::Spacing);
        let err = p.try_set(40.5).unwrap_err();
        assert!(matches!(err, UpscalerError::ParamOutOfRange { kind: ParamKind::Spacing, .. }));
        assert_eq!(p.value(), 2.0);

        assert!(p.try_set(-0.1).is_err());
        assert!(p.try_set(f32::INFINITY).is_err());
        assert_eq!(p.value(), 2.0);
    }

    #[test]
    fn try_set_snaps_to_step() {
        let mut p = Parameter::new(ParamKind::PatchSize);
        p.try_set(31.6).unwrap();
        assert_eq!(p.value(), 32.0);

        let mut s = Parameter::new(ParamKind::Spacing);
        s.try_set(3.14).unwrap();
        assert_eq!(s.value(), 3.1);
        assert_eq!(s.display_value(), "3.1");
    }

    #[test]
    fn bounds_are_inclusive() {
        let mut p = Parameter::new(ParamKind::Padding);
        p.try_set(0.0).unwrap();
        assert_eq!(p.value(), 0.0);
        p.try_set(20.0).unwrap();
        assert_eq!(p.value(), 20.0);
    }

    #[test]
    fn parse_rejects_garbage() {
        let mut p = Parameter::new(ParamKind::PatchSize);
        assert!(matches!(p.parse_and_set("abc"), Err(UpscalerError::InvalidNumber(_))));
        assert!(p.parse_and_set("").is_err());
        assert_eq!(p.value(), 16.0);
        p.parse_and_set(" 64 ").unwrap();
        assert_eq!(p.value(), 64.0);
        assert_eq!(p.display_value(), "64");
    }

    #[test]
    fn no_cross_field_check() {
        let mut p = Parameters::default();
        p.patch_size.try_set(4.0).unwrap();
        p.padding.try_set(20.0).unwrap();
        assert_eq!(p.tiling(), TilingOptions { patch_size: 4, padding: 20 });
    }
}
