use serde::{Deserialize, Serialize};

/// How a frame is reduced to a single level sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelMode {
    /// Largest absolute sample
    #[default]
    Peak,
    /// Root mean square
    Rms,
}

/// Reduce raw samples to a level in [0, 1]. Non-finite samples are ignored.
pub fn frame_level(samples: &[f32], mode: LevelMode) -> f32 {
    let finite = samples.iter().copied().filter(|s| s.is_finite());

    let level = match mode {
        LevelMode::Peak => finite.map(f32::abs).fold(0.0_f32, f32::max),
        LevelMode::Rms => {
            let (sum, count) = finite.fold((0.0_f64, 0usize), |(sum, count), s| {
                (sum + f64::from(s) * f64::from(s), count + 1)
            });
            if count == 0 {
                0.0
            } else {
                (sum / count as f64).sqrt() as f32
            }
        }
    };

    level.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_is_silent() {
        assert_eq!(frame_level(&[], LevelMode::Peak), 0.0);
        assert_eq!(frame_level(&[], LevelMode::Rms), 0.0);
    }

    #[test]
    fn peak_uses_absolute_value() {
        assert_eq!(frame_level(&[0.1, -0.8, 0.3], LevelMode::Peak), 0.8);
    }

    #[test]
    fn rms_of_constant_signal() {
        let level = frame_level(&[0.5; 64], LevelMode::Rms);
        assert!((level - 0.5).abs() < 1e-6);
    }

    #[test]
    fn level_is_clamped_and_ignores_nan() {
        assert_eq!(frame_level(&[2.0, f32::NAN], LevelMode::Peak), 1.0);
        assert_eq!(frame_level(&[f32::NAN], LevelMode::Rms), 0.0);
    }
}
