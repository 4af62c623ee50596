use serde::{Deserialize, Serialize};

/// ColorBrewer RdYlGn, red (negative) through yellow to green (positive).
const RD_YL_GN: [(u8, u8, u8); 11] = [
    (0xa5, 0x00, 0x26),
    (0xd7, 0x30, 0x27),
    (0xf4, 0x6d, 0x43),
    (0xfd, 0xae, 0x61),
    (0xfe, 0xe0, 0x8b),
    (0xff, 0xff, 0xbf),
    (0xd9, 0xef, 0x8b),
    (0xa6, 0xd9, 0x6a),
    (0x66, 0xbd, 0x63),
    (0x1a, 0x98, 0x50),
    (0x00, 0x68, 0x37),
];

/// Diverging color scale centered on zero and symmetric about the largest
/// absolute value, so the sign of a return always decides the hue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScale {
    pub name: String,
    pub min: f64,
    pub mid: f64,
    pub max: f64,
}

impl ColorScale {
    pub fn centered<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let max_abs = values
            .into_iter()
            .flatten()
            .filter(|v| v.is_finite())
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let bound = if max_abs == 0.0 { 1.0 } else { max_abs };
        Self {
            name: "RdYlGn".to_string(),
            min: -bound,
            mid: 0.0,
            max: bound,
        }
    }

    /// Position of `value` on the scale in `[0, 1]`, 0.5 being the midpoint.
    pub fn position(&self, value: f64) -> f64 {
        let half = (self.max - self.mid).max(f64::EPSILON);
        (0.5 + (value - self.mid) / (2.0 * half)).clamp(0.0, 1.0)
    }

    /// Hex color for a defined value; undefined values get no color.
    pub fn color_for(&self, value: Option<f64>) -> Option<String> {
        let value = value.filter(|v| v.is_finite())?;
        let t = self.position(value) * (RD_YL_GN.len() - 1) as f64;
        let lower = t.floor() as usize;
        let upper = (lower + 1).min(RD_YL_GN.len() - 1);
        let frac = t - lower as f64;
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        let (r0, g0, b0) = RD_YL_GN[lower];
        let (r1, g1, b1) = RD_YL_GN[upper];
        Some(format!(
            "#{:02x}{:02x}{:02x}",
            lerp(r0, r1),
            lerp(g0, g1),
            lerp(b0, b1)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_is_symmetric() {
        let scale = ColorScale::centered(vec![Some(-2.0), Some(5.0), None]);
        assert_eq!(scale.min, -5.0);
        assert_eq!(scale.max, 5.0);
        assert_eq!(scale.position(0.0), 0.5);
    }

    #[test]
    fn test_centered_all_undefined() {
        let scale = ColorScale::centered(vec![None, None]);
        assert_eq!((scale.min, scale.max), (-1.0, 1.0));
    }

    #[test]
    fn test_colors_at_ends_and_midpoint() {
        let scale = ColorScale::centered(vec![Some(-10.0), Some(10.0)]);
        assert_eq!(scale.color_for(Some(-10.0)).as_deref(), Some("#a50026"));
        assert_eq!(scale.color_for(Some(0.0)).as_deref(), Some("#ffffbf"));
        assert_eq!(scale.color_for(Some(10.0)).as_deref(), Some("#006837"));
        assert_eq!(scale.color_for(Some(99.0)).as_deref(), Some("#006837"));
        assert_eq!(scale.color_for(None), None);
    }
}
