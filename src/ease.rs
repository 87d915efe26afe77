/// Easing curves shared by effect strategies.
///
/// `EaseInOut` is the Hermite smoothstep `t^2 * (3 - 2t)`, equivalent to a
/// cubic bezier with control points (1/3, 0) and (2/3, 1).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => t * (2.0 - t),
            Self::EaseInOut => t * t * (3.0 - 2.0 * t),
        }
    }

    /// Parse an easing name. Unknown names fall back to linear with a warning.
    pub fn parse(name: &str) -> Self {
        match name {
            "linear" => Self::Linear,
            "easeIn" => Self::EaseIn,
            "easeOut" => Self::EaseOut,
            "easeInOut" => Self::EaseInOut,
            other => {
                tracing::warn!(easing = other, "unknown easing, falling back to linear");
                Self::Linear
            }
        }
    }

    /// The curve as an ffmpeg arithmetic expression over a progress variable.
    pub fn expr(self, t: &str) -> String {
        match self {
            Self::Linear => t.to_string(),
            Self::EaseIn => format!("({t})*({t})"),
            Self::EaseOut => format!("({t})*(2-({t}))"),
            Self::EaseInOut => format!("({t})*({t})*(3-2*({t}))"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 4] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
    ];

    #[test]
    fn endpoints_are_stable() {
        for ease in ALL {
            assert_eq!(ease.apply(0.0), 0.0);
            assert_eq!(ease.apply(1.0), 1.0);
        }
    }

    #[test]
    fn monotonic_spot_check() {
        for ease in ALL {
            let a = ease.apply(0.25);
            let b = ease.apply(0.5);
            let c = ease.apply(0.75);
            assert!(a < b);
            assert!(b < c);
        }
    }

    #[test]
    fn input_is_clamped() {
        for ease in ALL {
            assert_eq!(ease.apply(-1.0), 0.0);
            assert_eq!(ease.apply(2.0), 1.0);
        }
    }

    #[test]
    fn unknown_name_falls_back_to_linear() {
        assert_eq!(Easing::parse("bounceOut"), Easing::Linear);
        assert_eq!(Easing::parse("easeInOut"), Easing::EaseInOut);
    }
}
