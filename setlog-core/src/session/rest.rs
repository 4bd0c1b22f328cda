//! Rest duration policy
//!
//! Base rest comes from the exercise definition. High perceived effort and
//! failure/drop sets extend it; warm-up sets cut it down. Values are in
//! whole seconds.

use setlog_common::record::SetType;

const DEFAULT_REST_SECS: u32 = 90;
const MIN_REST_SECS: u32 = 15;
const MAX_REST_SECS: u32 = 600;

/// Compute the rest period after a completed set
pub fn rest_duration_secs(base_secs: Option<u32>, rpe: Option<f32>, set_type: SetType) -> u32 {
    let base = base_secs.unwrap_or(DEFAULT_REST_SECS);

    let adjusted = match set_type {
        SetType::WarmUp => base / 2,
        SetType::Normal => match rpe {
            // Near-maximal effort earns extra recovery
            Some(r) if r >= 9.0 => base + base / 2,
            Some(r) if r >= 8.0 => base + base / 4,
            _ => base,
        },
        SetType::Failure => base * 2,
        SetType::Drop => base + base / 2,
    };

    adjusted.clamp(MIN_REST_SECS, MAX_REST_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_when_unspecified() {
        assert_eq!(rest_duration_secs(None, None, SetType::Normal), 90);
    }

    #[test]
    fn test_warmup_halves_rest() {
        assert_eq!(rest_duration_secs(Some(120), None, SetType::WarmUp), 60);
    }

    #[test]
    fn test_high_rpe_extends_rest() {
        assert_eq!(rest_duration_secs(Some(120), Some(9.5), SetType::Normal), 180);
        assert_eq!(rest_duration_secs(Some(120), Some(8.0), SetType::Normal), 150);
        assert_eq!(rest_duration_secs(Some(120), Some(7.0), SetType::Normal), 120);
    }

    #[test]
    fn test_failure_doubles_rest() {
        assert_eq!(rest_duration_secs(Some(120), None, SetType::Failure), 240);
    }

    #[test]
    fn test_clamped_to_bounds() {
        assert_eq!(rest_duration_secs(Some(10), None, SetType::WarmUp), 15);
        assert_eq!(rest_duration_secs(Some(400), None, SetType::Failure), 600);
    }
}
