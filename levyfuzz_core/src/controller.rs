use rand::Rng;

/// Mutation aggressiveness carried from one round to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationParameters {
    /// Diffusivity of the segment-offset drift (`a1`).
    pub offset_diffusivity: f64,
    /// Diffusivity of the per-byte mutation magnitude (`a2`).
    pub byte_diffusivity: f64,
    /// Segment cursor, always within `[0, segment_count)`. Persists across rounds.
    pub offset: u64,
}

impl MutationParameters {
    pub fn new(offset_diffusivity: f64, byte_diffusivity: f64, offset: u64) -> Self {
        Self {
            offset_diffusivity,
            byte_diffusivity,
            offset,
        }
    }

    /// Starting point for a run: both diffusivities uniform in `[1, 2)` and the
    /// cursor uniform in `[0, segment_count)`.
    ///
    /// `segment_count` must be non-zero.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, segment_count: u64) -> Self {
        Self {
            offset_diffusivity: rng.random::<f64>() + 1.0,
            byte_diffusivity: rng.random::<f64>() + 1.0,
            offset: rng.random_range(0..segment_count),
        }
    }
}

/// Maps the latest round score onto new diffusivities.
///
/// Memoryless: only the most recent score matters. Each bias fixes the score at
/// which its parameter crosses the midpoint 1.5.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveController {
    pub offset_bias: f64,
    pub byte_bias: f64,
}

impl AdaptiveController {
    pub fn new(offset_bias: f64, byte_bias: f64) -> Self {
        Self {
            offset_bias,
            byte_bias,
        }
    }

    /// Replaces both diffusivities in `params` based on `score`; the cursor is untouched.
    pub fn adapt(&self, score: i64, params: &mut MutationParameters) {
        let (a1, a2) = update_parameters(
            score,
            params.offset_diffusivity,
            params.byte_diffusivity,
            self.offset_bias,
            self.byte_bias,
        );
        params.offset_diffusivity = a1;
        params.byte_diffusivity = a2;
    }
}

/// `a' = 1 / (1 + e^(bias - score)) + 1`, squashing any score into `(1, 2)`.
///
/// The previous values are accepted for signature symmetry but do not
/// influence the result.
pub fn update_parameters(score: i64, _a1: f64, _a2: f64, bias1: f64, bias2: f64) -> (f64, f64) {
    (logistic(bias1, score), logistic(bias2, score))
}

fn logistic(bias: f64, score: i64) -> f64 {
    1.0 / (1.0 + (bias - score as f64).exp()) + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn score_at_bias_gives_midpoint() {
        let (a1, a2) = update_parameters(3, 1.2, 1.7, 3.0, 3.0);
        assert!((a1 - 1.5).abs() < EPSILON);
        assert!((a2 - 1.5).abs() < EPSILON);
    }

    #[test]
    fn parameters_stay_inside_open_interval() {
        for score in [-1000, -50, -1, 0, 1, 2, 3, 5, 10, 35] {
            let (a1, a2) = update_parameters(score, 1.0, 1.0, 3.0, 7.0);
            for a in [a1, a2] {
                assert!(a > 1.0 - EPSILON && a <= 2.0, "score {score} gave {a}");
            }
        }
        let (low, _) = update_parameters(0, 1.0, 1.0, 3.0, 3.0);
        assert!(low > 1.0 && low < 1.5);
    }

    #[test]
    fn higher_scores_are_more_aggressive() {
        let (cautious, _) = update_parameters(0, 1.5, 1.5, 3.0, 3.0);
        let (aggressive, _) = update_parameters(6, 1.5, 1.5, 3.0, 3.0);
        assert!(aggressive > cautious);
        assert!(aggressive > 1.9);
        assert!(cautious < 1.1);
    }

    #[test]
    fn update_ignores_previous_values() {
        let first = update_parameters(4, 1.01, 1.99, 3.0, 5.0);
        let second = update_parameters(4, 1.99, 1.01, 3.0, 5.0);
        assert_eq!(first, second);
    }

    #[test]
    fn biases_apply_independently() {
        let (a1, a2) = update_parameters(3, 1.0, 1.0, 3.0, 100.0);
        assert!((a1 - 1.5).abs() < EPSILON);
        assert!(a2 < 1.0 + EPSILON);
    }

    #[test]
    fn controller_keeps_offset() {
        let controller = AdaptiveController::new(3.0, 3.0);
        let mut params = MutationParameters::new(1.41, 1.256, 4);
        controller.adapt(3, &mut params);

        assert_eq!(params.offset, 4);
        assert!((params.offset_diffusivity - 1.5).abs() < EPSILON);
        assert!((params.byte_diffusivity - 1.5).abs() < EPSILON);
    }

    #[test]
    fn random_parameters_are_in_range() {
        let mut rng = ChaCha8Rng::from_seed([9u8; 32]);
        for _ in 0..200 {
            let params = MutationParameters::random(&mut rng, 6);
            assert!((1.0..2.0).contains(&params.offset_diffusivity));
            assert!((1.0..2.0).contains(&params.byte_diffusivity));
            assert!(params.offset < 6);
        }
    }
}
