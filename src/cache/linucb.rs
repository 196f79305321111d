use nalgebra::{Matrix3, Vector3};
use rand::rngs::StdRng;
use rand::Rng;

use crate::cache::sampling::PolicySelector;
use crate::policy::SubPolicy;
use crate::record::TraceRecord;

const EXPLORATION_ALPHA: f64 = 0.2;

/// Disjoint linear contextual bandit (LinUCB): each sub-policy keeps its own
/// ridge-regression model over a 3-feature context (block type, LSM level,
/// column family id) and is scored by predicted reward plus an upper
/// confidence bound; selection tie-breaks with a small random jitter so
/// untouched arms aren't permanently starved by floating point ties.
pub struct LinUcbSelector {
    a: Vec<Matrix3<f64>>,
    a_inv: Vec<Matrix3<f64>>,
    b: Vec<Vector3<f64>>,
}

impl LinUcbSelector {
    pub fn new(arms: usize) -> Self {
        let identity = Matrix3::identity();
        LinUcbSelector {
            a: vec![identity; arms],
            a_inv: vec![identity; arms],
            b: vec![Vector3::zeros(); arms],
        }
    }

    fn context(record: &TraceRecord) -> Vector3<f64> {
        Vector3::new(record.block_type as f64, record.level as f64, record.cf_id as f64)
    }
}

impl PolicySelector for LinUcbSelector {
    fn select_policy(&mut self, record: &TraceRecord, sub_policies: &mut [SubPolicy], key: &str, rng: &mut StdRng) -> usize {
        let x = Self::context(record);

        let mut best = 0;
        let mut best_score = f64::MIN;
        for i in 0..sub_policies.len() {
            let theta_hat = self.a_inv[i] * self.b[i];
            let variance = (x.transpose() * self.a_inv[i] * x)[(0, 0)].max(0.0);
            let upper_confidence_bound = EXPLORATION_ALPHA * variance.sqrt();
            let jitter: f64 = rng.random::<f64>() * 1e-9;
            let score = theta_hat.dot(&x) + upper_confidence_bound + jitter;
            if score > best_score {
                best_score = score;
                best = i;
            }
        }

        let reward = sub_policies[best].reward(key) as f64;
        self.a[best] += x * x.transpose();
        self.b[best] += reward * x;
        self.a_inv[best] = self.a[best]
            .try_inverse()
            .expect("A starts at the identity and only gains positive-semidefinite outer products, so it stays invertible");
        best
    }
}
