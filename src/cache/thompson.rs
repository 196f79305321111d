use rand::rngs::StdRng;
use rand_distr::{Beta, Distribution};

use crate::cache::sampling::PolicySelector;
use crate::policy::SubPolicy;
use crate::record::TraceRecord;

/// A Bernoulli Thompson-Sampling bandit: each sub-policy has a Beta(a, b)
/// posterior over "did the last eviction this policy chose turn out to be
/// correct"; selection draws one sample per arm and takes the largest, then
/// updates that arm's posterior with the observed reward.
pub struct ThompsonSelector {
    alpha: Vec<f64>,
    beta: Vec<f64>,
}

impl ThompsonSelector {
    pub fn new(arms: usize) -> Self {
        ThompsonSelector {
            alpha: vec![1.0; arms],
            beta: vec![1.0; arms],
        }
    }
}

impl PolicySelector for ThompsonSelector {
    fn select_policy(&mut self, _record: &TraceRecord, sub_policies: &mut [SubPolicy], key: &str, rng: &mut StdRng) -> usize {
        let mut best = 0;
        let mut best_draw = f64::MIN;
        for i in 0..sub_policies.len() {
            let dist = Beta::new(self.alpha[i], self.beta[i]).expect("alpha/beta stay positive by construction");
            let draw = dist.sample(rng);
            if draw > best_draw {
                best_draw = draw;
                best = i;
            }
        }

        let reward = sub_policies[best].reward(key) as f64;
        self.alpha[best] += reward;
        self.beta[best] += 1.0 - reward;
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SubPolicyKind;
    use rand::SeedableRng;

    #[test]
    fn posterior_shifts_toward_rewarding_arm() {
        let mut selector = ThompsonSelector::new(2);
        let mut policies = vec![SubPolicy::new(SubPolicyKind::Lru), SubPolicy::new(SubPolicyKind::Lfu)];
        let mut rng = StdRng::seed_from_u64(3);
        // Arm 0 always rewards (never marked evicted), arm 1 never does.
        policies[1].mark_evicted("x");
        for _ in 0..200 {
            let chosen = selector.select_policy(&dummy_record(), &mut policies, "x", &mut rng);
            let _ = chosen;
        }
        assert!(selector.alpha[0] > selector.alpha[1]);
    }

    fn dummy_record() -> TraceRecord {
        TraceRecord {
            access_time_us: 0,
            block_id: 0,
            block_type: 0,
            block_size: 0,
            cf_id: 0,
            cf_name: String::new(),
            level: 0,
            fd: 0,
            caller: 0,
            no_insert: false,
            get_id: 0,
            key_id: 0,
            kv_size: 0,
            is_hit_observed: false,
            next_access_seq_no: 0,
        }
    }
}
