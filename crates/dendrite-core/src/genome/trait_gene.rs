use crate::random_provider;
use serde::{Deserialize, Serialize};

/// Number of learned parameters a trait carries.
pub const NUM_TRAIT_PARAMS: usize = 8;

/// An identified vector of learned real parameters, attachable to nodes and
/// links. Traits let groups of genes share slow-moving parameters that
/// evolve independently of connection weights.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraitGene {
    pub id: i64,
    pub params: [f64; NUM_TRAIT_PARAMS],
}

impl TraitGene {
    pub fn new(id: i64) -> Self {
        TraitGene {
            id,
            params: [0.0; NUM_TRAIT_PARAMS],
        }
    }

    pub fn with_params(id: i64, params: [f64; NUM_TRAIT_PARAMS]) -> Self {
        TraitGene { id, params }
    }

    /// Component-wise average of two parent traits; the id comes from the
    /// first parent.
    pub fn average(a: &TraitGene, b: &TraitGene) -> TraitGene {
        let mut params = [0.0; NUM_TRAIT_PARAMS];
        for (i, slot) in params.iter_mut().enumerate() {
            *slot = (a.params[i] + b.params[i]) / 2.0;
        }
        TraitGene { id: a.id, params }
    }

    /// Perturb each parameter with probability `prob` by a signed random
    /// value scaled by `power`, clamping at zero from below.
    pub fn mutate(&mut self, power: f64, prob: f64) {
        for param in self.params.iter_mut() {
            if random_provider::bool(prob) {
                *param += random_provider::pos_neg() * random_provider::random::<f64>() * power;
                if *param < 0.0 {
                    *param = 0.0;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn average_is_componentwise() {
        let a = TraitGene::with_params(1, [1.0, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0]);
        let b = TraitGene::with_params(2, [3.0, 2.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let avg = TraitGene::average(&a, &b);
        assert_eq!(avg.id, 1);
        assert_eq!(avg.params[0], 2.0);
        assert_eq!(avg.params[3], 2.0);
    }

    #[test]
    fn mutate_clamps_below_zero() {
        crate::random_provider::set_seed(11);
        let mut t = TraitGene::new(1);
        for _ in 0..50 {
            t.mutate(5.0, 1.0);
        }
        assert!(t.params.iter().all(|&p| p >= 0.0));
    }
}
