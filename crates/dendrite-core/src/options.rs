use crate::random_provider;
use dendrite_error::{NeatResult, dendrite_bail, dendrite_err};
use dendrite_net::ActivationType;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Which epoch executor drives generation transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpochExecutorKind {
    Sequential,
    Parallel,
}

/// Which compatibility-distance implementation to use. Both return equal
/// distances; fast trades memory for fewer comparisons on large genomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenomeCompatMethod {
    Linear,
    Fast,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Every tunable the evolutionary engine recognizes.
///
/// Options load from either a plain `key value` text file or a YAML
/// document; in both formats an unknown key is a hard parse error, which
/// catches typos that would otherwise silently fall back to defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NeatOptions {
    pub trait_param_mut_prob: f64,
    pub trait_mutation_power: f64,
    pub weight_mut_power: f64,

    pub disjoint_coeff: f64,
    pub excess_coeff: f64,
    pub mutdiff_coeff: f64,
    pub compat_threshold: f64,

    pub age_significance: f64,
    pub survival_thresh: f64,

    pub mutate_only_prob: f64,
    pub mutate_random_trait_prob: f64,
    pub mutate_link_trait_prob: f64,
    pub mutate_node_trait_prob: f64,
    pub mutate_link_weights_prob: f64,
    pub mutate_toggle_enable_prob: f64,
    pub mutate_gene_reenable_prob: f64,
    pub mutate_add_node_prob: f64,
    pub mutate_add_link_prob: f64,
    pub mutate_connect_sensors: f64,

    pub interspecies_mate_rate: f64,
    pub mate_multipoint_prob: f64,
    pub mate_multipoint_avg_prob: f64,
    pub mate_singlepoint_prob: f64,
    pub mate_only_prob: f64,
    pub recur_only_prob: f64,

    pub pop_size: usize,
    pub dropoff_age: usize,
    pub newlink_tries: usize,
    pub print_every: usize,
    pub babies_stolen: usize,
    pub num_runs: usize,
    pub num_generations: usize,

    pub epoch_executor: EpochExecutorKind,
    pub genome_compat_method: GenomeCompatMethod,

    /// Weighted activator pool for new hidden nodes, each entry
    /// `"<name> <probability>"`.
    pub node_activators: Vec<String>,

    pub log_level: LogLevel,
}

impl Default for NeatOptions {
    fn default() -> Self {
        NeatOptions {
            trait_param_mut_prob: 0.5,
            trait_mutation_power: 1.0,
            weight_mut_power: 2.5,
            disjoint_coeff: 1.0,
            excess_coeff: 1.0,
            mutdiff_coeff: 0.4,
            compat_threshold: 3.0,
            age_significance: 1.0,
            survival_thresh: 0.2,
            mutate_only_prob: 0.25,
            mutate_random_trait_prob: 0.1,
            mutate_link_trait_prob: 0.1,
            mutate_node_trait_prob: 0.1,
            mutate_link_weights_prob: 0.9,
            mutate_toggle_enable_prob: 0.0,
            mutate_gene_reenable_prob: 0.0,
            mutate_add_node_prob: 0.03,
            mutate_add_link_prob: 0.05,
            mutate_connect_sensors: 0.0,
            interspecies_mate_rate: 0.001,
            mate_multipoint_prob: 0.3,
            mate_multipoint_avg_prob: 0.3,
            mate_singlepoint_prob: 0.3,
            mate_only_prob: 0.2,
            recur_only_prob: 0.0,
            pop_size: 150,
            dropoff_age: 15,
            newlink_tries: 20,
            print_every: 10,
            babies_stolen: 0,
            num_runs: 1,
            num_generations: 100,
            epoch_executor: EpochExecutorKind::Sequential,
            genome_compat_method: GenomeCompatMethod::Linear,
            node_activators: vec!["SigmoidSteepenedActivation 1.0".to_string()],
            log_level: LogLevel::Info,
        }
    }
}

impl NeatOptions {
    /// Parse the plain `key value` format. Lines starting with `#` and blank
    /// lines are skipped; `node_activators` takes a comma-separated list of
    /// `<name> <probability>` entries.
    pub fn from_plain(text: &str) -> NeatResult<NeatOptions> {
        let mut opts = NeatOptions::default();

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once(char::is_whitespace)
                .ok_or_else(|| dendrite_err!(InvalidConfig: "option line '{}' has no value", line))?;
            let value = value.trim();

            match key {
                "trait_param_mut_prob" => opts.trait_param_mut_prob = parse_float(key, value)?,
                "trait_mutation_power" => opts.trait_mutation_power = parse_float(key, value)?,
                "weight_mut_power" => opts.weight_mut_power = parse_float(key, value)?,
                "disjoint_coeff" => opts.disjoint_coeff = parse_float(key, value)?,
                "excess_coeff" => opts.excess_coeff = parse_float(key, value)?,
                "mutdiff_coeff" => opts.mutdiff_coeff = parse_float(key, value)?,
                "compat_threshold" => opts.compat_threshold = parse_float(key, value)?,
                "age_significance" => opts.age_significance = parse_float(key, value)?,
                "survival_thresh" => opts.survival_thresh = parse_float(key, value)?,
                "mutate_only_prob" => opts.mutate_only_prob = parse_float(key, value)?,
                "mutate_random_trait_prob" => {
                    opts.mutate_random_trait_prob = parse_float(key, value)?
                }
                "mutate_link_trait_prob" => opts.mutate_link_trait_prob = parse_float(key, value)?,
                "mutate_node_trait_prob" => opts.mutate_node_trait_prob = parse_float(key, value)?,
                "mutate_link_weights_prob" => {
                    opts.mutate_link_weights_prob = parse_float(key, value)?
                }
                "mutate_toggle_enable_prob" => {
                    opts.mutate_toggle_enable_prob = parse_float(key, value)?
                }
                "mutate_gene_reenable_prob" => {
                    opts.mutate_gene_reenable_prob = parse_float(key, value)?
                }
                "mutate_add_node_prob" => opts.mutate_add_node_prob = parse_float(key, value)?,
                "mutate_add_link_prob" => opts.mutate_add_link_prob = parse_float(key, value)?,
                "mutate_connect_sensors" => opts.mutate_connect_sensors = parse_float(key, value)?,
                "interspecies_mate_rate" => opts.interspecies_mate_rate = parse_float(key, value)?,
                "mate_multipoint_prob" => opts.mate_multipoint_prob = parse_float(key, value)?,
                "mate_multipoint_avg_prob" => {
                    opts.mate_multipoint_avg_prob = parse_float(key, value)?
                }
                "mate_singlepoint_prob" => opts.mate_singlepoint_prob = parse_float(key, value)?,
                "mate_only_prob" => opts.mate_only_prob = parse_float(key, value)?,
                "recur_only_prob" => opts.recur_only_prob = parse_float(key, value)?,
                "pop_size" => opts.pop_size = parse_uint(key, value)?,
                "dropoff_age" => opts.dropoff_age = parse_uint(key, value)?,
                "newlink_tries" => opts.newlink_tries = parse_uint(key, value)?,
                "print_every" => opts.print_every = parse_uint(key, value)?,
                "babies_stolen" => opts.babies_stolen = parse_uint(key, value)?,
                "num_runs" => opts.num_runs = parse_uint(key, value)?,
                "num_generations" => opts.num_generations = parse_uint(key, value)?,
                "epoch_executor" => {
                    opts.epoch_executor = match value {
                        "sequential" => EpochExecutorKind::Sequential,
                        "parallel" => EpochExecutorKind::Parallel,
                        other => {
                            dendrite_bail!(InvalidConfig: "unknown epoch executor '{}'", other)
                        }
                    }
                }
                "genome_compat_method" => {
                    opts.genome_compat_method = match value {
                        "linear" => GenomeCompatMethod::Linear,
                        "fast" => GenomeCompatMethod::Fast,
                        other => {
                            dendrite_bail!(InvalidConfig: "unknown compat method '{}'", other)
                        }
                    }
                }
                "node_activators" => {
                    opts.node_activators =
                        value.split(',').map(|s| s.trim().to_string()).collect()
                }
                "log_level" => {
                    opts.log_level = match value {
                        "debug" => LogLevel::Debug,
                        "info" => LogLevel::Info,
                        "warn" => LogLevel::Warn,
                        "error" => LogLevel::Error,
                        other => dendrite_bail!(InvalidConfig: "unknown log level '{}'", other),
                    }
                }
                unknown => dendrite_bail!(InvalidConfig: "unknown option key '{}'", unknown),
            }
        }

        opts.validate()?;
        Ok(opts)
    }

    /// Parse the YAML format. Unknown keys are rejected by serde.
    pub fn from_yaml(text: &str) -> NeatResult<NeatOptions> {
        let opts: NeatOptions = serde_yaml::from_str(text)
            .map_err(|e| dendrite_err!(InvalidConfig: "yaml options: {}", e))?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn from_yaml_reader<R: Read>(mut r: R) -> NeatResult<NeatOptions> {
        let mut text = String::new();
        r.read_to_string(&mut text)?;
        Self::from_yaml(&text)
    }

    /// Check cross-field constraints the parsers cannot see.
    pub fn validate(&self) -> NeatResult<()> {
        if self.pop_size == 0 {
            dendrite_bail!(InvalidConfig: "pop_size must be positive");
        }
        if !(0.0..=1.0).contains(&self.survival_thresh) {
            dendrite_bail!(InvalidConfig: "survival_thresh must be within [0, 1]");
        }
        let pool = self.parsed_activators()?;
        if pool.is_empty() {
            dendrite_bail!(InvalidConfig: "node_activators must not be empty");
        }
        Ok(())
    }

    /// The activator pool as `(tag, probability)` pairs.
    pub fn parsed_activators(&self) -> NeatResult<Vec<(ActivationType, f64)>> {
        let mut pool = Vec::with_capacity(self.node_activators.len());
        for entry in &self.node_activators {
            let (name, prob) = entry.trim().split_once(char::is_whitespace).ok_or_else(
                || dendrite_err!(InvalidConfig: "node activator entry '{}' needs a probability", entry),
            )?;
            let tag = ActivationType::from_name(name.trim())?;
            if tag.is_module() {
                dendrite_bail!(InvalidConfig:
                    "node activator '{}' is a module activator", name.trim());
            }
            let prob: f64 = prob.trim().parse().map_err(
                |_| dendrite_err!(InvalidConfig: "bad probability in node activator '{}'", entry),
            )?;
            if prob < 0.0 {
                dendrite_bail!(InvalidConfig: "negative probability in node activator '{}'", entry);
            }
            pool.push((tag, prob));
        }
        Ok(pool)
    }

    /// Sample an activation tag for a freshly added hidden node from the
    /// configured distribution.
    pub fn random_node_activator(&self) -> NeatResult<ActivationType> {
        let pool = self.parsed_activators()?;
        if pool.len() == 1 {
            return Ok(pool[0].0);
        }
        let total: f64 = pool.iter().map(|(_, p)| p).sum();
        if total <= 0.0 {
            return Ok(pool[0].0);
        }
        let mut roll = random_provider::random::<f64>() * total;
        for (tag, prob) in &pool {
            roll -= prob;
            if roll <= 0.0 {
                return Ok(*tag);
            }
        }
        Ok(pool[pool.len() - 1].0)
    }
}

fn parse_float(key: &str, value: &str) -> NeatResult<f64> {
    value
        .parse::<f64>()
        .map_err(|_| dendrite_err!(InvalidConfig: "option '{}' expects a number, got '{}'", key, value))
}

fn parse_uint(key: &str, value: &str) -> NeatResult<usize> {
    value
        .parse::<usize>()
        .map_err(|_| dendrite_err!(InvalidConfig: "option '{}' expects an integer, got '{}'", key, value))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plain_parser_reads_every_kind_of_key() {
        let text = "\
# xor experiment
compat_threshold 4.0
pop_size 200
epoch_executor parallel
genome_compat_method fast
log_level warn
node_activators SigmoidSteepenedActivation 0.8, TanhActivation 0.2
";
        let opts = NeatOptions::from_plain(text).unwrap();
        assert_eq!(opts.compat_threshold, 4.0);
        assert_eq!(opts.pop_size, 200);
        assert_eq!(opts.epoch_executor, EpochExecutorKind::Parallel);
        assert_eq!(opts.genome_compat_method, GenomeCompatMethod::Fast);
        assert_eq!(opts.log_level, LogLevel::Warn);
        assert_eq!(opts.parsed_activators().unwrap().len(), 2);
        // untouched keys keep their defaults
        assert_eq!(opts.dropoff_age, 15);
    }

    #[test]
    fn unknown_plain_key_is_a_hard_error() {
        let err = NeatOptions::from_plain("compat_treshold 3.0\n").unwrap_err();
        assert_eq!(err.code(), dendrite_error::ErrorCode::InvalidConfig);
    }

    #[test]
    fn unknown_yaml_key_is_a_hard_error() {
        let err = NeatOptions::from_yaml("compat_treshold: 3.0\n").unwrap_err();
        assert_eq!(err.code(), dendrite_error::ErrorCode::InvalidConfig);
    }

    #[test]
    fn yaml_parser_agrees_with_plain_parser() {
        let yaml = "\
compat_threshold: 4.0
pop_size: 200
epoch_executor: parallel
node_activators:
  - SigmoidSteepenedActivation 1.0
";
        let opts = NeatOptions::from_yaml(yaml).unwrap();
        assert_eq!(opts.compat_threshold, 4.0);
        assert_eq!(opts.pop_size, 200);
        assert_eq!(opts.epoch_executor, EpochExecutorKind::Parallel);
    }

    #[test]
    fn bad_activator_name_is_rejected() {
        let err =
            NeatOptions::from_plain("node_activators SoftplusActivation 1.0\n").unwrap_err();
        assert_eq!(err.code(), dendrite_error::ErrorCode::UnknownActivator);
    }

    #[test]
    fn module_activator_cannot_seed_hidden_nodes() {
        let err =
            NeatOptions::from_plain("node_activators MaxModuleActivation 1.0\n").unwrap_err();
        assert_eq!(err.code(), dendrite_error::ErrorCode::InvalidConfig);
    }

    #[test]
    fn weighted_activator_sampling_covers_the_pool() {
        crate::random_provider::set_seed(7);
        let mut opts = NeatOptions::default();
        opts.node_activators = vec![
            "SigmoidSteepenedActivation 0.5".to_string(),
            "TanhActivation 0.5".to_string(),
        ];
        let mut seen_tanh = false;
        let mut seen_sigmoid = false;
        for _ in 0..200 {
            match opts.random_node_activator().unwrap() {
                ActivationType::Tanh => seen_tanh = true,
                ActivationType::SigmoidSteepened => seen_sigmoid = true,
                other => panic!("unexpected activator {:?}", other),
            }
        }
        assert!(seen_tanh && seen_sigmoid);
    }

    #[test]
    fn zero_pop_size_fails_validation() {
        assert!(NeatOptions::from_plain("pop_size 0\n").is_err());
    }
}
