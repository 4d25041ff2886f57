//! Population, speciation and epoch execution for the dendrite
//! neuroevolution library.
//!
//! This crate holds the evolutionary loop: [Organism]s grouped into
//! [Species] inside a [Population], the [EpochExecutor] that turns one
//! generation into the next (sequentially or across a worker pool), and the
//! [trial] driver that runs populations against a caller-supplied
//! [GenerationEvaluator].

pub mod epoch;
pub mod organism;
pub mod population;
pub mod species;
pub mod trial;

pub use epoch::EpochExecutor;
pub use organism::Organism;
pub use population::Population;
pub use species::{ChampionSnapshot, Species};
pub use trial::{
    Generation, GenerationEvaluator, NoopObserver, TrialContext, TrialObserver, TrialOutcome,
    run_trials,
};

use dendrite_core::LogLevel;

/// Install the global tracing subscriber once, honoring the configured
/// log level. Later calls are no-ops, so library consumers and tests can
/// both call it freely.
pub fn init_logging(level: LogLevel) {
    use std::sync::Once;
    static INIT_LOGGING: Once = Once::new();

    INIT_LOGGING.call_once(|| {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str()));

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .compact(),
            )
            .init();
    });
}
