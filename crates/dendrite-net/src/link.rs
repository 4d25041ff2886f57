use crate::node::NodeIdx;
use serde::{Deserialize, Serialize};

/// A directed, weighted connection between two nodes in a [crate::Network].
///
/// Links in a phenotype are always enabled; disabled link genes are skipped
/// at genesis. The `recurrent` flag marks edges that close a cycle and the
/// `time_delayed` flag makes the target read the source's previous-step
/// output instead of the current one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Link {
    pub source: NodeIdx,
    pub target: NodeIdx,
    pub weight: f64,
    pub recurrent: bool,
    pub time_delayed: bool,
    pub trait_id: Option<i64>,
    pub params: Option<Vec<f64>>,
}

impl Link {
    pub fn new(source: NodeIdx, target: NodeIdx, weight: f64, recurrent: bool) -> Self {
        Link {
            source,
            target,
            weight,
            recurrent,
            time_delayed: false,
            trait_id: None,
            params: None,
        }
    }

    pub fn time_delayed(mut self, delayed: bool) -> Self {
        self.time_delayed = delayed;
        self
    }
}
