use dendrite_error::{NeatError, NeatResult, dendrite_err};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Slope of the steepened sigmoid family. The exact value matters for
/// numerical reproducibility of trained networks.
pub const SIGMOID_STEEPNESS: f64 = 4.924273;
/// Horizontal offset of the shifted sigmoid variants.
pub const SIGMOID_SHIFT: f64 = 2.4621365;

/// The closed set of activation functions a network node can carry.
///
/// Scalar tags apply to ordinary neurons through [activate_scalar]; module
/// tags belong to multi-input/multi-output control nodes and apply through
/// [activate_module]. Tags serialize by their symbolic name so genome files
/// stay readable, and an unknown name is a recoverable error rather than a
/// panic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActivationType {
    SigmoidPlain,
    SigmoidReduced,
    SigmoidSteepened,
    SigmoidBipolar,
    SigmoidInverseAbs,
    SigmoidLeftShifted,
    SigmoidLeftShiftedSteepened,
    SigmoidRightShiftedSteepened,
    Tanh,
    Gaussian,
    GaussianBipolar,
    Linear,
    LinearAbs,
    LinearClipped,
    Null,
    Sign,
    Sine,
    Step,
    // module activators
    MultiplyModule,
    MaxModule,
    MinModule,
}

const ALL_ACTIVATORS: &[(ActivationType, &str)] = &[
    (ActivationType::SigmoidPlain, "SigmoidPlainActivation"),
    (ActivationType::SigmoidReduced, "SigmoidReducedActivation"),
    (ActivationType::SigmoidSteepened, "SigmoidSteepenedActivation"),
    (ActivationType::SigmoidBipolar, "SigmoidBipolarActivation"),
    (ActivationType::SigmoidInverseAbs, "SigmoidInverseAbsActivation"),
    (ActivationType::SigmoidLeftShifted, "SigmoidLeftShiftedActivation"),
    (
        ActivationType::SigmoidLeftShiftedSteepened,
        "SigmoidLeftShiftedSteepenedActivation",
    ),
    (
        ActivationType::SigmoidRightShiftedSteepened,
        "SigmoidRightShiftedSteepenedActivation",
    ),
    (ActivationType::Tanh, "TanhActivation"),
    (ActivationType::Gaussian, "GaussianActivation"),
    (ActivationType::GaussianBipolar, "GaussianBipolarActivation"),
    (ActivationType::Linear, "LinearActivation"),
    (ActivationType::LinearAbs, "LinearAbsActivation"),
    (ActivationType::LinearClipped, "LinearClippedActivation"),
    (ActivationType::Null, "NullActivation"),
    (ActivationType::Sign, "SignActivation"),
    (ActivationType::Sine, "SineActivation"),
    (ActivationType::Step, "StepActivation"),
    (ActivationType::MultiplyModule, "MultiplyModuleActivation"),
    (ActivationType::MaxModule, "MaxModuleActivation"),
    (ActivationType::MinModule, "MinModuleActivation"),
];

impl ActivationType {
    /// The symbolic name used in genome files and option lists.
    pub fn name(&self) -> &'static str {
        ALL_ACTIVATORS
            .iter()
            .find(|(tag, _)| tag == self)
            .map(|(_, name)| *name)
            .unwrap_or("UnknownActivation")
    }

    /// Resolve a symbolic name back to its tag.
    pub fn from_name(name: &str) -> NeatResult<ActivationType> {
        ALL_ACTIVATORS
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(tag, _)| *tag)
            .ok_or_else(|| dendrite_err!(UnknownActivator: "no activator named '{}'", name))
    }

    pub fn is_module(&self) -> bool {
        matches!(
            self,
            ActivationType::MultiplyModule | ActivationType::MaxModule | ActivationType::MinModule
        )
    }

    /// Every scalar tag, in registry order.
    pub fn scalars() -> impl Iterator<Item = ActivationType> {
        ALL_ACTIVATORS
            .iter()
            .map(|(tag, _)| *tag)
            .filter(|tag| !tag.is_module())
    }
}

impl fmt::Display for ActivationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for ActivationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ActivationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NameVisitor;

        impl Visitor<'_> for NameVisitor {
            type Value = ActivationType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "an activation function name")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                ActivationType::from_name(value).map_err(|e| E::custom(e.to_string()))
            }
        }

        deserializer.deserialize_str(NameVisitor)
    }
}

fn sigmoid(x: f64, slope: f64, shift: f64) -> f64 {
    1.0 / (1.0 + (-slope * x - shift).exp())
}

/// Apply a scalar activator to a summed node input. `aux` carries the node's
/// optional parameter vector; none of the built-in scalar activators consume
/// it today, but the signature keeps parameterized activators possible.
pub fn activate_scalar(tag: ActivationType, input: f64, _aux: Option<&[f64]>) -> NeatResult<f64> {
    let out = match tag {
        ActivationType::SigmoidPlain => sigmoid(input, 1.0, 0.0),
        ActivationType::SigmoidReduced => sigmoid(input, 0.5, 0.0),
        ActivationType::SigmoidSteepened => sigmoid(input, SIGMOID_STEEPNESS, 0.0),
        ActivationType::SigmoidBipolar => 2.0 / (1.0 + (-SIGMOID_STEEPNESS * input).exp()) - 1.0,
        ActivationType::SigmoidInverseAbs => 0.5 + 0.5 * input / (1.0 + input.abs()),
        ActivationType::SigmoidLeftShifted => sigmoid(input, 1.0, SIGMOID_SHIFT),
        ActivationType::SigmoidLeftShiftedSteepened => {
            sigmoid(input, SIGMOID_STEEPNESS, SIGMOID_SHIFT)
        }
        ActivationType::SigmoidRightShiftedSteepened => {
            sigmoid(input, SIGMOID_STEEPNESS, -SIGMOID_SHIFT)
        }
        ActivationType::Tanh => (0.9 * input).tanh(),
        ActivationType::Gaussian => (-(input * input)).exp(),
        ActivationType::GaussianBipolar => {
            2.0 * (-(input * 2.5) * (input * 2.5)).exp() - 1.0
        }
        ActivationType::Linear => input,
        ActivationType::LinearAbs => input.abs(),
        ActivationType::LinearClipped => input.clamp(-1.0, 1.0),
        ActivationType::Null => 0.0,
        ActivationType::Sign => {
            if input.is_nan() || input == 0.0 {
                0.0
            } else if input < 0.0 {
                -1.0
            } else {
                1.0
            }
        }
        ActivationType::Sine => (2.0 * input).sin(),
        ActivationType::Step => {
            if input > 0.0 {
                1.0
            } else {
                0.0
            }
        }
        _ => {
            return Err(
                dendrite_err!(UnknownActivator: "'{}' is a module activator and cannot activate a scalar node", tag.name()),
            );
        }
    };
    Ok(out)
}

/// Apply a module activator to the gathered inputs of a control node.
pub fn activate_module(
    tag: ActivationType,
    inputs: &[f64],
    _aux: Option<&[f64]>,
) -> NeatResult<Vec<f64>> {
    let out = match tag {
        ActivationType::MultiplyModule => inputs.iter().product::<f64>(),
        ActivationType::MaxModule => inputs.iter().cloned().fold(f64::MIN, f64::max),
        ActivationType::MinModule => inputs.iter().cloned().fold(f64::MAX, f64::min),
        _ => {
            return Err(
                dendrite_err!(UnknownActivator: "'{}' is a scalar activator and cannot activate a module", tag.name()),
            );
        }
    };
    Ok(vec![out])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn name_lookup_round_trips() {
        for tag in ALL_ACTIVATORS.iter().map(|(t, _)| *t) {
            assert_eq!(ActivationType::from_name(tag.name()).unwrap(), tag);
        }
    }

    #[test]
    fn unknown_name_is_recoverable() {
        let err = ActivationType::from_name("SoftmaxActivation").unwrap_err();
        assert_eq!(err.code(), dendrite_error::ErrorCode::UnknownActivator);
    }

    #[test]
    fn steepened_sigmoid_constant() {
        // 1/(1+exp(-4.924273 * 0.5))
        let out = activate_scalar(ActivationType::SigmoidSteepened, 0.5, None).unwrap();
        assert!((out - 0.92153).abs() < 1e-5);
    }

    #[test]
    fn scalar_activators_behave() {
        assert_eq!(activate_scalar(ActivationType::Null, 3.0, None).unwrap(), 0.0);
        assert_eq!(activate_scalar(ActivationType::Sign, -0.2, None).unwrap(), -1.0);
        assert_eq!(activate_scalar(ActivationType::Sign, f64::NAN, None).unwrap(), 0.0);
        assert_eq!(activate_scalar(ActivationType::Step, 0.0, None).unwrap(), 0.0);
        assert_eq!(activate_scalar(ActivationType::Step, 0.1, None).unwrap(), 1.0);
        assert_eq!(
            activate_scalar(ActivationType::LinearClipped, -7.0, None).unwrap(),
            -1.0
        );
        let sine = activate_scalar(ActivationType::Sine, 0.25, None).unwrap();
        assert!((sine - (0.5_f64).sin()).abs() < 1e-15);
    }

    #[test]
    fn module_activators_behave() {
        let prod = activate_module(ActivationType::MultiplyModule, &[2.0, 3.0, 0.5], None).unwrap();
        assert_eq!(prod, vec![3.0]);
        let max = activate_module(ActivationType::MaxModule, &[-1.0, 4.0, 2.0], None).unwrap();
        assert_eq!(max, vec![4.0]);
        let min = activate_module(ActivationType::MinModule, &[-1.0, 4.0, 2.0], None).unwrap();
        assert_eq!(min, vec![-1.0]);
    }

    #[test]
    fn scalar_module_cross_use_is_an_error() {
        assert!(activate_scalar(ActivationType::MaxModule, 1.0, None).is_err());
        assert!(activate_module(ActivationType::Tanh, &[1.0], None).is_err());
    }

    #[test]
    fn serde_uses_symbolic_names() {
        let json = serde_json::to_string(&ActivationType::SigmoidSteepened).unwrap();
        assert_eq!(json, "\"SigmoidSteepenedActivation\"");
        let back: ActivationType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ActivationType::SigmoidSteepened);
    }
}
