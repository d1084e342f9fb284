mod belief;
mod bounds;
mod builder;
mod compiled;
mod error;
mod io;
mod simulator;
mod spec;

pub use belief::DiscreteBelief;
pub use bounds::{BlindLowerBound, MdpUpperBound, SweepLimits};
pub use builder::PomdpBuilder;
pub use compiled::{ActionKey, CompiledPomdp, ObservationKey, StateKey};
pub use error::PomdpError;
pub use io::{compile_yaml, load_yaml, parse_yaml, save_yaml};
pub use simulator::PomdpSimulator;
pub use spec::{
    ActionSpec, EmissionSpec, InitialSpec, ObservationOutcomeSpec, OutcomeSpec, PomdpSpec,
    TransitionSpec,
};
