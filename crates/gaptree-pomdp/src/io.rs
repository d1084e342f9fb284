use std::{fs, path::Path};

use tracing::debug;

use crate::{CompiledPomdp, PomdpError, PomdpSpec};

/// Parse a POMDP spec from YAML text and validate it.
pub fn parse_yaml(yaml: &str) -> Result<PomdpSpec, PomdpError> {
    let spec: PomdpSpec = serde_yaml::from_str(yaml)?;
    spec.validate()?;
    Ok(spec)
}

/// Load and validate a POMDP spec from YAML on disk.
pub fn load_yaml(path: impl AsRef<Path>) -> Result<PomdpSpec, PomdpError> {
    let path = path.as_ref();
    let spec = parse_yaml(&fs::read_to_string(path)?)?;
    debug!(
        path = %path.display(),
        states = spec.states.len(),
        actions = spec.actions.len(),
        observations = spec.observations.len(),
        "loaded POMDP spec"
    );
    Ok(spec)
}

/// Load and compile a POMDP from a YAML file.
pub fn compile_yaml(path: impl AsRef<Path>) -> Result<CompiledPomdp, PomdpError> {
    load_yaml(path)?.compile()
}

/// Validate a spec, then write it as YAML. Invalid specs are never written.
pub fn save_yaml(path: impl AsRef<Path>, spec: &PomdpSpec) -> Result<(), PomdpError> {
    spec.validate()?;
    fs::write(path, serde_yaml::to_string(spec)?)?;
    Ok(())
}
