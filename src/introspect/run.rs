//! Invoke the introspection child process.

use std::path::Path;

use super::{IntrospectError, parse};
use crate::app::Definition;
use crate::utils::exec::Cmd;

/// Run `interpreter -m numerous read <module> <class>` and parse its stdout.
///
/// The interpreter reports its own failures as structured JSON on stdout,
/// so a non-zero exit alone is not treated as an error.
pub fn introspect(
    interpreter: &str,
    module_path: &Path,
    class_name: &str,
) -> Result<Definition, IntrospectError> {
    crate::debug!("read"; "{} -m numerous read {} {}", interpreter, module_path.display(), class_name);

    let output = Cmd::new(interpreter)
        .args(["-m", "numerous", "read"])
        .arg(module_path)
        .arg(class_name)
        .run()
        .map_err(|e| IntrospectError::Spawn(e.to_string()))?;

    parse(&output.stdout)
}
