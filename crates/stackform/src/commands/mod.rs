pub mod create;
pub mod plan;
pub mod validate;

use anyhow::Context;
use std::path::Path;

pub(crate) fn read_template(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read template {}", path.display()))
}
