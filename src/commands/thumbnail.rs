use std::path::Path;

use anyhow::{bail, Result};
use photodex_core::catalog::Catalog;

pub fn run(catalog: &Path, id: i64, size: u32, out: &Path) -> Result<()> {
    let cat = Catalog::open(catalog)?;
    let Some(bytes) = cat.thumbnail(id, size)? else {
        bail!("no {size}px thumbnail for photo {id}");
    };

    std::fs::write(out, &bytes)?;
    println!("wrote {} bytes to {}", bytes.len(), out.display());
    Ok(())
}
