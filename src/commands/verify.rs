use std::path::Path;

use anyhow::Result;
use photodex_core::catalog::Catalog;

pub fn run(catalog: &Path) -> Result<()> {
    let cat = Catalog::open(catalog)?;
    let violations = cat.verify()?;

    if violations.is_empty() {
        println!("no violations found");
        return Ok(());
    }

    for v in &violations {
        println!("- {v}");
    }
    std::process::exit(1);
}
