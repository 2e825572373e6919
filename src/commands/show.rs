use std::path::Path;

use anyhow::{bail, Result};
use photodex_core::catalog::Catalog;

pub fn run(catalog: &Path, id: i64) -> Result<()> {
    let cat = Catalog::open(catalog)?;
    let Some(fields) = cat.photo_record(id)? else {
        bail!("no photo with id {id}");
    };

    for (key, value) in &fields {
        println!("{key:<28} {value}");
    }

    Ok(())
}
