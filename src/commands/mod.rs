//! CLI subcommand bodies, one module per `photodex` subcommand, in the
//! shape of `jterrazz-lossless-vault`'s `cli/src/commands/` directory:
//! each takes the catalogue path (plus its own arguments) and prints to
//! stdout, returning `anyhow::Result<()>` at the process boundary.

pub mod analyze;
pub mod explore;
pub mod index;
pub mod query;
pub mod show;
pub mod stats;
pub mod thumbnail;
pub mod verify;
