//! JSON formatter: one pretty-printed document on stdout.

use anyhow::{Context, Result};
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Error serializing results")?;
    println!("{}", json);
    Ok(())
}
