use anyhow::Result;
use volley_core::configs::volley_config_schema;

pub fn execute() -> Result<()> {
    println!("{}", volley_config_schema()?);
    Ok(())
}
