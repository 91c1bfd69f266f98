use anyhow::Result;
use genesisapi::{Client, ColumnData, Params, RenameOptions};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Example program that calls the library API.
    // Configure credentials via env vars or a `.genesisrc` file.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let client = Client::from_env()?;

    // Population by sex and nationality; large enough to be served as a background job.
    let table = client.cube("12411BJ001", &Params::new(), &RenameOptions::default())?;

    println!("{} rows", table.height());
    for column in &table.columns {
        let kind = match &column.data {
            ColumnData::Text(_) => "text",
            ColumnData::Integer(_) => "integer",
            ColumnData::Float(_) => "float",
        };
        println!("{:<30} {}", column.name, kind);
    }
    Ok(())
}
