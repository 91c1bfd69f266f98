//! A small Rust client for the GENESIS statistics web service (GENESIS-Online, Regionalstatistik).
//!
//! This crate covers the two awkward parts of the service:
//! - the cube file format of `data/cubefile`, decoded into a [`Cube`] and collapsed into one
//!   typed [`Table`] with human-readable column names;
//! - background jobs: queries the service considers too large are submitted as a job, polled
//!   until finished, and the result file is fetched.
//!
//! ## Quick start
//! - Configure credentials via environment variables (`GENESIS_USERNAME`, `GENESIS_PASSWORD`)
//!   or a `.genesisrc` file (current directory or home directory).
//! - Call [`Client::cube`] with a cube name.
//!
//! ```no_run
//! use anyhow::Result;
//! use genesisapi::{Client, Params, RenameOptions};
//!
//! fn main() -> Result<()> {
//!     let client = Client::from_env()?;
//!     let table = client.cube("12411BJ001", &Params::new(), &RenameOptions::default())?;
//!     println!("{:?}", table.column_names());
//!     Ok(())
//! }
//! ```
//!
//! Decoding works without a client:
//!
//! ```
//! use genesisapi::{RenameOptions, decode_table};
//!
//! let text = "K;DQI;NAME;DST\n;X;GANZ\nK;QEI;FACH-SCHL;X_WERT\n;1;5";
//! let table = decode_table(text, &RenameOptions::none()).unwrap();
//! assert_eq!(table.height(), 1);
//! ```

#![forbid(unsafe_code)]

mod axes;
mod cache;
mod cast;
mod client;
mod config;
mod cube;
mod error;
mod jobs;
mod status;
mod transport;
mod util;

pub use axes::{RenameOptions, rename_axes};
pub use cache::{Cache, CacheKey, FileCache, NoCache};
pub use cast::{
    Column, ColumnData, DataType, Table, cast_types, declared_types, decode_table,
    parse_ffcsv,
};
pub use client::Client;
pub use config::{ClientConfig, DEFAULT_URL};
pub use cube::{BlockKind, Cube, CubeBlock, decode, disambiguate};
pub use error::{CastError, DecodeError, GenesisError, RenameError, Result};
pub use jobs::{DEFAULT_JOB_DEADLINE, DEFAULT_POLL_INTERVAL, JobFailure, JobPolicy, JobState};
pub use status::{StatusClassification, StatusKind, interpret as interpret_status};
pub use transport::{Clock, HttpResponse, ReqwestTransport, SystemClock, Transport};
pub use util::{Params, params};
