//! flightrec-receiver
//!
//! Converts runtime flight recorder traces into OpenTelemetry-style
//! profiles and gauge metrics.
//!
//! A trace is a stream of decoded events. Every user range becomes a
//! wall-time profile whose samples are the stacks captured inside it, and
//! every runtime metric event becomes a gauge data point. Symbols are
//! interned into one dictionary per trace.
//!
//! ## Getting Started
//!
//! ```ignore
//! use flightrec_receiver::converter::convert;
//! use tokio_util::sync::CancellationToken;
//!
//! let file = std::fs::File::open("app.trace")?;
//! let source = flightrec_receiver::parser::open(file)?;
//! let conversion = convert(source, &CancellationToken::new())?;
//! println!("{}", conversion.stats.summary());
//! ```
//!
//! For scheduled scraping of many files see [`receiver::FlightRecorderReceiver`].

pub mod commands;
pub mod converter;
pub mod dictionary;
pub mod output;
pub mod parser;
pub mod pdata;
pub mod receiver;
pub mod utils;
