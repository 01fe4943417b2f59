//! trainpix - collects the top voted photos from trainpix.org and turns them
//! into upscaled JPEG2000 files.
//!
//! Discovery walks the voting results, the downloader stores each photo as
//! `<id>.jpg` and the upscale pipeline makes `<id>.jpg.15opj.jp2` out of it.
//! Work that already exists on disk is never redone, so any step can simply
//! be run again after a failure.

pub mod discover;
pub mod download;
pub mod error;
pub mod fetch;
pub mod fsutil;
pub mod pacing;
pub mod site;
pub mod upscale;

pub use error::{Error, Result};
