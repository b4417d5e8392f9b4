//! The library code for the `kiroku` blog generator. A build turns a
//! project directory of reStructuredText articles into a static site in
//! a handful of strictly ordered steps:
//!
//! 1. Preparing the output directory and its static files ([`crate::assets`])
//! 2. Reading the articles ([`crate::article`]), which converts each source
//!    to HTML ([`crate::converter`]) and parses its metadata
//! 3. Indexing tags ([`crate::tag`]) and words ([`crate::search`])
//! 4. Rendering pages from templates ([`crate::template`], [`crate::write`])
//!    and the RSS feed ([`crate::feed`])
//!
//! [`crate::build::build_site`] runs all of them; the project layout and
//! site settings come from [`crate::config`].

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod article;
pub mod assets;
pub mod build;
pub mod config;
pub mod converter;
pub mod date;
pub mod feed;
pub mod init;
pub mod search;
pub mod slug;
pub mod tag;
pub mod template;
pub mod util;
pub mod write;
