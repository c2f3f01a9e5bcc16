//! Query Pattern Module
//!
//! Parses the `K=V` query grammar shared by the wire protocol and the CLI.
//!
//! ## Grammar
//! `pattern '=' pattern` where `pattern := '*' | literal | '*' literal | literal '*' | '*' literal '*'`.
//! Each side is independently classified as one of five shapes (exact, prefix,
//! suffix, infix, wildcard); the literal is stripped of its `*` markers during
//! classification. Parsing is byte-oriented and infallible: there is no escaping,
//! no regex compilation, and every input string produces a valid query.

pub mod pattern;
