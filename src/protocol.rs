//! The host conversation: one request line in, exactly one response line out.
//!
//! | request            | response                                   |
//! |--------------------|--------------------------------------------|
//! | `?`                | sensor ids, tab separated                  |
//! | `<id>\t<property>` | property value, empty if either is unknown |
//! | anything else      | empty line                                 |

use crate::sensor::Registry;
use crate::Error;
use log::{info, trace};
use std::io::{BufRead, Write};

const LIST: &str = "?";

#[derive(Debug, PartialEq, Eq)]
pub enum Request<'a> {
    List,
    Property { sensor: &'a str, property: &'a str },
    Unrecognized,
}

impl<'a> Request<'a> {
    /// Parse a single request line. Surrounding whitespace, including the
    /// line terminator, is ignored; everything after the first tab is the
    /// property name.
    #[must_use]
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line == LIST {
            return Request::List;
        }
        match line.split_once('\t') {
            Some((sensor, property)) => Request::Property { sensor, property },
            None => Request::Unrecognized,
        }
    }
}

/// Answer a single request.
pub fn respond(registry: &mut Registry, request: &Request) -> String {
    match *request {
        Request::List => registry.list(),
        Request::Property { sensor, property } => registry.get_property(sensor, property),
        Request::Unrecognized => String::new(),
    }
}

/// Serve requests from `input` until it is closed, flushing each response
/// as soon as it is written so the host never waits on a buffer.
pub fn serve<R: BufRead, W: Write>(
    registry: &mut Registry,
    mut input: R,
    mut output: W,
) -> Result<(), Error> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            info!("end of input, exiting");
            return Ok(());
        }
        // Never drop a request: undecodable bytes still get a reply
        let line = String::from_utf8_lossy(&buf);
        let request = Request::parse(&line);
        let response = respond(registry, &request);
        trace!("{request:?} -> {response:?}");

        writeln!(output, "{response}")?;
        output.flush()?;
    }
}
