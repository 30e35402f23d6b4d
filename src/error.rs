// Copyright © 2018 Cormac O'Brien
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of this software
// and associated documentation files (the "Software"), to deal in the Software without
// restriction, including without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all copies or
// substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Errors that can occur while loading an IBSP file.
//!
//! Follows the same `Context<Kind>` wrapper the client's sound loader uses
//! (`client::sound::error::SoundError`): the public [`LoadError`] carries a backtrace and an
//! optional cause via `failure::Context`, while [`LoadErrorKind`] is the plain, matchable
//! discriminant callers switch on.
//!
//! Runtime queries against an already-loaded [`BspData`](crate::bsp::BspData) never return this
//! type; out-of-range references inside a successfully loaded scene are handled by clamping or
//! skipping rather than failing (see the crate-level docs).

use std::fmt::{self, Display};

use failure::{Backtrace, Context, Fail};

#[derive(Debug)]
pub struct LoadError {
    inner: Context<LoadErrorKind>,
}

impl LoadError {
    pub fn kind(&self) -> &LoadErrorKind {
        self.inner.get_context()
    }
}

impl Fail for LoadError {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl From<LoadErrorKind> for LoadError {
    fn from(kind: LoadErrorKind) -> Self {
        LoadError {
            inner: Context::new(kind),
        }
    }
}

impl From<Context<LoadErrorKind>> for LoadError {
    fn from(inner: Context<LoadErrorKind>) -> Self {
        LoadError { inner }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadErrorKind::Io(e).into()
    }
}

#[derive(Debug, Fail)]
pub enum LoadErrorKind {
    #[fail(display = "I/O error reading BSP data: {}", _0)]
    Io(#[fail(cause)] std::io::Error),

    #[fail(display = "bad magic number (expected \"IBSP\", found {:?})", _0)]
    BadMagic([u8; 4]),

    #[fail(display = "unsupported IBSP version (found {}, expected 0x2E)", _0)]
    UnsupportedVersion(i32),

    #[fail(
        display = "lump \"{}\" at offset {} with size {} extends past end of file (len {})",
        lump, offset, size, file_len
    )]
    Truncated {
        lump: &'static str,
        offset: u64,
        size: u64,
        file_len: u64,
    },

    #[fail(display = "malformed BSP data: {}", _0)]
    Malformed(String),

    #[fail(display = "invalid load configuration: {}", _0)]
    InvalidConfig(String),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display_does_not_panic() {
        let errs: Vec<LoadError> = vec![
            LoadErrorKind::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom")).into(),
            LoadErrorKind::BadMagic(*b"XXXX").into(),
            LoadErrorKind::UnsupportedVersion(46).into(),
            LoadErrorKind::Truncated {
                lump: "Faces",
                offset: 100,
                size: 50,
                file_len: 120,
            }
            .into(),
            LoadErrorKind::Malformed("bad brush side plane index".to_string()).into(),
            LoadErrorKind::InvalidConfig("bezier_level must be >= 1".to_string()).into(),
        ];

        for e in errs {
            let _ = format!("{}", e);
        }
    }

    #[test]
    fn test_kind_roundtrips() {
        let err: LoadError = LoadErrorKind::UnsupportedVersion(7).into();
        assert!(matches!(err.kind(), LoadErrorKind::UnsupportedVersion(7)));
    }
}
