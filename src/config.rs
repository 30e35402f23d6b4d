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

use crate::error::{LoadError, LoadErrorKind};

/// Default quadratic Bézier subdivision level: each sub-patch is tessellated onto an `L x L` grid
/// of cells, producing `(L + 1)^2` vertices per sub-patch.
pub const DEFAULT_BEZIER_LEVEL: u32 = 3;

/// Tunables accepted by [`crate::bsp::load::load`].
#[derive(Clone, Copy, Debug)]
pub struct LoadConfig {
    /// Bézier patch subdivision level. Must be at least 1.
    pub bezier_level: u32,

    /// If `true`, a plane whose normal is not unit length is a hard load error
    /// (`LoadError::Malformed`) rather than being accepted and used as-is.
    pub strict_planes: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            bezier_level: DEFAULT_BEZIER_LEVEL,
            strict_planes: false,
        }
    }
}

impl LoadConfig {
    pub(crate) fn validate(&self) -> Result<(), LoadError> {
        if self.bezier_level < 1 {
            return Err(LoadErrorKind::InvalidConfig(format!(
                "bezier_level must be >= 1 (was {})",
                self.bezier_level
            ))
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(LoadConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_bezier_level_rejected() {
        let cfg = LoadConfig {
            bezier_level: 0,
            ..LoadConfig::default()
        };

        let err: LoadError = cfg.validate().unwrap_err();
        assert!(matches!(err.kind(), LoadErrorKind::InvalidConfig(_)));
    }
}
