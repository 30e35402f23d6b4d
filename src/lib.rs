// Copyright © 2017 Cormac O'Brien
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

//! Loader and runtime for IBSP v0x2E (id Tech 3 / Quake III) compiled level data.
//!
//! [`bsp::load::load`] turns a seekable byte source into a [`bsp::BspData`] scene; from there
//! [`bsp::render::render_world`] walks the tree for drawing, [`bsp::collide::trace_world`] walks
//! it for swept-sphere collision, and [`bsp::lightvol::find_light_vol`] samples the static light
//! grid. Everything else — the window, the graphics API, texture decoding, the archive
//! filesystem — is a collaborator this crate only describes an interface for; see the crate's
//! design notes for the split.

pub mod bitset;
pub mod bsp;
pub mod config;
pub mod error;
pub mod math;
