//! Byte-exact codec layer. `wire` owns the two header bytes every frame
//! carries (tidop and status); `cursor` owns the fixed payload buffers and
//! their typed accessors.
pub mod cursor;
pub mod wire;
