// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types describing what the pipeline works on:
// trace metadata, the magnitude-scale tag, and the abstraction
// over wherever raw waveforms are stored.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// One trace's metadata row from the archive
pub mod record;

// Core abstractions (traits) that other layers implement
pub mod traits;
