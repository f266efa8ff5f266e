// Audio probe plumbing
// Uses Symphonia for decoding and cpal for output

pub mod decoder;
pub mod output;
